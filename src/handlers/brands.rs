use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::auth::AdminUser;
use crate::db::models::{Brand, NewBrand, UpdateBrand};
use crate::db::repository;
use crate::error::{self, ApiError};
use crate::validate::{normalize_optional, normalize_patch, FieldChecks};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandWithCount {
    #[serde(flatten)]
    pub brand: Brand,
    pub product_count: i64,
}

/// Product counts come from matching the denormalized `brandName` string on
/// products, not a foreign key; brands with no matching products report 0.
pub async fn list(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let conn = &mut data.pool.get()?;
    let brands = repository::get_all_brands(conn)?;
    let counts: HashMap<String, i64> = repository::product_counts_by_brand_name(conn)?
        .into_iter()
        .filter_map(|(name, count)| name.map(|n| (n, count)))
        .collect();
    let annotated: Vec<BrandWithCount> = brands
        .into_iter()
        .map(|brand| BrandWithCount {
            product_count: counts.get(&brand.name).copied().unwrap_or(0),
            brand,
        })
        .collect();
    Ok(HttpResponse::Ok().json(annotated))
}

pub async fn admin_list(
    _admin: AdminUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    list(data).await
}

pub async fn admin_get(
    _admin: AdminUser,
    data: web::Data<AppState>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let conn = &mut data.pool.get()?;
    let brand =
        repository::get_brand(conn, id.into_inner()).map_err(|e| error::not_found("Brand", e))?;
    Ok(HttpResponse::Ok().json(brand))
}

pub async fn create(
    _admin: AdminUser,
    data: web::Data<AppState>,
    payload: web::Json<NewBrand>,
) -> Result<HttpResponse, ApiError> {
    let mut new_brand = payload.into_inner();
    new_brand.logo = normalize_optional(new_brand.logo);
    new_brand.description = normalize_optional(new_brand.description);
    new_brand.website = normalize_optional(new_brand.website);

    let mut checks = FieldChecks::new();
    checks
        .require("name", &new_brand.name)
        .url_or_path("logo", new_brand.logo.as_deref())
        .url_or_path("website", new_brand.website.as_deref());
    checks.finish()?;

    let conn = &mut data.pool.get()?;
    let brand = repository::create_brand(conn, new_brand)?;
    Ok(HttpResponse::Created().json(brand))
}

pub async fn update(
    _admin: AdminUser,
    data: web::Data<AppState>,
    id: web::Path<i32>,
    payload: web::Json<UpdateBrand>,
) -> Result<HttpResponse, ApiError> {
    let mut patch = payload.into_inner();
    patch.logo = normalize_patch(patch.logo);
    patch.description = normalize_patch(patch.description);
    patch.website = normalize_patch(patch.website);

    let mut checks = FieldChecks::new();
    if let Some(name) = &patch.name {
        checks.require("name", name);
    }
    if let Some(Some(logo)) = &patch.logo {
        checks.url_or_path("logo", Some(logo));
    }
    if let Some(Some(website)) = &patch.website {
        checks.url_or_path("website", Some(website));
    }
    checks.finish()?;

    // Renaming a brand does not touch the brand name/logo snapshots stored
    // on existing products.
    let conn = &mut data.pool.get()?;
    let brand = repository::update_brand(conn, id.into_inner(), patch)
        .map_err(|e| error::not_found("Brand", e))?;
    Ok(HttpResponse::Ok().json(brand))
}

pub async fn delete(
    _admin: AdminUser,
    data: web::Data<AppState>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let conn = &mut data.pool.get()?;
    let deleted = repository::delete_brand(conn, id.into_inner())?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Brand not found".to_string()));
    }
    Ok(HttpResponse::NoContent().finish())
}
