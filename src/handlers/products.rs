use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::AdminUser;
use crate::db::models::{Category, NewProduct, Product, UpdateProduct};
use crate::db::repository;
use crate::error::{self, ApiError};
use crate::validate::{normalize_optional, normalize_patch, FieldChecks};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub category_id: Option<i32>,
    pub featured: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category: Category,
}

/// Without `page`/`limit` the full list is returned as a bare array, which
/// older storefront pages still rely on; either parameter switches to the
/// paginated envelope.
pub async fn list(
    data: web::Data<AppState>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse, ApiError> {
    let conn = &mut data.pool.get()?;
    if query.page.is_none() && query.limit.is_none() {
        let products = repository::list_products(conn, query.category_id, query.featured)?;
        return Ok(HttpResponse::Ok().json(products));
    }
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(12).clamp(1, 100);
    let (products, total) =
        repository::list_products_page(conn, query.category_id, query.featured, page, limit)?;
    Ok(HttpResponse::Ok().json(ProductPage {
        products,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        },
    }))
}

pub async fn get(data: web::Data<AppState>, id: web::Path<i32>) -> Result<HttpResponse, ApiError> {
    let conn = &mut data.pool.get()?;
    let product = repository::get_product(conn, id.into_inner())
        .map_err(|e| error::not_found("Product", e))?;
    let category = repository::get_category(conn, product.category_id)?;
    Ok(HttpResponse::Ok().json(ProductDetail { product, category }))
}

pub async fn admin_list(
    _admin: AdminUser,
    data: web::Data<AppState>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse, ApiError> {
    list(data, query).await
}

pub async fn admin_get(
    _admin: AdminUser,
    data: web::Data<AppState>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    get(data, id).await
}

pub async fn create(
    _admin: AdminUser,
    data: web::Data<AppState>,
    payload: web::Json<NewProduct>,
) -> Result<HttpResponse, ApiError> {
    let mut new_product = payload.into_inner();
    new_product.description = normalize_optional(new_product.description);
    new_product.image = normalize_optional(new_product.image);
    new_product.brand_name = normalize_optional(new_product.brand_name);
    new_product.brand_logo = normalize_optional(new_product.brand_logo);

    let mut checks = FieldChecks::new();
    checks
        .require("code", &new_product.code)
        .require("name", &new_product.name)
        .require_id("categoryId", new_product.category_id)
        .url_or_path("image", new_product.image.as_deref())
        .url_or_path("brandLogo", new_product.brand_logo.as_deref());
    checks.finish()?;

    let conn = &mut data.pool.get()?;
    let product = repository::create_product(conn, new_product)?;
    Ok(HttpResponse::Created().json(product))
}

pub async fn update(
    _admin: AdminUser,
    data: web::Data<AppState>,
    id: web::Path<i32>,
    payload: web::Json<UpdateProduct>,
) -> Result<HttpResponse, ApiError> {
    let mut patch = payload.into_inner();
    patch.description = normalize_patch(patch.description);
    patch.image = normalize_patch(patch.image);
    patch.brand_name = normalize_patch(patch.brand_name);
    patch.brand_logo = normalize_patch(patch.brand_logo);

    let mut checks = FieldChecks::new();
    if let Some(code) = &patch.code {
        checks.require("code", code);
    }
    if let Some(name) = &patch.name {
        checks.require("name", name);
    }
    if let Some(category_id) = patch.category_id {
        checks.require_id("categoryId", category_id);
    }
    if let Some(Some(image)) = &patch.image {
        checks.url_or_path("image", Some(image));
    }
    if let Some(Some(logo)) = &patch.brand_logo {
        checks.url_or_path("brandLogo", Some(logo));
    }
    checks.finish()?;

    let conn = &mut data.pool.get()?;
    let product = repository::update_product(conn, id.into_inner(), patch)
        .map_err(|e| error::not_found("Product", e))?;
    Ok(HttpResponse::Ok().json(product))
}

pub async fn delete(
    _admin: AdminUser,
    data: web::Data<AppState>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let conn = &mut data.pool.get()?;
    let deleted = repository::delete_product(conn, id.into_inner())?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Product not found".to_string()));
    }
    Ok(HttpResponse::NoContent().finish())
}
