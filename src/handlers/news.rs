use actix_web::{web, HttpResponse};
use chrono::{NaiveDateTime, Utc};
use serde::Deserialize;

use crate::auth::AdminUser;
use crate::db::models::{NewNewsArticle, UpdateNewsArticle};
use crate::db::repository;
use crate::error::{self, ApiError};
use crate::validate::{normalize_optional, normalize_patch, FieldChecks};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub published: Option<bool>,
}

/// Whenever `published` is present in a payload, the publish timestamp is
/// recomputed: true stamps "now", false clears it. Payloads that omit the
/// flag leave the timestamp untouched.
pub fn publish_timestamp_patch(published: Option<bool>) -> Option<Option<NaiveDateTime>> {
    published.map(|flag| flag.then(|| Utc::now().naive_utc()))
}

/// Defaults to published articles; `?published=false` lifts the filter so
/// drafts appear too. The detail route below ignores this flag entirely.
pub async fn list(
    data: web::Data<AppState>,
    query: web::Query<NewsQuery>,
) -> Result<HttpResponse, ApiError> {
    let conn = &mut data.pool.get()?;
    let published_only = !matches!(query.published, Some(false));
    let articles = repository::list_news(conn, published_only)?;
    Ok(HttpResponse::Ok().json(articles))
}

pub async fn get(data: web::Data<AppState>, id: web::Path<i32>) -> Result<HttpResponse, ApiError> {
    let conn = &mut data.pool.get()?;
    let article = repository::get_published_news(conn, id.into_inner())
        .map_err(|e| error::not_found("News article", e))?;
    Ok(HttpResponse::Ok().json(article))
}

pub async fn admin_list(
    _admin: AdminUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let conn = &mut data.pool.get()?;
    let articles = repository::list_news(conn, false)?;
    Ok(HttpResponse::Ok().json(articles))
}

pub async fn admin_get(
    _admin: AdminUser,
    data: web::Data<AppState>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let conn = &mut data.pool.get()?;
    let article = repository::get_news(conn, id.into_inner())
        .map_err(|e| error::not_found("News article", e))?;
    Ok(HttpResponse::Ok().json(article))
}

pub async fn create(
    _admin: AdminUser,
    data: web::Data<AppState>,
    payload: web::Json<NewNewsArticle>,
) -> Result<HttpResponse, ApiError> {
    let mut new_article = payload.into_inner();
    new_article.excerpt = normalize_optional(new_article.excerpt);
    new_article.image = normalize_optional(new_article.image);
    new_article.published_at = new_article.published.then(|| Utc::now().naive_utc());

    let mut checks = FieldChecks::new();
    checks
        .require("title", &new_article.title)
        .require("content", &new_article.content)
        .url_or_path("image", new_article.image.as_deref());
    checks.finish()?;

    let conn = &mut data.pool.get()?;
    let article = repository::create_news(conn, new_article)?;
    Ok(HttpResponse::Created().json(article))
}

pub async fn update(
    _admin: AdminUser,
    data: web::Data<AppState>,
    id: web::Path<i32>,
    payload: web::Json<UpdateNewsArticle>,
) -> Result<HttpResponse, ApiError> {
    let mut patch = payload.into_inner();
    patch.excerpt = normalize_patch(patch.excerpt);
    patch.image = normalize_patch(patch.image);
    patch.published_at = publish_timestamp_patch(patch.published);

    let mut checks = FieldChecks::new();
    if let Some(title) = &patch.title {
        checks.require("title", title);
    }
    if let Some(content) = &patch.content {
        checks.require("content", content);
    }
    if let Some(Some(image)) = &patch.image {
        checks.url_or_path("image", Some(image));
    }
    checks.finish()?;

    let conn = &mut data.pool.get()?;
    let article = repository::update_news(conn, id.into_inner(), patch)
        .map_err(|e| error::not_found("News article", e))?;
    Ok(HttpResponse::Ok().json(article))
}

pub async fn delete(
    _admin: AdminUser,
    data: web::Data<AppState>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let conn = &mut data.pool.get()?;
    let deleted = repository::delete_news(conn, id.into_inner())?;
    if deleted == 0 {
        return Err(ApiError::NotFound("News article not found".to_string()));
    }
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_flag_leaves_timestamp_alone() {
        assert_eq!(publish_timestamp_patch(None), None);
    }

    #[test]
    fn publishing_stamps_a_fresh_timestamp() {
        let patch = publish_timestamp_patch(Some(true));
        let inner = patch.expect("flag present means the column is written");
        assert!(inner.is_some());
    }

    #[test]
    fn unpublishing_clears_the_timestamp() {
        assert_eq!(publish_timestamp_patch(Some(false)), Some(None));
    }
}
