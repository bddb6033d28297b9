use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// One entry per violated field in a validation failure.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: &str, message: &str) -> Self {
        Self {
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}

/// Every handler error funnels through this enum; the `ResponseError` impl is
/// the single translation point from internal failures to client payloads.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    #[error("Invalid or missing credentials")]
    Unauthorized,
    #[error("Admin access required")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Too many requests, please try again later")]
    RateLimited,
    #[error("Database unavailable")]
    Unavailable(#[from] r2d2::Error),
    #[error("Database error")]
    Database(#[from] DieselError),
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::RateLimited => "RATE_LIMITED",
            ApiError::Unavailable(_) => "DB_UNAVAILABLE",
            ApiError::Database(DieselError::NotFound) => "NOT_FOUND",
            ApiError::Database(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _,
            )) => "CONFLICT",
            ApiError::Database(DieselError::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation,
                _,
            )) => "BAD_REQUEST",
            ApiError::Database(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Database(DieselError::NotFound) => "Not found".to_string(),
            ApiError::Database(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _,
            )) => "A record with this value already exists".to_string(),
            ApiError::Database(DieselError::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation,
                _,
            )) => "Referenced record does not exist".to_string(),
            // Raw store/internal detail stays in the logs.
            ApiError::Database(_) | ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Extractor configs funneling framework-level rejections (malformed JSON
/// bodies, unparsable query strings, non-integer path ids) through the same
/// envelope as handler errors instead of actix's plain-text 400s.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(format!("Invalid JSON payload: {err}")).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(format!("Invalid query string: {err}")).into())
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(format!("Invalid path parameter: {err}")).into())
}

/// Maps a store lookup failure to a descriptive 404, leaving every other
/// store error to the generic translation.
pub fn not_found(entity: &str, err: DieselError) -> ApiError {
    match err {
        DieselError::NotFound => ApiError::NotFound(format!("{entity} not found")),
        other => ApiError::Database(other),
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(DieselError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Database(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _,
            )) => StatusCode::CONFLICT,
            ApiError::Database(DieselError::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation,
                _,
            )) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("request failed: {self:?}");
        } else {
            log::debug!("request rejected: {self:?}");
        }
        let mut body = json!({
            "error": self.client_message(),
            "code": self.code(),
        });
        if let ApiError::Validation(details) = self {
            body["details"] = json!(details);
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_error(kind: DatabaseErrorKind) -> ApiError {
        ApiError::Database(DieselError::DatabaseError(
            kind,
            Box::new("constraint".to_string()),
        ))
    }

    #[test]
    fn validation_maps_to_400_with_details() {
        let err = ApiError::Validation(vec![FieldError::new("name", "Name is required")]);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unique_violation_maps_to_409() {
        let err = db_error(DatabaseErrorKind::UniqueViolation);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "CONFLICT");
    }

    #[test]
    fn foreign_key_violation_maps_to_400() {
        let err = db_error(DatabaseErrorKind::ForeignKeyViolation);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_row_maps_to_404() {
        let err = ApiError::Database(DieselError::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.client_message(), "Not found");
    }

    #[test]
    fn unknown_db_error_is_sanitized() {
        let err = db_error(DatabaseErrorKind::Unknown);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn rate_limited_maps_to_429() {
        assert_eq!(ApiError::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }
}
