use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::auth;
use crate::db::repository;
use crate::error::ApiError;
use crate::settings::Settings;
use crate::validate::FieldChecks;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Credentials in, 30-day bearer token out. There is no registration
/// endpoint; accounts are provisioned directly in the store.
pub async fn login(
    data: web::Data<crate::AppState>,
    settings: web::Data<Settings>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let mut checks = FieldChecks::new();
    checks
        .require("email", &payload.email)
        .require("password", &payload.password);
    checks.finish()?;

    let conn = &mut data.pool.get()?;
    let user = match repository::find_user_by_email(conn, payload.email.trim()) {
        Ok(user) => user,
        Err(diesel::result::Error::NotFound) => return Err(ApiError::Unauthorized),
        Err(other) => return Err(other.into()),
    };
    if !auth::verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let token = auth::issue_token(&user, &settings.auth.jwt_secret, settings.auth.session_days)?;
    Ok(HttpResponse::Ok().json(json!({
        "token": token,
        "user": {
            "id": user.id,
            "email": user.email,
            "name": user.name,
            "role": user.role,
        }
    })))
}
