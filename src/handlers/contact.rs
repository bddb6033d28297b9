use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::rate_limit::RateLimiter;
use crate::validate::FieldChecks;

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}

/// Rate limited per client IP before anything else runs. Submissions are not
/// persisted; development builds log them, production discards them.
pub async fn submit(
    req: HttpRequest,
    limiter: web::Data<RateLimiter>,
    form: web::Json<ContactForm>,
) -> Result<HttpResponse, ApiError> {
    let client_ip = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();
    if !limiter.check(&client_ip) {
        return Err(ApiError::RateLimited);
    }

    let mut checks = FieldChecks::new();
    checks
        .require("name", &form.name)
        .require("email", &form.email)
        .require("message", &form.message);
    if !form.email.trim().is_empty() {
        checks.email("email", &form.email);
    }
    checks.finish()?;

    if cfg!(debug_assertions) {
        log::info!(
            "contact submission from {} <{}>: {}",
            form.name,
            form.email,
            form.message
        );
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Thank you for your message. We will get back to you shortly."
    })))
}
