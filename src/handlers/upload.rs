use std::path::Path;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use futures::StreamExt;
use serde_json::json;

use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::settings::Settings;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
/// Text fields like `type` never legitimately exceed a few bytes.
pub const MAX_TEXT_FIELD_BYTES: usize = 1024;

const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];
const UPLOAD_KINDS: [&str; 3] = ["product", "brand", "news"];

/// Anything outside a conservative character set becomes an underscore so
/// the original filename can never escape the upload directory.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(|c| c == '.' || c == '_').is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

pub fn is_allowed_content_type(content_type: &str) -> bool {
    ALLOWED_CONTENT_TYPES.contains(&content_type)
}

pub fn is_upload_kind(kind: &str) -> bool {
    UPLOAD_KINDS.contains(&kind)
}

/// Accepts multipart `file` + `type`, writes the image under
/// `<uploads>/<type>/<millis>_<name>` and returns the public URL. Uploaded
/// files are never cleaned up when the referencing entity is deleted.
pub async fn upload(
    _admin: AdminUser,
    settings: web::Data<Settings>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mut kind: Option<String> = None;
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|_| ApiError::BadRequest("Invalid multipart payload".to_string()))?;
        let (field_name, filename) = {
            let disposition = field.content_disposition();
            (
                disposition.get_name().unwrap_or("").to_string(),
                disposition
                    .get_filename()
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "file".to_string()),
            )
        };
        let content_type = field
            .content_type()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_default();

        let cap = if field_name == "file" {
            MAX_UPLOAD_BYTES
        } else {
            MAX_TEXT_FIELD_BYTES
        };
        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|_| ApiError::BadRequest("Failed to read upload".to_string()))?;
            if bytes.len() + chunk.len() > cap {
                return Err(if field_name == "file" {
                    ApiError::BadRequest("File exceeds the 5 MB upload limit".to_string())
                } else {
                    ApiError::BadRequest(format!("Multipart field {field_name} is too large"))
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        match field_name.as_str() {
            "file" => file = Some((filename, content_type, bytes)),
            "type" => kind = Some(String::from_utf8_lossy(&bytes).trim().to_string()),
            _ => {}
        }
    }

    let kind = kind.ok_or_else(|| ApiError::BadRequest("Missing upload type".to_string()))?;
    if !is_upload_kind(&kind) {
        return Err(ApiError::BadRequest(
            "Upload type must be one of product, brand, news".to_string(),
        ));
    }
    let (filename, content_type, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
    if !is_allowed_content_type(&content_type) {
        return Err(ApiError::BadRequest(
            "Only jpeg, png, webp and gif images are allowed".to_string(),
        ));
    }

    let stored_name = format!(
        "{}_{}",
        Utc::now().timestamp_millis(),
        sanitize_filename(&filename)
    );
    let dir = Path::new(&settings.uploads.dir).join(&kind);
    std::fs::create_dir_all(&dir)
        .map_err(|e| ApiError::Internal(format!("failed to create upload directory: {e}")))?;
    std::fs::write(dir.join(&stored_name), &bytes)
        .map_err(|e| ApiError::Internal(format!("failed to write upload: {e}")))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "url": format!("/uploads/{kind}/{stored_name}"),
        "filename": stored_name,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_path_separators() {
        assert_eq!(
            sanitize_filename("../../etc/passwd"),
            ".._.._etc_passwd"
        );
        assert_eq!(sanitize_filename("pump spec (v2).png"), "pump_spec__v2_.png");
        assert_eq!(sanitize_filename("data-sheet_01.webp"), "data-sheet_01.webp");
    }

    #[test]
    fn sanitize_never_returns_an_empty_name() {
        assert_eq!(sanitize_filename(""), "file");
        assert_eq!(sanitize_filename("日本語"), "file");
    }

    #[test]
    fn content_type_allow_list() {
        assert!(is_allowed_content_type("image/png"));
        assert!(is_allowed_content_type("image/webp"));
        assert!(!is_allowed_content_type("text/plain"));
        assert!(!is_allowed_content_type("image/svg+xml"));
    }

    #[test]
    fn upload_kind_allow_list() {
        assert!(is_upload_kind("product"));
        assert!(is_upload_kind("brand"));
        assert!(is_upload_kind("news"));
        assert!(!is_upload_kind("avatar"));
    }
}
