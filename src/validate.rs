use crate::error::{ApiError, FieldError};

/// Collects field-level violations so a single response can report all of
/// them, one `{path, message}` entry per field.
#[derive(Debug, Default)]
pub struct FieldChecks {
    errors: Vec<FieldError>,
}

impl FieldChecks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(&mut self, path: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.fail(path, &format!("{path} is required"));
        }
        self
    }

    pub fn require_id(&mut self, path: &str, value: i32) -> &mut Self {
        if value <= 0 {
            self.fail(path, &format!("{path} must be a valid id"));
        }
        self
    }

    pub fn email(&mut self, path: &str, value: &str) -> &mut Self {
        if !is_email(value) {
            self.fail(path, &format!("{path} must be a valid email address"));
        }
        self
    }

    /// Optional URL-ish fields accept a `/`-rooted relative path or a fully
    /// qualified http(s) URL; anything else is a violation. `None` passes.
    pub fn url_or_path(&mut self, path: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            if !is_url_or_path(v) {
                self.fail(
                    path,
                    &format!("{path} must be a relative path starting with / or an http(s) URL"),
                );
            }
        }
        self
    }

    pub fn fail(&mut self, path: &str, message: &str) -> &mut Self {
        self.errors.push(FieldError::new(path, message));
        self
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

pub fn is_url_or_path(value: &str) -> bool {
    value.starts_with('/') || value.starts_with("http://") || value.starts_with("https://")
}

pub fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

/// Optional strings are stored as NULL, never as empty string.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Same normalization for double-`Option` patch fields: an empty string in
/// the payload means "clear this column".
pub fn normalize_patch(value: Option<Option<String>>) -> Option<Option<String>> {
    value.map(normalize_optional)
}
