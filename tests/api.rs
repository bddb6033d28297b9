use std::net::SocketAddr;
use std::time::Duration;

use actix_web::{test, web, App};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use serde_json::Value;

use catalog_backend::auth::issue_token;
use catalog_backend::db::models::User;
use catalog_backend::rate_limit::RateLimiter;
use catalog_backend::settings::{AuthSettings, DatabaseSettings, Settings, UploadSettings};
use catalog_backend::AppState;

const TEST_SECRET: &str = "test-secret";

fn test_settings(upload_dir: &str) -> Settings {
    Settings {
        database: DatabaseSettings {
            url: "postgres://localhost/unused".to_string(),
            pool_size: 1,
            timeout_seconds: 1,
        },
        server: Default::default(),
        auth: AuthSettings {
            jwt_secret: TEST_SECRET.to_string(),
            session_days: 30,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
        },
        uploads: UploadSettings {
            dir: upload_dir.to_string(),
        },
    }
}

/// Pool that never connects; only tests that fail before touching the store
/// use it.
fn unconnected_pool() -> Pool<ConnectionManager<PgConnection>> {
    let manager = ConnectionManager::<PgConnection>::new("postgres://localhost/unused");
    Pool::builder()
        .max_size(1)
        .min_idle(Some(0))
        .build_unchecked(manager)
}

fn token_for(role: &str) -> String {
    let user = User {
        id: 1,
        email: "admin@example.com".to_string(),
        password_hash: String::new(),
        name: "Admin".to_string(),
        role: role.to_string(),
    };
    issue_token(&user, TEST_SECRET, 30).unwrap()
}

fn multipart_body(
    kind: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> (String, Vec<u8>) {
    let boundary = "test-boundary-7d9f";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"type\"\r\n\r\n{kind}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

fn upload_dir(tag: &str) -> String {
    let dir = std::env::temp_dir().join(format!("catalog-upload-test-{}-{tag}", std::process::id()));
    dir.to_string_lossy().into_owned()
}

macro_rules! test_app {
    ($settings:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState {
                    pool: unconnected_pool(),
                }))
                .app_data(web::Data::new($settings))
                .app_data(web::Data::new(RateLimiter::new(5, Duration::from_secs(3600))))
                .configure(catalog_backend::configure_api),
        )
        .await
    };
}

#[actix_web::test]
async fn contact_accepts_valid_submission() {
    let app = test_app!(test_settings(&upload_dir("contact-ok")));
    let req = test::TestRequest::post()
        .uri("/api/contact")
        .set_json(serde_json::json!({
            "name": "Jo Smith",
            "email": "jo@example.com",
            "message": "Looking for a quote on centrifugal pumps."
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], Value::Bool(true));
}

#[actix_web::test]
async fn contact_sixth_request_from_same_ip_is_rate_limited() {
    let app = test_app!(test_settings(&upload_dir("contact-rl")));
    let peer: SocketAddr = "203.0.113.5:40000".parse().unwrap();
    for _ in 0..5 {
        let req = test::TestRequest::post()
            .uri("/api/contact")
            .peer_addr(peer)
            .set_json(serde_json::json!({
                "name": "Jo",
                "email": "jo@example.com",
                "message": "hello"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }
    let req = test::TestRequest::post()
        .uri("/api/contact")
        .peer_addr(peer)
        .set_json(serde_json::json!({
            "name": "Jo",
            "email": "jo@example.com",
            "message": "hello"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 429);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "RATE_LIMITED");
}

#[actix_web::test]
async fn contact_reports_each_violated_field() {
    let app = test_app!(test_settings(&upload_dir("contact-val")));
    let req = test::TestRequest::post()
        .uri("/api/contact")
        .set_json(serde_json::json!({
            "name": "",
            "email": "not-an-email",
            "message": "hi"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let paths: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"name"));
    assert!(paths.contains(&"email"));
}

#[actix_web::test]
async fn admin_mutation_requires_a_session() {
    let app = test_app!(test_settings(&upload_dir("admin-auth")));
    let req = test::TestRequest::post()
        .uri("/api/admin/products")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[actix_web::test]
async fn non_admin_session_is_forbidden() {
    let app = test_app!(test_settings(&upload_dir("admin-role")));
    let req = test::TestRequest::post()
        .uri("/api/admin/products")
        .insert_header(("authorization", format!("Bearer {}", token_for("viewer"))))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);
}

#[actix_web::test]
async fn login_rejects_missing_fields_before_the_store() {
    let app = test_app!(test_settings(&upload_dir("login-val")));
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(serde_json::json!({"email": "", "password": ""}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn upload_requires_a_session() {
    let app = test_app!(test_settings(&upload_dir("upload-auth")));
    let (content_type, body) = multipart_body("product", "a.png", "image/png", &[1, 2, 3]);
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[actix_web::test]
async fn upload_writes_png_and_returns_relative_url() {
    let dir = upload_dir("upload-ok");
    let app = test_app!(test_settings(&dir));
    let png = vec![0u8; 2 * 1024 * 1024];
    let (content_type, body) = multipart_body("product", "data sheet.png", "image/png", &png);
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .insert_header(("authorization", format!("Bearer {}", token_for("admin"))))
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], Value::Bool(true));
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("/uploads/product/"));
    let filename = body["filename"].as_str().unwrap();
    let written = std::path::Path::new(&dir).join("product").join(filename);
    assert!(written.exists());
    std::fs::remove_dir_all(&dir).ok();
}

#[actix_web::test]
async fn upload_rejects_disallowed_content_type() {
    let app = test_app!(test_settings(&upload_dir("upload-txt")));
    let (content_type, body) = multipart_body("product", "notes.txt", "text/plain", b"hello");
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .insert_header(("authorization", format!("Bearer {}", token_for("admin"))))
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn upload_rejects_oversize_file() {
    let app = test_app!(test_settings(&upload_dir("upload-big")));
    let big = vec![0u8; 6 * 1024 * 1024];
    let (content_type, body) = multipart_body("product", "big.png", "image/png", &big);
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .insert_header(("authorization", format!("Bearer {}", token_for("admin"))))
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn category_cannot_become_its_own_parent() {
    let app = test_app!(test_settings(&upload_dir("cat-self")));
    let req = test::TestRequest::put()
        .uri("/api/admin/categories/5")
        .insert_header(("authorization", format!("Bearer {}", token_for("admin"))))
        .set_json(serde_json::json!({"parentId": 5}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let paths: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"parentId"));
}

#[actix_web::test]
async fn malformed_json_body_uses_the_error_envelope() {
    let app = test_app!(test_settings(&upload_dir("bad-json")));
    let req = test::TestRequest::post()
        .uri("/api/contact")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["error"].as_str().unwrap().contains("Invalid JSON payload"));
}

#[actix_web::test]
async fn non_boolean_query_flag_uses_the_error_envelope() {
    let app = test_app!(test_settings(&upload_dir("bad-query")));
    let req = test::TestRequest::get()
        .uri("/api/products?featured=notabool")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[actix_web::test]
async fn non_integer_path_id_uses_the_error_envelope() {
    let app = test_app!(test_settings(&upload_dir("bad-path")));
    let req = test::TestRequest::get().uri("/api/products/abc").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["error"].as_str().unwrap().contains("Invalid path parameter"));
}

#[actix_web::test]
async fn upload_caps_oversized_text_fields() {
    let app = test_app!(test_settings(&upload_dir("upload-type-big")));
    let huge_kind = "a".repeat(4096);
    let (content_type, body) = multipart_body(&huge_kind, "a.png", "image/png", &[1, 2, 3]);
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .insert_header(("authorization", format!("Bearer {}", token_for("admin"))))
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn upload_rejects_unknown_kind() {
    let app = test_app!(test_settings(&upload_dir("upload-kind")));
    let (content_type, body) = multipart_body("avatar", "a.png", "image/png", &[1, 2, 3]);
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .insert_header(("authorization", format!("Bearer {}", token_for("admin"))))
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}
