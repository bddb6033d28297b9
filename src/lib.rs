use actix_web::web;

pub mod auth;
pub mod db;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod settings;
pub mod validate;

use db::connection::PgPool;

pub struct AppState {
    pub pool: PgPool,
}

/// Full API route table, shared between the server binary and the test
/// harness. `/uploads` static serving is wired separately in `main`.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    use handlers::*;

    cfg.app_data(error::json_config())
        .app_data(error::query_config())
        .app_data(error::path_config())
        .route("/api/auth/login", web::post().to(session::login))
        // public read API
        .route("/api/products", web::get().to(products::list))
        .route("/api/products/{id}", web::get().to(products::get))
        .route("/api/categories", web::get().to(categories::list))
        .route("/api/brands", web::get().to(brands::list))
        .route("/api/news", web::get().to(news::list))
        .route("/api/news/{id}", web::get().to(news::get))
        .route("/api/contact", web::post().to(contact::submit))
        .route("/api/upload", web::post().to(upload::upload))
        // admin CRUD
        .route("/api/admin/products", web::get().to(products::admin_list))
        .route("/api/admin/products", web::post().to(products::create))
        .route("/api/admin/products/{id}", web::get().to(products::admin_get))
        .route("/api/admin/products/{id}", web::put().to(products::update))
        .route("/api/admin/products/{id}", web::delete().to(products::delete))
        .route("/api/admin/categories", web::get().to(categories::admin_list))
        .route("/api/admin/categories", web::post().to(categories::create))
        .route("/api/admin/categories/{id}", web::get().to(categories::admin_get))
        .route("/api/admin/categories/{id}", web::put().to(categories::update))
        .route("/api/admin/categories/{id}", web::delete().to(categories::delete))
        .route("/api/admin/brands", web::get().to(brands::admin_list))
        .route("/api/admin/brands", web::post().to(brands::create))
        .route("/api/admin/brands/{id}", web::get().to(brands::admin_get))
        .route("/api/admin/brands/{id}", web::put().to(brands::update))
        .route("/api/admin/brands/{id}", web::delete().to(brands::delete))
        .route("/api/admin/news", web::get().to(news::admin_list))
        .route("/api/admin/news", web::post().to(news::create))
        .route("/api/admin/news/{id}", web::get().to(news::admin_get))
        .route("/api/admin/news/{id}", web::put().to(news::update))
        .route("/api/admin/news/{id}", web::delete().to(news::delete));
}
