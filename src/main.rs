use std::time::Duration;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use catalog_backend::auth;
use catalog_backend::db::models::NewUser;
use catalog_backend::db::{connection, repository};
use catalog_backend::rate_limit::RateLimiter;
use catalog_backend::settings::Settings;
use catalog_backend::AppState;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

const CONTACT_RATE_LIMIT: u32 = 5;
const CONTACT_RATE_WINDOW: Duration = Duration::from_secs(3600);

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let settings = Settings::load().expect("Failed to load configuration");
    {
        let mut conn = diesel::pg::PgConnection::establish(&settings.database.url)
            .expect("Failed to connect to the database");
        conn.run_pending_migrations(MIGRATIONS)
            .expect("Failed to run migrations");
    }
    let pool = connection::build_pool(&settings.database).expect("Failed to create pool");

    if let (Some(email), Some(password)) = (
        &settings.auth.bootstrap_admin_email,
        &settings.auth.bootstrap_admin_password,
    ) {
        let conn = &mut pool.get().expect("Failed to get connection from pool");
        match repository::find_user_by_email(conn, email) {
            Ok(_) => {}
            Err(diesel::result::Error::NotFound) => {
                let password_hash =
                    auth::hash_password(password).expect("Failed to hash bootstrap password");
                repository::create_user(
                    conn,
                    NewUser {
                        email: email.clone(),
                        password_hash,
                        name: "Administrator".to_string(),
                        role: auth::ADMIN_ROLE.to_string(),
                    },
                )
                .expect("Failed to create bootstrap admin");
                log::info!("created bootstrap admin account {email}");
            }
            Err(other) => panic!("Failed to look up bootstrap admin: {other}"),
        }
    }

    let app_state = web::Data::new(AppState { pool });
    let limiter = web::Data::new(RateLimiter::new(CONTACT_RATE_LIMIT, CONTACT_RATE_WINDOW));
    let upload_root = settings.uploads.dir.clone();
    let bind_addr = (settings.server.host.clone(), settings.server.port);
    let settings_data = web::Data::new(settings);

    log::info!(
        "Starting HTTP server on http://{}:{}",
        bind_addr.0,
        bind_addr.1
    );
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(app_state.clone())
            .app_data(settings_data.clone())
            .app_data(limiter.clone())
            .service(Files::new("/uploads", upload_root.clone()))
            .configure(catalog_backend::configure_api)
    })
    .bind(bind_addr)?
    .run()
    .await
}
