//! Web server module
//!
//! Configures and starts the Actix-Web HTTP server: shared state, CORS,
//! bearer-session middleware for operator routes, and the public webhook
//! ingress.

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use actix_web_httpauth::middleware::HttpAuthentication;
use std::sync::Arc;
use tracing::info;

use crate::domain::repositories::ProjectSource;
use crate::infrastructure::github::{AppAuth, GithubProjectsClient};
use crate::infrastructure::persistence::{SqliteStore, TokenCipher};
use crate::web::auth::{self, SessionAuth};
use crate::web::config::AppConfig;
use crate::web::coordinator::RecalcCoordinator;
use crate::web::rate_limit::RateLimits;
use crate::web::{billing, handlers, webhook};

/// Starts the web server with the given configuration
///
/// Shared state created here lives for the whole process: the SQLite
/// store, the upstream client with its token cache, the recalculation
/// coordinator, and the ingress rate limiters.
pub async fn start_web_server(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting server on {}:{}", config.host, config.port);
    info!("Database: {}", config.database_path);

    let db = Arc::new(SqliteStore::new(&config.database_path)?);

    let app_auth = Arc::new(AppAuth::new(
        config.github_app_id.clone(),
        config.github_private_key.clone(),
        config.github_api_base.clone(),
    ));
    let source: Arc<dyn ProjectSource> = Arc::new(GithubProjectsClient::with_endpoint(
        app_auth,
        config.github_graphql_endpoint.clone(),
    ));

    let coordinator = Arc::new(RecalcCoordinator::new());
    let limits = Arc::new(RateLimits::new());
    let session_auth = SessionAuth::new(config.session_secret.clone());
    let token_cipher = TokenCipher::from_secret(&config.token_encryption_key);

    let config_data = web::Data::new(config.clone());
    let db_data = web::Data::new(db);
    let source_data = web::Data::new(source);
    let coordinator_data = web::Data::new(coordinator);
    let limits_data = web::Data::new(limits);
    let session_data = web::Data::new(session_auth);
    let cipher_data = web::Data::new(token_cipher);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let auth_middleware = HttpAuthentication::bearer(auth::validator);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(config_data.clone())
            .app_data(db_data.clone())
            .app_data(source_data.clone())
            .app_data(coordinator_data.clone())
            .app_data(limits_data.clone())
            .app_data(session_data.clone())
            .app_data(cipher_data.clone())
            .service(
                web::scope("/api")
                    // Public routes: health and signed webhook ingress
                    .route("/health", web::get().to(handlers::health_check))
                    .route("/webhook", web::post().to(webhook::handle_webhook))
                    .route(
                        "/billing/webhook",
                        web::post().to(billing::handle_billing_webhook),
                    )
                    // Operator routes (session required)
                    .service(
                        web::scope("/installations/{installation_id}")
                            .wrap(auth_middleware)
                            .route("/recalculate", web::post().to(handlers::recalculate))
                            .route("/save-baseline", web::post().to(handlers::save_baseline))
                            .route("/variance-report", web::get().to(handlers::variance_report))
                            .route("/settings", web::put().to(handlers::update_settings))
                            .route("/holidays", web::get().to(handlers::list_holidays))
                            .route("/holidays", web::post().to(handlers::add_holiday))
                            .route(
                                "/holidays/{date}",
                                web::delete().to(handlers::delete_holiday),
                            )
                            .route("/projects", web::post().to(handlers::track_project))
                            .route(
                                "/projects/{project_number}/dependencies",
                                web::get().to(handlers::dependencies),
                            )
                            .route(
                                "/projects/{project_number}/resources",
                                web::get().to(handlers::resources),
                            )
                            .route(
                                "/projects/{project_number}/milestones",
                                web::get().to(handlers::milestones),
                            )
                            .route(
                                "/projects/{project_number}/risks",
                                web::get().to(handlers::risks),
                            )
                            .route(
                                "/projects/{project_number}/risks",
                                web::post().to(handlers::create_risk),
                            )
                            .route(
                                "/projects/{project_number}/risks/{risk_id}/status",
                                web::put().to(handlers::update_risk_status),
                            ),
                    ),
            )
    })
    .bind((config.host.as_str(), config.port))?;

    info!("Server started on http://{}:{}", config.host, config.port);
    server.run().await?;
    Ok(())
}
