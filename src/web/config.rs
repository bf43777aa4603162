//! Server configuration module
//!
//! Configuration is loaded from the environment (optionally via .env). In
//! production every secret is required and a missing one is a fatal startup
//! error; in development deterministic fallbacks keep the server bootable.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Process-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server host address (e.g. "0.0.0.0" or "127.0.0.1")
    pub host: String,
    pub port: u16,
    /// Path to the SQLite database file
    pub database_path: String,
    /// "development" or "production"
    pub app_env: String,
    /// Public base URL of this deployment
    pub public_url: String,

    /// Upstream app id
    pub github_app_id: String,
    /// Upstream app private key (PEM)
    pub github_private_key: String,
    /// REST API base of the upstream service
    pub github_api_base: String,
    /// GraphQL endpoint of the upstream service
    pub github_graphql_endpoint: String,
    /// Shared secret for webhook signatures
    pub webhook_secret: String,

    /// Secret for session-token verification
    pub session_secret: String,
    /// Secret the token-at-rest key is derived from
    pub token_encryption_key: String,

    /// Billing provider API secret
    pub billing_secret: String,
    /// Shared secret for billing webhook signatures
    pub billing_webhook_secret: String,
}

impl AppConfig {
    /// Loads configuration from the environment
    ///
    /// # Errors
    ///
    /// Fails when a required secret is absent in production; the caller
    /// exits with code 1.
    pub fn from_env() -> Result<Self> {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env == "production";

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "planweaver.db".to_string()),
            public_url: required(production, "PUBLIC_URL", "http://localhost:8080")?,
            github_app_id: required(production, "GITHUB_APP_ID", "0")?,
            github_private_key: required(production, "GITHUB_PRIVATE_KEY", "")?,
            github_api_base: env::var("GITHUB_API_BASE")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
            github_graphql_endpoint: env::var("GITHUB_GRAPHQL_ENDPOINT")
                .unwrap_or_else(|_| "https://api.github.com/graphql".to_string()),
            webhook_secret: required(production, "GITHUB_WEBHOOK_SECRET", "dev-webhook-secret")?,
            session_secret: required(production, "SESSION_SECRET", "dev-session-secret")?,
            token_encryption_key: required(
                production,
                "TOKEN_ENCRYPTION_KEY",
                "dev-token-encryption-key-32-bytes",
            )?,
            billing_secret: required(production, "BILLING_SECRET", "dev-billing-secret")?,
            billing_webhook_secret: required(
                production,
                "BILLING_WEBHOOK_SECRET",
                "dev-billing-webhook-secret",
            )?,
            app_env,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    pub fn with_host(mut self, host: String) -> Self {
        self.host = host;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_database_path(mut self, database_path: String) -> Self {
        self.database_path = database_path;
        self
    }
}

/// Required in production, falls back in development
fn required(production: bool, key: &str, fallback: &str) -> Result<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ if production => bail!("missing required configuration: {key}"),
        _ => Ok(fallback.to_string()),
    }
}
