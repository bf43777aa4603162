//! App authentication module
//!
//! Signs short-lived app JWTs with the configured private key and exchanges
//! them for installation access tokens. Tokens are cached process-wide with
//! a TTL safely inside the upstream one-hour validity window.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::EngineError;

/// Installation tokens expire upstream after 60 minutes; refresh before
const TOKEN_TTL_SECS: u64 = 50 * 60;
const TOKEN_CACHE_CAPACITY: u64 = 100;

#[derive(Debug, Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Provides installation access tokens for upstream API calls
pub struct AppAuth {
    app_id: String,
    private_key_pem: String,
    api_base: String,
    http: reqwest::Client,
    tokens: Cache<i64, String>,
}

impl AppAuth {
    pub fn new(app_id: String, private_key_pem: String, api_base: String) -> Self {
        Self {
            app_id,
            private_key_pem,
            api_base,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            tokens: Cache::builder()
                .max_capacity(TOKEN_CACHE_CAPACITY)
                .time_to_live(Duration::from_secs(TOKEN_TTL_SECS))
                .build(),
        }
    }

    /// RS256 app JWT: issued 60 s in the past to tolerate clock skew,
    /// valid for 10 minutes
    fn app_jwt(&self) -> Result<String, EngineError> {
        let now = Utc::now().timestamp();
        let claims = AppClaims {
            iat: now - 60,
            exp: now + 600,
            iss: self.app_id.clone(),
        };

        let key = EncodingKey::from_rsa_pem(self.private_key_pem.as_bytes())
            .map_err(|e| EngineError::Configuration(format!("invalid app private key: {e}")))?;

        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| EngineError::Configuration(format!("failed to sign app JWT: {e}")))
    }

    /// Returns a cached installation token or mints a fresh one
    pub async fn installation_token(&self, installation_id: i64) -> Result<String, EngineError> {
        if let Some(token) = self.tokens.get(&installation_id) {
            return Ok(token);
        }

        let jwt = self.app_jwt()?;
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.api_base, installation_id
        );

        debug!("minting installation token for {}", installation_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(jwt)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "planweaver")
            .send()
            .await
            .map_err(|e| EngineError::Upstream(format!("token exchange failed: {e}")))?;

        if !response.status().is_success() {
            return Err(EngineError::Upstream(format!(
                "token exchange returned {}",
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Upstream(format!("malformed token response: {e}")))?;

        self.tokens.insert(installation_id, body.token.clone());
        Ok(body.token)
    }

    /// Drops a cached token, forcing a refresh on next use
    pub fn invalidate(&self, installation_id: i64) {
        self.tokens.invalidate(&installation_id);
    }
}
