//! Session authentication module
//!
//! Bearer-token validation for the operator API. Tokens are minted by the
//! identity layer (outside this service); the engine only verifies them
//! against the shared session secret and rejects requests without a valid
//! session.

use actix_web::error::ErrorUnauthorized;
use actix_web::{dev::ServiceRequest, Error, HttpMessage};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Session claims embedded in bearer tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (operator identifier)
    pub sub: String,
    /// Token expiration timestamp (Unix epoch)
    pub exp: i64,
}

/// Verifies session tokens against the configured secret
#[derive(Clone)]
pub struct SessionAuth {
    session_secret: String,
}

impl SessionAuth {
    pub fn new(session_secret: String) -> Self {
        Self { session_secret }
    }

    /// Verifies and decodes a session token
    pub fn verify_token(&self, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.session_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
    }

    /// Mints a session token; used by tests and local tooling, the real
    /// identity flow lives outside this service
    pub fn issue_token(&self, subject: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = SessionClaims {
            sub: subject.to_string(),
            exp: (Utc::now() + Duration::hours(24)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.session_secret.as_bytes()),
        )
    }
}

/// Middleware validator for bearer session tokens
///
/// Injects the decoded claims into request extensions on success.
pub async fn validator(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let Some(auth) = req.app_data::<actix_web::web::Data<SessionAuth>>() else {
        return Err((ErrorUnauthorized("session auth not configured"), req));
    };

    match auth.verify_token(credentials.token()) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(req)
        }
        Err(_) => Err((ErrorUnauthorized("invalid session"), req)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let auth = SessionAuth::new("secret".to_string());
        let token = auth.issue_token("operator-1").unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "operator-1");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let auth = SessionAuth::new("secret".to_string());
        let other = SessionAuth::new("different".to_string());
        let token = auth.issue_token("operator-1").unwrap();
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let auth = SessionAuth::new("secret".to_string());
        assert!(auth.verify_token("not-a-token").is_err());
    }
}
