pub mod context;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::database::models::Role;

pub use context::{AuthContext, AuthState};

/// The signed-in user as far as the data layer is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

impl Identity {
    pub fn new(id: Uuid, name: impl Into<String>, role: Role) -> Self {
        Self { id, name: name.into(), role }
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(identity: &Identity) -> Self {
        Self::with_expiry(identity, config::config().security.jwt_expiry_hours)
    }

    pub fn with_expiry(identity: &Identity, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: identity.id,
            name: identity.name.clone(),
            role: identity.role,
            exp,
            iat: now.timestamp(),
        }
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Identity { id: claims.sub, name: claims.name, role: claims.role }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

pub fn generate_jwt(claims: &Claims) -> Result<String, AuthError> {
    generate_jwt_with_secret(claims, &config::config().security.jwt_secret)
}

pub fn generate_jwt_with_secret(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Validate a bearer token and return the identity it carries
pub fn validate_jwt(token: &str) -> Result<Identity, AuthError> {
    validate_jwt_with_secret(token, &config::config().security.jwt_secret)
}

pub fn validate_jwt_with_secret(token: &str, secret: &str) -> Result<Identity, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::InvalidToken(e.to_string()),
    })?;

    Ok(token_data.claims.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    fn alice() -> Identity {
        Identity::new(Uuid::new_v4(), "Alice", Role::Manager)
    }

    #[test]
    fn token_round_trips_identity() {
        let identity = alice();
        let token = generate_jwt_with_secret(&Claims::with_expiry(&identity, 1), SECRET).unwrap();
        assert_eq!(validate_jwt_with_secret(&token, SECRET).unwrap(), identity);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_jwt_with_secret(&Claims::with_expiry(&alice(), 1), SECRET).unwrap();
        let err = validate_jwt_with_secret(&token, "other-secret").unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn expired_tokens_are_reported_as_expired() {
        let mut claims = Claims::with_expiry(&alice(), 1);
        claims.exp = Utc::now().timestamp() - 3600;
        let token = generate_jwt_with_secret(&claims, SECRET).unwrap();
        assert!(matches!(validate_jwt_with_secret(&token, SECRET), Err(AuthError::Expired)));
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let err = generate_jwt_with_secret(&Claims::with_expiry(&alice(), 1), "").unwrap_err();
        assert!(matches!(err, AuthError::InvalidSecret));
    }
}
