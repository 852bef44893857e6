//! JWT authentication
//!
//! Tokens carry the user id as `sub` and a `role` claim.

use super::{AuthContext, AuthError, Role};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// JWT ID
    pub jti: String,

    /// `admin` or `member`; absent means member
    #[serde(default)]
    pub role: Option<String>,
}

/// JWT validator and issuer
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
}

impl JwtValidator {
    /// Create a new JWT validator with a secret key
    pub fn new(secret: &[u8], issuer: &str, audience: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
        }
    }

    /// Issue a token; used by tests and local tooling
    pub fn issue(&self, user_id: &Uuid, role: Role, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + ttl;

        let claims = Claims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            role: Some(role.as_str().to_string()),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidJwt(e.to_string()))
    }

    /// Validate a JWT token and return auth context
    pub fn validate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidJwt(e.to_string()),
            }
        })?;

        let claims = token_data.claims;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::InvalidJwt("invalid subject".to_string()))?;

        let role = match claims.role.as_deref().map(str::trim) {
            Some("admin") => Role::Admin,
            Some("member") | Some("") | None => Role::Member,
            Some(other) => return Err(AuthError::InvalidJwt(format!("unknown role: {other}"))),
        };

        Ok(AuthContext { user_id, role })
    }
}
