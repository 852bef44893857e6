//! Authentication middleware for Axum
//!
//! Extracts authentication from requests and enforces the admin role on the
//! admin API.

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{AuthContext, AuthError, JwtValidator};
use crate::api::ApiError;

/// Bearer-token authenticator
#[derive(Default)]
pub struct Authenticator {
    jwt_validator: Option<Arc<JwtValidator>>,
}

impl Authenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jwt(mut self, jwt_validator: Arc<JwtValidator>) -> Self {
        self.jwt_validator = Some(jwt_validator);
        self
    }

    /// Authenticate a request
    pub fn authenticate(&self, auth_header: Option<&str>) -> Result<AuthContext, AuthError> {
        let header = auth_header.ok_or(AuthError::MissingAuth)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MissingAuth)?;
        match &self.jwt_validator {
            Some(jwt) => jwt.validate(token.trim()),
            None => Err(AuthError::InvalidJwt("JWT not configured".to_string())),
        }
    }
}

/// Auth context extension for request
#[derive(Clone)]
pub struct AuthContextExt(pub AuthContext);

/// Authentication middleware configuration/state.
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub authenticator: Arc<Authenticator>,
    /// If false, requests are treated as an admin (dev mode).
    pub require_auth: bool,
}

/// Authenticate any caller
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let context = match authenticate(&state, &request) {
        Ok(context) => context,
        Err(e) => return auth_error_response(e),
    };

    request.extensions_mut().insert(AuthContextExt(context));
    next.run(request).await
}

/// Authenticate and require the admin role
pub async fn admin_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let context = match authenticate(&state, &request) {
        Ok(context) => context,
        Err(e) => return auth_error_response(e),
    };
    if !context.is_admin() {
        return auth_error_response(AuthError::InsufficientPermissions);
    }

    request.extensions_mut().insert(AuthContextExt(context));
    next.run(request).await
}

fn authenticate(
    state: &AuthMiddlewareState,
    request: &Request<Body>,
) -> Result<AuthContext, AuthError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match state.authenticator.authenticate(auth_header) {
        Ok(context) => Ok(context),
        Err(e) if state.require_auth => Err(e),
        Err(_) => Ok(AuthContext::development()),
    }
}

/// Convert auth error to HTTP response
fn auth_error_response(error: AuthError) -> Response {
    ApiError::from(error).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use chrono::Duration;
    use uuid::Uuid;

    #[test]
    fn test_requires_bearer_scheme() {
        let jwt = Arc::new(JwtValidator::new(b"secret", "iss", "aud"));
        let token = jwt.issue(&Uuid::new_v4(), Role::Admin, Duration::hours(1)).unwrap();
        let authenticator = Authenticator::new().with_jwt(jwt);

        assert!(authenticator
            .authenticate(Some(&format!("Bearer {token}")))
            .is_ok());
        assert!(matches!(
            authenticator.authenticate(Some(&token)),
            Err(AuthError::MissingAuth)
        ));
        assert!(matches!(
            authenticator.authenticate(None),
            Err(AuthError::MissingAuth)
        ));
    }

    #[test]
    fn test_without_jwt_configured() {
        assert!(matches!(
            Authenticator::new().authenticate(Some("Bearer abc")),
            Err(AuthError::InvalidJwt(_))
        ));
    }
}
