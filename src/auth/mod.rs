//! Authentication and authorization for the Proclusive workflow API
//!
//! Bearer tokens are issued by the identity provider and validated here
//! (HMAC JWT with configurable issuer/audience). The `role` claim separates
//! admins from members.
//!
//! # Configuration
//!
//! - `AUTH_MODE`: `required` (default) or `disabled` for development
//! - `JWT_SECRET`: HMAC secret for JWT validation
//! - `JWT_ISSUER` / `JWT_AUDIENCE`: expected `iss` / `aud` claims

mod jwt;
mod middleware;

pub use jwt::*;
pub use middleware::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AdminId, ProfileId};

/// Role carried in the token's `role` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

/// Authentication context extracted from request
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Authenticated user (the token subject)
    pub user_id: Uuid,

    pub role: Role,
}

impl AuthContext {
    /// Context used when `AUTH_MODE=disabled`
    pub fn development() -> Self {
        Self {
            user_id: Uuid::nil(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The caller as an acting admin, if they are one
    pub fn admin_id(&self) -> Option<AdminId> {
        self.is_admin().then(|| AdminId::from_uuid(self.user_id))
    }

    /// The caller's own member profile
    pub fn profile_id(&self) -> ProfileId {
        ProfileId::from_uuid(self.user_id)
    }
}

/// Authentication error
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authentication")]
    MissingAuth,

    #[error("invalid JWT: {0}")]
    InvalidJwt(String),

    #[error("token expired")]
    TokenExpired,

    #[error("insufficient permissions")]
    InsufficientPermissions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_admins_have_admin_id() {
        let user_id = Uuid::new_v4();
        let member = AuthContext {
            user_id,
            role: Role::Member,
        };
        let admin = AuthContext {
            user_id,
            role: Role::Admin,
        };

        assert_eq!(member.admin_id(), None);
        assert_eq!(admin.admin_id(), Some(AdminId::from_uuid(user_id)));
        assert_eq!(member.profile_id(), ProfileId::from_uuid(user_id));
    }

    #[test]
    fn test_development_context_is_admin() {
        assert!(AuthContext::development().is_admin());
    }
}
