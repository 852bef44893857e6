//! Authorization helper functions for REST API handlers.

use super::error::{forbidden, ApiError};
use crate::auth::AuthContext;
use crate::domain::AdminId;

/// The acting admin, or 403 for member callers.
pub fn require_admin(auth: &AuthContext) -> Result<AdminId, ApiError> {
    auth.admin_id()
        .ok_or_else(|| forbidden("Admin permission required"))
}
