//! Structured API error responses with error codes
//!
//! Every admin endpoint returns errors in the same envelope with a stable
//! machine-readable code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;
use crate::infra::WorkflowError;

// ============================================================================
// Error Codes
// ============================================================================

/// Error codes for API responses
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication errors (1xxx)
    /// No authentication credentials provided
    AuthRequired,
    /// Invalid or malformed bearer token
    InvalidToken,
    /// Token has expired
    TokenExpired,
    /// Authenticated, but not an admin
    InsufficientPermissions,

    // Validation errors (3xxx)
    /// Request body is malformed
    InvalidRequestBody,
    /// Required field is missing or empty
    MissingRequiredField,
    /// Field value is invalid
    InvalidFieldValue,

    // Resource errors (4xxx)
    /// Requested resource not found
    ResourceNotFound,
    ApplicationNotFound,
    ProfileNotFound,
    ReferralNotFound,

    // State errors (7xxx)
    /// Invalid state transition
    InvalidStateTransition,
    /// Invariant violation
    InvariantViolation,

    // Infrastructure errors (8xxx)
    /// Database operation failed
    DatabaseError,
    /// External service unavailable
    ServiceUnavailable,
    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn numeric_code(&self) -> u32 {
        match self {
            // Auth (1xxx)
            ErrorCode::AuthRequired => 1001,
            ErrorCode::InvalidToken => 1003,
            ErrorCode::TokenExpired => 1004,
            ErrorCode::InsufficientPermissions => 1005,

            // Validation (3xxx)
            ErrorCode::InvalidRequestBody => 3001,
            ErrorCode::MissingRequiredField => 3002,
            ErrorCode::InvalidFieldValue => 3003,

            // Resource (4xxx)
            ErrorCode::ResourceNotFound => 4001,
            ErrorCode::ApplicationNotFound => 4002,
            ErrorCode::ProfileNotFound => 4003,
            ErrorCode::ReferralNotFound => 4004,

            // State (7xxx)
            ErrorCode::InvalidStateTransition => 7001,
            ErrorCode::InvariantViolation => 7002,

            // Infrastructure (8xxx)
            ErrorCode::DatabaseError => 8001,
            ErrorCode::ServiceUnavailable => 8002,
            ErrorCode::InternalError => 8999,
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::AuthRequired | ErrorCode::InvalidToken | ErrorCode::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            ErrorCode::InsufficientPermissions => StatusCode::FORBIDDEN,

            ErrorCode::InvalidRequestBody
            | ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFieldValue => StatusCode::BAD_REQUEST,

            ErrorCode::ResourceNotFound
            | ErrorCode::ApplicationNotFound
            | ErrorCode::ProfileNotFound
            | ErrorCode::ReferralNotFound => StatusCode::NOT_FOUND,

            ErrorCode::InvalidStateTransition | ErrorCode::InvariantViolation => {
                StatusCode::BAD_REQUEST
            }

            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code_str = match self {
            ErrorCode::AuthRequired => "AUTH_REQUIRED",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            ErrorCode::InvalidRequestBody => "INVALID_REQUEST_BODY",
            ErrorCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            ErrorCode::InvalidFieldValue => "INVALID_FIELD_VALUE",
            ErrorCode::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorCode::ApplicationNotFound => "APPLICATION_NOT_FOUND",
            ErrorCode::ProfileNotFound => "PROFILE_NOT_FOUND",
            ErrorCode::ReferralNotFound => "REFERRAL_NOT_FOUND",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::InvariantViolation => "INVARIANT_VIOLATION",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", code_str)
    }
}

// ============================================================================
// Structured Error Response
// ============================================================================

/// Structured error response for API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Numeric error code for easy categorization
    pub numeric_code: u32,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Related resource ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                details: None,
                resource_id: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.error.resource_id = Some(id.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code_str = self.error.code.to_string();
        let mut response = (status, Json(self)).into_response();

        if let Ok(code_value) = axum::http::HeaderValue::from_str(&code_str) {
            response.headers_mut().insert(
                axum::http::header::HeaderName::from_static("x-error-code"),
                code_value,
            );
        }

        response
    }
}

// ============================================================================
// Conversion from WorkflowError
// ============================================================================

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                ApiError::new(ErrorCode::DatabaseError, "Database error")
            }
            WorkflowError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                ApiError::new(ErrorCode::DatabaseError, "Storage error")
            }
            WorkflowError::ApplicationNotFound(id) => ApiError::new(
                ErrorCode::ApplicationNotFound,
                format!("Application not found: {}", id),
            )
            .with_resource_id(id.to_string()),
            WorkflowError::ProfileNotFound(id) => {
                ApiError::new(ErrorCode::ProfileNotFound, format!("Profile not found: {}", id))
                    .with_resource_id(id.to_string())
            }
            WorkflowError::ReferralNotFound(id) => {
                ApiError::new(ErrorCode::ReferralNotFound, format!("Referral not found: {}", id))
                    .with_resource_id(id.to_string())
            }
            WorkflowError::Validation { field, message } => {
                validation_error(&field, format!("{}: {}", field, message))
            }
            WorkflowError::InvalidStateTransition {
                entity_type,
                entity_id,
                from,
                to,
            } => ApiError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Invalid state transition for {}/{}: {} -> {}",
                    entity_type, entity_id, from, to
                ),
            )
            .with_details(serde_json::json!({
                "entity_type": entity_type,
                "entity_id": entity_id,
                "from_state": from,
                "to_state": to
            })),
            WorkflowError::InvariantViolation { invariant, message } => ApiError::new(
                ErrorCode::InvariantViolation,
                format!("Invariant violation: {} - {}", invariant, message),
            )
            .with_details(serde_json::json!({
                "invariant": invariant,
                "details": message
            })),
            WorkflowError::Unauthorized(msg) => forbidden(msg),
            WorkflowError::Notification(msg) => {
                ApiError::new(ErrorCode::ServiceUnavailable, msg)
            }
            WorkflowError::Configuration(msg) => ApiError::new(
                ErrorCode::InternalError,
                format!("Configuration error: {}", msg),
            ),
            WorkflowError::Internal(msg) => ApiError::new(ErrorCode::InternalError, msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let code = match err {
            AuthError::MissingAuth => ErrorCode::AuthRequired,
            AuthError::InvalidJwt(_) => ErrorCode::InvalidToken,
            AuthError::TokenExpired => ErrorCode::TokenExpired,
            AuthError::InsufficientPermissions => ErrorCode::InsufficientPermissions,
        };
        ApiError::new(code, err.to_string())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Create a not found error for a specific resource type
pub fn not_found(resource_type: &str, id: impl std::fmt::Display) -> ApiError {
    ApiError::new(
        ErrorCode::ResourceNotFound,
        format!("{} not found: {}", resource_type, id),
    )
    .with_resource_id(id.to_string())
}

/// Create a validation error with field details
pub fn validation_error(field: &str, message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::InvalidFieldValue, message.into())
        .with_details(serde_json::json!({ "field": field }))
}

/// Create an unauthorized error
pub fn unauthorized(message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::AuthRequired, message.into())
}

/// Create a forbidden error
pub fn forbidden(message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::InsufficientPermissions, message.into())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ApplicationId, ReferralId};

    #[test]
    fn test_error_code_numeric() {
        assert_eq!(ErrorCode::AuthRequired.numeric_code(), 1001);
        assert_eq!(ErrorCode::InvalidRequestBody.numeric_code(), 3001);
        assert_eq!(ErrorCode::ApplicationNotFound.numeric_code(), 4002);
        assert_eq!(ErrorCode::InvalidStateTransition.numeric_code(), 7001);
        assert_eq!(ErrorCode::DatabaseError.numeric_code(), 8001);
        assert_eq!(ErrorCode::InternalError.numeric_code(), 8999);
    }

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::AuthRequired.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ErrorCode::InsufficientPermissions.http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ErrorCode::InvariantViolation.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorCode::ReferralNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_maps_to_field_details() {
        let error: ApiError =
            WorkflowError::validation("matched_member_id", "a member must be selected").into();

        assert_eq!(error.error.code, ErrorCode::InvalidFieldValue);
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.error.details.unwrap()["field"], "matched_member_id");
    }

    #[test]
    fn test_transition_error_details() {
        let id = ReferralId::new();
        let error: ApiError =
            WorkflowError::invalid_transition("referral", id, "COMPLETED", "none").into();

        assert_eq!(error.error.code, ErrorCode::InvalidStateTransition);
        let details = error.error.details.unwrap();
        assert_eq!(details["from_state"], "COMPLETED");
        assert_eq!(details["entity_id"], id.to_string());
    }

    #[test]
    fn test_not_found_carries_resource_id() {
        let id = ApplicationId::new();
        let error: ApiError = WorkflowError::ApplicationNotFound(id).into();

        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.error.resource_id, Some(id.to_string()));
    }

    #[test]
    fn test_storage_message_is_not_leaked() {
        let error: ApiError = WorkflowError::Storage("status: bad value 'x'".into()).into();
        assert_eq!(error.error.message, "Storage error");
    }

    #[test]
    fn test_error_serialization() {
        let error = ApiError::new(ErrorCode::ProfileNotFound, "Profile not found");
        let json = serde_json::to_string(&error).unwrap();

        assert!(json.contains("PROFILE_NOT_FOUND"));
        assert!(json.contains("4003"));
    }
}
