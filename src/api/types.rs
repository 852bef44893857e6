//! Shared request and response types for REST API handlers.

use serde::{Deserialize, Serialize};

use crate::domain::{
    Application, ApplicationStatus, CommissionBreakdown, Document, PointKey, PointOutcome,
    ReferralStatus,
};
use crate::infra::AuditLogEntry;
use crate::workflow::DispatchReport;

// ============================================================================
// Generic response wrappers
// ============================================================================

/// Result of a state-changing admin operation. `side_effects` reports the
/// best-effort audit and notification outcome; the mutation itself has
/// already been persisted.
#[derive(Debug, Serialize)]
pub struct MutationResponse<T> {
    #[serde(flatten)]
    pub entity: T,
    pub side_effects: DispatchReport,
}

impl<T> From<crate::workflow::TransitionOutcome<T>> for MutationResponse<T> {
    fn from(outcome: crate::workflow::TransitionOutcome<T>) -> Self {
        Self {
            entity: outcome.entity,
            side_effects: outcome.side_effects,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub count: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

// ============================================================================
// Application review types
// ============================================================================

/// Query for `GET /admin/applications`
#[derive(Debug, Default, Deserialize)]
pub struct ApplicationListQuery {
    pub status: Option<ApplicationStatus>,
}

/// Body of `PUT /admin/applications/:id/points/:point`
#[derive(Debug, Deserialize)]
pub struct PointStatusRequest {
    pub status: PointOutcome,
}

/// Body of `POST /admin/applications/:id/status`
#[derive(Debug, Deserialize)]
pub struct ApplicationStatusRequest {
    pub status: ApplicationStatus,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub selected_badges: Vec<crate::domain::BadgeLevel>,
}

/// Application with its documents and a per-point summary
#[derive(Debug, Serialize)]
pub struct ApplicationDetailResponse {
    pub application: Application,
    pub documents: Vec<Document>,
    pub tier_one_verified: usize,
    pub points: std::collections::BTreeMap<PointKey, crate::domain::PointStatus>,
}

#[derive(Debug, Serialize)]
pub struct AuditTrailResponse {
    pub entries: Vec<AuditLogEntry>,
}

// ============================================================================
// Referral types
// ============================================================================

/// Query for `GET /admin/referrals`
#[derive(Debug, Default, Deserialize)]
pub struct ReferralListQuery {
    pub status: Option<ReferralStatus>,
}

/// Body of `POST /admin/referrals/:id/transition`
#[derive(Debug, Deserialize)]
pub struct ReferralTransitionRequest {
    pub status: ReferralStatus,
    #[serde(flatten)]
    pub request: crate::workflow::AdvanceRequest,
}

#[derive(Debug, Serialize)]
pub struct CommissionResponse {
    pub referral_id: crate::domain::ReferralId,
    /// `None` until the referral is completed with a parseable value
    pub commission: Option<CommissionBreakdown>,
}

// ============================================================================
// Audit log types
// ============================================================================

/// Query for `GET /admin/audit-log`
#[derive(Debug, Deserialize)]
pub struct AuditLogQuery {
    pub entity_type: crate::domain::EntityType,
    pub entity_id: uuid::Uuid,
}
