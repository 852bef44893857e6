//! Audit log and reconciliation handlers.

use axum::extract::{Extension, Query, State};
use axum::Json;

use crate::api::auth_helpers::require_admin;
use crate::api::error::ApiError;
use crate::api::types::{AuditLogQuery, AuditTrailResponse};
use crate::auth::AuthContextExt;
use crate::server::AppState;
use crate::workflow::ReconcileReport;

/// GET /api/v1/admin/audit-log?entity_type=..&entity_id=..
pub async fn get_audit_log(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<AuditTrailResponse>, ApiError> {
    let entries = state
        .audit
        .for_entity(query.entity_type, query.entity_id)
        .await?;
    Ok(Json(AuditTrailResponse { entries }))
}

/// GET /api/v1/admin/reconcile - Report half-applied approvals.
pub async fn scan_approvals(
    State(state): State<AppState>,
) -> Result<Json<ReconcileReport>, ApiError> {
    Ok(Json(state.reconciler.scan().await?))
}

/// POST /api/v1/admin/reconcile/repair - Re-apply profile verification where safe.
pub async fn repair_approvals(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
) -> Result<Json<ReconcileReport>, ApiError> {
    let admin = require_admin(&auth)?;
    Ok(Json(state.reconciler.repair(admin).await?))
}
