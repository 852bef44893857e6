//! Application review handlers.

use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use uuid::Uuid;

use crate::api::auth_helpers::require_admin;
use crate::api::error::ApiError;
use crate::api::types::{
    ApplicationDetailResponse, ApplicationListQuery, ApplicationStatusRequest, AuditTrailResponse,
    ListResponse, MutationResponse, PointStatusRequest,
};
use crate::auth::AuthContextExt;
use crate::domain::{Application, ApplicationId, PointKey};
use crate::server::AppState;
use crate::workflow::StatusChangeRequest;

/// GET /api/v1/admin/applications - List applications, optionally by status.
pub async fn list_applications(
    State(state): State<AppState>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<Json<ListResponse<Application>>, ApiError> {
    let applications = state.verification.list_applications(query.status).await?;
    Ok(Json(applications.into()))
}

/// GET /api/v1/admin/applications/:id - Application, documents and point summary.
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationDetailResponse>, ApiError> {
    let (application, documents) = state
        .verification
        .application_with_documents(&ApplicationId::from_uuid(id))
        .await?;

    Ok(Json(ApplicationDetailResponse {
        tier_one_verified: application.verified_required_count(),
        points: application.points.summary(),
        application,
        documents,
    }))
}

/// PUT /api/v1/admin/applications/:id/points/:point - Verify or reject one point.
pub async fn set_point_status(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Path((id, point)): Path<(Uuid, PointKey)>,
    Json(request): Json<PointStatusRequest>,
) -> Result<Json<MutationResponse<Application>>, ApiError> {
    let admin = require_admin(&auth)?;
    let outcome = state
        .verification
        .set_point_status(admin, ApplicationId::from_uuid(id), point, request.status)
        .await?;
    Ok(Json(outcome.into()))
}

/// POST /api/v1/admin/applications/:id/status - Start review, approve or reject.
pub async fn change_application_status(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Path(id): Path<Uuid>,
    Json(request): Json<ApplicationStatusRequest>,
) -> Result<Json<MutationResponse<Application>>, ApiError> {
    let admin = require_admin(&auth)?;
    let outcome = state
        .verification
        .transition_application_status(
            admin,
            ApplicationId::from_uuid(id),
            request.status,
            StatusChangeRequest {
                admin_notes: request.admin_notes,
                selected_badges: request.selected_badges,
            },
        )
        .await?;
    Ok(Json(outcome.into()))
}

/// GET /api/v1/admin/applications/:id/audit - Audit trail for the application and its profile.
pub async fn get_application_audit_trail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AuditTrailResponse>, ApiError> {
    let entries = state
        .verification
        .review_trail(&ApplicationId::from_uuid(id))
        .await?;
    Ok(Json(AuditTrailResponse { entries }))
}
