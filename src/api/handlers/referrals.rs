//! Referral pipeline handlers.

use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use uuid::Uuid;

use crate::api::auth_helpers::require_admin;
use crate::api::error::ApiError;
use crate::api::types::{
    CommissionResponse, ListResponse, MutationResponse, ReferralListQuery,
    ReferralTransitionRequest,
};
use crate::auth::AuthContextExt;
use crate::domain::{Referral, ReferralId};
use crate::server::AppState;
use crate::workflow::AdvanceRequest;

/// GET /api/v1/admin/referrals - List referrals, optionally by stage.
pub async fn list_referrals(
    State(state): State<AppState>,
    Query(query): Query<ReferralListQuery>,
) -> Result<Json<ListResponse<Referral>>, ApiError> {
    let referrals = state.referrals.list(query.status).await?;
    Ok(Json(referrals.into()))
}

/// GET /api/v1/admin/referrals/:id
pub async fn get_referral(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Referral>, ApiError> {
    let referral = state.referrals.get(&ReferralId::from_uuid(id)).await?;
    Ok(Json(referral))
}

/// POST /api/v1/admin/referrals/:id/advance - Move to the next stage.
pub async fn advance_referral(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Path(id): Path<Uuid>,
    Json(request): Json<AdvanceRequest>,
) -> Result<Json<MutationResponse<Referral>>, ApiError> {
    let admin = require_admin(&auth)?;
    let outcome = state
        .referrals
        .advance(admin, ReferralId::from_uuid(id), request)
        .await?;
    Ok(Json(outcome.into()))
}

/// POST /api/v1/admin/referrals/:id/transition - Move to an explicit stage.
pub async fn transition_referral(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Path(id): Path<Uuid>,
    Json(body): Json<ReferralTransitionRequest>,
) -> Result<Json<MutationResponse<Referral>>, ApiError> {
    let admin = require_admin(&auth)?;
    let outcome = state
        .referrals
        .transition_to(admin, ReferralId::from_uuid(id), body.status, body.request)
        .await?;
    Ok(Json(outcome.into()))
}

/// GET /api/v1/admin/referrals/:id/commission
pub async fn get_referral_commission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommissionResponse>, ApiError> {
    let referral_id = ReferralId::from_uuid(id);
    let commission = state.referrals.commission(&referral_id).await?;
    Ok(Json(CommissionResponse {
        referral_id,
        commission,
    }))
}
