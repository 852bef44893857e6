//! Member profile handlers.

use axum::extract::{Extension, Path, State};
use axum::Json;
use uuid::Uuid;

use crate::api::auth_helpers::require_admin;
use crate::api::error::ApiError;
use crate::api::types::MutationResponse;
use crate::auth::AuthContextExt;
use crate::domain::{Profile, ProfileId, ProfileUpdate};
use crate::server::AppState;

/// GET /api/v1/admin/profiles/:id
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, ApiError> {
    let profile = state.membership.get(&ProfileId::from_uuid(id)).await?;
    Ok(Json(profile))
}

/// POST /api/v1/admin/profiles/:id/payment - Mark membership dues paid.
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Path(id): Path<Uuid>,
) -> Result<Json<MutationResponse<Profile>>, ApiError> {
    let admin = require_admin(&auth)?;
    let outcome = state
        .membership
        .record_payment(admin, ProfileId::from_uuid(id))
        .await?;
    Ok(Json(outcome.into()))
}

/// PATCH /api/v1/admin/profiles/:id
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Path(id): Path<Uuid>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<MutationResponse<Profile>>, ApiError> {
    let admin = require_admin(&auth)?;
    let outcome = state
        .membership
        .edit_profile(admin, ProfileId::from_uuid(id), update)
        .await?;
    Ok(Json(outcome.into()))
}
