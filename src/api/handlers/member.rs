//! Member-facing handlers. The caller acts on their own profile.

use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::auth::AuthContextExt;
use crate::domain::{Application, NewReferral, Referral};
use crate::server::AppState;
use crate::workflow::ApplicationSubmission;

/// POST /api/v1/member/application - Submit or re-submit the caller's application.
pub async fn submit_application(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Json(submission): Json<ApplicationSubmission>,
) -> Result<(StatusCode, Json<Application>), ApiError> {
    let application = state
        .intake
        .submit(auth.profile_id(), submission)
        .await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// POST /api/v1/member/referrals - Pass a lead to the network.
pub async fn submit_referral(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Json(details): Json<NewReferral>,
) -> Result<(StatusCode, Json<Referral>), ApiError> {
    let referral = state.referrals.submit(auth.profile_id(), details).await?;
    Ok((StatusCode::CREATED, Json(referral)))
}
