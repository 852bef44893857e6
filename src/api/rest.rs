//! REST API endpoints for the Proclusive workflow service.

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;

use super::handlers::*;
use crate::auth::{admin_middleware, auth_middleware, AuthMiddlewareState};
use crate::server::AppState;

/// Build the `/api` router.
pub fn router(auth: AuthMiddlewareState) -> Router<AppState> {
    Router::new()
        .nest(
            "/v1/admin",
            admin_router().route_layer(from_fn_with_state(auth.clone(), admin_middleware)),
        )
        .nest(
            "/v1/member",
            member_router().route_layer(from_fn_with_state(auth, auth_middleware)),
        )
}

fn admin_router() -> Router<AppState> {
    Router::new()
        // Verification review
        .route("/applications", get(list_applications))
        .route("/applications/:id", get(get_application))
        .route("/applications/:id/points/:point", put(set_point_status))
        .route("/applications/:id/status", post(change_application_status))
        .route("/applications/:id/audit", get(get_application_audit_trail))
        // Referral pipeline
        .route("/referrals", get(list_referrals))
        .route("/referrals/:id", get(get_referral))
        .route("/referrals/:id/advance", post(advance_referral))
        .route("/referrals/:id/transition", post(transition_referral))
        .route("/referrals/:id/commission", get(get_referral_commission))
        // Members
        .route("/profiles/:id", get(get_profile).patch(update_profile))
        .route("/profiles/:id/payment", post(record_payment))
        // Audit and consistency
        .route("/audit-log", get(get_audit_log))
        .route("/reconcile", get(scan_approvals))
        .route("/reconcile/repair", post(repair_approvals))
}

fn member_router() -> Router<AppState> {
    Router::new()
        .route("/application", post(submit_application))
        .route("/referrals", post(submit_referral))
}
