//! Admin-driven workflow engines
//!
//! Every operation follows the same shape: validate, persist, then hand the
//! audit entry and any notifications to the [`SideEffectDispatcher`]. Side
//! effects run after the write and never undo it.

mod dispatch;
mod intake;
mod listing;
mod membership;
mod reconcile;
mod referral;
mod verification;

pub use dispatch::{DispatchReport, SideEffectDispatcher, SideEffectStatus};
pub use intake::{ApplicationIntake, ApplicationSubmission, DocumentUpload};
pub use listing::{ListLoader, LoadOutcome, LoadState};
pub use membership::MembershipService;
pub use reconcile::{ApprovalReconciler, Finding, FindingKind, ReconcileReport};
pub use referral::{AdvanceRequest, ReferralWorkflow};
pub use verification::{StatusChangeRequest, VerificationEngine};

use std::sync::Arc;

use sqlx::PgPool;

use crate::infra::{
    ApplicationRepository, BadgeRepository, DocumentRepository, InMemoryStore,
    PgApplicationStore, PgMemberStore, PgReferralStore, PortfolioRepository, ProfileRepository,
    ReferralRepository,
};

/// Storage handles shared by the engines
#[derive(Clone)]
pub struct Repositories {
    pub profiles: Arc<dyn ProfileRepository>,
    pub applications: Arc<dyn ApplicationRepository>,
    pub documents: Arc<dyn DocumentRepository>,
    pub portfolio: Arc<dyn PortfolioRepository>,
    pub badges: Arc<dyn BadgeRepository>,
    pub referrals: Arc<dyn ReferralRepository>,
}

impl Repositories {
    /// Every repository backed by one in-memory store
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            profiles: store.clone(),
            applications: store.clone(),
            documents: store.clone(),
            portfolio: store.clone(),
            badges: store.clone(),
            referrals: store,
        }
    }

    /// PostgreSQL-backed repositories sharing one pool
    pub fn postgres(pool: PgPool) -> Self {
        let members = Arc::new(PgMemberStore::new(pool.clone()));
        let applications = Arc::new(PgApplicationStore::new(pool.clone()));
        Self {
            profiles: members.clone(),
            applications: applications.clone(),
            documents: applications,
            portfolio: members.clone(),
            badges: members,
            referrals: Arc::new(PgReferralStore::new(pool)),
        }
    }
}

/// Result of a committed transition: the entity as persisted plus what
/// happened to its side effects
#[derive(Debug, Clone)]
pub struct TransitionOutcome<T> {
    pub entity: T,
    pub side_effects: DispatchReport,
}

/// Trim and drop empty admin input
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
