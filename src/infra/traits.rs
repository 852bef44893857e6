//! Persistence and notification contracts consumed by the workflow engines
//!
//! Rows are fetched by id or owner, saved by primary key, and badges are
//! upserted on their `(user_id, badge_level)` key. Last write wins.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{
    Application, ApplicationId, ApplicationStatus, Document, EntityType, PortfolioItem, Profile,
    ProfileId, Referral, ReferralId, ReferralStatus, UserBadge,
};

use super::{AuditLogEntry, Notification, Result};

/// Member profiles
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get(&self, id: &ProfileId) -> Result<Option<Profile>>;

    /// Insert or replace the profile row
    async fn save(&self, profile: &Profile) -> Result<()>;

    /// Profiles flagged verified
    async fn list_verified(&self) -> Result<Vec<Profile>>;
}

/// Membership applications
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn get(&self, id: &ApplicationId) -> Result<Option<Application>>;

    /// The member's current application, if any
    async fn get_for_user(&self, user_id: &ProfileId) -> Result<Option<Application>>;

    /// Insert or replace the application row
    async fn save(&self, application: &Application) -> Result<()>;

    /// Applications ordered newest first, optionally filtered by status
    async fn list(&self, status: Option<ApplicationStatus>) -> Result<Vec<Application>>;
}

/// Application documents (append-only)
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn insert(&self, document: &Document) -> Result<()>;

    async fn list_for_application(&self, application_id: &ApplicationId) -> Result<Vec<Document>>;
}

/// Portfolio items belong to the profile and survive re-applications
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PortfolioRepository: Send + Sync {
    async fn list_for_user(&self, user_id: &ProfileId) -> Result<Vec<PortfolioItem>>;
}

/// Granted badges
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BadgeRepository: Send + Sync {
    /// Idempotent on `(user_id, badge_level)`
    async fn upsert(&self, badge: &UserBadge) -> Result<()>;

    async fn list_for_user(&self, user_id: &ProfileId) -> Result<Vec<UserBadge>>;
}

/// Referrals
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReferralRepository: Send + Sync {
    async fn get(&self, id: &ReferralId) -> Result<Option<Referral>>;

    /// Insert or replace the referral row
    async fn save(&self, referral: &Referral) -> Result<()>;

    /// Referrals ordered newest first, optionally filtered by status
    async fn list(&self, status: Option<ReferralStatus>) -> Result<Vec<Referral>>;
}

/// Append-only admin audit trail.
///
/// Invariant: entries are never updated or deleted.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: &AuditLogEntry) -> Result<()>;

    /// Entries for one entity, newest first
    async fn for_entity(&self, entity_type: EntityType, entity_id: uuid::Uuid)
        -> Result<Vec<AuditLogEntry>>;

    /// Entries scoped to either the application or the applicant's profile,
    /// newest first. Used for the review screen of one applicant.
    async fn for_review_subject(
        &self,
        application_id: &ApplicationId,
        profile_id: &ProfileId,
    ) -> Result<Vec<AuditLogEntry>>;
}

/// Outbound notification channel (transactional email).
///
/// Implementations must be safe to retry: the same notification may be
/// published more than once.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, notification: &Notification) -> Result<()>;
}
