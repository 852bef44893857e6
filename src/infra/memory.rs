//! In-memory implementations of the repository, audit and publisher traits
//!
//! Used by tests and local tooling; behaves like the PostgreSQL store with
//! last-write-wins saves and idempotent badge upserts.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{
    Application, ApplicationId, ApplicationStatus, BadgeLevel, Document, EntityType,
    PortfolioItem, Profile, ProfileId, Referral, ReferralId, ReferralStatus, UserBadge,
};

use super::{
    ApplicationRepository, AuditLog, AuditLogEntry, BadgeRepository, DocumentRepository,
    EventPublisher, Notification, PortfolioRepository, ProfileRepository, ReferralRepository,
    Result,
};

/// All workflow tables held in memory
#[derive(Default)]
pub struct InMemoryStore {
    profiles: RwLock<HashMap<ProfileId, Profile>>,
    applications: RwLock<HashMap<ApplicationId, Application>>,
    documents: RwLock<Vec<Document>>,
    portfolio: RwLock<Vec<PortfolioItem>>,
    badges: RwLock<HashMap<(ProfileId, BadgeLevel), UserBadge>>,
    referrals: RwLock<HashMap<ReferralId, Referral>>,
    audit: RwLock<Vec<AuditLogEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Portfolio items are written by the member-facing app, not the engines
    pub async fn add_portfolio_item(&self, item: PortfolioItem) {
        self.portfolio.write().await.push(item);
    }

    /// Every audit entry in insertion order
    pub async fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.audit.read().await.clone()
    }
}

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn get(&self, id: &ProfileId) -> Result<Option<Profile>> {
        Ok(self.profiles.read().await.get(id).cloned())
    }

    async fn save(&self, profile: &Profile) -> Result<()> {
        self.profiles
            .write()
            .await
            .insert(profile.id, profile.clone());
        Ok(())
    }

    async fn list_verified(&self) -> Result<Vec<Profile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.values().filter(|p| p.is_verified).cloned().collect())
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryStore {
    async fn get(&self, id: &ApplicationId) -> Result<Option<Application>> {
        Ok(self.applications.read().await.get(id).cloned())
    }

    async fn get_for_user(&self, user_id: &ProfileId) -> Result<Option<Application>> {
        let applications = self.applications.read().await;
        Ok(applications
            .values()
            .filter(|a| a.user_id == *user_id)
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn save(&self, application: &Application) -> Result<()> {
        self.applications
            .write()
            .await
            .insert(application.id, application.clone());
        Ok(())
    }

    async fn list(&self, status: Option<ApplicationStatus>) -> Result<Vec<Application>> {
        let applications = self.applications.read().await;
        let mut list: Vec<Application> = applications
            .values()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }
}

#[async_trait]
impl DocumentRepository for InMemoryStore {
    async fn insert(&self, document: &Document) -> Result<()> {
        self.documents.write().await.push(document.clone());
        Ok(())
    }

    async fn list_for_application(&self, application_id: &ApplicationId) -> Result<Vec<Document>> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|d| d.application_id == *application_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PortfolioRepository for InMemoryStore {
    async fn list_for_user(&self, user_id: &ProfileId) -> Result<Vec<PortfolioItem>> {
        let portfolio = self.portfolio.read().await;
        Ok(portfolio
            .iter()
            .filter(|p| p.user_id == *user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BadgeRepository for InMemoryStore {
    async fn upsert(&self, badge: &UserBadge) -> Result<()> {
        self.badges
            .write()
            .await
            .insert((badge.user_id, badge.badge_level), badge.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: &ProfileId) -> Result<Vec<UserBadge>> {
        let badges = self.badges.read().await;
        let mut list: Vec<UserBadge> = badges
            .values()
            .filter(|b| b.user_id == *user_id)
            .cloned()
            .collect();
        list.sort_by_key(|b| b.granted_at);
        Ok(list)
    }
}

#[async_trait]
impl ReferralRepository for InMemoryStore {
    async fn get(&self, id: &ReferralId) -> Result<Option<Referral>> {
        Ok(self.referrals.read().await.get(id).cloned())
    }

    async fn save(&self, referral: &Referral) -> Result<()> {
        self.referrals
            .write()
            .await
            .insert(referral.id, referral.clone());
        Ok(())
    }

    async fn list(&self, status: Option<ReferralStatus>) -> Result<Vec<Referral>> {
        let referrals = self.referrals.read().await;
        let mut list: Vec<Referral> = referrals
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }
}

#[async_trait]
impl AuditLog for InMemoryStore {
    async fn append(&self, entry: &AuditLogEntry) -> Result<()> {
        self.audit.write().await.push(entry.clone());
        Ok(())
    }

    async fn for_entity(
        &self,
        entity_type: EntityType,
        entity_id: uuid::Uuid,
    ) -> Result<Vec<AuditLogEntry>> {
        let audit = self.audit.read().await;
        Ok(audit
            .iter()
            .rev()
            .filter(|e| e.entity_type == entity_type && e.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn for_review_subject(
        &self,
        application_id: &ApplicationId,
        profile_id: &ProfileId,
    ) -> Result<Vec<AuditLogEntry>> {
        let audit = self.audit.read().await;
        Ok(audit
            .iter()
            .rev()
            .filter(|e| {
                (e.entity_type == EntityType::Application && e.entity_id == application_id.0)
                    || (e.entity_type == EntityType::Profile && e.entity_id == profile_id.0)
            })
            .cloned()
            .collect())
    }
}

/// Publisher that records every notification it is given
#[derive(Default)]
pub struct RecordingPublisher {
    published: RwLock<Vec<Notification>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn published(&self) -> Vec<Notification> {
        self.published.read().await.clone()
    }

    pub async fn kinds(&self) -> Vec<&'static str> {
        self.published.read().await.iter().map(|n| n.kind()).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, notification: &Notification) -> Result<()> {
        self.published.write().await.push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AdminId;
    use chrono::Utc;

    #[tokio::test]
    async fn test_badge_upsert_is_idempotent() {
        let store = InMemoryStore::new();
        let user_id = ProfileId::new();
        let badge = UserBadge {
            user_id,
            badge_level: BadgeLevel::Vetted,
            granted_by: AdminId::system(),
            granted_at: Utc::now(),
        };

        store.upsert(&badge).await.unwrap();
        store.upsert(&badge).await.unwrap();

        assert_eq!(BadgeRepository::list_for_user(&store, &user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_review_subject_filter_matches_either_scope() {
        use crate::infra::{AuditAction, AuditLogBuilder};

        let store = InMemoryStore::new();
        let application_id = ApplicationId::new();
        let profile_id = ProfileId::new();

        for entry in [
            AuditLogBuilder::new(AdminId::system(), AuditAction::VerifiedPoint)
                .application(&application_id)
                .build(),
            AuditLogBuilder::new(AdminId::system(), AuditAction::MarkedPaid)
                .profile(&profile_id)
                .build(),
            AuditLogBuilder::new(AdminId::system(), AuditAction::MarkedPaid)
                .profile(&ProfileId::new())
                .build(),
            // profile-scoped id space must not leak into application scope
            AuditLogBuilder::new(AdminId::system(), AuditAction::VerifiedPoint)
                .entity(EntityType::Application, profile_id.0)
                .build(),
        ] {
            store.append(&entry).await.unwrap();
        }

        let entries = store
            .for_review_subject(&application_id, &profile_id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::MarkedPaid);
    }
}
