//! Admin operations on member profiles

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

use crate::domain::{AdminId, Profile, ProfileId, ProfileUpdate};
use crate::infra::{AuditAction, AuditLogBuilder, Result, WorkflowError};

use super::{DispatchReport, Repositories, SideEffectDispatcher, TransitionOutcome};

pub struct MembershipService {
    repos: Repositories,
    dispatcher: Arc<SideEffectDispatcher>,
}

impl MembershipService {
    pub fn new(repos: Repositories, dispatcher: Arc<SideEffectDispatcher>) -> Self {
        Self { repos, dispatcher }
    }

    async fn load(&self, profile_id: &ProfileId) -> Result<Profile> {
        self.repos
            .profiles
            .get(profile_id)
            .await?
            .ok_or(WorkflowError::ProfileNotFound(*profile_id))
    }

    /// Mark the member's dues as paid. Keeps the original `paid_at` when
    /// already paid.
    #[instrument(skip(self), fields(admin_id = %admin, profile_id = %profile_id))]
    pub async fn record_payment(
        &self,
        admin: AdminId,
        profile_id: ProfileId,
    ) -> Result<TransitionOutcome<Profile>> {
        let mut profile = self.load(&profile_id).await?;

        let now = Utc::now();
        let already_paid = profile.is_paid;
        if !already_paid {
            profile.is_paid = true;
            profile.paid_at = Some(now);
            profile.updated_at = now;
            self.repos.profiles.save(&profile).await?;
            info!("Payment recorded");
        }

        let entry = AuditLogBuilder::new(admin, AuditAction::MarkedPaid)
            .profile(&profile_id)
            .details(json!({ "paid_at": profile.paid_at, "already_paid": already_paid }))
            .build();
        let side_effects = self.dispatcher.dispatch(entry, Vec::new()).await;

        Ok(TransitionOutcome {
            entity: profile,
            side_effects,
        })
    }

    /// Apply an admin edit to the member's identity fields. No write and no
    /// audit entry when nothing changed.
    #[instrument(skip(self, update), fields(admin_id = %admin, profile_id = %profile_id))]
    pub async fn edit_profile(
        &self,
        admin: AdminId,
        profile_id: ProfileId,
        update: ProfileUpdate,
    ) -> Result<TransitionOutcome<Profile>> {
        for (field, value) in [("full_name", &update.full_name), ("email", &update.email)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(WorkflowError::validation(field, "cannot be empty"));
            }
        }

        let mut profile = self.load(&profile_id).await?;
        let changed = profile.apply_update(&update);
        if changed.is_empty() {
            return Ok(TransitionOutcome {
                entity: profile,
                side_effects: DispatchReport::default(),
            });
        }

        self.repos.profiles.save(&profile).await?;
        info!(fields = ?changed, "Profile updated");

        let entry = AuditLogBuilder::new(admin, AuditAction::ProfileUpdated)
            .profile(&profile_id)
            .details(json!({ "fields": changed }))
            .build();
        let side_effects = self.dispatcher.dispatch(entry, Vec::new()).await;

        Ok(TransitionOutcome {
            entity: profile,
            side_effects,
        })
    }

    pub async fn get(&self, profile_id: &ProfileId) -> Result<Profile> {
        self.load(profile_id).await
    }
}
