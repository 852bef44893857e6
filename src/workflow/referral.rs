//! Referral workflow engine
//!
//! Referrals move strictly forward through
//! `SUBMITTED -> REVIEWED -> MATCHED -> ENGAGED -> COMPLETED`.
//! Each stage stamps its own fields; `admin_notes` on the row holds the
//! notes of the latest transition while each stage's notes are kept in the
//! audit entry for that stage.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::domain::{
    commission::parse_currency, AdminId, CommissionBreakdown, EntityType, NewReferral, ProfileId,
    Referral, ReferralId, ReferralStatus,
};
use crate::infra::{AuditAction, AuditLogBuilder, Notification, Result, WorkflowError};
use crate::metrics::{metric_names, MetricsRegistry};

use super::{non_empty, Repositories, SideEffectDispatcher, TransitionOutcome};

/// Admin input for a referral transition
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdvanceRequest {
    /// Required when the referral lands on MATCHED
    #[serde(default)]
    pub matched_member_id: Option<String>,
    /// Optional when the referral lands on COMPLETED; must parse as an amount
    #[serde(default)]
    pub final_value: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

impl AdvanceRequest {
    pub fn matched(member_id: impl ToString) -> Self {
        Self {
            matched_member_id: Some(member_id.to_string()),
            ..Self::default()
        }
    }

    pub fn completed(final_value: impl Into<String>) -> Self {
        Self {
            final_value: Some(final_value.into()),
            ..Self::default()
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.admin_notes = Some(notes.into());
        self
    }
}

/// Drives referrals through their five stages
pub struct ReferralWorkflow {
    repos: Repositories,
    dispatcher: Arc<SideEffectDispatcher>,
    metrics: Arc<MetricsRegistry>,
}

impl ReferralWorkflow {
    pub fn new(
        repos: Repositories,
        dispatcher: Arc<SideEffectDispatcher>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            repos,
            dispatcher,
            metrics,
        }
    }

    async fn load(&self, referral_id: &ReferralId) -> Result<Referral> {
        self.repos
            .referrals
            .get(referral_id)
            .await?
            .ok_or(WorkflowError::ReferralNotFound(*referral_id))
    }

    /// A member submits a new referral
    #[instrument(skip(self, details), fields(submitted_by = %submitted_by))]
    pub async fn submit(&self, submitted_by: ProfileId, details: NewReferral) -> Result<Referral> {
        if details.client_name.trim().is_empty() {
            return Err(WorkflowError::validation("client_name", "client name is required"));
        }
        if details.project_description.trim().is_empty() {
            return Err(WorkflowError::validation(
                "project_description",
                "project description is required",
            ));
        }
        if let Some(terms) = details.commission_terms {
            crate::domain::CommissionTerms::custom(terms.referrer_rate())
                .map_err(|e| WorkflowError::validation("commission_terms", e))?;
        }

        self.repos
            .profiles
            .get(&submitted_by)
            .await?
            .ok_or(WorkflowError::ProfileNotFound(submitted_by))?;

        let referral = Referral::new(submitted_by, details);
        self.repos.referrals.save(&referral).await?;

        info!(referral_id = %referral.id, "Referral submitted");
        self.metrics
            .inc_counter(metric_names::REFERRALS_SUBMITTED)
            .await;

        Ok(referral)
    }

    /// Move the referral to the next stage
    #[instrument(skip(self, request), fields(admin_id = %admin, referral_id = %referral_id))]
    pub async fn advance(
        &self,
        admin: AdminId,
        referral_id: ReferralId,
        request: AdvanceRequest,
    ) -> Result<TransitionOutcome<Referral>> {
        let referral = self.load(&referral_id).await?;
        let Some(target) = referral.status.next() else {
            return Err(self.rejected_transition(&referral, "none").await);
        };
        self.apply(admin, referral, target, request).await
    }

    /// Move the referral to `target`, which must be the immediate successor
    /// of its current stage
    #[instrument(skip(self, request), fields(admin_id = %admin, referral_id = %referral_id))]
    pub async fn transition_to(
        &self,
        admin: AdminId,
        referral_id: ReferralId,
        target: ReferralStatus,
        request: AdvanceRequest,
    ) -> Result<TransitionOutcome<Referral>> {
        let referral = self.load(&referral_id).await?;
        if !referral.status.can_transition_to(target) {
            return Err(self.rejected_transition(&referral, target).await);
        }
        self.apply(admin, referral, target, request).await
    }

    pub async fn get(&self, referral_id: &ReferralId) -> Result<Referral> {
        self.load(referral_id).await
    }

    pub async fn list(&self, status: Option<ReferralStatus>) -> Result<Vec<Referral>> {
        self.repos.referrals.list(status).await
    }

    /// Commission owed on a completed referral
    pub async fn commission(
        &self,
        referral_id: &ReferralId,
    ) -> Result<Option<CommissionBreakdown>> {
        Ok(self.load(referral_id).await?.commission_due())
    }

    async fn rejected_transition(&self, referral: &Referral, to: impl ToString) -> WorkflowError {
        self.metrics
            .inc_counter(metric_names::TRANSITION_ERRORS)
            .await;
        WorkflowError::invalid_transition(
            EntityType::Referral.as_str(),
            referral.id,
            referral.status,
            to,
        )
    }

    async fn apply(
        &self,
        admin: AdminId,
        mut referral: Referral,
        target: ReferralStatus,
        request: AdvanceRequest,
    ) -> Result<TransitionOutcome<Referral>> {
        let now = Utc::now();

        match target {
            ReferralStatus::Reviewed => {
                referral.reviewed_by = Some(admin);
                referral.reviewed_at = Some(now);
            }
            ReferralStatus::Matched => {
                let member = self.matched_member(&request).await?;
                referral.matched_to = Some(member);
                referral.matched_at = Some(now);
            }
            ReferralStatus::Engaged => {
                referral.engaged_at = Some(now);
            }
            ReferralStatus::Completed => {
                if let Some(value) = non_empty(request.final_value.as_deref()) {
                    if let Err(e) = parse_currency(&value) {
                        self.metrics
                            .inc_counter(metric_names::VALIDATION_ERRORS)
                            .await;
                        return Err(WorkflowError::validation("final_value", e));
                    }
                    referral.final_value = Some(value);
                }
                referral.completed_at = Some(now);
            }
            ReferralStatus::Submitted => {
                return Err(self.rejected_transition(&referral, target).await);
            }
        }

        let notes = non_empty(request.admin_notes.as_deref());
        referral.status = target;
        referral.admin_notes = notes.clone();
        referral.updated_at = now;
        self.repos.referrals.save(&referral).await?;

        info!(status = %target, matched_to = ?referral.matched_to, "Referral advanced");
        self.metrics
            .inc_counter(metric_names::REFERRAL_TRANSITIONS)
            .await;
        if target == ReferralStatus::Completed {
            self.metrics
                .inc_counter(metric_names::REFERRALS_COMPLETED)
                .await;
        }

        let entry = AuditLogBuilder::new(admin, AuditAction::Referral(target))
            .entity(EntityType::Referral, referral.id.0)
            .details(json!({
                "new_status": target,
                "matched_to": referral.matched_to,
                "final_value": referral.final_value,
                "admin_notes": notes,
            }))
            .build();
        let side_effects = self
            .dispatcher
            .dispatch(entry, notifications_for(&referral))
            .await;

        Ok(TransitionOutcome {
            entity: referral,
            side_effects,
        })
    }

    async fn matched_member(&self, request: &AdvanceRequest) -> Result<ProfileId> {
        let Some(raw) = non_empty(request.matched_member_id.as_deref()) else {
            self.metrics
                .inc_counter(metric_names::VALIDATION_ERRORS)
                .await;
            return Err(WorkflowError::validation(
                "matched_member_id",
                "a member must be selected to match this referral",
            ));
        };
        let member: ProfileId = raw.parse().map_err(|_| {
            WorkflowError::validation("matched_member_id", format!("not a member id: {raw}"))
        })?;

        self.repos
            .profiles
            .get(&member)
            .await?
            .ok_or(WorkflowError::ProfileNotFound(member))?;
        Ok(member)
    }
}

/// Notifications owed for the stage the referral just reached
fn notifications_for(referral: &Referral) -> Vec<Notification> {
    match referral.status {
        ReferralStatus::Submitted => Vec::new(),
        ReferralStatus::Matched => referral
            .matched_to
            .map(|matched_to| Notification::ReferralMatched {
                referral_id: referral.id,
                matched_to,
            })
            .into_iter()
            .collect(),
        ReferralStatus::Reviewed | ReferralStatus::Engaged => {
            vec![Notification::ReferralStatusChanged {
                referral_id: referral.id,
                submitted_by: referral.submitted_by,
                status: referral.status,
            }]
        }
        ReferralStatus::Completed => vec![Notification::ReferralCompleted {
            referral_id: referral.id,
            submitted_by: referral.submitted_by,
            matched_to: referral.matched_to,
            final_value: referral.final_value.clone(),
        }],
    }
}
