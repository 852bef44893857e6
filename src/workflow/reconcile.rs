//! Detection and repair of half-applied approvals
//!
//! Approval is two independent writes (profile, then application) with no
//! transaction around them. This job finds rows that disagree:
//!
//! - an approved application whose profile is not verified. Repairable: the
//!   badge is recomputed from the member's `user_badges` rows.
//! - a verified profile with no approved application. Reported only, since
//!   the admin's intent cannot be recovered.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::{
    highest_badge, AdminId, ApplicationId, ApplicationStatus, BadgeLevel, ProfileId,
};
use crate::infra::{AuditAction, AuditLogBuilder, Result};
use crate::metrics::{metric_names, MetricsRegistry};

use super::{Repositories, SideEffectDispatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    ApprovedButUnverified,
    VerifiedWithoutApproval,
}

/// One inconsistent member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub profile_id: ProfileId,
    pub application_id: Option<ApplicationId>,
    pub application_status: Option<ApplicationStatus>,
}

impl Finding {
    pub fn repairable(&self) -> bool {
        self.kind == FindingKind::ApprovedButUnverified
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub findings: Vec<Finding>,
    pub repaired: usize,
}

impl ReconcileReport {
    pub fn is_consistent(&self) -> bool {
        self.findings.is_empty()
    }
}

pub struct ApprovalReconciler {
    repos: Repositories,
    dispatcher: Arc<SideEffectDispatcher>,
    metrics: Arc<MetricsRegistry>,
}

impl ApprovalReconciler {
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

    /// Report inconsistencies without writing anything
    pub async fn scan(&self) -> Result<ReconcileReport> {
        let mut findings = Vec::new();

        for application in self
            .repos
            .applications
            .list(Some(ApplicationStatus::Approved))
            .await?
        {
            match self.repos.profiles.get(&application.user_id).await? {
                Some(profile) if !profile.is_verified => findings.push(Finding {
                    kind: FindingKind::ApprovedButUnverified,
                    profile_id: profile.id,
                    application_id: Some(application.id),
                    application_status: Some(application.status),
                }),
                Some(_) => {}
                None => warn!(
                    application_id = %application.id,
                    user_id = %application.user_id,
                    "Approved application has no profile"
                ),
            }
        }

        for profile in self.repos.profiles.list_verified().await? {
            let application = self.repos.applications.get_for_user(&profile.id).await?;
            if application
                .as_ref()
                .is_some_and(|a| a.status == ApplicationStatus::Approved)
            {
                continue;
            }
            findings.push(Finding {
                kind: FindingKind::VerifiedWithoutApproval,
                profile_id: profile.id,
                application_id: application.as_ref().map(|a| a.id),
                application_status: application.as_ref().map(|a| a.status),
            });
        }

        self.metrics
            .add_counter(metric_names::RECONCILE_FINDINGS, findings.len() as u64)
            .await;
        info!(findings = findings.len(), "Approval reconciliation scan complete");

        Ok(ReconcileReport {
            findings,
            repaired: 0,
        })
    }

    /// Scan, then re-apply profile verification for every repairable finding
    pub async fn repair(&self, admin: AdminId) -> Result<ReconcileReport> {
        let mut report = self.scan().await?;

        for finding in report.findings.iter().filter(|f| f.repairable()) {
            let Some(mut profile) = self.repos.profiles.get(&finding.profile_id).await? else {
                continue;
            };
            let badges: Vec<BadgeLevel> = self
                .repos
                .badges
                .list_for_user(&profile.id)
                .await?
                .into_iter()
                .map(|b| b.badge_level)
                .collect();
            let badge_level = highest_badge(&badges);

            let approved_at = match finding.application_id {
                Some(id) => self
                    .repos
                    .applications
                    .get(&id)
                    .await?
                    .and_then(|a| a.reviewed_at),
                None => None,
            };

            let now = Utc::now();
            profile.is_verified = true;
            profile.badge_level = badge_level;
            profile.verification_completed_at = Some(approved_at.unwrap_or(now));
            profile.approved_at = Some(approved_at.unwrap_or(now));
            profile.updated_at = now;
            self.repos.profiles.save(&profile).await?;
            report.repaired += 1;

            info!(
                profile_id = %profile.id,
                badge_level = %badge_level,
                "Profile verification re-applied"
            );

            let entry = AuditLogBuilder::new(admin, AuditAction::BadgeReconciled)
                .profile(&profile.id)
                .details(json!({
                    "application_id": finding.application_id,
                    "badge_level": badge_level,
                }))
                .build();
            self.dispatcher.dispatch(entry, Vec::new()).await;
        }

        self.metrics
            .add_counter(metric_names::RECONCILE_REPAIRS, report.repaired as u64)
            .await;

        Ok(report)
    }
}
