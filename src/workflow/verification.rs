//! Verification engine
//!
//! Admin review of membership applications. Each of the eight verification
//! points moves independently from `not_submitted`/`pending` to `verified`
//! or `rejected`; the application status is changed separately and approval
//! drives profile verification and badge grants.
//!
//! Approval writes in a fixed order: profile, badges, application, audit,
//! notification. A failed profile write aborts before the application is
//! touched. A failure after the profile write leaves a verified profile with
//! a non-approved application, which [`super::ApprovalReconciler`] reports.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::domain::{
    highest_badge, AdminId, Application, ApplicationId, ApplicationStatus, BadgeLevel, PointKey,
    PointOutcome, PointStatus, UserBadge,
};
use crate::infra::{
    AuditAction, AuditLogBuilder, AuditLogEntry, Notification, Result, WorkflowError,
};
use crate::metrics::{metric_names, MetricsRegistry};

use super::{non_empty, Repositories, SideEffectDispatcher, TransitionOutcome};

/// Admin input for an application status change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusChangeRequest {
    #[serde(default)]
    pub admin_notes: Option<String>,
    /// Badges to grant on approval, in the order the admin selected them
    #[serde(default)]
    pub selected_badges: Vec<BadgeLevel>,
}

impl StatusChangeRequest {
    pub fn approve(selected_badges: Vec<BadgeLevel>) -> Self {
        Self {
            admin_notes: None,
            selected_badges,
        }
    }

    pub fn reject(notes: impl Into<String>) -> Self {
        Self {
            admin_notes: Some(notes.into()),
            selected_badges: Vec::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.admin_notes = Some(notes.into());
        self
    }
}

/// Reviews verification points and moves applications between statuses
pub struct VerificationEngine {
    repos: Repositories,
    dispatcher: Arc<SideEffectDispatcher>,
    metrics: Arc<MetricsRegistry>,
}

impl VerificationEngine {
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

    async fn load(&self, application_id: &ApplicationId) -> Result<Application> {
        self.repos
            .applications
            .get(application_id)
            .await?
            .ok_or(WorkflowError::ApplicationNotFound(*application_id))
    }

    /// Mark one verification point verified or rejected.
    ///
    /// Only `pending` and `not_submitted` points can be reviewed. The
    /// application status is left unchanged.
    #[instrument(skip(self), fields(admin_id = %admin, application_id = %application_id))]
    pub async fn set_point_status(
        &self,
        admin: AdminId,
        application_id: ApplicationId,
        point: PointKey,
        outcome: PointOutcome,
    ) -> Result<TransitionOutcome<Application>> {
        let mut application = self.load(&application_id).await?;

        let current = application.points.get(point);
        let next: PointStatus = outcome.into();
        if !current.is_reviewable() {
            self.metrics
                .inc_counter(metric_names::TRANSITION_ERRORS)
                .await;
            return Err(WorkflowError::invalid_transition(
                "application_point",
                format!("{application_id}/{point}"),
                current,
                next,
            ));
        }

        let now = Utc::now();
        application.points.set(point, next);
        application.reviewed_by = Some(admin);
        application.reviewed_at = Some(now);
        application.updated_at = now;
        self.repos.applications.save(&application).await?;

        info!(point = %point, status = %next, "Verification point reviewed");
        self.metrics.inc_counter(metric_names::POINTS_REVIEWED).await;

        let entry = AuditLogBuilder::new(admin, AuditAction::VerifiedPoint)
            .application(&application_id)
            .details(json!({ "point": point, "status": next }))
            .build();
        let side_effects = self.dispatcher.dispatch(entry, Vec::new()).await;

        Ok(TransitionOutcome {
            entity: application,
            side_effects,
        })
    }

    /// Move an application to `under_review`, `approved` or `rejected`
    #[instrument(skip(self, request), fields(admin_id = %admin, application_id = %application_id))]
    pub async fn transition_application_status(
        &self,
        admin: AdminId,
        application_id: ApplicationId,
        new_status: ApplicationStatus,
        request: StatusChangeRequest,
    ) -> Result<TransitionOutcome<Application>> {
        let mut application = self.load(&application_id).await?;

        if !application.status.can_admin_transition(new_status) {
            self.metrics
                .inc_counter(metric_names::TRANSITION_ERRORS)
                .await;
            return Err(WorkflowError::invalid_transition(
                "application",
                application_id,
                application.status,
                new_status,
            ));
        }

        let notes = non_empty(request.admin_notes.as_deref());
        let (entry, notifications) = match new_status {
            ApplicationStatus::Approved => {
                self.approve(admin, &mut application, notes, &request.selected_badges)
                    .await?
            }
            ApplicationStatus::Rejected => self.reject(admin, &mut application, notes).await?,
            ApplicationStatus::UnderReview => {
                self.start_review(admin, &mut application, notes).await?
            }
            ApplicationStatus::Pending => {
                return Err(WorkflowError::invalid_transition(
                    "application",
                    application_id,
                    application.status,
                    new_status,
                ))
            }
        };

        info!(status = %new_status, "Application status changed");
        let side_effects = self.dispatcher.dispatch(entry, notifications).await;

        Ok(TransitionOutcome {
            entity: application,
            side_effects,
        })
    }

    async fn approve(
        &self,
        admin: AdminId,
        application: &mut Application,
        notes: Option<String>,
        selected: &[BadgeLevel],
    ) -> Result<(AuditLogEntry, Vec<Notification>)> {
        let rejected = application.rejected_required_points();
        if !rejected.is_empty() {
            self.metrics
                .inc_counter(metric_names::TRANSITION_ERRORS)
                .await;
            let keys: Vec<&str> = rejected.iter().map(PointKey::as_str).collect();
            return Err(WorkflowError::InvariantViolation {
                invariant: "approval_requires_no_rejected_required_point".to_string(),
                message: format!("required points rejected: {}", keys.join(", ")),
            });
        }

        let mut profile = self
            .repos
            .profiles
            .get(&application.user_id)
            .await?
            .ok_or(WorkflowError::ProfileNotFound(application.user_id))?;

        let badge_level = highest_badge(selected);
        let now = Utc::now();

        profile.is_verified = true;
        profile.badge_level = badge_level;
        profile.verification_completed_at = Some(now);
        profile.approved_at = Some(now);
        profile.updated_at = now;
        self.repos.profiles.save(&profile).await?;

        let mut granted: Vec<BadgeLevel> = Vec::with_capacity(selected.len());
        for level in selected {
            if *level == BadgeLevel::None || granted.contains(level) {
                continue;
            }
            self.repos
                .badges
                .upsert(&UserBadge {
                    user_id: profile.id,
                    badge_level: *level,
                    granted_by: admin,
                    granted_at: now,
                })
                .await?;
            granted.push(*level);
        }

        application.status = ApplicationStatus::Approved;
        application.reviewed_by = Some(admin);
        application.reviewed_at = Some(now);
        application.updated_at = now;
        if notes.is_some() {
            application.admin_notes = notes.clone();
        }
        self.repos.applications.save(application).await?;

        self.metrics
            .inc_counter(metric_names::APPLICATIONS_APPROVED)
            .await;
        self.metrics
            .add_counter(metric_names::BADGES_GRANTED, granted.len() as u64)
            .await;

        let action = AuditAction::Application(ApplicationStatus::Approved);
        let entry = AuditLogBuilder::new(admin, action)
            .application(&application.id)
            .details(json!({
                "user_id": profile.id,
                "badge_level": badge_level,
                "selected_badges": granted,
                "admin_notes": notes,
            }))
            .build();
        let notification = Notification::ApplicationApproved {
            application_id: application.id,
            user_id: profile.id,
            badge_level,
        };

        Ok((entry, vec![notification]))
    }

    async fn reject(
        &self,
        admin: AdminId,
        application: &mut Application,
        notes: Option<String>,
    ) -> Result<(AuditLogEntry, Vec<Notification>)> {
        let Some(reason) = notes else {
            self.metrics
                .inc_counter(metric_names::VALIDATION_ERRORS)
                .await;
            return Err(WorkflowError::validation(
                "admin_notes",
                "a rejection reason is required",
            ));
        };

        let now = Utc::now();
        application.status = ApplicationStatus::Rejected;
        application.admin_notes = Some(reason.clone());
        application.reviewed_by = Some(admin);
        application.reviewed_at = Some(now);
        application.updated_at = now;
        self.repos.applications.save(application).await?;

        self.metrics
            .inc_counter(metric_names::APPLICATIONS_REJECTED)
            .await;

        let point_summary = application.points.summary();
        let action = AuditAction::Application(ApplicationStatus::Rejected);
        let entry = AuditLogBuilder::new(admin, action)
            .application(&application.id)
            .details(json!({
                "admin_notes": reason,
                "points": point_summary,
            }))
            .build();
        let notification = Notification::ApplicationRejected {
            application_id: application.id,
            user_id: application.user_id,
            reason,
            point_summary,
        };

        Ok((entry, vec![notification]))
    }

    async fn start_review(
        &self,
        admin: AdminId,
        application: &mut Application,
        notes: Option<String>,
    ) -> Result<(AuditLogEntry, Vec<Notification>)> {
        let now = Utc::now();
        application.status = ApplicationStatus::UnderReview;
        application.reviewed_by = Some(admin);
        application.reviewed_at = Some(now);
        application.updated_at = now;
        if notes.is_some() {
            application.admin_notes = notes.clone();
        }
        self.repos.applications.save(application).await?;

        self.metrics
            .inc_counter(metric_names::APPLICATIONS_UNDER_REVIEW)
            .await;

        let entry =
            AuditLogBuilder::new(admin, AuditAction::Application(ApplicationStatus::UnderReview))
                .application(&application.id)
                .details(json!({ "admin_notes": notes }))
                .build();

        Ok((entry, Vec::new()))
    }

    pub async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>> {
        let applications = self.repos.applications.list(status).await?;

        let pending = match status {
            Some(ApplicationStatus::Pending) => Some(applications.len()),
            None => Some(
                applications
                    .iter()
                    .filter(|a| a.status == ApplicationStatus::Pending)
                    .count(),
            ),
            Some(_) => None,
        };
        if let Some(pending) = pending {
            self.metrics
                .set_gauge(metric_names::APPLICATIONS_PENDING, pending as u64)
                .await;
        }

        Ok(applications)
    }

    /// Application plus its documents, for the review screen
    pub async fn application_with_documents(
        &self,
        application_id: &ApplicationId,
    ) -> Result<(Application, Vec<crate::domain::Document>)> {
        let application = self.load(application_id).await?;
        let documents = self
            .repos
            .documents
            .list_for_application(application_id)
            .await?;
        Ok((application, documents))
    }

    /// Audit entries for the application and its applicant's profile, newest first
    pub async fn review_trail(&self, application_id: &ApplicationId) -> Result<Vec<AuditLogEntry>> {
        let application = self.load(application_id).await?;
        self.dispatcher
            .audit_log()
            .for_review_subject(&application.id, &application.user_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Profile, ProfileId};
    use crate::infra::{
        MockApplicationRepository, MockAuditLog, MockBadgeRepository, MockDocumentRepository,
        MockEventPublisher, MockPortfolioRepository, MockProfileRepository,
        MockReferralRepository,
    };

    struct Mocks {
        profiles: MockProfileRepository,
        applications: MockApplicationRepository,
        badges: MockBadgeRepository,
        audit: MockAuditLog,
        publisher: MockEventPublisher,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                profiles: MockProfileRepository::new(),
                applications: MockApplicationRepository::new(),
                badges: MockBadgeRepository::new(),
                audit: MockAuditLog::new(),
                publisher: MockEventPublisher::new(),
            }
        }

        fn engine(self) -> VerificationEngine {
            let metrics = Arc::new(MetricsRegistry::new());
            let repos = Repositories {
                profiles: Arc::new(self.profiles),
                applications: Arc::new(self.applications),
                documents: Arc::new(MockDocumentRepository::new()),
                portfolio: Arc::new(MockPortfolioRepository::new()),
                badges: Arc::new(self.badges),
                referrals: Arc::new(MockReferralRepository::new()),
            };
            let dispatcher = Arc::new(SideEffectDispatcher::new(
                Arc::new(self.audit),
                Arc::new(self.publisher),
                metrics.clone(),
            ));
            VerificationEngine::new(repos, dispatcher, metrics)
        }
    }

    fn tier_one_verified(user_id: ProfileId) -> Application {
        let mut application = Application::new(user_id, false);
        for key in PointKey::TIER_ONE {
            application.points.set(key, PointStatus::Verified);
        }
        application
    }

    #[tokio::test]
    async fn test_profile_failure_aborts_before_application_write() {
        let profile = Profile::new("Dana Ruiz", "dana@example.com");
        let application = tier_one_verified(profile.id);
        let application_id = application.id;

        let mut mocks = Mocks::new();
        mocks
            .applications
            .expect_get()
            .returning(move |_| Ok(Some(application.clone())));
        mocks
            .profiles
            .expect_get()
            .returning(move |_| Ok(Some(profile.clone())));
        mocks
            .profiles
            .expect_save()
            .times(1)
            .returning(|_| Err(WorkflowError::Storage("connection reset".into())));
        mocks.badges.expect_upsert().times(0);
        mocks.applications.expect_save().times(0);
        mocks.audit.expect_append().times(0);
        mocks.publisher.expect_publish().times(0);

        let err = mocks
            .engine()
            .transition_application_status(
                AdminId::system(),
                application_id,
                ApplicationStatus::Approved,
                StatusChangeRequest::approve(vec![BadgeLevel::Vetted]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Storage(_)));
    }

    #[tokio::test]
    async fn test_approval_writes_profile_before_application() {
        let profile = Profile::new("Dana Ruiz", "dana@example.com");
        let application = tier_one_verified(profile.id);
        let application_id = application.id;

        let mut seq = mockall::Sequence::new();
        let mut mocks = Mocks::new();
        mocks
            .applications
            .expect_get()
            .returning(move |_| Ok(Some(application.clone())));
        mocks
            .profiles
            .expect_get()
            .returning(move |_| Ok(Some(profile.clone())));
        mocks
            .profiles
            .expect_save()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|p| p.is_verified && p.badge_level == BadgeLevel::Elite)
            .returning(|_| Ok(()));
        mocks
            .badges
            .expect_upsert()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mocks
            .applications
            .expect_save()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|a| a.status == ApplicationStatus::Approved)
            .returning(|_| Ok(()));
        mocks
            .audit
            .expect_append()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mocks
            .publisher
            .expect_publish()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let outcome = mocks
            .engine()
            .transition_application_status(
                AdminId::system(),
                application_id,
                ApplicationStatus::Approved,
                StatusChangeRequest::approve(vec![BadgeLevel::Verified, BadgeLevel::Elite]),
            )
            .await
            .unwrap();

        assert!(outcome.side_effects.is_clean());
    }

    #[tokio::test]
    async fn test_rejected_required_point_blocks_approval() {
        let user_id = ProfileId::new();
        let mut application = tier_one_verified(user_id);
        application
            .points
            .set(PointKey::LiabilityInsurance, PointStatus::Rejected);
        let application_id = application.id;

        let mut mocks = Mocks::new();
        mocks
            .applications
            .expect_get()
            .returning(move |_| Ok(Some(application.clone())));
        mocks.profiles.expect_save().times(0);
        mocks.applications.expect_save().times(0);

        let err = mocks
            .engine()
            .transition_application_status(
                AdminId::system(),
                application_id,
                ApplicationStatus::Approved,
                StatusChangeRequest::approve(vec![BadgeLevel::Vetted]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::InvariantViolation { .. }));
    }

    #[tokio::test]
    async fn test_reviewed_point_cannot_be_reviewed_again() {
        let mut application = Application::new(ProfileId::new(), false);
        application
            .points
            .set(PointKey::TaxCompliance, PointStatus::Verified);
        let application_id = application.id;

        let mut mocks = Mocks::new();
        mocks
            .applications
            .expect_get()
            .returning(move |_| Ok(Some(application.clone())));
        mocks.applications.expect_save().times(0);
        mocks.audit.expect_append().times(0);

        let err = mocks
            .engine()
            .set_point_status(
                AdminId::system(),
                application_id,
                PointKey::TaxCompliance,
                PointOutcome::Rejected,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::InvalidStateTransition { .. }));
    }

    #[tokio::test]
    async fn test_missing_application() {
        let mut mocks = Mocks::new();
        mocks.applications.expect_get().returning(|_| Ok(None));

        let err = mocks
            .engine()
            .set_point_status(
                AdminId::system(),
                ApplicationId::new(),
                PointKey::BusinessRegistration,
                PointOutcome::Verified,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::ApplicationNotFound(_)));
    }
}
