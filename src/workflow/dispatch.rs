//! Best-effort audit and notification side effects
//!
//! The dispatcher runs after a transition has been persisted. Audit writes
//! and notification publishes are attempted independently; a failure is
//! logged and counted, then dropped.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::infra::{AuditLog, AuditLogEntry, EventPublisher, Notification};
use crate::metrics::{metric_names, timed, MetricsRegistry};

/// Fate of a single side effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffectStatus {
    Delivered,
    Failed,
}

/// What happened to the side effects of one operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// `None` when the operation wrote no audit entry
    pub audit: Option<SideEffectStatus>,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
}

impl DispatchReport {
    pub fn audit_recorded(&self) -> bool {
        self.audit == Some(SideEffectStatus::Delivered)
    }

    /// No side effect failed
    pub fn is_clean(&self) -> bool {
        self.audit != Some(SideEffectStatus::Failed) && self.notifications_failed == 0
    }
}

/// Runs audit writes and notification publishes for committed transitions
pub struct SideEffectDispatcher {
    audit: Arc<dyn AuditLog>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<MetricsRegistry>,
}

impl SideEffectDispatcher {
    pub fn new(
        audit: Arc<dyn AuditLog>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            audit,
            publisher,
            metrics,
        }
    }

    /// The audit log this dispatcher writes to
    pub fn audit_log(&self) -> &Arc<dyn AuditLog> {
        &self.audit
    }

    /// Append one audit entry, swallowing failure
    pub async fn record(&self, entry: AuditLogEntry, report: &mut DispatchReport) {
        match self.audit.append(&entry).await {
            Ok(()) => {
                self.metrics.inc_counter(metric_names::AUDIT_WRITES).await;
                report.audit = Some(SideEffectStatus::Delivered);
            }
            Err(e) => {
                warn!(
                    action = %entry.action,
                    entity_type = %entry.entity_type,
                    entity_id = %entry.entity_id,
                    error = %e,
                    "Audit log write failed; transition kept"
                );
                self.metrics.inc_counter(metric_names::AUDIT_FAILURES).await;
                report.audit = Some(SideEffectStatus::Failed);
            }
        }
    }

    /// Publish one notification, swallowing failure
    pub async fn notify(&self, notification: Notification, report: &mut DispatchReport) {
        let outcome = timed(
            &self.metrics,
            metric_names::NOTIFICATION_LATENCY,
            self.publisher.publish(&notification),
        )
        .await;

        match outcome {
            Ok(()) => {
                debug!(
                    kind = notification.kind(),
                    subject_id = %notification.subject_id(),
                    "Notification sent"
                );
                self.metrics.inc_counter(metric_names::NOTIFICATIONS_SENT).await;
                report.notifications_sent += 1;
            }
            Err(e) => {
                warn!(
                    kind = notification.kind(),
                    subject_id = %notification.subject_id(),
                    error = %e,
                    "Notification failed; transition kept"
                );
                self.metrics
                    .inc_counter(metric_names::NOTIFICATION_FAILURES)
                    .await;
                report.notifications_failed += 1;
            }
        }
    }

    /// Audit first, then each notification in order
    pub async fn dispatch(
        &self,
        entry: AuditLogEntry,
        notifications: Vec<Notification>,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        self.record(entry, &mut report).await;
        for notification in notifications {
            self.notify(notification, &mut report).await;
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AdminId, ProfileId, ReferralId, ReferralStatus};
    use crate::infra::{
        AuditAction, AuditLogBuilder, MockAuditLog, MockEventPublisher, WorkflowError,
    };

    fn entry() -> AuditLogEntry {
        AuditLogBuilder::new(AdminId::system(), AuditAction::MarkedPaid)
            .profile(&ProfileId::new())
            .build()
    }

    fn status_changed() -> Notification {
        Notification::ReferralStatusChanged {
            referral_id: ReferralId::new(),
            submitted_by: ProfileId::new(),
            status: ReferralStatus::Reviewed,
        }
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_block_notifications() {
        let mut audit = MockAuditLog::new();
        audit
            .expect_append()
            .times(1)
            .returning(|_| Err(WorkflowError::Storage("audit table locked".into())));

        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().times(2).returning(|_| Ok(()));

        let metrics = Arc::new(MetricsRegistry::new());
        let dispatcher =
            SideEffectDispatcher::new(Arc::new(audit), Arc::new(publisher), metrics.clone());

        let report = dispatcher
            .dispatch(entry(), vec![status_changed(), status_changed()])
            .await;

        assert_eq!(report.audit, Some(SideEffectStatus::Failed));
        assert_eq!(report.notifications_sent, 2);
        assert!(!report.is_clean());
        assert_eq!(metrics.get_counter(metric_names::AUDIT_FAILURES).await, 1);
    }

    #[tokio::test]
    async fn test_notification_failure_is_counted() {
        let mut audit = MockAuditLog::new();
        audit.expect_append().times(1).returning(|_| Ok(()));

        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .returning(|_| Err(WorkflowError::Notification("smtp down".into())));

        let metrics = Arc::new(MetricsRegistry::new());
        let dispatcher =
            SideEffectDispatcher::new(Arc::new(audit), Arc::new(publisher), metrics.clone());

        let report = dispatcher.dispatch(entry(), vec![status_changed()]).await;

        assert!(report.audit_recorded());
        assert_eq!(report.notifications_failed, 1);
        assert_eq!(
            metrics
                .get_counter(metric_names::NOTIFICATION_FAILURES)
                .await,
            1
        );
    }
}
