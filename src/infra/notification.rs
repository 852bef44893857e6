//! Outbound notifications and their publishers
//!
//! - [`LogOnlyPublisher`] writes notifications to the operational log
//! - [`HttpNotifier`] posts them to the transactional email endpoints

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    ApplicationId, BadgeLevel, PointKey, PointStatus, ProfileId, ReferralId, ReferralStatus,
};

use super::retry::{retry_with, RetryConfig};
use super::{EventPublisher, Result, WorkflowError};

/// A notification triggered by a committed workflow transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Notification {
    ApplicationApproved {
        application_id: ApplicationId,
        user_id: ProfileId,
        badge_level: BadgeLevel,
    },
    ApplicationRejected {
        application_id: ApplicationId,
        user_id: ProfileId,
        reason: String,
        point_summary: BTreeMap<PointKey, PointStatus>,
    },
    /// Tells the matched member they have a referral
    ReferralMatched {
        referral_id: ReferralId,
        matched_to: ProfileId,
    },
    ReferralStatusChanged {
        referral_id: ReferralId,
        submitted_by: ProfileId,
        status: ReferralStatus,
    },
    /// Sent to both the submitter and the matched member
    ReferralCompleted {
        referral_id: ReferralId,
        submitted_by: ProfileId,
        matched_to: Option<ProfileId>,
        final_value: Option<String>,
    },
}

impl Notification {
    /// Endpoint name, also the `kind` tag on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::ApplicationApproved { .. } => "application-approved",
            Notification::ApplicationRejected { .. } => "application-rejected",
            Notification::ReferralMatched { .. } => "referral-matched",
            Notification::ReferralStatusChanged { .. } => "referral-status-changed",
            Notification::ReferralCompleted { .. } => "referral-completed",
        }
    }

    /// Id of the application or referral the notification is about
    pub fn subject_id(&self) -> uuid::Uuid {
        match self {
            Notification::ApplicationApproved { application_id, .. }
            | Notification::ApplicationRejected { application_id, .. } => application_id.0,
            Notification::ReferralMatched { referral_id, .. }
            | Notification::ReferralStatusChanged { referral_id, .. }
            | Notification::ReferralCompleted { referral_id, .. } => referral_id.0,
        }
    }

    /// Stable key so a retried delivery is recognised as the same message
    pub fn idempotency_key(&self) -> String {
        match self {
            Notification::ReferralStatusChanged { status, .. } => {
                format!("{}:{}:{}", self.kind(), self.subject_id(), status.as_str())
            }
            _ => format!("{}:{}", self.kind(), self.subject_id()),
        }
    }
}

/// Publisher that only logs; used when no notification endpoint is configured
#[derive(Debug, Default, Clone)]
pub struct LogOnlyPublisher;

#[async_trait]
impl EventPublisher for LogOnlyPublisher {
    async fn publish(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            kind = notification.kind(),
            subject_id = %notification.subject_id(),
            "Notification (log only)"
        );
        Ok(())
    }
}

/// Notification endpoint configuration
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Base URL; each notification posts to `{base_url}/{kind}`
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl NotifierConfig {
    /// Load from `NOTIFY_*` environment variables. `None` when
    /// `NOTIFY_BASE_URL` is unset.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("NOTIFY_BASE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())?;

        let timeout_ms: u64 = std::env::var("NOTIFY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5_000);

        let mut retry = RetryConfig::notification();
        if let Some(max) = std::env::var("NOTIFY_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            retry = retry.with_max_retries(max);
        }

        Some(Self {
            base_url,
            api_key: std::env::var("NOTIFY_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout: Duration::from_millis(timeout_ms),
            retry,
        })
    }
}

/// Posts notifications as JSON to the email service
pub struct HttpNotifier {
    client: reqwest::Client,
    config: NotifierConfig,
}

#[derive(Debug)]
struct SendFailure {
    message: String,
    retryable: bool,
}

impl std::fmt::Display for SendFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl HttpNotifier {
    pub fn new(config: NotifierConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WorkflowError::Configuration(format!("notification client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self, notification: &Notification) -> String {
        format!("{}/{}", self.config.base_url, notification.kind())
    }

    async fn send_once(&self, notification: &Notification) -> std::result::Result<(), SendFailure> {
        let mut request = self
            .client
            .post(self.endpoint(notification))
            .header("Idempotency-Key", notification.idempotency_key())
            .json(notification);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| SendFailure {
            message: e.to_string(),
            retryable: e.is_timeout() || e.is_connect() || e.is_request(),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        Err(SendFailure {
            message: format!("endpoint returned {status}"),
            retryable: status.is_server_error() || status.as_u16() == 429,
        })
    }
}

#[async_trait]
impl EventPublisher for HttpNotifier {
    async fn publish(&self, notification: &Notification) -> Result<()> {
        let outcome = retry_with(
            &self.config.retry,
            notification.kind(),
            || self.send_once(notification),
            |failure| failure.retryable,
        )
        .await;

        let attempts = outcome.attempts;
        outcome.into_result().map_err(|failure| {
            WorkflowError::Notification(format!(
                "{} for {} failed after {} attempt(s): {}",
                notification.kind(),
                notification.subject_id(),
                attempts,
                failure
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed() -> Notification {
        Notification::ReferralCompleted {
            referral_id: ReferralId::new(),
            submitted_by: ProfileId::new(),
            matched_to: Some(ProfileId::new()),
            final_value: Some("$125,000".to_string()),
        }
    }

    #[test]
    fn test_wire_format_is_kind_tagged() {
        let notification = completed();
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["kind"], "referral-completed");
        assert_eq!(json["final_value"], "$125,000");
    }

    #[test]
    fn test_idempotency_key_includes_stage_for_status_changes() {
        let referral_id = ReferralId::new();
        let reviewed = Notification::ReferralStatusChanged {
            referral_id,
            submitted_by: ProfileId::new(),
            status: ReferralStatus::Reviewed,
        };
        let engaged = Notification::ReferralStatusChanged {
            referral_id,
            submitted_by: ProfileId::new(),
            status: ReferralStatus::Engaged,
        };
        assert_ne!(reviewed.idempotency_key(), engaged.idempotency_key());
        assert!(reviewed.idempotency_key().ends_with(":REVIEWED"));
    }

    #[test]
    fn test_endpoint_per_kind() {
        let notifier = HttpNotifier::new(NotifierConfig {
            base_url: "https://mail.internal/functions".to_string(),
            api_key: None,
            timeout: Duration::from_secs(1),
            retry: RetryConfig::immediate(),
        })
        .unwrap();
        assert_eq!(
            notifier.endpoint(&completed()),
            "https://mail.internal/functions/referral-completed"
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_notification_error() {
        let notifier = HttpNotifier::new(NotifierConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: None,
            timeout: Duration::from_millis(200),
            retry: RetryConfig::immediate(),
        })
        .unwrap();

        let err = notifier.publish(&completed()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Notification(_)));
    }

    #[tokio::test]
    async fn test_log_only_publisher_accepts_everything() {
        assert!(LogOnlyPublisher.publish(&completed()).await.is_ok());
    }
}
