//! Audit logging for admin workflow actions
//!
//! Every state-changing admin action records one entry in `admin_audit_log`:
//! - verification point reviews
//! - application status changes
//! - referral stage changes
//! - profile edits and payment records

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::domain::{
    AdminId, ApplicationId, ApplicationStatus, EntityType, ProfileId, ReferralStatus,
};

use super::{AuditLog, Result, WorkflowError};

/// Audit log action types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditAction {
    /// A single verification point was marked verified or rejected
    VerifiedPoint,
    /// Application moved to the given status (`approved_application`, ...)
    Application(ApplicationStatus),
    /// Referral moved to the given stage (`referral_matched`, ...)
    Referral(ReferralStatus),
    ProfileUpdated,
    MarkedPaid,
    /// Reconciliation re-applied a missing badge
    BadgeReconciled,
    Custom(String),
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditAction::VerifiedPoint => write!(f, "verified_point"),
            AuditAction::Application(status) => write!(f, "{}_application", status.as_str()),
            AuditAction::Referral(status) => {
                write!(f, "referral_{}", status.as_str().to_ascii_lowercase())
            }
            AuditAction::ProfileUpdated => write!(f, "updated_profile"),
            AuditAction::MarkedPaid => write!(f, "marked_paid"),
            AuditAction::BadgeReconciled => write!(f, "reconciled_badge"),
            AuditAction::Custom(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for AuditAction {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AuditAction {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(parse_audit_action(&s))
    }
}

/// Audit log entry, persisted in the `admin_audit_log` wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub admin_id: AdminId,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    /// JSON object or null
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Builder for creating audit log entries
pub struct AuditLogBuilder {
    admin_id: AdminId,
    action: AuditAction,
    entity_type: EntityType,
    entity_id: Uuid,
    details: Option<serde_json::Value>,
}

impl AuditLogBuilder {
    /// Create a new audit log builder
    pub fn new(admin_id: AdminId, action: AuditAction) -> Self {
        Self {
            admin_id,
            action,
            entity_type: EntityType::Application,
            entity_id: Uuid::nil(),
            details: None,
        }
    }

    /// Set the entity the action was performed on
    pub fn entity(mut self, entity_type: EntityType, entity_id: Uuid) -> Self {
        self.entity_type = entity_type;
        self.entity_id = entity_id;
        self
    }

    pub fn application(self, id: &ApplicationId) -> Self {
        self.entity(EntityType::Application, id.0)
    }

    pub fn profile(self, id: &ProfileId) -> Self {
        self.entity(EntityType::Profile, id.0)
    }

    /// Set additional details
    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Build the audit log entry
    pub fn build(self) -> AuditLogEntry {
        AuditLogEntry {
            id: Uuid::new_v4(),
            admin_id: self.admin_id,
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            details: self.details,
            created_at: Utc::now(),
        }
    }
}

/// PostgreSQL-backed audit log
pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    /// Create a new audit log
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Most recent entries across all entities
    pub async fn recent(&self, limit: i64) -> Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT id, admin_id, action, entity_type, entity_id, details, created_at
            FROM admin_audit_log
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditLogEntry::try_from).collect()
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn append(&self, entry: &AuditLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO admin_audit_log (
                id, admin_id, action, entity_type, entity_id, details, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.admin_id.0)
        .bind(entry.action.to_string())
        .bind(entry.entity_type.as_str())
        .bind(entry.entity_id)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            action = %entry.action,
            admin_id = %entry.admin_id,
            entity_type = %entry.entity_type,
            entity_id = %entry.entity_id,
            "Audit log entry"
        );

        Ok(())
    }

    async fn for_entity(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT id, admin_id, action, entity_type, entity_id, details, created_at
            FROM admin_audit_log
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(entity_type.as_str())
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditLogEntry::try_from).collect()
    }

    async fn for_review_subject(
        &self,
        application_id: &ApplicationId,
        profile_id: &ProfileId,
    ) -> Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT id, admin_id, action, entity_type, entity_id, details, created_at
            FROM admin_audit_log
            WHERE (entity_type = 'application' AND entity_id = $1)
               OR (entity_type = 'profile' AND entity_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(application_id.0)
        .bind(profile_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditLogEntry::try_from).collect()
    }
}

/// Database row for audit log
#[derive(Debug, sqlx::FromRow)]
struct AuditLogRow {
    id: Uuid,
    admin_id: Uuid,
    action: String,
    entity_type: String,
    entity_id: Uuid,
    details: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditLogRow> for AuditLogEntry {
    type Error = WorkflowError;

    fn try_from(row: AuditLogRow) -> Result<Self> {
        let entity_type = row
            .entity_type
            .parse::<EntityType>()
            .map_err(WorkflowError::Storage)?;

        Ok(Self {
            id: row.id,
            admin_id: AdminId::from_uuid(row.admin_id),
            action: parse_audit_action(&row.action),
            entity_type,
            entity_id: row.entity_id,
            details: row.details,
            created_at: row.created_at,
        })
    }
}

pub(crate) fn parse_audit_action(s: &str) -> AuditAction {
    match s {
        "verified_point" => return AuditAction::VerifiedPoint,
        "updated_profile" => return AuditAction::ProfileUpdated,
        "marked_paid" => return AuditAction::MarkedPaid,
        "reconciled_badge" => return AuditAction::BadgeReconciled,
        _ => {}
    }

    if let Some(status) = s.strip_suffix("_application") {
        if let Ok(status) = status.parse::<ApplicationStatus>() {
            return AuditAction::Application(status);
        }
    }
    if let Some(status) = s.strip_prefix("referral_") {
        if let Ok(status) = status.parse::<ReferralStatus>() {
            return AuditAction::Referral(status);
        }
    }

    AuditAction::Custom(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_action_display() {
        assert_eq!(AuditAction::VerifiedPoint.to_string(), "verified_point");
        assert_eq!(
            AuditAction::Application(ApplicationStatus::Approved).to_string(),
            "approved_application"
        );
        assert_eq!(
            AuditAction::Application(ApplicationStatus::UnderReview).to_string(),
            "under_review_application"
        );
        assert_eq!(
            AuditAction::Referral(ReferralStatus::Matched).to_string(),
            "referral_matched"
        );
        assert_eq!(AuditAction::Custom("note".to_string()).to_string(), "note");
    }

    #[test]
    fn test_parse_audit_action() {
        for action in [
            AuditAction::VerifiedPoint,
            AuditAction::Application(ApplicationStatus::Rejected),
            AuditAction::Referral(ReferralStatus::Completed),
            AuditAction::ProfileUpdated,
            AuditAction::MarkedPaid,
            AuditAction::BadgeReconciled,
        ] {
            assert_eq!(parse_audit_action(&action.to_string()), action);
        }
        assert_eq!(
            parse_audit_action("archived_application"),
            AuditAction::Custom("archived_application".to_string())
        );
    }

    #[test]
    fn test_audit_log_builder() {
        let admin = AdminId::from_uuid(Uuid::new_v4());
        let application_id = ApplicationId::new();
        let entry = AuditLogBuilder::new(admin, AuditAction::VerifiedPoint)
            .application(&application_id)
            .details(serde_json::json!({
                "point": "point_1_business_registration",
                "status": "verified"
            }))
            .build();

        assert_eq!(entry.admin_id, admin);
        assert_eq!(entry.entity_type, EntityType::Application);
        assert_eq!(entry.entity_id, application_id.0);
        assert!(entry.details.is_some());
    }

    #[test]
    fn test_entry_wire_format() {
        let action = AuditAction::Referral(ReferralStatus::Reviewed);
        let entry = AuditLogBuilder::new(AdminId::system(), action)
            .entity(EntityType::Referral, Uuid::nil())
            .build();
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["action"], "referral_reviewed");
        assert_eq!(json["entity_type"], "referral");
        assert!(json["details"].is_null());
        assert!(json.get("created_at").is_some());
    }
}
