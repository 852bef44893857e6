//! PostgreSQL-backed referrals

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::domain::{AdminId, CommissionTerms, ProfileId, Referral, ReferralId, ReferralStatus};
use crate::infra::{ReferralRepository, Result, WorkflowError};

use super::decode;

const REFERRAL_COLUMNS: &str = "id, submitted_by, status, client_name, client_email, \
     client_phone, project_type, project_description, location, value_range, timeline, \
     matched_to, reviewed_by, reviewed_at, matched_at, engaged_at, completed_at, final_value, \
     commission_terms, admin_notes, created_at, updated_at";

/// PostgreSQL-backed `referrals`
#[derive(Clone)]
pub struct PgReferralStore {
    pool: PgPool,
}

impl PgReferralStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferralRepository for PgReferralStore {
    async fn get(&self, id: &ReferralId) -> Result<Option<Referral>> {
        let row = sqlx::query_as::<_, ReferralRow>(&format!(
            "SELECT {REFERRAL_COLUMNS} FROM referrals WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Referral::try_from).transpose()
    }

    async fn save(&self, referral: &Referral) -> Result<()> {
        let terms = serde_json::to_value(referral.commission_terms)
            .map_err(|e| WorkflowError::Internal(format!("commission_terms: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO referrals (
                id, submitted_by, status, client_name, client_email, client_phone,
                project_type, project_description, location, value_range, timeline,
                matched_to, reviewed_by, reviewed_at, matched_at, engaged_at, completed_at,
                final_value, commission_terms, admin_notes, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22
            )
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                client_name = EXCLUDED.client_name,
                client_email = EXCLUDED.client_email,
                client_phone = EXCLUDED.client_phone,
                project_type = EXCLUDED.project_type,
                project_description = EXCLUDED.project_description,
                location = EXCLUDED.location,
                value_range = EXCLUDED.value_range,
                timeline = EXCLUDED.timeline,
                matched_to = EXCLUDED.matched_to,
                reviewed_by = EXCLUDED.reviewed_by,
                reviewed_at = EXCLUDED.reviewed_at,
                matched_at = EXCLUDED.matched_at,
                engaged_at = EXCLUDED.engaged_at,
                completed_at = EXCLUDED.completed_at,
                final_value = EXCLUDED.final_value,
                commission_terms = EXCLUDED.commission_terms,
                admin_notes = EXCLUDED.admin_notes,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(referral.id.0)
        .bind(referral.submitted_by.0)
        .bind(referral.status.as_str())
        .bind(&referral.client_name)
        .bind(&referral.client_email)
        .bind(&referral.client_phone)
        .bind(&referral.project_type)
        .bind(&referral.project_description)
        .bind(&referral.location)
        .bind(&referral.value_range)
        .bind(&referral.timeline)
        .bind(referral.matched_to.map(|p| p.0))
        .bind(referral.reviewed_by.map(|a| a.0))
        .bind(referral.reviewed_at)
        .bind(referral.matched_at)
        .bind(referral.engaged_at)
        .bind(referral.completed_at)
        .bind(&referral.final_value)
        .bind(terms)
        .bind(&referral.admin_notes)
        .bind(referral.created_at)
        .bind(referral.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, status: Option<ReferralStatus>) -> Result<Vec<Referral>> {
        let rows = sqlx::query_as::<_, ReferralRow>(&format!(
            "SELECT {REFERRAL_COLUMNS} FROM referrals \
             WHERE ($1::text IS NULL OR status = $1) ORDER BY created_at DESC"
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Referral::try_from).collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReferralRow {
    id: Uuid,
    submitted_by: Uuid,
    status: String,
    client_name: String,
    client_email: Option<String>,
    client_phone: Option<String>,
    project_type: Option<String>,
    project_description: String,
    location: Option<String>,
    value_range: Option<String>,
    timeline: Option<String>,
    matched_to: Option<Uuid>,
    reviewed_by: Option<Uuid>,
    reviewed_at: Option<DateTime<Utc>>,
    matched_at: Option<DateTime<Utc>>,
    engaged_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    final_value: Option<String>,
    commission_terms: serde_json::Value,
    admin_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReferralRow> for Referral {
    type Error = WorkflowError;

    fn try_from(row: ReferralRow) -> Result<Self> {
        let commission_terms: CommissionTerms = serde_json::from_value(row.commission_terms)
            .map_err(|e| WorkflowError::Storage(format!("commission_terms: {e}")))?;

        Ok(Self {
            id: ReferralId::from_uuid(row.id),
            submitted_by: ProfileId::from_uuid(row.submitted_by),
            status: decode(&row.status, "status")?,
            client_name: row.client_name,
            client_email: row.client_email,
            client_phone: row.client_phone,
            project_type: row.project_type,
            project_description: row.project_description,
            location: row.location,
            value_range: row.value_range,
            timeline: row.timeline,
            matched_to: row.matched_to.map(ProfileId::from_uuid),
            reviewed_by: row.reviewed_by.map(AdminId::from_uuid),
            reviewed_at: row.reviewed_at,
            matched_at: row.matched_at,
            engaged_at: row.engaged_at,
            completed_at: row.completed_at,
            final_value: row.final_value,
            commission_terms,
            admin_notes: row.admin_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
