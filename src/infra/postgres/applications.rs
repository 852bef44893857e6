//! PostgreSQL-backed applications and documents

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::domain::{
    AdminId, Application, ApplicationId, ApplicationStatus, Document, ProfileId,
    VerificationPoints,
};
use crate::infra::{ApplicationRepository, DocumentRepository, Result, WorkflowError};

use super::decode;

const APPLICATION_COLUMNS: &str = "id, user_id, status, \
     point_1_business_registration, point_2_professional_license, point_3_liability_insurance, \
     point_4_workers_comp, point_5_contact_verification, point_6_tax_compliance, \
     point_7_references, point_8_certifications, workers_comp_exempt_sole_prop, \
     admin_notes, reviewed_by, reviewed_at, submitted_at, created_at, updated_at";

/// PostgreSQL-backed `applications` and `documents`
#[derive(Clone)]
pub struct PgApplicationStore {
    pool: PgPool,
}

impl PgApplicationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationRepository for PgApplicationStore {
    async fn get(&self, id: &ApplicationId) -> Result<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Application::try_from).transpose()
    }

    async fn get_for_user(&self, user_id: &ProfileId) -> Result<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Application::try_from).transpose()
    }

    async fn save(&self, application: &Application) -> Result<()> {
        let points = &application.points;
        sqlx::query(
            r#"
            INSERT INTO applications (
                id, user_id, status,
                point_1_business_registration, point_2_professional_license,
                point_3_liability_insurance, point_4_workers_comp,
                point_5_contact_verification, point_6_tax_compliance,
                point_7_references, point_8_certifications,
                workers_comp_exempt_sole_prop, admin_notes, reviewed_by, reviewed_at,
                submitted_at, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18
            )
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                point_1_business_registration = EXCLUDED.point_1_business_registration,
                point_2_professional_license = EXCLUDED.point_2_professional_license,
                point_3_liability_insurance = EXCLUDED.point_3_liability_insurance,
                point_4_workers_comp = EXCLUDED.point_4_workers_comp,
                point_5_contact_verification = EXCLUDED.point_5_contact_verification,
                point_6_tax_compliance = EXCLUDED.point_6_tax_compliance,
                point_7_references = EXCLUDED.point_7_references,
                point_8_certifications = EXCLUDED.point_8_certifications,
                workers_comp_exempt_sole_prop = EXCLUDED.workers_comp_exempt_sole_prop,
                admin_notes = EXCLUDED.admin_notes,
                reviewed_by = EXCLUDED.reviewed_by,
                reviewed_at = EXCLUDED.reviewed_at,
                submitted_at = EXCLUDED.submitted_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(application.id.0)
        .bind(application.user_id.0)
        .bind(application.status.as_str())
        .bind(points.business_registration.as_str())
        .bind(points.professional_license.as_str())
        .bind(points.liability_insurance.as_str())
        .bind(points.workers_comp.as_str())
        .bind(points.contact_verification.as_str())
        .bind(points.tax_compliance.as_str())
        .bind(points.references.as_str())
        .bind(points.certifications.as_str())
        .bind(application.workers_comp_exempt_sole_prop)
        .bind(&application.admin_notes)
        .bind(application.reviewed_by.map(|a| a.0))
        .bind(application.reviewed_at)
        .bind(application.submitted_at)
        .bind(application.created_at)
        .bind(application.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, status: Option<ApplicationStatus>) -> Result<Vec<Application>> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications \
             WHERE ($1::text IS NULL OR status = $1) ORDER BY created_at DESC"
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Application::try_from).collect()
    }
}

#[async_trait]
impl DocumentRepository for PgApplicationStore {
    async fn insert(&self, document: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (
                id, application_id, document_type, file_path, file_name,
                file_size, mime_type, uploaded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(document.id)
        .bind(document.application_id.0)
        .bind(document.document_type.as_str())
        .bind(&document.file_path)
        .bind(&document.file_name)
        .bind(document.file_size)
        .bind(&document.mime_type)
        .bind(document.uploaded_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_application(&self, application_id: &ApplicationId) -> Result<Vec<Document>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, application_id, document_type, file_path, file_name,
                   file_size, mime_type, uploaded_at
            FROM documents
            WHERE application_id = $1
            ORDER BY uploaded_at
            "#,
        )
        .bind(application_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Document {
                    id: row.id,
                    application_id: ApplicationId::from_uuid(row.application_id),
                    document_type: decode(&row.document_type, "document_type")?,
                    file_path: row.file_path,
                    file_name: row.file_name,
                    file_size: row.file_size,
                    mime_type: row.mime_type,
                    uploaded_at: row.uploaded_at,
                })
            })
            .collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ApplicationRow {
    id: Uuid,
    user_id: Uuid,
    status: String,
    point_1_business_registration: String,
    point_2_professional_license: String,
    point_3_liability_insurance: String,
    point_4_workers_comp: String,
    point_5_contact_verification: String,
    point_6_tax_compliance: String,
    point_7_references: String,
    point_8_certifications: String,
    workers_comp_exempt_sole_prop: bool,
    admin_notes: Option<String>,
    reviewed_by: Option<Uuid>,
    reviewed_at: Option<DateTime<Utc>>,
    submitted_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = WorkflowError;

    fn try_from(row: ApplicationRow) -> Result<Self> {
        let points = VerificationPoints {
            business_registration: decode(
                &row.point_1_business_registration,
                "point_1_business_registration",
            )?,
            professional_license: decode(
                &row.point_2_professional_license,
                "point_2_professional_license",
            )?,
            liability_insurance: decode(
                &row.point_3_liability_insurance,
                "point_3_liability_insurance",
            )?,
            workers_comp: decode(&row.point_4_workers_comp, "point_4_workers_comp")?,
            contact_verification: decode(
                &row.point_5_contact_verification,
                "point_5_contact_verification",
            )?,
            tax_compliance: decode(&row.point_6_tax_compliance, "point_6_tax_compliance")?,
            references: decode(&row.point_7_references, "point_7_references")?,
            certifications: decode(&row.point_8_certifications, "point_8_certifications")?,
        };

        Ok(Self {
            id: ApplicationId::from_uuid(row.id),
            user_id: ProfileId::from_uuid(row.user_id),
            status: decode(&row.status, "status")?,
            points,
            workers_comp_exempt_sole_prop: row.workers_comp_exempt_sole_prop,
            admin_notes: row.admin_notes,
            reviewed_by: row.reviewed_by.map(AdminId::from_uuid),
            reviewed_at: row.reviewed_at,
            submitted_at: row.submitted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    application_id: Uuid,
    document_type: String,
    file_path: String,
    file_name: String,
    file_size: i64,
    mime_type: Option<String>,
    uploaded_at: DateTime<Utc>,
}
