//! Member application submission and re-submission

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::domain::{
    Application, ApplicationStatus, Document, DocumentType, PointKey, PointStatus, ProfileId,
    MIN_PORTFOLIO_ITEMS,
};
use crate::infra::{Result, WorkflowError};
use crate::metrics::{metric_names, MetricsRegistry};

use super::Repositories;

/// One uploaded compliance document, already stored under `file_path`
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentUpload {
    pub document_type: DocumentType,
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// A member's application submission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationSubmission {
    #[serde(default)]
    pub workers_comp_exempt_sole_prop: bool,
    #[serde(default)]
    pub documents: Vec<DocumentUpload>,
}

/// Creates applications and re-submits rejected ones
pub struct ApplicationIntake {
    repos: Repositories,
    metrics: Arc<MetricsRegistry>,
}

impl ApplicationIntake {
    pub fn new(repos: Repositories, metrics: Arc<MetricsRegistry>) -> Self {
        Self { repos, metrics }
    }

    /// Submit (or re-submit after rejection) the member's application.
    ///
    /// Re-submission keeps points already verified and resets the rest from
    /// the new documents.
    #[instrument(skip(self, submission), fields(profile_id = %profile_id))]
    pub async fn submit(
        &self,
        profile_id: ProfileId,
        submission: ApplicationSubmission,
    ) -> Result<Application> {
        self.repos
            .profiles
            .get(&profile_id)
            .await?
            .ok_or(WorkflowError::ProfileNotFound(profile_id))?;

        let existing = self.repos.applications.get_for_user(&profile_id).await?;
        if let Some(application) = &existing {
            if !application.status.can_resubmit() && !self.is_interrupted(application).await? {
                return Err(WorkflowError::invalid_transition(
                    "application",
                    application.id,
                    application.status,
                    "pending",
                ));
            }
        }

        if let Err(e) = self.validate(&profile_id, existing.as_ref(), &submission).await {
            self.metrics
                .inc_counter(metric_names::VALIDATION_ERRORS)
                .await;
            return Err(e);
        }

        let is_new = existing.is_none();
        let exempt = submission.workers_comp_exempt_sole_prop;
        let mut application =
            existing.unwrap_or_else(|| Application::new(profile_id, exempt));
        application.workers_comp_exempt_sole_prop = exempt;

        let uploaded: Vec<PointKey> = submission
            .documents
            .iter()
            .map(|d| d.document_type.point())
            .collect();

        for key in PointKey::ALL {
            if application.points.get(key) == PointStatus::Verified {
                continue;
            }
            let next = match key {
                PointKey::ContactVerification | PointKey::References => Some(PointStatus::Pending),
                PointKey::WorkersComp if exempt => Some(PointStatus::NotSubmitted),
                _ if uploaded.contains(&key) => Some(PointStatus::Pending),
                _ => None,
            };
            if let Some(status) = next {
                application.points.set(key, status);
            }
        }

        let now = Utc::now();
        application.status = ApplicationStatus::Pending;
        application.submitted_at = now;
        application.updated_at = now;

        let documents: Vec<Document> = submission
            .documents
            .into_iter()
            .map(|upload| Document {
                id: uuid::Uuid::new_v4(),
                application_id: application.id,
                document_type: upload.document_type,
                file_path: upload.file_path,
                file_name: upload.file_name,
                file_size: upload.file_size,
                mime_type: upload.mime_type,
                uploaded_at: now,
            })
            .collect();

        // Documents reference the application row, so a new application is
        // written first. If an insert fails after that, the row stays pending
        // missing evidence and the next submit treats it as interrupted.
        // An existing row is only updated once its evidence is stored.
        if is_new {
            self.repos.applications.save(&application).await?;
        }
        for document in &documents {
            self.repos.documents.insert(document).await?;
        }
        if !is_new {
            self.repos.applications.save(&application).await?;
        }

        info!(application_id = %application.id, "Application submitted");
        self.metrics
            .inc_counter(metric_names::APPLICATIONS_SUBMITTED)
            .await;

        Ok(application)
    }

    /// A pending, never-reviewed application with a pending point that has
    /// no document on file was left behind by a submit that failed part way
    async fn is_interrupted(&self, application: &Application) -> Result<bool> {
        if application.status != ApplicationStatus::Pending || application.reviewed_by.is_some() {
            return Ok(false);
        }
        let documents = self
            .repos
            .documents
            .list_for_application(&application.id)
            .await?;
        Ok(application.required_points().into_iter().any(|key| {
            application.points.get(key) == PointStatus::Pending
                && key
                    .document_type()
                    .is_some_and(|t| !documents.iter().any(|d| d.document_type == t))
        }))
    }

    async fn validate(
        &self,
        profile_id: &ProfileId,
        existing: Option<&Application>,
        submission: &ApplicationSubmission,
    ) -> Result<()> {
        for upload in &submission.documents {
            if upload.file_path.trim().is_empty() || upload.file_name.trim().is_empty() {
                return Err(WorkflowError::validation(
                    upload.document_type.as_str(),
                    "document is missing its file",
                ));
            }
            if upload.file_size < 0 {
                return Err(WorkflowError::validation(
                    upload.document_type.as_str(),
                    "file size cannot be negative",
                ));
            }
        }

        let exempt = submission.workers_comp_exempt_sole_prop;
        for key in PointKey::TIER_ONE {
            let Some(document_type) = key.document_type() else {
                continue;
            };
            if key == PointKey::WorkersComp && exempt {
                continue;
            }
            let already_verified =
                existing.is_some_and(|a| a.points.get(key) == PointStatus::Verified);
            let supplied = submission
                .documents
                .iter()
                .any(|d| d.document_type == document_type);
            if !supplied && !already_verified {
                return Err(WorkflowError::validation(
                    key.as_str(),
                    format!("a {} document is required", document_type.as_str()),
                ));
            }
        }

        let portfolio = self.repos.portfolio.list_for_user(profile_id).await?;
        if portfolio.len() < MIN_PORTFOLIO_ITEMS {
            return Err(WorkflowError::validation(
                "portfolio",
                format!(
                    "at least {MIN_PORTFOLIO_ITEMS} portfolio items are required, found {}",
                    portfolio.len()
                ),
            ));
        }

        Ok(())
    }
}
