//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use proclusive_workflow::domain::{
    AdminId, Application, ApplicationId, Document, DocumentType, EntityType, PointKey, PointStatus,
    PortfolioItem, Profile, ProfileId, MIN_PORTFOLIO_ITEMS,
};
use proclusive_workflow::infra::{
    ApplicationRepository, AuditLog, AuditLogEntry, DocumentRepository, EventPublisher,
    InMemoryStore,
    ProfileRepository, RecordingPublisher, Result, WorkflowError,
};
use proclusive_workflow::metrics::MetricsRegistry;
use proclusive_workflow::server::AppState;
use proclusive_workflow::workflow::{DocumentUpload, Repositories};

/// Test admin ID
pub fn test_admin() -> AdminId {
    AdminId::from_uuid(Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap())
}

/// Audit log whose writes always fail
#[derive(Default)]
pub struct FailingAuditLog;

#[async_trait]
impl AuditLog for FailingAuditLog {
    async fn append(&self, _entry: &AuditLogEntry) -> Result<()> {
        Err(WorkflowError::Storage("audit table unavailable".into()))
    }

    async fn for_entity(&self, _: EntityType, _: Uuid) -> Result<Vec<AuditLogEntry>> {
        Ok(Vec::new())
    }

    async fn for_review_subject(
        &self,
        _: &ApplicationId,
        _: &ProfileId,
    ) -> Result<Vec<AuditLogEntry>> {
        Ok(Vec::new())
    }
}

/// Publisher whose deliveries always fail
#[derive(Default)]
pub struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(
        &self,
        _notification: &proclusive_workflow::infra::Notification,
    ) -> Result<()> {
        Err(WorkflowError::Notification("email service down".into()))
    }
}

/// Document store that fails the n-th insert (1-based) and delegates the rest
pub struct FlakyDocuments {
    inner: Arc<InMemoryStore>,
    fail_on: usize,
    inserts: AtomicUsize,
}

impl FlakyDocuments {
    pub fn new(inner: Arc<InMemoryStore>, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            inserts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DocumentRepository for FlakyDocuments {
    async fn insert(&self, document: &Document) -> Result<()> {
        if self.inserts.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
            return Err(WorkflowError::Storage("document insert timed out".into()));
        }
        DocumentRepository::insert(self.inner.as_ref(), document).await
    }

    async fn list_for_application(&self, application_id: &ApplicationId) -> Result<Vec<Document>> {
        self.inner.list_for_application(application_id).await
    }
}

/// Engines over one in-memory store, with the store and publisher kept for assertions
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub publisher: Arc<RecordingPublisher>,
    pub state: AppState,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let state = AppState::new(
            Repositories::in_memory(store.clone()),
            store.clone(),
            publisher.clone(),
            Arc::new(MetricsRegistry::new()),
            None,
        );
        Self {
            store,
            publisher,
            state,
        }
    }

    /// Same store, but audit writes fail
    pub fn with_failing_audit() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let state = AppState::new(
            Repositories::in_memory(store.clone()),
            Arc::new(FailingAuditLog),
            publisher.clone(),
            Arc::new(MetricsRegistry::new()),
            None,
        );
        Self {
            store,
            publisher,
            state,
        }
    }

    /// Same store, but notification deliveries fail
    pub fn with_failing_publisher() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(
            Repositories::in_memory(store.clone()),
            store.clone(),
            Arc::new(FailingPublisher),
            Arc::new(MetricsRegistry::new()),
            None,
        );
        Self {
            store,
            publisher: Arc::new(RecordingPublisher::new()),
            state,
        }
    }

    pub async fn member(&self, name: &str) -> Profile {
        let profile = Profile::new(name, format!("{}@example.com", name.to_lowercase()));
        ProfileRepository::save(self.store.as_ref(), &profile)
            .await
            .unwrap();
        profile
    }

    pub async fn profile(&self, id: &ProfileId) -> Profile {
        ProfileRepository::get(self.store.as_ref(), id)
            .await
            .unwrap()
            .expect("profile exists")
    }

    pub async fn application(&self, id: &ApplicationId) -> Application {
        ApplicationRepository::get(self.store.as_ref(), id)
            .await
            .unwrap()
            .expect("application exists")
    }

    /// Pending application with every Tier-1 point already verified
    pub async fn tier_one_verified_application(&self, member: &Profile) -> Application {
        let mut application = Application::new(member.id, false);
        for key in PointKey::TIER_ONE {
            application.points.set(key, PointStatus::Verified);
        }
        ApplicationRepository::save(self.store.as_ref(), &application)
            .await
            .unwrap();
        application
    }

    pub async fn add_portfolio(&self, member: &Profile, count: usize) {
        for i in 0..count {
            self.store
                .add_portfolio_item(PortfolioItem {
                    id: Uuid::new_v4(),
                    user_id: member.id,
                    title: format!("Project {}", i + 1),
                    description: None,
                    image_path: None,
                    created_at: Utc::now(),
                })
                .await;
        }
    }

    pub async fn add_full_portfolio(&self, member: &Profile) {
        self.add_portfolio(member, MIN_PORTFOLIO_ITEMS).await;
    }
}

/// Document upload fixture
pub fn upload(document_type: DocumentType) -> DocumentUpload {
    DocumentUpload {
        document_type,
        file_path: format!("applications/{}/{}.pdf", Uuid::new_v4(), document_type),
        file_name: format!("{}.pdf", document_type),
        file_size: 52_431,
        mime_type: Some("application/pdf".to_string()),
    }
}

/// One upload for every required document-backed Tier-1 point
pub fn required_uploads() -> Vec<DocumentUpload> {
    vec![
        upload(DocumentType::BusinessRegistration),
        upload(DocumentType::ProfessionalLicense),
        upload(DocumentType::LiabilityInsurance),
        upload(DocumentType::WorkersComp),
        upload(DocumentType::W9),
    ]
}
