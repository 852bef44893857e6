//! Postgres-backed integration tests.
//!
//! These are ignored by default and are intended to run in CI (or locally)
//! with `DATABASE_URL` set.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use proclusive_workflow::domain::{
    AdminId, Application, ApplicationStatus, BadgeLevel, EntityType, NewReferral, PointKey,
    PointStatus, Profile, ReferralStatus,
};
use proclusive_workflow::infra::{
    ApplicationRepository, AuditLog, BadgeRepository, PgApplicationStore, PgAuditLog,
    PgMemberStore, ProfileRepository, RecordingPublisher,
};
use proclusive_workflow::metrics::MetricsRegistry;
use proclusive_workflow::server::AppState;
use proclusive_workflow::workflow::{AdvanceRequest, Repositories, StatusChangeRequest};

async fn connect_db() -> Option<sqlx::PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .ok()?;
    Some(pool)
}

fn state(pool: &sqlx::PgPool) -> AppState {
    AppState::new(
        Repositories::postgres(pool.clone()),
        Arc::new(PgAuditLog::new(pool.clone())),
        Arc::new(RecordingPublisher::new()),
        Arc::new(MetricsRegistry::new()),
        Some(pool.clone()),
    )
}

async fn insert_member(pool: &sqlx::PgPool, name: &str) -> Profile {
    let profile = Profile::new(name, format!("{}-{}@example.com", name, Uuid::new_v4()));
    PgMemberStore::new(pool.clone())
        .save(&profile)
        .await
        .unwrap();
    profile
}

#[tokio::test]
#[ignore]
async fn postgres_approval_persists_profile_badges_and_audit() {
    let Some(pool) = connect_db().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    proclusive_workflow::migrations::run_postgres(&pool)
        .await
        .unwrap();

    let state = state(&pool);
    let admin = AdminId::from_uuid(Uuid::new_v4());
    let member = insert_member(&pool, "pg-approve").await;

    let applications = PgApplicationStore::new(pool.clone());
    let mut application = Application::new(member.id, false);
    for key in PointKey::TIER_ONE {
        application.points.set(key, PointStatus::Verified);
    }
    applications.save(&application).await.unwrap();

    let outcome = state
        .verification
        .transition_application_status(
            admin,
            application.id,
            ApplicationStatus::Approved,
            StatusChangeRequest {
                admin_notes: None,
                selected_badges: vec![BadgeLevel::Verified, BadgeLevel::Elite],
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.entity.status, ApplicationStatus::Approved);
    assert!(outcome.side_effects.audit_recorded());

    let stored = applications.get(&application.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ApplicationStatus::Approved);
    assert_eq!(stored.reviewed_by, Some(admin));

    let members = PgMemberStore::new(pool.clone());
    let profile = members.get(&member.id).await.unwrap().unwrap();
    assert!(profile.is_verified);
    assert_eq!(profile.badge_level, BadgeLevel::Elite);

    let badges = BadgeRepository::list_for_user(&members, &member.id)
        .await
        .unwrap();
    assert_eq!(badges.len(), 2);

    let audit = PgAuditLog::new(pool.clone());
    let entries = audit
        .for_entity(EntityType::Application, application.id.0)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].admin_id, admin);

    let report = state.reconciler.scan().await.unwrap();
    assert!(report
        .findings
        .iter()
        .all(|f| f.profile_id != member.id));
}

#[tokio::test]
#[ignore]
async fn postgres_referral_pipeline_round_trips() {
    let Some(pool) = connect_db().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    proclusive_workflow::migrations::run_postgres(&pool)
        .await
        .unwrap();

    let state = state(&pool);
    let admin = AdminId::from_uuid(Uuid::new_v4());
    let submitter = insert_member(&pool, "pg-referrer").await;
    let partner = insert_member(&pool, "pg-partner").await;

    let referral = state
        .referrals
        .submit(
            submitter.id,
            NewReferral {
                client_name: "Harbor Dental".to_string(),
                project_description: "Two-operatory buildout".to_string(),
                value_range: Some("$40,000".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    for request in [
        AdvanceRequest::default(),
        AdvanceRequest::matched(partner.id),
        AdvanceRequest::default(),
        AdvanceRequest::completed("$42,000"),
    ] {
        state
            .referrals
            .advance(admin, referral.id, request)
            .await
            .unwrap();
    }

    let stored = state.referrals.get(&referral.id).await.unwrap();
    assert_eq!(stored.status, ReferralStatus::Completed);
    assert_eq!(stored.matched_to, Some(partner.id));
    assert!(stored.completed_at.is_some());
    assert_eq!(stored.final_value.as_deref(), Some("$42,000"));

    let commission = state
        .referrals
        .commission(&referral.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(commission.referrer_amount, rust_decimal::Decimal::new(840, 0));

    let audit = PgAuditLog::new(pool.clone());
    let entries = audit
        .for_entity(EntityType::Referral, referral.id.0)
        .await
        .unwrap();
    assert_eq!(entries.len(), 4);
}
