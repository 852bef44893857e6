//! Approval reconciliation and admin profile operations.

mod common;

use chrono::Utc;

use common::*;

use proclusive_workflow::domain::{
    Application, ApplicationStatus, BadgeLevel, ProfileUpdate, UserBadge,
};
use proclusive_workflow::infra::{
    ApplicationRepository, AuditAction, BadgeRepository, ProfileRepository, WorkflowError,
};
use proclusive_workflow::workflow::FindingKind;

#[tokio::test]
async fn test_consistent_store_has_no_findings() {
    let h = Harness::new();
    let member = h.member("Ana").await;
    let application = h.tier_one_verified_application(&member).await;
    h.state
        .verification
        .transition_application_status(
            test_admin(),
            application.id,
            ApplicationStatus::Approved,
            proclusive_workflow::workflow::StatusChangeRequest::approve(vec![BadgeLevel::Verified]),
        )
        .await
        .unwrap();

    assert!(h.state.reconciler.scan().await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_repair_reapplies_half_applied_approval() {
    let h = Harness::new();
    let member = h.member("Bea").await;

    // Application saved as approved and badges granted, but the profile write was lost
    let mut application = Application::new(member.id, false);
    application.status = ApplicationStatus::Approved;
    application.reviewed_at = Some(Utc::now());
    ApplicationRepository::save(h.store.as_ref(), &application)
        .await
        .unwrap();
    for level in [BadgeLevel::Verified, BadgeLevel::Elite] {
        BadgeRepository::upsert(
            h.store.as_ref(),
            &UserBadge {
                user_id: member.id,
                badge_level: level,
                granted_by: test_admin(),
                granted_at: Utc::now(),
            },
        )
        .await
        .unwrap();
    }

    // Verified without any approved application: reported, never repaired
    let mut orphan = h.member("Cal").await;
    orphan.is_verified = true;
    ProfileRepository::save(h.store.as_ref(), &orphan)
        .await
        .unwrap();

    let scan = h.state.reconciler.scan().await.unwrap();
    assert_eq!(scan.findings.len(), 2);
    assert_eq!(scan.repaired, 0);
    assert!(!h.profile(&member.id).await.is_verified);

    let report = h.state.reconciler.repair(test_admin()).await.unwrap();
    assert_eq!(report.repaired, 1);

    let repaired = h.profile(&member.id).await;
    assert!(repaired.is_verified);
    assert_eq!(repaired.badge_level, BadgeLevel::Elite);
    assert_eq!(repaired.approved_at, application.reviewed_at);

    let after = h.state.reconciler.scan().await.unwrap();
    assert_eq!(after.findings.len(), 1);
    assert_eq!(after.findings[0].kind, FindingKind::VerifiedWithoutApproval);
    assert_eq!(after.findings[0].profile_id, orphan.id);
    assert!(!after.findings[0].repairable());

    let audit = h.store.audit_entries().await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, AuditAction::BadgeReconciled);
}

#[tokio::test]
async fn test_record_payment_is_idempotent() {
    let h = Harness::new();
    let member = h.member("Dee").await;

    let first = h
        .state
        .membership
        .record_payment(test_admin(), member.id)
        .await
        .unwrap();
    assert!(first.entity.is_paid);
    let paid_at = first.entity.paid_at;
    assert!(paid_at.is_some());

    let second = h
        .state
        .membership
        .record_payment(test_admin(), member.id)
        .await
        .unwrap();
    assert_eq!(second.entity.paid_at, paid_at);

    let audit = h.store.audit_entries().await;
    assert_eq!(audit.len(), 2);
    assert!(audit.iter().all(|e| e.action == AuditAction::MarkedPaid));
    assert_eq!(audit[1].details.as_ref().unwrap()["already_paid"], true);
}

#[tokio::test]
async fn test_edit_profile_audits_changed_fields() {
    let h = Harness::new();
    let member = h.member("Eve").await;

    let outcome = h
        .state
        .membership
        .edit_profile(
            test_admin(),
            member.id,
            ProfileUpdate {
                company_name: Some("Eve Electric LLC".to_string()),
                trade: Some("Electrical".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.entity.company_name.as_deref(), Some("Eve Electric LLC"));

    let audit = h.store.audit_entries().await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, AuditAction::ProfileUpdated);
    assert_eq!(
        audit[0].details.as_ref().unwrap()["fields"],
        serde_json::json!(["company_name", "trade"])
    );

    // Same values again: nothing written
    let unchanged = h
        .state
        .membership
        .edit_profile(
            test_admin(),
            member.id,
            ProfileUpdate {
                company_name: Some("Eve Electric LLC".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(unchanged.side_effects.audit, None);
    assert_eq!(h.store.audit_entries().await.len(), 1);

    let err = h
        .state
        .membership
        .edit_profile(
            test_admin(),
            member.id,
            ProfileUpdate {
                email: Some(" ".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation { ref field, .. } if field == "email"));
}
