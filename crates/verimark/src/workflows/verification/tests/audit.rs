use super::common::*;
use crate::workflows::verification::audit::{
    replay_document, replay_photo, AuditAction, AuditTarget,
};
use crate::workflows::verification::domain::{PhotoStatus, ReviewDecision, SlotKey, SlotStatus};
use crate::workflows::verification::repository::VerificationRepository;

#[test]
fn history_returns_newest_first_and_honors_the_limit() {
    let (service, repository, _) = build_service();
    let record = service.submit(driver_intake()).expect("intake succeeds");
    let id = record.applicant_id.clone();

    service
        .submit_document(&id, SlotKey::LicenseFront, "https://blobs.test/v1.jpg", "op-1")
        .expect("submission");
    service
        .review_document(&id, SlotKey::LicenseFront, ReviewDecision::Rejected, Some("glare"), "op-1")
        .expect("rejection");
    service
        .submit_document(&id, SlotKey::LicenseFront, "https://blobs.test/v2.jpg", "op-1")
        .expect("replacement");
    service
        .review_document(&id, SlotKey::LicenseFront, ReviewDecision::Approved, None, "op-2")
        .expect("approval");

    let history = repository.history(&id, 10).expect("history loads");
    let actions: Vec<AuditAction> = history.iter().map(|entry| entry.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Approved,
            AuditAction::Replaced,
            AuditAction::Rejected,
            AuditAction::Submitted,
        ],
        "newest first"
    );

    let truncated = repository.history(&id, 2).expect("history loads");
    assert_eq!(truncated.len(), 2);
    assert_eq!(truncated[0].action, AuditAction::Approved);
}

#[test]
fn replaying_a_slot_trail_reconstructs_the_stored_state() {
    let (service, repository, _) = build_service();
    let record = service.submit(driver_intake()).expect("intake succeeds");
    let id = record.applicant_id.clone();

    service
        .submit_document(&id, SlotKey::LicenseFront, "https://blobs.test/v1.jpg", "op-1")
        .expect("submission");
    service
        .review_document(&id, SlotKey::LicenseFront, ReviewDecision::Rejected, Some("glare"), "op-1")
        .expect("rejection");
    service
        .submit_document(&id, SlotKey::LicenseFront, "https://blobs.test/v2.jpg", "op-1")
        .expect("replacement");
    service
        .review_document(&id, SlotKey::LicenseFront, ReviewDecision::Approved, None, "op-2")
        .expect("approval");

    let mut trail = repository.history(&id, 100).expect("history loads");
    trail.reverse(); // oldest first for replay

    let replay = replay_document(&trail, SlotKey::LicenseFront);
    let stored = service.get(&id).expect("record present");
    let slot = stored.document(SlotKey::LicenseFront).expect("slot exists");

    assert_eq!(replay.url, slot.url);
    assert_eq!(replay.status, slot.status);
    assert_eq!(replay.rejection_reason, slot.rejection_reason);
    assert_eq!(replay.status, SlotStatus::Approved);
    assert_eq!(replay.url.as_deref(), Some("https://blobs.test/v2.jpg"));
}

#[test]
fn replaying_a_photo_trail_reconstructs_the_stored_state() {
    let (service, repository, _) = build_service();
    let record = service.submit(driver_intake()).expect("intake succeeds");
    let id = record.applicant_id.clone();

    let index = service
        .submit_vehicle_photo(&id, None, "https://blobs.test/p0.jpg", "op-1")
        .expect("photo submits");
    service
        .review_vehicle_photo(&id, index, ReviewDecision::Rejected, Some("plate hidden"), "op-1")
        .expect("rejection");
    service
        .submit_vehicle_photo(&id, Some(index), "https://blobs.test/p0b.jpg", "op-1")
        .expect("replacement");
    service
        .review_vehicle_photo(&id, index, ReviewDecision::Approved, None, "op-1")
        .expect("approval");

    let mut trail = repository.history(&id, 100).expect("history loads");
    trail.reverse();

    let replay = replay_photo(&trail, index);
    let stored = service.get(&id).expect("record present");
    let photo = &stored.vehicle_photos[index];

    assert_eq!(replay.url.as_deref(), Some(photo.url.as_str()));
    assert_eq!(replay.status, Some(PhotoStatus::Approved));
    assert_eq!(replay.rejection_reason, photo.rejection_reason);
}

#[test]
fn replay_ignores_entries_for_other_targets() {
    let (service, repository, _) = build_service();
    let record = service.submit(driver_intake()).expect("intake succeeds");
    let id = record.applicant_id.clone();

    service
        .submit_document(&id, SlotKey::LicenseFront, "https://blobs.test/front.jpg", "op-1")
        .expect("submission");
    service
        .submit_document(&id, SlotKey::LicenseBack, "https://blobs.test/back.jpg", "op-1")
        .expect("submission");

    let mut trail = repository.history(&id, 100).expect("history loads");
    trail.reverse();

    let replay = replay_document(&trail, SlotKey::LicenseBack);
    assert_eq!(replay.url.as_deref(), Some("https://blobs.test/back.jpg"));
    assert_eq!(replay.status, SlotStatus::Pending);

    let untouched = replay_document(&trail, SlotKey::VehicleRegistration);
    assert_eq!(untouched.status, SlotStatus::NotSubmitted);
    assert_eq!(untouched.url, None);
}

#[test]
fn applicant_level_decisions_are_audited_at_applicant_granularity() {
    let (service, repository, _) = build_service();
    let record = fully_prepared_driver(&service);
    let id = record.applicant_id.clone();

    service.approve(&id, "op-lead").expect("approval succeeds");

    let history = repository.history(&id, 1).expect("history loads");
    assert_eq!(history[0].target, AuditTarget::Applicant);
    assert_eq!(history[0].action, AuditAction::Approved);
    assert_eq!(history[0].actor_id, "op-lead");
}
