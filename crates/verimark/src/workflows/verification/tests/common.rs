use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::verification::audit::AuditEntry;
use crate::workflows::verification::domain::{
    ApplicantId, ApplicantIntake, ApplicantRecord, ApplicantType, OverallStatus, ReviewDecision,
    SlotKey,
};
use crate::workflows::verification::registry::DocumentRegistry;
use crate::workflows::verification::repository::{
    ContactVerificationError, ContactVerifier, RepositoryError, SigningError, UrlSigner,
    VerificationRepository,
};
use crate::workflows::verification::router::verification_router;
use crate::workflows::verification::service::VerificationService;

pub(super) fn driver_intake() -> ApplicantIntake {
    ApplicantIntake {
        applicant_type: ApplicantType::Driver,
        country_code: "KE".to_string(),
        contact_phone: "+254700000001".to_string(),
        contact_email: "driver@example.com".to_string(),
    }
}

pub(super) fn business_intake() -> ApplicantIntake {
    ApplicantIntake {
        applicant_type: ApplicantType::Business,
        country_code: "UG".to_string(),
        contact_phone: "+256700000002".to_string(),
        contact_email: "owner@example.com".to_string(),
    }
}

pub(super) type MemoryService =
    VerificationService<MemoryRepository, StaticContacts, PassthroughSigner>;

pub(super) fn build_service() -> (MemoryService, Arc<MemoryRepository>, Arc<StaticContacts>) {
    let repository = Arc::new(MemoryRepository::default());
    let contacts = Arc::new(StaticContacts::verified());
    let service = VerificationService::new(
        repository.clone(),
        contacts.clone(),
        Arc::new(PassthroughSigner),
        DocumentRegistry::standard(),
    );
    (service, repository, contacts)
}

pub(super) fn verification_router_with_service(service: MemoryService) -> axum::Router {
    verification_router(Arc::new(service))
}

/// Submit the three required driver documents and approve them.
pub(super) fn approve_required_driver_documents(service: &MemoryService, id: &ApplicantId) {
    for key in [
        SlotKey::LicenseFront,
        SlotKey::LicenseBack,
        SlotKey::VehicleRegistration,
    ] {
        service
            .submit_document(id, key, &format!("https://blobs.test/{key}.jpg"), "op-1")
            .expect("document submits");
        service
            .review_document(id, key, ReviewDecision::Approved, None, "op-1")
            .expect("document approves");
    }
}

/// Submit and approve enough vehicle photos to satisfy the driver quorum.
pub(super) fn approve_photo_quorum(service: &MemoryService, id: &ApplicantId) {
    for n in 0..4 {
        let index = service
            .submit_vehicle_photo(id, None, &format!("https://blobs.test/photo-{n}.jpg"), "op-1")
            .expect("photo submits");
        service
            .review_vehicle_photo(id, index, ReviewDecision::Approved, None, "op-1")
            .expect("photo approves");
    }
}

/// Walk a freshly submitted driver all the way to an approvable state.
pub(super) fn fully_prepared_driver(service: &MemoryService) -> ApplicantRecord {
    let record = service.submit(driver_intake()).expect("intake succeeds");
    approve_required_driver_documents(service, &record.applicant_id);
    approve_photo_quorum(service, &record.applicant_id);
    service.get(&record.applicant_id).expect("record present")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    records: HashMap<ApplicantId, ApplicantRecord>,
    audit: HashMap<ApplicantId, Vec<AuditEntry>>,
}

impl VerificationRepository for MemoryRepository {
    fn insert(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if state.records.contains_key(&record.applicant_id) {
            return Err(RepositoryError::Conflict);
        }
        state
            .records
            .insert(record.applicant_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ApplicantId) -> Result<Option<ApplicantRecord>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.records.get(id).cloned())
    }

    fn commit(
        &self,
        mut record: ApplicantRecord,
        entries: Vec<AuditEntry>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        let stored = state
            .records
            .get(&record.applicant_id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != record.version {
            return Err(RepositoryError::VersionConflict);
        }
        record.version += 1;
        state
            .audit
            .entry(record.applicant_id.clone())
            .or_default()
            .extend(entries);
        state.records.insert(record.applicant_id.clone(), record);
        Ok(())
    }

    fn history(&self, id: &ApplicantId, limit: usize) -> Result<Vec<AuditEntry>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state
            .audit
            .get(id)
            .map(|entries| entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn pending(&self, limit: usize) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state
            .records
            .values()
            .filter(|record| record.overall_status == OverallStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Contact signals the tests can flip per channel.
pub(super) struct StaticContacts {
    phone: AtomicBool,
    email: AtomicBool,
}

impl StaticContacts {
    pub(super) fn verified() -> Self {
        Self {
            phone: AtomicBool::new(true),
            email: AtomicBool::new(true),
        }
    }

    pub(super) fn set_phone(&self, verified: bool) {
        self.phone.store(verified, Ordering::Relaxed);
    }

    pub(super) fn set_email(&self, verified: bool) {
        self.email.store(verified, Ordering::Relaxed);
    }
}

impl ContactVerifier for StaticContacts {
    fn phone_verified(&self, _id: &ApplicantId) -> Result<bool, ContactVerificationError> {
        Ok(self.phone.load(Ordering::Relaxed))
    }

    fn email_verified(&self, _id: &ApplicantId) -> Result<bool, ContactVerificationError> {
        Ok(self.email.load(Ordering::Relaxed))
    }
}

pub(super) struct FailingContacts;

impl ContactVerifier for FailingContacts {
    fn phone_verified(&self, _id: &ApplicantId) -> Result<bool, ContactVerificationError> {
        Err(ContactVerificationError::Unavailable(
            "provider offline".to_string(),
        ))
    }

    fn email_verified(&self, _id: &ApplicantId) -> Result<bool, ContactVerificationError> {
        Err(ContactVerificationError::Unavailable(
            "provider offline".to_string(),
        ))
    }
}

pub(super) struct PassthroughSigner;

impl UrlSigner for PassthroughSigner {
    fn sign(&self, url: &str) -> Result<String, SigningError> {
        Ok(url.to_string())
    }
}

pub(super) struct PrefixSigner;

impl UrlSigner for PrefixSigner {
    fn sign(&self, url: &str) -> Result<String, SigningError> {
        Ok(format!("{url}?sig=test"))
    }
}

pub(super) struct UnavailableRepository;

impl VerificationRepository for UnavailableRepository {
    fn insert(&self, _record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicantId) -> Result<Option<ApplicantRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn commit(
        &self,
        _record: ApplicantRecord,
        _entries: Vec<AuditEntry>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn history(
        &self,
        _id: &ApplicantId,
        _limit: usize,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn pending(&self, _limit: usize) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Repository whose commits always lose the version race, for exercising the
/// retry budget.
#[derive(Default)]
pub(super) struct ContendedRepository {
    inner: MemoryRepository,
}

impl VerificationRepository for ContendedRepository {
    fn insert(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        self.inner.insert(record)
    }

    fn fetch(&self, id: &ApplicantId) -> Result<Option<ApplicantRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn commit(
        &self,
        _record: ApplicantRecord,
        _entries: Vec<AuditEntry>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::VersionConflict)
    }

    fn history(&self, id: &ApplicantId, limit: usize) -> Result<Vec<AuditEntry>, RepositoryError> {
        self.inner.history(id, limit)
    }

    fn pending(&self, limit: usize) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        self.inner.pending(limit)
    }
}
