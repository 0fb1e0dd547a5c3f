use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use verimark::workflows::verification::{
    ApplicantId, ApplicantRecord, AuditEntry, ContactVerificationError, ContactVerifier,
    OverallStatus, RepositoryError, SigningError, UrlSigner, VerificationRepository,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryVerificationRepository {
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    records: HashMap<ApplicantId, ApplicantRecord>,
    audit: HashMap<ApplicantId, Vec<AuditEntry>>,
}

impl VerificationRepository for InMemoryVerificationRepository {
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

/// Stand-in for the messaging platform's verification lookups. Real
/// deployments wire the provider adapter here; the in-memory directory lets
/// the console and demo run without one.
#[derive(Default)]
pub(crate) struct InMemoryContactDirectory {
    state: Mutex<DirectoryState>,
}

#[derive(Default)]
struct DirectoryState {
    phone: HashMap<ApplicantId, bool>,
    email: HashMap<ApplicantId, bool>,
    default_verified: bool,
}

impl InMemoryContactDirectory {
    /// Directory that treats every contact as verified until told otherwise.
    pub(crate) fn verified_by_default() -> Self {
        Self {
            state: Mutex::new(DirectoryState {
                phone: HashMap::new(),
                email: HashMap::new(),
                default_verified: true,
            }),
        }
    }

    pub(crate) fn mark_phone(&self, id: &ApplicantId, verified: bool) {
        let mut state = self.state.lock().expect("directory mutex poisoned");
        state.phone.insert(id.clone(), verified);
    }

    pub(crate) fn mark_email(&self, id: &ApplicantId, verified: bool) {
        let mut state = self.state.lock().expect("directory mutex poisoned");
        state.email.insert(id.clone(), verified);
    }
}

impl ContactVerifier for InMemoryContactDirectory {
    fn phone_verified(&self, id: &ApplicantId) -> Result<bool, ContactVerificationError> {
        let state = self.state.lock().expect("directory mutex poisoned");
        Ok(*state.phone.get(id).unwrap_or(&state.default_verified))
    }

    fn email_verified(&self, id: &ApplicantId) -> Result<bool, ContactVerificationError> {
        let state = self.state.lock().expect("directory mutex poisoned");
        Ok(*state.email.get(id).unwrap_or(&state.default_verified))
    }
}

/// Signing is an external blob-store concern; the passthrough keeps urls
/// usable in environments without a signing service.
pub(crate) struct PassthroughUrlSigner;

impl UrlSigner for PassthroughUrlSigner {
    fn sign(&self, url: &str) -> Result<String, SigningError> {
        Ok(url.to_string())
    }
}
