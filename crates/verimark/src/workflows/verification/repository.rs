use super::audit::AuditEntry;
use super::domain::{ApplicantId, ApplicantRecord};

/// Storage abstraction so the service module can be exercised in isolation.
///
/// Applicant records and their audit trails live behind the same port
/// because every mutation must land together with its audit entries.
pub trait VerificationRepository: Send + Sync {
    fn insert(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError>;

    fn fetch(&self, id: &ApplicantId) -> Result<Option<ApplicantRecord>, RepositoryError>;

    /// Persist an updated record together with the audit entries produced by
    /// the same mutation. The write is atomic: either the record and every
    /// entry land, or nothing does. Implementations must refuse the commit
    /// with `VersionConflict` when the stored version no longer matches
    /// `record.version`, and bump the stored version on success.
    fn commit(
        &self,
        record: ApplicantRecord,
        entries: Vec<AuditEntry>,
    ) -> Result<(), RepositoryError>;

    /// Audit trail for one applicant, newest entry first.
    fn history(&self, id: &ApplicantId, limit: usize) -> Result<Vec<AuditEntry>, RepositoryError>;

    /// Applicants still awaiting an overall decision.
    fn pending(&self, limit: usize) -> Result<Vec<ApplicantRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record was modified by another operation")]
    VersionConflict,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Contact-channel verification signals supplied by the messaging platform.
/// OTP delivery and confirmation happen outside the workflow; only the
/// resulting booleans feed the approval gate.
pub trait ContactVerifier: Send + Sync {
    fn phone_verified(&self, id: &ApplicantId) -> Result<bool, ContactVerificationError>;
    fn email_verified(&self, id: &ApplicantId) -> Result<bool, ContactVerificationError>;
}

/// Contact-verification provider error.
#[derive(Debug, thiserror::Error)]
pub enum ContactVerificationError {
    #[error("contact verification provider unavailable: {0}")]
    Unavailable(String),
}

/// Display-only signing of stored blob urls. Signing never changes workflow
/// state; it only makes urls fetchable by the console for review.
pub trait UrlSigner: Send + Sync {
    fn sign(&self, url: &str) -> Result<String, SigningError>;
}

/// Url-signing provider error.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("url signing provider unavailable: {0}")]
    Unavailable(String),
}
