use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use super::audit::{AuditAction, AuditEntry, AuditTarget};
use super::domain::{
    ApplicantId, ApplicantIntake, ApplicantRecord, OverallStatus, PhotoStatus, ReviewDecision,
    SlotKey, SlotStatus, UnknownApplicantType, VehiclePhoto, VerificationStatusView,
};
use super::gate::{self, ApprovalCheck};
use super::registry::DocumentRegistry;
use super::repository::{
    ContactVerificationError, ContactVerifier, RepositoryError, SigningError, UrlSigner,
    VerificationRepository,
};

/// Service composing the document registry, the verification state store,
/// and the external contact-verification and url-signing collaborators.
pub struct VerificationService<R, C, S> {
    registry: DocumentRegistry,
    repository: Arc<R>,
    contacts: Arc<C>,
    signer: Arc<S>,
}

static APPLICANT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_applicant_id() -> ApplicantId {
    let id = APPLICANT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicantId(format!("apl-{id:06}"))
}

/// Attempts per operation before a version conflict is surfaced to the
/// caller. Conflicts only arise when two operators touch the same applicant
/// at the same instant, so a short retry budget is enough.
const COMMIT_ATTEMPTS: usize = 3;

impl<R, C, S> VerificationService<R, C, S>
where
    R: VerificationRepository + 'static,
    C: ContactVerifier + 'static,
    S: UrlSigner + 'static,
{
    pub fn new(
        repository: Arc<R>,
        contacts: Arc<C>,
        signer: Arc<S>,
        registry: DocumentRegistry,
    ) -> Self {
        Self {
            registry,
            repository,
            contacts,
            signer,
        }
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    /// Register a new applicant, instantiating every catalog slot for its
    /// type as `not_submitted`.
    pub fn submit(&self, intake: ApplicantIntake) -> Result<ApplicantRecord, VerificationError> {
        let applicant_id = next_applicant_id();
        let record = ApplicantRecord::from_intake(applicant_id, intake, &self.registry, Utc::now());
        let stored = self.repository.insert(record)?;
        Ok(stored)
    }

    /// Attach a document artifact to one of the applicant's slots. The slot
    /// drops back to `pending` review; replacements keep the old url in the
    /// audit trail.
    pub fn submit_document(
        &self,
        id: &ApplicantId,
        key: SlotKey,
        url: &str,
        actor_id: &str,
    ) -> Result<ApplicantRecord, VerificationError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(VerificationError::MissingUrl);
        }

        self.mutate(id, |record| {
            let spec = self
                .registry
                .spec_for(record.applicant_type, key)
                .ok_or(VerificationError::UnknownSlot {
                    slot: key,
                    applicant_type: record.applicant_type.label(),
                })?;

            let applicant_id = record.applicant_id.clone();
            let slot = record.document_entry(spec);
            let action = if slot.url.is_none() {
                AuditAction::Submitted
            } else {
                AuditAction::Replaced
            };
            let old_url = slot.url.take();
            slot.url = Some(url.to_string());
            slot.status = SlotStatus::Pending;
            slot.rejection_reason = None;

            Ok(vec![AuditEntry {
                applicant_id,
                target: AuditTarget::Document(key),
                action,
                old_url,
                new_url: Some(url.to_string()),
                reason: None,
                actor_id: actor_id.to_string(),
                created_at: Utc::now(),
            }])
        })
    }

    /// Attach a vehicle photo: append when `index` is `None`, replace the
    /// photo at `index` otherwise. Returns the index holding the new photo.
    pub fn submit_vehicle_photo(
        &self,
        id: &ApplicantId,
        index: Option<usize>,
        url: &str,
        actor_id: &str,
    ) -> Result<usize, VerificationError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(VerificationError::MissingUrl);
        }

        let mut stored_index = 0;
        self.mutate(id, |record| {
            let applicant_id = record.applicant_id.clone();
            match index {
                Some(index) => {
                    let count = record.vehicle_photos.len();
                    let photo = record
                        .vehicle_photos
                        .get_mut(index)
                        .ok_or(VerificationError::IndexOutOfRange { index, count })?;
                    let old_url = std::mem::replace(&mut photo.url, url.to_string());
                    photo.status = PhotoStatus::Pending;
                    photo.rejection_reason = None;
                    photo.reviewed_at = None;
                    stored_index = index;

                    Ok(vec![AuditEntry {
                        applicant_id,
                        target: AuditTarget::VehiclePhoto(index),
                        action: AuditAction::Replaced,
                        old_url: Some(old_url),
                        new_url: Some(url.to_string()),
                        reason: None,
                        actor_id: actor_id.to_string(),
                        created_at: Utc::now(),
                    }])
                }
                None => {
                    let index = record.vehicle_photos.len();
                    record.vehicle_photos.push(VehiclePhoto {
                        index,
                        url: url.to_string(),
                        status: PhotoStatus::Pending,
                        rejection_reason: None,
                        reviewed_at: None,
                    });
                    stored_index = index;

                    Ok(vec![AuditEntry {
                        applicant_id,
                        target: AuditTarget::VehiclePhoto(index),
                        action: AuditAction::Submitted,
                        old_url: None,
                        new_url: Some(url.to_string()),
                        reason: None,
                        actor_id: actor_id.to_string(),
                        created_at: Utc::now(),
                    }])
                }
            }
        })?;

        Ok(stored_index)
    }

    /// Apply an operator decision to one document slot.
    ///
    /// Re-applying an identical decision is a no-op on the slot but still
    /// appends an audit entry, so re-affirmations stay on the record. The
    /// aggregate gate is recomputed as a side effect; it never flips the
    /// overall status by itself.
    pub fn review_document(
        &self,
        id: &ApplicantId,
        key: SlotKey,
        decision: ReviewDecision,
        reason: Option<&str>,
        actor_id: &str,
    ) -> Result<ApplicantRecord, VerificationError> {
        let reason = normalize_reason(decision, reason)?;

        let record = self.mutate(id, |record| {
            let spec = self
                .registry
                .spec_for(record.applicant_type, key)
                .ok_or(VerificationError::UnknownSlot {
                    slot: key,
                    applicant_type: record.applicant_type.label(),
                })?;

            let applicant_id = record.applicant_id.clone();
            let slot = record.document_entry(spec);
            if slot.url.is_none() || slot.status == SlotStatus::NotSubmitted {
                return Err(VerificationError::InvalidTransition {
                    from: SlotStatus::NotSubmitted.label(),
                    to: decision.label(),
                });
            }

            match decision {
                ReviewDecision::Approved => {
                    slot.status = SlotStatus::Approved;
                    slot.rejection_reason = None;
                }
                ReviewDecision::Rejected => {
                    slot.status = SlotStatus::Rejected;
                    slot.rejection_reason = reason.clone();
                }
            }

            Ok(vec![AuditEntry {
                applicant_id,
                target: AuditTarget::Document(key),
                action: decision_action(decision),
                old_url: None,
                new_url: None,
                reason: reason.clone(),
                actor_id: actor_id.to_string(),
                created_at: Utc::now(),
            }])
        })?;

        self.log_gate(&record);
        Ok(record)
    }

    /// Apply an operator decision to one vehicle photo.
    pub fn review_vehicle_photo(
        &self,
        id: &ApplicantId,
        index: usize,
        decision: ReviewDecision,
        reason: Option<&str>,
        actor_id: &str,
    ) -> Result<ApplicantRecord, VerificationError> {
        let reason = normalize_reason(decision, reason)?;

        let record = self.mutate(id, |record| {
            let applicant_id = record.applicant_id.clone();
            let count = record.vehicle_photos.len();
            let photo = record
                .vehicle_photos
                .get_mut(index)
                .ok_or(VerificationError::IndexOutOfRange { index, count })?;

            match decision {
                ReviewDecision::Approved => {
                    photo.status = PhotoStatus::Approved;
                    photo.rejection_reason = None;
                }
                ReviewDecision::Rejected => {
                    photo.status = PhotoStatus::Rejected;
                    photo.rejection_reason = reason.clone();
                }
            }
            photo.reviewed_at = Some(Utc::now());

            Ok(vec![AuditEntry {
                applicant_id,
                target: AuditTarget::VehiclePhoto(index),
                action: decision_action(decision),
                old_url: None,
                new_url: None,
                reason: reason.clone(),
                actor_id: actor_id.to_string(),
                created_at: Utc::now(),
            }])
        })?;

        self.log_gate(&record);
        Ok(record)
    }

    /// Approve every slot that holds a submitted url and is not already
    /// approved, one audit entry per slot touched. Returns the keys actually
    /// changed, which may be empty.
    pub fn auto_approve_remaining(
        &self,
        id: &ApplicantId,
        actor_id: &str,
    ) -> Result<Vec<SlotKey>, VerificationError> {
        let mut approved = Vec::new();
        let record = self.mutate(id, |record| {
            approved.clear();
            let applicant_id = record.applicant_id.clone();
            let now = Utc::now();
            let mut entries = Vec::new();

            for slot in &mut record.documents {
                if slot.url.is_none() || slot.status == SlotStatus::Approved {
                    continue;
                }
                slot.status = SlotStatus::Approved;
                slot.rejection_reason = None;
                approved.push(slot.key);
                entries.push(AuditEntry {
                    applicant_id: applicant_id.clone(),
                    target: AuditTarget::Document(slot.key),
                    action: AuditAction::Approved,
                    old_url: None,
                    new_url: None,
                    reason: None,
                    actor_id: actor_id.to_string(),
                    created_at: now,
                });
            }

            Ok(entries)
        })?;

        self.log_gate(&record);
        Ok(approved)
    }

    /// Evaluate the aggregate approval gate without mutating anything.
    pub fn can_approve(&self, id: &ApplicantId) -> Result<ApprovalCheck, VerificationError> {
        let record = self.load(id)?;
        self.gate_check(&record)
    }

    /// Promote a pending applicant to `approved`. Fails with the complete
    /// blocking checklist when any gate condition is unmet.
    pub fn approve(
        &self,
        id: &ApplicantId,
        actor_id: &str,
    ) -> Result<ApplicantRecord, VerificationError> {
        self.mutate(id, |record| {
            if record.overall_status != OverallStatus::Pending {
                return Err(VerificationError::InvalidTransition {
                    from: record.overall_status.label(),
                    to: OverallStatus::Approved.label(),
                });
            }

            let phone_verified = self.contacts.phone_verified(&record.applicant_id)?;
            let email_verified = self.contacts.email_verified(&record.applicant_id)?;
            let check = gate::evaluate(record, &self.registry, phone_verified, email_verified);
            if !check.allowed {
                return Err(VerificationError::PreconditionFailed {
                    blocking_reasons: check.blocking_reasons,
                });
            }

            record.overall_status = OverallStatus::Approved;
            record.phone_verified = phone_verified;
            record.email_verified = email_verified;
            record.rejection_reason = None;
            record.reviewed_at = Some(Utc::now());

            Ok(vec![AuditEntry {
                applicant_id: record.applicant_id.clone(),
                target: AuditTarget::Applicant,
                action: AuditAction::Approved,
                old_url: None,
                new_url: None,
                reason: None,
                actor_id: actor_id.to_string(),
                created_at: Utc::now(),
            }])
        })
    }

    /// Reject a pending applicant. Terminal states never transition again;
    /// re-verification arrives as a new applicant record upstream.
    pub fn reject(
        &self,
        id: &ApplicantId,
        reason: &str,
        actor_id: &str,
    ) -> Result<ApplicantRecord, VerificationError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(VerificationError::MissingReason);
        }

        self.mutate(id, |record| {
            if record.overall_status != OverallStatus::Pending {
                return Err(VerificationError::InvalidTransition {
                    from: record.overall_status.label(),
                    to: OverallStatus::Rejected.label(),
                });
            }

            record.overall_status = OverallStatus::Rejected;
            record.rejection_reason = Some(reason.to_string());
            record.reviewed_at = Some(Utc::now());

            Ok(vec![AuditEntry {
                applicant_id: record.applicant_id.clone(),
                target: AuditTarget::Applicant,
                action: AuditAction::Rejected,
                old_url: None,
                new_url: None,
                reason: Some(reason.to_string()),
                actor_id: actor_id.to_string(),
                created_at: Utc::now(),
            }])
        })
    }

    /// Fetch an applicant record for API responses.
    pub fn get(&self, id: &ApplicantId) -> Result<ApplicantRecord, VerificationError> {
        self.load(id)
    }

    /// Console-facing view with signed urls.
    pub fn status_view(
        &self,
        id: &ApplicantId,
    ) -> Result<VerificationStatusView, VerificationError> {
        let record = self.load(id)?;
        Ok(record.status_view(self.signer.as_ref())?)
    }

    /// Review queue: applicants still awaiting an overall decision.
    pub fn pending_queue(
        &self,
        limit: usize,
    ) -> Result<Vec<VerificationStatusView>, VerificationError> {
        let records = self.repository.pending(limit)?;
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            views.push(record.status_view(self.signer.as_ref())?);
        }
        Ok(views)
    }

    /// Audit trail for one applicant, newest entry first.
    pub fn history(
        &self,
        id: &ApplicantId,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, VerificationError> {
        // Resolve the applicant first so unknown ids surface as NotFound
        // rather than an empty trail.
        let _ = self.load(id)?;
        Ok(self.repository.history(id, limit)?)
    }

    fn load(&self, id: &ApplicantId) -> Result<ApplicantRecord, VerificationError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| VerificationError::NotFound(id.0.clone()))
    }

    fn gate_check(&self, record: &ApplicantRecord) -> Result<ApprovalCheck, VerificationError> {
        let phone_verified = self.contacts.phone_verified(&record.applicant_id)?;
        let email_verified = self.contacts.email_verified(&record.applicant_id)?;
        Ok(gate::evaluate(
            record,
            &self.registry,
            phone_verified,
            email_verified,
        ))
    }

    // The recompute is observational: the decision is already committed, so
    // a collaborator outage here must not fail the review.
    fn log_gate(&self, record: &ApplicantRecord) {
        match self.gate_check(record) {
            Ok(check) => debug!(
                applicant = %record.applicant_id.0,
                allowed = check.allowed,
                blocking = check.blocking_reasons.len(),
                "approval gate recomputed"
            ),
            Err(error) => debug!(
                applicant = %record.applicant_id.0,
                %error,
                "approval gate recompute skipped"
            ),
        }
    }

    /// Read-modify-write with the optimistic version check. The closure runs
    /// against a fresh snapshot on every attempt and returns the audit
    /// entries that must land atomically with the record.
    fn mutate<F>(&self, id: &ApplicantId, mut apply: F) -> Result<ApplicantRecord, VerificationError>
    where
        F: FnMut(&mut ApplicantRecord) -> Result<Vec<AuditEntry>, VerificationError>,
    {
        for _ in 0..COMMIT_ATTEMPTS {
            let mut record = self.load(id)?;
            let entries = apply(&mut record)?;
            match self.repository.commit(record.clone(), entries) {
                Ok(()) => {
                    record.version += 1;
                    return Ok(record);
                }
                Err(RepositoryError::VersionConflict) => continue,
                Err(other) => return Err(other.into()),
            }
        }

        Err(VerificationError::ConcurrentModification)
    }
}

fn decision_action(decision: ReviewDecision) -> AuditAction {
    match decision {
        ReviewDecision::Approved => AuditAction::Approved,
        ReviewDecision::Rejected => AuditAction::Rejected,
    }
}

/// A rejection without a reason is refused before any state is touched.
fn normalize_reason(
    decision: ReviewDecision,
    reason: Option<&str>,
) -> Result<Option<String>, VerificationError> {
    match decision {
        ReviewDecision::Rejected => {
            let reason = reason
                .map(str::trim)
                .filter(|reason| !reason.is_empty())
                .ok_or(VerificationError::MissingReason)?;
            Ok(Some(reason.to_string()))
        }
        ReviewDecision::Approved => Ok(None),
    }
}

/// Error raised by the verification workflow.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("applicant {0} not found")]
    NotFound(String),
    #[error("slot {slot} is not part of the {applicant_type} document set")]
    UnknownSlot {
        slot: SlotKey,
        applicant_type: &'static str,
    },
    #[error(transparent)]
    UnknownApplicantType(#[from] UnknownApplicantType),
    #[error("vehicle photo index {index} out of range ({count} submitted)")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("a rejection requires a reason")]
    MissingReason,
    #[error("a submission requires a non-empty url")]
    MissingUrl,
    #[error("approval blocked: {}", blocking_reasons.join("; "))]
    PreconditionFailed { blocking_reasons: Vec<String> },
    #[error("cannot transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("applicant was modified concurrently, retry the operation")]
    ConcurrentModification,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    ContactVerification(#[from] ContactVerificationError),
    #[error(transparent)]
    Signing(#[from] SigningError),
}
