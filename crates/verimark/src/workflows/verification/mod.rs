//! Applicant verification workflow: per-document review, vehicle photo
//! quorum tracking, contact-channel signals, and the aggregate approval gate
//! that decides when a driver or business may go live on the marketplace.

pub mod audit;
pub mod domain;
pub mod gate;
pub mod registry;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use audit::{
    replay_document, replay_photo, AuditAction, AuditEntry, AuditTarget, PhotoReplay, SlotReplay,
};
pub use domain::{
    ApplicantId, ApplicantIntake, ApplicantRecord, ApplicantType, DocumentSlot, DocumentSlotView,
    OverallStatus, PhotoStatus, ReviewDecision, SlotKey, SlotStatus, UnknownApplicantType,
    VehiclePhoto, VehiclePhotoView, VerificationStatusView,
};
pub use gate::ApprovalCheck;
pub use registry::{DocumentRegistry, SlotSpec};
pub use repository::{
    ContactVerificationError, ContactVerifier, RepositoryError, SigningError, UrlSigner,
    VerificationRepository,
};
pub use router::verification_router;
pub use service::{VerificationError, VerificationService};
