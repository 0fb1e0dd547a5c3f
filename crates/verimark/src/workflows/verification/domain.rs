use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::registry::{DocumentRegistry, SlotSpec};
use super::repository::{SigningError, UrlSigner};

/// Identifier wrapper for applicants undergoing verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicantId(pub String);

/// Kinds of marketplace registrations the workflow can verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicantType {
    Driver,
    Business,
}

/// Raised when an applicant-type string from an untrusted surface does not
/// name a supported registration kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown applicant type '{0}'")]
pub struct UnknownApplicantType(pub String);

impl ApplicantType {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicantType::Driver => "driver",
            ApplicantType::Business => "business",
        }
    }

    /// Parse a type string arriving from intake payloads or CLI flags.
    pub fn parse(value: &str) -> Result<Self, UnknownApplicantType> {
        match value.trim().to_ascii_lowercase().as_str() {
            "driver" => Ok(ApplicantType::Driver),
            "business" => Ok(ApplicantType::Business),
            other => Err(UnknownApplicantType(other.to_string())),
        }
    }
}

/// Overall lifecycle state of an applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Pending,
    Approved,
    Rejected,
}

impl OverallStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OverallStatus::Pending => "pending",
            OverallStatus::Approved => "approved",
            OverallStatus::Rejected => "rejected",
        }
    }
}

/// Closed catalog of document artifacts an applicant may submit.
///
/// Wire names are camelCase so the console and audit payloads round-trip the
/// same identifiers the registry reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotKey {
    LicenseFront,
    LicenseBack,
    VehicleRegistration,
    InsuranceCertificate,
    ProfilePhoto,
    BusinessLicense,
    TaxCertificate,
    OwnerIdentity,
    AddressProof,
}

impl SlotKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            SlotKey::LicenseFront => "licenseFront",
            SlotKey::LicenseBack => "licenseBack",
            SlotKey::VehicleRegistration => "vehicleRegistration",
            SlotKey::InsuranceCertificate => "insuranceCertificate",
            SlotKey::ProfilePhoto => "profilePhoto",
            SlotKey::BusinessLicense => "businessLicense",
            SlotKey::TaxCertificate => "taxCertificate",
            SlotKey::OwnerIdentity => "ownerIdentity",
            SlotKey::AddressProof => "addressProof",
        }
    }

    /// Parse a slot key from a path segment or stored identifier.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "licenseFront" => Some(SlotKey::LicenseFront),
            "licenseBack" => Some(SlotKey::LicenseBack),
            "vehicleRegistration" => Some(SlotKey::VehicleRegistration),
            "insuranceCertificate" => Some(SlotKey::InsuranceCertificate),
            "profilePhoto" => Some(SlotKey::ProfilePhoto),
            "businessLicense" => Some(SlotKey::BusinessLicense),
            "taxCertificate" => Some(SlotKey::TaxCertificate),
            "ownerIdentity" => Some(SlotKey::OwnerIdentity),
            "addressProof" => Some(SlotKey::AddressProof),
            _ => None,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review state of a single document slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    NotSubmitted,
    Pending,
    Approved,
    Rejected,
}

impl SlotStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SlotStatus::NotSubmitted => "not_submitted",
            SlotStatus::Pending => "pending",
            SlotStatus::Approved => "approved",
            SlotStatus::Rejected => "rejected",
        }
    }
}

/// Review state of a submitted vehicle photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoStatus {
    Pending,
    Approved,
    Rejected,
}

impl PhotoStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PhotoStatus::Pending => "pending",
            PhotoStatus::Approved => "approved",
            PhotoStatus::Rejected => "rejected",
        }
    }
}

/// Operator decision applied to a document slot, a vehicle photo, or the
/// applicant as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewDecision::Approved => "approved",
            ReviewDecision::Rejected => "rejected",
        }
    }
}

/// One required or optional artifact slot instantiated for an applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSlot {
    pub key: SlotKey,
    pub required: bool,
    pub url: Option<String>,
    pub status: SlotStatus,
    pub rejection_reason: Option<String>,
}

impl DocumentSlot {
    pub(crate) fn empty(spec: SlotSpec) -> Self {
        Self {
            key: spec.key,
            required: spec.required,
            url: None,
            status: SlotStatus::NotSubmitted,
            rejection_reason: None,
        }
    }
}

/// An indexed vehicle photo belonging to a driver applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehiclePhoto {
    pub index: usize,
    pub url: String,
    pub status: PhotoStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Inbound registration snapshot from the marketplace onboarding screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantIntake {
    pub applicant_type: ApplicantType,
    pub country_code: String,
    pub contact_phone: String,
    pub contact_email: String,
}

/// Persisted per-applicant verification record.
///
/// `version` backs the optimistic concurrency check: every committed mutation
/// bumps it, and a commit against a stale version is refused by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub applicant_id: ApplicantId,
    pub applicant_type: ApplicantType,
    pub overall_status: OverallStatus,
    pub country_code: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub phone_verified: bool,
    pub email_verified: bool,
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub documents: Vec<DocumentSlot>,
    pub vehicle_photos: Vec<VehiclePhoto>,
    pub version: u64,
}

impl ApplicantRecord {
    pub(crate) fn from_intake(
        applicant_id: ApplicantId,
        intake: ApplicantIntake,
        registry: &DocumentRegistry,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        let documents: Vec<DocumentSlot> = registry
            .slots_for(intake.applicant_type)
            .iter()
            .copied()
            .map(DocumentSlot::empty)
            .collect();

        Self {
            applicant_id,
            applicant_type: intake.applicant_type,
            overall_status: OverallStatus::Pending,
            country_code: intake.country_code,
            contact_phone: intake.contact_phone,
            contact_email: intake.contact_email,
            phone_verified: false,
            email_verified: false,
            rejection_reason: None,
            submitted_at,
            reviewed_at: None,
            documents,
            vehicle_photos: Vec::new(),
            version: 0,
        }
    }

    pub fn document(&self, key: SlotKey) -> Option<&DocumentSlot> {
        self.documents.iter().find(|slot| slot.key == key)
    }

    /// Slot accessor that instantiates the catalog entry on first touch, so
    /// records created before a catalog extension still accept the new slot.
    pub(crate) fn document_entry(&mut self, spec: SlotSpec) -> &mut DocumentSlot {
        let position = self.documents.iter().position(|slot| slot.key == spec.key);
        let index = match position {
            Some(index) => index,
            None => {
                self.documents.push(DocumentSlot::empty(spec));
                self.documents.len() - 1
            }
        };
        &mut self.documents[index]
    }

    pub fn approved_photo_count(&self) -> usize {
        self.vehicle_photos
            .iter()
            .filter(|photo| photo.status == PhotoStatus::Approved)
            .count()
    }

    /// Build the console-facing view, signing every stored blob url.
    pub fn status_view(
        &self,
        signer: &dyn UrlSigner,
    ) -> Result<VerificationStatusView, SigningError> {
        let mut documents = Vec::with_capacity(self.documents.len());
        for slot in &self.documents {
            let url = match &slot.url {
                Some(url) => Some(signer.sign(url)?),
                None => None,
            };
            documents.push(DocumentSlotView {
                key: slot.key,
                required: slot.required,
                url,
                status: slot.status.label(),
                rejection_reason: slot.rejection_reason.clone(),
            });
        }

        let mut vehicle_photos = Vec::with_capacity(self.vehicle_photos.len());
        for photo in &self.vehicle_photos {
            vehicle_photos.push(VehiclePhotoView {
                index: photo.index,
                url: signer.sign(&photo.url)?,
                status: photo.status.label(),
                rejection_reason: photo.rejection_reason.clone(),
            });
        }

        Ok(VerificationStatusView {
            applicant_id: self.applicant_id.clone(),
            applicant_type: self.applicant_type.label(),
            status: self.overall_status.label(),
            country_code: self.country_code.clone(),
            phone_verified: self.phone_verified,
            email_verified: self.email_verified,
            rejection_reason: self.rejection_reason.clone(),
            submitted_at: self.submitted_at,
            reviewed_at: self.reviewed_at,
            documents,
            vehicle_photos,
        })
    }
}

/// Sanitized representation of an applicant exposed to the review console.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationStatusView {
    pub applicant_id: ApplicantId,
    pub applicant_type: &'static str,
    pub status: &'static str,
    pub country_code: String,
    pub phone_verified: bool,
    pub email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub documents: Vec<DocumentSlotView>,
    pub vehicle_photos: Vec<VehiclePhotoView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSlotView {
    pub key: SlotKey,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehiclePhotoView {
    pub index: usize,
    pub url: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}
