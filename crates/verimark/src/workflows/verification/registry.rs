use serde::{Deserialize, Serialize};

use super::domain::{ApplicantType, SlotKey};

/// One entry in the per-type document catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpec {
    pub key: SlotKey,
    pub required: bool,
}

impl SlotSpec {
    const fn required(key: SlotKey) -> Self {
        Self {
            key,
            required: true,
        }
    }

    const fn optional(key: SlotKey) -> Self {
        Self {
            key,
            required: false,
        }
    }
}

/// Catalog of document slots and the vehicle-photo quorum per applicant type.
///
/// Pure lookup: the catalog is fixed at construction and never mutated by the
/// workflow.
#[derive(Debug, Clone)]
pub struct DocumentRegistry {
    driver_slots: Vec<SlotSpec>,
    business_slots: Vec<SlotSpec>,
    driver_photo_quorum: usize,
}

impl DocumentRegistry {
    /// The marketplace's standard catalog: drivers carry both license faces
    /// and the vehicle registration as required artifacts; businesses carry
    /// their license, tax certificate, and owner identity document.
    pub fn standard() -> Self {
        Self {
            driver_slots: vec![
                SlotSpec::required(SlotKey::LicenseFront),
                SlotSpec::required(SlotKey::LicenseBack),
                SlotSpec::required(SlotKey::VehicleRegistration),
                SlotSpec::optional(SlotKey::InsuranceCertificate),
                SlotSpec::optional(SlotKey::ProfilePhoto),
            ],
            business_slots: vec![
                SlotSpec::required(SlotKey::BusinessLicense),
                SlotSpec::required(SlotKey::TaxCertificate),
                SlotSpec::required(SlotKey::OwnerIdentity),
                SlotSpec::optional(SlotKey::AddressProof),
            ],
            driver_photo_quorum: 4,
        }
    }

    /// Ordered slot catalog for one applicant type.
    pub fn slots_for(&self, applicant_type: ApplicantType) -> &[SlotSpec] {
        match applicant_type {
            ApplicantType::Driver => &self.driver_slots,
            ApplicantType::Business => &self.business_slots,
        }
    }

    /// Minimum count of approved vehicle photos required for approval.
    pub fn photo_quorum(&self, applicant_type: ApplicantType) -> usize {
        match applicant_type {
            ApplicantType::Driver => self.driver_photo_quorum,
            ApplicantType::Business => 0,
        }
    }

    /// Catalog entry for a slot key, if that type carries the slot.
    pub fn spec_for(&self, applicant_type: ApplicantType, key: SlotKey) -> Option<SlotSpec> {
        self.slots_for(applicant_type)
            .iter()
            .copied()
            .find(|spec| spec.key == key)
    }
}

impl Default for DocumentRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
