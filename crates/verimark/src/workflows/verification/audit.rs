use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ApplicantId, PhotoStatus, SlotKey, SlotStatus};

/// Action recorded against a slot, a photo, or the applicant itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Submitted,
    Replaced,
    Approved,
    Rejected,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            AuditAction::Submitted => "submitted",
            AuditAction::Replaced => "replaced",
            AuditAction::Approved => "approved",
            AuditAction::Rejected => "rejected",
        }
    }
}

/// Artifact an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AuditTarget {
    Document(SlotKey),
    VehiclePhoto(usize),
    Applicant,
}

/// Immutable record of one state-changing action. Entries are append-only;
/// nothing in the workflow edits or removes them once committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub applicant_id: ApplicantId,
    pub target: AuditTarget,
    pub action: AuditAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub actor_id: String,
    pub created_at: DateTime<Utc>,
}

/// State a document slot must hold after replaying its audit entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotReplay {
    pub url: Option<String>,
    pub status: SlotStatus,
    pub rejection_reason: Option<String>,
}

/// Replay the entries (oldest first) that touch one document slot.
///
/// The stored slot must always equal the replay of its trail; dispute
/// resolution relies on this to prove what an operator actually saw.
pub fn replay_document(entries: &[AuditEntry], key: SlotKey) -> SlotReplay {
    let mut replay = SlotReplay {
        url: None,
        status: SlotStatus::NotSubmitted,
        rejection_reason: None,
    };

    for entry in entries {
        if entry.target != AuditTarget::Document(key) {
            continue;
        }
        match entry.action {
            AuditAction::Submitted | AuditAction::Replaced => {
                replay.url = entry.new_url.clone();
                replay.status = SlotStatus::Pending;
                replay.rejection_reason = None;
            }
            AuditAction::Approved => {
                replay.status = SlotStatus::Approved;
                replay.rejection_reason = None;
            }
            AuditAction::Rejected => {
                replay.status = SlotStatus::Rejected;
                replay.rejection_reason = entry.reason.clone();
            }
        }
    }

    replay
}

/// State a vehicle photo must hold after replaying its audit entries.
/// `None` fields mean the photo was never submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoReplay {
    pub url: Option<String>,
    pub status: Option<PhotoStatus>,
    pub rejection_reason: Option<String>,
}

/// Replay the entries (oldest first) that touch one photo index.
pub fn replay_photo(entries: &[AuditEntry], index: usize) -> PhotoReplay {
    let mut replay = PhotoReplay {
        url: None,
        status: None,
        rejection_reason: None,
    };

    for entry in entries {
        if entry.target != AuditTarget::VehiclePhoto(index) {
            continue;
        }
        match entry.action {
            AuditAction::Submitted | AuditAction::Replaced => {
                replay.url = entry.new_url.clone();
                replay.status = Some(PhotoStatus::Pending);
                replay.rejection_reason = None;
            }
            AuditAction::Approved => {
                replay.status = Some(PhotoStatus::Approved);
                replay.rejection_reason = None;
            }
            AuditAction::Rejected => {
                replay.status = Some(PhotoStatus::Rejected);
                replay.rejection_reason = entry.reason.clone();
            }
        }
    }

    replay
}
