use serde::Serialize;

use super::domain::{ApplicantRecord, SlotStatus};
use super::registry::DocumentRegistry;

/// Outcome of evaluating the aggregate approval gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalCheck {
    pub allowed: bool,
    pub blocking_reasons: Vec<String>,
}

/// Evaluate every approval condition, collecting all failures so the console
/// can render a complete checklist instead of only the first unmet rule.
///
/// Conditions, in reporting order: required document slots, the vehicle
/// photo quorum, then the two contact channels.
pub(crate) fn evaluate(
    record: &ApplicantRecord,
    registry: &DocumentRegistry,
    phone_verified: bool,
    email_verified: bool,
) -> ApprovalCheck {
    let mut blocking_reasons = Vec::new();

    for spec in registry.slots_for(record.applicant_type) {
        if !spec.required {
            continue;
        }
        match record.document(spec.key) {
            Some(slot) if slot.url.is_some() => {
                if slot.status != SlotStatus::Approved {
                    blocking_reasons.push(format!("{} not approved", spec.key));
                }
            }
            _ => blocking_reasons.push(format!("{} missing", spec.key)),
        }
    }

    let quorum = registry.photo_quorum(record.applicant_type);
    if quorum > 0 {
        let approved = record.approved_photo_count();
        if approved < quorum {
            blocking_reasons.push(format!(
                "vehicle photo quorum not met ({approved} of {quorum} approved)"
            ));
        }
    }

    if !phone_verified {
        blocking_reasons.push("phone not verified".to_string());
    }
    if !email_verified {
        blocking_reasons.push("email not verified".to_string());
    }

    ApprovalCheck {
        allowed: blocking_reasons.is_empty(),
        blocking_reasons,
    }
}
