use crate::infra::{
    InMemoryContactDirectory, InMemoryVerificationRepository, PassthroughUrlSigner,
};
use clap::Args;
use std::sync::Arc;
use verimark::error::AppError;
use verimark::workflows::verification::{
    ApplicantIntake, ApplicantType, AuditTarget, DocumentRegistry, ReviewDecision, SlotKey,
    VerificationError, VerificationService,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Applicant type to walk through the workflow (driver or business)
    #[arg(long, default_value = "driver")]
    pub(crate) applicant_type: String,
    /// Operator identifier stamped on every audit entry
    #[arg(long, default_value = "demo-operator")]
    pub(crate) actor: String,
}

type DemoService = VerificationService<
    InMemoryVerificationRepository,
    InMemoryContactDirectory,
    PassthroughUrlSigner,
>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let applicant_type =
        ApplicantType::parse(&args.applicant_type).map_err(VerificationError::from)?;
    let actor = args.actor.as_str();

    let repository = Arc::new(InMemoryVerificationRepository::default());
    let contacts = Arc::new(InMemoryContactDirectory::default());
    let service: DemoService = VerificationService::new(
        repository,
        contacts.clone(),
        Arc::new(PassthroughUrlSigner),
        DocumentRegistry::standard(),
    );

    println!("Verification workflow demo ({})", applicant_type.label());

    let record = service.submit(ApplicantIntake {
        applicant_type,
        country_code: "KE".to_string(),
        contact_phone: "+254700000010".to_string(),
        contact_email: "applicant@example.com".to_string(),
    })?;
    let id = record.applicant_id.clone();
    println!("- Registered applicant {}", id.0);

    let required: Vec<SlotKey> = service
        .registry()
        .slots_for(applicant_type)
        .iter()
        .filter(|spec| spec.required)
        .map(|spec| spec.key)
        .collect();
    for key in &required {
        service.submit_document(&id, *key, &format!("https://blobs.example/{key}.jpg"), actor)?;
        println!("- Submitted {key}");
    }

    let check = service.can_approve(&id)?;
    println!("\nChecklist before review ({} blockers)", check.blocking_reasons.len());
    for reason in &check.blocking_reasons {
        println!("  - {reason}");
    }

    let first = required[0];
    service.review_document(&id, first, ReviewDecision::Approved, None, actor)?;
    println!("\n- Approved {first}");

    if let Some(second) = required.get(1).copied() {
        service.review_document(
            &id,
            second,
            ReviewDecision::Rejected,
            Some("document unreadable"),
            actor,
        )?;
        println!("- Rejected {second} (document unreadable)");
        service.submit_document(&id, second, &format!("https://blobs.example/{second}-v2.jpg"), actor)?;
        println!("- Replacement received for {second}");
    }

    let bulk = service.auto_approve_remaining(&id, actor)?;
    if bulk.is_empty() {
        println!("- Nothing left for bulk approval");
    } else {
        let keys: Vec<&str> = bulk.iter().map(|key| key.as_str()).collect();
        println!("- Bulk approved remaining slots: {}", keys.join(", "));
    }

    if applicant_type == ApplicantType::Driver {
        let quorum = service.registry().photo_quorum(applicant_type);
        for n in 0..quorum {
            let index = service.submit_vehicle_photo(
                &id,
                None,
                &format!("https://blobs.example/vehicle-{n}.jpg"),
                actor,
            )?;
            service.review_vehicle_photo(&id, index, ReviewDecision::Approved, None, actor)?;
        }
        println!("- Submitted and approved {quorum} vehicle photos");
    }

    contacts.mark_phone(&id, true);
    contacts.mark_email(&id, true);
    println!("- Contact channels verified by the messaging platform");

    let check = service.can_approve(&id)?;
    if check.allowed {
        println!("\nChecklist clear; promoting applicant");
    } else {
        println!("\nStill blocked: {:?}", check.blocking_reasons);
        return Ok(());
    }

    let approved = service.approve(&id, actor)?;
    println!(
        "- Applicant {} is now {}",
        approved.applicant_id.0,
        approved.overall_status.label()
    );

    match service.reject(&id, "spot check failed", actor) {
        Err(error) => println!("- Post-approval rejection refused: {error}"),
        Ok(_) => println!("- Unexpected: terminal state transitioned"),
    }

    println!("\nAudit trail (newest first)");
    for entry in service.history(&id, 50)? {
        let target = match entry.target {
            AuditTarget::Document(key) => key.as_str().to_string(),
            AuditTarget::VehiclePhoto(index) => format!("vehicle-photo[{index}]"),
            AuditTarget::Applicant => "applicant".to_string(),
        };
        let reason = entry
            .reason
            .map(|reason| format!(" ({reason})"))
            .unwrap_or_default();
        println!(
            "- {} {} on {} by {}{}",
            entry.created_at.format("%H:%M:%S%.3f"),
            entry.action.label(),
            target,
            entry.actor_id,
            reason
        );
    }

    Ok(())
}
