use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    ApplicantId, ApplicantIntake, ApplicantType, ReviewDecision, SlotKey, SlotStatus,
    VerificationStatusView,
};
use super::gate::ApprovalCheck;
use super::repository::{ContactVerifier, UrlSigner, VerificationRepository};
use super::service::{VerificationError, VerificationService};

const DEFAULT_ACTOR: &str = "console";
const DEFAULT_HISTORY_LIMIT: usize = 50;
const DEFAULT_QUEUE_LIMIT: usize = 100;

/// Router builder exposing the verification workflow to the review console.
pub fn verification_router<R, C, S>(service: Arc<VerificationService<R, C, S>>) -> Router
where
    R: VerificationRepository + 'static,
    C: ContactVerifier + 'static,
    S: UrlSigner + 'static,
{
    Router::new()
        .route(
            "/api/v1/verifications",
            post(intake_handler::<R, C, S>).get(queue_handler::<R, C, S>),
        )
        .route(
            "/api/v1/verifications/:applicant_id",
            get(detail_handler::<R, C, S>),
        )
        .route(
            "/api/v1/verifications/:applicant_id/documents/:slot_key",
            post(submit_document_handler::<R, C, S>).put(review_document_handler::<R, C, S>),
        )
        .route(
            "/api/v1/verifications/:applicant_id/documents/auto-approve",
            post(auto_approve_handler::<R, C, S>),
        )
        .route(
            "/api/v1/verifications/:applicant_id/vehicle-images",
            post(submit_photo_handler::<R, C, S>),
        )
        .route(
            "/api/v1/verifications/:applicant_id/vehicle-images/:index",
            put(review_photo_handler::<R, C, S>),
        )
        .route(
            "/api/v1/verifications/:applicant_id/status",
            put(overall_status_handler::<R, C, S>),
        )
        .route(
            "/api/v1/verifications/:applicant_id/audit-logs",
            get(audit_logs_handler::<R, C, S>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct IntakeRequest {
    pub(crate) applicant_type: String,
    pub(crate) country_code: String,
    pub(crate) contact_phone: String,
    pub(crate) contact_email: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitDocumentRequest {
    pub(crate) url: String,
    #[serde(default)]
    pub(crate) actor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitPhotoRequest {
    pub(crate) url: String,
    #[serde(default)]
    pub(crate) index: Option<usize>,
    #[serde(default)]
    pub(crate) actor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    pub(crate) status: ReviewDecision,
    #[serde(default)]
    pub(crate) rejection_reason: Option<String>,
    #[serde(default)]
    pub(crate) actor_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ActorRequest {
    #[serde(default)]
    pub(crate) actor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LimitQuery {
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct VerificationDetailResponse {
    #[serde(flatten)]
    pub(crate) verification: VerificationStatusView,
    pub(crate) checklist: ApprovalCheck,
}

pub(crate) async fn intake_handler<R, C, S>(
    State(service): State<Arc<VerificationService<R, C, S>>>,
    axum::Json(request): axum::Json<IntakeRequest>,
) -> Response
where
    R: VerificationRepository + 'static,
    C: ContactVerifier + 'static,
    S: UrlSigner + 'static,
{
    let applicant_type = match ApplicantType::parse(&request.applicant_type) {
        Ok(applicant_type) => applicant_type,
        Err(error) => return error_response(error.into()),
    };

    let intake = ApplicantIntake {
        applicant_type,
        country_code: request.country_code,
        contact_phone: request.contact_phone,
        contact_email: request.contact_email,
    };

    match service.submit(intake) {
        Ok(record) => {
            let payload = json!({
                "applicant_id": record.applicant_id.0,
                "applicant_type": record.applicant_type.label(),
                "status": record.overall_status.label(),
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn queue_handler<R, C, S>(
    State(service): State<Arc<VerificationService<R, C, S>>>,
    Query(query): Query<LimitQuery>,
) -> Response
where
    R: VerificationRepository + 'static,
    C: ContactVerifier + 'static,
    S: UrlSigner + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_QUEUE_LIMIT);
    match service.pending_queue(limit) {
        Ok(views) => (StatusCode::OK, axum::Json(json!({ "pending": views }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn detail_handler<R, C, S>(
    State(service): State<Arc<VerificationService<R, C, S>>>,
    Path(applicant_id): Path<String>,
) -> Response
where
    R: VerificationRepository + 'static,
    C: ContactVerifier + 'static,
    S: UrlSigner + 'static,
{
    let id = ApplicantId(applicant_id);
    let verification = match service.status_view(&id) {
        Ok(view) => view,
        Err(error) => return error_response(error),
    };
    match service.can_approve(&id) {
        Ok(checklist) => (
            StatusCode::OK,
            axum::Json(VerificationDetailResponse {
                verification,
                checklist,
            }),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_document_handler<R, C, S>(
    State(service): State<Arc<VerificationService<R, C, S>>>,
    Path((applicant_id, slot_key)): Path<(String, String)>,
    axum::Json(request): axum::Json<SubmitDocumentRequest>,
) -> Response
where
    R: VerificationRepository + 'static,
    C: ContactVerifier + 'static,
    S: UrlSigner + 'static,
{
    let id = ApplicantId(applicant_id);
    let Some(key) = SlotKey::parse(&slot_key) else {
        return unknown_slot_response(&slot_key);
    };
    let actor = request.actor_id.as_deref().unwrap_or(DEFAULT_ACTOR);

    match service.submit_document(&id, key, &request.url, actor) {
        Ok(record) => {
            let status = record
                .document(key)
                .map(|slot| slot.status)
                .unwrap_or(SlotStatus::Pending);
            let payload = json!({
                "applicant_id": id.0,
                "slot": key.as_str(),
                "status": status.label(),
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn review_document_handler<R, C, S>(
    State(service): State<Arc<VerificationService<R, C, S>>>,
    Path((applicant_id, slot_key)): Path<(String, String)>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    R: VerificationRepository + 'static,
    C: ContactVerifier + 'static,
    S: UrlSigner + 'static,
{
    let id = ApplicantId(applicant_id);
    let Some(key) = SlotKey::parse(&slot_key) else {
        return unknown_slot_response(&slot_key);
    };
    let actor = request.actor_id.as_deref().unwrap_or(DEFAULT_ACTOR);

    match service.review_document(
        &id,
        key,
        request.status,
        request.rejection_reason.as_deref(),
        actor,
    ) {
        Ok(record) => {
            let status = record
                .document(key)
                .map(|slot| slot.status)
                .unwrap_or(SlotStatus::Pending);
            let payload = json!({
                "applicant_id": id.0,
                "slot": key.as_str(),
                "status": status.label(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_photo_handler<R, C, S>(
    State(service): State<Arc<VerificationService<R, C, S>>>,
    Path(applicant_id): Path<String>,
    axum::Json(request): axum::Json<SubmitPhotoRequest>,
) -> Response
where
    R: VerificationRepository + 'static,
    C: ContactVerifier + 'static,
    S: UrlSigner + 'static,
{
    let id = ApplicantId(applicant_id);
    let actor = request.actor_id.as_deref().unwrap_or(DEFAULT_ACTOR);

    match service.submit_vehicle_photo(&id, request.index, &request.url, actor) {
        Ok(index) => {
            let payload = json!({
                "applicant_id": id.0,
                "index": index,
                "status": "pending",
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn review_photo_handler<R, C, S>(
    State(service): State<Arc<VerificationService<R, C, S>>>,
    Path((applicant_id, index)): Path<(String, usize)>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    R: VerificationRepository + 'static,
    C: ContactVerifier + 'static,
    S: UrlSigner + 'static,
{
    let id = ApplicantId(applicant_id);
    let actor = request.actor_id.as_deref().unwrap_or(DEFAULT_ACTOR);

    match service.review_vehicle_photo(
        &id,
        index,
        request.status,
        request.rejection_reason.as_deref(),
        actor,
    ) {
        Ok(record) => {
            let status = record
                .vehicle_photos
                .get(index)
                .map(|photo| photo.status.label())
                .unwrap_or("pending");
            let payload = json!({
                "applicant_id": id.0,
                "index": index,
                "status": status,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn auto_approve_handler<R, C, S>(
    State(service): State<Arc<VerificationService<R, C, S>>>,
    Path(applicant_id): Path<String>,
    request: Option<axum::Json<ActorRequest>>,
) -> Response
where
    R: VerificationRepository + 'static,
    C: ContactVerifier + 'static,
    S: UrlSigner + 'static,
{
    let id = ApplicantId(applicant_id);
    let request = request.map(|axum::Json(request)| request).unwrap_or_default();
    let actor = request.actor_id.as_deref().unwrap_or(DEFAULT_ACTOR);

    match service.auto_approve_remaining(&id, actor) {
        Ok(approved) => {
            (StatusCode::OK, axum::Json(json!({ "approved": approved }))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn overall_status_handler<R, C, S>(
    State(service): State<Arc<VerificationService<R, C, S>>>,
    Path(applicant_id): Path<String>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    R: VerificationRepository + 'static,
    C: ContactVerifier + 'static,
    S: UrlSigner + 'static,
{
    let id = ApplicantId(applicant_id);
    let actor = request.actor_id.as_deref().unwrap_or(DEFAULT_ACTOR);

    let result = match request.status {
        ReviewDecision::Approved => service.approve(&id, actor),
        ReviewDecision::Rejected => service.reject(
            &id,
            request.rejection_reason.as_deref().unwrap_or(""),
            actor,
        ),
    };

    match result {
        Ok(record) => {
            let payload = json!({
                "applicant_id": id.0,
                "status": record.overall_status.label(),
                "reviewed_at": record.reviewed_at,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn audit_logs_handler<R, C, S>(
    State(service): State<Arc<VerificationService<R, C, S>>>,
    Path(applicant_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Response
where
    R: VerificationRepository + 'static,
    C: ContactVerifier + 'static,
    S: UrlSigner + 'static,
{
    let id = ApplicantId(applicant_id);
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    match service.history(&id, limit) {
        Ok(entries) => (
            StatusCode::OK,
            axum::Json(json!({ "applicant_id": id.0, "entries": entries })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

fn unknown_slot_response(slot_key: &str) -> Response {
    let payload = json!({
        "error": format!("unknown document slot '{slot_key}'"),
    });
    (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
}

/// Map workflow errors onto the console's response contract. A blocked
/// approval carries the full checklist so the client renders guidance
/// instead of an error banner.
fn error_response(error: VerificationError) -> Response {
    let status = match &error {
        VerificationError::NotFound(_) | VerificationError::IndexOutOfRange { .. } => {
            StatusCode::NOT_FOUND
        }
        VerificationError::UnknownSlot { .. }
        | VerificationError::UnknownApplicantType(_)
        | VerificationError::MissingReason
        | VerificationError::MissingUrl => StatusCode::UNPROCESSABLE_ENTITY,
        VerificationError::PreconditionFailed { .. }
        | VerificationError::InvalidTransition { .. }
        | VerificationError::ConcurrentModification => StatusCode::CONFLICT,
        VerificationError::ContactVerification(_) => StatusCode::BAD_GATEWAY,
        VerificationError::Repository(_) | VerificationError::Signing(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = match &error {
        VerificationError::PreconditionFailed { blocking_reasons } => json!({
            "error": "approval blocked",
            "blocking_reasons": blocking_reasons,
        }),
        other => json!({ "error": other.to_string() }),
    };

    (status, axum::Json(payload)).into_response()
}
