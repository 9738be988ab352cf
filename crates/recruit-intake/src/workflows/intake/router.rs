use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::collaborators::{AtsScorer, CandidateStore, Mailer, ResumeParser};
use super::domain::{ResumeUpload, SubmissionFields};
use super::engine::{IntakeError, SubmitOutcome};
use super::service::CandidateIntakeService;
use super::validation::ValidationError;

/// Router builder exposing the public intake surface.
pub fn intake_router<P, S, M, C>(service: Arc<CandidateIntakeService<P, S, M, C>>) -> Router
where
    P: ResumeParser + 'static,
    S: AtsScorer + 'static,
    M: Mailer + 'static,
    C: CandidateStore + 'static,
{
    Router::new()
        .route("/otp/send", post(send_code_handler::<P, S, M, C>))
        .route("/otp/verify", post(verify_code_handler::<P, S, M, C>))
        .route(
            "/candidates/check-duplicate",
            post(check_duplicate_handler::<P, S, M, C>),
        )
        .route("/applications/submit", post(submit_handler::<P, S, M, C>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct SendCodeRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
struct VerifyCodeRequest {
    email: String,
    otp: String,
}

#[derive(Debug, Deserialize)]
struct EmailLookupRequest {
    email: String,
}

pub(crate) async fn send_code_handler<P, S, M, C>(
    State(service): State<Arc<CandidateIntakeService<P, S, M, C>>>,
    headers: HeaderMap,
    Json(request): Json<SendCodeRequest>,
) -> Response
where
    P: ResumeParser + 'static,
    S: AtsScorer + 'static,
    M: Mailer + 'static,
    C: CandidateStore + 'static,
{
    match service.send_code(&client_identity(&headers), &request.email).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Verification code sent to your email address",
            })),
        )
            .into_response(),
        Err(IntakeError::Collaborator(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "code": "COLLABORATOR_FAILURE",
                "message": "Failed to send verification code. Please try again.",
            })),
        )
            .into_response(),
        Err(other) => intake_error_response(&other),
    }
}

pub(crate) async fn verify_code_handler<P, S, M, C>(
    State(service): State<Arc<CandidateIntakeService<P, S, M, C>>>,
    headers: HeaderMap,
    Json(request): Json<VerifyCodeRequest>,
) -> Response
where
    P: ResumeParser + 'static,
    S: AtsScorer + 'static,
    M: Mailer + 'static,
    C: CandidateStore + 'static,
{
    match service
        .verify_code(&client_identity(&headers), &request.email, &request.otp)
        .await
    {
        Ok(verified) => (
            StatusCode::OK,
            Json(json!({ "success": true, "verified": verified })),
        )
            .into_response(),
        Err(error) => intake_error_response(&error),
    }
}

pub(crate) async fn check_duplicate_handler<P, S, M, C>(
    State(service): State<Arc<CandidateIntakeService<P, S, M, C>>>,
    Json(request): Json<EmailLookupRequest>,
) -> Response
where
    P: ResumeParser + 'static,
    S: AtsScorer + 'static,
    M: Mailer + 'static,
    C: CandidateStore + 'static,
{
    match service.quota_view(&request.email).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => intake_error_response(&error),
    }
}

pub(crate) async fn submit_handler<P, S, M, C>(
    State(service): State<Arc<CandidateIntakeService<P, S, M, C>>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response
where
    P: ResumeParser + 'static,
    S: AtsScorer + 'static,
    M: Mailer + 'static,
    C: CandidateStore + 'static,
{
    let (fields, resume) = match read_submission(&mut multipart).await {
        Ok(parts) => parts,
        Err(error) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "code": "VALIDATION_ERROR",
                    "message": format!("Malformed multipart request: {error}"),
                })),
            )
                .into_response();
        }
    };
    let Some(resume) = resume else {
        return intake_error_response(&IntakeError::Validation(ValidationError::MissingResume));
    };

    match service.submit(&client_identity(&headers), fields, resume).await {
        Ok(SubmitOutcome::Qualified {
            application_id,
            score,
            ats_status,
        }) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Application submitted successfully.",
                "applicationId": application_id.0,
                "score": score,
                "atsStatus": ats_status.label(),
                "result": "QUALIFIED",
            })),
        )
            .into_response(),
        Ok(SubmitOutcome::Rejected { score, ats_status }) => (
            StatusCode::OK,
            Json(json!({
                "success": false,
                "message": "Application does not meet ATS criteria.",
                "score": score,
                "atsStatus": ats_status.label(),
                "result": "REJECTED_BY_ATS",
            })),
        )
            .into_response(),
        Err(error) => intake_error_response(&error),
    }
}

/// Collects the multipart parts into form fields plus the resume file.
/// Unknown part names are drained and ignored.
async fn read_submission(
    multipart: &mut Multipart,
) -> Result<(SubmissionFields, Option<ResumeUpload>), MultipartError> {
    let mut fields = SubmissionFields::default();
    let mut resume = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "resume" {
            let file_name = field.file_name().unwrap_or("resume").to_string();
            let media_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await?;
            resume = Some(ResumeUpload {
                file_name,
                media_type,
                bytes: bytes.to_vec(),
            });
        } else {
            fields.set(&name, field.text().await?);
        }
    }

    Ok((fields, resume))
}

/// First forwarded hop, falling back to a sentinel. The service runs behind a
/// trusted proxy, so the header is authoritative when present.
fn client_identity(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn intake_error_response(error: &IntakeError) -> Response {
    match error {
        IntakeError::Validation(cause) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "code": "VALIDATION_ERROR",
                "message": cause.to_string(),
            })),
        )
            .into_response(),
        IntakeError::RateLimited => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "success": false,
                "code": "RATE_LIMITED",
                "message": "Too many requests. Please try again later.",
            })),
        )
            .into_response(),
        IntakeError::QuotaExceeded { count, limit } => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "code": "QUOTA_EXCEEDED",
                "message": format!(
                    "You have reached the maximum limit of {limit} applications for this email address"
                ),
                "count": count,
                "limit": limit,
            })),
        )
            .into_response(),
        IntakeError::Collaborator(cause) => {
            tracing::error!(error = %cause, "collaborator failure surfaced to caller");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "code": "COLLABORATOR_FAILURE",
                    "message": "Failed to process application. Please try again.",
                })),
            )
                .into_response()
        }
        IntakeError::Internal(cause) => {
            tracing::error!(error = %cause, "unexpected intake failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "code": "INTERNAL_ERROR",
                    "message": "Failed to process application. Please try again.",
                })),
            )
                .into_response()
        }
    }
}
