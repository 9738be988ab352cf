use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::clock::Clock;
use super::collaborators::{
    AtsScorer, CandidateStore, Mailer, MailerError, ParserError, ResumeParser, ScorerError,
    StoreError,
};
use super::domain::{
    is_exempt_category, ApplicationId, AtsStatus, CandidateDetails, CandidateRecord,
    NotifySuccess, ParsedResume, ResumeUpload, SubmissionFields,
};
use super::quota::QuotaGuard;
use super::validation::{validate_submission, ValidationError};

/// Scores at or above this qualify; below it the submission is rejected.
pub const QUALIFYING_SCORE: u8 = 60;

/// Fixed score assigned when the category is exempt from automated scoring.
pub const EXEMPT_CATEGORY_SCORE: u8 = 75;

/// Terminal result of one submission evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Qualified {
        application_id: ApplicationId,
        score: u8,
        ats_status: AtsStatus,
    },
    Rejected {
        score: u8,
        ats_status: AtsStatus,
    },
}

/// Failure of an external collaborator, including deadline overruns. Nothing
/// was persisted when one of these surfaces, so the whole submission is safe
/// to retry.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Scorer(#[from] ScorerError),
    #[error(transparent)]
    Mailer(#[from] MailerError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{collaborator} timed out after {deadline:?}")]
    Timeout {
        collaborator: &'static str,
        deadline: Duration,
    },
}

/// Everything a pipeline invocation can report back, one variant per
/// machine-readable failure class.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("too many requests")]
    RateLimited,
    #[error("submission limit reached ({count} of {limit})")]
    QuotaExceeded { count: u32, limit: u32 },
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Bounds a collaborator call; a deadline overrun is the same failure class
/// as the collaborator erroring outright.
pub(crate) async fn with_deadline<T, E, F>(
    collaborator: &'static str,
    deadline: Duration,
    operation: F,
) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, E>>,
    CollaboratorError: From<E>,
{
    match tokio::time::timeout(deadline, operation).await {
        Ok(result) => result.map_err(CollaboratorError::from),
        Err(_) => Err(CollaboratorError::Timeout {
            collaborator,
            deadline,
        }),
    }
}

/// Runs a single submission through validate, quota, parse, score, threshold,
/// and the branch-specific persistence.
///
/// The qualified branch holds the one hard ordering rule of the system: the
/// reviewer notification must succeed before the record is written, and a
/// failed notification writes nothing at all.
pub struct DecisionEngine<P, S, M, C> {
    parser: Arc<P>,
    scorer: Arc<S>,
    mailer: Arc<M>,
    store: Arc<C>,
    quota: QuotaGuard<C>,
    clock: Arc<Clock>,
    collaborator_deadline: Duration,
}

impl<P, S, M, C> DecisionEngine<P, S, M, C>
where
    P: ResumeParser + 'static,
    S: AtsScorer + 'static,
    M: Mailer + 'static,
    C: CandidateStore + 'static,
{
    pub fn new(
        parser: Arc<P>,
        scorer: Arc<S>,
        mailer: Arc<M>,
        store: Arc<C>,
        quota: QuotaGuard<C>,
        clock: Arc<Clock>,
        collaborator_deadline: Duration,
    ) -> Self {
        DecisionEngine {
            parser,
            scorer,
            mailer,
            store,
            quota,
            clock,
            collaborator_deadline,
        }
    }

    pub async fn evaluate(
        &self,
        fields: SubmissionFields,
        resume: ResumeUpload,
    ) -> Result<SubmitOutcome, IntakeError> {
        let details = validate_submission(fields, &resume)?;
        let email = details.email.clone();
        info!(
            event = "application_received",
            email = %email,
            category = %details.job_category,
        );

        let count = with_deadline(
            "candidate store",
            self.collaborator_deadline,
            self.quota.count(&email),
        )
        .await?;
        let limit = self.quota.limit();
        if count >= limit {
            return Err(IntakeError::QuotaExceeded { count, limit });
        }

        let parsed = with_deadline(
            "resume parser",
            self.collaborator_deadline,
            self.parser.parse(&resume.bytes, &resume.media_type),
        )
        .await?;

        let (score, ats_status) = if is_exempt_category(&details.job_category) {
            (EXEMPT_CATEGORY_SCORE, AtsStatus::Skipped)
        } else {
            let score = with_deadline(
                "ats scorer",
                self.collaborator_deadline,
                self.scorer.score(&parsed.fields, &parsed.text, &details.job_category),
            )
            .await?;
            (score.min(100), AtsStatus::Completed)
        };
        info!(
            event = "ats_score_calculated",
            email = %email,
            score,
            category = %details.job_category,
        );

        if score >= QUALIFYING_SCORE {
            // The notify/persist pair runs on its own task: a dropped client
            // connection must not cancel it between the two steps.
            let task = tokio::spawn(notify_then_persist(
                self.mailer.clone(),
                self.store.clone(),
                self.clock.clone(),
                self.collaborator_deadline,
                details,
                parsed,
                score,
                ats_status,
                resume,
            ));
            match task.await {
                Ok(outcome) => outcome,
                Err(join_error) => Err(IntakeError::Internal(format!(
                    "notification task aborted: {join_error}"
                ))),
            }
        } else {
            info!(event = "candidate_rejected", email = %email, score);
            let record = CandidateRecord::rejected(
                details,
                parsed.fields,
                score,
                ats_status,
                self.clock.now(),
            );
            with_deadline(
                "candidate store",
                self.collaborator_deadline,
                self.store.insert(record),
            )
            .await?;
            Ok(SubmitOutcome::Rejected { score, ats_status })
        }
    }
}

/// Qualified branch: reviewer notification first, persistence strictly after.
///
/// The `NotifySuccess` proof minted on delivery is the only way to construct
/// a qualified record, so the ordering cannot regress to a runtime check.
#[allow(clippy::too_many_arguments)]
async fn notify_then_persist<M, C>(
    mailer: Arc<M>,
    store: Arc<C>,
    clock: Arc<Clock>,
    deadline: Duration,
    details: CandidateDetails,
    parsed: ParsedResume,
    score: u8,
    ats_status: AtsStatus,
    resume: ResumeUpload,
) -> Result<SubmitOutcome, IntakeError>
where
    M: Mailer + 'static,
    C: CandidateStore + 'static,
{
    let email = details.email.clone();

    let proof: NotifySuccess = match with_deadline(
        "reviewer mailer",
        deadline,
        mailer.notify_reviewer(&details, score, ats_status, &resume),
    )
    .await
    {
        Ok(()) => NotifySuccess::confirm(),
        Err(cause) => {
            error!(event = "reviewer_notify_failed", email = %email, score, error = %cause);
            return Err(cause.into());
        }
    };
    info!(event = "reviewer_notified", email = %email, score);

    let now = clock.now();
    let record =
        CandidateRecord::qualified(details, parsed.fields, score, ats_status, proof, now);
    match with_deadline("candidate store", deadline, store.insert(record)).await {
        Ok(storage_key) => Ok(SubmitOutcome::Qualified {
            application_id: ApplicationId::from_storage_key(&storage_key),
            score,
            ats_status,
        }),
        Err(cause) => {
            // The reviewer was already notified but no record exists. There is
            // no compensating action; this log line is the reconciliation
            // trail for a human to act on.
            error!(
                event = "persist_after_notify_failed",
                email = %email,
                score,
                notified_at = %now,
                error = %cause,
            );
            Err(cause.into())
        }
    }
}
