use std::sync::Arc;
use std::time::Duration;

use super::clock::Clock;
use super::collaborators::{AtsScorer, CandidateStore, Mailer, ResumeParser};
use super::domain::{normalize_email, ResumeUpload, SubmissionFields};
use super::engine::{with_deadline, DecisionEngine, IntakeError, SubmitOutcome};
use super::otp::OtpService;
use super::quota::{QuotaGuard, QuotaView};
use super::ratelimit::{LimitTier, RateLimitConfig, RateLimiter, GLOBAL_SUBMISSION_KEY};
use super::validation::ValidationError;

/// Tunables for one service instance. Defaults match the public deployment;
/// the global submission ceiling is the usual knob to override.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub limits: RateLimitConfig,
    pub collaborator_deadline: Duration,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        IntakeConfig {
            limits: RateLimitConfig::default(),
            collaborator_deadline: Duration::from_secs(20),
        }
    }
}

/// Facade over the intake pipeline: rate limiting at the edge, the OTP
/// lifecycle, the quota preview, and the qualification decision engine.
///
/// Constructed once at process start with its collaborators injected, handed
/// to the router as shared state. No ambient globals.
pub struct CandidateIntakeService<P, S, M, C> {
    limits: RateLimiter,
    otp: OtpService<M>,
    quota: QuotaGuard<C>,
    engine: DecisionEngine<P, S, M, C>,
    collaborator_deadline: Duration,
}

impl<P, S, M, C> CandidateIntakeService<P, S, M, C>
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
        config: IntakeConfig,
    ) -> Self {
        Self::with_clock(parser, scorer, mailer, store, config, Arc::new(Clock::system()))
    }

    /// Like `new`, with an injected clock so expiry and window behavior can
    /// be driven deterministically.
    pub fn with_clock(
        parser: Arc<P>,
        scorer: Arc<S>,
        mailer: Arc<M>,
        store: Arc<C>,
        config: IntakeConfig,
        clock: Arc<Clock>,
    ) -> Self {
        let quota = QuotaGuard::new(store.clone());
        CandidateIntakeService {
            limits: RateLimiter::new(config.limits, clock.clone()),
            otp: OtpService::new(mailer.clone(), clock.clone()),
            quota: quota.clone(),
            engine: DecisionEngine::new(
                parser,
                scorer,
                mailer,
                store,
                quota,
                clock,
                config.collaborator_deadline,
            ),
            collaborator_deadline: config.collaborator_deadline,
        }
    }

    /// Issues and delivers a verification code, gated by the send tier.
    pub async fn send_code(&self, client_addr: &str, email: &str) -> Result<(), IntakeError> {
        let email = require_email(email)?;
        if !self.limits.allow(LimitTier::CodeSend, client_addr) {
            return Err(IntakeError::RateLimited);
        }
        with_deadline(
            "code mailer",
            self.collaborator_deadline,
            self.otp.send(&email),
        )
        .await?;
        Ok(())
    }

    /// Verifies a candidate code, gated by both verify tiers. The email tier
    /// is keyed on the declared email, not any authenticated identity.
    pub async fn verify_code(
        &self,
        client_addr: &str,
        email: &str,
        candidate_code: &str,
    ) -> Result<bool, IntakeError> {
        let email = require_email(email)?;
        if !self.limits.allow(LimitTier::VerifyByAddress, client_addr) {
            return Err(IntakeError::RateLimited);
        }
        if !self.limits.allow(LimitTier::VerifyByEmail, &email) {
            return Err(IntakeError::RateLimited);
        }
        Ok(self.otp.verify(&email, candidate_code))
    }

    /// Read-only quota snapshot for the duplicate-check endpoint.
    pub async fn quota_view(&self, email: &str) -> Result<QuotaView, IntakeError> {
        let email = require_email(email)?;
        let view = with_deadline(
            "candidate store",
            self.collaborator_deadline,
            self.quota.view(&email),
        )
        .await?;
        Ok(view)
    }

    /// Runs one submission through the decision engine, gated by the global
    /// ceiling and the per-address submission tier.
    pub async fn submit(
        &self,
        client_addr: &str,
        fields: SubmissionFields,
        resume: ResumeUpload,
    ) -> Result<SubmitOutcome, IntakeError> {
        if !self.limits.allow(LimitTier::SubmissionGlobal, GLOBAL_SUBMISSION_KEY) {
            return Err(IntakeError::RateLimited);
        }
        if !self.limits.allow(LimitTier::Submission, client_addr) {
            return Err(IntakeError::RateLimited);
        }
        self.engine.evaluate(fields, resume).await
    }

    /// Storage hygiene pass: reclaims expired OTP records and idle rate-limit
    /// counters. Driven by the host's periodic reaper.
    pub fn sweep(&self) -> usize {
        self.otp.sweep_expired() + self.limits.prune_idle()
    }
}

fn require_email(raw: &str) -> Result<String, IntakeError> {
    let email = normalize_email(raw);
    if email.is_empty() {
        return Err(ValidationError::MissingEmail.into());
    }
    Ok(email)
}
