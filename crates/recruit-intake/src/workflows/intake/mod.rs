//! OTP-gated candidate intake: multi-tier rate limiting, verification-code
//! lifecycle, per-email submission quotas, and the qualification decision
//! pipeline behind the public careers API.
//!
//! The one hard consistency rule lives in the decision engine: a qualified
//! submission is persisted only after the reviewer notification succeeded,
//! and a failed notification persists nothing.

pub mod clock;
pub mod collaborators;
pub mod domain;
pub mod engine;
pub mod otp;
pub mod quota;
pub mod ratelimit;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use clock::Clock;
pub use collaborators::{
    AtsScorer, CandidateStore, Mailer, MailerError, ParserError, ResumeParser, ScorerError,
    StoreError,
};
pub use domain::{
    is_exempt_category, normalize_email, ApplicationId, AtsStatus, CandidateDetails,
    CandidateRecord, ParsedResume, ResumeFields, ResumeUpload, SubmissionFields, SubmissionStatus,
};
pub use engine::{
    CollaboratorError, IntakeError, SubmitOutcome, EXEMPT_CATEGORY_SCORE, QUALIFYING_SCORE,
};
pub use otp::{OtpService, CODE_TTL_MINUTES};
pub use quota::{QuotaGuard, QuotaView, SUBMISSION_LIMIT};
pub use ratelimit::{
    LimitTier, RateLimitConfig, RateLimiter, TierPolicy, GLOBAL_SUBMISSION_KEY,
};
pub use router::intake_router;
pub use service::{CandidateIntakeService, IntakeConfig};
pub use validation::ValidationError;
