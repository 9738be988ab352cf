use async_trait::async_trait;

use super::domain::{AtsStatus, CandidateDetails, CandidateRecord, ParsedResume, ResumeFields, ResumeUpload};

/// Resume text/field extraction, consumed at its boundary. Implementations
/// must fail distinguishably on media types they cannot read.
#[async_trait]
pub trait ResumeParser: Send + Sync {
    async fn parse(&self, bytes: &[u8], media_type: &str) -> Result<ParsedResume, ParserError>;
}

/// Automated suitability scoring for a category, 0 through 100. Deterministic
/// for identical inputs so the pipeline stays testable.
#[async_trait]
pub trait AtsScorer: Send + Sync {
    async fn score(
        &self,
        fields: &ResumeFields,
        resume_text: &str,
        category: &str,
    ) -> Result<u8, ScorerError>;
}

/// Outbound notification delivery: verification codes to candidates and
/// qualified-candidate notifications (with the resume attached) to the
/// reviewer inbox.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), MailerError>;

    async fn notify_reviewer(
        &self,
        candidate: &CandidateDetails,
        score: u8,
        ats_status: AtsStatus,
        resume: &ResumeUpload,
    ) -> Result<(), MailerError>;
}

/// Durable keyed collection for candidate records.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Number of stored submissions (qualified or rejected) for an email.
    async fn count_for_email(&self, email: &str) -> Result<u32, StoreError>;

    /// Appends a record and returns the storage-assigned key.
    async fn insert(&self, record: CandidateRecord) -> Result<String, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("unsupported resume media type: {0}")]
    UnsupportedMediaType(String),
    #[error("resume could not be parsed: {0}")]
    Malformed(String),
    #[error("resume parser unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    #[error("ats scorer unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("mail delivery rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("candidate store unavailable: {0}")]
    Unavailable(String),
}
