use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use rand::Rng;
use recruit_intake::config::IntakeSettings;
use recruit_intake::workflows::intake::{
    AtsScorer, AtsStatus, CandidateDetails, CandidateRecord, CandidateStore, IntakeConfig, Mailer,
    MailerError, ParsedResume, ParserError, RateLimitConfig, ResumeFields, ResumeParser,
    ResumeUpload, ScorerError, StoreError, TierPolicy,
};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Intake tunables derived from the deployment configuration.
pub(crate) fn intake_config(settings: &IntakeSettings) -> IntakeConfig {
    let limits = RateLimitConfig {
        submission_global: TierPolicy::new(
            chrono::Duration::hours(1),
            settings.global_submission_limit,
        ),
        ..RateLimitConfig::default()
    };
    IntakeConfig {
        limits,
        ..IntakeConfig::default()
    }
}

/// Reference candidate store keeping records in process memory. Keys imitate
/// the 24-hex object ids of the production document store.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCandidateStore {
    records: Arc<Mutex<Vec<(String, CandidateRecord)>>>,
}

impl InMemoryCandidateStore {
    pub(crate) fn records(&self) -> Vec<CandidateRecord> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }
}

fn storage_key() -> String {
    let value: u128 = rand::thread_rng().gen();
    let hex = format!("{value:032x}");
    hex[..24].to_string()
}

#[async_trait]
impl CandidateStore for InMemoryCandidateStore {
    async fn count_for_email(&self, email: &str) -> Result<u32, StoreError> {
        let records = self.records.lock().expect("store mutex poisoned");
        Ok(records
            .iter()
            .filter(|(_, record)| record.details.email == email)
            .count() as u32)
    }

    async fn insert(&self, record: CandidateRecord) -> Result<String, StoreError> {
        let key = storage_key();
        self.records
            .lock()
            .expect("store mutex poisoned")
            .push((key.clone(), record));
        Ok(key)
    }
}

/// Development mail transport: deliveries become structured log lines. The
/// verification code is logged instead of sent, which is exactly what local
/// runs want and production must never use.
pub(crate) struct LoggingMailer {
    reviewer_email: String,
}

impl LoggingMailer {
    pub(crate) fn new(reviewer_email: String) -> Self {
        LoggingMailer { reviewer_email }
    }
}

#[async_trait]
impl Mailer for LoggingMailer {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), MailerError> {
        info!(
            event = "otp_email_dispatched",
            email,
            code,
            "development transport: code logged, not sent"
        );
        Ok(())
    }

    async fn notify_reviewer(
        &self,
        candidate: &CandidateDetails,
        score: u8,
        ats_status: AtsStatus,
        resume: &ResumeUpload,
    ) -> Result<(), MailerError> {
        info!(
            event = "reviewer_notification_dispatched",
            reviewer = %self.reviewer_email,
            candidate = %candidate.email,
            score,
            ats_status = ats_status.label(),
            attachment = %resume.file_name,
        );
        Ok(())
    }
}

/// Reference parser: UTF-8 plain text as-is, PDF via text extraction, and a
/// distinguishable failure for anything else.
pub(crate) struct TextResumeParser;

#[async_trait]
impl ResumeParser for TextResumeParser {
    async fn parse(&self, bytes: &[u8], media_type: &str) -> Result<ParsedResume, ParserError> {
        let mime_type: mime::Mime = media_type
            .trim()
            .parse()
            .map_err(|_| ParserError::UnsupportedMediaType(media_type.to_string()))?;

        let text = match (mime_type.type_().as_str(), mime_type.subtype().as_str()) {
            ("text", "plain") => String::from_utf8(bytes.to_vec())
                .map_err(|_| ParserError::Malformed("resume is not valid UTF-8".to_string()))?,
            ("application", "pdf") => pdf_extract::extract_text_from_mem(bytes)
                .map_err(|cause| ParserError::Malformed(cause.to_string()))?,
            _ => return Err(ParserError::UnsupportedMediaType(media_type.to_string())),
        };

        Ok(ParsedResume {
            fields: extract_fields(&text),
            text,
        })
    }
}

/// Section-header scan: lines under a "Skills" heading become the skill list,
/// "Experience" and "Education" blocks are captured verbatim.
fn extract_fields(text: &str) -> ResumeFields {
    #[derive(PartialEq)]
    enum Section {
        None,
        Skills,
        Experience,
        Education,
    }

    let mut section = Section::None;
    let mut skills = Vec::new();
    let mut experience = Vec::new();
    let mut education = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        let lowered = trimmed.to_ascii_lowercase();
        if lowered.starts_with("skills") {
            section = Section::Skills;
            continue;
        }
        if lowered.starts_with("experience") || lowered.starts_with("work history") {
            section = Section::Experience;
            continue;
        }
        if lowered.starts_with("education") {
            section = Section::Education;
            continue;
        }
        if trimmed.is_empty() {
            section = Section::None;
            continue;
        }

        match section {
            Section::Skills => skills.extend(
                trimmed
                    .split(&[',', ';'][..])
                    .map(|skill| skill.trim().to_string())
                    .filter(|skill| !skill.is_empty()),
            ),
            Section::Experience => experience.push(trimmed.to_string()),
            Section::Education => education.push(trimmed.to_string()),
            Section::None => {}
        }
    }

    ResumeFields {
        skills,
        experience: (!experience.is_empty()).then(|| experience.join("; ")),
        education: (!education.is_empty()).then(|| education.join("; ")),
    }
}

/// Reference scorer: keyword coverage against a fixed per-category inventory,
/// with small credits for documented experience and education. Pure and
/// deterministic.
pub(crate) struct KeywordAtsScorer;

fn category_keywords(category: &str) -> &'static [&'static str] {
    match category.trim().to_ascii_lowercase().as_str() {
        "software development" => &[
            "rust", "python", "java", "javascript", "api", "backend", "frontend", "git", "sql",
            "cloud",
        ],
        "data science" => &[
            "python",
            "statistics",
            "machine learning",
            "pandas",
            "sql",
            "model",
            "analysis",
            "visualization",
        ],
        "marketing" => &["seo", "campaign", "content", "analytics", "brand", "social media"],
        "sales" => &["crm", "pipeline", "negotiation", "quota", "prospecting", "closing"],
        "design" => &["figma", "ux", "ui", "typography", "wireframe", "prototype"],
        _ => &["communication", "team", "project", "leadership"],
    }
}

#[async_trait]
impl AtsScorer for KeywordAtsScorer {
    async fn score(
        &self,
        fields: &ResumeFields,
        resume_text: &str,
        category: &str,
    ) -> Result<u8, ScorerError> {
        let keywords = category_keywords(category);
        let mut haystack = resume_text.to_ascii_lowercase();
        for skill in &fields.skills {
            haystack.push(' ');
            haystack.push_str(&skill.to_ascii_lowercase());
        }

        let matched = keywords
            .iter()
            .filter(|keyword| haystack.contains(*keyword))
            .count();
        let coverage = (matched as f64 / keywords.len() as f64 * 80.0).round() as u32;

        let mut score = coverage;
        if fields.experience.is_some() {
            score += 10;
        }
        if fields.education.is_some() {
            score += 10;
        }
        Ok(score.min(100) as u8)
    }
}
