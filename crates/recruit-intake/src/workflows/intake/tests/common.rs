use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::workflows::intake::collaborators::{
    AtsScorer, CandidateStore, Mailer, MailerError, ParserError, ResumeParser, ScorerError,
    StoreError,
};
use crate::workflows::intake::domain::{
    AtsStatus, CandidateDetails, CandidateRecord, ParsedResume, ResumeFields, ResumeUpload,
    SubmissionFields,
};
use crate::workflows::intake::{CandidateIntakeService, Clock, IntakeConfig};

pub(super) fn start_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

/// Parser fake: UTF-8 text/plain passthrough, everything else unsupported.
pub(super) struct StubParser;

#[async_trait]
impl ResumeParser for StubParser {
    async fn parse(&self, bytes: &[u8], media_type: &str) -> Result<ParsedResume, ParserError> {
        if media_type != "text/plain" {
            return Err(ParserError::UnsupportedMediaType(media_type.to_string()));
        }
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|_| ParserError::Malformed("resume is not valid UTF-8".to_string()))?;
        Ok(ParsedResume {
            fields: ResumeFields {
                skills: vec!["rust".to_string()],
                experience: Some("three years".to_string()),
                education: None,
            },
            text,
        })
    }
}

pub(super) struct FailingParser;

#[async_trait]
impl ResumeParser for FailingParser {
    async fn parse(&self, _bytes: &[u8], _media_type: &str) -> Result<ParsedResume, ParserError> {
        Err(ParserError::Unavailable("extraction backend offline".to_string()))
    }
}

pub(super) struct SlowParser;

#[async_trait]
impl ResumeParser for SlowParser {
    async fn parse(&self, _bytes: &[u8], _media_type: &str) -> Result<ParsedResume, ParserError> {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        Err(ParserError::Unavailable("should have timed out first".to_string()))
    }
}

/// Scorer fake: reads a `score=NN` marker out of the resume text so each test
/// submission carries its own deterministic score. Defaults to 50.
pub(super) struct MarkerScorer;

#[async_trait]
impl AtsScorer for MarkerScorer {
    async fn score(
        &self,
        _fields: &ResumeFields,
        resume_text: &str,
        _category: &str,
    ) -> Result<u8, ScorerError> {
        Ok(resume_text
            .split_whitespace()
            .find_map(|token| token.strip_prefix("score="))
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(50))
    }
}

/// Mailer fake recording deliveries, with switchable failure modes.
#[derive(Default)]
pub(super) struct RecordingMailer {
    codes: Mutex<Vec<(String, String)>>,
    notifications: Mutex<Vec<(String, u8, AtsStatus)>>,
    fail_send: AtomicBool,
    fail_notify: AtomicBool,
}

impl RecordingMailer {
    pub(super) fn last_code(&self, email: &str) -> Option<String> {
        self.codes
            .lock()
            .expect("mailer mutex poisoned")
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    pub(super) fn notifications(&self) -> Vec<(String, u8, AtsStatus)> {
        self.notifications
            .lock()
            .expect("mailer mutex poisoned")
            .clone()
    }

    pub(super) fn set_fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    pub(super) fn set_fail_notify(&self, fail: bool) {
        self.fail_notify.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), MailerError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(MailerError::Transport("smtp connection refused".to_string()));
        }
        self.codes
            .lock()
            .expect("mailer mutex poisoned")
            .push((email.to_string(), code.to_string()));
        Ok(())
    }

    async fn notify_reviewer(
        &self,
        candidate: &CandidateDetails,
        score: u8,
        ats_status: AtsStatus,
        _resume: &ResumeUpload,
    ) -> Result<(), MailerError> {
        if self.fail_notify.load(Ordering::SeqCst) {
            return Err(MailerError::Transport("smtp connection refused".to_string()));
        }
        self.notifications
            .lock()
            .expect("mailer mutex poisoned")
            .push((candidate.email.clone(), score, ats_status));
        Ok(())
    }
}

/// Store fake: append-only vec with sequential hex keys, count by email scan,
/// and a switchable insert failure for the persist-after-notify path.
#[derive(Default)]
pub(super) struct MemoryStore {
    seq: AtomicU64,
    records: Mutex<Vec<(String, CandidateRecord)>>,
    fail_insert: AtomicBool,
}

impl MemoryStore {
    pub(super) fn records(&self) -> Vec<CandidateRecord> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }

    pub(super) fn keys(&self) -> Vec<String> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("store mutex poisoned").len()
    }

    pub(super) fn set_fail_insert(&self, fail: bool) {
        self.fail_insert.store(fail, Ordering::SeqCst);
    }

    pub(super) fn seed(&self, record: CandidateRecord) {
        let key = self.next_key();
        self.records
            .lock()
            .expect("store mutex poisoned")
            .push((key, record));
    }

    fn next_key(&self) -> String {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{:08x}{:016x}", 0x65f2c4a1u32, seq)
    }
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn count_for_email(&self, email: &str) -> Result<u32, StoreError> {
        Ok(self
            .records
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .filter(|(_, record)| record.details.email == email)
            .count() as u32)
    }

    async fn insert(&self, record: CandidateRecord) -> Result<String, StoreError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("database offline".to_string()));
        }
        let key = self.next_key();
        self.records
            .lock()
            .expect("store mutex poisoned")
            .push((key.clone(), record));
        Ok(key)
    }
}

pub(super) fn submission_fields(email: &str) -> SubmissionFields {
    let mut fields = SubmissionFields::default();
    fields.set("fullName", "Ada Lovelace".to_string());
    fields.set("email", email.to_string());
    fields.set("phone", "+1 555 0100".to_string());
    fields.set("city", "Des Moines".to_string());
    fields.set("state", "IA".to_string());
    fields.set("collegeName", "State University".to_string());
    fields.set("jobCategory", "Software Development".to_string());
    fields
}

pub(super) fn resume_scoring(score: u8) -> ResumeUpload {
    ResumeUpload {
        file_name: "resume.txt".to_string(),
        media_type: "text/plain".to_string(),
        bytes: format!("Systems engineer, shipped things. score={score}").into_bytes(),
    }
}

pub(super) fn sample_details(email: &str) -> CandidateDetails {
    CandidateDetails {
        full_name: "Ada Lovelace".to_string(),
        email: email.to_string(),
        phone: "+1 555 0100".to_string(),
        city: "Des Moines".to_string(),
        state: "IA".to_string(),
        linkedin: None,
        college_name: "State University".to_string(),
        current_company: None,
        description: None,
        job_category: "Software Development".to_string(),
        custom_job_role: None,
    }
}

pub(super) fn rejected_record(email: &str) -> CandidateRecord {
    CandidateRecord::rejected(
        sample_details(email),
        ResumeFields::default(),
        40,
        AtsStatus::Completed,
        start_instant(),
    )
}

pub(super) type TestService =
    CandidateIntakeService<StubParser, MarkerScorer, RecordingMailer, MemoryStore>;

pub(super) struct Harness {
    pub(super) service: Arc<TestService>,
    pub(super) store: Arc<MemoryStore>,
    pub(super) mailer: Arc<RecordingMailer>,
    pub(super) clock: Arc<Clock>,
}

pub(super) fn harness() -> Harness {
    let config = IntakeConfig::default();
    let store = Arc::new(MemoryStore::default());
    let mailer = Arc::new(RecordingMailer::default());
    let clock = Arc::new(Clock::fixed(start_instant()));
    let service = Arc::new(CandidateIntakeService::with_clock(
        Arc::new(StubParser),
        Arc::new(MarkerScorer),
        mailer.clone(),
        store.clone(),
        config,
        clock.clone(),
    ));
    Harness {
        service,
        store,
        mailer,
        clock,
    }
}

/// Hand-rolled multipart encoding for router tests.
pub(super) const MULTIPART_BOUNDARY: &str = "intake-test-boundary";

pub(super) fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}")
}

pub(super) fn multipart_body(
    fields: &[(String, String)],
    resume: Option<(&str, &str, &[u8])>,
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, media_type, bytes)) = resume {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{file_name}\"\r\nContent-Type: {media_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

pub(super) fn submission_form_parts(email: &str) -> Vec<(String, String)> {
    vec![
        ("fullName".to_string(), "Ada Lovelace".to_string()),
        ("email".to_string(), email.to_string()),
        ("phone".to_string(), "+1 555 0100".to_string()),
        ("city".to_string(), "Des Moines".to_string()),
        ("state".to_string(), "IA".to_string()),
        ("collegeName".to_string(), "State University".to_string()),
        ("jobCategory".to_string(), "Software Development".to_string()),
    ]
}

pub(super) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
