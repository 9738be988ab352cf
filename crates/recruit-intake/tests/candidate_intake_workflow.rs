//! End-to-end specifications for the OTP-gated intake conversation.
//!
//! Scenarios run through the public service facade and HTTP router so code
//! delivery, verification, quota preview, and submission behave together the
//! way a candidate experiences them.

mod common {
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    use recruit_intake::workflows::intake::{
        intake_router, AtsScorer, AtsStatus, CandidateDetails, CandidateIntakeService,
        CandidateRecord, CandidateStore, Clock, IntakeConfig, Mailer, MailerError, ParsedResume,
        ParserError, ResumeFields, ResumeParser, ResumeUpload, ScorerError, StoreError,
    };

    pub(super) fn start_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    pub(super) struct PlainTextParser;

    #[async_trait]
    impl ResumeParser for PlainTextParser {
        async fn parse(
            &self,
            bytes: &[u8],
            media_type: &str,
        ) -> Result<ParsedResume, ParserError> {
            if media_type != "text/plain" {
                return Err(ParserError::UnsupportedMediaType(media_type.to_string()));
            }
            let text = String::from_utf8(bytes.to_vec())
                .map_err(|_| ParserError::Malformed("resume is not valid UTF-8".to_string()))?;
            Ok(ParsedResume {
                fields: ResumeFields::default(),
                text,
            })
        }
    }

    /// Scores the `score=NN` marker embedded in the resume text.
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

    #[derive(Default)]
    pub(super) struct OutboxMailer {
        codes: Mutex<Vec<(String, String)>>,
        notified: Mutex<Vec<String>>,
        fail_notify: AtomicBool,
    }

    impl OutboxMailer {
        pub(super) fn last_code(&self, email: &str) -> Option<String> {
            self.codes
                .lock()
                .expect("lock")
                .iter()
                .rev()
                .find(|(to, _)| to == email)
                .map(|(_, code)| code.clone())
        }

        pub(super) fn notified(&self) -> Vec<String> {
            self.notified.lock().expect("lock").clone()
        }

        pub(super) fn set_fail_notify(&self, fail: bool) {
            self.fail_notify.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Mailer for OutboxMailer {
        async fn send_code(&self, email: &str, code: &str) -> Result<(), MailerError> {
            self.codes
                .lock()
                .expect("lock")
                .push((email.to_string(), code.to_string()));
            Ok(())
        }

        async fn notify_reviewer(
            &self,
            candidate: &CandidateDetails,
            _score: u8,
            _ats_status: AtsStatus,
            _resume: &ResumeUpload,
        ) -> Result<(), MailerError> {
            if self.fail_notify.load(Ordering::SeqCst) {
                return Err(MailerError::Transport("smtp connection refused".to_string()));
            }
            self.notified
                .lock()
                .expect("lock")
                .push(candidate.email.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    pub(super) struct MemoryStore {
        seq: AtomicU64,
        records: Mutex<Vec<(String, CandidateRecord)>>,
    }

    impl MemoryStore {
        pub(super) fn records(&self) -> Vec<CandidateRecord> {
            self.records
                .lock()
                .expect("lock")
                .iter()
                .map(|(_, record)| record.clone())
                .collect()
        }
    }

    #[async_trait]
    impl CandidateStore for MemoryStore {
        async fn count_for_email(&self, email: &str) -> Result<u32, StoreError> {
            Ok(self
                .records
                .lock()
                .expect("lock")
                .iter()
                .filter(|(_, record)| record.details.email == email)
                .count() as u32)
        }

        async fn insert(&self, record: CandidateRecord) -> Result<String, StoreError> {
            let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
            let key = format!("{:08x}{:016x}", 0x9a3bd0c2u32, seq);
            self.records
                .lock()
                .expect("lock")
                .push((key.clone(), record));
            Ok(key)
        }
    }

    pub(super) struct Deployment {
        pub(super) router: axum::Router,
        pub(super) mailer: Arc<OutboxMailer>,
        pub(super) store: Arc<MemoryStore>,
    }

    pub(super) fn deployment() -> Deployment {
        let mailer = Arc::new(OutboxMailer::default());
        let store = Arc::new(MemoryStore::default());
        let service = Arc::new(CandidateIntakeService::with_clock(
            Arc::new(PlainTextParser),
            Arc::new(MarkerScorer),
            mailer.clone(),
            store.clone(),
            IntakeConfig::default(),
            Arc::new(Clock::fixed(start_instant())),
        ));
        Deployment {
            router: intake_router(service),
            mailer,
            store,
        }
    }

    pub(super) const BOUNDARY: &str = "intake-workflow-boundary";

    pub(super) fn multipart_submission(email: &str, score: u8) -> Vec<u8> {
        let fields = [
            ("fullName", "Ada Lovelace"),
            ("email", email),
            ("phone", "+1 555 0100"),
            ("city", "Des Moines"),
            ("state", "IA"),
            ("collegeName", "State University"),
            ("jobCategory", "Software Development"),
        ];
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"resume.txt\"\r\nContent-Type: text/plain\r\n\r\nShipped distributed systems. score={score}\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    pub(super) async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }
}

mod conversation {
    use super::common::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    const ADDRESS: &str = "203.0.113.7";

    async fn post_json(
        router: &axum::Router,
        path: &str,
        body: serde_json::Value,
    ) -> axum::response::Response {
        router
            .clone()
            .oneshot(
                Request::post(path)
                    .header("content-type", "application/json")
                    .header("x-forwarded-for", ADDRESS)
                    .body(Body::from(body.to_string()))
                    .expect("request builds"),
            )
            .await
            .expect("router dispatch")
    }

    async fn post_submission(
        router: &axum::Router,
        email: &str,
        score: u8,
    ) -> axum::response::Response {
        router
            .clone()
            .oneshot(
                Request::post("/applications/submit")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .header("x-forwarded-for", ADDRESS)
                    .body(Body::from(multipart_submission(email, score)))
                    .expect("request builds"),
            )
            .await
            .expect("router dispatch")
    }

    #[tokio::test]
    async fn candidate_walks_the_full_happy_path() {
        let deployment = deployment();
        let email = "ada@example.com";

        // Request a verification code.
        let response = post_json(
            &deployment.router,
            "/otp/send",
            json!({ "email": email }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let code = deployment.mailer.last_code(email).expect("code delivered");

        // Verify it.
        let response = post_json(
            &deployment.router,
            "/otp/verify",
            json!({ "email": email, "otp": code }),
        )
        .await;
        let payload = read_json(response).await;
        assert_eq!(payload["verified"], json!(true));

        // Quota preview shows a clean slate.
        let response = post_json(
            &deployment.router,
            "/candidates/check-duplicate",
            json!({ "email": email }),
        )
        .await;
        let payload = read_json(response).await;
        assert_eq!(payload["remaining"], json!(3));

        // Submit a qualifying application.
        let response = post_submission(&deployment.router, email, 82).await;
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json(response).await;
        assert_eq!(payload["result"], json!("QUALIFIED"));
        assert_eq!(payload["score"], json!(82));

        assert_eq!(deployment.mailer.notified(), vec![email.to_string()]);
        let records = deployment.store.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].reviewer_notified);
    }

    #[tokio::test]
    async fn failed_notifications_never_consume_quota() {
        let deployment = deployment();
        let email = "ada@example.com";

        // Attempt 1 scores 40: rejected, stored.
        let response = post_submission(&deployment.router, email, 40).await;
        let payload = read_json(response).await;
        assert_eq!(payload["result"], json!("REJECTED_BY_ATS"));

        // Attempt 2 scores 70 with the reviewer mailer down: server error,
        // nothing stored.
        deployment.mailer.set_fail_notify(true);
        let response = post_submission(&deployment.router, email, 70).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        // Attempt 3 scores 70 with the mailer restored: qualified, stored.
        deployment.mailer.set_fail_notify(false);
        let response = post_submission(&deployment.router, email, 70).await;
        let payload = read_json(response).await;
        assert_eq!(payload["result"], json!("QUALIFIED"));

        let records = deployment.store.records();
        assert_eq!(records.len(), 2, "failed notification left no record");

        // One slot remains because the failed attempt never counted.
        let response = post_json(
            &deployment.router,
            "/candidates/check-duplicate",
            json!({ "email": email }),
        )
        .await;
        let payload = read_json(response).await;
        assert_eq!(payload["count"], json!(2));
        assert_eq!(payload["remaining"], json!(1));
        assert_eq!(payload["canSubmit"], json!(true));
    }

    #[tokio::test]
    async fn email_identity_is_normalized_across_the_conversation() {
        let deployment = deployment();

        let response = post_json(
            &deployment.router,
            "/otp/send",
            json!({ "email": " Ada@Example.COM " }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        // The normalized form verifies the code issued to the decorated one.
        let code = deployment
            .mailer
            .last_code("ada@example.com")
            .expect("code delivered under normalized identity");
        let response = post_json(
            &deployment.router,
            "/otp/verify",
            json!({ "email": "ada@example.com", "otp": code }),
        )
        .await;
        let payload = read_json(response).await;
        assert_eq!(payload["verified"], json!(true));
    }
}
