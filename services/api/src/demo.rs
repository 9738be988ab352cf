use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clap::Args;
use recruit_intake::config::AppConfig;
use recruit_intake::error::AppError;
use recruit_intake::workflows::intake::{
    AtsStatus, CandidateDetails, CandidateIntakeService, Mailer, MailerError, ResumeUpload,
    SubmissionFields, SubmitOutcome,
};

use crate::infra::{intake_config, InMemoryCandidateStore, KeywordAtsScorer, TextResumeParser};

const DEMO_ADDRESS: &str = "demo-cli";

const SAMPLE_RESUME: &str = "Skills\n\
Rust, SQL, cloud infrastructure, API design\n\
\n\
Experience\n\
Backend engineer building git-driven deployment tooling for five years\n\
\n\
Education\n\
BSc Computer Science\n";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Candidate email used throughout the conversation
    #[arg(long, default_value = "candidate@example.com")]
    email: String,
    /// Job category for the sample application
    #[arg(long, default_value = "Software Development")]
    category: String,
    /// Optional plain-text resume file; a built-in sample is used otherwise
    #[arg(long)]
    resume: Option<PathBuf>,
}

/// Mailer for the demo: codes are captured so the flow can verify them, and
/// reviewer notifications print instead of sending.
#[derive(Default)]
struct CapturingMailer {
    codes: Mutex<Vec<(String, String)>>,
}

impl CapturingMailer {
    fn last_code(&self, email: &str) -> Option<String> {
        self.codes
            .lock()
            .expect("mailer mutex poisoned")
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), MailerError> {
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
        resume: &ResumeUpload,
    ) -> Result<(), MailerError> {
        println!(
            "  Reviewer notification: {} scored {} ({}), attachment {}",
            candidate.email,
            score,
            ats_status.label(),
            resume.file_name
        );
        Ok(())
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let mailer = Arc::new(CapturingMailer::default());
    let store = Arc::new(InMemoryCandidateStore::default());
    let service = Arc::new(CandidateIntakeService::new(
        Arc::new(TextResumeParser),
        Arc::new(KeywordAtsScorer),
        mailer.clone(),
        store.clone(),
        intake_config(&config.intake),
    ));

    println!("Candidate intake demo for {}", args.email);

    // 1. Request a verification code.
    if let Err(err) = service.send_code(DEMO_ADDRESS, &args.email).await {
        println!("  Code delivery failed: {err}");
        return Ok(());
    }
    let Some(code) = mailer.last_code(&args.email.trim().to_ascii_lowercase()) else {
        println!("  No code was captured; aborting demo");
        return Ok(());
    };
    println!("  Verification code issued: {code}");

    // 2. Verify it.
    match service.verify_code(DEMO_ADDRESS, &args.email, &code).await {
        Ok(true) => println!("  Email verified"),
        Ok(false) => {
            println!("  Verification failed unexpectedly");
            return Ok(());
        }
        Err(err) => {
            println!("  Verification errored: {err}");
            return Ok(());
        }
    }

    // 3. Submit an application.
    let resume_bytes = match &args.resume {
        Some(path) => std::fs::read(path)?,
        None => SAMPLE_RESUME.as_bytes().to_vec(),
    };
    let resume = ResumeUpload {
        file_name: args
            .resume
            .as_ref()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resume.txt".to_string()),
        media_type: "text/plain".to_string(),
        bytes: resume_bytes,
    };

    let mut fields = SubmissionFields::default();
    fields.set("fullName", "Demo Candidate".to_string());
    fields.set("email", args.email.clone());
    fields.set("phone", "+1 555 0100".to_string());
    fields.set("city", "Des Moines".to_string());
    fields.set("state", "IA".to_string());
    fields.set("collegeName", "State University".to_string());
    fields.set("jobCategory", args.category.clone());
    if args.category == "Custom" {
        fields.set("customJobRole", "Demo Role".to_string());
    }

    match service.submit(DEMO_ADDRESS, fields, resume).await {
        Ok(SubmitOutcome::Qualified {
            application_id,
            score,
            ats_status,
        }) => println!(
            "  QUALIFIED: application {} (score {}, ats {})",
            application_id.0,
            score,
            ats_status.label()
        ),
        Ok(SubmitOutcome::Rejected { score, ats_status }) => println!(
            "  REJECTED_BY_ATS: score {} (ats {})",
            score,
            ats_status.label()
        ),
        Err(err) => {
            println!("  Submission failed: {err}");
            return Ok(());
        }
    }

    // 4. Show the quota after the attempt.
    match service.quota_view(&args.email).await {
        Ok(view) => println!(
            "  Quota: {} of {} used, {} remaining",
            view.count, view.limit, view.remaining
        ),
        Err(err) => println!("  Quota lookup failed: {err}"),
    }

    let records = store.records();
    println!("  Stored records: {}", records.len());
    if let Ok(json) = serde_json::to_string_pretty(&records) {
        println!("{json}");
    }

    Ok(())
}
