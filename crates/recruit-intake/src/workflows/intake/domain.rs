use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Short identifier returned to candidates after a qualified submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    /// Derives the public id from the storage-assigned key: the first eight
    /// characters, uppercased.
    pub fn from_storage_key(key: &str) -> Self {
        ApplicationId(key.chars().take(8).collect::<String>().to_uppercase())
    }
}

/// Raw form fields as they arrive from the multipart submit request. Every
/// slot is optional until `validation` has had its say.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionFields {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub linkedin: Option<String>,
    pub college_name: Option<String>,
    pub current_company: Option<String>,
    pub description: Option<String>,
    pub job_category: Option<String>,
    pub custom_job_role: Option<String>,
}

impl SubmissionFields {
    /// Routes a multipart part into its slot by the public field name.
    /// Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: String) {
        let slot = match name {
            "fullName" => &mut self.full_name,
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            "city" => &mut self.city,
            "state" => &mut self.state,
            "linkedin" => &mut self.linkedin,
            "collegeName" => &mut self.college_name,
            "currentCompany" => &mut self.current_company,
            "description" => &mut self.description,
            "jobCategory" => &mut self.job_category,
            "customJobRole" => &mut self.custom_job_role,
            _ => return,
        };
        *slot = Some(value);
    }
}

/// Candidate attributes after validation; the shape the pipeline and the
/// reviewer notification both consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDetails {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    pub college_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub job_category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_job_role: Option<String>,
}

/// The uploaded resume as received: original file name, declared media type,
/// and raw bytes. Bytes travel to the parser and, for qualified candidates,
/// to the reviewer as an attachment; they are never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeUpload {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Structured fields the parser collaborator extracts from a resume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeFields {
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
}

/// Parser output: full text plus the structured fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResume {
    pub text: String,
    pub fields: ResumeFields,
}

/// Whether automated scoring ran or was skipped for an exempt category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AtsStatus {
    Completed,
    Skipped,
}

impl AtsStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AtsStatus::Completed => "COMPLETED",
            AtsStatus::Skipped => "SKIPPED",
        }
    }
}

/// Terminal outcome recorded for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Qualified,
    Rejected,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Qualified => "qualified",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

/// Proof that the reviewer notification for a submission succeeded.
///
/// Only the decision engine can mint one, and only after the mailer returned
/// success; `CandidateRecord::qualified` demands it, so a qualified record
/// cannot exist without a delivered notification.
#[derive(Debug)]
pub struct NotifySuccess(());

impl NotifySuccess {
    pub(crate) fn confirm() -> Self {
        NotifySuccess(())
    }
}

/// Durable record written once per completed submission, never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    #[serde(flatten)]
    pub details: CandidateDetails,
    pub parsed_fields: ResumeFields,
    pub ats_score: u8,
    pub ats_status: AtsStatus,
    pub status: SubmissionStatus,
    pub reviewer_notified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CandidateRecord {
    /// A qualified record. Requires the notification proof, making the
    /// notify-before-persist ordering a compile-time fact.
    pub fn qualified(
        details: CandidateDetails,
        parsed_fields: ResumeFields,
        ats_score: u8,
        ats_status: AtsStatus,
        _notified: NotifySuccess,
        at: DateTime<Utc>,
    ) -> Self {
        CandidateRecord {
            details,
            parsed_fields,
            ats_score,
            ats_status,
            status: SubmissionStatus::Qualified,
            reviewer_notified: true,
            created_at: at,
            updated_at: at,
        }
    }

    /// A rejected record, kept for analytics. No notification is attempted
    /// and the custom role is only retained for Custom-category submissions.
    pub fn rejected(
        mut details: CandidateDetails,
        parsed_fields: ResumeFields,
        ats_score: u8,
        ats_status: AtsStatus,
        at: DateTime<Utc>,
    ) -> Self {
        if details.job_category != "Custom" {
            details.custom_job_role = None;
        }
        CandidateRecord {
            details,
            parsed_fields,
            ats_score,
            ats_status,
            status: SubmissionStatus::Rejected,
            reviewer_notified: false,
            created_at: at,
            updated_at: at,
        }
    }
}

/// Categories outside the automated rubric: scored at a fixed passing value
/// and flagged for manual review downstream.
pub fn is_exempt_category(category: &str) -> bool {
    let normalized = category.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "other" | "custom" | "custom (user-defined role)"
    ) || normalized.starts_with("custom")
}

/// Canonical form of an email used for OTP keys, rate-limit keys, and quota
/// counts.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
