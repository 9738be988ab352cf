use super::domain::{normalize_email, CandidateDetails, ResumeUpload, SubmissionFields};

/// Field-level rejections raised before any collaborator is consulted.
/// Messages are the public API; clients render them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Resume file is required")]
    MissingResume,
    #[error("Missing required fields")]
    MissingRequiredFields,
    #[error("Custom job role is required")]
    MissingCustomRole,
    #[error("Email is required")]
    MissingEmail,
}

/// Converts raw form fields into validated candidate details.
///
/// Required: full name, email, phone, city, state, college, job category, and
/// a non-empty resume. A `Custom` category additionally requires the custom
/// role text. Optional fields collapse to `None` when blank, and the email is
/// normalized once here for every downstream identity use.
pub fn validate_submission(
    fields: SubmissionFields,
    resume: &ResumeUpload,
) -> Result<CandidateDetails, ValidationError> {
    if resume.bytes.is_empty() {
        return Err(ValidationError::MissingResume);
    }

    let SubmissionFields {
        full_name,
        email,
        phone,
        city,
        state,
        linkedin,
        college_name,
        current_company,
        description,
        job_category,
        custom_job_role,
    } = fields;

    let (
        Some(full_name),
        Some(email),
        Some(phone),
        Some(city),
        Some(state),
        Some(college_name),
        Some(job_category),
    ) = (
        nonempty(full_name),
        nonempty(email),
        nonempty(phone),
        nonempty(city),
        nonempty(state),
        nonempty(college_name),
        nonempty(job_category),
    )
    else {
        return Err(ValidationError::MissingRequiredFields);
    };

    let custom_job_role = nonempty(custom_job_role);
    if job_category == "Custom" && custom_job_role.is_none() {
        return Err(ValidationError::MissingCustomRole);
    }

    Ok(CandidateDetails {
        full_name,
        email: normalize_email(&email),
        phone,
        city,
        state,
        linkedin: nonempty(linkedin),
        college_name,
        current_company: nonempty(current_company),
        description: nonempty(description),
        job_category,
        custom_job_role,
    })
}

fn nonempty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
