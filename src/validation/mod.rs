//! Input validation module

use crate::models::{
    CreatePermitApplication, PermitApplication, PermitStatus, UnknownStage,
    UpdatePermitApplication, WorkflowStage,
};
use crate::workflow::RemarkField;
use chrono::NaiveDateTime;
use thiserror::Error;
use validator::Validate;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Field '{field}' is too long (max {max} characters)")]
    TooLong { field: String, max: usize },

    #[error("{0}")]
    Fields(#[from] validator::ValidationErrors),

    #[error("Event start must not be after its end")]
    InvalidDateRange,

    #[error("Status {status} does not belong to stage {stage}")]
    StatusStageMismatch {
        status: PermitStatus,
        stage: WorkflowStage,
    },

    #[error(transparent)]
    UnknownStage(#[from] UnknownStage),

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("PDF file is required")]
    EmptyFile,

    #[error("Only PDF files are allowed (content type: {content_type}, file: {file_name})")]
    NotPdf {
        content_type: String,
        file_name: String,
    },

    #[error("Invalid file name: {0}")]
    DangerousFileName(String),

    #[error("File too large (max {max_mb} MB)")]
    FileTooLarge { max_mb: usize },
}

/// Validate a permit application creation request
pub fn validate_create_application(input: &CreatePermitApplication) -> Result<(), ValidationError> {
    input.validate()?;
    validate_date_range(input.start_date_time, input.end_date_time)
}

/// Validate an update against the record it will be merged into
pub fn validate_update_application(
    input: &UpdatePermitApplication,
    current: &PermitApplication,
) -> Result<(), ValidationError> {
    input.validate()?;

    // A status may only be rewritten to the label its current stage carries.
    if let Some(status) = input.status {
        if !status.pairs_with(current.current_stage) {
            return Err(ValidationError::StatusStageMismatch {
                status,
                stage: current.current_stage,
            });
        }
    }

    validate_date_range(
        input.start_date_time.or(current.start_date_time),
        input.end_date_time.or(current.end_date_time),
    )
}

pub fn validate_date_range(
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(ValidationError::InvalidDateRange),
        _ => Ok(()),
    }
}

/// Validate the remark or report an authority attaches to a transition
pub fn validate_remark(field: RemarkField, text: &str) -> Result<(), ValidationError> {
    let max = field.max_len();
    if text.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: format!("{:?}", field),
            max,
        });
    }
    Ok(())
}

pub fn parse_stage(stage: &str) -> Result<WorkflowStage, ValidationError> {
    Ok(stage.parse::<WorkflowStage>()?)
}

/// Content types accepted for permit documents
const PDF_CONTENT_TYPES: &[&str] = &["application/pdf", "application/x-pdf"];

/// A file counts as PDF only when both its content type and its name agree.
pub fn is_pdf(content_type: Option<&str>, file_name: Option<&str>) -> bool {
    let valid_content_type = content_type.is_some_and(|ct| PDF_CONTENT_TYPES.contains(&ct));
    let valid_extension = file_name.is_some_and(|name| name.to_lowercase().ends_with(".pdf"));

    valid_content_type && valid_extension
}

/// Validate an uploaded permit document
pub fn validate_pdf_upload(
    content_type: Option<&str>,
    file_name: Option<&str>,
    file_size: usize,
    max_size_bytes: usize,
) -> Result<(), ValidationError> {
    if file_size == 0 {
        return Err(ValidationError::EmptyFile);
    }

    if file_size > max_size_bytes {
        return Err(ValidationError::FileTooLarge {
            max_mb: max_size_bytes / (1024 * 1024),
        });
    }

    if !is_pdf(content_type, file_name) {
        return Err(ValidationError::NotPdf {
            content_type: content_type.unwrap_or("none").to_string(),
            file_name: file_name.unwrap_or("none").to_string(),
        });
    }

    validate_filename_extensions(file_name.unwrap_or_default())
}

/// Extensions that could be executed if a file were ever served raw
const DANGEROUS_EXTENSIONS: &[&str] = &[
    ".php", ".phtml", ".asp", ".aspx", ".jsp", ".cgi", ".pl", ".py", ".rb", ".exe", ".bat",
    ".cmd", ".com", ".msi", ".dll", ".sh", ".bash", ".js", ".mjs", ".htaccess", ".jar", ".war",
    ".class",
];

/// Reject names hiding an executable extension before the final `.pdf`,
/// e.g. "permit.php.pdf".
pub fn validate_filename_extensions(filename: &str) -> Result<(), ValidationError> {
    let lower = filename.to_lowercase();

    for ext in DANGEROUS_EXTENSIONS {
        if lower.ends_with(ext) || lower.contains(&format!("{}.", ext)) {
            return Err(ValidationError::DangerousFileName(filename.to_string()));
        }
    }

    Ok(())
}
