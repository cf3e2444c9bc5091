use std::collections::BTreeMap;
use thiserror::Error;

/// Field name -> message, for form-style validation failures.
pub type FieldErrors = BTreeMap<&'static str, String>;

/// Errors raised by the donation store, scheduling and import code.
#[derive(Debug, Error)]
pub enum DonationError {
    /// One or more submitted fields failed validation
    #[error("validation failed: {}", summarize(.0))]
    Validation(FieldErrors),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    BadDate(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),
}

impl DonationError {
    pub fn field(name: &'static str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(name, message.into());
        DonationError::Validation(errors)
    }
}

fn summarize(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, msg)| format!("{}: {}", field, msg))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, DonationError>;
