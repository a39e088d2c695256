use thiserror::Error;

/// Failure reported by the verification provider or by the transport in
/// front of it. `status` is set only when the provider actually answered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Bouncify API Error: {} - {message}", status_label(.status))]
pub struct ProviderError {
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "n/a".to_string(), |status| status.to_string())
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Entity already exists: {0}")]
    AlreadyExists(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not authenticated: {0}")]
    Unauthorized(String),
    #[error("Operation not allowed: {0}")]
    Forbidden(String),
    #[error("Insufficient credits: {required} required, {remaining} remaining")]
    InsufficientCredits { required: i64, remaining: i64 },
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
