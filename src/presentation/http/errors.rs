use poem_openapi::{ApiResponse, payload::Json};
use tracing::{error, warn};

use crate::{domain::errors::DomainError, presentation::http::responses::ErrorEnvelope};

#[derive(ApiResponse, Debug)]
pub enum ApiError {
    #[oai(status = 400)]
    BadRequest(Json<ErrorEnvelope>),
    #[oai(status = 401)]
    Unauthorized(Json<ErrorEnvelope>),
    #[oai(status = 403)]
    Forbidden(Json<ErrorEnvelope>),
    #[oai(status = 404)]
    NotFound(Json<ErrorEnvelope>),
    #[oai(status = 500)]
    Internal(Json<ErrorEnvelope>),
}

pub type ApiResult<T> = Result<T, ApiError>;

fn body(message: impl Into<String>, error: Option<String>) -> Json<ErrorEnvelope> {
    Json(ErrorEnvelope {
        status: "error".to_string(),
        message: message.into(),
        error,
    })
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(body(message, None))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(body(message, None))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(body(message, None))
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match &err {
            DomainError::Validation(reason) | DomainError::AlreadyExists(reason) => {
                warn!(error = %err, "rejected request");
                ApiError::BadRequest(body(reason.clone(), None))
            }
            DomainError::InsufficientCredits { .. } | DomainError::InvalidTransition { .. } => {
                warn!(error = %err, "rejected request");
                ApiError::BadRequest(body(err.to_string(), None))
            }
            DomainError::Unauthorized(reason) => {
                warn!(error = %err, "unauthorized request");
                ApiError::Unauthorized(body(reason.clone(), None))
            }
            DomainError::Forbidden(reason) => {
                warn!(error = %err, "forbidden request");
                ApiError::Forbidden(body(reason.clone(), None))
            }
            DomainError::NotFound(what) => {
                warn!(error = %err, "resource not found");
                ApiError::NotFound(body(format!("{what} not found"), None))
            }
            DomainError::Provider(provider) => {
                error!(status = ?provider.status, error = %provider, "verification provider failed");
                ApiError::Internal(body(provider.to_string(), Some(provider.message.clone())))
            }
            DomainError::Other(inner) => {
                error!(error = ?inner, "internal error");
                ApiError::Internal(body("Internal server error", None))
            }
        }
    }
}
