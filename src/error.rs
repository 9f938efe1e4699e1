//! Errors that abort a certificate run and their HTTP mapping.

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::certificate::RenderError;
use crate::dataset::{ReconciliationError, ValidationErrors};
use crate::ErrorResponse;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    Reconciliation(#[from] ReconciliationError),
    #[error("{0}")]
    Render(#[from] RenderError),
    #[error("could not store the generated document: {0}")]
    Storage(#[source] std::io::Error),
    #[error("a certificate run is already in progress")]
    AlreadyRunning,
}

impl PipelineError {
    /// Short machine-readable name used as the `error` field of responses.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "ValidationError",
            PipelineError::Reconciliation(_) => "ReconciliationError",
            PipelineError::Render(_) => "RenderError",
            PipelineError::Storage(_) => "StorageError",
            PipelineError::AlreadyRunning => "Conflict",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::Reconciliation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::Render(_) | PipelineError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            PipelineError::AlreadyRunning => StatusCode::CONFLICT,
        }
    }
}

impl From<PipelineError> for HttpResponse {
    fn from(error: PipelineError) -> Self {
        HttpResponse::build(error.status_code())
            .json(ErrorResponse::new(error.kind(), &error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ValidationError;

    #[test]
    fn test_status_codes() {
        let validation: PipelineError =
            ValidationErrors::from(ValidationError::missing_upload("ms6File", "MS6")).into();
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
        assert!(validation.to_string().contains("MS6 file is required"));

        let reconciliation: PipelineError = ReconciliationError::MissingNarrativeColumn.into();
        assert_eq!(reconciliation.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let render: PipelineError = RenderError::MissingSignature.into();
        assert_eq!(render.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(render.kind(), "RenderError");

        assert_eq!(PipelineError::AlreadyRunning.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_response_carries_error_body() {
        let response: HttpResponse = PipelineError::AlreadyRunning.into();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
