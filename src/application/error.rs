use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{
    application::collaborators::CollaboratorError,
    domain::{error::DomainError, finalize::FinalizeError},
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Failure kinds surfaced by the application services.
///
/// Every layer below the gateway raises the most specific kind it can; the
/// gateway is the only place these become status codes.
#[derive(Debug, Error)]
pub enum AppError {
    /// Preference or document state that cannot be used.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A library, font or identifier reference that cannot be matched.
    #[error("{0}")]
    Resolution(String),
    #[error("{0}")]
    Validation(String),
    /// A source artifact is missing; `step` names what produces it.
    #[error("{message}; run {step} first")]
    ResourceMissing { message: String, step: String },
    #[error("{0}")]
    Render(String),
    /// The requested feature is disabled.
    #[error("{0}")]
    Capability(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn resource_missing(message: impl Into<String>, step: impl Into<String>) -> Self {
        Self::ResourceMissing {
            message: message.into(),
            step: step.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    pub fn capability(message: impl Into<String>) -> Self {
        Self::Capability(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Resolution(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ResourceMissing { .. } => StatusCode::CONFLICT,
            AppError::Render(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Capability(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Infra(_) | AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "configuration_error",
            AppError::Resolution(_) => "resolution_error",
            AppError::Validation(_) => "validation_error",
            AppError::ResourceMissing { .. } => "resource_missing",
            AppError::Render(_) => "render_error",
            AppError::Capability(_) => "capability_disabled",
            AppError::NotFound(_) => "not_found",
            AppError::Infra(_) | AppError::Unexpected(_) => "internal_error",
        }
    }

    /// Message safe to show to the operator. Infrastructure details stay in logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Infra(_) | AppError::Unexpected(_) => "Unexpected error occurred".to_string(),
            other => other.to_string(),
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            AppError::ResourceMissing { step, .. } => Some(format!("Run {step} and retry")),
            AppError::Capability(_) => Some("Enable the feature in the preferences file".into()),
            _ => None,
        }
    }
}

impl From<DomainError> for AppError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation { message } => AppError::Validation(message),
            DomainError::Invariant { message } => AppError::Unexpected(message),
        }
    }
}

impl From<FinalizeError> for AppError {
    fn from(error: FinalizeError) -> Self {
        AppError::Resolution(error.to_string())
    }
}

impl From<CollaboratorError> for AppError {
    fn from(error: CollaboratorError) -> Self {
        match error {
            CollaboratorError::Configuration(message) => AppError::Configuration(message),
            CollaboratorError::Resolution(message) => AppError::Resolution(message),
            CollaboratorError::MissingResource { message, step } => {
                AppError::ResourceMissing { message, step }
            }
            CollaboratorError::Render(message) => AppError::Render(message),
            CollaboratorError::Unavailable(message) => AppError::Unexpected(message),
            CollaboratorError::Infra(error) => AppError::Infra(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_statuses() {
        let cases = [
            (AppError::configuration("x"), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::resolution("x"), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::validation("x"), StatusCode::BAD_REQUEST),
            (AppError::resource_missing("x", "sync"), StatusCode::CONFLICT),
            (AppError::render("x"), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::capability("x"), StatusCode::FORBIDDEN),
            (AppError::not_found("x"), StatusCode::NOT_FOUND),
            (AppError::unexpected("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.status_code(), status, "{error:?}");
        }
    }

    #[test]
    fn resource_missing_names_the_step() {
        let error = AppError::resource_missing("Episode source image is missing", "sync");
        assert_eq!(
            error.to_string(),
            "Episode source image is missing; run sync first"
        );
        assert_eq!(error.hint().as_deref(), Some("Run sync and retry"));
    }

    #[test]
    fn infra_details_are_not_public() {
        let error = AppError::from(InfraError::configuration("secret path /x"));
        assert_eq!(error.public_message(), "Unexpected error occurred");
    }

    #[test]
    fn domain_validation_stays_validation() {
        let error = AppError::from(DomainError::validation("needs a year"));
        assert!(matches!(error, AppError::Validation(message) if message == "needs a year"));
    }
}
