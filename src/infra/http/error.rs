//! Translation of application failures into JSON error responses.

use std::any::Any;

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tcm_webui_api_types::{ErrorBody, ErrorMessage};

use crate::application::error::{AppError, ErrorReport};

const SOURCE: &str = "infra::http";

/// An [`AppError`] tagged with the handler that raised it.
#[derive(Debug)]
pub struct ApiError {
    source: &'static str,
    error: AppError,
}

impl ApiError {
    pub fn new(source: &'static str, error: impl Into<AppError>) -> Self {
        Self {
            source,
            error: error.into(),
        }
    }

    pub fn from_json_rejection(source: &'static str, rejection: JsonRejection) -> Self {
        Self::new(
            source,
            AppError::validation(format!("Invalid JSON body: {}", rejection.body_text())),
        )
    }

    pub fn from_query_rejection(source: &'static str, rejection: QueryRejection) -> Self {
        Self::new(
            source,
            AppError::validation(format!("Invalid query string: {}", rejection.body_text())),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let body = ErrorBody {
            error: ErrorMessage {
                code: self.error.code().to_string(),
                message: self.error.public_message(),
                hint: self.error.hint(),
            },
        };
        let mut response = (status, Json(body)).into_response();
        ErrorReport::from_error(self.source, status, &self.error).attach(&mut response);
        response
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError::new(SOURCE, self).into_response()
    }
}

/// Response for a handler that panicked; the panic payload is logged, never sent.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    };

    let error = AppError::unexpected(detail.clone());
    let status = error.status_code();
    let body = ErrorBody {
        error: ErrorMessage {
            code: error.code().to_string(),
            message: error.public_message(),
            hint: None,
        },
    };
    let mut response = (status, Json(body)).into_response();
    ErrorReport::from_message("infra::http::panic", StatusCode::INTERNAL_SERVER_ERROR, detail)
        .attach(&mut response);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_attached_to_error_responses() {
        let response = ApiError::new("test", AppError::validation("bad input")).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.source, "test");
        assert!(report.messages[0].contains("bad input"));
    }

    #[test]
    fn panic_payload_is_kept_out_of_the_body() {
        let response = panic_response(Box::new("boom"));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.messages, vec!["boom".to_string()]);
    }
}
