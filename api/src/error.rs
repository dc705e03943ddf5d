use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::validation::Violation;

/// Failure classes a client can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    ValidationError,
    InvalidReference,
    NotFound,
    MethodNotAllowed,
    RateLimited,
    ServerError,
}

impl ErrorCategory {
    /// Label written to the `error` field of the envelope.
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::ValidationError => "Validation Error",
            ErrorCategory::InvalidReference => "Invalid ID",
            ErrorCategory::NotFound => "Not Found",
            ErrorCategory::MethodNotAllowed => "Method Not Allowed",
            ErrorCategory::RateLimited => "Too Many Requests",
            ErrorCategory::ServerError => "Internal Server Error",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            ErrorCategory::ValidationError | ErrorCategory::InvalidReference => {
                StatusCode::BAD_REQUEST
            }
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCategory::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorCategory::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::ValidationError => "validation",
            ErrorCategory::InvalidReference => "invalid_reference",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::MethodNotAllowed => "method_not_allowed",
            ErrorCategory::RateLimited => "rate_limited",
            ErrorCategory::ServerError => "server",
        }
    }
}

/// Either a single message or the itemized violation list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetails {
    Message(String),
    Violations(Vec<Violation>),
}

/// The only body shape that leaves the API on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub error: &'static str,
    pub details: ErrorDetails,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    category: ErrorCategory,
    details: ErrorDetails,
}

impl ApiError {
    pub fn new(category: ErrorCategory, details: ErrorDetails) -> Self {
        Self { category, details }
    }

    pub fn validation(violations: Vec<Violation>) -> Self {
        Self::new(
            ErrorCategory::ValidationError,
            ErrorDetails::Violations(violations),
        )
    }

    pub fn validation_message(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCategory::ValidationError,
            ErrorDetails::Message(message.into()),
        )
    }

    pub fn invalid_reference(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCategory::InvalidReference,
            ErrorDetails::Message(message.into()),
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::NotFound, ErrorDetails::Message(message.into()))
    }

    pub fn method_not_allowed() -> Self {
        Self::new(
            ErrorCategory::MethodNotAllowed,
            ErrorDetails::Message("Method not allowed for this route".to_string()),
        )
    }

    pub fn rate_limited() -> Self {
        Self::new(
            ErrorCategory::RateLimited,
            ErrorDetails::Message("rate limit exceeded".to_string()),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCategory::ServerError,
            ErrorDetails::Message(message.into()),
        )
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn status(&self) -> StatusCode {
        self.category.status()
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: self.category.label(),
            details: self.details.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Kept out of the body so identical failures serialize identically.
        let correlation_id = Uuid::new_v4().to_string();
        let status = self.status();
        let payload = ErrorEnvelope {
            error: self.category.label(),
            details: self.details,
        };

        let mut response = (status, Json(payload)).into_response();
        if let Ok(value) = HeaderValue::from_str(&correlation_id) {
            response
                .headers_mut()
                .insert(header::HeaderName::from_static("x-correlation-id"), value);
        }
        response
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
