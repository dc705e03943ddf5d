//! Error normalization.
//!
//! [`classify`] and [`reject`] are the pure mappings from a failure to the
//! client-facing [`ApiError`]. [`ErrorNormalizer`] wraps them with the
//! diagnostic side channel: the original failure goes to an injected
//! [`ErrorReporter`] before the envelope is handed back.

use std::fmt;
use std::sync::Arc;

use axum::extract::rejection::{PathRejection, QueryRejection};
use shared::StoreError;

use crate::error::{ApiError, ErrorCategory};
use crate::metrics;
use crate::validation::Violation;

/// The failure as it was before normalization.
#[derive(Debug, Clone, Copy)]
pub enum ReportedError<'a> {
    Violations(&'a [Violation]),
    Store(&'a StoreError),
    /// Request parts axum could not extract, or failures outside storage.
    Message(&'a str),
}

/// Receives every failure the normalizer maps.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, context: &str, category: ErrorCategory, error: ReportedError<'_>);
}

/// Production reporter: structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, context: &str, category: ErrorCategory, error: ReportedError<'_>) {
        match error {
            ReportedError::Violations(violations) => {
                tracing::info!(
                    endpoint = context,
                    category = category.as_str(),
                    violations = ?violations,
                    "request rejected by validation"
                );
            }
            ReportedError::Store(err) if category == ErrorCategory::ServerError => {
                tracing::error!(
                    operation = context,
                    kind = err.kind(),
                    error = %err,
                    "storage operation failed"
                );
            }
            ReportedError::Store(err) => {
                tracing::warn!(
                    operation = context,
                    kind = err.kind(),
                    category = category.as_str(),
                    error = %err,
                    "storage rejected request"
                );
            }
            ReportedError::Message(message) if category == ErrorCategory::ServerError => {
                tracing::error!(operation = context, error = message, "request failed");
            }
            ReportedError::Message(message) => {
                tracing::warn!(
                    operation = context,
                    category = category.as_str(),
                    error = message,
                    "request rejected"
                );
            }
        }
    }
}

/// Map a storage failure to its envelope. Total over every variant.
pub fn classify(err: &StoreError) -> ApiError {
    match err {
        StoreError::Validation(message) => ApiError::validation_message(message.clone()),
        StoreError::Reference(message) => ApiError::invalid_reference(message.clone()),
        StoreError::Other(message) => ApiError::internal(message.clone()),
    }
}

/// Map a collected violation list to its envelope.
pub fn reject(violations: Vec<Violation>) -> ApiError {
    ApiError::validation(violations)
}

#[derive(Clone)]
pub struct ErrorNormalizer {
    reporter: Arc<dyn ErrorReporter>,
}

impl ErrorNormalizer {
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { reporter }
    }

    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingReporter))
    }

    /// Normalize a failure raised while handling `operation`.
    pub fn store(&self, operation: &str, err: StoreError) -> ApiError {
        self.record(operation, classify(&err), ReportedError::Store(&err))
    }

    /// Normalize a path that did not extract. Every path parameter is an
    /// identifier, so this is an invalid reference.
    pub fn path(&self, operation: &str, rejection: PathRejection) -> ApiError {
        let message = rejection.body_text();
        self.record(
            operation,
            ApiError::invalid_reference(message.clone()),
            ReportedError::Message(&message),
        )
    }

    /// Normalize a query string that did not deserialize.
    pub fn query(&self, endpoint: &str, rejection: QueryRejection) -> ApiError {
        self.reject(endpoint, vec![Violation::new("query", rejection.body_text())])
    }

    /// Normalize a failure that happened outside storage.
    pub fn internal(&self, operation: &str, err: impl fmt::Display) -> ApiError {
        let message = err.to_string();
        self.record(
            operation,
            ApiError::internal(message.clone()),
            ReportedError::Message(&message),
        )
    }

    fn record(&self, operation: &str, api_error: ApiError, error: ReportedError<'_>) -> ApiError {
        self.reporter.report(operation, api_error.category(), error);
        metrics::NORMALIZED_ERRORS
            .with_label_values(&[api_error.category().as_str()])
            .inc();
        api_error
    }

    /// Normalize the violations that stopped a payload for `endpoint`.
    pub fn reject(&self, endpoint: &str, violations: Vec<Violation>) -> ApiError {
        self.reporter.report(
            endpoint,
            ErrorCategory::ValidationError,
            ReportedError::Violations(&violations),
        );
        metrics::VALIDATION_REJECTIONS
            .with_label_values(&[endpoint])
            .inc();
        reject(violations)
    }
}

impl Default for ErrorNormalizer {
    fn default() -> Self {
        Self::tracing()
    }
}

impl fmt::Debug for ErrorNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorNormalizer").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorDetails;
    use axum::http::StatusCode;
    use std::sync::Mutex;

    /// Reporter that remembers what it was given.
    #[derive(Default)]
    pub(crate) struct RecordingReporter {
        pub(crate) entries: Mutex<Vec<(String, ErrorCategory, String)>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, context: &str, category: ErrorCategory, error: ReportedError<'_>) {
            let rendered = match error {
                ReportedError::Violations(v) => format!("{} violations", v.len()),
                ReportedError::Store(err) => err.to_string(),
                ReportedError::Message(message) => message.to_string(),
            };
            self.entries
                .lock()
                .unwrap()
                .push((context.to_string(), category, rendered));
        }
    }

    #[test]
    fn test_storage_validation_maps_to_400() {
        let err = classify(&StoreError::validation("rating must be between 1 and 5"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.envelope().error, "Validation Error");
        assert_eq!(
            err.details(),
            &ErrorDetails::Message("rating must be between 1 and 5".to_string())
        );
    }

    #[test]
    fn test_reference_maps_to_invalid_id() {
        let err = classify(&StoreError::malformed_id("_id", "abc"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.envelope().error, "Invalid ID");
    }

    #[test]
    fn test_other_maps_to_500() {
        let err = classify(&StoreError::other("connection reset"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.envelope().error, "Internal Server Error");
        assert_eq!(
            err.details(),
            &ErrorDetails::Message("connection reset".to_string())
        );
    }

    #[test]
    fn test_violations_stay_itemized() {
        let violations = vec![
            Violation::new("title", "title is required"),
            Violation::new("ingredients", "must contain at least one item"),
        ];
        let err = reject(violations.clone());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.details(), &ErrorDetails::Violations(violations));
    }

    #[test]
    fn test_same_failure_same_envelope() {
        let first = serde_json::to_vec(&classify(&StoreError::other("x")).envelope()).unwrap();
        let second = serde_json::to_vec(&classify(&StoreError::other("x")).envelope()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalizer_reports_before_returning() {
        let reporter = Arc::new(RecordingReporter::default());
        let normalizer = ErrorNormalizer::new(reporter.clone());

        let err = normalizer.store("get_recipe", StoreError::reference("bad id"));
        assert_eq!(err.category(), ErrorCategory::InvalidReference);

        normalizer.reject("create_recipe", vec![Violation::new("title", "title is required")]);

        let entries = reporter.entries.lock().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            (
                "get_recipe".to_string(),
                ErrorCategory::InvalidReference,
                "bad id".to_string()
            )
        );
        assert_eq!(entries[1].0, "create_recipe");
        assert_eq!(entries[1].1, ErrorCategory::ValidationError);
    }

    #[test]
    fn test_internal_failure_is_reported_as_server_error() {
        let reporter = Arc::new(RecordingReporter::default());
        let normalizer = ErrorNormalizer::new(reporter.clone());

        let err = normalizer.internal("create_user", "salt generation failed");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.details(),
            &ErrorDetails::Message("salt generation failed".to_string())
        );

        let entries = reporter.entries.lock().unwrap();
        assert_eq!(
            entries[0],
            (
                "create_user".to_string(),
                ErrorCategory::ServerError,
                "salt generation failed".to_string()
            )
        );
    }
}
