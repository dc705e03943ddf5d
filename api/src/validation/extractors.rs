//! Custom Axum extractors for validated input
//!
//! `ValidatedJson<T>` is a drop-in replacement for `Json<T>` that runs the
//! request body through the endpoint's rule set before the handler sees it.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRef, FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use super::gate::{Admission, Gate};
use super::rules::RuleSet;
use crate::error::ApiError;
use crate::normalizer::ErrorNormalizer;

/// One broken constraint, tied to a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Request types that are checked against a static rule set.
///
/// The rule set sees the raw JSON object; the typed value is only built
/// after the payload has been admitted.
pub trait Validatable: DeserializeOwned {
    fn rule_set() -> &'static RuleSet;
}

/// JSON extractor that gates the body through `T::rule_set()`.
///
/// 1. Parse the body as a JSON value
/// 2. Evaluate the rule set; any violation rejects with a 400
/// 3. Deserialize the untouched payload into `T`
///
/// ```ignore
/// pub async fn create_recipe(
///     State(state): State<AppState>,
///     ValidatedJson(req): ValidatedJson<CreateRecipeRequest>,
/// ) -> ApiResult<impl IntoResponse> {
///     // req passed every rule
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: Validatable + Send,
    S: Send + Sync,
    ErrorNormalizer: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let normalizer = ErrorNormalizer::from_ref(state);
        let rules = T::rule_set();

        let Json(payload) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|err| {
                normalizer.reject(rules.name(), vec![Violation::new("body", rejection_message(err))])
            })?;

        match Gate::new(rules).admit(payload) {
            Admission::Rejected(violations) => Err(normalizer.reject(rules.name(), violations)),
            Admission::Forwarded(payload) => serde_json::from_value(payload)
                .map(ValidatedJson)
                .map_err(|err| {
                    normalizer.reject(
                        rules.name(),
                        vec![Violation::new("body", format!("Invalid JSON data: {}", err))],
                    )
                }),
        }
    }
}

fn rejection_message(err: JsonRejection) -> String {
    match err {
        JsonRejection::JsonDataError(e) => format!("Invalid JSON data: {}", e.body_text()),
        JsonRejection::JsonSyntaxError(e) => format!("JSON syntax error: {}", e.body_text()),
        JsonRejection::MissingJsonContentType(_) => {
            "Content-Type must be application/json".to_string()
        }
        JsonRejection::BytesRejection(_) => "Failed to read request body".to_string(),
        _ => "Invalid JSON payload".to_string(),
    }
}

impl<T> std::ops::Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> std::ops::DerefMut for ValidatedJson<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Builder for accumulating violations
#[derive(Debug, Default)]
pub struct ValidationBuilder {
    errors: Vec<Violation>,
}

impl ValidationBuilder {
    pub fn new() -> Self {
        Self { errors: vec![] }
    }

    /// Add an error if the result is Err
    pub fn check<F>(&mut self, field: &str, validator: F) -> &mut Self
    where
        F: FnOnce() -> Result<(), String>,
    {
        if let Err(message) = validator() {
            self.errors.push(Violation::new(field, message));
        }
        self
    }

    /// Add an error directly
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors.push(Violation::new(field, message));
        self
    }

    /// Add error if condition is true
    pub fn check_condition(
        &mut self,
        condition: bool,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> &mut Self {
        if condition {
            self.errors.push(Violation::new(field, message));
        }
        self
    }

    /// Finish building and return Result
    pub fn build(self) -> Result<(), Vec<Violation>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation() {
        let violation = Violation::new("title", "title is required");
        assert_eq!(violation.field, "title");
        assert_eq!(violation.message, "title is required");
    }

    #[test]
    fn test_validation_builder() {
        let mut builder = ValidationBuilder::new();

        builder
            .check("title", || Err("title is required".to_string()))
            .check("description", || Ok(()))
            .check_condition(true, "ingredients", "must contain at least one item");

        assert!(builder.has_errors());
        assert_eq!(builder.error_count(), 2);

        let errors = builder.build().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "title");
        assert_eq!(errors[1].field, "ingredients");
    }

    #[test]
    fn test_empty_builder_builds_ok() {
        assert!(ValidationBuilder::new().build().is_ok());
    }
}
