//! Request pipeline gate.
//!
//! A [`Gate`] is the `Validating` state: it exists until `admit` consumes it
//! and yields one of the two terminal outcomes. Nothing is retried; a
//! rejected payload needs a new request.

use serde_json::Value;

use super::executor::execute;
use super::extractors::Violation;
use super::rules::RuleSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Validating,
    Rejected,
    Forwarded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// The payload exactly as received, for the handler.
    Forwarded(Value),
    /// Every violation found; the handler must not run.
    Rejected(Vec<Violation>),
}

impl Admission {
    pub fn state(&self) -> GateState {
        match self {
            Admission::Forwarded(_) => GateState::Forwarded,
            Admission::Rejected(_) => GateState::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Gate<'a> {
    rules: &'a RuleSet,
}

impl<'a> Gate<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self { rules }
    }

    pub fn state(&self) -> GateState {
        GateState::Validating
    }

    pub fn admit(self, payload: Value) -> Admission {
        match execute(self.rules, &payload) {
            Ok(()) => {
                tracing::debug!(endpoint = self.rules.name(), "payload forwarded");
                Admission::Forwarded(payload)
            }
            Err(violations) => {
                tracing::debug!(
                    endpoint = self.rules.name(),
                    violations = violations.len(),
                    "payload rejected"
                );
                Admission::Rejected(violations)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::schemas::CREATE_RECIPE;
    use serde_json::json;

    #[test]
    fn test_gate_starts_validating() {
        assert_eq!(Gate::new(&CREATE_RECIPE).state(), GateState::Validating);
    }

    #[test]
    fn test_invalid_recipe_is_rejected_with_two_violations() {
        let payload = json!({
            "title": "",
            "description": "valid",
            "ingredients": [],
            "instructions": ["step1"]
        });

        let admission = Gate::new(&CREATE_RECIPE).admit(payload);
        assert_eq!(admission.state(), GateState::Rejected);

        let Admission::Rejected(violations) = admission else {
            panic!("expected rejection");
        };
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "ingredients"]);
    }

    #[test]
    fn test_valid_recipe_is_forwarded_unchanged() {
        let payload = json!({
            "title": "Soup",
            "description": "Tasty",
            "ingredients": ["salt"],
            "instructions": ["boil"]
        });

        let admission = Gate::new(&CREATE_RECIPE).admit(payload.clone());
        assert_eq!(admission.state(), GateState::Forwarded);
        assert_eq!(admission, Admission::Forwarded(payload));
    }

    #[test]
    fn test_forwarded_payload_keeps_unknown_fields() {
        let payload = json!({
            "title": "Soup",
            "description": "Tasty",
            "ingredients": ["salt"],
            "instructions": ["boil"],
            "difficulty": "easy"
        });

        assert_eq!(
            Gate::new(&CREATE_RECIPE).admit(payload.clone()),
            Admission::Forwarded(payload)
        );
    }
}
