use serde_json::Value;

use super::extractors::Violation;
use super::rules::RuleSet;

/// Run `rules` against a raw request body.
///
/// Returns every violation found. The payload is only read, never rewritten;
/// a body that is not a JSON object cannot be checked field by field and is
/// reported against `body`.
pub fn execute(rules: &RuleSet, payload: &Value) -> Result<(), Vec<Violation>> {
    let Some(object) = payload.as_object() else {
        return Err(vec![Violation::new("body", "must be a JSON object")]);
    };

    let violations = rules.evaluate(object);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::rules::{FieldKind, FieldRule};
    use serde_json::json;

    fn rules() -> RuleSet {
        RuleSet::new("test").field(FieldRule::required("name", FieldKind::Text))
    }

    #[test]
    fn test_non_object_body_is_rejected() {
        for body in [json!([1, 2]), json!("text"), json!(null), json!(3)] {
            let violations = execute(&rules(), &body).unwrap_err();
            assert_eq!(violations, vec![Violation::new("body", "must be a JSON object")]);
        }
    }

    #[test]
    fn test_valid_payload_passes() {
        assert!(execute(&rules(), &json!({ "name": "ok" })).is_ok());
    }

    #[test]
    fn test_invalid_payload_collects_violations() {
        let violations = execute(&rules(), &json!({})).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "name");
    }
}
