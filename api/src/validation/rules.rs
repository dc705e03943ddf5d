//! Declarative field rules and the per-endpoint rule sets built from them.
//!
//! A [`RuleSet`] is built once and then only read. Evaluating it is a pure
//! function of the payload: every rule runs, and every broken constraint
//! becomes its own [`Violation`].

use serde_json::{Map, Value};

use super::extractors::{ValidationBuilder, Violation};
use super::validators::{
    validate_email, validate_item_lengths, validate_max_items, validate_max_length,
    validate_min_length, validate_non_empty_list, validate_range, validate_required,
};

/// JSON type a field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Integer,
    Boolean,
    TextList,
    Identifier,
    IdentifierList,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::Text | FieldKind::Identifier => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Integer => value.as_i64().is_some(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::TextList | FieldKind::IdentifierList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        }
    }

    fn type_message(self) -> &'static str {
        match self {
            FieldKind::Text => "must be a string",
            FieldKind::Number => "must be a number",
            FieldKind::Integer => "must be an integer",
            FieldKind::Boolean => "must be a boolean",
            FieldKind::TextList => "must be an array of strings",
            FieldKind::Identifier => "must be an identifier string",
            FieldKind::IdentifierList => "must be an array of identifier strings",
        }
    }
}

/// A constraint checked once the value has the right type.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    MinLength(usize),
    MaxLength(usize),
    NonEmpty,
    MaxItems(usize),
    ItemMaxLength(usize),
    Range { min: i64, max: i64 },
    Email,
}

impl Bound {
    fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Bound::MinLength(min) => value
                .as_str()
                .map_or(Ok(()), |s| validate_min_length(s, *min)),
            Bound::MaxLength(max) => value
                .as_str()
                .map_or(Ok(()), |s| validate_max_length(s, *max)),
            Bound::NonEmpty => match value {
                Value::Array(items) => validate_non_empty_list(items.len()),
                Value::String(s) if s.trim().is_empty() => Err("cannot be empty".to_string()),
                _ => Ok(()),
            },
            Bound::MaxItems(max) => value
                .as_array()
                .map_or(Ok(()), |items| validate_max_items(items.len(), *max)),
            Bound::ItemMaxLength(max) => value.as_array().map_or(Ok(()), |items| {
                let items: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                validate_item_lengths(&items, *max)
            }),
            Bound::Range { min, max } => value
                .as_f64()
                .map_or(Ok(()), |n| validate_range(n, *min, *max)),
            Bound::Email => value.as_str().map_or(Ok(()), validate_email),
        }
    }
}

/// Constraints on one field of a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    field: &'static str,
    kind: FieldKind,
    required: bool,
    bounds: Vec<Bound>,
}

impl FieldRule {
    pub fn required(field: &'static str, kind: FieldKind) -> Self {
        Self {
            field,
            kind,
            required: true,
            bounds: Vec::new(),
        }
    }

    pub fn optional(field: &'static str, kind: FieldKind) -> Self {
        Self {
            field,
            kind,
            required: false,
            bounds: Vec::new(),
        }
    }

    pub fn bound(mut self, bound: Bound) -> Self {
        self.bounds.push(bound);
        self
    }

    pub fn min_length(self, min: usize) -> Self {
        self.bound(Bound::MinLength(min))
    }

    pub fn max_length(self, max: usize) -> Self {
        self.bound(Bound::MaxLength(max))
    }

    pub fn non_empty(self) -> Self {
        self.bound(Bound::NonEmpty)
    }

    pub fn max_items(self, max: usize) -> Self {
        self.bound(Bound::MaxItems(max))
    }

    pub fn item_max_length(self, max: usize) -> Self {
        self.bound(Bound::ItemMaxLength(max))
    }

    pub fn range(self, min: i64, max: i64) -> Self {
        self.bound(Bound::Range { min, max })
    }

    pub fn email(self) -> Self {
        self.bound(Bound::Email)
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    fn evaluate(&self, payload: &Map<String, Value>, builder: &mut ValidationBuilder) {
        let value = match payload.get(self.field) {
            None | Some(Value::Null) => {
                if self.required {
                    builder.add_error(self.field, format!("{} is required", self.field));
                }
                return;
            }
            Some(value) => value,
        };

        if self.required {
            if let Some(text) = value.as_str() {
                if let Err(message) = validate_required(text, self.field) {
                    builder.add_error(self.field, message);
                    return;
                }
            }
        }

        if !self.kind.matches(value) {
            builder.add_error(self.field, self.kind.type_message());
            return;
        }

        for bound in &self.bounds {
            builder.check(self.field, || bound.check(value));
        }
    }
}

/// What to do with payload keys no rule declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownFields {
    /// Leave them for the handler to ignore.
    Allow,
    /// Report each one as a violation; the rule fields are the allow-list.
    Reject,
}

/// The complete set of field constraints for one endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    name: &'static str,
    rules: Vec<FieldRule>,
    unknown: UnknownFields,
}

impl RuleSet {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            rules: Vec::new(),
            unknown: UnknownFields::Allow,
        }
    }

    pub fn field(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn reject_unknown(mut self) -> Self {
        self.unknown = UnknownFields::Reject;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn unknown_fields(&self) -> UnknownFields {
        self.unknown
    }

    /// Check `payload` against every rule and collect all violations in
    /// rule order, followed by any undeclared fields.
    pub fn evaluate(&self, payload: &Map<String, Value>) -> Vec<Violation> {
        let mut builder = ValidationBuilder::new();

        for rule in &self.rules {
            rule.evaluate(payload, &mut builder);
        }

        if self.unknown == UnknownFields::Reject {
            for key in payload.keys() {
                builder.check_condition(
                    !self.rules.iter().any(|rule| rule.field == key),
                    key.as_str(),
                    "is not an allowed field",
                );
            }
        }

        builder.into_violations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn sample() -> RuleSet {
        RuleSet::new("sample")
            .field(
                FieldRule::required("name", FieldKind::Text)
                    .min_length(3)
                    .max_length(5),
            )
            .field(FieldRule::required("items", FieldKind::TextList).non_empty())
            .field(FieldRule::optional("count", FieldKind::Integer).range(1, 10))
    }

    #[test]
    fn test_missing_required_field_reported_once() {
        let violations = sample().evaluate(&object(json!({ "items": ["a"] })));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "name");
        assert_eq!(violations[0].message, "name is required");
    }

    #[test]
    fn test_null_counts_as_missing() {
        let violations = sample().evaluate(&object(json!({ "name": null, "items": ["a"] })));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "name is required");
    }

    #[test]
    fn test_wrong_type_skips_bounds() {
        let violations = sample().evaluate(&object(json!({ "name": 42, "items": "a" })));
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].message, "must be a string");
        assert_eq!(violations[1].message, "must be an array of strings");
    }

    #[test]
    fn test_every_broken_rule_is_reported() {
        let violations = sample().evaluate(&object(json!({
            "name": "ab",
            "items": [],
            "count": 11
        })));
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "items", "count"]);
    }

    #[test]
    fn test_multiple_violations_on_one_field() {
        let rules = RuleSet::new("multi").field(
            FieldRule::required("email", FieldKind::Text)
                .max_length(5)
                .email(),
        );
        let violations = rules.evaluate(&object(json!({ "email": "not-an-email" })));
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.field == "email"));
    }

    #[test]
    fn test_optional_absent_field_is_skipped() {
        let violations = sample().evaluate(&object(json!({ "name": "abc", "items": ["x"] })));
        assert!(violations.is_empty());
    }

    #[test]
    fn test_integer_kind_rejects_fractions() {
        let violations = sample().evaluate(&object(json!({
            "name": "abc",
            "items": ["x"],
            "count": 2.5
        })));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "must be an integer");
    }

    #[test]
    fn test_unknown_fields_allowed_by_default() {
        let violations = sample().evaluate(&object(json!({
            "name": "abc",
            "items": ["x"],
            "extra": true
        })));
        assert!(violations.is_empty());
    }

    #[test]
    fn test_reject_unknown_lists_each_field() {
        let rules = sample().reject_unknown();
        let violations = rules.evaluate(&object(json!({
            "name": "abc",
            "items": ["x"],
            "password": "x",
            "role": "admin"
        })));
        assert_eq!(violations.len(), 2);
        assert!(violations
            .iter()
            .all(|v| v.message == "is not an allowed field"));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let payload = object(json!({ "name": "", "items": [], "count": "x" }));
        assert_eq!(sample().evaluate(&payload), sample().evaluate(&payload));
    }
}
