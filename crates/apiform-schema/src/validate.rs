//! # Request Validation
//!
//! Checks a transport-neutral [`RawInput`] against an operation's input
//! fields and produces either a [`ValidatedInput`] of typed values or the
//! full list of [`Violation`]s.
//!
//! ## Order of checks
//!
//! Per field: required-presence, then type coercion, then length or range.
//! The first failing check ends that field; other fields are still checked,
//! so a single response can report every problem.
//!
//! ## Coercion
//!
//! Path, query, and header values arrive as text and are parsed into the
//! declared type. Body values must already carry the declared JSON type:
//! `"5"` is not an integer. JSON `null` counts as absent.
//!
//! String lengths are counted in Unicode code points.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::field::{FieldSchema, FieldValue, Source, ValueType};
use crate::operation::{OperationSchema, PathValue};

/// Raw request data after routing and body parsing.
#[derive(Debug, Clone, Default)]
pub struct RawInput {
    /// Values bound from path placeholders.
    pub path: BTreeMap<String, PathValue>,
    /// Query parameters. The first occurrence of a repeated name wins.
    pub query: Vec<(String, String)>,
    /// Headers keyed by lowercase name.
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON body object, if one was sent.
    pub body: Option<Map<String, Value>>,
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path.insert(name.into(), PathValue::Text(value.into()));
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }

    fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// The rule a field broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Constraint {
    Required,
    Type,
    MaxLength,
    MinLength,
    Minimum,
    Maximum,
    AdditionalProperties,
}

impl Constraint {
    /// JSON Schema keyword for the rule.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Type => "type",
            Self::MaxLength => "maxLength",
            Self::MinLength => "minLength",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::AdditionalProperties => "additionalProperties",
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A single constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Field name as declared.
    pub field: String,
    /// `source.field`, e.g. `body.author`.
    pub location: String,
    /// Which rule failed.
    pub constraint: Constraint,
    /// Human-readable detail.
    pub message: String,
}

impl Violation {
    fn new(field: &FieldSchema, constraint: Constraint, message: impl Into<String>) -> Self {
        Self {
            field: field.name().to_string(),
            location: field.location(),
            constraint,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.location, self.constraint, self.message)
    }
}

/// All violations found in one request, in field declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }

    /// First violation reported for `field`, if any.
    pub fn for_field(&self, field: &str) -> Option<&Violation> {
        self.violations.iter().find(|v| v.field == field)
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// Typed input values keyed by field name. Absent optional fields are kept
/// with the [`FieldValue::Absent`] marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedInput {
    values: BTreeMap<String, FieldValue>,
}

impl ValidatedInput {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FieldValue::as_i64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(FieldValue::as_bool)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// JSON object of the present values. Absent fields are omitted.
    pub fn to_json(&self) -> Map<String, Value> {
        self.values
            .iter()
            .filter_map(|(k, v)| v.to_json().map(|json| (k.clone(), json)))
            .collect()
    }

    /// Decode into a handler-side struct. Absent fields are omitted, so they
    /// map onto `Option` or `#[serde(default)]` members.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.to_json()))
    }
}

/// Outcome of [`validate`].
pub type ValidationResult = Result<ValidatedInput, ValidationViolations>;

/// Validate raw request data against every input field of `schema`.
pub fn validate(schema: &OperationSchema, raw: &RawInput) -> ValidationResult {
    let mut values = BTreeMap::new();
    let mut violations = Vec::new();

    for field in schema.inputs() {
        match check_field(field, raw) {
            Ok(value) => {
                values.insert(field.name().to_string(), value);
            }
            Err(violation) => violations.push(violation),
        }
    }

    if let Some(body) = &raw.body {
        for key in body.keys() {
            if !schema.inputs_from(Source::Body).any(|f| f.name() == key) {
                violations.push(Violation {
                    field: key.clone(),
                    location: format!("body.{key}"),
                    constraint: Constraint::AdditionalProperties,
                    message: format!("unexpected property {key}"),
                });
            }
        }
    }

    if violations.is_empty() {
        Ok(ValidatedInput { values })
    } else {
        Err(ValidationViolations { violations })
    }
}

/// Where a field's raw value was found.
enum Extracted<'a> {
    Missing,
    Text(&'a str),
    Json(&'a Value),
    /// Raw bytes that do not decode to text; fails coercion for every type.
    Undecodable,
}

fn extract<'a>(field: &FieldSchema, raw: &'a RawInput) -> Extracted<'a> {
    let found = match field.source() {
        Source::Path => raw.path.get(field.name()).map(|v| match v {
            PathValue::Text(s) => Extracted::Text(s),
            PathValue::Undecodable(_) => Extracted::Undecodable,
        }),
        Source::Query => raw.query_value(field.name()).map(Extracted::Text),
        Source::Header => raw
            .headers
            .get(&field.name().to_ascii_lowercase())
            .map(|s| Extracted::Text(s)),
        Source::Body => raw
            .body
            .as_ref()
            .and_then(|b| b.get(field.name()))
            .filter(|v| !v.is_null())
            .map(Extracted::Json),
    };
    found.unwrap_or(Extracted::Missing)
}

fn check_field(field: &FieldSchema, raw: &RawInput) -> Result<FieldValue, Violation> {
    let value = match extract(field, raw) {
        Extracted::Missing if field.is_required() => {
            return Err(Violation::new(
                field,
                Constraint::Required,
                format!("expected required property {} to be present", field.name()),
            ));
        }
        Extracted::Missing => return Ok(FieldValue::Absent),
        Extracted::Text(text) => coerce_text(field, text)?,
        Extracted::Json(json) => coerce_json(field, json)?,
        Extracted::Undecodable => return Err(type_violation(field)),
    };
    check_bounds(field, &value)?;
    Ok(value)
}

fn type_violation(field: &FieldSchema) -> Violation {
    Violation::new(
        field,
        Constraint::Type,
        format!("expected {}", field.value_type()),
    )
}

fn coerce_text(field: &FieldSchema, text: &str) -> Result<FieldValue, Violation> {
    match field.value_type() {
        ValueType::String => Ok(FieldValue::String(text.to_string())),
        ValueType::Integer => text
            .parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|_| type_violation(field)),
        ValueType::Boolean => text
            .parse::<bool>()
            .map(FieldValue::Boolean)
            .map_err(|_| type_violation(field)),
    }
}

fn coerce_json(field: &FieldSchema, json: &Value) -> Result<FieldValue, Violation> {
    match (field.value_type(), json) {
        (ValueType::String, Value::String(s)) => Ok(FieldValue::String(s.clone())),
        (ValueType::Integer, Value::Number(n)) => n
            .as_i64()
            .map(FieldValue::Integer)
            .ok_or_else(|| type_violation(field)),
        (ValueType::Boolean, Value::Bool(b)) => Ok(FieldValue::Boolean(*b)),
        _ => Err(type_violation(field)),
    }
}

fn check_bounds(field: &FieldSchema, value: &FieldValue) -> Result<(), Violation> {
    let c = field.constraints();
    match value {
        FieldValue::String(s) => {
            let len = s.chars().count();
            if let Some(max) = c.max_length {
                if len > max {
                    return Err(Violation::new(
                        field,
                        Constraint::MaxLength,
                        format!("expected length <= {max}"),
                    ));
                }
            }
            if let Some(min) = c.min_length {
                if len < min {
                    return Err(Violation::new(
                        field,
                        Constraint::MinLength,
                        format!("expected length >= {min}"),
                    ));
                }
            }
        }
        FieldValue::Integer(n) => {
            if let Some(min) = c.minimum {
                if *n < min {
                    return Err(Violation::new(
                        field,
                        Constraint::Minimum,
                        format!("expected number >= {min}"),
                    ));
                }
            }
            if let Some(max) = c.maximum {
                if *n > max {
                    return Err(Violation::new(
                        field,
                        Constraint::Maximum,
                        format!("expected number <= {max}"),
                    ));
                }
            }
        }
        FieldValue::Boolean(_) | FieldValue::Absent => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Method;
    use serde_json::json;

    fn review_schema() -> OperationSchema {
        OperationSchema::new("post-review", Method::Post, "/reviews")
            .input(FieldSchema::string("author").required().max_length(10))
            .input(FieldSchema::integer("rating").required().minimum(1).maximum(5))
            .input(FieldSchema::string("message").max_length(100))
    }

    fn body(value: Value) -> RawInput {
        match value {
            Value::Object(map) => RawInput::new().with_body(map),
            other => panic!("test body must be an object, got {other}"),
        }
    }

    #[test]
    fn valid_body_yields_typed_values() {
        let input = validate(
            &review_schema(),
            &body(json!({"author": "Al", "rating": 5, "message": "great"})),
        )
        .unwrap();
        assert_eq!(input.str("author"), Some("Al"));
        assert_eq!(input.i64("rating"), Some(5));
        assert_eq!(input.str("message"), Some("great"));
    }

    #[test]
    fn optional_field_is_marked_absent() {
        let input = validate(&review_schema(), &body(json!({"author": "Al", "rating": 5}))).unwrap();
        assert_eq!(input.get("message"), Some(&FieldValue::Absent));
        assert!(!input.to_json().contains_key("message"));
    }

    #[test]
    fn null_counts_as_absent() {
        let input = validate(
            &review_schema(),
            &body(json!({"author": "Al", "rating": 2, "message": null})),
        )
        .unwrap();
        assert!(input.get("message").unwrap().is_absent());
    }

    #[test]
    fn missing_required_fields_are_all_reported() {
        let err = validate(&review_schema(), &body(json!({}))).unwrap_err();
        assert_eq!(err.len(), 2);
        assert_eq!(err.for_field("author").unwrap().constraint, Constraint::Required);
        assert_eq!(err.for_field("rating").unwrap().constraint, Constraint::Required);
    }

    #[test]
    fn missing_body_reports_required_fields() {
        let err = validate(&review_schema(), &RawInput::new()).unwrap_err();
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn one_violation_per_field_across_fields() {
        let err = validate(
            &review_schema(),
            &body(json!({"author": "ExceedsTenChars", "rating": 9, "message": 3})),
        )
        .unwrap_err();
        let v = err.violations();
        assert_eq!(v.len(), 3);
        assert_eq!(v[0].field, "author");
        assert_eq!(v[0].constraint, Constraint::MaxLength);
        assert_eq!(v[0].location, "body.author");
        assert_eq!(v[1].constraint, Constraint::Maximum);
        assert_eq!(v[2].constraint, Constraint::Type);
    }

    #[test]
    fn string_encoded_integer_in_body_is_a_type_mismatch() {
        let err = validate(&review_schema(), &body(json!({"author": "Al", "rating": "5"})))
            .unwrap_err();
        assert_eq!(err.for_field("rating").unwrap().constraint, Constraint::Type);
        assert_eq!(err.for_field("rating").unwrap().message, "expected integer");
    }

    #[test]
    fn fractional_number_is_not_an_integer() {
        let err = validate(&review_schema(), &body(json!({"author": "Al", "rating": 2.5})))
            .unwrap_err();
        assert_eq!(err.for_field("rating").unwrap().constraint, Constraint::Type);
    }

    #[test]
    fn length_counts_code_points_not_bytes() {
        // Ten code points, twenty bytes.
        let author = "éééééééééé";
        assert_eq!(author.len(), 20);
        assert!(validate(&review_schema(), &body(json!({"author": author, "rating": 1}))).is_ok());
    }

    #[test]
    fn unknown_body_property_is_rejected() {
        let err = validate(
            &review_schema(),
            &body(json!({"author": "Al", "rating": 1, "stars": 4})),
        )
        .unwrap_err();
        let v = err.for_field("stars").unwrap();
        assert_eq!(v.constraint, Constraint::AdditionalProperties);
        assert_eq!(v.location, "body.stars");
    }

    #[test]
    fn text_sources_coerce_to_declared_type() {
        let schema = OperationSchema::new("list", Method::Get, "/items/{page}")
            .input(FieldSchema::integer("page").in_path().minimum(1))
            .input(FieldSchema::boolean("verbose").in_query())
            .input(FieldSchema::string("X-Trace").in_header().max_length(8));
        let raw = RawInput::new()
            .with_path("page", "3")
            .with_query("verbose", "true")
            .with_query("verbose", "false")
            .with_header("x-trace", "abc");
        let input = validate(&schema, &raw).unwrap();
        assert_eq!(input.i64("page"), Some(3));
        assert_eq!(input.bool("verbose"), Some(true));
        assert_eq!(input.str("X-Trace"), Some("abc"));
    }

    #[test]
    fn unparseable_text_is_a_type_violation() {
        let schema = OperationSchema::new("list", Method::Get, "/items/{page}")
            .input(FieldSchema::integer("page").in_path());
        let err = validate(&schema, &RawInput::new().with_path("page", "two")).unwrap_err();
        assert_eq!(err.for_field("page").unwrap().constraint, Constraint::Type);
        assert_eq!(err.for_field("page").unwrap().location, "path.page");
    }

    #[test]
    fn undecodable_path_value_is_a_type_violation() {
        let schema = OperationSchema::new("greet", Method::Get, "/greeting/{name}")
            .input(FieldSchema::string("name").in_path());
        let mut raw = RawInput::new();
        raw.path
            .insert("name".to_string(), PathValue::Undecodable("%FF".to_string()));
        let err = validate(&schema, &raw).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.for_field("name").unwrap().constraint, Constraint::Type);
        assert_eq!(err.for_field("name").unwrap().message, "expected string");
    }

    #[test]
    fn min_length_is_inclusive() {
        let schema = OperationSchema::new("s", Method::Get, "/s")
            .input(FieldSchema::string("q").in_query().min_length(2));
        assert!(validate(&schema, &RawInput::new().with_query("q", "ab")).is_ok());
        let err = validate(&schema, &RawInput::new().with_query("q", "a")).unwrap_err();
        assert_eq!(err.for_field("q").unwrap().constraint, Constraint::MinLength);
    }

    #[test]
    fn deserializes_into_handler_struct() {
        #[derive(Deserialize)]
        struct Review {
            author: String,
            rating: i64,
            message: Option<String>,
        }
        let input = validate(&review_schema(), &body(json!({"author": "Al", "rating": 4}))).unwrap();
        let review: Review = input.deserialize().unwrap();
        assert_eq!(review.author, "Al");
        assert_eq!(review.rating, 4);
        assert!(review.message.is_none());
    }

    #[test]
    fn violations_display_joins_entries() {
        let err = validate(&review_schema(), &body(json!({}))).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("body.author (required)"));
        assert!(text.contains("; "));
    }
}
