//! # Field Schemas
//!
//! A [`FieldSchema`] declares one input or output field: where it is read
//! from, what type it coerces to, and which constraints it must satisfy.
//! Fields are built with consuming setters:
//!
//! ```
//! use apiform_schema::FieldSchema;
//!
//! let author = FieldSchema::string("author")
//!     .required()
//!     .max_length(10)
//!     .description("Author of the review");
//! assert_eq!(author.constraints().max_length, Some(10));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SchemaError;

/// Where a field's raw value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// A `{placeholder}` segment of the path template.
    Path,
    /// A query string parameter.
    Query,
    /// A request header (case-insensitive name).
    Header,
    /// A property of the JSON request or response body.
    Body,
}

impl Source {
    /// Lowercase name used in violation locations and OpenAPI `in`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Boolean,
}

impl ValueType {
    /// JSON Schema type keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraint set attached to a field. All bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    /// Maximum length in Unicode code points. Strings only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Minimum length in Unicode code points. Strings only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Smallest accepted value. Integers only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    /// Largest accepted value. Integers only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
    /// Whether the field must be present.
    pub required: bool,
}

/// Declarative description of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    name: String,
    source: Source,
    value_type: ValueType,
    constraints: Constraints,
    description: Option<String>,
    example: Option<Value>,
}

impl FieldSchema {
    /// Start a field of the given type. Fields default to the body source
    /// and are optional.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            source: Source::Body,
            value_type,
            constraints: Constraints::default(),
            description: None,
            example: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Boolean)
    }

    /// Read the field from a path placeholder. Path fields are always required.
    pub fn in_path(mut self) -> Self {
        self.source = Source::Path;
        self.constraints.required = true;
        self
    }

    pub fn in_query(mut self) -> Self {
        self.source = Source::Query;
        self
    }

    pub fn in_header(mut self) -> Self {
        self.source = Source::Header;
        self
    }

    pub fn in_body(mut self) -> Self {
        self.source = Source::Body;
        self
    }

    pub fn required(mut self) -> Self {
        self.constraints.required = true;
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.constraints.max_length = Some(max);
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.constraints.min_length = Some(min);
        self
    }

    pub fn minimum(mut self, min: i64) -> Self {
        self.constraints.minimum = Some(min);
        self
    }

    pub fn maximum(mut self, max: i64) -> Self {
        self.constraints.maximum = Some(max);
        self
    }

    /// Human-readable documentation shown in the API description.
    pub fn description(mut self, doc: impl Into<String>) -> Self {
        self.description = Some(doc.into());
        self
    }

    /// Example value shown in the API description.
    pub fn example(mut self, example: impl Into<Value>) -> Self {
        self.example = Some(example.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn is_required(&self) -> bool {
        self.constraints.required
    }

    pub fn doc(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn example_value(&self) -> Option<&Value> {
        self.example.as_ref()
    }

    /// `source.name`, the location reported in violations.
    pub fn location(&self) -> String {
        format!("{}.{}", self.source, self.name)
    }

    /// Check that every declared constraint fits the field's type and that
    /// bounds are ordered.
    pub fn check(&self) -> Result<(), SchemaError> {
        let c = &self.constraints;
        let mismatch = |constraint: &'static str| SchemaError::ConstraintTypeMismatch {
            field: self.name.clone(),
            constraint,
            value_type: self.value_type.as_str(),
        };

        if self.value_type != ValueType::String {
            if c.max_length.is_some() {
                return Err(mismatch("maxLength"));
            }
            if c.min_length.is_some() {
                return Err(mismatch("minLength"));
            }
        }
        if self.value_type != ValueType::Integer {
            if c.minimum.is_some() {
                return Err(mismatch("minimum"));
            }
            if c.maximum.is_some() {
                return Err(mismatch("maximum"));
            }
        }

        if let (Some(lo), Some(hi)) = (c.min_length, c.max_length) {
            if lo > hi {
                return Err(SchemaError::InvertedBounds {
                    field: self.name.clone(),
                    lower: "minLength",
                    lower_value: lo as i64,
                    upper: "maxLength",
                    upper_value: hi as i64,
                });
            }
        }
        if let (Some(lo), Some(hi)) = (c.minimum, c.maximum) {
            if lo > hi {
                return Err(SchemaError::InvertedBounds {
                    field: self.name.clone(),
                    lower: "minimum",
                    lower_value: lo,
                    upper: "maximum",
                    upper_value: hi,
                });
            }
        }
        Ok(())
    }
}

/// A coerced, constraint-satisfying field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Optional field not supplied by the request.
    Absent,
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// JSON form; `None` for [`FieldValue::Absent`].
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Self::Absent => None,
            Self::String(s) => Some(Value::String(s.clone())),
            Self::Integer(n) => Some(Value::from(*n)),
            Self::Boolean(b) => Some(Value::Bool(*b)),
        }
    }
}
