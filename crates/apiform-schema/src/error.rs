//! # Error Types
//!
//! Registration-time and rendering errors. Per-request validation failures
//! are not errors in this sense; they are returned as
//! [`ValidationViolations`](crate::ValidationViolations).

use thiserror::Error;

/// A schema declaration that breaks a structural invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A constraint was declared on a field whose type cannot carry it.
    #[error("field '{field}': constraint '{constraint}' is not valid on {value_type} fields")]
    ConstraintTypeMismatch {
        /// Field name.
        field: String,
        /// Constraint keyword, e.g. `maxLength`.
        constraint: &'static str,
        /// Declared value type of the field.
        value_type: &'static str,
    },

    /// Lower bound exceeds upper bound.
    #[error("field '{field}': {lower} {lower_value} exceeds {upper} {upper_value}")]
    InvertedBounds {
        /// Field name.
        field: String,
        /// Lower-bound keyword.
        lower: &'static str,
        /// Lower-bound value.
        lower_value: i64,
        /// Upper-bound keyword.
        upper: &'static str,
        /// Upper-bound value.
        upper_value: i64,
    },

    /// Field name declared twice in the same operation's inputs or outputs.
    #[error("field '{field}' is declared more than once (again in {source_name})")]
    DuplicateField {
        /// Field name.
        field: String,
        /// Source the duplicate appeared in.
        source_name: &'static str,
    },

    /// A path template could not be parsed.
    #[error("invalid path template '{template}': {reason}")]
    InvalidPath {
        /// The offending template.
        template: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A `{placeholder}` has no path field, or a path field has no placeholder.
    #[error("path parameter '{name}' {reason}")]
    PathParameterMismatch {
        /// Placeholder or field name.
        name: String,
        /// Which side is missing.
        reason: &'static str,
    },

    /// Output fields describe the response body only.
    #[error("output field '{field}' must use the body source")]
    OutputNotInBody {
        /// Field name.
        field: String,
    },

    /// Success status outside 2xx.
    #[error("default status {0} is not a 2xx status")]
    InvalidDefaultStatus(u16),
}

/// Error raised while assembling the operation registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The operation ID or the method and path pair is already registered.
    #[error("duplicate operation '{operation_id}': {reason}")]
    DuplicateOperation {
        /// Operation ID of the rejected registration.
        operation_id: String,
        /// What collided.
        reason: String,
    },

    /// The operation schema is structurally invalid.
    #[error("invalid schema for operation '{operation_id}': {source}")]
    InvalidSchema {
        /// Operation ID of the rejected registration.
        operation_id: String,
        /// Underlying schema error.
        #[source]
        source: SchemaError,
    },
}

/// Error serializing an API description document.
#[derive(Error, Debug)]
pub enum DescribeError {
    /// JSON rendering failed.
    #[error("json rendering failed: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML rendering failed.
    #[error("yaml rendering failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_mismatch_message_names_field_and_keyword() {
        let err = SchemaError::ConstraintTypeMismatch {
            field: "rating".into(),
            constraint: "maxLength",
            value_type: "integer",
        };
        let msg = err.to_string();
        assert!(msg.contains("rating"));
        assert!(msg.contains("maxLength"));
        assert!(msg.contains("integer"));
    }

    #[test]
    fn invalid_schema_keeps_source() {
        let err = RegistryError::InvalidSchema {
            operation_id: "post-review".into(),
            source: SchemaError::InvalidDefaultStatus(302),
        };
        assert!(err.to_string().contains("post-review"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
