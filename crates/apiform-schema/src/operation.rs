//! # Operation Schemas
//!
//! An [`OperationSchema`] is one (method, path) pair with its ordered input
//! fields, response body shape, and documentation. Path templates use
//! whole-segment `{placeholder}` syntax: `/greeting/{name}`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::field::{FieldSchema, Source};

/// Value bound to a `{placeholder}` segment of a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathValue {
    /// Percent-decoded text.
    Text(String),
    /// Segment whose percent-decoding is not valid UTF-8, kept as sent.
    Undecodable(String),
}

impl PathValue {
    /// Decoded text, if decoding succeeded.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Undecodable(_) => None,
        }
    }
}

impl From<String> for PathValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for PathValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// HTTP method of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unsupported method '{other}'")),
        }
    }
}

/// One segment of a parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Literal(String),
    Param(String),
}

/// A parsed `/a/{b}/c` path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<PathSegment>,
}

impl PathTemplate {
    /// Parse a template. Placeholders must occupy a whole segment and be
    /// unique within the template.
    pub fn parse(template: &str) -> Result<Self, SchemaError> {
        let invalid = |reason: &str| SchemaError::InvalidPath {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let rest = template
            .strip_prefix('/')
            .ok_or_else(|| invalid("must start with '/'"))?;

        let mut segments = Vec::new();
        if !rest.is_empty() {
            for part in rest.split('/') {
                if part.is_empty() {
                    return Err(invalid("empty path segment"));
                }
                if let Some(inner) = part.strip_prefix('{') {
                    let name = inner
                        .strip_suffix('}')
                        .ok_or_else(|| invalid("unterminated placeholder"))?;
                    if name.is_empty() || name.contains(['{', '}']) {
                        return Err(invalid("malformed placeholder"));
                    }
                    if segments
                        .iter()
                        .any(|s| matches!(s, PathSegment::Param(p) if p == name))
                    {
                        return Err(invalid("placeholder used twice"));
                    }
                    segments.push(PathSegment::Param(name.to_string()));
                } else if part.contains(['{', '}']) {
                    return Err(invalid("placeholders must span a whole segment"));
                } else {
                    segments.push(PathSegment::Literal(part.to_string()));
                }
            }
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Placeholder names in template order.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            PathSegment::Param(p) => Some(p.as_str()),
            PathSegment::Literal(_) => None,
        })
    }

    /// Template with placeholder names erased, so `/a/{x}` and `/a/{y}`
    /// compare equal.
    pub fn shape(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            out.push('/');
            match seg {
                PathSegment::Literal(l) => out.push_str(l),
                PathSegment::Param(_) => out.push_str("{}"),
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }

    pub(crate) fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, PathSegment::Literal(_)))
            .count()
    }

    /// Match a concrete request path. Placeholder values are percent-decoded.
    /// A segment that is not valid UTF-8 after decoding still matches and is
    /// bound as [`PathValue::Undecodable`], leaving the rejection to validation.
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, PathValue>> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/').collect()
        };
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut bound = BTreeMap::new();
        for (seg, part) in self.segments.iter().zip(parts) {
            match seg {
                PathSegment::Literal(l) => {
                    if l != part {
                        return None;
                    }
                }
                PathSegment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    let value = match percent_decode_str(part).decode_utf8() {
                        Ok(text) => PathValue::Text(text.into_owned()),
                        Err(_) => PathValue::Undecodable(part.to_string()),
                    };
                    bound.insert(name.clone(), value);
                }
            }
        }
        Some(bound)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Declarative description of one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSchema {
    operation_id: String,
    method: Method,
    path: String,
    summary: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
    inputs: Vec<FieldSchema>,
    outputs: Vec<FieldSchema>,
    default_status: u16,
}

impl OperationSchema {
    pub fn new(operation_id: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            method,
            path: path.into(),
            summary: None,
            description: None,
            tags: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            default_status: 200,
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Append an input field. Validation visits inputs in this order.
    pub fn input(mut self, field: FieldSchema) -> Self {
        self.inputs.push(field);
        self
    }

    /// Append a response body field.
    pub fn output(mut self, field: FieldSchema) -> Self {
        self.outputs.push(field);
        self
    }

    /// Status returned on success. Defaults to 200.
    pub fn default_status(mut self, status: u16) -> Self {
        self.default_status = status;
        self
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn summary_text(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn inputs(&self) -> &[FieldSchema] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[FieldSchema] {
        &self.outputs
    }

    pub fn status(&self) -> u16 {
        self.default_status
    }

    /// Input fields read from the given source, in declaration order.
    pub fn inputs_from(&self, source: Source) -> impl Iterator<Item = &FieldSchema> {
        self.inputs.iter().filter(move |f| f.source() == source)
    }

    pub fn has_body_input(&self) -> bool {
        self.inputs.iter().any(|f| f.source() == Source::Body)
    }

    /// Check every structural invariant and return the parsed path template.
    pub fn check(&self) -> Result<PathTemplate, SchemaError> {
        let template = PathTemplate::parse(&self.path)?;

        if !(200..300).contains(&self.default_status) {
            return Err(SchemaError::InvalidDefaultStatus(self.default_status));
        }

        for (i, field) in self.inputs.iter().enumerate() {
            field.check()?;
            let duplicate = self.inputs[..i]
                .iter()
                .any(|f| same_name(f, field));
            if duplicate {
                return Err(SchemaError::DuplicateField {
                    field: field.name().to_string(),
                    source_name: field.source().as_str(),
                });
            }
        }

        for (i, field) in self.outputs.iter().enumerate() {
            field.check()?;
            if field.source() != Source::Body {
                return Err(SchemaError::OutputNotInBody {
                    field: field.name().to_string(),
                });
            }
            if self.outputs[..i].iter().any(|f| f.name() == field.name()) {
                return Err(SchemaError::DuplicateField {
                    field: field.name().to_string(),
                    source_name: "output",
                });
            }
        }

        for param in template.params() {
            if !self.inputs_from(Source::Path).any(|f| f.name() == param) {
                return Err(SchemaError::PathParameterMismatch {
                    name: param.to_string(),
                    reason: "has no matching path field",
                });
            }
        }
        for field in self.inputs_from(Source::Path) {
            if !template.params().any(|p| p == field.name()) {
                return Err(SchemaError::PathParameterMismatch {
                    name: field.name().to_string(),
                    reason: "does not appear in the path template",
                });
            }
        }

        Ok(template)
    }
}

/// Header names compare case-insensitively; everything else exactly.
/// Input names share one namespace across sources, since validated values
/// are keyed by bare name. Header names compare case-insensitively.
fn same_name(a: &FieldSchema, b: &FieldSchema) -> bool {
    if a.source() == Source::Header && b.source() == Source::Header {
        a.name().eq_ignore_ascii_case(b.name())
    } else {
        a.name() == b.name()
    }
}
