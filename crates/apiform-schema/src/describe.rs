//! # API Description
//!
//! Renders a [`Registry`] into an OpenAPI 3.1 document using utoipa's
//! `openapi` model. The same [`FieldSchema`] declarations that drive
//! validation produce the parameter and body schemas here, so the document
//! cannot drift from what the server enforces.
//!
//! Rendering is pure: no I/O, no clock, and utoipa keeps paths and object
//! properties in sorted maps, so repeated calls are byte-identical.

use serde_json::json;
use utoipa::openapi::path::{HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::response::ResponseBuilder;
use utoipa::openapi::schema::{
    ArrayBuilder, KnownFormat, ObjectBuilder, Schema, SchemaFormat, Type,
};
use utoipa::openapi::{
    Content, ContentBuilder, InfoBuilder, OpenApi, OpenApiBuilder, PathItem, Paths, PathsBuilder,
    RefOr, Required,
};

use crate::error::DescribeError;
use crate::field::{FieldSchema, Source, ValueType};
use crate::operation::{Method, OperationSchema};
use crate::registry::Registry;

const JSON: &str = "application/json";

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeOptions {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

impl Default for DescribeOptions {
    fn default() -> Self {
        Self {
            title: "My API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
        }
    }
}

/// A rendered API description.
#[derive(Debug, Clone)]
pub struct ApiDescription {
    document: OpenApi,
}

impl ApiDescription {
    pub fn document(&self) -> &OpenApi {
        &self.document
    }

    pub fn into_document(self) -> OpenApi {
        self.document
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, DescribeError> {
        Ok(serde_json::to_string_pretty(&self.document)?)
    }

    pub fn to_yaml(&self) -> Result<String, DescribeError> {
        Ok(serde_yaml::to_string(&self.document)?)
    }
}

/// Describe every registered operation.
pub fn describe<H>(registry: &Registry<H>, options: &DescribeOptions) -> ApiDescription {
    let mut paths = PathsBuilder::new();
    for op in registry.operations() {
        let schema = op.schema();
        paths = paths.path(
            schema.path(),
            PathItem::new(http_method(schema.method()), operation(schema)),
        );
    }
    let paths: Paths = paths.build();

    let document = OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(options.title.clone())
                .version(options.version.clone())
                .description(options.description.clone()),
        )
        .paths(paths)
        .build();

    ApiDescription { document }
}

fn http_method(method: Method) -> HttpMethod {
    match method {
        Method::Get => HttpMethod::Get,
        Method::Post => HttpMethod::Post,
        Method::Put => HttpMethod::Put,
        Method::Patch => HttpMethod::Patch,
        Method::Delete => HttpMethod::Delete,
    }
}

fn operation(schema: &OperationSchema) -> utoipa::openapi::path::Operation {
    let mut builder = OperationBuilder::new()
        .operation_id(Some(schema.operation_id()))
        .summary(schema.summary_text())
        .description(schema.description_text());

    for tag in schema.tags() {
        builder = builder.tag(tag.as_str());
    }

    for field in schema.inputs().iter().filter(|f| f.source() != Source::Body) {
        builder = builder.parameter(parameter(field));
    }

    if schema.has_body_input() {
        let required = schema.inputs_from(Source::Body).any(FieldSchema::is_required);
        let body_schema = object_schema(schema.inputs_from(Source::Body));
        builder = builder.request_body(Some(
            RequestBodyBuilder::new()
                .content(JSON, json_content(body_schema))
                .required(Some(if required {
                    Required::True
                } else {
                    Required::False
                }))
                .build(),
        ));
    }

    let status = schema.status().to_string();
    let mut success = ResponseBuilder::new().description(reason_phrase(schema.status()));
    if !schema.outputs().is_empty() {
        success = success.content(JSON, json_content(object_schema(schema.outputs().iter())));
    }

    builder
        .response(status, success.build())
        .response(
            "422",
            ResponseBuilder::new()
                .description("Unprocessable Entity")
                .content(JSON, json_content(error_schema()))
                .build(),
        )
        .response(
            "default",
            ResponseBuilder::new()
                .description("Error")
                .content(JSON, json_content(error_schema()))
                .build(),
        )
        .build()
}

fn parameter(field: &FieldSchema) -> utoipa::openapi::path::Parameter {
    let location = match field.source() {
        Source::Path => ParameterIn::Path,
        Source::Query => ParameterIn::Query,
        Source::Header | Source::Body => ParameterIn::Header,
    };
    ParameterBuilder::new()
        .name(field.name())
        .parameter_in(location)
        .required(if field.is_required() {
            Required::True
        } else {
            Required::False
        })
        .description(field.doc())
        .schema(Some(field_schema(field)))
        .build()
}

fn json_content(schema: RefOr<Schema>) -> Content {
    ContentBuilder::new().schema(Some(schema)).build()
}

fn object_schema<'a>(fields: impl Iterator<Item = &'a FieldSchema>) -> RefOr<Schema> {
    let mut builder = ObjectBuilder::new().schema_type(Type::Object);
    for field in fields {
        builder = builder.property(field.name(), field_schema(field));
        if field.is_required() {
            builder = builder.required(field.name());
        }
    }
    object(builder)
}

/// Schema for one field, carrying its constraint metadata.
fn field_schema(field: &FieldSchema) -> RefOr<Schema> {
    let c = field.constraints();
    let ty = match field.value_type() {
        ValueType::String => Type::String,
        ValueType::Integer => Type::Integer,
        ValueType::Boolean => Type::Boolean,
    };
    let mut builder = ObjectBuilder::new()
        .schema_type(ty)
        .description(field.doc())
        .max_length(c.max_length)
        .min_length(c.min_length)
        .minimum(c.minimum)
        .maximum(c.maximum);
    if field.value_type() == ValueType::Integer {
        builder = builder.format(Some(SchemaFormat::KnownFormat(KnownFormat::Int64)));
    }
    if let Some(example) = field.example_value() {
        builder = builder.examples([example.clone()]);
    }
    object(builder)
}

/// Shape of the structured error body returned for failed requests.
fn error_schema() -> RefOr<Schema> {
    let string = |doc: &str| {
        object(
            ObjectBuilder::new()
                .schema_type(Type::String)
                .description(Some(doc)),
        )
    };
    let violation = ObjectBuilder::new()
        .schema_type(Type::Object)
        .property("field", string("Field name"))
        .property("location", string("Where the field was read, e.g. body.author"))
        .property("constraint", string("Violated rule, e.g. maxLength"))
        .property("message", string("Human-readable detail"))
        .required("field")
        .required("location")
        .required("constraint")
        .required("message");
    let details = ArrayBuilder::new()
        .items(object(violation))
        .description(Some("Every constraint violation, present for validation errors"))
        .build();
    let detail = ObjectBuilder::new()
        .schema_type(Type::Object)
        .property("code", string("Machine-readable error code"))
        .property("message", string("Human-readable error message"))
        .property("details", RefOr::T(Schema::Array(details)))
        .required("code")
        .required("message");
    let body = ObjectBuilder::new()
        .schema_type(Type::Object)
        .property("error", object(detail))
        .required("error")
        .examples([json!({
            "error": {
                "code": "VALIDATION_ERROR",
                "message": "validation failed",
                "details": [{
                    "field": "author",
                    "location": "body.author",
                    "constraint": "maxLength",
                    "message": "expected length <= 10"
                }]
            }
        })]);
    object(body)
}

fn object(builder: ObjectBuilder) -> RefOr<Schema> {
    RefOr::T(Schema::Object(builder.build()))
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        _ => "Success",
    }
}
