//! # Request Dispatch
//!
//! The transport-neutral boundary between an HTTP server and the operation
//! registry. [`dispatch`] takes a [`RawRequest`] through
//!
//! ```text
//! Received → Matched → Validating → Valid → Invoking → Responding
//!                                  ↘ Invalid → RespondingError
//! ```
//!
//! and always returns a [`RawResponse`]. Unknown routes, malformed bodies,
//! constraint violations, and handler failures all become structured error
//! responses; none of them escape as panics or abort other requests.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use apiform_schema::{
    validate, FieldSchema, OperationSchema, PathValue, RawInput, Registry, ValidatedInput,
    ValueType,
};

use crate::error::AppError;

/// Failure raised by an operation handler or its collaborators.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// A downstream collaborator (e.g. a review store) failed.
    #[error("downstream failure: {0}")]
    Downstream(String),

    /// Validated input could not be decoded into the handler's input type.
    #[error("failed to decode validated input: {0}")]
    Decode(#[from] serde_json::Error),

    /// The handler returned a body that does not fit the declared output.
    #[error("response does not match the declared output shape: {0}")]
    OutputShape(String),
}

/// Response body produced by a handler, before it is checked against the
/// operation's output fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerOutput {
    body: Map<String, Value>,
}

impl HandlerOutput {
    /// Output for operations without a response body.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(name.into(), value.into());
        self
    }

    /// Build from any struct that serializes to a JSON object.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, HandlerError> {
        let value = serde_json::to_value(value)
            .map_err(|e| HandlerError::OutputShape(format!("failed to serialize output: {e}")))?;
        match value {
            Value::Object(body) => Ok(Self { body }),
            other => Err(HandlerError::OutputShape(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }
}

/// Handler signature stored in the registry.
pub type Handler =
    Arc<dyn Fn(&ValidatedInput) -> Result<HandlerOutput, HandlerError> + Send + Sync>;

/// The registry type served by this crate.
pub type ApiRegistry = Registry<Handler>;

/// Wrap a function or closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&ValidatedInput) -> Result<HandlerOutput, HandlerError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// An HTTP request as seen by the dispatcher.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        }
    }

    /// Attach a JSON body and the matching content type.
    pub fn with_json(mut self, body: &Value) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Bytes::from(body.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// An HTTP response produced by the dispatcher.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    /// Response without a body.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// JSON response. Serialization of our own body types cannot fail in
    /// practice; if it does, the response degrades to a bare 500.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Self {
                    status,
                    headers,
                    body: Bytes::from(bytes),
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize response body");
                Self::empty(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Parse the body as JSON.
    pub fn json_body(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

impl IntoResponse for RawResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}

/// Route, validate, invoke, and respond.
pub fn dispatch(registry: &ApiRegistry, request: RawRequest) -> RawResponse {
    tracing::debug!(method = %request.method, path = request.uri.path(), "dispatching request");
    match try_dispatch(registry, &request) {
        Ok(response) => response,
        Err(err) => err.into_raw_response(),
    }
}

fn try_dispatch(registry: &ApiRegistry, request: &RawRequest) -> Result<RawResponse, AppError> {
    let not_found = || {
        AppError::NotFound(format!(
            "no operation for {} {}",
            request.method,
            request.uri.path()
        ))
    };

    let method = request.method.as_str().parse().map_err(|_| not_found())?;
    let route = registry
        .resolve(method, request.uri.path())
        .ok_or_else(not_found)?;
    let schema = route.operation.schema();

    let raw = raw_input(schema, request, route.path_params)?;
    let input = validate(schema, &raw).map_err(|violations| {
        tracing::warn!(
            operation_id = schema.operation_id(),
            violations = violations.len(),
            "request failed validation"
        );
        AppError::Validation(violations)
    })?;

    let output = (route.operation.handler())(&input)?;
    respond(schema, output)
}

fn raw_input(
    schema: &OperationSchema,
    request: &RawRequest,
    path: BTreeMap<String, PathValue>,
) -> Result<RawInput, AppError> {
    let query = request
        .uri
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default();

    let mut headers = BTreeMap::new();
    for (name, value) in &request.headers {
        if let Ok(value) = value.to_str() {
            headers
                .entry(name.as_str().to_string())
                .or_insert_with(|| value.to_string());
        }
    }

    let body = if schema.has_body_input() && !request.body.is_empty() {
        match serde_json::from_slice::<Value>(&request.body) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) => {
                return Err(AppError::BadRequest(
                    "request body must be a JSON object".to_string(),
                ))
            }
            Err(err) => return Err(AppError::BadRequest(format!("malformed JSON body: {err}"))),
        }
    } else {
        None
    };

    Ok(RawInput {
        path,
        query,
        headers,
        body,
    })
}

/// Shape the handler output into the declared response body.
fn respond(schema: &OperationSchema, output: HandlerOutput) -> Result<RawResponse, AppError> {
    let status = StatusCode::from_u16(schema.status())
        .map_err(|e| AppError::Internal(format!("invalid default status: {e}")))?;

    if schema.outputs().is_empty() {
        if !output.body.is_empty() {
            return Err(HandlerError::OutputShape(format!(
                "operation '{}' declares no response body",
                schema.operation_id()
            ))
            .into());
        }
        return Ok(RawResponse::empty(status));
    }

    let mut body = output.body;
    if let Some(extra) = body
        .keys()
        .find(|k| !schema.outputs().iter().any(|f| f.name() == k.as_str()))
    {
        return Err(HandlerError::OutputShape(format!("undeclared field '{extra}'")).into());
    }

    let mut shaped = Map::new();
    for field in schema.outputs() {
        match body.remove(field.name()).filter(|v| !v.is_null()) {
            Some(value) if json_type_matches(field, &value) => {
                shaped.insert(field.name().to_string(), value);
            }
            Some(_) => {
                return Err(HandlerError::OutputShape(format!(
                    "field '{}' is not a {}",
                    field.name(),
                    field.value_type()
                ))
                .into());
            }
            None if field.is_required() => {
                return Err(HandlerError::OutputShape(format!(
                    "missing required field '{}'",
                    field.name()
                ))
                .into());
            }
            None => {}
        }
    }

    Ok(RawResponse::json(status, &Value::Object(shaped)))
}

fn json_type_matches(field: &FieldSchema, value: &Value) -> bool {
    match field.value_type() {
        ValueType::String => value.is_string(),
        ValueType::Integer => value.is_i64(),
        ValueType::Boolean => value.is_boolean(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use apiform_schema::{FieldSchema, Method as OpMethod, RegistryBuilder};
    use serde_json::json;

    fn echo_registry(calls: Arc<AtomicUsize>) -> ApiRegistry {
        let mut b = RegistryBuilder::new();
        b.register(
            OperationSchema::new("get-echo", OpMethod::Get, "/echo/{word}")
                .input(FieldSchema::string("word").in_path().max_length(5))
                .input(FieldSchema::integer("times").in_query().minimum(1))
                .output(FieldSchema::string("said").required())
                .output(FieldSchema::integer("times")),
            handler(move |input| {
                calls.fetch_add(1, Ordering::SeqCst);
                let mut out = HandlerOutput::empty().field("said", input.str("word").unwrap_or(""));
                if let Some(t) = input.i64("times") {
                    out = out.field("times", t);
                }
                Ok(out)
            }),
        )
        .unwrap();
        b.register(
            OperationSchema::new("post-bad", OpMethod::Post, "/bad")
                .output(FieldSchema::string("x").required()),
            handler(|_| Ok(HandlerOutput::empty().field("x", 5))),
        )
        .unwrap();
        b.register(
            OperationSchema::new("post-fail", OpMethod::Post, "/fail").default_status(201),
            handler(|_| Err(HandlerError::Downstream("store offline at 10.0.0.7".into()))),
        )
        .unwrap();
        b.build()
    }

    fn get(uri: &str) -> RawRequest {
        RawRequest::new(Method::GET, uri.parse().unwrap())
    }

    #[test]
    fn matched_request_invokes_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let reg = echo_registry(calls.clone());
        let resp = dispatch(&reg, get("/echo/hi?times=2"));
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.json_body().unwrap(), json!({"said": "hi", "times": 2}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn optional_output_field_is_omitted() {
        let reg = echo_registry(Arc::new(AtomicUsize::new(0)));
        let resp = dispatch(&reg, get("/echo/hi"));
        assert_eq!(resp.json_body().unwrap(), json!({"said": "hi"}));
    }

    #[test]
    fn invalid_request_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let reg = echo_registry(calls.clone());
        let resp = dispatch(&reg, get("/echo/toolong?times=0"));
        assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
        let body = resp.json_body().unwrap();
        let details = body["error"]["details"].as_array().unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0]["constraint"], "maxLength");
        assert_eq!(details[1]["constraint"], "minimum");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_path_and_method_are_not_found() {
        let reg = echo_registry(Arc::new(AtomicUsize::new(0)));
        assert_eq!(dispatch(&reg, get("/nothing")).status, StatusCode::NOT_FOUND);
        let post = RawRequest::new(Method::POST, "/echo/hi".parse().unwrap());
        assert_eq!(dispatch(&reg, post).status, StatusCode::NOT_FOUND);
        let options = RawRequest::new(Method::OPTIONS, "/echo/hi".parse().unwrap());
        assert_eq!(dispatch(&reg, options).status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn output_type_mismatch_is_internal_error() {
        let reg = echo_registry(Arc::new(AtomicUsize::new(0)));
        let req = RawRequest::new(Method::POST, "/bad".parse().unwrap());
        assert_eq!(dispatch(&reg, req).status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn handler_failure_maps_to_500_without_leaking() {
        let reg = echo_registry(Arc::new(AtomicUsize::new(0)));
        let req = RawRequest::new(Method::POST, "/fail".parse().unwrap());
        let resp = dispatch(&reg, req);
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = resp.json_body().unwrap();
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("10.0.0.7"));
    }

    #[test]
    fn from_serialize_reports_encode_failure_as_output_shape() {
        let mut unencodable = std::collections::HashMap::new();
        unencodable.insert((1u8, 2u8), 3u8);
        match HandlerOutput::from_serialize(&unencodable) {
            Err(HandlerError::OutputShape(msg)) => assert!(msg.contains("serialize"), "{msg}"),
            other => panic!("expected OutputShape, got {other:?}"),
        }
    }

    #[test]
    fn from_serialize_requires_object() {
        assert!(HandlerOutput::from_serialize(&json!({"a": 1})).is_ok());
        assert!(matches!(
            HandlerOutput::from_serialize(&5),
            Err(HandlerError::OutputShape(_))
        ));
    }
}
