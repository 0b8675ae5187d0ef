//! # OpenAPI Endpoints
//!
//! Serves the description generated from the live registry at
//! `/openapi.json` and `/openapi.yaml`.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use apiform_schema::describe;

use crate::error::AppError;
use crate::state::AppState;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/openapi.json", get(openapi_json))
        .route("/openapi.yaml", get(openapi_yaml))
}

/// GET /openapi.json — Return the generated OpenAPI document.
async fn openapi_json(State(state): State<AppState>) -> Result<Response, AppError> {
    let body = describe(&state.registry, &state.describe)
        .to_json()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(([(CONTENT_TYPE, "application/json")], body).into_response())
}

/// GET /openapi.yaml — Same document as YAML.
async fn openapi_yaml(State(state): State<AppState>) -> Result<Response, AppError> {
    let body = describe(&state.registry, &state.describe)
        .to_yaml()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(([(CONTENT_TYPE, "application/yaml")], body).into_response())
}
