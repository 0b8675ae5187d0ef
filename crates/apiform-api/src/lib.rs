//! # apiform-api — Schema-Validated HTTP Service
//!
//! Serves the operations declared in [`routes`] over Axum. Every request that
//! is not a health probe or an OpenAPI document goes through
//! [`dispatch::dispatch`], which resolves the operation, validates the
//! request against its field schemas, and invokes the handler only when
//! validation passes.
//!
//! ## API Surface
//!
//! | Route                  | Source                     |
//! |------------------------|----------------------------|
//! | `GET /greeting/{name}` | [`routes::greeting`]       |
//! | `POST /reviews`        | [`routes::reviews`]        |
//! | `GET /openapi.json`    | [`openapi`]                |
//! | `GET /openapi.yaml`    | [`openapi`]                |
//! | `GET /health/*`        | liveness and readiness     |
//!
//! ## Error Mapping
//!
//! | Condition               | Status | Code                |
//! |-------------------------|--------|---------------------|
//! | no matching operation   | 404    | `NOT_FOUND`         |
//! | malformed JSON body     | 400    | `BAD_REQUEST`       |
//! | body over 1 MiB         | 413    | `PAYLOAD_TOO_LARGE` |
//! | constraint violations   | 422    | `VALIDATION_ERROR`  |
//! | handler failure         | 500    | `INTERNAL_ERROR`    |

pub mod dispatch;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;

use std::net::SocketAddr;

use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::Router;
use http_body_util::LengthLimitError;
use tower_http::trace::TraceLayer;

pub use dispatch::{dispatch, ApiRegistry, Handler, HandlerError, HandlerOutput, RawRequest, RawResponse};
pub use error::AppError;
pub use routes::build_registry;
pub use state::{AppConfig, AppState};

/// Largest request body read before dispatch.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(openapi::router())
        .fallback(dispatch_request)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Bind `0.0.0.0:<port>` and serve until Ctrl-C.
pub async fn serve(config: &AppConfig, state: AppState) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Starting server on port {}...", config.port);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Fallback handler: buffer the body and hand the request to the registry.
async fn dispatch_request(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let cause = e.into_inner();
            let err = if cause.is::<LengthLimitError>() {
                AppError::PayloadTooLarge(MAX_BODY_BYTES)
            } else {
                AppError::BadRequest(format!("failed to read request body: {cause}"))
            };
            return err.into_response();
        }
    };
    dispatch(&state.registry, RawRequest::from_parts(parts, body)).into_response()
}

/// Liveness probe: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. The registry is built before the listener binds.
async fn readiness() -> &'static str {
    "ready"
}
