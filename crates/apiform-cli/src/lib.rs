//! # apiform-cli — Command-Line Interface
//!
//! Two modes over one registry:
//!
//! - `serve` — start the HTTP server (also the default with no subcommand).
//! - `openapi` — print the OpenAPI document to standard output.
//!
//! Both build the registry through [`apiform_api::build_registry`]; neither
//! shares state with the other.

pub mod openapi;
pub mod serve;

use std::sync::Arc;

use apiform_api::routes::reviews::DiscardReviews;
use apiform_api::ApiRegistry;

/// Registry used by every subcommand. Reviews are accepted and dropped.
pub fn registry() -> anyhow::Result<ApiRegistry> {
    Ok(apiform_api::build_registry(Arc::new(DiscardReviews))?)
}
