//! # Application State
//!
//! Shared state for the Axum application, passed to handlers via the
//! `State` extractor. The registry is built once at startup and only read
//! afterwards, so clones share it through an `Arc` without locking.

use std::fmt;
use std::sync::Arc;

use apiform_schema::DescribeOptions;

use crate::dispatch::ApiRegistry;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8888;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port to listen on.
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Every operation the server dispatches to.
    pub registry: Arc<ApiRegistry>,
    /// Metadata for the served API description.
    pub describe: Arc<DescribeOptions>,
}

impl AppState {
    pub fn new(registry: ApiRegistry) -> Self {
        Self::with_options(registry, DescribeOptions::default())
    }

    pub fn with_options(registry: ApiRegistry, describe: DescribeOptions) -> Self {
        Self {
            registry: Arc::new(registry),
            describe: Arc::new(describe),
        }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("operations", &self.registry.len())
            .field("describe", &self.describe)
            .finish()
    }
}
