//! # API Operations
//!
//! - `greeting` — GET /greeting/{name}
//! - `reviews` — POST /reviews
//!
//! [`build_registry`] is the single place operations are registered. It
//! returns the immutable registry that both the server and the `openapi`
//! command use.

pub mod greeting;
pub mod reviews;

use std::sync::Arc;

use apiform_schema::{RegistryBuilder, RegistryError};

use crate::dispatch::ApiRegistry;
use reviews::ReviewSink;

/// Register every operation and freeze the result.
pub fn build_registry(sink: Arc<dyn ReviewSink>) -> Result<ApiRegistry, RegistryError> {
    let mut builder = RegistryBuilder::new();
    builder.register(greeting::schema(), greeting::handler_for())?;
    builder.register(reviews::schema(), reviews::handler_for(sink))?;
    let registry = builder.build();
    tracing::info!(operations = registry.len(), "operation registry built");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviews::DiscardReviews;

    #[test]
    fn registers_both_operations_in_order() {
        let registry = build_registry(Arc::new(DiscardReviews)).unwrap();
        let ids: Vec<_> = registry
            .operations()
            .iter()
            .map(|op| op.schema().operation_id())
            .collect();
        assert_eq!(ids, vec![greeting::OPERATION_ID, reviews::OPERATION_ID]);
    }
}
