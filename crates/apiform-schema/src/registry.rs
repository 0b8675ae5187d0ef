//! # Operation Registry
//!
//! [`RegistryBuilder`] collects operations at startup and enforces that
//! operation IDs and (method, path) pairs are unique. [`RegistryBuilder::build`]
//! freezes the set into a [`Registry`], which is read-only for the rest of
//! the process and can be shared across tasks behind an `Arc`.
//!
//! The registry is generic over the handler type `H`; the transport layer
//! picks the concrete handler signature.

use std::collections::BTreeMap;

use crate::error::RegistryError;
use crate::operation::{Method, OperationSchema, PathTemplate, PathValue};

/// A registered operation: its schema, parsed path, and handler.
#[derive(Debug, Clone)]
pub struct Operation<H> {
    schema: OperationSchema,
    template: PathTemplate,
    handler: H,
}

impl<H> Operation<H> {
    pub fn schema(&self) -> &OperationSchema {
        &self.schema
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

/// An operation resolved for a concrete request path.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    pub operation: &'a Operation<H>,
    /// Placeholder values bound from the request path.
    pub path_params: BTreeMap<String, PathValue>,
}

/// Startup-time collector of operations.
#[derive(Debug)]
pub struct RegistryBuilder<H> {
    operations: Vec<Operation<H>>,
}

impl<H> Default for RegistryBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> RegistryBuilder<H> {
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// Add an operation.
    ///
    /// Fails with [`RegistryError::DuplicateOperation`] if the operation ID or
    /// the method and path shape is taken, and with
    /// [`RegistryError::InvalidSchema`] if the schema breaks an invariant.
    pub fn register(&mut self, schema: OperationSchema, handler: H) -> Result<(), RegistryError> {
        let template = schema
            .check()
            .map_err(|source| RegistryError::InvalidSchema {
                operation_id: schema.operation_id().to_string(),
                source,
            })?;

        for existing in &self.operations {
            if existing.schema.operation_id() == schema.operation_id() {
                return Err(RegistryError::DuplicateOperation {
                    operation_id: schema.operation_id().to_string(),
                    reason: "operation ID already registered".to_string(),
                });
            }
            if existing.schema.method() == schema.method()
                && existing.template.shape() == template.shape()
            {
                return Err(RegistryError::DuplicateOperation {
                    operation_id: schema.operation_id().to_string(),
                    reason: format!(
                        "{} {} collides with '{}'",
                        schema.method(),
                        schema.path(),
                        existing.schema.operation_id()
                    ),
                });
            }
        }

        tracing::debug!(
            operation_id = schema.operation_id(),
            method = %schema.method(),
            path = schema.path(),
            "registered operation"
        );
        self.operations.push(Operation {
            schema,
            template,
            handler,
        });
        Ok(())
    }

    /// Freeze the collected operations.
    pub fn build(self) -> Registry<H> {
        Registry {
            operations: self.operations,
        }
    }
}

/// The immutable set of registered operations, in registration order.
#[derive(Debug)]
pub struct Registry<H> {
    operations: Vec<Operation<H>>,
}

impl<H> Registry<H> {
    pub fn builder() -> RegistryBuilder<H> {
        RegistryBuilder::new()
    }

    pub fn operations(&self) -> &[Operation<H>] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn get(&self, operation_id: &str) -> Option<&Operation<H>> {
        self.operations
            .iter()
            .find(|op| op.schema.operation_id() == operation_id)
    }

    /// Resolve the operation for `method` and a concrete request path.
    ///
    /// When several templates match, the one with the most literal segments
    /// wins; remaining ties go to the earlier registration.
    pub fn resolve(&self, method: Method, path: &str) -> Option<RouteMatch<'_, H>> {
        let mut best: Option<RouteMatch<'_, H>> = None;
        for op in self.operations.iter().filter(|op| op.schema.method() == method) {
            let Some(path_params) = op.template.matches(path) else {
                continue;
            };
            let better = best
                .as_ref()
                .map_or(true, |b| op.template.literal_count() > b.operation.template.literal_count());
            if better {
                best = Some(RouteMatch {
                    operation: op,
                    path_params,
                });
            }
        }
        best
    }
}
