//! # apiform-schema — Declarative Operation Schemas
//!
//! The validation and API-description layer underneath the apiform service.
//! Operations are declared as explicit [`OperationSchema`] values built from
//! [`FieldSchema`] lists; nothing is discovered by reflection.
//!
//! ## Pieces
//!
//! - [`field`] — field sources, value types, constraints, and typed values.
//! - [`operation`] — operation metadata and `{placeholder}` path templates.
//! - [`validate`] — checks a [`RawInput`] against an operation's inputs and
//!   collects one [`Violation`] per invalid field.
//! - [`registry`] — the immutable, process-lifetime set of operations and
//!   route resolution by method and path.
//! - [`describe`] — renders a [`Registry`] into an OpenAPI 3.1 document.
//!
//! ## Crate Policy
//!
//! - No transport dependency. The registry is generic over the handler type
//!   so the HTTP layer decides what a handler is.
//! - Schemas are checked once at registration; after
//!   [`RegistryBuilder::build`] nothing is mutated.
//! - Validation never panics on client input. Every failure is a value.

pub mod describe;
pub mod error;
pub mod field;
pub mod operation;
pub mod registry;
pub mod validate;

pub use describe::{describe, ApiDescription, DescribeOptions};
pub use error::{DescribeError, RegistryError, SchemaError};
pub use field::{Constraints, FieldSchema, FieldValue, Source, ValueType};
pub use operation::{Method, OperationSchema, PathSegment, PathTemplate, PathValue};
pub use registry::{Operation, Registry, RegistryBuilder, RouteMatch};
pub use validate::{
    validate, Constraint, RawInput, ValidatedInput, ValidationResult, ValidationViolations,
    Violation,
};
