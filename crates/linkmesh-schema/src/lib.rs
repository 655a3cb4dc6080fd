//! Schema validator, message descriptors and the fixed link-protocol
//! catalog.
//!
//! This crate is a schema registry with structural validation (spec.md
//! §4.1/§4.2): it compiles declarative JSON-schema-subset documents eagerly
//! at catalog-build time, exposes a read-only [`registry::MessageRegistry`]
//! of [`descriptor::MessageDescriptor`]s, and enumerates the fixed catalog
//! in [`catalog`].

pub mod catalog;
pub mod descriptor;
pub mod registry;
pub mod schema;

pub use descriptor::{Broadcast, Forward, Kind, MessageDescriptor};
pub use registry::{CatalogError, MessageRegistry};
pub use schema::{CompiledSchema, SchemaError, ValidationIssue};
