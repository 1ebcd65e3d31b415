//! Prefab engine
//!
//! Serializes a live node subtree into a flat, reference-indexed prefab
//! document:
//!
//! - [`codec`]: compact asset identifiers and random file ids
//! - [`index`]: live identifier to document index tables
//! - [`resolver`]: property values to their serialized form
//! - [`schema`]: field layouts of built-in components
//! - [`flatten`]: pre-order index allocation and entry emission
//! - [`document`]: entry types, header and metadata assembly
//! - [`validate`]: structural checks on finished documents
//! - [`service`]: create/validate/info operations over an asset store

pub mod codec;
pub mod document;
pub mod flatten;
pub mod index;
pub mod resolver;
pub mod schema;
pub mod service;
pub mod validate;

#[cfg(test)]
mod tests;

pub use codec::{compress_uuid, generate_file_id};
pub use document::{AssembledPrefab, DocumentAssembler, DocumentEntry, PrefabMeta};
pub use flatten::{flatten, FlattenContext, FlattenOptions, FlattenOutput, PrefabInfoStyle};
pub use index::ReferenceIndex;
pub use resolver::{PropertyResolver, ResolutionWarning};
pub use service::{CreatePrefabRequest, PrefabCreated, PrefabService, PrefabSummary, ToolResult};
pub use validate::{validate_document, ValidationReport};
