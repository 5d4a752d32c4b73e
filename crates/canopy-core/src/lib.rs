//! Deterministic synthesis of typed resource trees into canonical documents.
//!
//! This crate ties together the value model with deferred tokens (`Value`,
//! `Token`), the token resolver (`resolve`), the canonicalizer
//! (`canonicalize`), deterministic name allocation (`allocate_name`), charts
//! as namespace owners (`Chart`), and the `Resource` façade that composes
//! them: identity at construction, resolution plus canonicalization at
//! render. Repeated renders of an unchanged tree are byte-identical.

pub mod canonical;
pub mod chart;
pub mod naming;
pub mod resolve;
pub mod resource;
pub mod token;
pub mod types;
pub mod value;

pub use canonical::{canonical_json, canonicalize, CanonicalError};
pub use chart::{Chart, ChartOptions, NameStrategy};
pub use naming::{allocate_name, MAX_NAME_LEN};
pub use resolve::{resolve, ResolveError, MAX_RESOLVE_DEPTH};
pub use resource::Resource;
pub use token::Token;
pub use types::{Namespace, ResourceName};
pub use value::Value;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("tree error: {0}")]
    Tree(#[from] canopy_tree::TreeError),
    #[error("resolution error: {0}")]
    Resolve(#[from] ResolveError),
    #[error("canonicalization error: {0}")]
    Canonical(#[from] CanonicalError),
    #[error("resource '{path}': options must be a mapping")]
    OptionsNotMap { path: String },
    #[error("resource '{path}': metadata must be a mapping")]
    MetadataNotMap { path: String },
    #[error("resource '{path}': '{field}' must be a non-empty string")]
    MissingField { path: String, field: &'static str },
    #[error("resource '{path}' has no enclosing chart")]
    NoChart { path: String },
    #[error("generated name for '{path}' is empty")]
    EmptyGeneratedName { path: String },
    #[error("resource '{path}': explicit metadata.name must not be empty")]
    EmptyExplicitName { path: String },
    #[error("name collision in namespace '{namespace}': '{name}' already issued")]
    NameCollision { namespace: String, name: String },
}
