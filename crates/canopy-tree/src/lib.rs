//! Scope tree underlying a canopy synthesis session.
//!
//! This crate provides the tree layer: `Scope` handles for parent/child
//! registration keyed by local id, stable path-segment enumeration from the
//! session root, and typed attachment lookup (`find_ancestor`) used by
//! higher layers to locate their enclosing grouping entity.
//!
//! A tree belongs to exactly one synthesis session. There is no process-wide
//! registry: independent sessions never share naming state.

pub mod scope;

pub use scope::{Scope, TreeError};
