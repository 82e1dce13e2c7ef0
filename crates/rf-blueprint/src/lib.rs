//! rf-blueprint: pipeline descriptions as directed labeled multigraphs.
//!
//! Contains:
//! - graph (the multigraph: components, parallel named connections, compose)
//! - blueprint (the named aggregate with per-blueprint log scoping)
//! - file (property-tree JSON/YAML documents with includes)
//! - error (blueprint error types)

pub mod blueprint;
pub mod error;
pub mod graph;

mod dot;
mod file;

pub use blueprint::Blueprint;
pub use error::{BlueprintError, BlueprintResult};
pub use graph::{ConnectionRef, Graph};
