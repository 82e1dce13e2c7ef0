//! rf-network: resolving blueprints into executable component networks.
//!
//! Contains:
//! - selector (criterion-driven narrowing of catalog candidates)
//! - builder (resolve every vertex, wire every connection, realize)
//! - network (the realized pipeline with its execution order)
//! - error (network error types)

pub mod builder;
pub mod error;
pub mod network;
pub mod selector;

pub use builder::NetworkBuilder;
pub use error::{NetworkError, NetworkResult};
pub use network::Network;
pub use selector::ComponentSelector;
