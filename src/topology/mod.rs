//! Network topology module.
//!
//! Resolves the declared links into per-router interface records and an
//! undirected adjacency, classifies border routers and enumerates the iBGP
//! full mesh of every AS.

pub mod builder;
pub mod types;

// Re-export key types for easier access
pub use builder::Topology;
pub use types::{IbgpSession, Interface, InterfaceKind, RouterNode};
