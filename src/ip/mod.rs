//! IPv6 address allocation.
//!
//! Allocation is the only phase that mutates shared state (the per-AS
//! loopback cursors and the link-subnet cursor). It runs sequentially inside
//! an [`Allocator`], which is consumed once it has produced the immutable
//! [`AddressPlan`] that every later phase reads.

pub mod allocator;
pub mod pool;
pub mod registry;

// Re-export commonly used types
pub use allocator::{AddressPlan, Allocator, LinkAddressing};
pub use pool::{LinkSubnetSpace, LoopbackPool};
pub use registry::{AddressRegistry, RegionKind};
