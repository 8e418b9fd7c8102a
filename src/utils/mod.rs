//! Shared utilities: IPv6 prefix helpers and referential validation.

pub mod ip_utils;
pub mod validation;

pub use ip_utils::{host_prefix, nth_address, overlaps, parse_prefix, pool_capacity};
pub use validation::validate_references;
