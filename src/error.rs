//! Error taxonomy for the compiler.
//!
//! Every failure is fatal and names the offending router, AS or link so the
//! intent document can be fixed. Nothing is written to disk unless the whole
//! compilation succeeded.

use std::path::PathBuf;

/// Errors produced while loading, allocating, synthesizing or writing.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Cannot read intent document {path}: {source}")]
    IntentUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed intent: {0}")]
    MalformedIntent(String),

    #[error("Referential error: {0}")]
    ReferentialError(String),

    #[error("Pool exhausted: {pool} ({owner}) cannot supply {needed} addresses, capacity is {available}")]
    PoolExhausted {
        owner: String,
        pool: String,
        needed: u128,
        available: u128,
    },

    #[error("Address space collision: {first} overlaps {second}")]
    AddressSpaceCollision { first: String, second: String },

    #[error("Router {router} has no links")]
    OrphanRouter { router: String },

    #[error("AS {asn} selects unsupported IGP '{protocol}' (expected ripng or ospfv3)")]
    UnsupportedIgp { asn: u32, protocol: String },

    #[error("Failed to write configuration for router {router} to {path}: {source}")]
    WriteFailure {
        router: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    /// Process exit code for the CLI: 2 for filesystem write failures, 1 for
    /// every defect in the intent document.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::WriteFailure { .. } => 2,
            _ => 1,
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedIntent(msg.into())
    }

    pub(crate) fn referential(msg: impl Into<String>) -> Self {
        Self::ReferentialError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let write = CompileError::WriteFailure {
            router: "R1".to_string(),
            path: PathBuf::from("/nonexistent/R1.cfg"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(write.exit_code(), 2);
        assert_eq!(CompileError::OrphanRouter { router: "R9".into() }.exit_code(), 1);
        assert_eq!(CompileError::malformed("x").exit_code(), 1);
    }

    #[test]
    fn test_messages_name_the_offender() {
        let err = CompileError::OrphanRouter { router: "R9".into() };
        assert!(err.to_string().contains("R9"));

        let err = CompileError::UnsupportedIgp { asn: 65001, protocol: "isis".into() };
        assert!(err.to_string().contains("65001"));
        assert!(err.to_string().contains("isis"));
    }
}
