//! Error types for fabric operations.
//!
//! This module defines the error taxonomy shared by the identity codec,
//! the VRF table allocator and the VRF lifecycle manager.
//! All errors implement `std::error::Error` via `thiserror`.

use std::io;
use thiserror::Error;

/// Result type alias for fabric operations.
pub type FabricResult<T> = Result<T, FabricError>;

/// Errors that can occur during fabric operations.
#[derive(Debug, Error)]
pub enum FabricError {
    /// An address of the wrong family was supplied (e.g. IPv4 where IPv6 is required).
    #[error("Not an IPv6 address: {value}")]
    InvalidAddressFamily {
        /// The offending input.
        value: String,
    },

    /// The SRv6 site prefix is longer than 64 bits.
    #[error("SRv6 site prefix {prefix} is /{len}, must be /64 or shorter")]
    InvalidPrefixLength {
        /// The prefix as supplied.
        prefix: String,
        /// The parsed prefix length.
        len: u8,
    },

    /// The SRv6 site prefix could not be parsed as a CIDR network.
    #[error("Invalid network prefix {prefix:?}: {message}")]
    InvalidPrefix {
        /// The prefix as supplied.
        prefix: String,
        /// Parser message.
        message: String,
    },

    /// An IP address could not be parsed.
    #[error("Cannot parse IP address {value:?}")]
    InvalidAddress {
        /// The offending input.
        value: String,
    },

    /// The VPC identifier is not a hex number of at most 48 bits.
    #[error("Invalid VPC {value:?}: {message}")]
    InvalidVpcValue {
        /// The offending input.
        value: String,
        /// Reason for rejection.
        message: String,
    },

    /// The attachment identifier is not a hex number of at most 16 bits.
    #[error("Invalid VPC attachment {value:?}: {message}")]
    InvalidAttachmentValue {
        /// The offending input.
        value: String,
        /// Reason for rejection.
        message: String,
    },

    /// A base-62 name fragment contains characters outside `0-9a-zA-Z` or overflows.
    #[error("Invalid base-62 value {value:?}")]
    InvalidBase62 {
        /// The offending input.
        value: String,
    },

    /// A list input that must not be empty was empty.
    #[error("No {what} in input")]
    EmptyInput {
        /// What was expected (e.g. "segments").
        what: &'static str,
    },

    /// No VRF link matches the queried name.
    #[error("VRF '{name}' not found")]
    NotFound {
        /// The VRF interface name.
        name: String,
    },

    /// Every routing table id in [1, 2^32-2] is in use.
    #[error("No available VRF table id")]
    ExhaustedIdSpace,

    /// Another VRF link was bound to the same table id while this one was being created.
    #[error("VRF '{name}' lost table id {table_id} to a concurrent creation")]
    TableIdConflict {
        /// The VRF interface name that was being created.
        name: String,
        /// The contended table id.
        table_id: u32,
    },

    /// Reading link or route state from the kernel failed.
    #[error("Kernel query failed: {operation}: {message}")]
    PlatformQuery {
        /// The operation that failed (e.g. "list_links").
        operation: String,
        /// Error message.
        message: String,
    },

    /// Changing link or route state in the kernel failed.
    #[error("Kernel mutation failed: {operation}: {message}")]
    PlatformMutation {
        /// The operation that failed (e.g. "create_vrf").
        operation: String,
        /// Error message.
        message: String,
    },

    /// Writing a kernel parameter failed.
    #[error("Failed to set sysctl {key}: {source}")]
    Sysctl {
        /// Dotted sysctl key.
        key: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },
}

impl FabricError {
    /// Creates a kernel query error.
    pub fn platform_query(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::PlatformQuery {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Creates a kernel mutation error.
    pub fn platform_mutation(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::PlatformMutation {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if the error means the named VRF does not exist.
    ///
    /// Teardown callers treat this as an already satisfied postcondition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FabricError::NotFound { .. })
    }

    /// Returns true if the error was caused by malformed caller input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FabricError::InvalidAddressFamily { .. }
                | FabricError::InvalidPrefixLength { .. }
                | FabricError::InvalidPrefix { .. }
                | FabricError::InvalidAddress { .. }
                | FabricError::InvalidVpcValue { .. }
                | FabricError::InvalidAttachmentValue { .. }
                | FabricError::InvalidBase62 { .. }
                | FabricError::EmptyInput { .. }
        )
    }

    /// Returns true if the error was surfaced by the kernel link/route boundary.
    pub fn is_platform(&self) -> bool {
        matches!(
            self,
            FabricError::PlatformQuery { .. } | FabricError::PlatformMutation { .. }
        )
    }
}
