//! Error types for the synchronization core
//!
//! Provides typed errors for configuration, binding lookup, and relay
//! operations. Binaries wrap these in `anyhow` at their edges.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or saving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file exists but is not valid TOML
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Inline TOML (tests, stdin) is not valid
    #[error("Invalid config TOML: {0}")]
    InvalidToml(#[from] toml::de::Error),

    /// Failed to create a config or data directory
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write the config file or user key
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to serialize configuration
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Required credentials or mappings are absent
    ///
    /// Fatal for the relay server at startup; the client core treats the
    /// same condition as degraded mode (defaults only) instead.
    #[error("Missing credentials: {what}")]
    MissingCredentials { what: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// An unregistered flag key was referenced
///
/// Surfaced to the user as a visible error; user intent for an unknown
/// binding is never silently dropped and never reaches the relay.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("No binding registered for flag \"{flag}\"")]
pub struct NotFound {
    pub flag: String,
}

impl NotFound {
    pub fn new(flag: impl Into<String>) -> Self {
        Self { flag: flag.into() }
    }
}

/// Errors from a single change-relay request
///
/// One definitive result per call; the relay never retries on its own.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The endpoint answered with a non-success status
    #[error("Relay endpoint returned status {status}")]
    Upstream { status: u16 },

    /// No response at all (connect failure, timeout, DNS)
    #[error("Relay endpoint unreachable: {source}")]
    Unreachable {
        #[source]
        source: reqwest::Error,
    },
}

impl RelayError {
    /// Status code of an upstream rejection, if that is what this is
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            RelayError::Upstream { status } => Some(*status),
            RelayError::Unreachable { .. } => None,
        }
    }
}

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;
