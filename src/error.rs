//! Error types for soqlx
//!
//! This module defines the error hierarchy used throughout the crate.
//! We use `thiserror` for library-style errors with clear error chains.
//!
//! Autocompletion never surfaces these as failures: unavailable metadata and
//! malformed queries become inline suggestion messages. The enums here cover
//! the async seams (describe fetches, remote queries) and configuration.

use std::io;

/// Describe (metadata) loading errors
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The describe call itself failed
    #[error("Describe failed: {0}")]
    DescribeFailed(String),

    /// The object is not present in the global describe
    #[error("Unknown object: {0}")]
    NotFound(String),

    /// Describe payload could not be decoded
    #[error("Invalid describe payload: {0}")]
    InvalidDescribe(#[from] serde_json::Error),

    /// Reading a describe source failed
    #[error("Describe source unreadable: {0}")]
    Io(#[from] io::Error),
}

/// Remote query execution errors
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The remote API rejected or failed the request
    #[error("{0}")]
    RemoteFailure(String),

    /// The request was aborted by the caller
    #[error("Query cancelled")]
    Cancelled,

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Configuration loading/parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Home directory not found
    #[error("Could not determine home directory")]
    NoHomeDir,

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Reading the configuration file failed
    #[error("Failed to read configuration: {0}")]
    Io(#[from] io::Error),
}

/// Specialized Result type for metadata operations
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;

/// Specialized Result type for remote query operations
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Specialized Result type for config operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
