//! Error types for capture-dns.

use thiserror::Error;

/// Errors that can occur in the DNS server.
#[derive(Debug, Error)]
pub enum DnsError {
    /// IO error (network, file, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(#[from] redis::RedisError),

    /// Stored or emitted JSON could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// DNS protocol error
    #[error("DNS protocol error: {0}")]
    Proto(#[from] hickory_proto::ProtoError),

    /// Failed to parse address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// An override was rewritten that does not exist in storage
    #[error("no override stored under {0}")]
    OverrideMissing(String),

    /// A record kind was given a value of the wrong shape
    #[error("{kind} record cannot be built from a {shape} value")]
    RecordShape {
        /// Record kind requested.
        kind: &'static str,
        /// Shape of the value that was supplied.
        shape: &'static str,
    },

    /// Stored rotation value is malformed
    #[error("Malformed rotation value: {0}")]
    Rotation(#[from] RotationError),

    /// GeoIP database error
    #[error("GeoIP error: {0}")]
    Geo(#[from] maxminddb::MaxMindDBError),
}

/// Faults found while parsing a delimiter-encoded override value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RotationError {
    /// The value, one of its groups, or one of its sequence elements is empty.
    #[error("empty element in {0:?}")]
    EmptyElement(String),
}
