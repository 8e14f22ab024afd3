//! Cache operation names and error types.

use std::fmt;
use std::time::Duration;
use serde::Serialize;
use thiserror::Error;

/// The operations exposed by the cache client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Get,
    Set,
    Del,
    Exists,
    Keys,
    FlushAll,
    Info,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Set => "set",
            Operation::Del => "del",
            Operation::Exists => "exists",
            Operation::Keys => "keys",
            Operation::FlushAll => "flush_all",
            Operation::Info => "info",
        }
    }

    /// Administrative operations skip breaker admission and accounting.
    pub fn is_administrative(&self) -> bool {
        matches!(self, Operation::FlushAll | Operation::Info)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised by a store connector.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Connection reset, refused, or otherwise unusable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Encode/decode failures at the serialization boundary.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

/// Errors surfaced by the strict (`try_*`) client API.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The operation exceeded its deadline.
    #[error("{operation} timed out after {}ms", .limit.as_millis())]
    Timeout { operation: Operation, limit: Duration },

    /// The breaker is open; the store was not contacted.
    #[error("circuit open, {operation} rejected (retry in {}ms)", .retry_in.as_millis())]
    CircuitOpen { operation: Operation, retry_in: Duration },

    /// The breaker is half-open and its trial call is still running.
    #[error("half-open trial in progress, {operation} rejected")]
    TrialInProgress { operation: Operation },

    /// The connector reported a failure.
    #[error("{operation} failed downstream: {source}")]
    Downstream {
        operation: Operation,
        #[source]
        source: ConnectorError,
    },

    /// The value could not be encoded or decoded.
    #[error("{operation} codec failure for key '{key}': {source}")]
    Codec {
        operation: Operation,
        key: String,
        #[source]
        source: CodecError,
    },
}

impl CacheError {
    pub fn operation(&self) -> Operation {
        match self {
            CacheError::Timeout { operation, .. }
            | CacheError::CircuitOpen { operation, .. }
            | CacheError::TrialInProgress { operation }
            | CacheError::Downstream { operation, .. }
            | CacheError::Codec { operation, .. } => *operation,
        }
    }

    /// True when the store was never contacted.
    pub fn is_rejection(&self) -> bool {
        matches!(self, CacheError::CircuitOpen { .. } | CacheError::TrialInProgress { .. })
    }
}

/// Result type for strict cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
