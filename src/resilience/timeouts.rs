//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap every downstream cache call with a deadline
//! - Map elapsed deadlines and connector failures into `CacheError`
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - On expiry the operation future is dropped, not awaited. Whatever it
//!   already put on the wire is not recalled: a Redis command written to the
//!   multiplexed connection still executes and its reply is discarded by the
//!   connection. Callers must treat a timed-out write as "maybe applied".

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::cache::error::{CacheError, ConnectorError, Operation};

/// Race `fut` against a timer of `limit`.
pub async fn with_timeout<T, F>(operation: Operation, limit: Duration, fut: F) -> Result<T, CacheError>
where
    F: Future<Output = Result<T, ConnectorError>>,
{
    match timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(CacheError::Downstream { operation, source }),
        Err(_) => Err(CacheError::Timeout { operation, limit }),
    }
}
