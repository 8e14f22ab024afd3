//! Per-operation observability hook.
//!
//! The client reports every operation to a list of observers instead of
//! logging directly. Two observers ship with the crate: one that writes
//! structured `tracing` events and one that records `metrics`.

use serde::Serialize;
use std::time::Duration;

use crate::cache::error::{CacheError, Operation};
use crate::observability::metrics;
use crate::resilience::CircuitState;

/// How an operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// `get` found a value.
    Hit,
    /// `get` found nothing.
    Miss,
    /// Any other operation completed.
    Ok,
    Timeout,
    CircuitOpen,
    TrialInProgress,
    DownstreamError,
    CodecError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Hit => "hit",
            Outcome::Miss => "miss",
            Outcome::Ok => "ok",
            Outcome::Timeout => "timeout",
            Outcome::CircuitOpen => "circuit_open",
            Outcome::TrialInProgress => "trial_in_progress",
            Outcome::DownstreamError => "downstream_error",
            Outcome::CodecError => "codec_error",
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, Outcome::Hit | Outcome::Miss | Outcome::Ok)
    }
}

impl From<&CacheError> for Outcome {
    fn from(err: &CacheError) -> Self {
        match err {
            CacheError::Timeout { .. } => Outcome::Timeout,
            CacheError::CircuitOpen { .. } => Outcome::CircuitOpen,
            CacheError::TrialInProgress { .. } => Outcome::TrialInProgress,
            CacheError::Downstream { .. } => Outcome::DownstreamError,
            CacheError::Codec { .. } => Outcome::CodecError,
        }
    }
}

/// One finished cache operation.
#[derive(Debug, Clone)]
pub struct CacheEvent<'a> {
    pub operation: Operation,
    /// Key or pattern, when the operation has one.
    pub key: Option<&'a str>,
    pub outcome: Outcome,
    pub latency: Duration,
    /// Breaker state after the outcome was recorded.
    pub state: CircuitState,
    pub error: Option<&'a CacheError>,
}

pub trait CacheObserver: Send + Sync {
    fn observe(&self, event: &CacheEvent<'_>);
}

/// Writes each event as a structured `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn observe(&self, event: &CacheEvent<'_>) {
        let latency_ms = event.latency.as_secs_f64() * 1000.0;
        match event.error {
            None => tracing::debug!(
                operation = %event.operation,
                key = event.key.unwrap_or(""),
                outcome = event.outcome.as_str(),
                latency_ms,
                circuit = %event.state,
                "Cache operation"
            ),
            // Rejections are expected while the breaker is open.
            Some(err) if err.is_rejection() => tracing::debug!(
                operation = %event.operation,
                key = event.key.unwrap_or(""),
                outcome = event.outcome.as_str(),
                circuit = %event.state,
                "Cache operation rejected"
            ),
            Some(err) => tracing::warn!(
                operation = %event.operation,
                key = event.key.unwrap_or(""),
                outcome = event.outcome.as_str(),
                latency_ms,
                circuit = %event.state,
                error = %err,
                "Cache operation failed"
            ),
        }
    }
}

/// Records counters and latency histograms.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObserver;

impl CacheObserver for MetricsObserver {
    fn observe(&self, event: &CacheEvent<'_>) {
        metrics::record_cache_operation(event.operation.as_str(), event.outcome.as_str(), event.latency);
    }
}
