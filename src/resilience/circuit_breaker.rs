//! Circuit breaker for the cache store.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: store assumed down, calls fail fast
//! - Half-Open: a single probe call tests whether the store recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: first call after the cooldown elapses (becomes the trial)
//! Half-Open → Closed: trial succeeds
//! Half-Open → Open: trial fails, or the trial's caller goes away
//! ```
//!
//! # Design Decisions
//! - One breaker per client instance (not global, not distributed)
//! - Fail fast in Open state (no waiting for timeout)
//! - Single probe in Half-Open (prevents hammering a recovering store)
//! - All bookkeeping lives behind one mutex that is never held across an await

use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::observability::metrics;

/// Breaker state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed = 0,
    HalfOpen = 1,
    Open = 2,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::HalfOpen => "half_open",
            CircuitState::Open => "open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breaker tuning.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip a closed breaker.
    pub failure_threshold: u32,
    /// Time spent open before a trial call is admitted.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(5),
        }
    }
}

/// Why a call was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Breaker is open; `retry_in` is the remaining cooldown.
    Open { retry_in: Duration },
    /// Breaker is half-open and its single trial is still running.
    TrialInProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermitKind {
    Normal,
    Trial,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    /// Only meaningful while open.
    next_attempt: Option<Instant>,
    trial_in_flight: bool,
}

/// Point-in-time view of the breaker, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub trial_in_flight: bool,
    /// Remaining cooldown while open.
    pub retry_in_ms: Option<u64>,
    pub failure_threshold: u32,
    pub cooldown_ms: u64,
}

/// Consecutive-failure circuit breaker with a single half-open trial.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a closed breaker with a zero failure count.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        metrics::record_circuit_state(&name, CircuitState::Closed);
        Self {
            name,
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                next_attempt: None,
                trial_in_flight: false,
            }),
        }
    }

    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::new(name, CircuitBreakerConfig::default())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // Every critical section leaves the state consistent, so a poisoned
        // lock still holds valid data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state. An open breaker whose cooldown elapsed still reports
    /// `Open` until the next call is admitted as the trial.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = Instant::now();
        let inner = self.lock();
        let retry_in_ms = match (inner.state, inner.next_attempt) {
            (CircuitState::Open, Some(at)) => {
                Some(at.saturating_duration_since(now).as_millis() as u64)
            }
            _ => None,
        };
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            trial_in_flight: inner.trial_in_flight,
            retry_in_ms,
            failure_threshold: self.config.failure_threshold,
            cooldown_ms: self.config.cooldown.as_millis() as u64,
        }
    }

    /// Ask to run one downstream call.
    ///
    /// The returned permit must be resolved with [`Permit::succeed`] or
    /// [`Permit::fail`]. Dropping an unresolved trial permit counts as a
    /// failed trial.
    pub fn acquire(&self) -> Result<Permit<'_>, Rejection> {
        let now = Instant::now();
        let mut inner = self.lock();

        match inner.state {
            CircuitState::Closed => Ok(Permit::new(self, PermitKind::Normal)),
            CircuitState::Open => {
                let next_attempt = inner.next_attempt.unwrap_or(now);
                if now < next_attempt {
                    return Err(Rejection::Open {
                        retry_in: next_attempt - now,
                    });
                }
                inner.next_attempt = None;
                inner.trial_in_flight = true;
                self.transition(&mut inner, CircuitState::HalfOpen);
                Ok(Permit::new(self, PermitKind::Trial))
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    return Err(Rejection::TrialInProgress);
                }
                inner.trial_in_flight = true;
                Ok(Permit::new(self, PermitKind::Trial))
            }
        }
    }

    fn on_success(&self, kind: PermitKind) {
        let mut inner = self.lock();
        match kind {
            PermitKind::Trial => {
                inner.trial_in_flight = false;
                inner.consecutive_failures = 0;
                inner.next_attempt = None;
                self.transition(&mut inner, CircuitState::Closed);
            }
            // A call admitted before the breaker tripped says nothing about
            // recovery, so it only resets the count while closed.
            PermitKind::Normal => {
                if inner.state == CircuitState::Closed {
                    inner.consecutive_failures = 0;
                }
            }
        }
    }

    fn on_failure(&self, kind: PermitKind) {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        match kind {
            PermitKind::Trial => {
                inner.trial_in_flight = false;
                self.trip(&mut inner, now);
            }
            PermitKind::Normal => {
                if inner.state == CircuitState::Closed
                    && inner.consecutive_failures >= self.config.failure_threshold
                {
                    self.trip(&mut inner, now);
                }
            }
        }
    }

    fn trip(&self, inner: &mut BreakerState, now: Instant) {
        inner.next_attempt = Some(now + self.config.cooldown);
        self.transition(inner, CircuitState::Open);
    }

    fn transition(&self, inner: &mut BreakerState, to: CircuitState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;

        match to {
            CircuitState::Open => tracing::warn!(
                circuit = %self.name,
                from = %from,
                failures = inner.consecutive_failures,
                cooldown_ms = self.config.cooldown.as_millis() as u64,
                "Circuit opened"
            ),
            CircuitState::HalfOpen => tracing::info!(
                circuit = %self.name,
                "Circuit half-open, admitting trial call"
            ),
            CircuitState::Closed => tracing::info!(
                circuit = %self.name,
                from = %from,
                "Circuit closed"
            ),
        }
        metrics::record_circuit_transition(&self.name, from, to);
    }
}

/// Admission ticket for one downstream call.
#[must_use = "an unresolved trial permit re-opens the breaker when dropped"]
#[derive(Debug)]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    kind: PermitKind,
    resolved: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, kind: PermitKind) -> Self {
        Self {
            breaker,
            kind,
            resolved: false,
        }
    }

    /// True when this call is the half-open probe.
    pub fn is_trial(&self) -> bool {
        self.kind == PermitKind::Trial
    }

    pub fn succeed(mut self) {
        self.resolved = true;
        self.breaker.on_success(self.kind);
    }

    pub fn fail(mut self) {
        self.resolved = true;
        self.breaker.on_failure(self.kind);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.resolved && self.kind == PermitKind::Trial {
            tracing::warn!(circuit = %self.breaker.name, "Trial call abandoned, re-opening circuit");
            self.breaker.on_failure(PermitKind::Trial);
        }
    }
}
