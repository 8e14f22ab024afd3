//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Cache operation:
//!     → circuit_breaker.rs (admit, short-circuit when open or probing)
//!     → timeouts.rs (enforce the per-operation deadline)
//!     → connector call
//!     → circuit_breaker.rs (record outcome, transition state)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every downstream call has a deadline
//! - No retries: a failed cache call degrades to a miss
//! - One breaker per client instance, never shared across processes
//! - Breaker bookkeeping is a single critical section

pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::{
    BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState, Permit, Rejection,
};
pub use timeouts::with_timeout;
