//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack, metrics)
//!     → request.rs (request ID assigned or propagated)
//!     → cart.rs / products.rs (decode, validate, call repository)
//!     → response.rs (JSON error envelope)
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - Handlers never see cache errors; the repositories absorb them
//! - Every error body uses the `{ "error": { "message", "type" } }` envelope

pub mod cart;
pub mod products;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdGenerator, X_REQUEST_ID};
pub use response::{ApiError, ApiResult};
pub use server::{AppState, HttpServer};
