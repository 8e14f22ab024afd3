//! Cache-aside repositories.
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → cart.rs / product.rs (entity shaping, key naming, index upkeep)
//!     → CacheClient (absorbing API: a failed read is a miss)
//!     → product.rs falls back to the in-process catalog on a miss
//! ```
//!
//! # Design Decisions
//! - A cache miss and an unavailable cache look the same here
//! - Writes are best-effort; nothing here assumes `set`/`del` landed
//! - The cart id index (`carts:list`) is updated under a process-local lock

pub mod cart;
pub mod product;

use serde::Serialize;

pub use cart::{Cart, CartItem, CartRepository, CartStats, CartUpdate, NewCart};
pub use product::{Product, ProductRepository};

/// A rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
