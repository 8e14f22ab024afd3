//! Cache access subsystem.
//!
//! # Data Flow
//! ```text
//! Repository
//!     → client.rs (codec, breaker admission, deadline, observers)
//!     → connector.rs (raw byte operations)
//!         → redis.rs (remote store)
//!         → memory.rs (in-process store)
//! ```
//!
//! # Design Decisions
//! - The client never propagates errors from its plain API: reads degrade to
//!   a miss and writes are best-effort
//! - Values cross the connector boundary as opaque bytes
//! - Observability is a pluggable hook, not hard-wired logging

pub mod client;
pub mod codec;
pub mod connector;
pub mod error;
pub mod memory;
pub mod observer;
pub mod redis;

pub use client::{CacheClient, CacheClientConfig, ResilientCacheClient};
pub use codec::{Codec, JsonCodec};
pub use connector::Connector;
pub use error::{CacheError, CacheResult, CodecError, ConnectorError, Operation};
pub use memory::MemoryConnector;
pub use observer::{CacheEvent, CacheObserver, MetricsObserver, Outcome, TracingObserver};
pub use self::redis::RedisConnector;
