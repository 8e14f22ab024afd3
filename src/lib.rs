//! Cart and catalog service backed by a resilient cache client.

pub mod admin;
pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod repository;
pub mod resilience;

pub use cache::{CacheClient, CacheClientConfig, MemoryConnector, RedisConnector};
pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
