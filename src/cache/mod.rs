//! Marquee cache layer.
//!
//! - **Keys**: deterministic, escaped keys per entity namespace
//! - **Store**: process-local expiring store (Redis lives in `infra::redis`)
//! - **Flight**: per-key population locks for single-flight misses
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! url = "redis://127.0.0.1:6379"
//! single_flight = true
//! ```

mod flight;
mod keys;
mod store;

pub use flight::{FlightGuard, SingleFlight};
pub use keys::{CacheKeyBuilder, escape};
pub use store::InMemoryCacheStore;
