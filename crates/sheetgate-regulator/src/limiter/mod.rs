//! Admission control: per (tenant, operation kind) rate limiters.

pub mod pacer;
pub mod pool;

pub use pacer::RatePacer;
pub use pool::{LimiterKey, RateLimiterPool};
