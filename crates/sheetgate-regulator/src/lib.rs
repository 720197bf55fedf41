//! sheetgate regulator library entry.
//!
//! This crate wires the operation catalog, per-key admission limiters, the
//! document lock table, and the throttle-retry loop into one explicitly
//! constructed service object, [`RegulatedExecutor`]. Transports and the ORM
//! layer hand it their outbound calls as closures; nothing here performs I/O
//! of its own.
//!
//! Panics, `unwrap`, and `expect` are compile-denied, as in `sheetgate-core`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod catalog;
pub mod config;
pub mod executor;
pub mod limiter;
pub mod locks;
pub mod obs;
pub mod retry;

pub use catalog::OperationCatalog;
pub use executor::RegulatedExecutor;
pub use limiter::RateLimiterPool;
pub use locks::{DocumentLockHandle, DocumentLockTable};
pub use retry::{RetryContext, RetryPolicy};
