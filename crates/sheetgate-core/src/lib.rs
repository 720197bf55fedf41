//! sheetgate core: transport-agnostic types shared by the regulator and by
//! the transport/ORM layers that sit on top of it.
//!
//! This crate defines the operation vocabulary of the remote sheet API, the
//! failure object transports hand back to the regulator, the terminal error
//! surface of a regulated call, and the pure request classifier. It carries no
//! runtime dependencies so transports can depend on it without pulling tokio.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `SheetgateError`/`CallError` so a
//! misbehaving remote never takes the calling process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod classify;
pub mod error;
pub mod failure;
pub mod operation;

/// Shared result type.
pub use error::{Result, SheetgateError};
pub use failure::{ActionFailure, CallError, CallPhase, CallResult, FailureKind, Status};
pub use operation::{OperationKind, QuotaRule};
