//! Top-level facade crate for sheetgate.
//!
//! Re-exports core types and the regulator library so users can depend on a single crate.

pub mod core {
    pub use sheetgate_core::*;
}

pub mod regulator {
    pub use sheetgate_regulator::*;
}

pub use sheetgate_core::classify::{classify, Classification};
pub use sheetgate_core::{ActionFailure, CallError, CallResult, OperationKind};
pub use sheetgate_regulator::RegulatedExecutor;
