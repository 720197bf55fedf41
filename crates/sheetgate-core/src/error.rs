//! Shared error type across sheetgate crates.

use thiserror::Error;

/// Stable error codes surfaced to callers and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid configuration or input.
    BadConfig,
    /// Unsupported configuration version.
    UnsupportedVersion,
    /// Remote service rejected the call as over quota.
    Throttled,
    /// Network/connection failure below the regulator.
    Transport,
    /// A wait inside the regulator was interrupted.
    Interrupted,
    /// Any other failure reported by the remote call.
    Failed,
    /// Internal error.
    Internal,
}

impl ClientCode {
    /// String representation used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadConfig => "BAD_CONFIG",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Throttled => "THROTTLED",
            ClientCode::Transport => "TRANSPORT",
            ClientCode::Interrupted => "INTERRUPTED",
            ClientCode::Failed => "FAILED",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SheetgateError>;

/// Setup-time error: configuration and construction of the regulator.
#[derive(Debug, Error)]
pub enum SheetgateError {
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl SheetgateError {
    /// Map internal error to a stable code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            SheetgateError::BadConfig(_) => ClientCode::BadConfig,
            SheetgateError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            SheetgateError::Internal(_) => ClientCode::Internal,
        }
    }
}
