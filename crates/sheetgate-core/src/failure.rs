//! Failure object handed back by transports, and the terminal error of a
//! regulated call.
//!
//! Transports build an [`ActionFailure`] from the remote response. The failure
//! is classified exactly once, at construction, into a closed [`FailureKind`];
//! the regulator's retry loop consumes that kind directly and never re-parses
//! status or message text.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::error::ClientCode;

/// Numeric status codes that mean "over quota" (HTTP 429, API error 4003).
const THROTTLE_CODES: [u16; 2] = [429, 4003];

/// Textual status values that mean "over quota".
const THROTTLE_STATUS_TEXT: [&str; 3] = ["429", "4003", "RATE_LIMIT_EXCEEDED"];

/// Message fragments (lowercase) that mark a throttle response.
const THROTTLE_MARKERS: [&str; 3] = [
    "rate limit exceeded",
    "ratelimitexceeded",
    "too many requests",
];

/// Remote status as reported by the transport: numeric or string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Code(u16),
    Text(String),
}

impl Status {
    /// Whether this status alone signals a throttle.
    pub fn indicates_throttle(&self) -> bool {
        match self {
            Status::Code(code) => THROTTLE_CODES.contains(code),
            Status::Text(text) => {
                let text = text.trim();
                THROTTLE_STATUS_TEXT
                    .iter()
                    .any(|t| t.eq_ignore_ascii_case(text))
            }
        }
    }
}

impl From<u16> for Status {
    fn from(code: u16) -> Self {
        Status::Code(code)
    }
}

impl From<&str> for Status {
    fn from(text: &str) -> Self {
        Status::Text(text.to_string())
    }
}

impl From<String> for Status {
    fn from(text: String) -> Self {
        Status::Text(text)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Code(code) => write!(f, "{code}"),
            Status::Text(text) => f.write_str(text),
        }
    }
}

/// Closed classification of an action failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Server signalled the caller is over quota.
    Throttled,
    /// Connection reset, timeout, or other failure below the HTTP layer.
    Transport,
    /// Anything else.
    Other,
}

/// Failure of a single action invocation.
///
/// Only three fields of the remote response are inspected: status, reset hint
/// and message.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ActionFailure {
    kind: FailureKind,
    status: Option<Status>,
    reset_after_secs: Option<f64>,
    message: String,
}

impl ActionFailure {
    /// Build from a remote response, classifying it once.
    pub fn from_response(
        status: Option<Status>,
        reset_after_secs: Option<f64>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let throttled = status.as_ref().is_some_and(Status::indicates_throttle)
            || has_throttle_marker(&message);
        Self {
            kind: if throttled {
                FailureKind::Throttled
            } else {
                FailureKind::Other
            },
            status,
            reset_after_secs,
            message,
        }
    }

    /// Explicit throttle signal.
    pub fn throttled(message: impl Into<String>) -> Self {
        Self::with_kind(FailureKind::Throttled, message)
    }

    /// Network/connection failure. Never retried by the regulator.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::with_kind(FailureKind::Transport, message)
    }

    /// Any other failure.
    pub fn other(message: impl Into<String>) -> Self {
        Self::with_kind(FailureKind::Other, message)
    }

    fn with_kind(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            reset_after_secs: None,
            message: message.into(),
        }
    }

    /// Attach a status without reclassifying.
    pub fn with_status(mut self, status: impl Into<Status>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Attach the server's "retry after N seconds" hint.
    pub fn with_reset_after(mut self, secs: f64) -> Self {
        self.reset_after_secs = Some(secs);
        self
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn is_throttle(&self) -> bool {
        self.kind == FailureKind::Throttled
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn reset_after_secs(&self) -> Option<f64> {
        self.reset_after_secs
    }

    /// Server reset hint as a duration, only when present, finite and positive.
    pub fn reset_hint(&self) -> Option<Duration> {
        self.reset_after_secs
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

fn has_throttle_marker(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    THROTTLE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Phase of a regulated call.
///
/// `AdmissionWait` and `LockWait` are entered at most once per call;
/// `Attempting` and `Backoff` alternate until the call is `Done` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    AdmissionWait,
    LockWait,
    Attempting,
    Backoff,
    Done,
    Failed,
}

impl CallPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            CallPhase::AdmissionWait => "admission_wait",
            CallPhase::LockWait => "lock_wait",
            CallPhase::Attempting => "attempting",
            CallPhase::Backoff => "backoff",
            CallPhase::Done => "done",
            CallPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a regulated call.
pub type CallResult<T> = std::result::Result<T, CallError>;

/// Terminal error of a regulated call.
///
/// `attempts` counts action invocations made before the call ended.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("throttled after {attempts} attempt(s): {failure}")]
    Throttled {
        failure: ActionFailure,
        attempts: u32,
    },
    #[error("transport failure on attempt {attempts}: {failure}")]
    Transport {
        failure: ActionFailure,
        attempts: u32,
    },
    #[error("interrupted during {phase} after {attempts} attempt(s)")]
    Interrupted { phase: CallPhase, attempts: u32 },
    #[error("call failed on attempt {attempts}: {failure}")]
    Unclassified {
        failure: ActionFailure,
        attempts: u32,
    },
}

impl CallError {
    /// Wrap a failure according to its kind.
    pub fn from_failure(failure: ActionFailure, attempts: u32) -> Self {
        match failure.kind() {
            FailureKind::Throttled => CallError::Throttled { failure, attempts },
            FailureKind::Transport => CallError::Transport { failure, attempts },
            FailureKind::Other => CallError::Unclassified { failure, attempts },
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            CallError::Throttled { attempts, .. }
            | CallError::Transport { attempts, .. }
            | CallError::Interrupted { attempts, .. }
            | CallError::Unclassified { attempts, .. } => *attempts,
        }
    }

    /// Last failure reported by the action, if the call got that far.
    pub fn failure(&self) -> Option<&ActionFailure> {
        match self {
            CallError::Throttled { failure, .. }
            | CallError::Transport { failure, .. }
            | CallError::Unclassified { failure, .. } => Some(failure),
            CallError::Interrupted { .. } => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, CallError::Interrupted { .. })
    }

    pub fn client_code(&self) -> ClientCode {
        match self {
            CallError::Throttled { .. } => ClientCode::Throttled,
            CallError::Transport { .. } => ClientCode::Transport,
            CallError::Interrupted { .. } => ClientCode::Interrupted,
            CallError::Unclassified { .. } => ClientCode::Failed,
        }
    }
}
