#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use sheetgate_core::{ActionFailure, CallError, CallPhase, FailureKind, Status};

#[test]
fn status_codes_mark_throttle() {
    for status in [
        Status::Code(429),
        Status::Code(4003),
        "429".into(),
        "rate_limit_exceeded".into(),
    ] {
        let f = ActionFailure::from_response(Some(status.clone()), None, "slow down");
        assert_eq!(f.kind(), FailureKind::Throttled, "{status}");
    }

    let f = ActionFailure::from_response(Some(Status::Code(500)), None, "server error");
    assert_eq!(f.kind(), FailureKind::Other);
}

#[test]
fn message_marker_marks_throttle() {
    let f = ActionFailure::from_response(None, None, "Rate limit exceeded.");
    assert!(f.is_throttle());

    let f =
        ActionFailure::from_response(Some(Status::Code(400)), None, "HTTP 429 Too Many Requests");
    assert!(f.is_throttle());

    let f = ActionFailure::from_response(None, None, "row not found");
    assert!(!f.is_throttle());
}

#[test]
fn explicit_kind_is_not_reclassified() {
    let f = ActionFailure::transport("connection reset").with_status(429u16);
    assert_eq!(f.kind(), FailureKind::Transport);
}

#[test]
fn reset_hint_only_when_positive() {
    let f = ActionFailure::throttled("x").with_reset_after(2.0);
    assert_eq!(f.reset_hint(), Some(Duration::from_secs(2)));

    assert_eq!(ActionFailure::throttled("x").with_reset_after(0.0).reset_hint(), None);
    assert_eq!(ActionFailure::throttled("x").with_reset_after(-1.0).reset_hint(), None);
    assert_eq!(ActionFailure::throttled("x").with_reset_after(f64::NAN).reset_hint(), None);
    assert_eq!(ActionFailure::throttled("x").with_reset_after(1e300).reset_hint(), None);
    assert_eq!(ActionFailure::throttled("x").reset_hint(), None);
}

#[test]
fn call_error_keeps_failure_and_attempts() {
    let err = CallError::from_failure(ActionFailure::throttled("over quota"), 4);
    assert_eq!(err.attempts(), 4);
    assert_eq!(err.client_code().as_str(), "THROTTLED");
    assert_eq!(err.failure().map(|f| f.message()), Some("over quota"));

    let err = CallError::from_failure(ActionFailure::other("bad column"), 1);
    assert!(matches!(err, CallError::Unclassified { attempts: 1, .. }));

    let err = CallError::Interrupted { phase: CallPhase::Backoff, attempts: 2 };
    assert!(err.is_interrupted());
    assert!(err.failure().is_none());
    assert_eq!(err.to_string(), "interrupted during backoff after 2 attempt(s)");
}
