//! Regulated execution: the single entry point outbound calls go through.
//!
//! A call moves through `AdmissionWait -> LockWait (serialized kinds only) ->
//! Attempting <-> Backoff -> Done | Failed`. The admission permit and the
//! document lock are taken once, in that order, and kept for the whole call
//! including every retry. Backoff sleeps hold both, so no other caller of the
//! same document runs between two attempts of a serialized operation.

use std::future::Future;
use std::sync::Arc;

use sheetgate_core::error::Result;
use sheetgate_core::operation::MIN_RATE_PER_SEC;
use sheetgate_core::{ActionFailure, CallError, CallPhase, CallResult, FailureKind, OperationKind};
use futures_util::future::select_all;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::catalog::OperationCatalog;
use crate::config::RegulatorConfig;
use crate::limiter::RateLimiterPool;
use crate::locks::{DocumentLockHandle, DocumentLockTable};
use crate::obs::metrics::{Gauge, RegulatorMetrics};
use crate::retry::{RetryContext, RetryPolicy};

/// Owns the catalog, limiter pool, and lock table. Construct once and share
/// by cloning; clones observe the same state.
#[derive(Clone)]
pub struct RegulatedExecutor {
    inner: Arc<ExecutorInner>,
    cancel: CancellationToken,
    // Caller-supplied tokens from `with_cancellation`, outermost first.
    scopes: Vec<CancellationToken>,
}

struct ExecutorInner {
    catalog: Arc<OperationCatalog>,
    limiters: RateLimiterPool,
    locks: DocumentLockTable,
    retry: RetryPolicy,
    metrics: RegulatorMetrics,
}

impl RegulatedExecutor {
    /// Build from a config. Returns Result so callers can surface bad config
    /// instead of panicking.
    pub fn new(cfg: &RegulatorConfig) -> Result<Self> {
        cfg.validate()?;
        let catalog = OperationCatalog::from_config(cfg);
        Ok(Self::from_parts(
            catalog,
            RetryPolicy::from(&cfg.retry),
            cfg.limiter.min_rate_per_sec,
        ))
    }

    /// Built-in catalog and default retry policy.
    pub fn builtin() -> Self {
        Self::from_parts(
            OperationCatalog::builtin(),
            RetryPolicy::default(),
            MIN_RATE_PER_SEC,
        )
    }

    pub fn from_parts(
        catalog: OperationCatalog,
        retry: RetryPolicy,
        min_rate_per_sec: f64,
    ) -> Self {
        let catalog = Arc::new(catalog);
        Self {
            inner: Arc::new(ExecutorInner {
                limiters: RateLimiterPool::new(Arc::clone(&catalog), min_rate_per_sec),
                catalog,
                locks: DocumentLockTable::new(),
                retry,
                metrics: RegulatorMetrics::default(),
            }),
            cancel: CancellationToken::new(),
            scopes: Vec::new(),
        }
    }

    /// Handle sharing all state with `self` whose calls are interrupted by
    /// `token` as well as by anything that interrupts `self`.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        let mut scopes = self.scopes.clone();
        scopes.push(token);
        Self {
            inner: Arc::clone(&self.inner),
            cancel: self.cancel.child_token(),
            scopes,
        }
    }

    /// Interrupt every waiting and future call made through this handle and
    /// through handles derived from it with `with_cancellation`.
    pub fn interrupt(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn cancelled(&self) {
        if self.scopes.is_empty() {
            self.cancel.cancelled().await;
            return;
        }
        let scoped = select_all(self.scopes.iter().map(|t| Box::pin(t.cancelled())));
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = scoped => {}
        }
    }

    pub fn catalog(&self) -> &OperationCatalog {
        &self.inner.catalog
    }

    pub fn limiters(&self) -> &RateLimiterPool {
        &self.inner.limiters
    }

    pub fn locks(&self) -> &DocumentLockTable {
        &self.inner.locks
    }

    pub fn metrics(&self) -> &RegulatorMetrics {
        &self.inner.metrics
    }

    /// Prometheus text snapshot including live table sizes.
    pub fn metrics_snapshot(&self) -> String {
        let extra = [
            ("sheetgate_limiters_live", self.inner.limiters.len() as u64),
            ("sheetgate_document_locks_live", self.inner.locks.len() as u64),
        ];
        self.inner.metrics.render(&extra)
    }

    /// Run `action` under admission control, optional document
    /// serialization, and throttle retry.
    ///
    /// `kind: None` uses the generic fallback rule. The action may be invoked
    /// more than once when the kind retries on throttle, so it must tolerate
    /// that. Returns the action's value or the terminal error; the document
    /// lock is released before this returns, whatever the outcome.
    pub async fn execute<T, F, Fut>(
        &self,
        tenant: &str,
        kind: Option<OperationKind>,
        document_id: Option<&str>,
        action: F,
    ) -> CallResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ActionFailure>>,
    {
        let kind = kind.unwrap_or(OperationKind::Generic);
        let span = tracing::debug_span!(
            "regulated_call",
            tenant,
            %kind,
            document = document_id.unwrap_or_default()
        );
        self.run(tenant, kind, document_id, action)
            .instrument(span)
            .await
    }

    async fn run<T, F, Fut>(
        &self,
        tenant: &str,
        kind: OperationKind,
        document_id: Option<&str>,
        mut action: F,
    ) -> CallResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ActionFailure>>,
    {
        let inner = &*self.inner;
        let rule = inner.catalog.rule_for(Some(kind));
        let labels = [("tenant", tenant), ("kind", kind.as_str())];

        tracing::trace!(phase = %CallPhase::AdmissionWait);
        let waited = tokio::select! {
            biased;
            _ = self.cancelled() => {
                return Err(self.interrupted(kind, CallPhase::AdmissionWait, 0));
            }
            waited = inner.limiters.acquire(tenant, kind) => waited,
        };
        inner.metrics.admissions.inc(&labels);
        inner.metrics.admission_wait.observe(&[("kind", kind.as_str())], waited);

        let _held = if rule.document_serialized {
            tracing::trace!(phase = %CallPhase::LockWait);
            let handle = tokio::select! {
                biased;
                _ = self.cancelled() => {
                    return Err(self.interrupted(kind, CallPhase::LockWait, 0));
                }
                handle = inner.locks.acquire(document_id) => handle,
            };
            Some(HeldDocument::new(handle, &inner.metrics.document_locks_held))
        } else {
            None
        };

        let mut retry = RetryContext::new(inner.retry);
        loop {
            let attempt = retry.attempt();
            tracing::trace!(phase = %CallPhase::Attempting, attempt);

            let failure = match action().await {
                Ok(value) => {
                    tracing::debug!(attempts = attempt, phase = %CallPhase::Done, "call completed");
                    self.record_outcome(kind, "ok");
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            let retryable = failure.kind() == FailureKind::Throttled
                && rule.retry_on_throttle
                && retry.can_retry();
            if !retryable {
                return Err(self.failed(kind, CallError::from_failure(failure, attempt)));
            }

            let wait = retry.delay(failure.reset_hint());
            tracing::warn!(
                attempt,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                reset_after_secs = ?failure.reset_after_secs(),
                message = failure.message(),
                "throttled; backing off"
            );
            inner.metrics.throttle_retries.inc(&labels);

            tokio::select! {
                biased;
                _ = self.cancelled() => {
                    return Err(self.interrupted(kind, CallPhase::Backoff, attempt));
                }
                _ = tokio::time::sleep(wait) => {}
            }

            inner
                .limiters
                .adjust_rate(tenant, kind, 1.0 / wait.as_secs_f64());
            inner.metrics.rate_adjustments.inc(&labels);
            retry.advance();
        }
    }

    fn interrupted(&self, kind: OperationKind, phase: CallPhase, attempts: u32) -> CallError {
        self.failed(kind, CallError::Interrupted { phase, attempts })
    }

    fn failed(&self, kind: OperationKind, err: CallError) -> CallError {
        tracing::debug!(
            phase = %CallPhase::Failed,
            attempts = err.attempts(),
            code = err.client_code().as_str(),
            error = %err,
            "call failed"
        );
        self.record_outcome(kind, err.client_code().as_str());
        err
    }

    fn record_outcome(&self, kind: OperationKind, outcome: &str) {
        self.inner
            .metrics
            .call_outcomes
            .inc(&[("kind", kind.as_str()), ("outcome", outcome)]);
    }
}

// Keeps the held-locks gauge in step with the handle's lifetime.
struct HeldDocument<'a> {
    _handle: DocumentLockHandle,
    gauge: Option<&'a Gauge>,
}

impl<'a> HeldDocument<'a> {
    fn new(handle: DocumentLockHandle, gauge: &'a Gauge) -> Self {
        let gauge = (!handle.is_noop()).then_some(gauge);
        if let Some(g) = gauge {
            g.inc();
        }
        Self {
            _handle: handle,
            gauge,
        }
    }
}

impl Drop for HeldDocument<'_> {
    fn drop(&mut self) {
        if let Some(g) = self.gauge {
            g.dec();
        }
    }
}
