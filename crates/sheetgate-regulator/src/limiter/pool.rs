use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use sheetgate_core::OperationKind;

use super::pacer::RatePacer;
use crate::catalog::OperationCatalog;

/// Limiter table key: quotas are tracked per tenant and operation kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LimiterKey {
    pub tenant: String,
    pub kind: OperationKind,
}

impl LimiterKey {
    pub fn new(tenant: &str, kind: OperationKind) -> Self {
        Self {
            tenant: tenant.to_string(),
            kind,
        }
    }
}

/// Per (tenant, kind) pacers, created lazily.
///
/// Entries live for the process lifetime; the key space (tenants × kinds) is
/// small and bounded.
pub struct RateLimiterPool {
    catalog: Arc<OperationCatalog>,
    limiters: DashMap<LimiterKey, Arc<RatePacer>>,
    min_rate: f64,
}

impl RateLimiterPool {
    pub fn new(catalog: Arc<OperationCatalog>, min_rate: f64) -> Self {
        Self {
            catalog,
            limiters: DashMap::new(),
            min_rate,
        }
    }

    /// Pacer for the key, created exactly once on first use.
    pub fn limiter(&self, tenant: &str, kind: OperationKind) -> Arc<RatePacer> {
        let key = LimiterKey::new(tenant, kind);
        if let Some(existing) = self.limiters.get(&key) {
            return existing.value().clone();
        }
        self.limiters
            .entry(key)
            .or_insert_with(|| {
                let rate = self.catalog.rule_for(Some(kind)).rate_per_sec();
                tracing::debug!(tenant, %kind, rate, "limiter created");
                Arc::new(RatePacer::new(rate, self.min_rate))
            })
            .value()
            .clone()
    }

    /// Wait for a permit for (tenant, kind). Returns the time spent waiting.
    ///
    /// The table is only touched to look the pacer up; the wait itself never
    /// holds a table lock, so distinct keys never block each other.
    pub async fn acquire(&self, tenant: &str, kind: OperationKind) -> Duration {
        let pacer = self.limiter(tenant, kind);
        pacer.acquire().await
    }

    /// Damp the rate for one key. Never raises it. Returns the new rate.
    pub fn adjust_rate(&self, tenant: &str, kind: OperationKind, permits_per_sec: f64) -> f64 {
        let pacer = self.limiter(tenant, kind);
        let before = pacer.rate();
        let after = pacer.damp(permits_per_sec);
        if after < before {
            tracing::warn!(tenant, %kind, before, after, "limiter rate damped");
        }
        after
    }

    /// Current rate for a key, without creating it.
    pub fn current_rate(&self, tenant: &str, kind: OperationKind) -> Option<f64> {
        self.limiters
            .get(&LimiterKey::new(tenant, kind))
            .map(|p| p.value().rate())
    }

    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }
}
