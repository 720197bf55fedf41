use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use sheetgate_core::error::{Result, SheetgateError};
use sheetgate_core::operation::MIN_RATE_PER_SEC;
use sheetgate_core::{OperationKind, QuotaRule};

use crate::catalog::OperationCatalog;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegulatorConfig {
    pub version: u32,

    #[serde(default)]
    pub retry: RetrySection,

    #[serde(default)]
    pub limiter: LimiterSection,

    /// Override of the rule applied to unknown/generic operations.
    #[serde(default)]
    pub fallback: Option<RuleOverride>,

    /// Per-kind overrides on top of the built-in catalog.
    #[serde(default)]
    pub operations: HashMap<OperationKind, RuleOverride>,
}

impl Default for RegulatorConfig {
    fn default() -> Self {
        Self {
            version: 1,
            retry: RetrySection::default(),
            limiter: LimiterSection::default(),
            fallback: None,
            operations: HashMap::new(),
        }
    }
}

impl RegulatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SheetgateError::UnsupportedVersion);
        }

        self.retry.validate()?;
        self.limiter.validate()?;

        if let Some(fallback) = &self.fallback {
            fallback.validate("fallback")?;
        }
        if self.operations.contains_key(&OperationKind::Generic) {
            return Err(SheetgateError::BadConfig(
                "operations.generic is not allowed; use `fallback`".into(),
            ));
        }
        for (kind, rule) in &self.operations {
            rule.validate(&format!("operations.{kind}"))?;
        }

        self.validate_floor()
    }

    // A floor above a rule's own rate would let that key run faster than its
    // quota.
    fn validate_floor(&self) -> Result<()> {
        let floor = self.limiter.min_rate_per_sec;
        if floor <= MIN_RATE_PER_SEC {
            return Ok(());
        }
        let catalog = OperationCatalog::from_config(self);
        for kind in OperationKind::ALL {
            let rule = catalog.rule_for(Some(kind));
            if rule.rate_per_sec() < floor {
                return Err(SheetgateError::BadConfig(format!(
                    "limiter.min_rate_per_sec {floor} exceeds the {kind} rate of {} per second",
                    rule.rate_per_sec()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    /// Additional attempts after the first one.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySection {
    pub fn validate(&self) -> Result<()> {
        if self.max_retries > 10 {
            return Err(SheetgateError::BadConfig(
                "retry.max_retries must be between 0 and 10".into(),
            ));
        }
        if self.base_delay_ms == 0 {
            return Err(SheetgateError::BadConfig(
                "retry.base_delay_ms must be greater than 0".into(),
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(SheetgateError::BadConfig(
                "retry.max_delay_ms must not be less than base_delay_ms".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    200
}
fn default_max_delay_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimiterSection {
    #[serde(default = "default_min_rate_per_sec")]
    pub min_rate_per_sec: f64,
}

impl Default for LimiterSection {
    fn default() -> Self {
        Self {
            min_rate_per_sec: default_min_rate_per_sec(),
        }
    }
}

impl LimiterSection {
    pub fn validate(&self) -> Result<()> {
        if !self.min_rate_per_sec.is_finite() || self.min_rate_per_sec <= 0.0 {
            return Err(SheetgateError::BadConfig(
                "limiter.min_rate_per_sec must be a positive number".into(),
            ));
        }
        Ok(())
    }
}

fn default_min_rate_per_sec() -> f64 {
    MIN_RATE_PER_SEC
}

/// Partial rule: unset fields keep the built-in value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleOverride {
    pub window_ms: Option<u64>,
    pub permits: Option<u32>,
    pub document_serialized: Option<bool>,
    pub retry_on_throttle: Option<bool>,
}

impl RuleOverride {
    fn validate(&self, path: &str) -> Result<()> {
        if self.window_ms == Some(0) {
            return Err(SheetgateError::BadConfig(format!(
                "{path}.window_ms must be greater than 0"
            )));
        }
        if self.permits == Some(0) {
            return Err(SheetgateError::BadConfig(format!(
                "{path}.permits must be greater than 0"
            )));
        }
        Ok(())
    }

    /// Apply on top of `base`.
    pub fn apply(&self, base: QuotaRule) -> QuotaRule {
        QuotaRule {
            window: self.window_ms.map(Duration::from_millis).unwrap_or(base.window),
            permits: self.permits.unwrap_or(base.permits),
            document_serialized: self.document_serialized.unwrap_or(base.document_serialized),
            retry_on_throttle: self.retry_on_throttle.unwrap_or(base.retry_on_throttle),
        }
    }
}
