//! Operation catalog: static registry of operation kind -> quota rule.
//!
//! Built once at startup from the built-in table plus config overrides and
//! never mutated afterwards. Only limiter issuance rates change at runtime.

use std::collections::HashMap;
use std::time::Duration;

use sheetgate_core::{OperationKind, QuotaRule};

use crate::config::RegulatorConfig;

const MINUTE: Duration = Duration::from_secs(60);

/// Rule for unknown or unclassified calls: conservative, unserialized, and
/// not retried since nothing is known about the action's idempotence.
pub const FALLBACK_RULE: QuotaRule = QuotaRule::new(MINUTE, 60, false, false);

const fn rule(permits: u32, document_serialized: bool, retry_on_throttle: bool) -> QuotaRule {
    QuotaRule::new(MINUTE, permits, document_serialized, retry_on_throttle)
}

/// Built-in quotas. Attachment uploads, search, and sheet creation count
/// against a reduced per-minute budget on the remote side.
const BUILTIN: [(OperationKind, QuotaRule); 18] = [
    (OperationKind::ListSheets, rule(300, false, true)),
    (OperationKind::GetSheet, rule(300, false, true)),
    (OperationKind::CreateSheet, rule(30, false, false)),
    (OperationKind::UpdateSheet, rule(300, true, true)),
    (OperationKind::DeleteSheet, rule(30, true, false)),
    (OperationKind::CopySheet, rule(30, false, false)),
    (OperationKind::SearchSheet, rule(30, false, true)),
    (OperationKind::GetRow, rule(300, false, true)),
    (OperationKind::AddRows, rule(300, true, true)),
    (OperationKind::UpdateRows, rule(300, true, true)),
    (OperationKind::DeleteRows, rule(300, true, true)),
    (OperationKind::ListColumns, rule(300, false, true)),
    (OperationKind::AddColumns, rule(300, true, true)),
    (OperationKind::UpdateColumn, rule(300, true, true)),
    (OperationKind::DeleteColumn, rule(300, true, true)),
    (OperationKind::ListAttachments, rule(300, false, true)),
    (OperationKind::AttachFile, rule(30, true, true)),
    (OperationKind::AddComment, rule(300, true, true)),
];

#[derive(Debug, Clone)]
pub struct OperationCatalog {
    rules: HashMap<OperationKind, QuotaRule>,
    fallback: QuotaRule,
}

impl Default for OperationCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl OperationCatalog {
    pub fn builtin() -> Self {
        Self {
            rules: BUILTIN.into_iter().collect(),
            fallback: FALLBACK_RULE,
        }
    }

    /// Built-in table with config overrides applied. Expects a validated config.
    pub fn from_config(cfg: &RegulatorConfig) -> Self {
        let mut catalog = Self::builtin();
        if let Some(fallback) = &cfg.fallback {
            catalog.fallback = fallback.apply(catalog.fallback);
        }
        for (kind, over) in &cfg.operations {
            let base = catalog.rule_for(Some(*kind));
            catalog.rules.insert(*kind, over.apply(base));
        }
        catalog
    }

    /// Rule for `kind`. Never fails: `None`, `Generic`, or a kind with no
    /// entry resolve to the fallback rule.
    pub fn rule_for(&self, kind: Option<OperationKind>) -> QuotaRule {
        kind.and_then(|k| self.rules.get(&k).copied())
            .unwrap_or(self.fallback)
    }

    pub fn fallback(&self) -> QuotaRule {
        self.fallback
    }

    /// Kinds with an explicit rule.
    pub fn kinds(&self) -> impl Iterator<Item = OperationKind> + '_ {
        self.rules.keys().copied()
    }
}
