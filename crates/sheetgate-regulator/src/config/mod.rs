//! Regulator config loader (strict parsing).

pub mod schema;

use std::fs;

use sheetgate_core::error::{Result, SheetgateError};

pub use schema::{LimiterSection, RegulatorConfig, RetrySection, RuleOverride};

pub fn load_from_file(path: &str) -> Result<RegulatorConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SheetgateError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<RegulatorConfig> {
    let cfg: RegulatorConfig = serde_yaml::from_str(s)
        .map_err(|e| SheetgateError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
