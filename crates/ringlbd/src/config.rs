//! TOML configuration for the ringlb driver.
//!
//! Every section is optional; missing fields fall back to the defaults of
//! [`RingConfig`] and [`LogSection`].

use std::path::Path;

use anyhow::Context;
use ringlb_types::RingConfig;
use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Ring shape and per-node store size.
    pub ring: RingConfig,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"warn"`, `"debug"`). Overridden by `RUST_LOG`.
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        // Script output goes to stdout; keep stderr quiet unless asked.
        Self {
            level: "warn".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("failed to read {}", p.display()))?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };
        config
            .ring
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid [ring] section: {e}"))?;
        Ok(config)
    }

    /// Parse config from a TOML string.
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
