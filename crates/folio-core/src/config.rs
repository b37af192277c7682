// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::CompressionLevel;

/// Optimizer binaries tried in order when compressing.
pub const DEFAULT_OPTIMIZER_CANDIDATES: [&str; 3] = ["gswin64c", "gswin32c", "gs"];

/// Persistent service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    /// Root of the managed staging area. `None` resolves to the data
    /// directory at startup.
    pub staging_root: Option<PathBuf>,
    /// Seconds a delivered artifact survives before it is reclaimed.
    pub grace_delay_secs: u64,
    /// Grace delay for split outputs and their zip bundles.
    pub split_grace_delay_secs: u64,
    /// Files older than this many seconds are removed by the sweep.
    pub retention_secs: u64,
    /// Seconds between sweep passes.
    pub sweep_interval_secs: u64,
    /// Optimizer executables, tried in order.
    pub optimizer_candidates: Vec<String>,
    /// Level used when a request does not name one.
    pub default_compression: CompressionLevel,
    /// Suppress internal error detail in user-facing reports.
    pub production: bool,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            staging_root: None,
            grace_delay_secs: 30,
            split_grace_delay_secs: 5,
            retention_secs: 60 * 60,
            sweep_interval_secs: 60 * 60,
            optimizer_candidates: DEFAULT_OPTIMIZER_CANDIDATES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            default_compression: CompressionLevel::Medium,
            production: false,
        }
    }
}

impl FolioConfig {
    pub fn grace_delay(&self) -> Duration {
        Duration::from_secs(self.grace_delay_secs)
    }

    pub fn split_grace_delay(&self) -> Duration {
        Duration::from_secs(self.split_grace_delay_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Sweep interval, never shorter than one second.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    /// Apply environment overrides (`FOLIO_PRODUCTION`, `FOLIO_STAGING_DIR`).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var("FOLIO_PRODUCTION") {
            self.production = matches!(value.trim(), "1" | "true" | "yes");
        }
        if let Ok(dir) = std::env::var("FOLIO_STAGING_DIR")
            && !dir.trim().is_empty()
        {
            self.staging_root = Some(PathBuf::from(dir));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = FolioConfig::default();
        assert_eq!(config.retention(), Duration::from_secs(3600));
        assert_eq!(config.grace_delay(), Duration::from_secs(30));
        assert_eq!(config.split_grace_delay(), Duration::from_secs(5));
        assert_eq!(config.optimizer_candidates, vec!["gswin64c", "gswin32c", "gs"]);
        assert!(!config.production);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: FolioConfig =
            serde_json::from_str(r#"{"grace_delay_secs": 5, "production": true}"#).unwrap();
        assert_eq!(config.grace_delay_secs, 5);
        assert!(config.production);
        assert_eq!(config.retention_secs, 3600);
        assert_eq!(config.default_compression, CompressionLevel::Medium);
    }

    #[test]
    fn sweep_interval_has_a_floor() {
        let config = FolioConfig {
            sweep_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
    }
}
