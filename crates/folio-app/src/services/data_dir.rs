// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::{Path, PathBuf};

use folio_core::FolioConfig;
use folio_core::error::Result;
use tracing::warn;

const CONFIG_FILE: &str = "config.json";

/// Return the application data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let dir = base_dir().join("folio");
    if let Err(err) = std::fs::create_dir_all(&dir) {
        warn!(path = %dir.display(), %err, "could not create data directory");
    }
    dir
}

fn base_dir() -> PathBuf {
    // XDG data dir, then ~/.local/share
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME")
        && !xdg.is_empty()
    {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from("/tmp")
}

/// Load `config.json` from `dir`, then apply environment overrides.
///
/// On first run the defaults are written out so they can be edited. An
/// unreadable file is left alone and the defaults are used.
pub fn load_config(dir: &Path) -> FolioConfig {
    let path = dir.join(CONFIG_FILE);
    let config = match std::fs::read_to_string(&path) {
        Ok(data) => serde_json::from_str(&data).unwrap_or_else(|err| {
            warn!(path = %path.display(), %err, "ignoring unreadable config");
            FolioConfig::default()
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let config = FolioConfig::default();
            if let Err(err) = persist_config(dir, &config) {
                warn!(path = %path.display(), %err, "could not write default config");
            }
            config
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "could not read config");
            FolioConfig::default()
        }
    };
    config.with_env_overrides()
}

pub fn persist_config(dir: &Path, config: &FolioConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(dir.join(CONFIG_FILE), json)?;
    Ok(())
}
