// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Persistent configuration at `~/.trackhaul/config.json`.
//!
//! Every field has a default, so a missing file or a partial file both load.
//! Command-line flags are applied on top by the binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::transfer::TransferOptions;

const CONFIG_DIR_NAME: &str = ".trackhaul";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Root under which package directories are created (default: cwd).
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Revisit delay for each job in the poll loop.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up on a job after this many seconds (default: wait forever).
    #[serde(default)]
    pub max_wait_per_job_secs: Option<u64>,
    /// Exit non-zero when any track failed.
    #[serde(default)]
    pub strict_exit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            daemon: DaemonConfig::default(),
            output_dir: None,
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_per_job_secs: None,
            strict_exit: false,
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn max_wait_per_job(&self) -> Option<Duration> {
        self.max_wait_per_job_secs.map(Duration::from_secs)
    }
}

/// Where to find the catalog and how to talk to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog API, with trailing slash.
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Base URL cover thumbnails are relative to.
    #[serde(default)]
    pub image_base_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Extra request headers (Origin, Referer, ...).
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    #[serde(default)]
    pub cookies: IndexMap<String, String>,
}

/// aria2 RPC endpoint and per-kind transfer options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "TransferOptions::artwork")]
    pub artwork: TransferOptions,
    #[serde(default = "TransferOptions::track")]
    pub track: TransferOptions,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            secret: None,
            artwork: TransferOptions::artwork(),
            track: TransferOptions::track(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_rpc_url() -> String {
    "http://localhost:6800/jsonrpc".to_string()
}

/// `~/.trackhaul`. Only saving creates it.
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(CONFIG_DIR_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// Load `path`, falling back to defaults when it does not exist.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = serde_json::from_str(&content)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(config)
}

pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(config, &config_path()?)
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
