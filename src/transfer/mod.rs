// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Transfer daemon facade
//!
//! The orchestrator submits jobs and polls their state through
//! [`TransferClient`]. The client never retries: the daemon owns retries
//! and connection management.

mod aria2;

use std::path::Path;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::download::{JobId, JobState};
use crate::errors::{RpcError, SubmissionError};

pub use aria2::Aria2Client;

/// Per-job options handed to the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOptions {
    #[serde(default = "default_allow_overwrite")]
    pub allow_overwrite: bool,
    pub max_connection_per_server: u32,
    /// Size string as the daemon understands it (`1M`, `512K`).
    #[serde(default = "default_min_split_size")]
    pub min_split_size: String,
    #[serde(default)]
    pub split: Option<u32>,
}

fn default_allow_overwrite() -> bool {
    true
}

fn default_min_split_size() -> String {
    "1M".to_string()
}

impl TransferOptions {
    /// Cover art: small file, few connections.
    pub fn artwork() -> Self {
        Self {
            allow_overwrite: true,
            max_connection_per_server: 4,
            min_split_size: default_min_split_size(),
            split: None,
        }
    }

    pub fn track() -> Self {
        Self {
            allow_overwrite: true,
            max_connection_per_server: 16,
            min_split_size: default_min_split_size(),
            split: Some(8),
        }
    }

    /// Options map in the daemon's wire form. Every value is a string.
    pub fn to_daemon_options(&self, dir: &Path, out: &str) -> IndexMap<String, String> {
        let mut options = IndexMap::new();
        options.insert("dir".to_string(), dir.to_string_lossy().into_owned());
        options.insert("out".to_string(), out.to_string());
        options.insert("allow-overwrite".to_string(), self.allow_overwrite.to_string());
        options.insert(
            "max-connection-per-server".to_string(),
            self.max_connection_per_server.to_string(),
        );
        options.insert("min-split-size".to_string(), self.min_split_size.clone());
        if let Some(split) = self.split {
            options.insert("split".to_string(), split.to_string());
        }
        options
    }
}

/// Submission and status queries against a transfer daemon.
#[async_trait]
pub trait TransferClient: Send + Sync {
    /// Queue `uri` for download into `dir/out`.
    async fn submit(
        &self,
        uri: &str,
        dir: &Path,
        out: &str,
        options: &TransferOptions,
    ) -> Result<JobId, SubmissionError>;

    /// Current state of a previously submitted job.
    async fn status(&self, job: &JobId) -> Result<JobState, RpcError>;
}
