// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error taxonomy for a download run.
//!
//! Only [`CatalogError`] is fatal: it aborts the run before anything is
//! submitted. Everything else is recorded against a single slot and reported
//! once the batch is done.
//!
//! | Error               | Raised by          | Effect                          |
//! |---------------------|--------------------|---------------------------------|
//! | [`CatalogError`]    | plan builder       | run aborts, nothing submitted   |
//! | [`SubmissionError`] | transfer client    | slot counted as failed          |
//! | [`TransferFailure`] | orchestrator       | job lands in the failed set     |
//! | [`TagWriteError`]   | metadata stamper   | that file reported, others go on|

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ErrorBuilder;

// =============================================================================
// CATALOG
// =============================================================================

/// The catalog could not produce a usable plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A required setting (base URL, session token) is missing.
    NotConfigured(String),
    /// Network failure talking to the catalog API.
    Unreachable(String),
    /// The catalog answered, but refused the request.
    Rejected(String),
    /// The response did not have the expected shape.
    Malformed(String),
}

impl CatalogError {
    /// Render the error with causes and fixes for the terminal.
    pub fn to_user_message(&self) -> String {
        match self {
            Self::NotConfigured(what) => ErrorBuilder::new("Catalog not configured")
                .detail(what.as_str())
                .cause("No config file at ~/.trackhaul/config.json")
                .cause("The catalog section is missing a value")
                .fix("Set catalog.api_base_url, catalog.image_base_url and catalog.token")
                .fix("Or pass --token / TRACKHAUL_TOKEN for the session token")
                .build(),
            Self::Unreachable(msg) => ErrorBuilder::new("Catalog API unreachable")
                .detail(msg.as_str())
                .cause("No network connection")
                .cause("Wrong catalog.api_base_url")
                .fix("Check your connection and the configured base URL")
                .build(),
            Self::Rejected(msg) => ErrorBuilder::new("Catalog API rejected the request")
                .detail(msg.as_str())
                .cause("Session token expired or invalid")
                .cause("Package id does not exist")
                .fix("Refresh catalog.token")
                .fix("Double-check the package id")
                .build(),
            Self::Malformed(msg) => ErrorBuilder::new("Catalog returned malformed data")
                .detail(msg.as_str())
                .cause("Package id does not exist or has no tracks")
                .cause("The catalog API changed its response format")
                .fix("Double-check the package id")
                .build(),
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured(msg) => write!(f, "catalog not configured: {}", msg),
            Self::Unreachable(msg) => write!(f, "catalog unreachable: {}", msg),
            Self::Rejected(msg) => write!(f, "catalog rejected request: {}", msg),
            Self::Malformed(msg) => write!(f, "malformed catalog response: {}", msg),
        }
    }
}

impl std::error::Error for CatalogError {}

// =============================================================================
// TRANSFER DAEMON
// =============================================================================

/// A failed call to the transfer daemon's RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// Transport-level failure (connection refused, timeout).
    Unreachable(String),
    /// The daemon returned a JSON-RPC error object.
    Rpc { code: i64, message: String },
    /// The daemon answered with something that is not a JSON-RPC reply.
    InvalidResponse(String),
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(msg) => write!(f, "daemon unreachable: {}", msg),
            Self::Rpc { code, message } => write!(f, "daemon error {}: {}", code, message),
            Self::InvalidResponse(msg) => write!(f, "invalid daemon response: {}", msg),
        }
    }
}

impl std::error::Error for RpcError {}

/// The daemon refused a job at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionError {
    /// Destination filename of the rejected job.
    pub out: String,
    /// What the daemon said.
    pub cause: RpcError,
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not submit {}: {}", self.out, self.cause)
    }
}

impl std::error::Error for SubmissionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// A submitted job ended in a terminal state other than `complete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferFailure {
    /// The daemon reported a non-complete terminal status.
    Daemon {
        status: String,
        message: Option<String>,
    },
    /// The job stayed non-terminal past the configured maximum wait.
    TimedOut { waited: Duration },
}

impl fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daemon { status, message: Some(message) } => {
                write!(f, "transfer ended as {}: {}", status, message)
            }
            Self::Daemon { status, message: None } => write!(f, "transfer ended as {}", status),
            Self::TimedOut { waited } => {
                write!(f, "transfer still unfinished after {}s", waited.as_secs())
            }
        }
    }
}

impl std::error::Error for TransferFailure {}

// =============================================================================
// TAGGING
// =============================================================================

/// Writing tags to one downloaded file failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagWriteError {
    pub path: PathBuf,
    pub message: String,
}

impl TagWriteError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for TagWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to tag {}: {}", self.path.display(), self.message)
    }
}

impl std::error::Error for TagWriteError {}
