// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Job types shared by the transfer client and the orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{SubmissionError, TransferFailure};
use crate::plan::Slot;

/// Opaque job identifier issued by the transfer daemon (an aria2 GID).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a job as observed through the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Queued inside the daemon
    Waiting,
    /// Currently transferring
    Active,
    /// Successfully completed
    Complete,
    /// Any other daemon status (`error`, `removed`, `paused`, ...)
    Failed {
        status: String,
        message: Option<String>,
    },
}

impl JobState {
    /// Map a raw daemon status string to a state.
    ///
    /// Only `waiting` and `active` keep a job in the poll loop. A paused job
    /// will not progress without outside help, so it counts as failed.
    pub fn from_daemon(status: &str, message: Option<String>) -> Self {
        match status {
            "waiting" => Self::Waiting,
            "active" => Self::Active,
            "complete" => Self::Complete,
            other => Self::Failed {
                status: other.to_string(),
                message,
            },
        }
    }

    /// Returns true if no further transition will happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed { .. })
    }

    /// Converts a failed terminal state into the failure recorded in the report.
    pub fn into_failure(self) -> Option<TransferFailure> {
        match self {
            Self::Failed { status, message } => Some(TransferFailure::Daemon { status, message }),
            _ => None,
        }
    }
}

/// Final outcome of one submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed(TransferFailure),
}

/// Progress notifications emitted by the orchestrator.
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// A job was accepted by the daemon.
    Submitted { slot: Slot, job: JobId },
    /// The daemon refused the job; it never enters the poll loop.
    Rejected { slot: Slot, error: SubmissionError },
    /// A job reached a terminal state.
    Finished {
        slot: Slot,
        job: JobId,
        outcome: JobOutcome,
    },
}

impl JobEvent {
    pub fn slot(&self) -> Slot {
        match self {
            Self::Submitted { slot, .. } | Self::Rejected { slot, .. } | Self::Finished { slot, .. } => {
                *slot
            }
        }
    }

    /// Returns true once nothing more will be reported for this slot.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Submitted { .. })
    }
}
