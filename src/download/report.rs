// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Completion report handed from the orchestrator to the metadata stamper.

use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{SubmissionError, TransferFailure};
use crate::plan::Slot;

use super::types::{JobId, JobOutcome};

/// Partition of every submitted job into succeeded and failed.
///
/// Only the orchestrator can build one, and only after every submitted job
/// reached a terminal state, so a report in hand is always complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    succeeded: BTreeSet<JobId>,
    failed: BTreeMap<JobId, TransferFailure>,
    rejected: BTreeMap<Slot, SubmissionError>,
}

impl CompletionReport {
    pub(crate) fn new() -> Self {
        Self {
            succeeded: BTreeSet::new(),
            failed: BTreeMap::new(),
            rejected: BTreeMap::new(),
        }
    }

    pub(crate) fn record(&mut self, job: JobId, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Succeeded => {
                self.failed.remove(&job);
                self.succeeded.insert(job);
            }
            JobOutcome::Failed(failure) => {
                self.succeeded.remove(&job);
                self.failed.insert(job, failure);
            }
        }
    }

    pub(crate) fn record_rejection(&mut self, slot: Slot, error: SubmissionError) {
        self.rejected.insert(slot, error);
    }

    pub fn succeeded(&self) -> &BTreeSet<JobId> {
        &self.succeeded
    }

    pub fn failed(&self) -> &BTreeMap<JobId, TransferFailure> {
        &self.failed
    }

    /// Slots the daemon refused at submission time.
    pub fn rejected(&self) -> &BTreeMap<Slot, SubmissionError> {
        &self.rejected
    }

    pub fn is_succeeded(&self, job: &JobId) -> bool {
        self.succeeded.contains(job)
    }

    pub fn failure(&self, job: &JobId) -> Option<&TransferFailure> {
        self.failed.get(job)
    }

    /// Jobs the daemon accepted (succeeded + failed).
    pub fn submitted_count(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Returns true if any slot ended up without a downloaded file.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty() || !self.rejected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RpcError;

    #[test]
    fn test_record_partitions_jobs() {
        let mut report = CompletionReport::new();
        report.record(JobId::new("a"), JobOutcome::Succeeded);
        report.record(
            JobId::new("b"),
            JobOutcome::Failed(TransferFailure::Daemon { status: "error".into(), message: None }),
        );

        assert!(report.is_succeeded(&JobId::new("a")));
        assert!(!report.is_succeeded(&JobId::new("b")));
        assert!(report.failure(&JobId::new("b")).is_some());
        assert_eq!(report.submitted_count(), 2);
        assert!(report.has_failures());
    }

    #[test]
    fn test_job_never_in_both_sets() {
        let mut report = CompletionReport::new();
        let job = JobId::new("a");
        report.record(
            job.clone(),
            JobOutcome::Failed(TransferFailure::Daemon { status: "removed".into(), message: None }),
        );
        report.record(job.clone(), JobOutcome::Succeeded);

        assert!(report.is_succeeded(&job));
        assert!(report.failure(&job).is_none());
        assert_eq!(report.submitted_count(), 1);
    }

    #[test]
    fn test_rejections_count_as_failures_but_not_submissions() {
        let mut report = CompletionReport::new();
        report.record_rejection(
            Slot::Artwork,
            SubmissionError {
                out: "cover.jpg".into(),
                cause: RpcError::Unreachable("connection refused".into()),
            },
        );

        assert_eq!(report.submitted_count(), 0);
        assert!(report.has_failures());
        assert!(report.rejected().contains_key(&Slot::Artwork));
    }
}
