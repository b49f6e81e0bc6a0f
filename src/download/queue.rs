// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Round-robin poll queue with per-job revisit delays.
//!
//! The queue never reads the clock itself; callers pass `now`. Entries are
//! re-queued at the back with `eligible_at = now + interval`, so the front
//! entry always carries the earliest eligible time.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use super::types::JobId;

/// A job waiting to be polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollEntry {
    pub job: JobId,
    /// When the job was handed to the daemon.
    pub submitted_at: Instant,
    /// Earliest time the job may be polled again.
    pub eligible_at: Instant,
}

impl PollEntry {
    /// How long the job has been outstanding at `now`.
    pub fn waited(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.submitted_at)
    }
}

/// FIFO of outstanding job ids.
#[derive(Debug)]
pub struct PollQueue {
    entries: VecDeque<PollEntry>,
    interval: Duration,
}

impl PollQueue {
    pub fn new(interval: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            interval,
        }
    }

    /// Add a freshly submitted job; it is eligible immediately.
    pub fn push_new(&mut self, job: JobId, now: Instant) {
        self.entries.push_back(PollEntry {
            job,
            submitted_at: now,
            eligible_at: now,
        });
    }

    /// Take the job at the front of the queue.
    pub fn pop(&mut self) -> Option<PollEntry> {
        self.entries.pop_front()
    }

    /// Put a still-running job at the back, not eligible before `now + interval`.
    pub fn requeue(&mut self, mut entry: PollEntry, now: Instant) {
        entry.eligible_at = now + self.interval;
        self.entries.push_back(entry);
    }

    pub fn next_eligible_at(&self) -> Option<Instant> {
        self.entries.front().map(|e| e.eligible_at)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
