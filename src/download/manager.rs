// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Download orchestrator: submits a package's jobs and polls them to completion.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::{RpcError, SubmissionError, TransferFailure};
use crate::plan::{Package, Slot};
use crate::transfer::{TransferClient, TransferOptions};

use super::queue::PollQueue;
use super::report::CompletionReport;
use super::types::{JobEvent, JobId, JobOutcome, JobState};

/// Polling and submission settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Minimum delay between two status queries for the same job.
    pub poll_interval: Duration,
    /// Give up on a job that stays non-terminal this long after submission.
    pub max_wait_per_job: Option<Duration>,
    pub artwork_options: TransferOptions,
    pub track_options: TransferOptions,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_wait_per_job: None,
            artwork_options: TransferOptions::artwork(),
            track_options: TransferOptions::track(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            max_wait_per_job: config.max_wait_per_job(),
            artwork_options: config.daemon.artwork.clone(),
            track_options: config.daemon.track.clone(),
        }
    }
}

/// Drives every job of one package through the transfer daemon.
///
/// Runs on a single task: submission is sequential (artwork first, then
/// tracks in disc/track order) and the only suspension point besides the
/// RPC calls is the sleep until the next job becomes eligible for polling.
pub struct DownloadOrchestrator<'a, T: TransferClient + ?Sized> {
    client: &'a T,
    config: OrchestratorConfig,
    events: Option<mpsc::UnboundedSender<JobEvent>>,
}

impl<'a, T: TransferClient + ?Sized> DownloadOrchestrator<'a, T> {
    pub fn new(client: &'a T, config: OrchestratorConfig) -> Self {
        Self {
            client,
            config,
            events: None,
        }
    }

    /// Send a [`JobEvent`] for every submission and terminal state.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<JobEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Submit all jobs, record their ids on the package and wait for every
    /// accepted job to reach a terminal state.
    pub async fn run(&self, package: &mut Package) -> CompletionReport {
        let mut report = CompletionReport::new();
        let mut queue = PollQueue::new(self.config.poll_interval);
        let mut slots: HashMap<JobId, Slot> = HashMap::with_capacity(package.job_count());
        let directory = package.directory.clone();

        let artwork = self
            .client
            .submit(
                &package.artwork.url,
                &directory,
                &package.artwork.file_name,
                &self.config.artwork_options,
            )
            .await;
        package.artwork.job = self.accept(
            Slot::Artwork,
            &package.artwork.file_name,
            artwork,
            &mut queue,
            &mut slots,
            &mut report,
        );

        for track in package.tracks_mut() {
            let result = self
                .client
                .submit(
                    &track.download_uri,
                    &directory,
                    &track.file_name,
                    &self.config.track_options,
                )
                .await;
            let slot = track.slot();
            track.job = self.accept(
                slot,
                &track.file_name,
                result,
                &mut queue,
                &mut slots,
                &mut report,
            );
        }

        info!(
            submitted = queue.len(),
            rejected = report.rejected().len(),
            "Waiting for downloads to complete"
        );

        while let Some(entry) = queue.pop() {
            sleep_until(entry.eligible_at).await;

            let outcome = match self.client.status(&entry.job).await {
                Ok(state) if state.is_terminal() => Some(match state.into_failure() {
                    Some(failure) => JobOutcome::Failed(failure),
                    None => JobOutcome::Succeeded,
                }),
                Ok(state) => {
                    debug!(job = %entry.job, state = ?state, "Still running");
                    None
                }
                Err(err) => {
                    warn!(job = %entry.job, error = %err, "Status query failed, will ask again");
                    None
                }
            };

            let now = Instant::now();
            let outcome = match (outcome, self.config.max_wait_per_job) {
                (Some(outcome), _) => outcome,
                (None, Some(limit)) if entry.waited(now) >= limit => {
                    JobOutcome::Failed(TransferFailure::TimedOut {
                        waited: entry.waited(now),
                    })
                }
                (None, _) => {
                    queue.requeue(entry, now);
                    continue;
                }
            };

            if let Some(&slot) = slots.get(&entry.job) {
                match &outcome {
                    JobOutcome::Succeeded => {
                        debug!(job = %entry.job, file = %package.slot_name(slot), "Download complete")
                    }
                    JobOutcome::Failed(failure) => {
                        warn!(job = %entry.job, file = %package.slot_name(slot), "{}", failure)
                    }
                }
                self.emit(JobEvent::Finished {
                    slot,
                    job: entry.job.clone(),
                    outcome: outcome.clone(),
                });
            }
            report.record(entry.job, outcome);
        }

        report
    }

    fn accept(
        &self,
        slot: Slot,
        out: &str,
        result: Result<JobId, SubmissionError>,
        queue: &mut PollQueue,
        slots: &mut HashMap<JobId, Slot>,
        report: &mut CompletionReport,
    ) -> Option<JobId> {
        // A gid already handed out for another slot would break the job/slot pairing.
        let result = match result {
            Ok(job) if slots.contains_key(&job) => Err(SubmissionError {
                out: out.to_string(),
                cause: RpcError::InvalidResponse(format!(
                    "job id {} already assigned to {}",
                    job, slots[&job]
                )),
            }),
            other => other,
        };
        match result {
            Ok(job) => {
                info!(job = %job, slot = %slot, "Submitted download");
                queue.push_new(job.clone(), Instant::now());
                slots.insert(job.clone(), slot);
                self.emit(JobEvent::Submitted {
                    slot,
                    job: job.clone(),
                });
                Some(job)
            }
            Err(error) => {
                warn!(slot = %slot, "{}", error);
                self.emit(JobEvent::Rejected {
                    slot,
                    error: error.clone(),
                });
                report.record_rejection(slot, error);
                None
            }
        }
    }

    fn emit(&self, event: JobEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Artwork, Disc, Track};
    use async_trait::async_trait;
    use std::collections::{HashSet, VecDeque};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Daemon double: gids are `gid-{out}` and each file follows a script of
    /// states, repeating the last one once exhausted. Unscripted files complete.
    #[derive(Default)]
    struct ScriptedDaemon {
        reject: HashSet<String>,
        scripts: Mutex<HashMap<String, VecDeque<Result<JobState, RpcError>>>>,
        submitted: Mutex<Vec<(String, String, TransferOptions)>>,
        polls: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedDaemon {
        fn script(self, out: &str, states: Vec<Result<JobState, RpcError>>) -> Self {
            self.scripts.lock().unwrap().insert(out.to_string(), states.into());
            self
        }

        fn rejecting(mut self, out: &str) -> Self {
            self.reject.insert(out.to_string());
            self
        }

        fn polls_for(&self, out: &str) -> Vec<Instant> {
            self.polls
                .lock()
                .unwrap()
                .iter()
                .filter(|(name, _)| name == out)
                .map(|(_, at)| *at)
                .collect()
        }
    }

    #[async_trait]
    impl TransferClient for ScriptedDaemon {
        async fn submit(
            &self,
            uri: &str,
            _dir: &Path,
            out: &str,
            options: &TransferOptions,
        ) -> Result<JobId, SubmissionError> {
            if self.reject.contains(out) {
                return Err(SubmissionError {
                    out: out.to_string(),
                    cause: RpcError::Rpc { code: 1, message: "rejected".into() },
                });
            }
            self.submitted
                .lock()
                .unwrap()
                .push((uri.to_string(), out.to_string(), options.clone()));
            Ok(JobId::new(format!("gid-{}", out)))
        }

        async fn status(&self, job: &JobId) -> Result<JobState, RpcError> {
            let out = job.as_str().trim_start_matches("gid-").to_string();
            self.polls.lock().unwrap().push((out.clone(), Instant::now()));
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(&out) {
                Some(script) if script.len() > 1 => script.pop_front().unwrap(),
                Some(script) => script.front().cloned().unwrap(),
                None => Ok(JobState::Complete),
            }
        }
    }

    fn failed(status: &str) -> Result<JobState, RpcError> {
        Ok(JobState::Failed { status: status.into(), message: None })
    }

    fn package(discs: &[usize]) -> Package {
        let disc_count = discs.len();
        Package {
            package_id: 1,
            title: "Album".into(),
            artist: "Artist".into(),
            release: "20200101".into(),
            copyright: String::new(),
            directory: PathBuf::from("/music/album"),
            artwork: Artwork {
                url: "https://img.test/cover_640_640.jpg".into(),
                file_name: "cover.jpg".into(),
                job: None,
            },
            discs: discs
                .iter()
                .enumerate()
                .map(|(d, &count)| Disc {
                    index: d,
                    tracks: (0..count)
                        .map(|t| Track {
                            title: format!("T{}{}", d, t),
                            artist: "Artist".into(),
                            album: "Album".into(),
                            tieup: None,
                            media_id: format!("m{}{}", d, t),
                            download_uri: format!("https://media.test/{}/{}/", d, t),
                            file_name: format!("{}.{:02}.m4a", d + 1, t + 1),
                            disc_index: d,
                            track_index: t,
                            disc_track_count: count,
                            disc_count,
                            job: None,
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig::default()
    }

    #[tokio::test(start_paused = true)]
    async fn test_submits_artwork_first_then_tracks_in_order() {
        let daemon = ScriptedDaemon::default();
        let mut package = package(&[2, 1]);
        let report = DownloadOrchestrator::new(&daemon, config()).run(&mut package).await;

        let submitted = daemon.submitted.lock().unwrap();
        let outs: Vec<_> = submitted.iter().map(|(_, out, _)| out.as_str()).collect();
        assert_eq!(outs, vec!["cover.jpg", "1.01.m4a", "1.02.m4a", "2.01.m4a"]);
        assert_eq!(submitted[0].2, TransferOptions::artwork());
        assert_eq!(submitted[1].2, TransferOptions::track());
        assert_eq!(submitted[3].0, "https://media.test/1/0/");

        assert_eq!(report.succeeded().len(), 4);
        assert!(!report.has_failures());
        assert_eq!(package.artwork.job, Some(JobId::new("gid-cover.jpg")));
        assert!(package.tracks().all(|t| t.job.is_some()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_submitted_job_lands_in_exactly_one_set() {
        let daemon = ScriptedDaemon::default()
            .script("1.01.m4a", vec![Ok(JobState::Active), Ok(JobState::Complete)])
            .script("1.02.m4a", vec![Ok(JobState::Waiting), failed("error")])
            .script("2.01.m4a", vec![failed("removed")])
            .script("cover.jpg", vec![Ok(JobState::Active), Ok(JobState::Active), Ok(JobState::Complete)]);
        let mut package = package(&[2, 1]);
        let report = DownloadOrchestrator::new(&daemon, config()).run(&mut package).await;

        assert_eq!(report.submitted_count(), package.job_count());
        let succeeded: HashSet<_> = report.succeeded().iter().cloned().collect();
        let failed: HashSet<_> = report.failed().keys().cloned().collect();
        assert!(succeeded.is_disjoint(&failed));
        assert_eq!(succeeded.len() + failed.len(), 4);

        assert!(report.is_succeeded(&JobId::new("gid-cover.jpg")));
        assert!(report.is_succeeded(&JobId::new("gid-1.01.m4a")));
        assert_eq!(
            report.failure(&JobId::new("gid-1.02.m4a")),
            Some(&TransferFailure::Daemon { status: "error".into(), message: None })
        );
        assert!(report.failure(&JobId::new("gid-2.01.m4a")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_delay_is_per_job_not_global() {
        let daemon = ScriptedDaemon::default()
            .script("cover.jpg", vec![Ok(JobState::Active), Ok(JobState::Complete)])
            .script("1.01.m4a", vec![Ok(JobState::Active), Ok(JobState::Complete)])
            .script("1.02.m4a", vec![Ok(JobState::Active), Ok(JobState::Complete)]);
        let mut package = package(&[2]);
        let start = Instant::now();
        DownloadOrchestrator::new(&daemon, config()).run(&mut package).await;

        // Three jobs each needing one revisit finish after one interval, not three.
        assert_eq!(Instant::now() - start, Duration::from_secs(1));
        for out in ["cover.jpg", "1.01.m4a", "1.02.m4a"] {
            let polls = daemon.polls_for(out);
            assert_eq!(polls.len(), 2);
            assert!(polls[1] - polls[0] >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_errors_are_retried() {
        let daemon = ScriptedDaemon::default().script(
            "1.01.m4a",
            vec![
                Err(RpcError::Unreachable("connection reset".into())),
                Ok(JobState::Complete),
            ],
        );
        let mut package = package(&[1]);
        let report = DownloadOrchestrator::new(&daemon, config()).run(&mut package).await;

        assert!(report.is_succeeded(&JobId::new("gid-1.01.m4a")));
        assert_eq!(daemon.polls_for("1.01.m4a").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_submission_never_polled() {
        let daemon = ScriptedDaemon::default().rejecting("cover.jpg");
        let mut package = package(&[1]);
        let report = DownloadOrchestrator::new(&daemon, config()).run(&mut package).await;

        assert_eq!(package.artwork.job, None);
        assert!(report.rejected().contains_key(&Slot::Artwork));
        assert_eq!(report.submitted_count(), 1);
        assert!(daemon.polls_for("cover.jpg").is_empty());
        assert!(report.has_failures());
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_times_out_when_limit_configured() {
        let daemon = ScriptedDaemon::default().script("1.01.m4a", vec![Ok(JobState::Active)]);
        let mut package = package(&[1]);
        let config = OrchestratorConfig {
            max_wait_per_job: Some(Duration::from_secs(5)),
            ..config()
        };
        let report = DownloadOrchestrator::new(&daemon, config).run(&mut package).await;

        assert_eq!(
            report.failure(&JobId::new("gid-1.01.m4a")),
            Some(&TransferFailure::TimedOut { waited: Duration::from_secs(5) })
        );
        assert!(report.is_succeeded(&JobId::new("gid-cover.jpg")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_cover_every_slot() {
        let daemon = ScriptedDaemon::default()
            .rejecting("1.02.m4a")
            .script("1.01.m4a", vec![failed("error")]);
        let mut package = package(&[2]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        DownloadOrchestrator::new(&daemon, config())
            .with_events(tx)
            .run(&mut package)
            .await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        let submitted = events.iter().filter(|e| matches!(e, JobEvent::Submitted { .. })).count();
        let terminal: HashSet<Slot> = events.iter().filter(|e| e.is_terminal()).map(|e| e.slot()).collect();
        assert_eq!(submitted, 2);
        assert_eq!(terminal.len(), 3);
        assert!(events.iter().any(|e| matches!(
            e,
            JobEvent::Finished { slot: Slot::Track { disc: 0, track: 0 }, outcome: JobOutcome::Failed(_), .. }
        )));
    }

    /// Daemon that hands out the same gid for every submission.
    struct RepeatingGidDaemon;

    #[async_trait]
    impl TransferClient for RepeatingGidDaemon {
        async fn submit(
            &self,
            _uri: &str,
            _dir: &Path,
            _out: &str,
            _options: &TransferOptions,
        ) -> Result<JobId, SubmissionError> {
            Ok(JobId::new("gid-same"))
        }

        async fn status(&self, _job: &JobId) -> Result<JobState, RpcError> {
            Ok(JobState::Complete)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_gid_rejects_later_slot() {
        let mut package = package(&[1]);
        let report = DownloadOrchestrator::new(&RepeatingGidDaemon, config())
            .run(&mut package)
            .await;

        assert_eq!(package.artwork.job, Some(JobId::new("gid-same")));
        assert_eq!(package.discs[0].tracks[0].job, None);
        assert_eq!(report.submitted_count(), 1);
        assert!(report.is_succeeded(&JobId::new("gid-same")));

        let rejection = &report.rejected()[&Slot::Track { disc: 0, track: 0 }];
        assert_eq!(rejection.out, "1.01.m4a");
        assert!(matches!(rejection.cause, RpcError::InvalidResponse(_)));
        assert!(report.has_failures());
    }
}
