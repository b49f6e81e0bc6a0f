// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! One complete run: plan, download, tag.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::catalog::CatalogClient;
use crate::download::{CompletionReport, DownloadOrchestrator, JobEvent, OrchestratorConfig};
use crate::plan::{build_plan, Package};
use crate::tagging::{stamp, StampReport, TagWriter};
use crate::transfer::TransferClient;

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub package: Package,
    pub report: CompletionReport,
    pub stamp: StampReport,
}

impl RunOutcome {
    /// Returns true if any track is missing or untagged, or the cover failed.
    pub fn has_failures(&self) -> bool {
        self.report.has_failures() || self.stamp.tag_failed_count() > 0
    }
}

/// Download and tag `package_id` into `output_root`.
///
/// Catalog failures abort before anything is submitted and come back as a
/// [`CatalogError`](crate::errors::CatalogError) inside the `anyhow` error.
/// Per-file failures never abort; they are in the returned reports.
pub async fn run_package<C, T, W>(
    catalog: &C,
    daemon: &T,
    mut writer: W,
    package_id: u64,
    output_root: &Path,
    config: OrchestratorConfig,
    events: Option<mpsc::UnboundedSender<JobEvent>>,
) -> Result<RunOutcome>
where
    C: CatalogClient + ?Sized,
    T: TransferClient + ?Sized,
    W: TagWriter + Send + 'static,
{
    let mut package = build_plan(catalog, package_id, output_root).await?;

    let mut orchestrator = DownloadOrchestrator::new(daemon, config);
    if let Some(events) = events {
        orchestrator = orchestrator.with_events(events);
    }
    let report = orchestrator.run(&mut package).await;

    // Tag writes are blocking file I/O.
    let (package, report, stamp) = tokio::task::spawn_blocking(move || {
        let stamped = stamp(&package, &report, &mut writer);
        (package, report, stamped)
    })
    .await
    .context("Tagging task panicked")?;

    Ok(RunOutcome {
        package,
        report,
        stamp,
    })
}
