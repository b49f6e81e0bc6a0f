// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Download orchestration for trackhaul
//!
//! Takes a resolved [`Package`](crate::plan::Package), submits one job per
//! slot to the transfer daemon and polls until every accepted job is done.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐  submit / status  ┌─────────────────┐
//! │ DownloadOrchestrator│──────────────────▶│ TransferClient  │
//! │  (single task)      │                   │ (aria2 RPC)     │
//! └────────┬────────────┘                   └─────────────────┘
//!          │ PollQueue (per-job revisit delay)
//!          ▼
//! ┌─────────────────────┐
//! │ CompletionReport    │──▶ metadata stamper
//! └─────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use trackhaul::download::{DownloadOrchestrator, OrchestratorConfig};
//! use trackhaul::transfer::Aria2Client;
//!
//! # async fn example(mut package: trackhaul::plan::Package) -> anyhow::Result<()> {
//! let daemon = Aria2Client::new("http://localhost:6800/jsonrpc", None)?;
//! let report = DownloadOrchestrator::new(&daemon, OrchestratorConfig::default())
//!     .run(&mut package)
//!     .await;
//! println!("{} downloaded", report.succeeded().len());
//! # Ok(())
//! # }
//! ```

pub mod manager;
pub mod queue;
pub mod report;
pub mod types;

pub use manager::{DownloadOrchestrator, OrchestratorConfig};
pub use queue::{PollEntry, PollQueue};
pub use report::CompletionReport;
pub use types::{JobEvent, JobId, JobOutcome, JobState};
