// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! trackhaul - release downloader library
//!
//! Resolves a catalog package into a download plan, hands every file to an
//! aria2 daemon, waits for the batch and tags the finished tracks.
//!
//! **Catalog** -> **Plan** -> **Transfer daemon** -> **Tags**
//!
//! # Core Modules
//!
//! - [`catalog`] - Catalog API client (package metadata, download URIs)
//! - [`plan`] - Package/Disc/Track plan, filenames and directory names
//! - [`transfer`] - Transfer daemon facade and the aria2 JSON-RPC client
//! - [`download`] - Orchestrator, poll queue and completion report
//! - [`tagging`] - Metadata stamper and tag writers
//! - [`pipeline`] - The whole run, end to end
//! - [`config`] / [`session`] - Configuration file and catalog session
//! - [`errors`] / [`error`] - Error taxonomy and user-facing formatting

pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod errors;
pub mod pipeline;
pub mod plan;
pub mod session;
pub mod tagging;
pub mod transfer;
pub mod utils;

pub use catalog::{CatalogClient, HttpCatalog};
pub use config::Config;
pub use download::{CompletionReport, DownloadOrchestrator, JobEvent, JobId, OrchestratorConfig};
pub use errors::{CatalogError, RpcError, SubmissionError, TagWriteError, TransferFailure};
pub use pipeline::{run_package, RunOutcome};
pub use plan::{build_plan, Package, Slot};
pub use session::Session;
pub use tagging::{stamp, LoftyTagWriter, StampReport, TagWriter};
pub use transfer::{Aria2Client, TransferClient, TransferOptions};
