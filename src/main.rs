// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trackhaul::config::{load_config, load_config_from, save_config, save_config_to, Config};
use trackhaul::download::{JobEvent, JobOutcome, OrchestratorConfig};
use trackhaul::error::{format_error, format_simple_error};
use trackhaul::plan::{build_plan, Package};
use trackhaul::tagging::TrackOutcome;
use trackhaul::utils::mask_sensitive;
use trackhaul::{Aria2Client, CatalogError, HttpCatalog, LoftyTagWriter, RunOutcome, Session};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit codes following sysexits.h conventions
mod exit_codes {
    /// Success - run finished (failed tracks are reported, not fatal)
    pub const SUCCESS: i32 = 0;
    /// General error - unspecified error
    pub const ERROR: i32 = 1;
    /// Data error - catalog returned malformed data
    pub const DATA_ERR: i32 = 65;
    /// Service unavailable - catalog unreachable or refused the request
    pub const SERVICE_UNAVAILABLE: i32 = 69;
    /// Temporary failure - some files failed and --strict is set
    pub const TEMP_FAIL: i32 = 75;
    /// Configuration error - invalid or missing config
    pub const CONFIG: i32 = 78;
}

use exit_codes::*;

/// Progress bar helpers
mod progress {
    use indicatif::{ProgressBar, ProgressStyle};

    /// Bar whose length grows as jobs are accepted by the daemon.
    pub fn create(quiet: bool) -> ProgressBar {
        if quiet {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar
    }
}

#[derive(Parser)]
#[command(name = "trackhaul")]
#[command(version = VERSION)]
#[command(about = "Download a catalog release through aria2 and tag the tracks.")]
#[command(long_about = "trackhaul - release downloader\n\n\
    Download a package:  trackhaul 12345678\n\
    Preview the plan:    trackhaul 12345678 --plan-only\n\
    Custom output dir:   trackhaul 12345678 -o ~/Music\n\n\
    Needs an aria2 daemon running with --enable-rpc.\n\
    Configuration lives in ~/.trackhaul/config.json.")]
struct Cli {
    /// Catalog package id
    package_id: u64,

    /// Root directory for the package folder (default: current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// aria2 JSON-RPC endpoint
    #[arg(long, env = "TRACKHAUL_RPC_URL")]
    rpc_url: Option<String>,

    /// aria2 RPC secret (--rpc-secret of the daemon)
    #[arg(long, env = "TRACKHAUL_RPC_SECRET", hide_env_values = true)]
    rpc_secret: Option<String>,

    /// Catalog session token
    #[arg(long, env = "TRACKHAUL_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Use this config file instead of ~/.trackhaul/config.json
    #[arg(long)]
    config: Option<PathBuf>,

    /// Delay between two status checks of the same download
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Give up on a download after this many seconds
    #[arg(long)]
    job_timeout_secs: Option<u64>,

    /// Exit with status 75 if any file failed
    #[arg(long)]
    strict: bool,

    /// Resolve and print the plan without downloading
    #[arg(long)]
    plan_only: bool,

    /// Write the effective settings (config file plus flags) back to the config file
    #[arg(long)]
    save_config: bool,

    /// Verbose mode: debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: no progress bar, warnings only
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Command-line values win over the config file.
    fn apply_to(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.output_dir = Some(output.clone());
        }
        if let Some(url) = &self.rpc_url {
            config.daemon.rpc_url = url.clone();
        }
        if let Some(secret) = &self.rpc_secret {
            config.daemon.secret = Some(secret.clone());
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(secs) = self.job_timeout_secs {
            config.max_wait_per_job_secs = Some(secs);
        }
        if self.strict {
            config.strict_exit = true;
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "trackhaul=debug"
    } else if quiet {
        "trackhaul=warn"
    } else {
        "trackhaul=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let code = match run(&cli) {
        Ok(code) => code,
        Err(err) => report_fatal(&err),
    };
    std::process::exit(code);
}

/// Print a fatal error and pick the exit code for it.
fn report_fatal(err: &anyhow::Error) -> i32 {
    if let Some(catalog) = err.downcast_ref::<CatalogError>() {
        eprintln!("{}", catalog.to_user_message());
        return match catalog {
            CatalogError::NotConfigured(_) => CONFIG,
            CatalogError::Malformed(_) => DATA_ERR,
            CatalogError::Unreachable(_) | CatalogError::Rejected(_) => SERVICE_UNAVAILABLE,
        };
    }

    let causes: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
    if causes.is_empty() {
        eprintln!("{}", format_simple_error(&err.to_string()));
    } else {
        let causes: Vec<&str> = causes.iter().map(String::as_str).collect();
        eprintln!("{}", format_error(&err.to_string(), &causes, &[]));
    }
    ERROR
}

fn load(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    cli.apply_to(&mut config);
    Ok(config)
}

fn run(cli: &Cli) -> Result<i32> {
    let config = match load(cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!(
                "{}",
                format_error(
                    &format!("Could not load configuration: {:#}", err),
                    &["The config file is not valid JSON", "A field has the wrong type"],
                    &["Fix or delete ~/.trackhaul/config.json", "Or point --config at another file"],
                )
            );
            return Ok(CONFIG);
        }
    };

    if cli.save_config {
        match &cli.config {
            Some(path) => save_config_to(&config, path)?,
            None => save_config(&config)?,
        }
        tracing::info!("Saved configuration");
    }

    let session = Session::from_config(&config.catalog, cli.token.as_deref())?;
    tracing::debug!(session = ?session, "Catalog session");
    let catalog = HttpCatalog::from_config(&config.catalog, &session)?;
    let output_root = match &config.output_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Could not determine current directory")?,
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;

    if cli.plan_only {
        let package = runtime.block_on(build_plan(&catalog, cli.package_id, &output_root))?;
        print_plan(&package);
        return Ok(SUCCESS);
    }

    let daemon = Aria2Client::new(config.daemon.rpc_url.clone(), config.daemon.secret.clone())?;
    tracing::info!(
        rpc_url = %daemon.rpc_url(),
        secret = %config.daemon.secret.as_deref().map(|s| mask_sensitive(s, 2)).unwrap_or_default(),
        "Using aria2 daemon"
    );

    let quiet = cli.quiet;
    let outcome = runtime.block_on(async {
        let (tx, rx) = mpsc::unbounded_channel();
        let progress = tokio::spawn(render_progress(rx, quiet));
        let outcome = trackhaul::run_package(
            &catalog,
            &daemon,
            LoftyTagWriter::new(),
            cli.package_id,
            &output_root,
            OrchestratorConfig::from_config(&config),
            Some(tx),
        )
        .await;
        let _ = progress.await;
        outcome
    })?;

    print_summary(&outcome);

    if outcome.has_failures() && config.strict_exit {
        Ok(TEMP_FAIL)
    } else {
        Ok(SUCCESS)
    }
}

async fn render_progress(mut events: mpsc::UnboundedReceiver<JobEvent>, quiet: bool) {
    let bar = progress::create(quiet);
    bar.enable_steady_tick(std::time::Duration::from_millis(120));

    while let Some(event) = events.recv().await {
        match event {
            JobEvent::Submitted { slot, .. } => {
                bar.inc_length(1);
                bar.set_message(format!("queued {}", slot));
            }
            JobEvent::Rejected { slot, .. } => {
                bar.println(format!("{} {} rejected by daemon", "[✗]".red(), slot));
            }
            JobEvent::Finished { slot, outcome, .. } => {
                bar.inc(1);
                if let JobOutcome::Failed(failure) = outcome {
                    bar.println(format!("{} {}: {}", "[✗]".red(), slot, failure));
                }
            }
        }
    }
    bar.finish_and_clear();
}

fn print_plan(package: &Package) {
    println!("{} {} - {}", "Package:".bold(), package.title, package.artist);
    println!("  Release:   {}", package.release);
    println!("  Directory: {}", package.directory.display());
    println!("  Cover:     {} <- {}", package.artwork.file_name, package.artwork.url);
    for disc in &package.discs {
        println!("  {}", format!("Disc {}", disc.index + 1).cyan());
        for track in &disc.tracks {
            println!("    {}", track.file_name);
            println!("      {}", track.download_uri.dimmed());
        }
    }
}

fn print_summary(outcome: &RunOutcome) {
    let package = &outcome.package;
    println!();
    println!("{} {} - {}", "Finished".bold(), package.title, package.artist);
    println!("  {}", package.directory.display().to_string().dimmed());

    for result in outcome.stamp.failures() {
        match &result.outcome {
            TrackOutcome::DownloadFailed => {
                println!("{} {} download failed.", "[✗]".red(), result.file_name);
            }
            TrackOutcome::TagFailed(err) => {
                println!("{} {}", "[!]".yellow(), err);
            }
            TrackOutcome::Tagged => {}
        }
    }

    if !outcome.stamp.artwork_embedded && outcome.stamp.tagged_count() > 0 {
        println!("{} Cover art unavailable, tracks tagged without it", "[!]".yellow());
    }

    let total = package.track_count();
    let tagged = outcome.stamp.tagged_count();
    let line = format!("{}/{} tracks downloaded and tagged", tagged, total);
    if tagged == total {
        println!("{} {}", "[OK]".green(), line);
    } else {
        println!("{} {}", "[!]".yellow(), line);
    }
}
