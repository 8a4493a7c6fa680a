//! Trackpoint — replays a scripted browsing session through the capture
//! pipeline and delivers the resulting envelopes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use trackpoint_core::delivery::CaptureBeacon;
use trackpoint_core::{Beacon, TrackerOptions};
use trackpoint_web_sdk::{HttpBeacon, Scenario};

#[derive(Parser, Debug)]
#[command(name = "trackpoint")]
#[command(about = "Replay a scripted page session through the telemetry tracker")]
#[command(version)]
struct Cli {
    /// Scenario file (JSON)
    scenario: PathBuf,

    /// Tracker options file; `TRACKPOINT__*` environment variables apply on top
    #[arg(long)]
    config: Option<PathBuf>,

    /// Collection endpoint (overrides config and scenario)
    #[arg(long, env = "TRACKPOINT__REQUESTURL")]
    request_url: Option<String>,

    /// Print envelopes instead of sending them
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// How long to wait for in-flight beacons before exiting
    #[arg(long, default_value_t = 500)]
    linger_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trackpoint=info,trackpoint_web_sdk=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => TrackerOptions::load_from(path)
            .with_context(|| format!("loading options from {}", path.display()))?,
        None => TrackerOptions::load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load options from environment, using defaults");
            TrackerOptions::default()
        }),
    };

    let text = tokio::fs::read_to_string(&cli.scenario)
        .await
        .with_context(|| format!("reading scenario {}", cli.scenario.display()))?;
    let mut scenario = Scenario::from_json(&text).context("parsing scenario")?;

    // loaded options < scenario options < command line
    let mut options = loaded.overlay(scenario.options.clone());
    if let Some(url) = cli.request_url {
        options.request_url = Some(url);
    }
    scenario.options = options;

    info!(
        scenario = %cli.scenario.display(),
        page = %scenario.url,
        steps = scenario.steps.len(),
        dry_run = cli.dry_run,
        "Replaying scenario"
    );

    if cli.dry_run {
        let capture = Arc::new(CaptureBeacon::new());
        let summary = scenario.run(capture.clone(), None)?;
        for envelope in capture.envelopes() {
            println!("{}", serde_json::to_string(&envelope)?);
        }
        info!(
            applied = summary.applied,
            skipped = summary.skipped,
            envelopes = capture.count(),
            "Dry run complete"
        );
        return Ok(());
    }

    let beacon: Arc<dyn Beacon> = Arc::new(HttpBeacon::new()?);
    let summary = scenario.run(beacon, None)?;
    info!(
        applied = summary.applied,
        skipped = summary.skipped,
        "Scenario replayed, waiting for in-flight beacons"
    );

    tokio::time::sleep(Duration::from_millis(cli.linger_ms)).await;
    Ok(())
}
