//! Terminal front-end for the generation tracker.
//!
//! Submits source text to the generation backend, renders the live log and
//! progress transitions while the job runs, and finishes by writing the
//! video to disk (binary artifacts) or printing its URL (remote artifacts).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use reel_client::{JobClient, JobClientConfig};
use reel_models::Artifact;
use reel_tracker::{GenerationTracker, TrackerConfig};

/// Generate a short video from source text and track it to completion.
#[derive(Parser, Debug)]
#[command(name = "reelgen", version, about)]
struct Args {
    /// Source text to turn into a video
    content: Option<String>,

    /// Read source text from a file instead
    #[arg(long, conflicts_with = "content")]
    file: Option<PathBuf>,

    /// Generation backend base URL (overrides REEL_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Where to write the video when the backend returns it inline
    #[arg(long, short, default_value = "reel_output.mp4")]
    output: PathBuf,

    /// Polling cadence in seconds after push-channel failover
    #[arg(long)]
    poll_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let content = resolve_content(&args).await?;

    let mut client_config = JobClientConfig::from_env();
    if let Some(url) = args.api_url {
        client_config.base_url = url;
    }
    let client = JobClient::new(client_config).context("failed to build backend client")?;

    let mut tracker_config = TrackerConfig::from_env();
    if let Some(secs) = args.poll_interval {
        tracker_config.poll_interval = Duration::from_secs(secs);
    }

    let mut tracker = GenerationTracker::new(client, tracker_config);
    let watch = tracker.subscribe();
    let printer = tokio::spawn(render_updates(watch));

    let artifact = tracker.generate(&content).await?;

    // Dropping the tracker closes the watch channel and ends the renderer.
    drop(tracker);
    printer.await.ok();

    match artifact {
        Artifact::Media(bytes) => {
            tokio::fs::write(&args.output, &bytes)
                .await
                .with_context(|| format!("failed to write {}", args.output.display()))?;
            println!("Video written to {} ({} bytes)", args.output.display(), bytes.len());
        }
        Artifact::Remote(url) => {
            println!("Video available at {}", url);
        }
    }

    Ok(())
}

/// Print new log lines and progress transitions as they are published.
async fn render_updates(
    mut watch: tokio::sync::watch::Receiver<reel_tracker::TrackerSnapshot>,
) {
    let mut printed = 0;
    let mut last_progress = None;

    while watch.changed().await.is_ok() {
        let snapshot = watch.borrow_and_update().clone();

        // A restarted run clears the log; never slice past the end.
        printed = printed.min(snapshot.logs.len());
        for line in &snapshot.logs[printed..] {
            println!("  {}", line);
        }
        printed = snapshot.logs.len();

        let key = (snapshot.progress.phase, snapshot.progress.percent);
        if last_progress != Some(key) {
            println!(
                "[{}] {:>3}% {}",
                snapshot.progress.phase, snapshot.progress.percent, snapshot.progress.message
            );
            last_progress = Some(key);
        }

        debug!(
            "lifecycle={} mode={:?} connected={}",
            snapshot.lifecycle, snapshot.connection.mode, snapshot.connection.connected
        );
    }
}

/// Source text from the positional argument or `--file`.
async fn resolve_content(args: &Args) -> Result<String> {
    if let Some(content) = &args.content {
        return Ok(content.clone());
    }

    if let Some(path) = &args.file {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        if content.trim().is_empty() {
            bail!("{} is empty", path.display());
        }
        return Ok(content);
    }

    bail!("provide source text as an argument or via --file");
}
