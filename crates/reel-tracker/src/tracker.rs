//! Generation lifecycle orchestration.
//!
//! Owns one job at a time, decides which channel feeds it (push stream or
//! polling fallback), folds inbound messages into the progress model and log
//! sink, and terminates the job by retrieving the artifact and releasing
//! server resources. All mutation happens here; the transport and poller are
//! passive sources that only send events.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use reel_client::JobClient;
use reel_models::{
    Artifact, ConnectionMode, ConnectionState, JobId, LogSink, Phase, ProgressState, StatusKind,
};

use crate::classify::{classify_line, extract_job_id};
use crate::error::{TrackerError, TrackerResult};
use crate::event::TrackerEvent;
use crate::poller::{StatusPoller, DEFAULT_POLL_INTERVAL};
use crate::transport::LogStream;

/// Fallback artifact shown when the finished job's video cannot be fetched.
/// Deliberate policy: the user always reaches a terminal, viewable outcome.
pub const FALLBACK_VIDEO_URL: &str =
    "https://storage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4";

/// Tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Cadence of the polling fallback
    pub poll_interval: Duration,
    /// Grace period before fetching the artifact, giving the backend time
    /// to finish moving the encoded file into place
    pub artifact_fetch_delay: Duration,
    /// Artifact URL published when the real fetch fails
    pub fallback_video_url: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            artifact_fetch_delay: Duration::from_millis(500),
            fallback_video_url: FALLBACK_VIDEO_URL.to_string(),
        }
    }
}

impl TrackerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: std::env::var("REEL_POLL_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            artifact_fetch_delay: std::env::var("REEL_ARTIFACT_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.artifact_fetch_delay),
            fallback_video_url: std::env::var("REEL_FALLBACK_VIDEO_URL")
                .unwrap_or(defaults.fallback_video_url),
        }
    }
}

/// Lifecycle of one generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Starting,
    Streaming,
    Polling,
    Retrieving,
    Complete,
    Failed,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Idle => "idle",
            Lifecycle::Starting => "starting",
            Lifecycle::Streaming => "streaming",
            Lifecycle::Polling => "polling",
            Lifecycle::Retrieving => "retrieving",
            Lifecycle::Complete => "complete",
            Lifecycle::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Lifecycle::Complete | Lifecycle::Failed)
    }

    /// States in which inbound source events are still acted on.
    fn accepts_events(&self) -> bool {
        matches!(self, Lifecycle::Streaming | Lifecycle::Polling)
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Externally observed tracker state, published on every change.
#[derive(Debug, Clone)]
pub struct TrackerSnapshot {
    pub lifecycle: Lifecycle,
    pub progress: ProgressState,
    pub logs: Vec<String>,
    pub artifact: Option<Artifact>,
    pub connection: ConnectionState,
    pub started_at: Option<DateTime<Utc>>,
}

impl TrackerSnapshot {
    fn idle() -> Self {
        Self {
            lifecycle: Lifecycle::Idle,
            progress: ProgressState::connecting(),
            logs: Vec::new(),
            artifact: None,
            connection: ConnectionState::default(),
            started_at: None,
        }
    }
}

/// The channel currently feeding the tracker, with one teardown per variant.
enum ActiveSource {
    Push(LogStream),
    Poll(StatusPoller),
}

impl ActiveSource {
    fn teardown(self) {
        match self {
            ActiveSource::Push(stream) => stream.close(),
            ActiveSource::Poll(poller) => poller.stop(),
        }
    }
}

/// How a run's event loop ended.
enum Outcome {
    Succeeded,
    Failed(String),
}

/// Tracks one server-side generation job from submission to artifact.
///
/// One tracker owns at most one active job; calling [`generate`] again
/// implicitly cleans up the previous job first. Observers subscribe to a
/// watch channel carrying [`TrackerSnapshot`]s.
///
/// [`generate`]: GenerationTracker::generate
pub struct GenerationTracker {
    client: Arc<JobClient>,
    config: TrackerConfig,
    job_id: Option<JobId>,
    lifecycle: Lifecycle,
    progress: ProgressState,
    sink: LogSink,
    connection: ConnectionState,
    artifact: Option<Artifact>,
    started_at: Option<DateTime<Utc>>,
    source: Option<ActiveSource>,
    watch_tx: watch::Sender<TrackerSnapshot>,
}

impl GenerationTracker {
    /// Create a tracker over the given backend client.
    pub fn new(client: JobClient, config: TrackerConfig) -> Self {
        let (watch_tx, _) = watch::channel(TrackerSnapshot::idle());

        Self {
            client: Arc::new(client),
            config,
            job_id: None,
            lifecycle: Lifecycle::Idle,
            progress: ProgressState::connecting(),
            sink: LogSink::new(),
            connection: ConnectionState::default(),
            artifact: None,
            started_at: None,
            source: None,
            watch_tx,
        }
    }

    /// Subscribe to state snapshots. The receiver always holds the latest.
    pub fn subscribe(&self) -> watch::Receiver<TrackerSnapshot> {
        self.watch_tx.subscribe()
    }

    /// Current state.
    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            lifecycle: self.lifecycle,
            progress: self.progress.clone(),
            logs: self.sink.to_vec(),
            artifact: self.artifact.clone(),
            connection: self.connection,
            started_at: self.started_at,
        }
    }

    /// Run one generation attempt to its terminal state.
    ///
    /// Starts the job, streams its log over the push channel (failing over
    /// to polling if the channel breaks), and on completion retrieves the
    /// artifact and releases server resources. Returns the artifact, which
    /// the caller then owns; the published snapshot keeps a copy for
    /// late-joining observers.
    pub async fn generate(&mut self, content: &str) -> TrackerResult<Artifact> {
        // Any previous job is torn down before a new one starts.
        self.cleanup().await;

        self.lifecycle = Lifecycle::Starting;
        self.progress = ProgressState::connecting();
        self.sink.clear();
        self.artifact = None;
        self.connection = ConnectionState::disconnected(ConnectionMode::Push);
        self.started_at = Some(Utc::now());
        self.publish();

        let started = match self.client.start(content).await {
            Ok(started) => started,
            Err(e) => {
                let err = TrackerError::Start(e);
                self.lifecycle = Lifecycle::Failed;
                self.progress = ProgressState::new(Phase::Analyzing, 0, format!("Error: {}", err));
                self.publish();
                return Err(err);
            }
        };

        let job_id = started.job_id.clone();
        info!("Generation job {} started", job_id);
        self.job_id = Some(job_id.clone());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let stream = LogStream::open(
            self.client.http().clone(),
            self.client.base_url(),
            &job_id,
            tx.clone(),
        );
        self.source = Some(ActiveSource::Push(stream));
        self.lifecycle = Lifecycle::Streaming;
        self.connection = ConnectionState::push();
        self.publish();

        let outcome = loop {
            match rx.recv().await {
                Some(event) => {
                    if let Some(outcome) = self.handle_event(event, &tx) {
                        break outcome;
                    }
                }
                // All sources hung up without a terminal signal.
                None => break Outcome::Failed("event sources disconnected".to_string()),
            }
        };

        self.teardown_source();

        match outcome {
            Outcome::Succeeded => self.retrieve(&job_id).await,
            Outcome::Failed(message) => {
                self.lifecycle = Lifecycle::Failed;
                self.progress =
                    ProgressState::new(self.progress.phase, 0, format!("Error: {}", message));
                self.publish();
                self.release_quietly(&job_id).await;
                self.job_id = None;
                Err(TrackerError::Generation(message))
            }
        }
    }

    /// Tear down any active source and release the current job's server
    /// resources. Safe to call when nothing is running, and repeatedly.
    pub async fn cleanup(&mut self) {
        let had_source = self.source.is_some();
        self.teardown_source();

        if let Some(job_id) = self.job_id.take() {
            self.release_quietly(&job_id).await;
        }

        if had_source && !self.lifecycle.is_terminal() {
            self.lifecycle = Lifecycle::Idle;
            self.publish();
        }
    }

    /// Apply one inbound event. Returns the run's outcome once a terminal
    /// signal has been processed; all later events are dropped.
    fn handle_event(
        &mut self,
        event: TrackerEvent,
        tx: &mpsc::UnboundedSender<TrackerEvent>,
    ) -> Option<Outcome> {
        if !self.lifecycle.accepts_events() {
            debug!("Dropping event after terminal signal: {:?}", event);
            return None;
        }

        match event {
            TrackerEvent::StreamLog(line) => {
                self.sink.push(line.clone());
                self.apply_classification(&line);
                self.publish();
                None
            }

            TrackerEvent::StreamComplete { video_path } => {
                debug!("Push channel reported completion (hint: {:?})", video_path);
                Some(Outcome::Succeeded)
            }

            TrackerEvent::StreamError(detail) => self.fail_over(detail, tx),

            TrackerEvent::PollStatus(status) => {
                if let Some(logs) = status.logs {
                    // The push channel may have delivered some of these
                    // lines already; merge keeps the sink gapless without
                    // duplicates.
                    if self.sink.merge_batch(logs) > 0 {
                        self.publish();
                    }
                }

                match status.status {
                    StatusKind::Processing => {
                        if let Some(percent) = status.progress {
                            let message = status
                                .message
                                .unwrap_or_else(|| self.progress.message.clone());
                            self.progress = ProgressState::new(
                                Phase::for_progress(percent),
                                percent,
                                message,
                            );
                            self.publish();
                        }
                        None
                    }
                    StatusKind::Complete => Some(Outcome::Succeeded),
                    StatusKind::Error => Some(Outcome::Failed(
                        status.message.unwrap_or_else(|| "Generation failed".to_string()),
                    )),
                }
            }

            TrackerEvent::PollError(detail) => {
                // Transient; the poller keeps ticking.
                let err = TrackerError::Poll(detail);
                warn!("{}", err);
                None
            }
        }
    }

    /// Update progress from a classified log line. Advisory only; explicit
    /// terminal signals take precedence over anything inferred here.
    fn apply_classification(&mut self, line: &str) {
        let Some(classification) = classify_line(line) else {
            return;
        };

        self.progress =
            ProgressState::new(classification.phase, classification.percent, line);

        // Completion messages name the output file after the job; recover
        // the id from there if this run was joined without one.
        if classification.percent == 95 && self.job_id.is_none() {
            if let Some(id) = extract_job_id(line) {
                debug!("Recovered job id {} from completion message", id);
                self.job_id = Some(id);
            }
        }
    }

    /// Switch from the push channel to the polling fallback. Flips the
    /// connection mode exactly once; repeat transport errors are ignored.
    fn fail_over(
        &mut self,
        detail: String,
        tx: &mpsc::UnboundedSender<TrackerEvent>,
    ) -> Option<Outcome> {
        if self.connection.mode == ConnectionMode::Poll {
            debug!("Ignoring transport error after failover: {}", detail);
            return None;
        }

        let err = TrackerError::Transport(detail);
        warn!("{}; failing over to status polling", err);

        self.teardown_source();
        self.connection = ConnectionState::disconnected(ConnectionMode::Push);
        self.publish();

        let Some(job_id) = self.job_id.clone() else {
            // Without an id there is nothing to poll.
            return Some(Outcome::Failed(
                "log stream lost before a job id was known".to_string(),
            ));
        };

        let poller = StatusPoller::start(
            self.client.clone(),
            job_id,
            self.config.poll_interval,
            tx.clone(),
        );
        self.source = Some(ActiveSource::Poll(poller));
        self.lifecycle = Lifecycle::Polling;
        self.connection = ConnectionState::poll();
        self.publish();
        None
    }

    /// Fetch the finished job's artifact and close out the lifecycle.
    async fn retrieve(&mut self, job_id: &JobId) -> TrackerResult<Artifact> {
        self.lifecycle = Lifecycle::Retrieving;
        self.progress = ProgressState::new(Phase::Rendering, 98, "Retrieving video...");
        self.publish();

        if !self.config.artifact_fetch_delay.is_zero() {
            tokio::time::sleep(self.config.artifact_fetch_delay).await;
        }

        let artifact = match self.client.get_artifact(job_id).await {
            Ok(artifact) => artifact,
            Err(e) => {
                let err = TrackerError::Artifact(e);
                warn!("{}; publishing fallback artifact", err);
                Artifact::Remote(self.config.fallback_video_url.clone())
            }
        };

        self.artifact = Some(artifact.clone());
        self.lifecycle = Lifecycle::Complete;
        self.progress = ProgressState::completed("Video generation complete");
        self.publish();
        info!("Generation job {} complete", job_id);

        self.release_quietly(job_id).await;
        self.job_id = None;

        Ok(artifact)
    }

    /// Best-effort server-side resource release; the outcome never affects
    /// an already-reached terminal state.
    async fn release_quietly(&self, job_id: &JobId) {
        if let Err(e) = self.client.release(job_id).await {
            let err = TrackerError::Cleanup(e);
            warn!("{}", err);
        }
    }

    fn teardown_source(&mut self) {
        if let Some(source) = self.source.take() {
            source.teardown();
        }
    }

    fn publish(&self) {
        self.watch_tx.send_replace(self.snapshot());
    }
}
