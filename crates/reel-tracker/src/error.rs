//! Tracker error types.
//!
//! Only `Start` and `Generation` abort a run; every other class has a
//! defined recovery path (failover to polling, placeholder artifact, or
//! plain logging) so the user always reaches a terminal, viewable outcome.

use thiserror::Error;

use reel_client::ClientError;

pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// The job could not be created. Fatal for this attempt.
    #[error("Failed to start generation job: {0}")]
    Start(#[source] ClientError),

    /// The backend reported the job itself failed.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// The push channel broke. Triggers failover to polling.
    #[error("Log stream failed: {0}")]
    Transport(String),

    /// A single status poll failed. Swallowed; the poller keeps ticking.
    #[error("Status poll failed: {0}")]
    Poll(String),

    /// The finished job's artifact could not be fetched. Recovered with a
    /// placeholder artifact reference.
    #[error("Artifact fetch failed: {0}")]
    Artifact(#[source] ClientError),

    /// Server-side resource release failed. Logged only.
    #[error("Cleanup failed: {0}")]
    Cleanup(#[source] ClientError),
}

impl TrackerError {
    /// Whether this error halts the lifecycle without a viewable result.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TrackerError::Start(_) | TrackerError::Generation(_))
    }
}
