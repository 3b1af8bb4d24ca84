//! Timer-driven status polling fallback.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use reel_client::JobClient;
use reel_models::JobId;

use crate::event::TrackerEvent;

/// Default polling cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Handle to a running status poller. Dropping it stops the poller.
///
/// Each tick issues one status request and forwards the outcome; a failed
/// tick is reported as [`TrackerEvent::PollError`] and polling continues.
/// The poller never decides the job is done; the tracker does, and stops it.
pub struct StatusPoller {
    task: JoinHandle<()>,
}

impl StatusPoller {
    /// Start polling a job on a fixed interval. The first poll fires
    /// immediately so failover does not leave a silence gap.
    pub fn start(
        client: Arc<JobClient>,
        job_id: JobId,
        interval: Duration,
        tx: UnboundedSender<TrackerEvent>,
    ) -> Self {
        let task = tokio::spawn(async move {
            debug!("Starting status poller for job {} every {:?}", job_id, interval);

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let event = match client.get_status(&job_id).await {
                    Ok(status) => TrackerEvent::PollStatus(status),
                    Err(e) => {
                        warn!("Status poll for job {} failed: {}", job_id, e);
                        TrackerEvent::PollError(e.to_string())
                    }
                };

                if tx.send(event).is_err() {
                    // Tracker went away; stop ticking.
                    break;
                }
            }
        });

        Self { task }
    }

    /// Stop the poller. Idempotent.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}
