//! Events feeding the tracker state machine.

use reel_models::JobStatusResponse;

/// One inbound event from an active source.
///
/// Both sources (push channel and status poller) funnel through a single
/// channel into the tracker, which serializes all state mutation; the
/// sources themselves never touch shared state.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// Log line delivered on the push channel.
    StreamLog(String),
    /// The push channel delivered a completion signal.
    StreamComplete { video_path: Option<String> },
    /// The push channel failed or reported an error sentinel.
    StreamError(String),
    /// One status poll result.
    PollStatus(JobStatusResponse),
    /// One status poll failed; transient, not terminal.
    PollError(String),
}
