//! Live generation status tracker.
//!
//! This crate provides:
//! - SSE transport adapter for the backend's log stream
//! - Timer-driven status polling fallback
//! - Keyword classification of log lines into progress buckets
//! - The generation lifecycle state machine, from start to artifact

pub mod classify;
pub mod error;
pub mod event;
pub mod poller;
pub mod tracker;
pub mod transport;

pub use classify::{classify_line, extract_job_id, Classification};
pub use error::{TrackerError, TrackerResult};
pub use event::TrackerEvent;
pub use poller::{StatusPoller, DEFAULT_POLL_INTERVAL};
pub use tracker::{
    GenerationTracker, Lifecycle, TrackerConfig, TrackerSnapshot, FALLBACK_VIDEO_URL,
};
pub use transport::LogStream;
