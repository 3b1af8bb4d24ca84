//! Shared types for the reelgen generation tracker.
//!
//! Wire types match the generation backend's JSON API, so field names follow
//! the server's snake_case conventions (`job_id`, `video_path`).

pub mod artifact;
pub mod job;
pub mod progress;
pub mod sink;
pub mod stream;

pub use artifact::Artifact;
pub use job::{GenerateResponse, JobId, JobStatusResponse, StatusKind};
pub use progress::{ConnectionMode, ConnectionState, Phase, ProgressState};
pub use sink::LogSink;
pub use stream::{decode_frame, StreamFrame};
