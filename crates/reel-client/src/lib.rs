//! HTTP client for the reelgen video generation backend.
//!
//! Wraps the four remote operations a job has (start, status, artifact,
//! release) with uniform error propagation. The long-lived log stream is
//! not handled here; see `reel-tracker`.

pub mod client;
pub mod error;

pub use client::{JobClient, JobClientConfig};
pub use error::{ClientError, ClientResult};
