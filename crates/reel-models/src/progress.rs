//! Progress model observed by the presentation layer.

use serde::{Deserialize, Serialize};

/// Coarse generation phase shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Analyzing,
    Generating,
    Rendering,
    Complete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Analyzing => "analyzing",
            Phase::Generating => "generating",
            Phase::Rendering => "rendering",
            Phase::Complete => "complete",
        }
    }

    /// Map a percentage reported by the polling endpoint to a phase.
    pub fn for_progress(percent: u8) -> Self {
        match percent {
            0..=29 => Phase::Analyzing,
            30..=59 => Phase::Generating,
            60..=99 => Phase::Rendering,
            _ => Phase::Complete,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Last known good progress of a generation job.
///
/// Last-write-wins: every classified message overwrites the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub phase: Phase,
    /// 0-100. Non-decreasing within a phase by convention, not enforced.
    pub percent: u8,
    /// Latest human-readable status line.
    pub message: String,
}

impl ProgressState {
    /// State shown while the start request is in flight.
    pub fn connecting() -> Self {
        Self {
            phase: Phase::Analyzing,
            percent: 0,
            message: "Connecting...".to_string(),
        }
    }

    pub fn new(phase: Phase, percent: u8, message: impl Into<String>) -> Self {
        Self {
            phase,
            percent: percent.min(100),
            message: message.into(),
        }
    }

    /// Terminal success state.
    pub fn completed(message: impl Into<String>) -> Self {
        Self::new(Phase::Complete, 100, message)
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::connecting()
    }
}

/// Which channel currently feeds the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    Push,
    Poll,
}

/// Channel health, observed by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub connected: bool,
    pub mode: ConnectionMode,
}

impl ConnectionState {
    pub fn push() -> Self {
        Self {
            connected: true,
            mode: ConnectionMode::Push,
        }
    }

    pub fn poll() -> Self {
        Self {
            connected: true,
            mode: ConnectionMode::Poll,
        }
    }

    pub fn disconnected(mode: ConnectionMode) -> Self {
        Self {
            connected: false,
            mode,
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::disconnected(ConnectionMode::Push)
    }
}
