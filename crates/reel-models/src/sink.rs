//! Ordered log accumulator.

use serde::{Deserialize, Serialize};

/// Append-only ordered sequence of raw log lines.
///
/// Insertion order is arrival order. Lines arriving on the push channel are
/// always appended; batches from the polling endpoint may overlap lines the
/// push channel already delivered, so they are deduplicated by exact string
/// match before appending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogSink {
    lines: Vec<String>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line unconditionally.
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Merge a polled batch, skipping lines already present verbatim.
    ///
    /// Returns the number of lines actually appended.
    pub fn merge_batch<I, S>(&mut self, batch: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut appended = 0;
        for line in batch {
            let line = line.into();
            if !self.lines.iter().any(|seen| *seen == line) {
                self.lines.push(line);
                appended += 1;
            }
        }
        appended
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.lines.clone()
    }
}
