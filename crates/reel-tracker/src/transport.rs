//! Push-channel transport adapter.
//!
//! Reads `GET /stream_logs/{job_id}` as a server-sent-event stream and
//! forwards decoded frames to the tracker's event channel. The adapter
//! reports exactly one terminal condition per stream: a completion frame,
//! an error-sentinel frame, or a transport failure (including the stream
//! ending without a completion frame). It never retries on its own; the
//! tracker owns failover.

use futures_util::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use reel_models::{decode_frame, JobId, StreamFrame};

use crate::event::TrackerEvent;

/// Handle to an open log stream. Dropping it closes the stream.
pub struct LogStream {
    task: JoinHandle<()>,
}

impl LogStream {
    /// Open the push channel for a job and pump decoded frames into `tx`.
    pub fn open(http: Client, base_url: &str, job_id: &JobId, tx: UnboundedSender<TrackerEvent>) -> Self {
        let url = format!("{}/stream_logs/{}", base_url, job_id);
        let job_id = job_id.clone();

        let task = tokio::spawn(async move {
            debug!("Opening log stream for job {}", job_id);
            if let Err(detail) = pump_stream(&http, &url, &tx).await {
                warn!("Log stream for job {} failed: {}", job_id, detail);
                let _ = tx.send(TrackerEvent::StreamError(detail));
            }
        });

        Self { task }
    }

    /// Close the channel. Idempotent; pending frames are discarded.
    pub fn close(self) {
        self.task.abort();
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Read the SSE stream to its terminal condition.
///
/// Returns `Ok(())` when a completion or error frame was forwarded, and
/// `Err(detail)` on a transport-level failure the caller must report.
async fn pump_stream(
    http: &Client,
    url: &str,
    tx: &UnboundedSender<TrackerEvent>,
) -> Result<(), String> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| format!("connect failed: {}", e))?;

    if !response.status().is_success() {
        return Err(format!("stream returned {}", response.status()));
    }

    let mut body = response.bytes_stream();
    let mut framing = SseFraming::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| format!("read failed: {}", e))?;

        for payload in framing.push(&chunk) {
            match decode_frame(&payload) {
                StreamFrame::Log(line) => {
                    if tx.send(TrackerEvent::StreamLog(line)).is_err() {
                        // Tracker went away; nothing left to deliver to.
                        return Ok(());
                    }
                }
                StreamFrame::Complete { video_path } => {
                    let _ = tx.send(TrackerEvent::StreamComplete { video_path });
                    return Ok(());
                }
                StreamFrame::Error(detail) => {
                    let _ = tx.send(TrackerEvent::StreamError(detail));
                    return Ok(());
                }
            }
        }
    }

    // Server closed the stream without a terminal frame.
    Err("stream ended before completion".to_string())
}

/// Incremental SSE framing.
///
/// Accumulates raw bytes, emits one payload per event. An event's payload is
/// the newline-joined `data:` field values; comments and other fields are
/// skipped. Handles both LF and CRLF line endings and chunk boundaries that
/// split lines or UTF-8 sequences.
struct SseFraming {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseFraming {
    fn new() -> Self {
        Self {
            buffer: Vec::new(),
            data_lines: Vec::new(),
        }
    }

    /// Feed a chunk, returning the payloads of any events it completed.
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw_line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&raw_line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                // Blank line dispatches the accumulated event.
                if !self.data_lines.is_empty() {
                    payloads.push(self.data_lines.join("\n"));
                    self.data_lines.clear();
                }
            } else if let Some(data) = line.strip_prefix("data:") {
                self.data_lines.push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
            // Comment lines (":keepalive") and other fields are ignored.
        }

        payloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_event() {
        let mut framing = SseFraming::new();
        let payloads = framing.push(b"data: {\"message\":\"hello\"}\n\n");
        assert_eq!(payloads, vec![r#"{"message":"hello"}"#]);
    }

    #[test]
    fn event_split_across_chunks() {
        let mut framing = SseFraming::new();
        assert!(framing.push(b"data: {\"mess").is_empty());
        assert!(framing.push(b"age\":\"hi\"}\n").is_empty());
        let payloads = framing.push(b"\n");
        assert_eq!(payloads, vec![r#"{"message":"hi"}"#]);
    }

    #[test]
    fn crlf_line_endings() {
        let mut framing = SseFraming::new();
        let payloads = framing.push(b"data: one\r\n\r\ndata: two\r\n\r\n");
        assert_eq!(payloads, vec!["one", "two"]);
    }

    #[test]
    fn multi_line_data_joined() {
        let mut framing = SseFraming::new();
        let payloads = framing.push(b"data: line1\ndata: line2\n\n");
        assert_eq!(payloads, vec!["line1\nline2"]);
    }

    #[test]
    fn comments_and_other_fields_skipped() {
        let mut framing = SseFraming::new();
        let payloads = framing.push(b":keepalive\nevent: log\nid: 7\ndata: payload\n\n");
        assert_eq!(payloads, vec!["payload"]);
    }

    #[test]
    fn blank_line_without_data_is_not_an_event() {
        let mut framing = SseFraming::new();
        assert!(framing.push(b"\n\n\n").is_empty());
    }
}
