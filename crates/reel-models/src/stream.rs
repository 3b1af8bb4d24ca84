//! Push-channel frame decoding.
//!
//! The log stream endpoint emits one JSON object per SSE frame, but older
//! backend builds interleave plain text lines, so decoding is forgiving:
//! anything that cannot be interpreted as a control signal is forwarded
//! verbatim as a log line, never dropped.

use serde_json::Value;

/// Prefix marking an inline error report on the log stream.
pub const ERROR_SENTINEL: &str = "ERROR:";

/// Prefix marking successful completion on the log stream.
pub const DONE_SENTINEL: &str = "DONE:";

/// Fixed phrase some backend builds log instead of a `DONE:` frame.
const COMPLETE_PHRASE: &str = "generation complete";

/// A decoded frame from the push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// Plain log line to append to the sink.
    Log(String),
    /// The job finished; `video_path` is an artifact hint when present.
    Complete { video_path: Option<String> },
    /// The job reported an error; payload is the detail after the sentinel.
    Error(String),
}

/// Decode one raw frame payload into a [`StreamFrame`].
pub fn decode_frame(raw: &str) -> StreamFrame {
    // Structured completion payloads short-circuit everything else.
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(raw) {
        if obj.get("status").and_then(Value::as_str) == Some("complete") {
            let video_path = obj
                .get("video_path")
                .and_then(Value::as_str)
                .map(str::to_string);
            return StreamFrame::Complete { video_path };
        }

        if let Some(line) = obj
            .get("message")
            .or_else(|| obj.get("log"))
            .and_then(Value::as_str)
        {
            return classify_line(line);
        }
    }

    classify_line(raw)
}

/// Interpret a text line, separating control sentinels from plain logs.
fn classify_line(line: &str) -> StreamFrame {
    if let Some(detail) = line.strip_prefix(ERROR_SENTINEL) {
        return StreamFrame::Error(detail.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix(DONE_SENTINEL) {
        let rest = rest.trim();
        return StreamFrame::Complete {
            video_path: (!rest.is_empty()).then(|| rest.to_string()),
        };
    }

    if line.to_lowercase().contains(COMPLETE_PHRASE) {
        return StreamFrame::Complete { video_path: None };
    }

    StreamFrame::Log(line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_message_field_is_forwarded() {
        let frame = decode_frame(r#"{"message":"Analyzing content"}"#);
        assert_eq!(frame, StreamFrame::Log("Analyzing content".to_string()));
    }

    #[test]
    fn json_log_field_is_forwarded() {
        let frame = decode_frame(r#"{"log":"Downloading assets"}"#);
        assert_eq!(frame, StreamFrame::Log("Downloading assets".to_string()));
    }

    #[test]
    fn structured_completion() {
        let frame = decode_frame(r#"{"status":"complete","video_path":"out/abc_final.mp4"}"#);
        assert_eq!(
            frame,
            StreamFrame::Complete {
                video_path: Some("out/abc_final.mp4".to_string())
            }
        );
    }

    #[test]
    fn malformed_json_forwarded_verbatim() {
        let frame = decode_frame("{not json at all");
        assert_eq!(frame, StreamFrame::Log("{not json at all".to_string()));
    }

    #[test]
    fn error_sentinel_carries_detail() {
        let frame = decode_frame(r#"{"message":"ERROR: voice synthesis failed"}"#);
        assert_eq!(frame, StreamFrame::Error("voice synthesis failed".to_string()));
    }

    #[test]
    fn done_sentinel_with_path() {
        let frame = decode_frame("DONE: videos/abc_final.mp4");
        assert_eq!(
            frame,
            StreamFrame::Complete {
                video_path: Some("videos/abc_final.mp4".to_string())
            }
        );
    }

    #[test]
    fn done_sentinel_without_path() {
        let frame = decode_frame("DONE:");
        assert_eq!(frame, StreamFrame::Complete { video_path: None });
    }

    #[test]
    fn completion_phrase_signals_success() {
        let frame = decode_frame("Video generation complete!");
        assert_eq!(frame, StreamFrame::Complete { video_path: None });
    }

    #[test]
    fn plain_text_is_a_log_line() {
        let frame = decode_frame("Combining audio and videos...");
        assert_eq!(
            frame,
            StreamFrame::Log("Combining audio and videos...".to_string())
        );
    }
}
