//! Heuristic classification of free-text log lines.
//!
//! The backend's log vocabulary is stable enough to map keyword families to
//! coarse progress buckets, but the mapping is advisory only: explicit
//! terminal signals always take precedence over anything inferred here.

use std::sync::LazyLock;

use regex::Regex;

use reel_models::{JobId, Phase};

/// Keyword families, checked in order. Later pipeline stages first so a line
/// like "combining rendered scenes" lands in the later bucket.
const COMPLETING: &[&str] = &["creation complete", "complete!"];
const FINISHING: &[&str] = &["adding captions", "applying", "encoding", "combining"];
const GENERATING: &[&str] = &["generating", "rendering", "creating", "video segments"];
const ANALYZING: &[&str] = &["analyzing", "extracting", "transforming", "starting to process"];

/// Progress bucket a log line maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub phase: Phase,
    pub percent: u8,
}

/// Map a log line to a progress bucket, if any family matches.
pub fn classify_line(line: &str) -> Option<Classification> {
    let lower = line.to_lowercase();

    let matches = |family: &[&str]| family.iter().any(|kw| lower.contains(kw));

    if matches(COMPLETING) {
        return Some(Classification {
            phase: Phase::Rendering,
            percent: 95,
        });
    }
    if matches(FINISHING) {
        return Some(Classification {
            phase: Phase::Rendering,
            percent: 80,
        });
    }
    if matches(GENERATING) {
        return Some(Classification {
            phase: Phase::Generating,
            percent: 60,
        });
    }
    if matches(ANALYZING) {
        return Some(Classification {
            phase: Phase::Analyzing,
            percent: 30,
        });
    }

    None
}

static FINAL_VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    // Identifier token immediately preceding the fixed output suffix,
    // e.g. "Saved as videos/abc123_final.mp4" -> "abc123".
    Regex::new(r"([A-Za-z0-9][A-Za-z0-9_-]*?)_final\.mp4").expect("static pattern compiles")
});

/// Pull the job identifier out of a completion message, when present.
///
/// Completion messages name the output file `<job_id>_final.mp4`; this is
/// the only place the id appears when a run was joined without one.
pub fn extract_job_id(line: &str) -> Option<JobId> {
    FINAL_VIDEO_ID
        .captures(line)
        .map(|caps| JobId::new(caps.get(1).expect("group 1 always present").as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyzing_family() {
        let c = classify_line("Analyzing content for key themes").unwrap();
        assert_eq!(c.phase, Phase::Analyzing);
        assert_eq!(c.percent, 30);

        let c = classify_line("Transforming content to script...").unwrap();
        assert_eq!(c.percent, 30);
    }

    #[test]
    fn generating_family() {
        let c = classify_line("Creating 5 video segments...").unwrap();
        assert_eq!(c.phase, Phase::Generating);
        assert_eq!(c.percent, 60);
    }

    #[test]
    fn finishing_family() {
        let c = classify_line("Combining audio and videos...").unwrap();
        assert_eq!(c.phase, Phase::Rendering);
        assert_eq!(c.percent, 80);

        let c = classify_line("Adding captions to video...").unwrap();
        assert_eq!(c.percent, 80);
    }

    #[test]
    fn completion_family_beats_earlier_buckets() {
        // "creation complete" also contains "creat..."; the completion
        // family must win.
        let c = classify_line("Video creation complete!").unwrap();
        assert_eq!(c.phase, Phase::Rendering);
        assert_eq!(c.percent, 95);
    }

    #[test]
    fn unmatched_lines_classify_to_nothing() {
        assert!(classify_line("Using voice model en-US-neural").is_none());
        assert!(classify_line("").is_none());
    }

    #[test]
    fn job_id_extraction() {
        let id = extract_job_id("Saved as videos/job_42abc_final.mp4").unwrap();
        assert_eq!(id.as_str(), "job_42abc");

        assert!(extract_job_id("Video creation complete!").is_none());
    }
}
