//! Retrieved video artifact.

use bytes::Bytes;

/// The final video output reference.
///
/// The artifact endpoint either serves the encoded video directly or a JSON
/// body carrying a URL the video can be fetched from, so both shapes are
/// representable.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// Binary video payload returned inline.
    Media(Bytes),
    /// Server-provided URL pointing at the video.
    Remote(String),
}

impl Artifact {
    /// URL form if this artifact is remote.
    pub fn url(&self) -> Option<&str> {
        match self {
            Artifact::Remote(url) => Some(url),
            Artifact::Media(_) => None,
        }
    }

    /// Inline payload if the server returned the video directly.
    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            Artifact::Media(bytes) => Some(bytes),
            Artifact::Remote(_) => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Artifact::Remote(_))
    }

    /// Size of the inline payload, zero for remote artifacts.
    pub fn size_bytes(&self) -> usize {
        match self {
            Artifact::Media(bytes) => bytes.len(),
            Artifact::Remote(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_artifact_exposes_url() {
        let a = Artifact::Remote("https://cdn.example.com/v.mp4".to_string());
        assert_eq!(a.url(), Some("https://cdn.example.com/v.mp4"));
        assert!(a.bytes().is_none());
    }

    #[test]
    fn media_artifact_reports_size() {
        let a = Artifact::Media(Bytes::from_static(b"\x00\x00\x00\x18ftyp"));
        assert_eq!(a.size_bytes(), 8);
        assert!(!a.is_remote());
    }
}
