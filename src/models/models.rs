use serde::{Deserialize, Serialize};

/// A fingerprint occurrence: the anchor time of a landmark pair within a
/// recording, and the recording it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Couple {
    pub anchor_time_ms: u32,
    pub song_id: u32,
}

/// A ranked recognition result. `timestamp` is the earliest matched anchor
/// time within the reference recording, in milliseconds.
#[derive(Debug, Clone, Serialize)]
pub struct Match {
    pub song_id: u32,
    pub song_title: String,
    pub song_artist: String,
    pub external_ref: Option<String>,
    pub timestamp: u32,
    pub score: u64,
}

/// Metadata supplied alongside a recording at ingestion time.
#[derive(Debug, Clone)]
pub struct TrackMeta {
    pub title: String,
    pub artist: String,
    pub external_ref: Option<String>,
}

impl TrackMeta {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        TrackMeta {
            title: title.into(),
            artist: artist.into(),
            external_ref: None,
        }
    }

    pub fn with_external_ref(mut self, external_ref: impl Into<String>) -> Self {
        self.external_ref = Some(external_ref.into());
        self
    }
}
