//! Acoustic-fingerprint song recognition: spectral analysis, landmark
//! hashing, a persisted fingerprint catalogue and relative-timing matching.

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod pcm;
pub mod store;
pub mod utils;

pub use config::{Config, DbBackend};
pub use engine::{find_matches, fingerprint_stream, index_batch, index_track, match_fingerprint};
pub use error::{Error, Result};
pub use models::{Couple, FingerprintPayload, Match, TrackMeta};
pub use pcm::{ChannelLayout, PcmStream};
pub use store::{connect, FingerprintStore, Song};
pub use utils::CancelToken;
