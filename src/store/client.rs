use std::collections::HashMap;

use crate::error::Result;
use crate::models::Couple;

pub const FILTER_KEYS: [&str; 3] = ["id", "external_ref", "key"];

/// A catalogue entry. `key` is derived from title and artist and is unique
/// across the catalogue, as is `external_ref` when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub id: u32,
    pub title: String,
    pub artist: String,
    pub external_ref: Option<String>,
}

impl Song {
    pub fn key(&self) -> String {
        crate::utils::generate_song_key(&self.title, &self.artist)
    }
}

/// Capability interface over the fingerprint store and song catalogue.
/// Two backends implement it: a relational sqlite store and a document
/// mongo store; the backend is picked once at bootstrap.
pub trait FingerprintStore: Send {
    /// Persists a batch of fingerprints. The batch lands atomically:
    /// either all tuples persist or none. Re-storing an identical batch
    /// leaves the store unchanged.
    fn store_fingerprints(&mut self, fingerprints: &HashMap<u32, Couple>) -> Result<()>;

    /// Fetches all couples recorded under each of the given addresses.
    /// Addresses with no occurrences are absent from the result.
    fn get_couples(&self, addresses: &[u32]) -> Result<HashMap<u32, Vec<Couple>>>;

    /// Registers a song and returns its freshly allocated ID. Fails with a
    /// duplicate-key error when the title/artist key or the external
    /// reference is already catalogued.
    fn register_song(
        &mut self,
        song_title: &str,
        song_artist: &str,
        external_ref: Option<&str>,
    ) -> Result<u32>;

    fn total_songs(&self) -> Result<u64>;

    /// Looks up a song by one of the allowed filter keys: "id",
    /// "external_ref" or "key". Unknown songs are `None`, not an error.
    fn get_song(&self, filter_key: &str, value: &str) -> Result<Option<Song>>;

    fn delete_song(&mut self, song_id: u32) -> Result<()>;

    /// Erases a whole collection, either "fingerprints" or "songs".
    fn wipe(&mut self, collection: &str) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    fn get_song_by_id(&self, song_id: u32) -> Result<Option<Song>> {
        self.get_song("id", &song_id.to_string())
    }

    fn get_song_by_external_ref(&self, external_ref: &str) -> Result<Option<Song>> {
        self.get_song("external_ref", external_ref)
    }

    fn get_song_by_key(&self, key: &str) -> Result<Option<Song>> {
        self.get_song("key", key)
    }
}
