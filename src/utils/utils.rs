use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;

/// Generates a random 32-bit song ID. Uniqueness against the catalogue is
/// the store's responsibility; callers retry on collision.
pub fn generate_unique_id() -> u32 {
    let mut rng = rand::rng();
    rng.random::<u32>()
}

/// Generates a song key by concatenating the song title and song artist
/// with "---" as separator.
pub fn generate_song_key(song_title: &str, song_artist: &str) -> String {
    format!("{}---{}", song_title, song_artist)
}

/// Returns the value of the environment variable `key`.
/// If the variable is not set, returns the provided fallback value or an
/// empty string if no fallback is provided.
pub fn get_env(key: &str, fallback: Option<&str>) -> String {
    env::var(key).unwrap_or_else(|_| fallback.unwrap_or("").to_string())
}

/// Cooperative cancellation flag shared between a query and its caller.
/// Cloning is cheap; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Requests cancellation. Queries notice it at their next store-fetch
    /// boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
