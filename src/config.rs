use crate::error::{Error, Result};
use crate::utils;

/// Storage backend selected once at bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbBackend {
    Sqlite,
    Mongo,
}

/// Recognized configuration options. Only `db_backend` and `db_uri` affect
/// core behavior; the remaining fields are carried for the serving
/// collaborators that sit in front of the core.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_backend: DbBackend,
    pub db_uri: String,
    pub songs_dir: String,
    pub serve_tls: bool,
    pub cert_path: String,
    pub cert_key_path: String,
}

impl Config {
    /// Reads configuration from the environment, with the same defaults the
    /// reference deployment uses.
    pub fn from_env() -> Result<Self> {
        let backend = utils::get_env("DB_BACKEND", Some("sqlite"));
        let db_backend = match backend.as_str() {
            "sqlite" => DbBackend::Sqlite,
            "mongo" => DbBackend::Mongo,
            other => {
                return Err(Error::invalid_input(format!(
                    "unsupported database backend: {}",
                    other
                )));
            }
        };

        let default_uri = match db_backend {
            DbBackend::Sqlite => "db.sqlite3",
            DbBackend::Mongo => "mongodb://localhost:27017",
        };

        Ok(Config {
            db_backend,
            db_uri: utils::get_env("DB_URI", Some(default_uri)),
            songs_dir: utils::get_env("SONGS_DIR", Some("songs")),
            serve_tls: utils::get_env("SERVE_TLS", Some("false")) == "true",
            cert_path: utils::get_env("CERT_PATH", None),
            cert_key_path: utils::get_env("CERT_KEY_PATH", None),
        })
    }

    /// Configuration for a sqlite store at `path`, used by tests and
    /// embedded callers that skip the environment.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Config {
            db_backend: DbBackend::Sqlite,
            db_uri: path.into(),
            songs_dir: "songs".to_string(),
            serve_tls: false,
            cert_path: String::new(),
            cert_key_path: String::new(),
        }
    }
}
