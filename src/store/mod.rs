mod client;
pub use client::*;
mod mongo;
pub use mongo::*;
mod sqlite;
pub use sqlite::*;

use crate::config::{Config, DbBackend};
use crate::error::Result;

/// Opens the store named by the configuration. Backend dispatch happens
/// once, here; everything downstream works through the trait object.
pub fn connect(config: &Config) -> Result<Box<dyn FingerprintStore>> {
    match config.db_backend {
        DbBackend::Sqlite => Ok(Box::new(SqliteStore::open(&config.db_uri)?)),
        DbBackend::Mongo => Ok(Box::new(MongoStore::connect(&config.db_uri)?)),
    }
}
