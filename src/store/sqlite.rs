use std::collections::HashMap;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::Couple;
use crate::store::client::{FingerprintStore, Song, FILTER_KEYS};
use crate::utils;

/// Relational store backed by a sqlite database file.
pub struct SqliteStore {
    pub db: Connection,
}

impl SqliteStore {
    /// Opens (and if needed initializes) the database at `path`.
    pub fn open(path: &str) -> Result<Self> {
        let db = Connection::open(path)
            .map_err(|e| Error::store(format!("error connecting to SQLite: {}", e)))?;
        // Concurrent ingestion workers share the file; wait out short lock
        // contention instead of failing.
        db.busy_timeout(Duration::from_secs(5))?;
        create_tables(&db)?;
        Ok(SqliteStore { db })
    }
}

fn create_tables(db: &Connection) -> Result<()> {
    let create_songs_table = r#"
        CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            externalRef TEXT UNIQUE,
            key TEXT NOT NULL UNIQUE
        );
    "#;

    let create_fingerprints_table = r#"
        CREATE TABLE IF NOT EXISTS fingerprints (
            address INTEGER NOT NULL,
            anchorTimeMs INTEGER NOT NULL,
            songID INTEGER NOT NULL,
            PRIMARY KEY (address, anchorTimeMs, songID)
        );
    "#;

    db.execute(create_songs_table, [])
        .map_err(|e| Error::store(format!("error creating songs table: {}", e)))?;
    db.execute(create_fingerprints_table, [])
        .map_err(|e| Error::store(format!("error creating fingerprints table: {}", e)))?;

    Ok(())
}

fn row_to_song(row: &rusqlite::Row) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get::<_, i64>(0)? as u32,
        title: row.get(1)?,
        artist: row.get(2)?,
        external_ref: row.get(3)?,
    })
}

impl FingerprintStore for SqliteStore {
    fn store_fingerprints(&mut self, fingerprints: &HashMap<u32, Couple>) -> Result<()> {
        let tx = self.db.transaction()?;
        {
            // The primary key spans the whole tuple, so re-ingesting a
            // recording coalesces into the existing rows.
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO fingerprints (address, anchorTimeMs, songID) VALUES (?, ?, ?)",
            )?;
            for (&address, couple) in fingerprints.iter() {
                stmt.execute(params![
                    address as i64,
                    couple.anchor_time_ms as i64,
                    couple.song_id as i64
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get_couples(&self, addresses: &[u32]) -> Result<HashMap<u32, Vec<Couple>>> {
        let mut couples_map = HashMap::new();
        let mut stmt = self
            .db
            .prepare("SELECT anchorTimeMs, songID FROM fingerprints WHERE address = ?")?;

        for &address in addresses {
            let mut rows = stmt.query(params![address as i64])?;
            let mut couples = Vec::new();
            while let Some(row) = rows.next()? {
                let anchor_time_ms: i64 = row.get(0)?;
                let song_id: i64 = row.get(1)?;
                couples.push(Couple {
                    anchor_time_ms: anchor_time_ms as u32,
                    song_id: song_id as u32,
                });
            }
            if !couples.is_empty() {
                couples_map.insert(address, couples);
            }
        }

        Ok(couples_map)
    }

    fn register_song(
        &mut self,
        song_title: &str,
        song_artist: &str,
        external_ref: Option<&str>,
    ) -> Result<u32> {
        let tx = self.db.transaction()?;

        // Random IDs collide rarely; retry against the catalogue until one
        // is free.
        let song_id = loop {
            let candidate = utils::generate_unique_id();
            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM songs WHERE id = ?)",
                params![candidate as i64],
                |row| row.get(0),
            )?;
            if !taken {
                break candidate;
            }
        };

        let song_key = utils::generate_song_key(song_title, song_artist);
        let res = tx.execute(
            "INSERT INTO songs (id, title, artist, externalRef, key) VALUES (?, ?, ?, ?, ?)",
            params![song_id as i64, song_title, song_artist, external_ref, song_key],
        );

        match res {
            Ok(_) => {
                tx.commit()?;
                Ok(song_id)
            }
            Err(e) => {
                if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                    if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
                        return Err(Error::DuplicateKey(format!(
                            "song with key or external reference already exists: {}",
                            e
                        )));
                    }
                }
                Err(Error::store(format!("failed to register song: {}", e)))
            }
        }
    }

    fn total_songs(&self) -> Result<u64> {
        let count: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn get_song(&self, filter_key: &str, value: &str) -> Result<Option<Song>> {
        let column = match filter_key {
            "id" => "id",
            "external_ref" => "externalRef",
            "key" => "key",
            _ => {
                return Err(Error::invalid_input(format!(
                    "invalid filter key {:?}, expected one of {:?}",
                    filter_key, FILTER_KEYS
                )));
            }
        };

        let query = format!(
            "SELECT id, title, artist, externalRef FROM songs WHERE {} = ?",
            column
        );
        let mut stmt = self.db.prepare(&query)?;

        let song = if filter_key == "id" {
            let id: i64 = value
                .parse()
                .map_err(|_| Error::invalid_input(format!("invalid song id: {:?}", value)))?;
            stmt.query_row(params![id], row_to_song).optional()?
        } else {
            stmt.query_row(params![value], row_to_song).optional()?
        };

        Ok(song)
    }

    fn delete_song(&mut self, song_id: u32) -> Result<()> {
        self.db
            .execute("DELETE FROM songs WHERE id = ?", params![song_id as i64])?;
        Ok(())
    }

    fn wipe(&mut self, collection: &str) -> Result<()> {
        match collection {
            "fingerprints" | "songs" => {
                let query = format!("DELETE FROM {}", collection);
                self.db.execute(&query, [])?;
                Ok(())
            }
            other => Err(Error::invalid_input(format!(
                "unknown collection: {:?}",
                other
            ))),
        }
    }

    fn close(&mut self) -> Result<()> {
        // The connection closes when the store drops.
        Ok(())
    }
}
