use std::collections::HashMap;

use mongodb::bson::{doc, Bson, Document};
use mongodb::options::IndexOptions;
use mongodb::sync::{Client, Collection};
use mongodb::IndexModel;

use crate::error::{Error, Result};
use crate::models::Couple;
use crate::store::client::{FingerprintStore, Song, FILTER_KEYS};
use crate::utils;

const DB_NAME: &str = "songprint";

/// Document store backed by MongoDB. Each fingerprint address maps to one
/// document carrying the list of couples recorded under it.
pub struct MongoStore {
    client: Client,
}

impl MongoStore {
    /// Connects to the deployment at `uri` and ensures the catalogue
    /// uniqueness indexes exist.
    pub fn connect(uri: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .map_err(|e| Error::store(format!("error connecting to MongoDB: {}", e)))?;
        let store = MongoStore { client };
        store.ensure_indexes()?;
        Ok(store)
    }

    fn fingerprints(&self) -> Collection<Document> {
        self.client.database(DB_NAME).collection("fingerprints")
    }

    fn songs(&self) -> Collection<Document> {
        self.client.database(DB_NAME).collection("songs")
    }

    fn ensure_indexes(&self) -> Result<()> {
        let songs = self.songs();
        let key_index = IndexModel::builder()
            .keys(doc! { "key": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        songs.create_index(key_index).run()?;

        // Sparse: songs without an external reference don't collide.
        let ref_index = IndexModel::builder()
            .keys(doc! { "externalRef": 1 })
            .options(IndexOptions::builder().unique(true).sparse(true).build())
            .build();
        songs.create_index(ref_index).run()?;
        Ok(())
    }
}

/// Extracts the couples array of a fingerprint document.
fn parse_couples(document: &Document, address: u32) -> Result<Vec<Couple>> {
    let list = document.get_array("couples").map_err(|_| {
        Error::store(format!(
            "couples field in document for address {} is not valid",
            address
        ))
    })?;

    let mut couples = Vec::with_capacity(list.len());
    for item in list {
        let Bson::Document(entry) = item else {
            return Err(Error::store(format!(
                "invalid couple format in document for address {}",
                address
            )));
        };
        couples.push(Couple {
            anchor_time_ms: entry.get_i64("anchorTimeMs")? as u32,
            song_id: entry.get_i64("songID")? as u32,
        });
    }
    Ok(couples)
}

fn document_to_song(document: &Document) -> Result<Song> {
    Ok(Song {
        id: document.get_i64("_id")? as u32,
        title: document.get_str("title")?.to_string(),
        artist: document.get_str("artist")?.to_string(),
        external_ref: document.get_str("externalRef").ok().map(str::to_string),
    })
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(we)) => {
            we.code == 11000
        }
        mongodb::error::ErrorKind::Command(ce) => ce.code == 11000,
        _ => false,
    }
}

impl FingerprintStore for MongoStore {
    fn store_fingerprints(&mut self, fingerprints: &HashMap<u32, Couple>) -> Result<()> {
        let collection = self.fingerprints();

        for (&address, couple) in fingerprints.iter() {
            let filter = doc! { "_id": address as i64 };
            // $addToSet coalesces re-ingested couples instead of stacking
            // duplicates under the address.
            let update = doc! {
                "$addToSet": {
                    "couples": {
                        "anchorTimeMs": couple.anchor_time_ms as i64,
                        "songID": couple.song_id as i64,
                    }
                }
            };
            collection
                .update_one(filter, update)
                .upsert(true)
                .run()
                .map_err(|e| Error::store(format!("error upserting document: {}", e)))?;
        }
        Ok(())
    }

    fn get_couples(&self, addresses: &[u32]) -> Result<HashMap<u32, Vec<Couple>>> {
        let collection = self.fingerprints();
        let mut couples_map = HashMap::new();

        for &address in addresses {
            let filter = doc! { "_id": address as i64 };
            if let Some(document) = collection.find_one(filter).run()? {
                couples_map.insert(address, parse_couples(&document, address)?);
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
        let collection = self.songs();

        let song_id = loop {
            let candidate = utils::generate_unique_id();
            let taken = collection
                .find_one(doc! { "_id": candidate as i64 })
                .run()?;
            if taken.is_none() {
                break candidate;
            }
        };

        let key = utils::generate_song_key(song_title, song_artist);
        let mut song = doc! {
            "_id": song_id as i64,
            "title": song_title,
            "artist": song_artist,
            "key": key,
        };
        if let Some(external_ref) = external_ref {
            song.insert("externalRef", external_ref);
        }

        match collection.insert_one(song).run() {
            Ok(_) => Ok(song_id),
            Err(e) if is_duplicate_key(&e) => Err(Error::DuplicateKey(format!(
                "song with key or external reference already exists: {}",
                e
            ))),
            Err(e) => Err(Error::store(format!("failed to register song: {}", e))),
        }
    }

    fn total_songs(&self) -> Result<u64> {
        let total = self.songs().count_documents(doc! {}).run()?;
        Ok(total)
    }

    fn get_song(&self, filter_key: &str, value: &str) -> Result<Option<Song>> {
        let filter = match filter_key {
            "id" => {
                let id: u32 = value
                    .parse()
                    .map_err(|_| Error::invalid_input(format!("invalid song id: {:?}", value)))?;
                doc! { "_id": id as i64 }
            }
            "external_ref" => doc! { "externalRef": value },
            "key" => doc! { "key": value },
            _ => {
                return Err(Error::invalid_input(format!(
                    "invalid filter key {:?}, expected one of {:?}",
                    filter_key, FILTER_KEYS
                )));
            }
        };

        match self.songs().find_one(filter).run()? {
            Some(document) => Ok(Some(document_to_song(&document)?)),
            None => Ok(None),
        }
    }

    fn delete_song(&mut self, song_id: u32) -> Result<()> {
        self.songs()
            .delete_one(doc! { "_id": song_id as i64 })
            .run()?;
        Ok(())
    }

    fn wipe(&mut self, collection: &str) -> Result<()> {
        match collection {
            "fingerprints" => {
                self.fingerprints().delete_many(doc! {}).run()?;
                Ok(())
            }
            "songs" => {
                self.songs().delete_many(doc! {}).run()?;
                Ok(())
            }
            other => Err(Error::invalid_input(format!(
                "unknown collection: {:?}",
                other
            ))),
        }
    }

    fn close(&mut self) -> Result<()> {
        // The driver tears its connection pool down on drop.
        Ok(())
    }
}
