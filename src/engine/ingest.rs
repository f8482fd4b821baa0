use std::collections::VecDeque;
use std::sync::Mutex;
use std::thread;

use crate::config::Config;
use crate::engine::fingerprint::fingerprint_stream;
use crate::error::{Error, Result};
use crate::models::TrackMeta;
use crate::pcm::PcmStream;
use crate::store::{self, FingerprintStore};
use crate::utils;

/// Indexes one recording: registers it in the catalogue, fingerprints it
/// and persists the fingerprints. Returns the allocated song ID.
///
/// Registration and fingerprint persistence form a two-step saga: when the
/// fingerprint write fails, the fresh catalogue row is deleted again. The
/// compensation is best-effort; if it fails too, the orphan row is logged
/// for external reconciliation and the original error is surfaced.
pub fn index_track(
    store: &mut dyn FingerprintStore,
    audio: &PcmStream,
    meta: &TrackMeta,
) -> Result<u32> {
    if audio.is_empty() {
        return Err(Error::invalid_input("cannot ingest an empty sample stream"));
    }
    if meta.title.is_empty() || meta.artist.is_empty() {
        return Err(Error::invalid_input("song title and artist are required"));
    }

    let song_id = store.register_song(&meta.title, &meta.artist, meta.external_ref.as_deref())?;

    let fingerprints = match fingerprint_stream(audio, audio.duration(), song_id) {
        Ok(fingerprints) => fingerprints,
        Err(e) => {
            compensate(store, song_id, &e);
            return Err(e);
        }
    };

    if let Err(e) = store.store_fingerprints(&fingerprints) {
        compensate(store, song_id, &e);
        return Err(e);
    }

    Ok(song_id)
}

fn compensate(store: &mut dyn FingerprintStore, song_id: u32, cause: &Error) {
    if let Err(delete_err) = store.delete_song(song_id) {
        let logger = utils::get_logger();
        let context = format!(
            "failed to roll back song ({}) after ingestion error ({}), orphan row left behind",
            song_id, cause
        );
        utils::log_error(&logger, &context, &delete_err);
    }
}

/// One unit of work for the ingestion pool.
pub struct IngestJob {
    pub audio: PcmStream,
    pub meta: TrackMeta,
}

/// Per-job outcome, reported in submission order.
pub struct IngestReport {
    pub title: String,
    pub artist: String,
    pub result: Result<u32>,
}

/// Indexes a batch of recordings on a bounded worker pool. Each worker owns
/// its store connection; the store is the only state shared between jobs.
pub fn index_batch(config: &Config, jobs: Vec<IngestJob>) -> Vec<IngestReport> {
    if jobs.is_empty() {
        return Vec::new();
    }

    let workers = num_cpus::get().min(jobs.len()).max(1);
    let queue: Mutex<VecDeque<(usize, IngestJob)>> =
        Mutex::new(jobs.into_iter().enumerate().collect());
    let reports: Mutex<Vec<(usize, IngestReport)>> = Mutex::new(Vec::new());

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                let mut store = match store::connect(config) {
                    Ok(store) => store,
                    Err(e) => {
                        // Without a store this worker can only fail its
                        // share of the queue.
                        drain_queue_with_error(&queue, &reports, &e);
                        return;
                    }
                };

                loop {
                    let job = queue.lock().unwrap().pop_front();
                    let Some((idx, job)) = job else { break };

                    let result = index_track(store.as_mut(), &job.audio, &job.meta);
                    reports.lock().unwrap().push((
                        idx,
                        IngestReport {
                            title: job.meta.title,
                            artist: job.meta.artist,
                            result,
                        },
                    ));
                }

                let _ = store.close();
            });
        }
    });

    let mut reports = reports.into_inner().unwrap();
    reports.sort_by_key(|(idx, _)| *idx);
    reports.into_iter().map(|(_, report)| report).collect()
}

fn drain_queue_with_error(
    queue: &Mutex<VecDeque<(usize, IngestJob)>>,
    reports: &Mutex<Vec<(usize, IngestReport)>>,
    cause: &Error,
) {
    loop {
        let job = queue.lock().unwrap().pop_front();
        let Some((idx, job)) = job else { break };
        reports.lock().unwrap().push((
            idx,
            IngestReport {
                title: job.meta.title,
                artist: job.meta.artist,
                result: Err(cause.clone()),
            },
        ));
    }
}
