use std::collections::HashMap;

use slog::info;

use crate::engine::fingerprint::fingerprint_stream;
use crate::error::{Error, Result};
use crate::models::{Couple, Match};
use crate::pcm::PcmStream;
use crate::store::FingerprintStore;
use crate::utils::{self, CancelToken};

pub const SCORE_TOLERANCE_MS: i64 = 100;

/// Fingerprints the query audio and ranks catalogued songs against it.
/// Returns matches sorted by score, best first; an empty list means the
/// catalogue holds nothing resembling the query.
pub fn find_matches(
    store: &dyn FingerprintStore,
    audio: &PcmStream,
    cancel: &CancelToken,
) -> Result<Vec<Match>> {
    // The probe ID tags the query-side couples and never reaches the store.
    let query = fingerprint_stream(audio, audio.duration(), utils::generate_unique_id())?;
    match_fingerprint(store, &query, cancel)
}

/// Ranks catalogued songs against an already computed query fingerprint,
/// e.g. one sent in by a remote client.
///
/// Cancellation is honored at the store-fetch boundary: a request observed
/// before the fetched couples are consumed aborts the query with
/// `Error::Cancelled` and no partial ranking.
pub fn match_fingerprint(
    store: &dyn FingerprintStore,
    query: &HashMap<u32, Couple>,
    cancel: &CancelToken,
) -> Result<Vec<Match>> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let addresses: Vec<u32> = query.keys().copied().collect();
    let couples_map = store.get_couples(&addresses)?;

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    // song_id -> list of (query anchor, reference anchor) pairs, and the
    // earliest reference anchor seen per candidate.
    let mut matches_map: HashMap<u32, Vec<[u32; 2]>> = HashMap::new();
    let mut earliest_timestamp: HashMap<u32, u32> = HashMap::new();

    for (address, couples) in couples_map.iter() {
        let Some(query_couple) = query.get(address) else {
            continue;
        };
        for couple in couples {
            matches_map
                .entry(couple.song_id)
                .or_default()
                .push([query_couple.anchor_time_ms, couple.anchor_time_ms]);
            earliest_timestamp
                .entry(couple.song_id)
                .and_modify(|t| *t = (*t).min(couple.anchor_time_ms))
                .or_insert(couple.anchor_time_ms);
        }
    }

    let mut match_list = Vec::new();
    for (&song_id, pairs) in matches_map.iter() {
        let Some(song) = store.get_song_by_id(song_id)? else {
            // The song was deleted after its fingerprints were stored.
            let logger = utils::get_logger();
            info!(logger, "song with ID ({}) doesn't exist", song_id);
            continue;
        };

        match_list.push(Match {
            song_id,
            song_title: song.title,
            song_artist: song.artist,
            external_ref: song.external_ref,
            timestamp: earliest_timestamp.get(&song_id).copied().unwrap_or(0),
            score: relative_timing_score(pairs),
        });
    }

    match_list.sort_by(|a, b| b.score.cmp(&a.score).then(a.song_id.cmp(&b.song_id)));

    Ok(match_list)
}

/// Scores a candidate by relative-timing coherence: the number of pair
/// combinations whose query-side time delta matches the reference-side
/// delta within the tolerance.
fn relative_timing_score(pairs: &[[u32; 2]]) -> u64 {
    let mut count = 0u64;
    for i in 0..pairs.len() {
        for j in i + 1..pairs.len() {
            let query_delta = pairs[i][0] as i64 - pairs[j][0] as i64;
            let reference_delta = pairs[i][1] as i64 - pairs[j][1] as i64;
            if (query_delta - reference_delta).abs() < SCORE_TOLERANCE_MS {
                count += 1;
            }
        }
    }
    count
}

/// Histogram-of-offsets variant of the scorer: buckets every pair on its
/// reference-minus-query anchor offset and counts the densest bucket.
/// Linear instead of quadratic, and it orders well-separated candidates the
/// same way as the pairwise sweep.
pub fn offset_histogram_score(pairs: &[[u32; 2]]) -> u64 {
    let mut histogram: HashMap<i64, u64> = HashMap::new();
    for pair in pairs {
        let offset = pair[1] as i64 - pair[0] as i64;
        *histogram.entry(offset.div_euclid(SCORE_TOLERANCE_MS)).or_default() += 1;
    }
    histogram.into_values().max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ingest::index_track;
    use crate::engine::testutil::{noisy, slice_seconds, tone_ladder, tone_ladder_from};
    use crate::models::TrackMeta;
    use crate::store::{FingerprintStore, SqliteStore};

    fn open_test_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.sqlite3");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_relative_timing_score_counts_coherent_pairs() {
        // Three pairs at a constant offset of 2000ms cohere with each
        // other; the outlier coheres with none.
        let pairs = [[0, 2000], [500, 2500], [1000, 3000], [1500, 9999]];
        assert_eq!(relative_timing_score(&pairs), 3);
    }

    #[test]
    fn test_relative_timing_score_respects_tolerance() {
        assert_eq!(relative_timing_score(&[[0, 0], [100, 199]]), 1);
        assert_eq!(relative_timing_score(&[[0, 0], [100, 200]]), 0);
    }

    #[test]
    fn test_histogram_scorer_agrees_on_separated_candidates() {
        // A well-aligned candidate and a scattered one: both scorers must
        // put the aligned one on top.
        let aligned = [[0, 2000], [400, 2400], [800, 2810], [1200, 3205]];
        let scattered = [[0, 9000], [400, 120], [800, 44000], [1200, 700]];

        assert!(relative_timing_score(&aligned) > relative_timing_score(&scattered));
        assert!(offset_histogram_score(&aligned) > offset_histogram_score(&scattered));
        assert_eq!(offset_histogram_score(&[]), 0);
    }

    #[test]
    fn test_tie_break_prefers_lower_song_id() {
        let (_dir, mut store) = open_test_store();
        let id_a = store.register_song("A", "X", None).unwrap();
        let id_b = store.register_song("B", "Y", None).unwrap();

        let mut fingerprints = HashMap::new();
        fingerprints.insert(111u32, Couple { anchor_time_ms: 10, song_id: id_a });
        fingerprints.insert(222u32, Couple { anchor_time_ms: 20, song_id: id_b });
        store.store_fingerprints(&fingerprints).unwrap();

        // One matched address per song scores zero for both; the ranking
        // must fall back to the lower ID.
        let mut query = HashMap::new();
        query.insert(111u32, Couple { anchor_time_ms: 0, song_id: 1 });
        query.insert(222u32, Couple { anchor_time_ms: 0, song_id: 1 });

        let matches = match_fingerprint(&store, &query, &CancelToken::new()).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].score, matches[1].score);
        assert_eq!(matches[0].song_id, id_a.min(id_b));
        assert_eq!(matches[1].song_id, id_a.max(id_b));
    }

    #[test]
    fn test_empty_catalogue_yields_empty_ranking() {
        let (_dir, store) = open_test_store();
        let audio = tone_ladder(3.0, 44100);
        let matches = find_matches(&store, &audio, &CancelToken::new()).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_cancelled_before_fetch() {
        let (_dir, store) = open_test_store();
        let cancel = CancelToken::new();
        cancel.cancel();
        let audio = tone_ladder(2.0, 44100);
        assert!(matches!(
            find_matches(&store, &audio, &cancel),
            Err(Error::Cancelled)
        ));
    }

    #[test]
    fn test_self_match_recovers_song_and_offset() {
        let (_dir, mut store) = open_test_store();

        let reference = tone_ladder(10.0, 44100);
        let song_id = index_track(&mut store, &reference, &TrackMeta::new("Ladder", "Synth"))
            .unwrap();

        let query = slice_seconds(&reference, 2.0, 7.0);
        let matches = find_matches(&store, &query, &CancelToken::new()).unwrap();

        assert!(!matches.is_empty());
        let top = &matches[0];
        assert_eq!(top.song_id, song_id);
        assert_eq!(top.song_title, "Ladder");
        assert!(top.score > 0);
        // The query slice starts two seconds into the reference; matched
        // anchors may trail the slice start by up to a tone length.
        assert!(
            (top.timestamp as i64 - 2000).abs() <= 300,
            "anchor offset estimate {}ms too far from 2000ms",
            top.timestamp
        );
    }

    #[test]
    fn test_noisy_query_still_matches() {
        let (_dir, mut store) = open_test_store();

        let reference = tone_ladder(8.0, 44100);
        let song_id = index_track(&mut store, &reference, &TrackMeta::new("Noisy", "Synth"))
            .unwrap();

        let clean_query = slice_seconds(&reference, 1.0, 5.0);
        let clean = find_matches(&store, &clean_query, &CancelToken::new()).unwrap();
        let clean_score = clean[0].score;

        let noisy_query = noisy(&clean_query, 10.0, 42);
        let noisy_matches = find_matches(&store, &noisy_query, &CancelToken::new()).unwrap();

        assert_eq!(noisy_matches[0].song_id, song_id);
        assert!(
            noisy_matches[0].score * 4 >= clean_score,
            "noise crushed the score: {} vs clean {}",
            noisy_matches[0].score,
            clean_score
        );
    }

    #[test]
    fn test_distinct_catalogue_disambiguation() {
        let (_dir, mut store) = open_test_store();

        let clip_a = tone_ladder(6.0, 44100);
        let clip_b = tone_ladder_from(6.0, 44100, 2200.0);
        let clip_c = tone_ladder_from(6.0, 44100, 3400.0);

        let id_a = index_track(&mut store, &clip_a, &TrackMeta::new("A", "X")).unwrap();
        let id_b = index_track(&mut store, &clip_b, &TrackMeta::new("B", "Y")).unwrap();
        let id_c = index_track(&mut store, &clip_c, &TrackMeta::new("C", "Z")).unwrap();

        for (clip, expected) in [(&clip_a, id_a), (&clip_b, id_b), (&clip_c, id_c)] {
            let query = slice_seconds(clip, 1.0, 4.0);
            let matches = find_matches(&store, &query, &CancelToken::new()).unwrap();
            assert_eq!(matches[0].song_id, expected);
        }
    }

    #[test]
    fn test_deleted_song_is_dropped_from_ranking() {
        let (_dir, mut store) = open_test_store();

        let reference = tone_ladder(6.0, 44100);
        let song_id = index_track(&mut store, &reference, &TrackMeta::new("Gone", "Synth"))
            .unwrap();

        let query = slice_seconds(&reference, 1.0, 4.0);
        let before = find_matches(&store, &query, &CancelToken::new()).unwrap();
        assert_eq!(before[0].song_id, song_id);

        store.delete_song(song_id).unwrap();

        // Orphan fingerprints may remain, but the resolver must hide the
        // deleted song.
        let after = find_matches(&store, &query, &CancelToken::new()).unwrap();
        assert!(after.iter().all(|m| m.song_id != song_id));
    }

    #[test]
    fn test_wire_payload_reaches_matcher() {
        let (_dir, mut store) = open_test_store();

        let reference = tone_ladder(6.0, 44100);
        let song_id = index_track(&mut store, &reference, &TrackMeta::new("Wire", "Synth"))
            .unwrap();

        // Simulate a remote client shipping the fingerprint it computed.
        let query = slice_seconds(&reference, 1.0, 4.0);
        let fingerprint = crate::engine::fingerprint_stream(&query, query.duration(), 1).unwrap();
        let json = serde_json::json!({
            "fingerprint": fingerprint
                .iter()
                .map(|(address, couple)| (address.to_string(), couple.anchor_time_ms))
                .collect::<std::collections::HashMap<String, u32>>(),
        });

        let payload: crate::models::FingerprintPayload =
            serde_json::from_value(json).unwrap();
        let query_fp = payload.into_fingerprint().unwrap();
        let matches = match_fingerprint(&store, &query_fp, &CancelToken::new()).unwrap();
        assert_eq!(matches[0].song_id, song_id);
    }
}
