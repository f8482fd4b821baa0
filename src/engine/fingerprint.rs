use std::collections::HashMap;

use crate::engine::peaks::{extract_peaks, Peak};
use crate::engine::spectrogram::spectrogram;
use crate::error::Result;
use crate::models::Couple;
use crate::pcm::PcmStream;

const MAX_FREQ_BITS: u32 = 9;
const MAX_DELTA_BITS: u32 = 14;
pub const TARGET_ZONE_SIZE: usize = 5;

const FREQ_MASK: u32 = (1 << MAX_FREQ_BITS) - 1;
const DELTA_MASK: u32 = (1 << MAX_DELTA_BITS) - 1;

/// Generates fingerprints from a list of peaks, mapping each landmark-pair
/// address to a couple (anchor time in ms and song ID).
///
/// Each anchor is paired with up to `TARGET_ZONE_SIZE` subsequent peaks.
/// Pairs colliding on the same address overwrite in pairing order, so one
/// recording contributes at most one couple per address.
pub fn fingerprint(peaks: &[Peak], song_id: u32) -> HashMap<u32, Couple> {
    let mut fingerprints = HashMap::new();

    for (i, anchor) in peaks.iter().enumerate() {
        for target in peaks.iter().skip(i + 1).take(TARGET_ZONE_SIZE) {
            let address = create_address(anchor, target);
            let anchor_time_ms = (anchor.time * 1000.0).round() as u32;
            fingerprints.insert(address, Couple { anchor_time_ms, song_id });
        }
    }

    fingerprints
}

/// Packs an anchor/target peak pair into the 32-bit landmark address:
/// 9 bits of anchor frequency, 9 bits of target frequency, 14 bits of delta
/// time in milliseconds.
pub fn create_address(anchor: &Peak, target: &Peak) -> u32 {
    let anchor_freq = anchor.freq_bin as u32;
    let target_freq = target.freq_bin as u32;
    let delta_ms = ((target.time - anchor.time) * 1000.0).round() as u32;
    debug_assert!(
        delta_ms < (1 << MAX_DELTA_BITS),
        "delta {}ms overflows the 14-bit field",
        delta_ms
    );

    (anchor_freq & FREQ_MASK) << 23 | (target_freq & FREQ_MASK) << 14 | (delta_ms & DELTA_MASK)
}

/// Fingerprints a PCM stream end to end: spectrogram, peak extraction and
/// landmark pairing for each channel, with the per-channel maps unioned
/// under the same song ID.
pub fn fingerprint_stream(
    audio: &PcmStream,
    audio_duration: f64,
    song_id: u32,
) -> Result<HashMap<u32, Couple>> {
    let mut fingerprints = HashMap::new();

    for channel in audio.split_channels() {
        let spectro = spectrogram(&channel, audio.sample_rate())?;
        let peaks = extract_peaks(&spectro, audio_duration);
        fingerprints.extend(fingerprint(&peaks, song_id));
    }

    Ok(fingerprints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcm::ChannelLayout;

    #[test]
    fn test_address_bit_layout_is_invertible() {
        let anchor = Peak { time: 1.0, freq_bin: 100 };
        let target = Peak { time: 1.05, freq_bin: 200 };
        let address = create_address(&anchor, &target);

        assert_eq!(address >> 23, 100);
        assert_eq!((address >> 14) & 0x1FF, 200);
        assert_eq!(address & 0x3FFF, 50);
    }

    #[test]
    fn test_address_matches_manual_packing() {
        let anchor = Peak { time: 0.25, freq_bin: 7 };
        let target = Peak { time: 0.375, freq_bin: 300 };
        let expected = (7u32 << 23) | (300u32 << 14) | 125;
        assert_eq!(create_address(&anchor, &target), expected);
    }

    #[test]
    fn test_target_zone_bounds_pair_count() {
        let peaks: Vec<Peak> = (0..10)
            .map(|i| Peak { time: i as f64 * 0.01, freq_bin: i as u16 })
            .collect();
        let fingerprints = fingerprint(&peaks, 1);
        // Distinct freq/delta combinations: every anchor pairs with at most
        // five targets, the tail anchors with fewer.
        let expected: usize = (0..10).map(|i| TARGET_ZONE_SIZE.min(10 - i - 1)).sum();
        assert_eq!(fingerprints.len(), expected);
    }

    #[test]
    fn test_collision_keeps_last_pair() {
        // Two anchors with identical freq/delta geometry collide; the
        // later anchor's couple must win.
        let peaks = vec![
            Peak { time: 0.0, freq_bin: 50 },
            Peak { time: 0.010, freq_bin: 60 },
            Peak { time: 1.0, freq_bin: 50 },
            Peak { time: 1.010, freq_bin: 60 },
        ];
        let fingerprints = fingerprint(&peaks, 9);
        let colliding = create_address(&peaks[2], &peaks[3]);
        assert_eq!(fingerprints[&colliding].anchor_time_ms, 1000);
    }

    #[test]
    fn test_anchor_time_is_rounded_to_ms() {
        let peaks = vec![
            Peak { time: 0.0307, freq_bin: 10 },
            Peak { time: 0.0425, freq_bin: 20 },
        ];
        let fingerprints = fingerprint(&peaks, 3);
        let couple = fingerprints.values().next().unwrap();
        assert_eq!(couple.anchor_time_ms, 31);
        assert_eq!(couple.song_id, 3);
    }

    #[test]
    fn test_stereo_channels_union_under_one_id() {
        // A stereo stream whose left channel is a tone and whose right
        // channel is silence still fingerprints under one song ID.
        let sample_rate = 11025u32;
        let seconds = 2.0;
        let frames = (sample_rate as f64 * seconds) as usize;
        let mut interleaved = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let t = i as f64 / sample_rate as f64;
            interleaved.push(0.8 * (2.0 * std::f64::consts::PI * 700.0 * t).sin());
            interleaved.push(0.0);
        }
        let audio = PcmStream::new(interleaved, sample_rate, ChannelLayout::Stereo).unwrap();
        let fingerprints = fingerprint_stream(&audio, audio.duration(), 77).unwrap();
        assert!(!fingerprints.is_empty());
        assert!(fingerprints.values().all(|c| c.song_id == 77));
    }
}
