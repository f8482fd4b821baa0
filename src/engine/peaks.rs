/// A spectro-temporal local maximum: the time of its frame and the absolute
/// frequency bin index within the real half-spectrum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub time: f64,
    pub freq_bin: u16,
}

/// Frequency-bin bands the half-spectrum is partitioned into. Low bands are
/// narrow because most musical energy sits there.
const BANDS: [(usize, usize); 6] = [(0, 10), (10, 20), (20, 40), (40, 80), (80, 160), (160, 512)];

/// Extracts significant peaks from a magnitude spectrogram.
///
/// Per frame, the loudest bin of each band is a candidate; candidates louder
/// than the mean of all six band maxima become peaks. Peaks come out in
/// frame order, so downstream pairing can rely on non-decreasing times.
pub fn extract_peaks(spectrogram: &[Vec<f64>], audio_duration: f64) -> Vec<Peak> {
    if spectrogram.is_empty() {
        return Vec::new();
    }

    struct BandMax {
        magnitude: f64,
        freq_bin: usize,
    }

    let frame_duration = audio_duration / spectrogram.len() as f64;
    let mut peaks = Vec::new();

    for (frame_idx, frame) in spectrogram.iter().enumerate() {
        let mut band_maxima = Vec::with_capacity(BANDS.len());
        for &(band_min, band_max) in BANDS.iter() {
            let band_end = band_max.min(frame.len());
            let mut best = BandMax { magnitude: 0.0, freq_bin: band_min };
            for (offset, &magnitude) in frame[band_min.min(band_end)..band_end].iter().enumerate() {
                // Strict comparison keeps the lowest bin on ties.
                if magnitude > best.magnitude {
                    best = BandMax { magnitude, freq_bin: band_min + offset };
                }
            }
            band_maxima.push(best);
        }

        let avg: f64 =
            band_maxima.iter().map(|m| m.magnitude).sum::<f64>() / band_maxima.len() as f64;

        for band_max in &band_maxima {
            if band_max.magnitude > avg {
                peaks.push(Peak {
                    time: frame_idx as f64 * frame_duration,
                    freq_bin: band_max.freq_bin as u16,
                });
            }
        }
    }

    peaks
}
