use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::pcm::PcmStream;

const NOTE_LEN_SECONDS: f64 = 0.1;
const NOTE_STEP_HZ: f64 = 15.0;

/// A ladder of short, strictly ascending tones starting at 800 Hz. No note
/// repeats, so every landmark anchors at a unique position in the clip.
pub(crate) fn tone_ladder(seconds: f64, sample_rate: u32) -> PcmStream {
    tone_ladder_from(seconds, sample_rate, 800.0)
}

/// Same ladder shape from an arbitrary base frequency, for building
/// catalogues of mutually dissimilar clips.
pub(crate) fn tone_ladder_from(seconds: f64, sample_rate: u32, base_hz: f64) -> PcmStream {
    let total = (seconds * sample_rate as f64).round() as usize;
    let samples = (0..total)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            let note = (t / NOTE_LEN_SECONDS) as usize;
            let freq = base_hz + NOTE_STEP_HZ * note as f64;
            0.8 * (2.0 * PI * freq * t).sin()
        })
        .collect();
    PcmStream::mono(samples, sample_rate).expect("valid synthetic stream")
}

/// Cuts the mono stream down to the `[from, to)` second range.
pub(crate) fn slice_seconds(audio: &PcmStream, from: f64, to: f64) -> PcmStream {
    let rate = audio.sample_rate();
    let start = (from * rate as f64) as usize;
    let end = ((to * rate as f64) as usize).min(audio.samples().len());
    PcmStream::mono(audio.samples()[start..end].to_vec(), rate).expect("valid synthetic slice")
}

/// Adds seeded white Gaussian noise at the given signal-to-noise ratio.
pub(crate) fn noisy(audio: &PcmStream, snr_db: f64, seed: u64) -> PcmStream {
    let samples = audio.samples();
    let signal_power = samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64;
    let sigma = (signal_power / 10f64.powf(snr_db / 10.0)).sqrt();

    let mut rng = StdRng::seed_from_u64(seed);
    let noisy = samples
        .iter()
        .map(|&s| {
            // Box-Muller transform over two uniform draws.
            let u1: f64 = rng.random::<f64>().max(1e-12);
            let u2: f64 = rng.random();
            let gauss = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
            s + sigma * gauss
        })
        .collect();
    PcmStream::mono(noisy, audio.sample_rate()).expect("valid synthetic stream")
}
