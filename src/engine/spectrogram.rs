use std::f64::consts::PI;

use crate::engine::fft::fft;
use crate::engine::filter::LowPassFilter;
use crate::error::{Error, Result};

pub const DSP_RATIO: u32 = 4;
pub const WINDOW_SIZE: usize = 1024;
pub const MAX_FREQ_HZ: f64 = 5000.0; // 5kHz
pub const HOP_SIZE: usize = WINDOW_SIZE / 32;

/// Analysis window applied to each frame before the FFT. Hamming is the
/// reference shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowKind {
    #[default]
    Hamming,
    Hanning,
}

fn make_window(kind: WindowKind, size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / (size - 1) as f64;
            match kind {
                WindowKind::Hamming => 0.54 - 0.46 * theta.cos(),
                WindowKind::Hanning => 0.5 - 0.5 * theta.cos(),
            }
        })
        .collect()
}

/// Computes the magnitude spectrogram of the input samples: low-pass filter,
/// decimation, then a windowed STFT keeping the real half-spectrum of each
/// frame. Returns one row per frame, each holding `WINDOW_SIZE / 2` bins.
///
/// Inputs shorter than one full window after decimation produce an empty
/// spectrogram.
pub fn spectrogram(samples: &[f64], sample_rate: u32) -> Result<Vec<Vec<f64>>> {
    spectrogram_with_window(samples, sample_rate, WindowKind::Hamming)
}

pub fn spectrogram_with_window(
    samples: &[f64],
    sample_rate: u32,
    window_kind: WindowKind,
) -> Result<Vec<Vec<f64>>> {
    if sample_rate == 0 {
        return Err(Error::invalid_input("sample rate must be positive"));
    }

    let mut lpf = LowPassFilter::new(MAX_FREQ_HZ, sample_rate as f64);
    let filtered_samples = lpf.filter(samples);

    let target_sample_rate = sample_rate / DSP_RATIO;
    let downsampled_samples = downsample(&filtered_samples, sample_rate, target_sample_rate)
        .map_err(|e| Error::dsp(format!("couldn't downsample audio samples: {}", e)))?;

    let window = make_window(window_kind, WINDOW_SIZE);
    let mut spectrogram = Vec::new();

    let mut start = 0;
    while start + WINDOW_SIZE <= downsampled_samples.len() {
        let mut frame = downsampled_samples[start..start + WINDOW_SIZE].to_vec();
        for (sample, coeff) in frame.iter_mut().zip(window.iter()) {
            *sample *= coeff;
        }

        let spectrum = fft(&frame)?;
        let magnitudes: Vec<f64> = spectrum[..WINDOW_SIZE / 2]
            .iter()
            .map(|bin| bin.norm())
            .collect();
        spectrogram.push(magnitudes);

        start += HOP_SIZE;
    }

    Ok(spectrogram)
}

/// Decimates the input from `original_sample_rate` to `target_sample_rate`
/// by averaging each block of `original / target` samples.
pub fn downsample(
    input: &[f64],
    original_sample_rate: u32,
    target_sample_rate: u32,
) -> Result<Vec<f64>> {
    if original_sample_rate == 0 || target_sample_rate == 0 {
        return Err(Error::dsp("sample rates must be positive"));
    }
    if target_sample_rate > original_sample_rate {
        return Err(Error::dsp(
            "target sample rate must be less than or equal to original sample rate",
        ));
    }

    let ratio = (original_sample_rate / target_sample_rate) as usize;

    let mut resampled = Vec::with_capacity(input.len() / ratio + 1);
    let mut i = 0;
    while i < input.len() {
        let end = (i + ratio).min(input.len());
        let sum: f64 = input[i..end].iter().sum();
        resampled.push(sum / (end - i) as f64);
        i += ratio;
    }

    Ok(resampled)
}
