use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};

/// Channel layout of a sample stream. Stereo streams are interleaved
/// left/right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }
}

/// A finite stream of normalized samples in [-1, 1] at a fixed rate.
/// Collaborators handle container decoding; only this shape enters the
/// recognition core.
#[derive(Debug, Clone)]
pub struct PcmStream {
    samples: Vec<f64>,
    sample_rate: u32,
    layout: ChannelLayout,
}

impl PcmStream {
    pub fn new(samples: Vec<f64>, sample_rate: u32, layout: ChannelLayout) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::invalid_input("sample rate must be positive"));
        }
        if layout == ChannelLayout::Stereo && samples.len() % 2 != 0 {
            return Err(Error::invalid_input(
                "interleaved stereo stream must have an even number of samples",
            ));
        }
        Ok(PcmStream { samples, sample_rate, layout })
    }

    pub fn mono(samples: Vec<f64>, sample_rate: u32) -> Result<Self> {
        PcmStream::new(samples, sample_rate, ChannelLayout::Mono)
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds, derived from the per-channel sample count.
    pub fn duration(&self) -> f64 {
        let per_channel = self.samples.len() / self.layout.channels();
        per_channel as f64 / self.sample_rate as f64
    }

    /// Splits the stream into independent mono channels. Mono streams yield
    /// a single channel; stereo streams are deinterleaved into left and
    /// right.
    pub fn split_channels(&self) -> Vec<Vec<f64>> {
        match self.layout {
            ChannelLayout::Mono => vec![self.samples.clone()],
            ChannelLayout::Stereo => {
                let left = self.samples.iter().copied().step_by(2).collect();
                let right = self.samples.iter().copied().skip(1).step_by(2).collect();
                vec![left, right]
            }
        }
    }
}

/// Decodes a raw little-endian PCM block into normalized samples.
/// Supported bits per sample: 8 (unsigned), 16, 24 and 32 (signed).
pub fn bytes_to_samples(raw: &[u8], bits_per_sample: u16) -> Result<Vec<f64>> {
    let mut reader = Cursor::new(raw);
    let mut samples = Vec::with_capacity(raw.len() / (bits_per_sample as usize / 8).max(1));

    match bits_per_sample {
        8 => {
            for &byte in raw {
                samples.push(byte as f64 / 127.5 - 1.0);
            }
        }
        16 => {
            if raw.len() % 2 != 0 {
                return Err(Error::invalid_input("16-bit sample block truncated"));
            }
            while let Ok(val) = reader.read_i16::<LittleEndian>() {
                samples.push(val as f64 / 32768.0);
            }
        }
        24 => {
            if raw.len() % 3 != 0 {
                return Err(Error::invalid_input("24-bit sample block truncated"));
            }
            for chunk in raw.chunks_exact(3) {
                // Sign-extend the 24-bit value through the top of an i32.
                let val = i32::from_le_bytes([0, chunk[0], chunk[1], chunk[2]]) >> 8;
                samples.push(val as f64 / 8388608.0);
            }
        }
        32 => {
            if raw.len() % 4 != 0 {
                return Err(Error::invalid_input("32-bit sample block truncated"));
            }
            while let Ok(val) = reader.read_i32::<LittleEndian>() {
                samples.push(val as f64 / 2147483648.0);
            }
        }
        other => {
            return Err(Error::invalid_input(format!(
                "unsupported bitsPerSample: {}",
                other
            )));
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_samples_16_bit() {
        // 0, i16::MAX, i16::MIN in little-endian order.
        let raw = [0u8, 0, 0xFF, 0x7F, 0x00, 0x80];
        let samples = bytes_to_samples(&raw, 16).unwrap();
        assert_eq!(samples.len(), 3);
        assert!(samples[0].abs() < 1e-9);
        assert!((samples[1] - (32767.0 / 32768.0)).abs() < 1e-9);
        assert!((samples[2] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bytes_to_samples_8_bit_midpoint() {
        let samples = bytes_to_samples(&[0, 255], 8).unwrap();
        assert!((samples[0] + 1.0).abs() < 1e-9);
        assert!((samples[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bytes_to_samples_24_bit_sign() {
        // -1 in 24-bit two's complement.
        let samples = bytes_to_samples(&[0xFF, 0xFF, 0xFF], 24).unwrap();
        assert!((samples[0] + 1.0 / 8388608.0).abs() < 1e-12);
    }

    #[test]
    fn test_bytes_to_samples_rejects_unsupported_width() {
        assert!(matches!(
            bytes_to_samples(&[0, 0], 12),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_stereo_split() {
        let stream = PcmStream::new(
            vec![0.1, -0.1, 0.2, -0.2, 0.3, -0.3],
            44100,
            ChannelLayout::Stereo,
        )
        .unwrap();
        let channels = stream.split_channels();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0], vec![0.1, 0.2, 0.3]);
        assert_eq!(channels[1], vec![-0.1, -0.2, -0.3]);
    }

    #[test]
    fn test_duration_counts_per_channel() {
        let mono = PcmStream::mono(vec![0.0; 44100], 44100).unwrap();
        assert!((mono.duration() - 1.0).abs() < 1e-9);

        let stereo = PcmStream::new(vec![0.0; 88200], 44100, ChannelLayout::Stereo).unwrap();
        assert!((stereo.duration() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_zero_sample_rate() {
        assert!(matches!(
            PcmStream::mono(vec![0.0], 0),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_odd_stereo_stream() {
        assert!(matches!(
            PcmStream::new(vec![0.0; 3], 44100, ChannelLayout::Stereo),
            Err(Error::InvalidInput(_))
        ));
    }
}
