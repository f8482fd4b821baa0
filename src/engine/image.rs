use std::fs::File;
use std::io::BufWriter;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder, Luma};

use crate::error::{Error, Result};

/// Renders a magnitude spectrogram as a grayscale heat map and saves it as
/// a PNG: one row per frame, one column per frequency bin, intensities
/// scaled against the loudest bin.
pub fn spectrogram_to_image(spectrogram: &[Vec<f64>], output_path: &str) -> Result<()> {
    let num_frames = spectrogram.len();
    if num_frames == 0 {
        return Err(Error::invalid_input("spectrogram has no frames"));
    }
    let num_freq_bins = spectrogram[0].len();
    if num_freq_bins == 0 {
        return Err(Error::invalid_input("spectrogram has no frequency bins"));
    }

    let max_magnitude = spectrogram
        .iter()
        .flat_map(|frame| frame.iter())
        .fold(0.0f64, |acc, &m| acc.max(m));

    let mut img = GrayImage::new(num_freq_bins as u32, num_frames as u32);
    for (row, frame) in spectrogram.iter().enumerate() {
        for (col, &magnitude) in frame.iter().enumerate() {
            let intensity = if max_magnitude > 0.0 {
                (255.0 * (magnitude / max_magnitude)).floor() as u8
            } else {
                0
            };
            img.put_pixel(col as u32, row as u32, Luma([intensity]));
        }
    }

    let file = File::create(output_path)
        .map_err(|e| Error::store(format!("error creating spectrogram image: {}", e)))?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new(writer);
    encoder
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::L8)
        .map_err(|e| Error::store(format!("error encoding spectrogram image: {}", e)))?;

    Ok(())
}
