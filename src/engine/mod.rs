mod fft;
pub use fft::*;
mod filter;
pub use filter::*;
mod fingerprint;
pub use fingerprint::*;
mod image;
pub use self::image::*;
mod ingest;
pub use ingest::*;
mod matcher;
pub use matcher::*;
mod peaks;
pub use peaks::*;
mod spectrogram;
pub use spectrogram::*;

#[cfg(test)]
pub(crate) mod testutil;
