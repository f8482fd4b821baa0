use std::f64::consts::PI;

use num_complex::Complex;

use crate::error::{Error, Result};

/// Computes the discrete Fourier transform of a real-valued signal.
/// The input length must be a power of two. Output index `k` corresponds to
/// frequency `k * sample_rate / len`.
pub fn fft(input: &[f64]) -> Result<Vec<Complex<f64>>> {
    if !input.len().is_power_of_two() {
        return Err(Error::dsp(format!(
            "FFT input length must be a power of two, got {}",
            input.len()
        )));
    }
    let complex_input: Vec<Complex<f64>> =
        input.iter().map(|&v| Complex::new(v, 0.0)).collect();
    Ok(recursive_fft(&complex_input))
}

/// Radix-2 decimation-in-time Cooley-Tukey.
fn recursive_fft(data: &[Complex<f64>]) -> Vec<Complex<f64>> {
    let n = data.len();
    if n <= 1 {
        return data.to_vec();
    }

    let even: Vec<Complex<f64>> = data.iter().step_by(2).cloned().collect();
    let odd: Vec<Complex<f64>> = data.iter().skip(1).step_by(2).cloned().collect();

    let fft_even = recursive_fft(&even);
    let fft_odd = recursive_fft(&odd);

    let mut result = vec![Complex::new(0.0, 0.0); n];
    for k in 0..n / 2 {
        let twiddle = Complex::from_polar(1.0, -2.0 * PI * k as f64 / n as f64) * fft_odd[k];
        result[k] = fft_even[k] + twiddle;
        result[k + n / 2] = fft_even[k] - twiddle;
    }

    result
}
