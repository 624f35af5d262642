//! FFT convolution and per-band power estimation.
//!
//! [`band_power`] is the per-channel signal processor: notch-filter the
//! segment, convolve with each band kernel (centered, same-length output) and
//! reduce to one variance per band over that band's trailing window.
//!
//! The full-length convolution is computed and mostly discarded for the short
//! bands; an incremental filter would avoid the redundant work but this keeps
//! one code path for every band.

use anyhow::{ensure, Result};
use ndarray::{Array1, ArrayView1};
use rustfft::{num_complex::Complex, FftPlanner};

use super::design::FilterBank;

/// Centered "same" convolution of `x` with kernel `h`.
///
/// Output has the length of `x`; for odd-length `h` the kernel is centered on
/// each sample.  Computed as the full linear convolution via FFT, then sliced
/// to the middle `x.len()` samples.
pub fn convolve_same(x: &[f64], h: &[f64]) -> Vec<f64> {
    let n = x.len();
    let m = h.len();
    if n == 0 || m == 0 {
        return vec![0.0; n];
    }
    let n_full = n + m - 1;

    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft_fwd = planner.plan_fft_forward(n_full);
    let fft_inv = planner.plan_fft_inverse(n_full);

    let mut xf: Vec<Complex<f64>> = x
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(n_full)
        .collect();
    let mut hf: Vec<Complex<f64>> = h
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(n_full)
        .collect();

    fft_fwd.process(&mut xf);
    fft_fwd.process(&mut hf);
    for (a, b) in xf.iter_mut().zip(&hf) {
        *a *= *b;
    }
    fft_inv.process(&mut xf);

    let scale = 1.0 / n_full as f64;
    let start = (m - 1) / 2;
    xf[start..start + n]
        .iter()
        .map(|c| c.re * scale)
        .collect()
}

/// Population variance (ddof = 0).
pub fn variance(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    x.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n
}

/// Band-power features for one channel segment.
///
/// 1. Convolve `segment` with the pre-built `notch` kernel.
/// 2. For each band kernel in `bank`, centered-convolve and take the variance
///    of the trailing `seg_samples[band]` samples.
///
/// Returns one power value per band.  A segment shorter than a band's window
/// degrades gracefully: the variance then covers the whole segment.
pub fn band_power(
    segment: ArrayView1<'_, f64>,
    bank: &FilterBank,
    notch: &[f64],
    seg_samples: &[usize],
) -> Result<Array1<f64>> {
    ensure!(
        seg_samples.len() == bank.n_bands(),
        "{} trailing windows configured for {} bands",
        seg_samples.len(),
        bank.n_bands()
    );
    let seg: Vec<f64> = segment.to_vec();
    let denoised = convolve_same(&seg, notch);

    let mut power = Array1::zeros(bank.n_bands());
    for band in 0..bank.n_bands() {
        let kernel = bank.kernel(band);
        let filtered = convolve_same(&denoised, kernel.as_slice().unwrap());
        let tail = seg_samples[band].min(filtered.len());
        power[band] = variance(&filtered[filtered.len() - tail..]);
    }
    Ok(power)
}
