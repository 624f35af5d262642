//! FIR filter design: windowed-sinc band-pass bank and line-noise notch.
//!
//! Kernels are linear-phase Hamming-windowed sincs.  A band-pass is the
//! difference of two unit-DC lowpass kernels whose cutoffs sit at the
//! midpoints of the lower and upper transition bands; the multi-notch is a
//! unit impulse minus one band-pass per line-noise harmonic.

use anyhow::{ensure, Result};
use ndarray::{Array2, ArrayView1};
use std::f64::consts::PI;

/// Default kernel length for band filters: 1000 ms at 1 kHz.
pub const DEFAULT_BAND_TAPS: usize = 1001;

/// Default transition bandwidth for the band filters, Hz (each edge).
pub const DEFAULT_TRANS_BANDWIDTH: f64 = 4.0;

/// Transition bandwidth of each notch stop band, Hz.
pub const NOTCH_TRANS_BANDWIDTH: f64 = 7.0;

/// Total width of each notch stop band, Hz (±0.5 Hz around the harmonic).
pub const NOTCH_WIDTH: f64 = 1.0;

/// Line-noise harmonics removed: fundamental × {1, 2, 3}.
pub const NOTCH_HARMONICS: usize = 3;

/// One FIR band-pass kernel per configured frequency band, fixed for a run.
#[derive(Debug, Clone)]
pub struct FilterBank {
    /// Kernel matrix, shape `(bands × taps)`.
    kernels: Array2<f64>,
    /// The `(low, high)` band edges the kernels were built for.
    bands: Vec<(f64, f64)>,
}

impl FilterBank {
    /// Build the bank for `bands` at sampling rate `sfreq`.
    ///
    /// Every kernel has `n_taps` taps (must be odd) and transition bandwidths
    /// `l_trans_bw` / `h_trans_bw` on the low / high edge.  Fails when a
    /// band's edges are incompatible with `sfreq`.
    pub fn new(
        bands: &[(f64, f64)],
        sfreq: f64,
        n_taps: usize,
        l_trans_bw: f64,
        h_trans_bw: f64,
    ) -> Result<Self> {
        ensure!(!bands.is_empty(), "filter bank needs at least one band");
        let mut kernels = Array2::zeros((bands.len(), n_taps));
        for (i, &(low, high)) in bands.iter().enumerate() {
            let h = design_bandpass(low, high, sfreq, n_taps, l_trans_bw, h_trans_bw)?;
            kernels.row_mut(i).assign(&ArrayView1::from(&h));
        }
        Ok(Self { kernels, bands: bands.to_vec() })
    }

    /// Bank with the default taps and transition bandwidths.
    pub fn with_defaults(bands: &[(f64, f64)], sfreq: f64) -> Result<Self> {
        Self::new(bands, sfreq, DEFAULT_BAND_TAPS, DEFAULT_TRANS_BANDWIDTH, DEFAULT_TRANS_BANDWIDTH)
    }

    pub fn n_bands(&self) -> usize {
        self.kernels.nrows()
    }

    /// Kernel of band `i`.
    pub fn kernel(&self, i: usize) -> ArrayView1<'_, f64> {
        self.kernels.row(i)
    }

    pub fn bands(&self) -> &[(f64, f64)] {
        &self.bands
    }
}

/// Design a linear-phase band-pass FIR kernel.
///
/// Passband `[low, high]` Hz; the −6 dB cutoffs sit at `low − l_trans_bw/2`
/// and `high + h_trans_bw/2`.  `n_taps` must be odd.
///
/// Fails when the stop edges leave `(0, Nyquist)` — a configuration error
/// reported with the offending band parameters.
pub fn design_bandpass(
    low: f64,
    high: f64,
    sfreq: f64,
    n_taps: usize,
    l_trans_bw: f64,
    h_trans_bw: f64,
) -> Result<Vec<f64>> {
    ensure!(n_taps % 2 == 1, "band-pass kernel needs an odd tap count, got {n_taps}");
    ensure!(
        low > 0.0 && high > low,
        "invalid band edges ({low}, {high}) Hz"
    );
    let nyq = sfreq / 2.0;
    let cutoff_lo = low - l_trans_bw / 2.0;
    let cutoff_hi = high + h_trans_bw / 2.0;
    ensure!(
        cutoff_lo > 0.0,
        "band ({low}, {high}) Hz: lower transition band reaches below 0 Hz \
         (l_trans_bw = {l_trans_bw} Hz)"
    );
    ensure!(
        cutoff_hi < nyq,
        "band ({low}, {high}) Hz: upper transition band reaches Nyquist \
         ({nyq} Hz at fs = {sfreq} Hz, h_trans_bw = {h_trans_bw} Hz)"
    );

    // bandpass = lowpass(upper cutoff) − lowpass(lower cutoff)
    let lp_hi = firwin_lowpass(n_taps, cutoff_hi, sfreq);
    let lp_lo = firwin_lowpass(n_taps, cutoff_lo, sfreq);
    Ok(lp_hi.iter().zip(&lp_lo).map(|(a, b)| a - b).collect())
}

/// Design the line-noise notch kernel for one segment length.
///
/// Stop bands of width [`NOTCH_WIDTH`] are placed at `line_noise × {1..=3}`
/// with [`NOTCH_TRANS_BANDWIDTH`] transitions; harmonics at or above Nyquist
/// are skipped.  The kernel length is `segment_len − 1` rounded down to odd,
/// matching the segment it will be convolved with.
pub fn design_notch(line_noise: f64, sfreq: f64, segment_len: usize) -> Result<Vec<f64>> {
    ensure!(line_noise > 0.0, "line-noise frequency must be > 0, got {line_noise} Hz");
    ensure!(segment_len >= 4, "segment too short for notch design: {segment_len} samples");

    let mut n_taps = segment_len - 1;
    if n_taps % 2 == 0 {
        n_taps -= 1;
    }
    let nyq = sfreq / 2.0;

    // Unit impulse at the kernel center.
    let mut h = vec![0.0; n_taps];
    h[n_taps / 2] = 1.0;

    for k in 1..=NOTCH_HARMONICS {
        let freq = line_noise * k as f64;
        let hi = freq + NOTCH_WIDTH / 2.0 + NOTCH_TRANS_BANDWIDTH / 2.0;
        if hi >= nyq {
            continue;
        }
        let lo = freq - NOTCH_WIDTH / 2.0 - NOTCH_TRANS_BANDWIDTH / 2.0;
        ensure!(
            lo > 0.0,
            "notch at {freq} Hz reaches below 0 Hz (line_noise = {line_noise} Hz)"
        );
        let lp_hi = firwin_lowpass(n_taps, hi, sfreq);
        let lp_lo = firwin_lowpass(n_taps, lo, sfreq);
        for i in 0..n_taps {
            h[i] -= lp_hi[i] - lp_lo[i];
        }
    }
    Ok(h)
}

/// Hamming-windowed-sinc lowpass with unit DC gain.
///
/// `cutoff_hz` is the −6 dB point; `n` must be odd for linear phase.
pub fn firwin_lowpass(n: usize, cutoff_hz: f64, sfreq: f64) -> Vec<f64> {
    assert!(n % 2 == 1, "firwin requires odd N for linear-phase filter");
    let alpha = (n - 1) as f64 / 2.0;
    let nyq = sfreq / 2.0;
    let fc = cutoff_hz / nyq; // normalised [0, 1]

    let win = hamming(n);

    let mut h: Vec<f64> = (0..n)
        .map(|i| {
            let x = i as f64 - alpha;
            // f(x) = sin(π·fc·x) / (π·x);  lim_{x→0} f(x) = fc
            let sinc = if x == 0.0 { fc } else { (PI * fc * x).sin() / (PI * x) };
            sinc * win[i]
        })
        .collect();

    // Normalise so sum = 1 (unit DC gain).
    let s: f64 = h.iter().sum();
    h.iter_mut().for_each(|v| *v /= s);
    h
}

/// Hamming window of length `n`.
pub fn hamming(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frequency response magnitude of `h` at `freq` Hz.
    fn gain_at(h: &[f64], freq: f64, sfreq: f64) -> f64 {
        let omega = 2.0 * PI * freq / sfreq;
        let (mut re, mut im) = (0.0, 0.0);
        for (i, &v) in h.iter().enumerate() {
            re += v * (omega * i as f64).cos();
            im -= v * (omega * i as f64).sin();
        }
        (re * re + im * im).sqrt()
    }

    #[test]
    fn bandpass_is_symmetric() {
        let h = design_bandpass(13.0, 35.0, 1000.0, 1001, 4.0, 4.0).unwrap();
        let n = h.len();
        for i in 0..n / 2 {
            approx::assert_abs_diff_eq!(h[i], h[n - 1 - i], epsilon = 1e-12);
        }
    }

    #[test]
    fn bandpass_gain_profile() {
        let h = design_bandpass(13.0, 35.0, 1000.0, 1001, 4.0, 4.0).unwrap();
        // Passband center ≈ unity, DC and far stopband ≈ zero.
        assert!(gain_at(&h, 24.0, 1000.0) > 0.95);
        assert!(gain_at(&h, 0.0, 1000.0) < 1e-3);
        assert!(gain_at(&h, 100.0, 1000.0) < 1e-3);
    }

    #[test]
    fn band_above_nyquist_rejected() {
        let err = design_bandpass(60.0, 200.0, 250.0, 1001, 4.0, 4.0).unwrap_err();
        assert!(err.to_string().contains("Nyquist"), "unexpected error: {err}");
    }

    #[test]
    fn bank_shape_and_band_count() {
        let bands = [(4.0, 8.0), (8.0, 12.0), (60.0, 200.0)];
        let bank = FilterBank::with_defaults(&bands, 1000.0).unwrap();
        assert_eq!(bank.n_bands(), 3);
        assert_eq!(bank.kernel(0).len(), DEFAULT_BAND_TAPS);
        assert_eq!(bank.bands()[2], (60.0, 200.0));
    }

    #[test]
    fn notch_kills_line_noise_passes_neighbours() {
        let h = design_notch(50.0, 1000.0, 1000).unwrap();
        assert!(gain_at(&h, 50.0, 1000.0) < 0.05, "50 Hz not notched");
        assert!(gain_at(&h, 100.0, 1000.0) < 0.05, "100 Hz not notched");
        assert!(gain_at(&h, 150.0, 1000.0) < 0.05, "150 Hz not notched");
        assert!(gain_at(&h, 30.0, 1000.0) > 0.95, "30 Hz attenuated");
        assert!(gain_at(&h, 75.0, 1000.0) > 0.95, "75 Hz attenuated");
    }

    #[test]
    fn notch_skips_harmonics_at_nyquist() {
        // fs = 200 Hz: only the 50 Hz fundamental fits below 100 Hz Nyquist.
        let h = design_notch(50.0, 200.0, 400).unwrap();
        assert!(gain_at(&h, 50.0, 200.0) < 0.05);
        assert!(gain_at(&h, 20.0, 200.0) > 0.9);
    }

    #[test]
    fn notch_length_matches_segment() {
        let h = design_notch(60.0, 1000.0, 1000).unwrap();
        assert_eq!(h.len(), 999);
        let h = design_notch(60.0, 1000.0, 999).unwrap();
        assert_eq!(h.len(), 997);
    }

    #[test]
    fn lowpass_dc_gain_unity() {
        let h = firwin_lowpass(101, 10.0, 256.0);
        let dc: f64 = h.iter().sum();
        approx::assert_abs_diff_eq!(dc, 1.0, epsilon = 1e-12);
    }
}
