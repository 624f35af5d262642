//! Offline (batch) pipeline driver.
//!
//! Walks a pre-loaded recording at the output rate: for each step, slices the
//! trailing sample window, extracts band power for every data channel,
//! projects onto the grid and median-normalizes — feeding the incremental
//! normalizer frame by frame, exactly as the streaming driver does, so the
//! two produce identical sequences.
//!
//! Steps are skipped until one full buffer of raw samples exists; strict
//! causality holds throughout: step `t` reads nothing past its own window.

use crate::context::RunContext;
use crate::labels::baseline_correction;
use crate::normalize::MedianNormalizer;
use anyhow::{ensure, Result};
use ndarray::{s, Array1, Array2, Array3};

/// Everything the offline driver produces for one run.
pub struct OfflineResult {
    /// Normalized raw features, `(steps × data_channels × bands)`.
    pub raw_features: Array3<f64>,
    /// Normalized projected features, `(steps × grid_points × bands)`.
    pub projected_features: Array3<f64>,
    /// Normalized label values, `(steps × label_channels)`.
    pub label_features: Array2<f64>,
    /// Raw-sample index each step's window ends at (exclusive).
    pub sample_idx: Vec<usize>,
    /// Baseline-corrected full-rate label traces, `(label_channels × samples)`.
    pub label_corrected: Array2<f64>,
    /// Binary movement masks for the corrected traces, same shape.
    pub label_onoff: Array2<f64>,
    /// Per-label movement thresholds.
    pub label_thresholds: Vec<f64>,
}

/// Run the full offline chain over `raw` (`all_channels × samples`).
pub fn run_offline(raw: &Array2<f64>, ctx: &RunContext) -> Result<OfflineResult> {
    ensure!(
        raw.ncols() >= ctx.buffer_len + ctx.step,
        "recording of {} samples is shorter than one {}-sample buffer plus a step",
        raw.ncols(),
        ctx.buffer_len
    );

    let n_steps_total = raw.ncols() / ctx.step;
    let n_bands = ctx.n_bands();
    let n_data = ctx.n_data_channels();
    let n_label = ctx.selection.label.len();

    let mut raw_frames: Vec<Array2<f64>> = Vec::new();
    let mut proj_frames: Vec<Array2<f64>> = Vec::new();
    let mut label_rows: Vec<Array1<f64>> = Vec::new();
    let mut sample_idx = Vec::new();

    let mut rf_norm = MedianNormalizer::new(ctx.normalization_samples);
    let mut pf_norm = MedianNormalizer::new(ctx.normalization_samples);
    let mut mov_norm = MedianNormalizer::new(ctx.normalization_samples);

    for c in 0..n_steps_total {
        let idx = c * ctx.step;
        if idx < ctx.buffer_len {
            continue; // not yet one full window of raw data
        }
        let window = raw.slice(s![.., idx - ctx.buffer_len..idx]);
        let (raw_frame, proj_frame) = ctx.extract_frame(window)?;

        let label = ctx.label_frame(&raw.view(), idx - 1);

        raw_frames.push(rf_norm.normalize(&raw_frame));
        proj_frames.push(pf_norm.normalize(&proj_frame));
        label_rows.push(mov_norm.normalize(&label).column(0).to_owned());
        sample_idx.push(idx);
    }

    let n_steps = raw_frames.len();
    let mut raw_features = Array3::zeros((n_steps, n_data, n_bands));
    let mut projected_features = Array3::zeros((n_steps, ctx.layout.total(), n_bands));
    let mut label_features = Array2::zeros((n_steps, n_label));
    for (t, frame) in raw_frames.iter().enumerate() {
        raw_features.slice_mut(s![t, .., ..]).assign(frame);
    }
    for (t, frame) in proj_frames.iter().enumerate() {
        projected_features.slice_mut(s![t, .., ..]).assign(frame);
    }
    for (t, row) in label_rows.iter().enumerate() {
        label_features.row_mut(t).assign(row);
    }

    // Full-rate label correction, independent of the feature stepping.
    let mut label_corrected = Array2::zeros((n_label, raw.ncols()));
    let mut label_onoff = Array2::zeros((n_label, raw.ncols()));
    let mut label_thresholds = Vec::with_capacity(n_label);
    for (row, &ch) in ctx.selection.label.iter().enumerate() {
        let trace: Vec<f64> = raw.row(ch).to_vec();
        let (corrected, onoff, threshold) = baseline_correction(&trace);
        label_corrected
            .row_mut(row)
            .assign(&Array1::from_vec(corrected));
        label_onoff.row_mut(row).assign(&Array1::from_vec(onoff));
        label_thresholds.push(threshold);
    }

    Ok(OfflineResult {
        raw_features,
        projected_features,
        label_features,
        sample_idx,
        label_corrected,
        label_onoff,
        label_thresholds,
    })
}
