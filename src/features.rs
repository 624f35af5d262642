//! Causal time-lag feature stacking.
//!
//! Each predictor consumes the last K normalized feature frames of its grid
//! point flattened into one vector.  Block order is most-recent-first: block
//! 0 is frame `t`, block 1 is frame `t−1`, …, block K−1 is frame `t−K+1`.

use anyhow::{ensure, Result};
use ndarray::{Array1, Array3, ArrayView2, s};

/// Stack `k` lagged frames for every unit of a `(time × unit × band)` array.
///
/// Output shape `(time − k, unit, k·band)`; output step `i` covers absolute
/// time `k + i`, with lag block `j` holding the frame at `k + i − j`.
pub fn stack_lags(frames: &Array3<f64>, k: usize) -> Result<Array3<f64>> {
    let (n_time, n_units, n_bands) = frames.dim();
    ensure!(k > 0, "lag count must be at least 1");
    ensure!(
        n_time > k,
        "need more than {k} frames to stack {k} lags, got {n_time}"
    );

    let mut out = Array3::zeros((n_time - k, n_units, k * n_bands));
    for i in 0..n_time - k {
        let t = k + i;
        for j in 0..k {
            out.slice_mut(s![i, .., j * n_bands..(j + 1) * n_bands])
                .assign(&frames.slice(s![t - j, .., ..]));
        }
    }
    Ok(out)
}

/// Flatten one `(k × features)` window into a single lag vector,
/// most-recent-first: the window's last row becomes block 0.
pub fn stack_lags_block(window: ArrayView2<'_, f64>) -> Array1<f64> {
    let (k, n_feat) = window.dim();
    let mut out = Array1::zeros(k * n_feat);
    for j in 0..k {
        out.slice_mut(s![j * n_feat..(j + 1) * n_feat])
            .assign(&window.row(k - 1 - j));
    }
    out
}
