//! Distance-weighted spatial projection onto the anatomical grid.
//!
//! For each grid point, every recorded channel of the same structure within
//! the structure's max distance contributes weight `1/d`, normalized so the
//! weights of a grid point sum to exactly 1.  Grid points with no channel in
//! range get an all-zero row; a channel sitting exactly on a grid point takes
//! the full weight.

use crate::grid::{Grid, Hemisphere};
use anyhow::{ensure, Result};
use ndarray::Array2;

/// Electrode positions of one run, `(channels × 3)` per structure.
///
/// A structure with no recorded channels is `None` and stays absent through
/// projection and activity resolution.
#[derive(Debug, Clone)]
pub struct PatientCoords {
    pub cortex: Option<Array2<f64>>,
    pub subcortex: Option<Array2<f64>>,
}

/// Per-structure projection matrices, `(grid_points × channels)`.
///
/// Computed once per run, immutable afterwards.  Every row sums to 1 over the
/// used channels, or to 0 when no channel is within range.
#[derive(Debug, Clone)]
pub struct ProjectionMatrices {
    pub cortex: Option<Array2<f64>>,
    pub subcortex: Option<Array2<f64>>,
}

/// Compute the projection matrices for one run.
///
/// `hemisphere` selects the grid halves; `max_dist_cortex` /
/// `max_dist_subcortex` are the structure-specific interpolation radii in the
/// grid's units (mm).
pub fn calc_projection_matrix(
    coords: &PatientCoords,
    grid: &Grid,
    hemisphere: Hemisphere,
    max_dist_cortex: f64,
    max_dist_subcortex: f64,
) -> Result<ProjectionMatrices> {
    let (grid_cortex, grid_subcortex) = grid.hemisphere(hemisphere);
    Ok(ProjectionMatrices {
        cortex: coords
            .cortex
            .as_ref()
            .map(|c| structure_matrix(c, grid_cortex, max_dist_cortex))
            .transpose()?,
        subcortex: coords
            .subcortex
            .as_ref()
            .map(|c| structure_matrix(c, grid_subcortex, max_dist_subcortex))
            .transpose()?,
    })
}

/// Inverse-distance weight matrix for one structure.
fn structure_matrix(
    coords: &Array2<f64>,
    grid: &Array2<f64>,
    max_dist: f64,
) -> Result<Array2<f64>> {
    ensure!(coords.ncols() == 3, "electrode coordinates must be 3-D");
    ensure!(grid.ncols() == 3, "grid coordinates must be 3-D");

    let n_points = grid.nrows();
    let n_channels = coords.nrows();
    let mut matrix = Array2::zeros((n_points, n_channels));

    for p in 0..n_points {
        let dist: Vec<f64> = (0..n_channels)
            .map(|c| {
                let dx = grid[[p, 0]] - coords[[c, 0]];
                let dy = grid[[p, 1]] - coords[[c, 1]];
                let dz = grid[[p, 2]] - coords[[c, 2]];
                (dx * dx + dy * dy + dz * dz).sqrt()
            })
            .collect();

        // A coincident channel takes the full weight; 1/d would blow up.
        if let Some(hit) = dist.iter().position(|&d| d == 0.0) {
            matrix[[p, hit]] = 1.0;
            continue;
        }

        let used: Vec<usize> = (0..n_channels).filter(|&c| dist[c] < max_dist).collect();
        if used.is_empty() {
            continue; // all-zero row: grid point out of reach
        }
        let inv_sum: f64 = used.iter().map(|&c| 1.0 / dist[c]).sum();
        for &c in &used {
            matrix[[p, c]] = (1.0 / dist[c]) / inv_sum;
        }
    }
    Ok(matrix)
}

/// Project per-structure feature matrices `(channels × bands)` onto the grid.
///
/// Returns `(grid_points × bands)` per structure; a structure without input
/// data stays `None`.
pub fn project(
    matrices: &ProjectionMatrices,
    cortex_feats: Option<&Array2<f64>>,
    subcortex_feats: Option<&Array2<f64>>,
) -> (Option<Array2<f64>>, Option<Array2<f64>>) {
    let cortex = match (&matrices.cortex, cortex_feats) {
        (Some(m), Some(d)) => Some(m.dot(d)),
        _ => None,
    };
    let subcortex = match (&matrices.subcortex, subcortex_feats) {
        (Some(m), Some(d)) => Some(m.dot(d)),
        _ => None,
    };
    (cortex, subcortex)
}
