//! Grid activity resolution.
//!
//! Which grid points carry data for a run depends on two things: whether a
//! movement label exists for the contralateral/ipsilateral body side, and
//! whether the point received nonzero projection weight from any recorded
//! channel.  Both are fixed at run start; the resulting mask never changes.

use crate::grid::{GridLayout, Hemisphere, Segment};
use crate::projection::ProjectionMatrices;
use ndarray::{Array2, Axis};

/// Which movement labels exist for this run, relative to the recording
/// hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Laterality {
    pub contra: bool,
    pub ipsi: bool,
}

impl Laterality {
    /// Resolve from the label channel names.
    ///
    /// A right-hemisphere recording's contralateral side is the left body
    /// side, so a label name containing `"LEFT"` makes `contra` true; and
    /// symmetrically for the rest.
    pub fn resolve(label_names: &[String], hemisphere: Hemisphere) -> Self {
        let has_left = label_names.iter().any(|n| n.contains("LEFT"));
        let has_right = label_names.iter().any(|n| n.contains("RIGHT"));
        match hemisphere {
            Hemisphere::Right => Laterality { contra: has_left, ipsi: has_right },
            Hemisphere::Left => Laterality { contra: has_right, ipsi: has_left },
        }
    }

    /// Index of the label channel for the contralateral side, if present.
    pub fn contra_channel(label_names: &[String], hemisphere: Hemisphere) -> Option<usize> {
        let side = match hemisphere {
            Hemisphere::Right => "LEFT",
            Hemisphere::Left => "RIGHT",
        };
        label_names.iter().position(|n| n.contains(side))
    }

    /// Index of the label channel for the ipsilateral side, if present.
    pub fn ipsi_channel(label_names: &[String], hemisphere: Hemisphere) -> Option<usize> {
        let side = match hemisphere {
            Hemisphere::Right => "RIGHT",
            Hemisphere::Left => "LEFT",
        };
        label_names.iter().position(|n| n.contains(side))
    }
}

/// 0/1 mask over the full grid-point vector.
///
/// A point is active iff its segment's label exists and its projection row
/// has nonzero weight.
pub fn active_grid_points(
    matrices: &ProjectionMatrices,
    laterality: Laterality,
    layout: &GridLayout,
) -> Vec<bool> {
    fn mark(active: &mut [bool], layout: &GridLayout, segment: Segment, matrix: &Array2<f64>) {
        let range = layout.range(segment);
        for (i, row) in matrix.axis_iter(Axis(0)).enumerate() {
            if row.sum() != 0.0 {
                active[range.start + i] = true;
            }
        }
    }

    let mut active = vec![false; layout.total()];
    if let Some(cortex) = &matrices.cortex {
        if laterality.contra {
            mark(&mut active, layout, Segment::CortexContra, cortex);
        }
        if laterality.ipsi {
            mark(&mut active, layout, Segment::CortexIpsi, cortex);
        }
    }
    if let Some(subcortex) = &matrices.subcortex {
        if laterality.contra {
            mark(&mut active, layout, Segment::SubcortexContra, subcortex);
        }
        if laterality.ipsi {
            mark(&mut active, layout, Segment::SubcortexIpsi, subcortex);
        }
    }
    active
}

/// Scatter per-structure projected features `(grid_points × bands)` into the
/// full layout vector `(layout.total() × bands)`.
///
/// A structure's block is written into the contra and ipsi segments whose
/// labels exist; everything else stays zero.
pub fn scatter_projected(
    layout: &GridLayout,
    laterality: Laterality,
    cortex: Option<&Array2<f64>>,
    subcortex: Option<&Array2<f64>>,
    n_bands: usize,
) -> Array2<f64> {
    let mut full = Array2::zeros((layout.total(), n_bands));

    let mut write = |segment: Segment, block: &Array2<f64>| {
        let range = layout.range(segment);
        full.slice_mut(ndarray::s![range, ..]).assign(block);
    };

    if let Some(block) = cortex {
        if laterality.contra {
            write(Segment::CortexContra, block);
        }
        if laterality.ipsi {
            write(Segment::CortexIpsi, block);
        }
    }
    if let Some(block) = subcortex {
        if laterality.contra {
            write(Segment::SubcortexContra, block);
        }
        if laterality.ipsi {
            write(Segment::SubcortexIpsi, block);
        }
    }
    full
}
