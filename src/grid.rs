//! Canonical anatomical grid.
//!
//! Four fixed 3-D point sets (cortex/subcortex × left/right) loaded once per
//! process; electrode layouts vary between patients, the grid never does.
//! [`GridLayout`] freezes the concatenation order of the full grid-point
//! vector — cortex-contra, cortex-ipsi, subcortex-contra, subcortex-ipsi —
//! which downstream indexing (labels, per-point predictors) relies on.

use ndarray::Array2;
use std::ops::Range;

/// Recording hemisphere of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    Left,
    Right,
}

impl Hemisphere {
    /// Parse a session name; any name containing `"right"` is a right
    /// hemisphere session, everything else is left.
    pub fn from_session(sess: &str) -> Self {
        if sess.to_lowercase().contains("right") {
            Hemisphere::Right
        } else {
            Hemisphere::Left
        }
    }
}

/// The four canonical grid halves, each `(points × 3)` in mm.
#[derive(Debug, Clone)]
pub struct Grid {
    pub cortex_left: Array2<f64>,
    pub cortex_right: Array2<f64>,
    pub subcortex_left: Array2<f64>,
    pub subcortex_right: Array2<f64>,
}

impl Grid {
    /// The cortex and subcortex halves for the given recording hemisphere.
    pub fn hemisphere(&self, hemi: Hemisphere) -> (&Array2<f64>, &Array2<f64>) {
        match hemi {
            Hemisphere::Left => (&self.cortex_left, &self.subcortex_left),
            Hemisphere::Right => (&self.cortex_right, &self.subcortex_right),
        }
    }

    /// Layout of the full grid-point vector for a session on `hemi`.
    pub fn layout(&self, hemi: Hemisphere) -> GridLayout {
        let (cortex, subcortex) = self.hemisphere(hemi);
        GridLayout {
            n_cortex: cortex.nrows(),
            n_subcortex: subcortex.nrows(),
        }
    }
}

/// Segment of the full grid-point vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    CortexContra,
    CortexIpsi,
    SubcortexContra,
    SubcortexIpsi,
}

/// Sizes and offsets of the four segments of the full grid-point vector.
///
/// The order is fixed: cortex-contra, cortex-ipsi, subcortex-contra,
/// subcortex-ipsi.  Segment sizes come from the session hemisphere's grid
/// halves (the same half backs both the contra and ipsi segment of a
/// structure — laterality refers to the movement label, not the electrodes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub n_cortex: usize,
    pub n_subcortex: usize,
}

impl GridLayout {
    /// Total number of grid points across all four segments.
    pub fn total(&self) -> usize {
        2 * (self.n_cortex + self.n_subcortex)
    }

    /// Index range of a segment within the full vector.
    pub fn range(&self, segment: Segment) -> Range<usize> {
        let nc = self.n_cortex;
        let ns = self.n_subcortex;
        match segment {
            Segment::CortexContra => 0..nc,
            Segment::CortexIpsi => nc..2 * nc,
            Segment::SubcortexContra => 2 * nc..2 * nc + ns,
            Segment::SubcortexIpsi => 2 * nc + ns..2 * nc + 2 * ns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hemisphere_from_session_name() {
        assert_eq!(Hemisphere::from_session("right"), Hemisphere::Right);
        assert_eq!(Hemisphere::from_session("ses-right"), Hemisphere::Right);
        assert_eq!(Hemisphere::from_session("left"), Hemisphere::Left);
    }

    #[test]
    fn layout_segments_are_contiguous_and_ordered() {
        let layout = GridLayout { n_cortex: 39, n_subcortex: 8 };
        assert_eq!(layout.total(), 94);
        assert_eq!(layout.range(Segment::CortexContra), 0..39);
        assert_eq!(layout.range(Segment::CortexIpsi), 39..78);
        assert_eq!(layout.range(Segment::SubcortexContra), 78..86);
        assert_eq!(layout.range(Segment::SubcortexIpsi), 86..94);
    }

    #[test]
    fn grid_hemisphere_selection() {
        let grid = Grid {
            cortex_left: Array2::zeros((3, 3)),
            cortex_right: Array2::zeros((4, 3)),
            subcortex_left: Array2::zeros((2, 3)),
            subcortex_right: Array2::zeros((1, 3)),
        };
        let layout = grid.layout(Hemisphere::Right);
        assert_eq!(layout.n_cortex, 4);
        assert_eq!(layout.n_subcortex, 1);
        assert_eq!(layout.total(), 10);
    }
}
