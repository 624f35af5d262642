//! Trailing-median normalization.
//!
//! Every feature stream (raw per-channel, projected per-grid-point, labels)
//! is expressed relative to the median of its own recent past:
//! `(x − median) / median`, element-wise, over a window of up to
//! `window` previous frames — growing from the start of the run until full,
//! then sliding.
//!
//! Two boundary rules, both deliberate:
//! * frame 0 normalizes to zero — there is no baseline yet;
//! * a median of exactly 0 (dead channel, inactive grid point) yields an
//!   output of 0 instead of Inf/NaN.
//!
//! The engine is strictly causal and incremental; the offline driver feeds it
//! frame by frame exactly like the streaming driver, which is what makes the
//! two paths numerically identical.

use ndarray::Array2;
use std::collections::VecDeque;

/// Incremental per-element trailing-median normalizer for `(units × bands)`
/// frames.
#[derive(Debug, Clone)]
pub struct MedianNormalizer {
    window: usize,
    history: VecDeque<Array2<f64>>,
}

impl MedianNormalizer {
    /// `window` is the maximum number of past frames the median covers.
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "normalization window must be at least 1 frame");
        Self { window, history: VecDeque::with_capacity(window + 1) }
    }

    /// Number of frames seen so far, capped at the window size.
    pub fn filled(&self) -> usize {
        self.history.len()
    }

    /// Normalize one frame against the median of the preceding frames and
    /// append the raw frame to the history.
    ///
    /// The current frame never contributes to its own baseline.
    pub fn normalize(&mut self, frame: &Array2<f64>) -> Array2<f64> {
        let out = if self.history.is_empty() {
            // Frame 0: no baseline exists; defined as zero by convention.
            Array2::zeros(frame.dim())
        } else {
            let median = self.median();
            let mut out = Array2::zeros(frame.dim());
            for ((r, c), v) in frame.indexed_iter() {
                let m = median[[r, c]];
                out[[r, c]] = if m == 0.0 { 0.0 } else { (v - m) / m };
            }
            out
        };

        self.history.push_back(frame.clone());
        if self.history.len() > self.window {
            self.history.pop_front();
        }
        out
    }

    /// Element-wise median over the stored history.
    fn median(&self) -> Array2<f64> {
        let dim = self.history[0].dim();
        let n = self.history.len();
        let mut median = Array2::zeros(dim);
        let mut column: Vec<f64> = Vec::with_capacity(n);

        for r in 0..dim.0 {
            for c in 0..dim.1 {
                column.clear();
                column.extend(self.history.iter().map(|f| f[[r, c]]));
                column.sort_by(|a, b| a.partial_cmp(b).unwrap());
                median[[r, c]] = if n % 2 == 1 {
                    column[n / 2]
                } else {
                    (column[n / 2 - 1] + column[n / 2]) / 2.0
                };
            }
        }
        median
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn first_frame_is_zero() {
        let mut norm = MedianNormalizer::new(4);
        let out = norm.normalize(&array![[3.0, 5.0]]);
        assert_eq!(out, array![[0.0, 0.0]]);
    }

    #[test]
    fn constant_stream_normalizes_to_zero() {
        let mut norm = MedianNormalizer::new(8);
        let frame = array![[2.0], [7.0]];
        for _ in 0..20 {
            let out = norm.normalize(&frame);
            assert_eq!(out, array![[0.0], [0.0]]);
        }
    }

    #[test]
    fn relative_deviation_from_median() {
        let mut norm = MedianNormalizer::new(8);
        norm.normalize(&array![[4.0]]);
        norm.normalize(&array![[4.0]]);
        // median of {4, 4} = 4; (6 − 4) / 4 = 0.5
        let out = norm.normalize(&array![[6.0]]);
        approx::assert_abs_diff_eq!(out[[0, 0]], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn window_slides_after_filling() {
        let mut norm = MedianNormalizer::new(2);
        norm.normalize(&array![[1.0]]);
        norm.normalize(&array![[2.0]]);
        norm.normalize(&array![[3.0]]);
        // History is now {2, 3} (1 evicted); median 2.5.
        let out = norm.normalize(&array![[5.0]]);
        approx::assert_abs_diff_eq!(out[[0, 0]], (5.0 - 2.5) / 2.5, epsilon = 1e-12);
        assert_eq!(norm.filled(), 2);
    }

    #[test]
    fn even_history_uses_mean_of_middle_pair() {
        let mut norm = MedianNormalizer::new(8);
        norm.normalize(&array![[1.0]]);
        norm.normalize(&array![[3.0]]);
        // median of {1, 3} = 2
        let out = norm.normalize(&array![[4.0]]);
        approx::assert_abs_diff_eq!(out[[0, 0]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_median_yields_zero_not_inf() {
        let mut norm = MedianNormalizer::new(4);
        norm.normalize(&array![[0.0]]);
        norm.normalize(&array![[0.0]]);
        let out = norm.normalize(&array![[1.0]]);
        assert_eq!(out[[0, 0]], 0.0);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn current_frame_excluded_from_baseline() {
        let mut norm = MedianNormalizer::new(4);
        norm.normalize(&array![[2.0]]);
        // Baseline is {2}, not {2, 10}: (10 − 2) / 2 = 4.
        let out = norm.normalize(&array![[10.0]]);
        approx::assert_abs_diff_eq!(out[[0, 0]], 4.0, epsilon = 1e-12);
    }
}
