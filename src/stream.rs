//! Streaming pipeline driver (real-time simulation).
//!
//! Consumes a recording one sample at a time through a circular sample
//! buffer: fill the first full window, then emit one feature cycle every
//! `step` new samples.  Each cycle runs the same extraction and normalization
//! as the offline driver; once enough cycles exist, the last K normalized
//! projected frames are clipped, lag-stacked and handed to each active grid
//! point's predictor, and the rolling display buffers are pushed to the
//! [`DisplaySink`].
//!
//! Dropping the driver mid-run loses nothing already emitted: cycles are
//! complete or absent, never partial.

use crate::activity::Laterality;
use crate::context::RunContext;
use crate::features::stack_lags_block;
use crate::normalize::MedianNormalizer;
use crate::predict::GridPredictors;
use anyhow::{ensure, Result};
use ndarray::{s, Array1, Array2, ArrayView1};
use std::collections::VecDeque;

/// Feature values are clipped to this range before lag stacking, keeping
/// normalization outliers out of the predictors.
pub const CLIP_RANGE: (f64, f64) = (-2.0, 2.0);

/// Length of the rolling display buffers, in prediction cycles.
pub const DISPLAY_LEN: usize = 100;

/// Receiver of the live display feed.
///
/// Called once per prediction cycle with the rolling buffers: per-grid-point
/// predictions `(grid_points × DISPLAY_LEN)` plus the contralateral and
/// ipsilateral label traces, newest values last.  Rendering is outside the
/// pipeline; this trait is only the data contract.
pub trait DisplaySink {
    fn update(&mut self, predictions: &Array2<f64>, label_con: &[f64], label_ipsi: &[f64]);
}

/// Sink that drops the feed (offline-style use of the streaming driver).
pub struct NullSink;

impl DisplaySink for NullSink {
    fn update(&mut self, _: &Array2<f64>, _: &[f64], _: &[f64]) {}
}

/// Output of one completed feature cycle.
pub struct Cycle {
    /// Normalized raw frame, `(data_channels × bands)`.
    pub raw_frame: Array2<f64>,
    /// Normalized projected frame over the full grid layout.
    pub projected_frame: Array2<f64>,
    /// Per-grid-point movement estimates; `None` until K cycles exist.
    pub predictions: Option<Array1<f64>>,
}

enum Phase {
    Filling { next: usize },
    Emitting { since_emit: usize },
}

/// Sample-by-sample simulation of the acquisition-and-decoding loop.
pub struct StreamDriver<'a> {
    ctx: &'a RunContext,
    predictors: GridPredictors,
    buffer: Array2<f64>,
    phase: Phase,

    rf_norm: MedianNormalizer,
    pf_norm: MedianNormalizer,
    /// Last K normalized projected frames, oldest first.
    recent: VecDeque<Array2<f64>>,
    /// Per-cycle (contra, ipsi) label values, for the lagged display feed.
    label_history: Vec<(f64, f64)>,
    cycles: usize,

    display_pred: Array2<f64>,
    display_con: Vec<f64>,
    display_ipsi: Vec<f64>,
}

impl<'a> StreamDriver<'a> {
    pub fn new(ctx: &'a RunContext, predictors: GridPredictors) -> Result<Self> {
        ensure!(
            predictors.is_empty() || predictors.len() == ctx.layout.total(),
            "{} predictors supplied for {} grid points",
            predictors.len(),
            ctx.layout.total()
        );
        Ok(Self {
            ctx,
            predictors,
            buffer: Array2::zeros((0, 0)), // sized on the first sample
            phase: Phase::Filling { next: 0 },
            rf_norm: MedianNormalizer::new(ctx.normalization_samples),
            pf_norm: MedianNormalizer::new(ctx.normalization_samples),
            recent: VecDeque::with_capacity(ctx.lag_count + 1),
            label_history: Vec::new(),
            cycles: 0,
            display_pred: Array2::zeros((ctx.layout.total(), DISPLAY_LEN)),
            display_con: vec![0.0; DISPLAY_LEN],
            display_ipsi: vec![0.0; DISPLAY_LEN],
        })
    }

    /// Feed one multichannel sample (all raw channels, recording order).
    ///
    /// Returns a completed [`Cycle`] when this sample triggered one.
    pub fn push_sample(&mut self, sample: ArrayView1<'_, f64>) -> Result<Option<Cycle>> {
        if self.buffer.is_empty() {
            self.buffer = Array2::zeros((sample.len(), self.ctx.buffer_len));
        }
        ensure!(
            sample.len() == self.buffer.nrows(),
            "sample has {} channels, buffer has {}",
            sample.len(),
            self.buffer.nrows()
        );

        match self.phase {
            Phase::Filling { next } => {
                self.buffer.column_mut(next).assign(&sample);
                if next + 1 == self.ctx.buffer_len {
                    self.phase = Phase::Emitting { since_emit: 0 };
                    return Ok(Some(self.cycle()?));
                }
                self.phase = Phase::Filling { next: next + 1 };
                Ok(None)
            }
            Phase::Emitting { since_emit } => {
                // Shift the window left one sample and append.
                let shifted = self.buffer.slice(s![.., 1..]).to_owned();
                self.buffer.slice_mut(s![.., ..-1]).assign(&shifted);
                self.buffer
                    .column_mut(self.ctx.buffer_len - 1)
                    .assign(&sample);

                let since_emit = since_emit + 1;
                if since_emit == self.ctx.step {
                    self.phase = Phase::Emitting { since_emit: 0 };
                    return Ok(Some(self.cycle()?));
                }
                self.phase = Phase::Emitting { since_emit };
                Ok(None)
            }
        }
    }

    /// Run one feature-extraction + normalization + prediction cycle over the
    /// current buffer.
    fn cycle(&mut self) -> Result<Cycle> {
        let (raw_frame, proj_frame) = self.ctx.extract_frame(self.buffer.view())?;
        let raw_n = self.rf_norm.normalize(&raw_frame);
        let proj_n = self.pf_norm.normalize(&proj_frame);

        self.recent.push_back(proj_n.clone());
        if self.recent.len() > self.ctx.lag_count {
            self.recent.pop_front();
        }

        // Label values of the newest sample in the window.
        let last_col = self.buffer.ncols() - 1;
        let con = Laterality::contra_channel(&self.ctx.label_names, self.ctx.hemisphere)
            .map(|row| self.buffer[[self.ctx.selection.label[row], last_col]])
            .unwrap_or(0.0);
        let ipsi = Laterality::ipsi_channel(&self.ctx.label_names, self.ctx.hemisphere)
            .map(|row| self.buffer[[self.ctx.selection.label[row], last_col]])
            .unwrap_or(0.0);
        self.label_history.push((con, ipsi));

        let predictions = if self.recent.len() == self.ctx.lag_count {
            Some(self.predict()?)
        } else {
            None
        };
        self.cycles += 1;

        Ok(Cycle { raw_frame: raw_n, projected_frame: proj_n, predictions })
    }

    /// Clip, lag-stack and predict for every active grid point, then push the
    /// rolling buffers to the display feed.
    fn predict(&mut self) -> Result<Array1<f64>> {
        let k = self.ctx.lag_count;
        let n_bands = self.ctx.n_bands();
        let total = self.ctx.layout.total();
        let mut estimates = Array1::zeros(total);

        let mut window = Array2::zeros((k, n_bands));
        for point in 0..total {
            if !self.ctx.active[point] {
                continue;
            }
            for (row, frame) in self.recent.iter().enumerate() {
                for b in 0..n_bands {
                    window[[row, b]] =
                        frame[[point, b]].clamp(CLIP_RANGE.0, CLIP_RANGE.1);
                }
            }
            let features = stack_lags_block(window.view());
            estimates[point] = self
                .predictors
                .predict_point(point, features.as_slice().unwrap());
        }

        // Rolling display buffers: shift left, append newest.
        let shifted = self.display_pred.slice(s![.., 1..]).to_owned();
        self.display_pred.slice_mut(s![.., ..-1]).assign(&shifted);
        self.display_pred
            .column_mut(DISPLAY_LEN - 1)
            .assign(&estimates);

        // Labels trail the predictions by K cycles.
        let (con, ipsi) = if self.cycles >= k {
            self.label_history[self.cycles - k]
        } else {
            (0.0, 0.0)
        };
        self.display_con.rotate_left(1);
        *self.display_con.last_mut().unwrap() = con;
        self.display_ipsi.rotate_left(1);
        *self.display_ipsi.last_mut().unwrap() = ipsi;

        Ok(estimates)
    }

    /// Push the current display buffers to `sink`.
    pub fn render(&self, sink: &mut dyn DisplaySink) {
        sink.update(&self.display_pred, &self.display_con, &self.display_ipsi);
    }

    /// Number of completed feature cycles.
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    /// Drive the whole recording through the simulator.
    ///
    /// `sink` receives the display feed after every prediction cycle.
    pub fn run(
        &mut self,
        raw: &Array2<f64>,
        sink: &mut dyn DisplaySink,
    ) -> Result<Vec<Cycle>> {
        let mut cycles = Vec::new();
        for t in 0..raw.ncols() {
            if let Some(cycle) = self.push_sample(raw.column(t))? {
                if cycle.predictions.is_some() {
                    self.render(sink);
                }
                cycles.push(cycle);
            }
        }
        Ok(cycles)
    }
}
