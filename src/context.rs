//! Per-run pipeline state.
//!
//! [`RunContext`] bundles everything both drivers need — index sets, filter
//! bank, notch kernel, projection matrices, grid layout, activity mask and
//! the derived rate parameters — built once per recording and read-only
//! afterwards.  Every component takes its state from here explicitly; there
//! is no module-level run state anywhere in the crate.

use crate::activity::{active_grid_points, Laterality};
use crate::channels::ChannelSelection;
use crate::config::Settings;
use crate::filter::{band_power, design_notch, FilterBank};
use crate::grid::{Grid, GridLayout, Hemisphere};
use crate::projection::{calc_projection_matrix, project, PatientCoords, ProjectionMatrices};
use anyhow::{ensure, Result};
use ndarray::{Array2, ArrayView2, Axis};

/// Immutable per-run state shared by the offline and streaming drivers.
#[derive(Debug)]
pub struct RunContext {
    /// Raw sampling rate, Hz.
    pub fs: usize,
    /// Output feature rate, Hz.
    pub fs_new: usize,
    /// Raw samples per output step: `fs / fs_new`.
    pub step: usize,
    /// Length of the shared sample buffer: the largest per-band window.
    pub buffer_len: usize,
    /// Per-band trailing power windows, samples.
    pub seg_samples: Vec<usize>,
    /// Median-normalization window, feature frames.
    pub normalization_samples: usize,
    /// Time-lag count for predictor inputs.
    pub lag_count: usize,

    /// Channel index sets over the recording's channel list.
    pub selection: ChannelSelection,
    /// Names of the label channels, in `selection.label` order.
    pub label_names: Vec<String>,
    /// Rows of the per-step raw feature frame holding cortex channels.
    cortex_rows: Vec<usize>,
    /// Rows of the per-step raw feature frame holding subcortex channels.
    subcortex_rows: Vec<usize>,

    pub hemisphere: Hemisphere,
    pub laterality: Laterality,
    pub layout: GridLayout,
    /// Active-point mask over the full grid-point vector, fixed per run.
    pub active: Vec<bool>,

    pub bank: FilterBank,
    /// Line-noise notch kernel sized to the sample buffer.
    pub notch: Vec<f64>,
    pub projection: ProjectionMatrices,
}

impl RunContext {
    /// Build the context for one recording.
    ///
    /// Fails on any configuration problem: invalid settings, a raw rate that
    /// the output rate does not divide, missing electrode coordinates for a
    /// present structure, or band edges incompatible with `fs`.
    pub fn new(
        settings: &Settings,
        ch_names: &[String],
        coords: &PatientCoords,
        grid: &Grid,
        hemisphere: Hemisphere,
        fs: usize,
        line_noise: f64,
    ) -> Result<Self> {
        settings.validate()?;
        let fs_new = settings.resampling_rate;
        ensure!(
            fs % fs_new == 0,
            "raw rate {fs} Hz is not an integer multiple of the output rate {fs_new} Hz"
        );
        let step = fs / fs_new;

        let seg_samples = settings.seg_samples(fs);
        let buffer_len = seg_samples[0];
        ensure!(
            buffer_len % step == 0,
            "buffer of {buffer_len} samples is not a whole number of {step}-sample steps"
        );

        let selection = ChannelSelection::classify(ch_names, &settings.prefixes)?;
        let label_names = selection.label_names(ch_names);

        ensure!(
            selection.cortex.is_empty() == coords.cortex.is_none(),
            "cortex channels and cortex coordinates must both be present or both absent"
        );
        ensure!(
            selection.subcortex.is_empty() == coords.subcortex.is_none(),
            "subcortex channels and subcortex coordinates must both be present or both absent"
        );
        if let Some(c) = &coords.cortex {
            ensure!(
                c.nrows() == selection.cortex.len(),
                "{} cortex coordinate rows for {} cortex channels",
                c.nrows(),
                selection.cortex.len()
            );
        }
        if let Some(c) = &coords.subcortex {
            ensure!(
                c.nrows() == selection.subcortex.len(),
                "{} subcortex coordinate rows for {} subcortex channels",
                c.nrows(),
                selection.subcortex.len()
            );
        }

        // Positions of the cortex/subcortex channels within the data rows.
        let row_of = |ch: usize| selection.data.iter().position(|&d| d == ch);
        let cortex_rows: Vec<usize> =
            selection.cortex.iter().filter_map(|&ch| row_of(ch)).collect();
        let subcortex_rows: Vec<usize> =
            selection.subcortex.iter().filter_map(|&ch| row_of(ch)).collect();

        let bank = FilterBank::with_defaults(&settings.frequency_ranges, fs as f64)?;
        let notch = design_notch(line_noise, fs as f64, buffer_len)?;

        let projection = calc_projection_matrix(
            coords,
            grid,
            hemisphere,
            settings.max_dist_cortex,
            settings.max_dist_subcortex,
        )?;
        let laterality = Laterality::resolve(&label_names, hemisphere);
        let layout = grid.layout(hemisphere);
        let active = active_grid_points(&projection, laterality, &layout);

        Ok(Self {
            fs,
            fs_new,
            step,
            buffer_len,
            seg_samples,
            normalization_samples: settings.normalization_samples(),
            lag_count: settings.lag_count,
            selection,
            label_names,
            cortex_rows,
            subcortex_rows,
            hemisphere,
            laterality,
            layout,
            active,
            bank,
            notch,
            projection,
        })
    }

    pub fn n_bands(&self) -> usize {
        self.bank.n_bands()
    }

    pub fn n_data_channels(&self) -> usize {
        self.selection.data.len()
    }

    /// One feature-extraction pass over a full sample buffer
    /// `(all_channels × buffer_len)`.
    ///
    /// Returns the raw frame `(data_channels × bands)` and the projected
    /// frame scattered over the full grid layout `(total_points × bands)`.
    /// Both drivers call exactly this, which keeps their outputs identical.
    pub fn extract_frame(
        &self,
        buffer: ArrayView2<'_, f64>,
    ) -> Result<(Array2<f64>, Array2<f64>)> {
        let n_bands = self.n_bands();
        let mut raw_frame = Array2::zeros((self.selection.data.len(), n_bands));
        for (row, &ch) in self.selection.data.iter().enumerate() {
            let power = band_power(buffer.row(ch), &self.bank, &self.notch, &self.seg_samples)?;
            raw_frame.row_mut(row).assign(&power);
        }

        let cortex_feats = (!self.cortex_rows.is_empty())
            .then(|| raw_frame.select(Axis(0), &self.cortex_rows));
        let subcortex_feats = (!self.subcortex_rows.is_empty())
            .then(|| raw_frame.select(Axis(0), &self.subcortex_rows));

        let (proj_cortex, proj_subcortex) = project(
            &self.projection,
            cortex_feats.as_ref(),
            subcortex_feats.as_ref(),
        );
        let full = crate::activity::scatter_projected(
            &self.layout,
            self.laterality,
            proj_cortex.as_ref(),
            proj_subcortex.as_ref(),
            n_bands,
        );
        Ok((raw_frame, full))
    }

    /// Label values at one raw-sample index, as an `(n_label × 1)` frame.
    pub fn label_frame(&self, raw: &ArrayView2<'_, f64>, sample: usize) -> Array2<f64> {
        let mut frame = Array2::zeros((self.selection.label.len(), 1));
        for (row, &ch) in self.selection.label.iter().enumerate() {
            frame[[row, 0]] = raw[[ch, sample]];
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelPrefixes;
    use ndarray::array;

    fn settings() -> Settings {
        Settings {
            data_path: String::new(),
            output_path: String::new(),
            frequency_ranges: vec![(8.0, 12.0), (60.0, 80.0)],
            seg_lengths_ms: vec![1000, 100],
            resampling_rate: 10,
            max_dist_cortex: 20.0,
            max_dist_subcortex: 10.0,
            normalization_time: 2,
            lag_count: 3,
            prefixes: ChannelPrefixes::default(),
        }
    }

    fn grid() -> Grid {
        let cortex = array![[0.0, 0.0, 0.0], [5.0, 0.0, 0.0]];
        let sub = array![[0.0, 0.0, 10.0]];
        Grid {
            cortex_left: cortex.clone(),
            cortex_right: cortex,
            subcortex_left: sub.clone(),
            subcortex_right: sub,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn context_derives_rates_and_mask() {
        let ch = names(&["ECOG_1", "STN_1", "MOV_LEFT"]);
        let coords = PatientCoords {
            cortex: Some(array![[1.0, 0.0, 0.0]]),
            subcortex: Some(array![[0.0, 0.0, 9.0]]),
        };
        let ctx = RunContext::new(
            &settings(),
            &ch,
            &coords,
            &grid(),
            Hemisphere::Right,
            1000,
            50.0,
        )
        .unwrap();
        assert_eq!(ctx.step, 100);
        assert_eq!(ctx.buffer_len, 1000);
        assert_eq!(ctx.normalization_samples, 20);
        assert_eq!(ctx.layout.total(), 6);
        // Right hemisphere + MOV_LEFT → contralateral label only.
        assert!(ctx.laterality.contra && !ctx.laterality.ipsi);
        // Both cortex points reach the electrode, the subcortex point too;
        // only contra segments are active.
        assert_eq!(ctx.active, vec![true, true, false, false, true, false]);
    }

    #[test]
    fn indivisible_rates_rejected() {
        let ch = names(&["ECOG_1", "MOV_LEFT"]);
        let coords = PatientCoords {
            cortex: Some(array![[1.0, 0.0, 0.0]]),
            subcortex: None,
        };
        let err = RunContext::new(
            &settings(),
            &ch,
            &coords,
            &grid(),
            Hemisphere::Left,
            1024,
            50.0,
        )
        .unwrap_err();
        assert!(err.to_string().contains("integer multiple"));
    }

    #[test]
    fn coordinate_channel_mismatch_rejected() {
        let ch = names(&["ECOG_1", "ECOG_2", "MOV_LEFT"]);
        let coords = PatientCoords {
            cortex: Some(array![[1.0, 0.0, 0.0]]), // one row for two channels
            subcortex: None,
        };
        assert!(RunContext::new(
            &settings(),
            &ch,
            &coords,
            &grid(),
            Hemisphere::Left,
            1000,
            50.0,
        )
        .is_err());
    }
}
