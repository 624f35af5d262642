//! Run configuration.
//!
//! [`Settings`] holds every tunable parameter of the decoding pipeline and is
//! deserialized from a JSON settings file.  All fields are required in the
//! file except the channel prefixes, which default to the ECOG/STN/MOV naming
//! convention.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for one decoding run.
///
/// Loaded with [`Settings::load`]:
///
/// ```no_run
/// use neurodec::Settings;
/// let settings = Settings::load("settings.json".as_ref()).unwrap();
/// assert_eq!(settings.frequency_ranges.len(), settings.seg_lengths_ms.len());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root of the recording data store.
    pub data_path: String,

    /// Directory that result files are written to.
    pub output_path: String,

    /// Frequency bands in Hz, one `(low, high)` pair per band.
    ///
    /// A band-pass FIR kernel is built for each pair; the high edge plus half
    /// the transition bandwidth must stay below Nyquist.
    pub frequency_ranges: Vec<(f64, f64)>,

    /// Trailing power-estimation window per band, in milliseconds.
    ///
    /// Shorter windows suit fast bands (gamma), longer ones slow bands
    /// (theta).  Must have one entry per frequency band, and the first entry
    /// must be the largest: it sizes the shared sample buffer.
    pub seg_lengths_ms: Vec<usize>,

    /// Output feature rate in Hz.  One feature frame is emitted every
    /// `fs / resampling_rate` raw samples; the raw rate must be an integer
    /// multiple of this.
    pub resampling_rate: usize,

    /// Maximum electrode-to-grid-point distance (mm) for cortex channels to
    /// contribute projection weight.
    pub max_dist_cortex: f64,

    /// Maximum electrode-to-grid-point distance (mm) for subcortex channels.
    pub max_dist_subcortex: f64,

    /// Duration of the trailing median-normalization window in seconds.
    pub normalization_time: usize,

    /// Number of past feature frames stacked into each predictor input.
    pub lag_count: usize,

    /// Channel-name prefixes used to classify channels.
    #[serde(default)]
    pub prefixes: ChannelPrefixes,
}

/// Mapping from channel-name prefixes to channel categories.
///
/// Real deployments vary their naming conventions, so the mapping is
/// configurable; the defaults match the ECOG/STN/MOV scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelPrefixes {
    /// Prefixes of cortical (surface strip) channels.
    pub cortex: Vec<String>,
    /// Prefixes of subcortical (depth lead) channels.
    pub subcortex: Vec<String>,
    /// Prefixes of movement/label channels.
    pub label: Vec<String>,
}

impl Default for ChannelPrefixes {
    fn default() -> Self {
        Self {
            cortex: vec!["ECOG".into()],
            subcortex: vec!["STN".into()],
            label: vec!["MOV".into(), "ANALOG".into()],
        }
    }
}

impl Settings {
    /// Read and validate a settings file.
    ///
    /// Any inconsistency (empty band list, mismatched per-band window list,
    /// non-positive distances or rates) is a fatal configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&text)
            .with_context(|| format!("parsing settings file {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.frequency_ranges.is_empty(),
            "settings: frequency_ranges must not be empty"
        );
        ensure!(
            self.seg_lengths_ms.len() == self.frequency_ranges.len(),
            "settings: {} seg_lengths_ms entries for {} frequency bands",
            self.seg_lengths_ms.len(),
            self.frequency_ranges.len()
        );
        let max = *self.seg_lengths_ms.iter().max().unwrap();
        ensure!(
            self.seg_lengths_ms[0] == max,
            "settings: seg_lengths_ms[0] ({} ms) must be the largest window ({} ms)",
            self.seg_lengths_ms[0],
            max
        );
        for (low, high) in &self.frequency_ranges {
            ensure!(
                *low > 0.0 && high > low,
                "settings: invalid frequency band ({low}, {high}) Hz"
            );
        }
        ensure!(self.resampling_rate > 0, "settings: resampling_rate must be > 0");
        ensure!(self.lag_count > 0, "settings: lag_count must be > 0");
        ensure!(
            self.max_dist_cortex > 0.0 && self.max_dist_subcortex > 0.0,
            "settings: interpolation distances must be > 0"
        );
        ensure!(
            self.normalization_time > 0,
            "settings: normalization_time must be > 0"
        );
        Ok(())
    }

    /// Per-band trailing windows converted to samples at `fs`.
    pub fn seg_samples(&self, fs: usize) -> Vec<usize> {
        self.seg_lengths_ms.iter().map(|ms| ms * fs / 1000).collect()
    }

    /// Normalization window size in feature frames.
    pub fn normalization_samples(&self) -> usize {
        self.normalization_time * self.resampling_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings() -> Settings {
        Settings {
            data_path: "/tmp/data".into(),
            output_path: "/tmp/out".into(),
            frequency_ranges: vec![(4.0, 8.0), (8.0, 12.0), (13.0, 35.0), (60.0, 200.0)],
            seg_lengths_ms: vec![1000, 500, 500, 100],
            resampling_rate: 10,
            max_dist_cortex: 20.0,
            max_dist_subcortex: 10.0,
            normalization_time: 10,
            lag_count: 5,
            prefixes: ChannelPrefixes::default(),
        }
    }

    #[test]
    fn valid_settings_pass() {
        test_settings().validate().unwrap();
    }

    #[test]
    fn mismatched_seg_lengths_rejected() {
        let mut s = test_settings();
        s.seg_lengths_ms.pop();
        assert!(s.validate().is_err());
    }

    #[test]
    fn first_window_must_be_largest() {
        let mut s = test_settings();
        s.seg_lengths_ms = vec![100, 500, 500, 1000];
        assert!(s.validate().is_err());
    }

    #[test]
    fn seg_samples_scale_with_fs() {
        let s = test_settings();
        assert_eq!(s.seg_samples(1000), vec![1000, 500, 500, 100]);
        assert_eq!(s.seg_samples(500), vec![500, 250, 250, 50]);
    }

    #[test]
    fn normalization_samples_is_time_times_rate() {
        assert_eq!(test_settings().normalization_samples(), 100);
    }
}
