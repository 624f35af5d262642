//! Channel-name classification.
//!
//! Splits the recording's channel list into cortex, subcortex, movement/label
//! and data index sets by name prefix.  The prefix-to-category mapping comes
//! from [`ChannelPrefixes`](crate::config::ChannelPrefixes) so deployments
//! with different naming conventions stay configurable.
//!
//! Invariant: label ∩ data = ∅; every cortex/subcortex index is also a data
//! index.

use crate::config::ChannelPrefixes;
use anyhow::{ensure, Result};
use ndarray::{Array2, Axis};

/// Index sets over the recording's channel list, derived once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSelection {
    /// Indices of cortical channels.
    pub cortex: Vec<usize>,
    /// Indices of subcortical channels.
    pub subcortex: Vec<usize>,
    /// Indices of movement/label channels.
    pub label: Vec<usize>,
    /// Indices of all non-label channels (feature channels).
    pub data: Vec<usize>,
}

impl ChannelSelection {
    /// Classify `ch_names` by prefix.
    ///
    /// Fails when a channel matches both a data and a label prefix, or when
    /// no label channel is present at all (a run without movement traces
    /// cannot be decoded).
    pub fn classify(ch_names: &[String], prefixes: &ChannelPrefixes) -> Result<Self> {
        let matches = |name: &str, set: &[String]| set.iter().any(|p| name.starts_with(p.as_str()));

        let mut cortex = Vec::new();
        let mut subcortex = Vec::new();
        let mut label = Vec::new();
        let mut data = Vec::new();

        for (idx, name) in ch_names.iter().enumerate() {
            let is_label = matches(name, &prefixes.label);
            let is_cortex = matches(name, &prefixes.cortex);
            let is_subcortex = matches(name, &prefixes.subcortex);
            ensure!(
                !(is_label && (is_cortex || is_subcortex)),
                "channel '{name}' matches both a label and a data prefix"
            );
            if is_label {
                label.push(idx);
            } else {
                data.push(idx);
                if is_cortex {
                    cortex.push(idx);
                } else if is_subcortex {
                    subcortex.push(idx);
                }
            }
        }

        ensure!(!label.is_empty(), "no movement/label channel found in {ch_names:?}");
        ensure!(
            !cortex.is_empty() || !subcortex.is_empty(),
            "no cortex or subcortex channel found in {ch_names:?}"
        );

        Ok(Self { cortex, subcortex, label, data })
    }

    /// Names of the label channels, in index order.
    pub fn label_names(&self, ch_names: &[String]) -> Vec<String> {
        self.label.iter().map(|&i| ch_names[i].clone()).collect()
    }

    /// Copy the rows of `raw` ([C, T]) selected by `indices` into a dense
    /// ([len, T]) matrix, preserving order.
    pub fn select_rows(raw: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
        raw.select(Axis(0), indices)
    }
}
