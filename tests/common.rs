/// Shared builders for pipeline-level tests.
use ndarray::{array, Array2};
use neurodec::config::{ChannelPrefixes, Settings};
use neurodec::grid::{Grid, Hemisphere};
use neurodec::projection::PatientCoords;
use neurodec::RunContext;
use std::f64::consts::PI;

pub const FS: usize = 500;

#[allow(unused)]
/// Two bands, 250-sample buffer, 50-sample step at 500 Hz.
pub fn settings() -> Settings {
    Settings {
        data_path: String::new(),
        output_path: String::new(),
        frequency_ranges: vec![(8.0, 12.0), (60.0, 80.0)],
        seg_lengths_ms: vec![500, 100],
        resampling_rate: 10,
        max_dist_cortex: 20.0,
        max_dist_subcortex: 10.0,
        normalization_time: 2,
        lag_count: 3,
        prefixes: ChannelPrefixes::default(),
    }
}

#[allow(unused)]
/// Two cortex points per hemisphere, one subcortex point.
pub fn grid() -> Grid {
    let cortex = array![[0.0, 0.0, 0.0], [5.0, 0.0, 0.0]];
    let sub = array![[0.0, 0.0, 10.0]];
    Grid {
        cortex_left: cortex.clone(),
        cortex_right: cortex,
        subcortex_left: sub.clone(),
        subcortex_right: sub,
    }
}

#[allow(unused)]
pub fn ch_names() -> Vec<String> {
    ["ECOG_1", "ECOG_2", "STN_1", "MOV_LEFT"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[allow(unused)]
pub fn coords() -> PatientCoords {
    PatientCoords {
        cortex: Some(array![[1.0, 0.0, 0.0], [4.0, 0.0, 0.0]]),
        subcortex: Some(array![[0.0, 0.0, 9.0]]),
    }
}

#[allow(unused)]
pub fn context() -> RunContext {
    RunContext::new(
        &settings(),
        &ch_names(),
        &coords(),
        &grid(),
        Hemisphere::Right,
        FS,
        50.0,
    )
    .unwrap()
}

#[allow(unused)]
/// Band-limited oscillations on the data channels, a movement step on the
/// label channel, plus a slow drift so the median baseline keeps moving.
pub fn recording(n: usize) -> Array2<f64> {
    let fs = FS as f64;
    Array2::from_shape_fn((4, n), |(c, t)| {
        let time = t as f64 / fs;
        let drift = 1.0 + 0.2 * (2.0 * PI * 0.3 * time).sin();
        match c {
            0 => drift * (2.0 * PI * 10.0 * time).sin(),
            1 => drift * (2.0 * PI * 70.0 * time).sin() * 0.5,
            2 => drift * (2.0 * PI * 20.0 * time).sin() * 0.3,
            _ => {
                if t > n / 2 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    })
}

#[allow(unused)]
/// Maximum absolute difference between two equally-shaped arrays.
pub fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0_f64, f64::max)
}
