//! # neurodec — movement decoding from invasive electrophysiology in pure Rust
//!
//! `neurodec` turns multichannel ECoG/STN-LFP recordings into grid-projected
//! band-power features and real-time movement estimates.  Every DSP step is
//! pure Rust + [RustFFT](https://crates.io/crates/rustfft) — no Python, no
//! BLAS, no C libraries.
//!
//! ## Pipeline overview
//!
//! ```text
//! recording.safetensors  [C, T]
//!   │
//!   ├─ channels::classify()    ECOG_* / STN_* / MOV_* by name prefix
//!   ├─ filter                  FIR bandpass bank + line-noise notch
//!   ├─ band power              conv 'same' → variance of trailing window
//!   ├─ projection              inverse-distance weights onto a fixed grid
//!   ├─ normalize               trailing-median, (v − m) / m
//!   ├─ features::stack_lags()  K most-recent frames per grid point
//!   └─ predict                 per-grid-point model → movement estimate
//!        │
//!        ├─→ offline::run_offline()   whole recording, one result record
//!        └─→ stream::StreamDriver     sample-by-sample, display sink
//! ```
//!
//! The offline and streaming drivers share one [`RunContext`] and one
//! extraction path, so a frame computed offline at raw-sample index `i` is
//! bit-for-bit the frame the streaming driver emits after swallowing the
//! same `i` samples.
//!
//! ## Quick start
//!
//! ```no_run
//! use neurodec::{run_offline, RunContext, Settings};
//! use neurodec::grid::Hemisphere;
//! use neurodec::io::{read_coordinates, read_grid, Recording};
//! use neurodec::channels::ChannelSelection;
//! use std::path::Path;
//!
//! let settings = Settings::load(Path::new("settings.json")).unwrap();
//! let rec = Recording::load(Path::new("sub-000_run-0.safetensors")).unwrap();
//! let grid = read_grid(Path::new("grid/")).unwrap();
//!
//! let selection =
//!     ChannelSelection::classify(&rec.ch_names, &settings.prefixes).unwrap();
//! let coords = read_coordinates(
//!     Path::new("electrodes.tsv"),
//!     &rec.ch_names,
//!     &selection,
//! ).unwrap();
//!
//! let ctx = RunContext::new(
//!     &settings,
//!     &rec.ch_names,
//!     &coords,
//!     &grid,
//!     Hemisphere::Right,
//!     rec.sfreq as usize,
//!     rec.line_noise,
//! ).unwrap();
//!
//! let result = run_offline(&rec.data, &ctx).unwrap();
//! println!("{} feature steps", result.sample_idx.len());
//! ```

pub mod activity;
pub mod channels;
pub mod config;
pub mod context;
pub mod features;
pub mod filter;
pub mod grid;
pub mod io;
pub mod labels;
pub mod normalize;
pub mod offline;
pub mod predict;
pub mod projection;
pub mod stream;

// ── Crate-root re-exports ─────────────────────────────────────────────────
//
// Everything a downstream user is likely to need is available directly as
// `neurodec::Foo` without having to know the internal module layout.

// config
pub use config::{ChannelPrefixes, Settings};

// channels
pub use channels::ChannelSelection;

// context + drivers
pub use context::RunContext;
pub use offline::{run_offline, OfflineResult};
pub use stream::{DisplaySink, NullSink, StreamDriver};

// filter — bank design + band power
pub use filter::{band_power, design_bandpass, design_notch, FilterBank};

// grid + projection
pub use grid::{Grid, GridLayout, Hemisphere, Segment};
pub use projection::{calc_projection_matrix, PatientCoords, ProjectionMatrices};

// normalization + features
pub use features::{stack_lags, stack_lags_block};
pub use normalize::MedianNormalizer;

// labels + prediction
pub use labels::baseline_correction;
pub use predict::{GridPredictors, LinearPredictor, Predictor};
