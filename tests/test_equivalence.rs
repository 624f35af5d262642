//! Offline and streaming drivers must produce identical feature sequences.
//!
//! Both walk the same windows and feed the same incremental median
//! normalizer, so frame `t` of the offline run and cycle `t` of the stream
//! are the same numbers, not merely close.

mod common;

use neurodec::{run_offline, GridPredictors, NullSink, StreamDriver};

const TOL: f64 = 1e-9;

#[test]
fn offline_and_streaming_frames_match() {
    let ctx = common::context();
    let raw = common::recording(1250);

    let offline = run_offline(&raw, &ctx).unwrap();

    let mut driver = StreamDriver::new(&ctx, GridPredictors::empty(ctx.layout.total())).unwrap();
    let cycles = driver.run(&raw, &mut NullSink).unwrap();

    // The stream emits one extra cycle: its last window ends at the final
    // sample, which the offline stepping never reaches.
    let n_steps = offline.sample_idx.len();
    assert_eq!(cycles.len(), n_steps + 1);
    assert_eq!(offline.sample_idx[0], ctx.buffer_len);

    for (t, cycle) in cycles.iter().take(n_steps).enumerate() {
        let off_raw = offline
            .raw_features
            .slice(ndarray::s![t, .., ..])
            .to_owned();
        let off_proj = offline
            .projected_features
            .slice(ndarray::s![t, .., ..])
            .to_owned();
        let d_raw = common::max_abs_diff(&off_raw, &cycle.raw_frame);
        let d_proj = common::max_abs_diff(&off_proj, &cycle.projected_frame);
        assert!(d_raw < TOL, "raw frames diverge at step {t}: {d_raw:e}");
        assert!(d_proj < TOL, "projected frames diverge at step {t}: {d_proj:e}");
    }
}

#[test]
fn streaming_is_insensitive_to_push_granularity() {
    // Feeding the recording in one run() call or sample by sample by hand
    // must give the same cycles.
    let ctx = common::context();
    let raw = common::recording(700);

    let mut a = StreamDriver::new(&ctx, GridPredictors::empty(ctx.layout.total())).unwrap();
    let cycles_a = a.run(&raw, &mut NullSink).unwrap();

    let mut b = StreamDriver::new(&ctx, GridPredictors::empty(ctx.layout.total())).unwrap();
    let mut cycles_b = Vec::new();
    for t in 0..raw.ncols() {
        if let Some(c) = b.push_sample(raw.column(t)).unwrap() {
            cycles_b.push(c);
        }
    }

    assert_eq!(cycles_a.len(), cycles_b.len());
    for (ca, cb) in cycles_a.iter().zip(&cycles_b) {
        assert!(common::max_abs_diff(&ca.raw_frame, &cb.raw_frame) < TOL);
        assert!(common::max_abs_diff(&ca.projected_frame, &cb.projected_frame) < TOL);
    }
}

#[test]
fn inactive_points_are_zero_in_both_drivers() {
    let ctx = common::context();
    let raw = common::recording(800);

    let offline = run_offline(&raw, &ctx).unwrap();
    let mut driver = StreamDriver::new(&ctx, GridPredictors::empty(ctx.layout.total())).unwrap();
    let cycles = driver.run(&raw, &mut NullSink).unwrap();

    for (p, active) in ctx.active.iter().enumerate() {
        if *active {
            continue;
        }
        for t in 0..offline.sample_idx.len() {
            for b in 0..ctx.n_bands() {
                assert_eq!(offline.projected_features[[t, p, b]], 0.0);
            }
        }
        for cycle in &cycles {
            for b in 0..ctx.n_bands() {
                assert_eq!(cycle.projected_frame[[p, b]], 0.0);
            }
        }
    }
}
