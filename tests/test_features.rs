//! Lag stacking over real pipeline output.

mod common;

use neurodec::{run_offline, stack_lags, stack_lags_block};

#[test]
fn offline_features_stack_into_training_tensors() {
    let ctx = common::context();
    let raw = common::recording(1500);
    let result = run_offline(&raw, &ctx).unwrap();

    let k = ctx.lag_count;
    let n_steps = result.sample_idx.len();
    let stacked = stack_lags(&result.projected_features, k).unwrap();
    assert_eq!(
        stacked.dim(),
        (n_steps - k, ctx.layout.total(), k * ctx.n_bands())
    );

    // Block 0 of output step i is the projected frame at step k + i.
    let n_bands = ctx.n_bands();
    for i in [0, n_steps - k - 1] {
        for p in 0..ctx.layout.total() {
            for b in 0..n_bands {
                assert_eq!(
                    stacked[[i, p, b]],
                    result.projected_features[[k + i, p, b]],
                    "step {i}, point {p}, band {b}"
                );
            }
        }
    }
}

#[test]
fn batch_and_streaming_flattening_agree_on_pipeline_output() {
    let ctx = common::context();
    let raw = common::recording(1000);
    let result = run_offline(&raw, &ctx).unwrap();

    let k = ctx.lag_count;
    let batch = stack_lags(&result.projected_features, k).unwrap();

    // Rebuild step 0's vector for one grid point the way the live driver does.
    let point = ctx.active.iter().position(|a| *a).unwrap();
    let window = result
        .projected_features
        .slice(ndarray::s![1..=k, point, ..]);
    let vec = stack_lags_block(window);
    for f in 0..k * ctx.n_bands() {
        assert_eq!(vec[f], batch[[0, point, f]], "feature {f}");
    }
}

#[test]
fn stacking_rejects_short_runs() {
    let ctx = common::context();
    // Exactly k frames is not enough for a single stacked step.
    let frames = ndarray::Array3::zeros((ctx.lag_count, ctx.layout.total(), ctx.n_bands()));
    assert!(stack_lags(&frames, ctx.lag_count).is_err());
}
