//! Movement-label baseline correction and on/off detection.
//!
//! Force/rotation traces arrive with an arbitrary DC offset.  The baseline is
//! estimated from the quiet portion of the trace (samples at or below the
//! global mean), subtracted, and a movement threshold of mean + 2·std of the
//! corrected quiet samples turns the trace into a binary on/off mask.

/// Baseline-correct one label trace.
///
/// Returns `(corrected, onoff, threshold)`:
/// * `corrected` — the trace with the quiet-segment mean removed;
/// * `onoff` — 1.0 where `corrected` exceeds the threshold, else 0.0;
/// * `threshold` — the movement detection threshold on the corrected scale.
pub fn baseline_correction(signal: &[f64]) -> (Vec<f64>, Vec<f64>, f64) {
    if signal.is_empty() {
        return (vec![], vec![], 0.0);
    }

    let global_mean = signal.iter().sum::<f64>() / signal.len() as f64;
    let quiet: Vec<f64> = signal.iter().copied().filter(|&v| v <= global_mean).collect();
    // A flat trace has every sample "quiet"; the fallback keeps it defined.
    let baseline = if quiet.is_empty() {
        global_mean
    } else {
        quiet.iter().sum::<f64>() / quiet.len() as f64
    };

    let corrected: Vec<f64> = signal.iter().map(|v| v - baseline).collect();

    let quiet_corrected: Vec<f64> = quiet.iter().map(|v| v - baseline).collect();
    let qn = quiet_corrected.len().max(1) as f64;
    let qmean = quiet_corrected.iter().sum::<f64>() / qn;
    let qvar = quiet_corrected.iter().map(|v| (v - qmean) * (v - qmean)).sum::<f64>() / qn;
    let threshold = qmean + 2.0 * qvar.sqrt();

    let onoff: Vec<f64> = corrected
        .iter()
        .map(|&v| if v > threshold { 1.0 } else { 0.0 })
        .collect();

    (corrected, onoff, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_removed() {
        // Rest at 10, two movement bursts at 14.
        let mut signal = vec![10.0; 100];
        for i in 40..50 {
            signal[i] = 14.0;
        }
        let (corrected, onoff, threshold) = baseline_correction(&signal);
        // Rest samples land at ≈ 0.
        approx::assert_abs_diff_eq!(corrected[0], 0.0, epsilon = 1e-9);
        // Bursts are detected.
        assert_eq!(onoff[45], 1.0);
        assert_eq!(onoff[0], 0.0);
        assert!(threshold >= 0.0 && threshold < 4.0);
    }

    #[test]
    fn flat_trace_stays_quiet() {
        let signal = vec![5.0; 50];
        let (corrected, onoff, _) = baseline_correction(&signal);
        assert!(corrected.iter().all(|&v| v == 0.0));
        assert!(onoff.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn empty_trace_is_defined() {
        let (c, o, t) = baseline_correction(&[]);
        assert!(c.is_empty() && o.is_empty());
        assert_eq!(t, 0.0);
    }

    #[test]
    fn noisy_rest_sets_threshold_above_noise() {
        // Small noise around 0 at rest, strong plateaus at 5.
        let mut signal: Vec<f64> = (0..200)
            .map(|i| 0.1 * ((i as f64 * 0.7).sin()))
            .collect();
        for i in 100..130 {
            signal[i] = 5.0;
        }
        let (_, onoff, _) = baseline_correction(&signal);
        let rest_hits: f64 = onoff[..100].iter().sum();
        let move_hits: f64 = onoff[100..130].iter().sum();
        assert!(move_hits == 30.0, "movement missed: {move_hits}");
        assert!(rest_hits < 10.0, "too many rest false positives: {rest_hits}");
    }
}
