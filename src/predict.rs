//! Per-grid-point movement predictors.
//!
//! Models are opaque to the pipeline: one object per grid point with a
//! single-vector-in, scalar-out contract.  The streaming driver never
//! inspects model internals and treats a per-point failure as that point's
//! problem alone.

use anyhow::{ensure, Result};

/// Opaque movement estimator for one grid point.
pub trait Predictor {
    /// Estimate movement from a flattened time-lag feature vector.
    fn predict(&self, features: &[f64]) -> Result<f64>;
}

/// Linear model: `w · x + b`.
///
/// The form the trained per-grid-point models are shipped in.
#[derive(Debug, Clone)]
pub struct LinearPredictor {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl Predictor for LinearPredictor {
    fn predict(&self, features: &[f64]) -> Result<f64> {
        ensure!(
            features.len() == self.weights.len(),
            "predictor expects {} features, got {}",
            self.weights.len(),
            features.len()
        );
        let dot: f64 = self
            .weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum();
        Ok(dot + self.bias)
    }
}

/// The run's predictor array, indexed by grid-point id.
///
/// Inactive points typically have no model; those slots are `None`.
pub struct GridPredictors {
    models: Vec<Option<Box<dyn Predictor>>>,
}

impl GridPredictors {
    pub fn new(models: Vec<Option<Box<dyn Predictor>>>) -> Self {
        Self { models }
    }

    /// All slots empty; the streaming driver then only tracks labels.
    pub fn empty(n_points: usize) -> Self {
        Self { models: (0..n_points).map(|_| None).collect() }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Predict for one grid point, shielding the caller from per-point
    /// failures: a missing model or a predict error yields 0.0 so one bad
    /// point cannot halt estimation for the rest.
    pub fn predict_point(&self, point: usize, features: &[f64]) -> f64 {
        match self.models.get(point) {
            Some(Some(model)) => match model.predict(features) {
                Ok(v) => v,
                Err(err) => {
                    eprintln!("predictor failed for grid point {point}: {err}");
                    0.0
                }
            },
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_predictor_is_dot_plus_bias() {
        let model = LinearPredictor { weights: vec![1.0, -2.0, 0.5], bias: 1.0 };
        let y = model.predict(&[2.0, 1.0, 4.0]).unwrap();
        approx::assert_abs_diff_eq!(y, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn feature_length_mismatch_is_error() {
        let model = LinearPredictor { weights: vec![1.0, 2.0], bias: 0.0 };
        assert!(model.predict(&[1.0]).is_err());
    }

    #[test]
    fn failing_point_yields_neutral_value() {
        let good = LinearPredictor { weights: vec![2.0], bias: 0.0 };
        let bad = LinearPredictor { weights: vec![1.0, 1.0], bias: 0.0 }; // wrong arity
        let predictors = GridPredictors::new(vec![
            Some(Box::new(good)),
            Some(Box::new(bad)),
            None,
        ]);
        assert_eq!(predictors.predict_point(0, &[3.0]), 6.0);
        assert_eq!(predictors.predict_point(1, &[3.0]), 0.0);
        assert_eq!(predictors.predict_point(2, &[3.0]), 0.0);
        assert_eq!(predictors.predict_point(99, &[3.0]), 0.0);
    }
}
