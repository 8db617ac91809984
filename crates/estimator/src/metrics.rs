//! Regression quality scores computed on a held-out split.

use serde::{Deserialize, Serialize};

use crate::{EstimatorError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionScores {
    pub rmse: f64,
    pub mape: f64,
    pub mae: f64,
}

pub fn score(truth: &[f64], predictions: &[f64]) -> Result<RegressionScores> {
    if truth.is_empty() {
        return Err(EstimatorError::EmptyDataset);
    }
    if truth.len() != predictions.len() {
        return Err(EstimatorError::LengthMismatch {
            expected: truth.len(),
            actual: predictions.len(),
        });
    }
    Ok(RegressionScores {
        rmse: rmse(truth, predictions),
        mape: mape(truth, predictions),
        mae: mae(truth, predictions),
    })
}

/// sqrt(mean((p - y)²))
pub fn rmse(truth: &[f64], predictions: &[f64]) -> f64 {
    let mse = truth
        .iter()
        .zip(predictions)
        .map(|(y, p)| (p - y) * (p - y))
        .sum::<f64>()
        / truth.len() as f64;
    mse.sqrt()
}

pub fn mae(truth: &[f64], predictions: &[f64]) -> f64 {
    truth.iter().zip(predictions).map(|(y, p)| (p - y).abs()).sum::<f64>() / truth.len() as f64
}

/// Fraction, not percent. The denominator is clamped at machine epsilon so a
/// zero target yields a huge but finite error.
pub fn mape(truth: &[f64], predictions: &[f64]) -> f64 {
    truth
        .iter()
        .zip(predictions)
        .map(|(y, p)| (p - y).abs() / y.abs().max(f64::EPSILON))
        .sum::<f64>()
        / truth.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions_score_zero() {
        let y = [1.0, 2.0, 3.0];
        let s = score(&y, &y).unwrap();
        assert_eq!(s, RegressionScores { rmse: 0.0, mape: 0.0, mae: 0.0 });
    }

    #[test]
    fn test_known_values() {
        let y = [100.0, 200.0];
        let p = [110.0, 170.0];
        let s = score(&y, &p).unwrap();
        assert!((s.mae - 20.0).abs() < 1e-12);
        assert!((s.rmse - 500.0f64.sqrt()).abs() < 1e-12);
        assert!((s.mape - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_zero_target_is_finite() {
        let s = score(&[0.0], &[1.0]).unwrap();
        assert!(s.mape.is_finite());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(score(&[], &[]), Err(EstimatorError::EmptyDataset)));
        assert!(matches!(score(&[1.0], &[1.0, 2.0]), Err(EstimatorError::LengthMismatch { .. })));
    }
}
