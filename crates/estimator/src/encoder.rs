//! Smoothed target encoding for categorical columns.
//!
//! Each category maps to a blend of the global target mean (the prior) and
//! the category's own target mean. The blend weight is a sigmoid of the
//! category count:
//!
//! ```text
//! w    = 1 / (1 + exp(-(count - min_samples_leaf) / smoothing))
//! enc  = prior * (1 - w) + mean * w
//! ```
//!
//! Categories seen only once, and categories never seen during fit, encode
//! to the prior.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{EstimatorError, Frame, Result};

pub const DEFAULT_MIN_SAMPLES_LEAF: f64 = 20.0;
pub const DEFAULT_SMOOTHING: f64 = 10.0;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TargetEncoder {
    pub min_samples_leaf: f64,
    pub smoothing: f64,
    prior: f64,
    mappings: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Default for TargetEncoder {
    fn default() -> Self {
        Self {
            min_samples_leaf: DEFAULT_MIN_SAMPLES_LEAF,
            smoothing: DEFAULT_SMOOTHING,
            prior: 0.0,
            mappings: BTreeMap::new(),
        }
    }
}

impl TargetEncoder {
    /// Learns one mapping per column in `columns`. Only the training split
    /// should ever be passed here.
    pub fn fit(&mut self, frame: &Frame, columns: &[String], target: &[f64]) -> Result<()> {
        if target.is_empty() {
            return Err(EstimatorError::EmptyDataset);
        }
        if frame.n_rows() != target.len() {
            return Err(EstimatorError::LengthMismatch {
                expected: frame.n_rows(),
                actual: target.len(),
            });
        }
        if target.iter().any(|y| !y.is_finite()) {
            return Err(EstimatorError::NonFinite("target".into()));
        }

        self.prior = target.iter().sum::<f64>() / target.len() as f64;
        self.mappings.clear();

        for name in columns {
            let values = frame.categorical(name)?;

            let mut stats: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
            for (value, y) in values.iter().zip(target) {
                let entry = stats.entry(value.as_str()).or_insert((0.0, 0.0));
                entry.0 += 1.0;
                entry.1 += y;
            }

            let mapping = stats
                .into_iter()
                .map(|(value, (count, sum))| (value.to_string(), self.blend(count, sum / count)))
                .collect();
            self.mappings.insert(name.clone(), mapping);
        }
        Ok(())
    }

    fn blend(&self, count: f64, mean: f64) -> f64 {
        if count <= 1.0 {
            return self.prior;
        }
        let weight = 1.0 / (1.0 + (-(count - self.min_samples_leaf) / self.smoothing).exp());
        self.prior * (1.0 - weight) + mean * weight
    }

    pub fn prior(&self) -> f64 {
        self.prior
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.mappings.keys().map(String::as_str)
    }

    pub fn encode(&self, column: &str, value: &str) -> Result<f64> {
        let mapping = self
            .mappings
            .get(column)
            .ok_or_else(|| EstimatorError::MissingColumn(column.to_string()))?;
        Ok(mapping.get(value).copied().unwrap_or(self.prior))
    }

    pub fn transform(&self, frame: &Frame, column: &str) -> Result<Vec<f64>> {
        frame
            .categorical(column)?
            .iter()
            .map(|v| self.encode(column, v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColumnData;

    fn frame(values: &[&str]) -> Frame {
        Frame::new()
            .with_column(
                "sector",
                ColumnData::Categorical(values.iter().map(|s| s.to_string()).collect()),
            )
            .unwrap()
    }

    #[test]
    fn test_unseen_and_singleton_categories_map_to_prior() {
        let f = frame(&["a", "a", "b"]);
        let mut enc = TargetEncoder::default();
        enc.fit(&f, &["sector".to_string()], &[1.0, 3.0, 8.0]).unwrap();

        assert_eq!(enc.prior(), 4.0);
        assert_eq!(enc.encode("sector", "b").unwrap(), 4.0);
        assert_eq!(enc.encode("sector", "never-seen").unwrap(), 4.0);
    }

    #[test]
    fn test_frequent_category_moves_towards_its_mean() {
        let mut values = vec!["hi"; 100];
        values.extend(vec!["lo"; 100]);
        let mut target = vec![10.0; 100];
        target.extend(vec![0.0; 100]);

        let mut enc = TargetEncoder::default();
        enc.fit(&frame(&values), &["sector".to_string()], &target).unwrap();

        let hi = enc.encode("sector", "hi").unwrap();
        let lo = enc.encode("sector", "lo").unwrap();
        assert!(hi > 9.9 && hi <= 10.0, "hi = {hi}");
        assert!(lo >= 0.0 && lo < 0.1, "lo = {lo}");
    }

    #[test]
    fn test_rejects_numeric_column() {
        let f = Frame::new()
            .with_column("sector", ColumnData::Numeric(vec![1.0]))
            .unwrap();
        let mut enc = TargetEncoder::default();
        let res = enc.fit(&f, &["sector".to_string()], &[1.0]);
        assert!(matches!(res, Err(EstimatorError::ColumnType { .. })));
    }

    #[test]
    fn test_unknown_column_is_an_error() {
        let enc = TargetEncoder::default();
        assert!(matches!(enc.encode("type", "casa"), Err(EstimatorError::MissingColumn(_))));
    }
}
