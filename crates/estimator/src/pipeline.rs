use serde::{Deserialize, Serialize};

use crate::{
    ColumnData, EstimatorError, Frame, GbdtParams, GradientBoostingRegressor, Result, TargetEncoder,
};

/// Target encoding of categorical columns followed by the boosted regressor.
///
/// The feature layout is fixed at fit time; inference frames are matched by
/// column name, so extra columns are ignored and missing ones are an error.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PricingPipeline {
    feature_columns: Vec<String>,
    categorical_columns: Vec<String>,
    encoder: TargetEncoder,
    regressor: GradientBoostingRegressor,
}

impl PricingPipeline {
    /// Every column of `features` is a model input. Categorical columns go
    /// through the target encoder, numeric columns pass through unchanged.
    pub fn fit(features: &Frame, target: &[f64], params: GbdtParams) -> Result<Self> {
        if features.n_rows() == 0 || target.is_empty() {
            return Err(EstimatorError::EmptyDataset);
        }
        if features.n_rows() != target.len() {
            return Err(EstimatorError::LengthMismatch {
                expected: features.n_rows(),
                actual: target.len(),
            });
        }

        let feature_columns = features.column_names();
        let categorical_columns: Vec<String> = features
            .columns()
            .iter()
            .filter(|c| matches!(c.data, ColumnData::Categorical(_)))
            .map(|c| c.name.clone())
            .collect();

        let mut encoder = TargetEncoder::default();
        encoder.fit(features, &categorical_columns, target)?;

        let matrix = encode_matrix(features, &feature_columns, &categorical_columns, &encoder)?;
        let regressor = GradientBoostingRegressor::fit(&matrix, target, params)?;

        Ok(Self {
            feature_columns,
            categorical_columns,
            encoder,
            regressor,
        })
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    pub fn params(&self) -> &GbdtParams {
        self.regressor.params()
    }

    /// Column-major numeric matrix in `feature_columns` order.
    pub fn transform(&self, frame: &Frame) -> Result<Vec<Vec<f64>>> {
        encode_matrix(frame, &self.feature_columns, &self.categorical_columns, &self.encoder)
    }

    pub fn predict(&self, frame: &Frame) -> Result<Vec<f64>> {
        let matrix = self.transform(frame)?;
        let mut row = vec![0.0; matrix.len()];
        (0..frame.n_rows())
            .map(|i| {
                for (f, column) in matrix.iter().enumerate() {
                    row[f] = column[i];
                }
                self.regressor.predict_row(&row)
            })
            .collect()
    }
}

fn encode_matrix(
    frame: &Frame,
    feature_columns: &[String],
    categorical_columns: &[String],
    encoder: &TargetEncoder,
) -> Result<Vec<Vec<f64>>> {
    let mut matrix = Vec::with_capacity(feature_columns.len());
    for name in feature_columns {
        let column = if categorical_columns.contains(name) {
            encoder.transform(frame, name)?
        } else {
            let values = frame.numeric(name)?;
            if values.iter().any(|v| !v.is_finite()) {
                return Err(EstimatorError::NonFinite(name.clone()));
            }
            values.to_vec()
        };
        matrix.push(column);
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PropertyRecord;

    fn training_frame() -> (Frame, Vec<f64>) {
        let types = ["casa", "departamento"];
        let sectors = ["vitacura", "las condes", "lo barnechea"];
        let mut t = Vec::new();
        let mut s = Vec::new();
        let mut area = Vec::new();
        let mut price = Vec::new();
        for i in 0..60 {
            let a = 50.0 + i as f64 * 3.0;
            t.push(types[i % 2].to_string());
            s.push(sectors[i % 3].to_string());
            area.push(a);
            price.push(a * 100.0 + if i % 2 == 0 { 5000.0 } else { 0.0 });
        }
        let frame = Frame::new()
            .with_column("type", ColumnData::Categorical(t))
            .unwrap()
            .with_column("sector", ColumnData::Categorical(s))
            .unwrap()
            .with_column("net_usable_area", ColumnData::Numeric(area.clone()))
            .unwrap()
            .with_column("net_area", ColumnData::Numeric(area.iter().map(|a| a * 1.3).collect()))
            .unwrap()
            .with_column("n_rooms", ColumnData::Numeric(vec![3.0; 60]))
            .unwrap()
            .with_column("n_bathroom", ColumnData::Numeric(vec![2.0; 60]))
            .unwrap()
            .with_column("latitude", ColumnData::Numeric(vec![-33.4; 60]))
            .unwrap()
            .with_column("longitude", ColumnData::Numeric(vec![-70.6; 60]))
            .unwrap();
        (frame, price)
    }

    #[test]
    fn test_fit_detects_categorical_columns() {
        let (frame, price) = training_frame();
        let p = PricingPipeline::fit(&frame, &price, GbdtParams::default()).unwrap();
        assert_eq!(p.categorical_columns(), &["type".to_string(), "sector".to_string()]);
        assert_eq!(p.feature_columns().len(), 8);
    }

    #[test]
    fn test_predicts_on_property_record_frame() {
        let (frame, price) = training_frame();
        let p = PricingPipeline::fit(&frame, &price, GbdtParams::default()).unwrap();

        let rec = PropertyRecord {
            property_type: "casa".into(),
            sector: "unknown sector".into(),
            net_usable_area: 120.0,
            net_area: 150.0,
            n_rooms: 3.0,
            n_bathroom: 2.0,
            latitude: -33.4,
            longitude: -70.6,
        };
        let out = p.predict(&rec.to_frame()).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].is_finite());
    }

    #[test]
    fn test_predict_requires_fitted_columns() {
        let (frame, price) = training_frame();
        let p = PricingPipeline::fit(&frame, &price, GbdtParams::default()).unwrap();

        let partial = frame.without_columns(&["sector"]);
        assert!(matches!(p.predict(&partial), Err(EstimatorError::MissingColumn(_))));
    }

    #[test]
    fn test_survives_json_round_trip() {
        let (frame, price) = training_frame();
        let p = PricingPipeline::fit(&frame, &price, GbdtParams::default()).unwrap();

        let bytes = serde_json::to_vec(&p).unwrap();
        let back: PricingPipeline = serde_json::from_slice(&bytes).unwrap();
        let before = p.predict(&frame).unwrap();
        let after = back.predict(&frame).unwrap();
        for (a, b) in before.iter().zip(&after) {
            assert!((a - b).abs() <= 1e-6 * a.abs().max(1.0));
        }
    }
}
