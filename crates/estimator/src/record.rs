use serde::{Deserialize, Serialize};

use crate::{ColumnData, EstimatorError, Frame, Result};

/// A single property as sent to the prediction endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    #[serde(rename = "type")]
    pub property_type: String,
    pub sector: String,
    pub net_usable_area: f64,
    pub net_area: f64,
    pub n_rooms: f64,
    pub n_bathroom: f64,
    pub latitude: f64,
    pub longitude: f64,
}

impl PropertyRecord {
    pub fn validate(&self) -> Result<()> {
        if self.property_type.trim().is_empty() {
            return Err(EstimatorError::InvalidRecord("type must not be empty".into()));
        }
        if self.sector.trim().is_empty() {
            return Err(EstimatorError::InvalidRecord("sector must not be empty".into()));
        }

        let numbers = [
            ("net_usable_area", self.net_usable_area),
            ("net_area", self.net_area),
            ("n_rooms", self.n_rooms),
            ("n_bathroom", self.n_bathroom),
            ("latitude", self.latitude),
            ("longitude", self.longitude),
        ];
        if let Some((name, _)) = numbers.iter().find(|(_, v)| !v.is_finite()) {
            return Err(EstimatorError::InvalidRecord(format!("{name} must be a finite number")));
        }

        if self.net_usable_area <= 0.0 {
            return Err(EstimatorError::InvalidRecord("net_usable_area must be > 0".into()));
        }
        if self.net_area <= 0.0 {
            return Err(EstimatorError::InvalidRecord("net_area must be > 0".into()));
        }
        if self.n_rooms < 0.0 {
            return Err(EstimatorError::InvalidRecord("n_rooms must be >= 0".into()));
        }
        if self.n_bathroom < 0.0 {
            return Err(EstimatorError::InvalidRecord("n_bathroom must be >= 0".into()));
        }
        Ok(())
    }

    /// Single-row frame with the same column names the training data uses.
    pub fn to_frame(&self) -> Frame {
        let columns = [
            ("type", ColumnData::Categorical(vec![self.property_type.clone()])),
            ("sector", ColumnData::Categorical(vec![self.sector.clone()])),
            ("net_usable_area", ColumnData::Numeric(vec![self.net_usable_area])),
            ("net_area", ColumnData::Numeric(vec![self.net_area])),
            ("n_rooms", ColumnData::Numeric(vec![self.n_rooms])),
            ("n_bathroom", ColumnData::Numeric(vec![self.n_bathroom])),
            ("latitude", ColumnData::Numeric(vec![self.latitude])),
            ("longitude", ColumnData::Numeric(vec![self.longitude])),
        ];

        let mut frame = Frame::new();
        for (name, data) in columns {
            // names are distinct and every column has one row
            let _ = frame.push_column(name, data);
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PropertyRecord {
        PropertyRecord {
            property_type: "casa".into(),
            sector: "vitacura".into(),
            net_usable_area: 152.0,
            net_area: 257.0,
            n_rooms: 3.0,
            n_bathroom: 3.0,
            latitude: -33.3794,
            longitude: -70.5447,
        }
    }

    #[test]
    fn test_deserializes_type_field() {
        let json = r#"{"type":"casa","sector":"vitacura","net_usable_area":152.0,"net_area":257.0,
                       "n_rooms":3.0,"n_bathroom":3.0,"latitude":-33.3794,"longitude":-70.5447}"#;
        let rec: PropertyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec, record());
    }

    #[test]
    fn test_validate() {
        assert!(record().validate().is_ok());

        let mut r = record();
        r.net_area = 0.0;
        assert!(matches!(r.validate(), Err(EstimatorError::InvalidRecord(_))));

        let mut r = record();
        r.n_rooms = -1.0;
        assert!(r.validate().is_err());

        let mut r = record();
        r.latitude = f64::NAN;
        assert!(r.validate().is_err());

        let mut r = record();
        r.sector = "  ".into();
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_to_frame_has_one_row_per_column() {
        let f = record().to_frame();
        assert_eq!(f.n_rows(), 1);
        assert_eq!(f.n_columns(), 8);
        assert_eq!(f.categorical("type").unwrap(), &["casa".to_string()]);
        assert_eq!(f.numeric("net_area").unwrap(), &[257.0]);
    }
}
