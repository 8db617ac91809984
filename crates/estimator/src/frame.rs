//! Column-oriented table used for training data and single-row inference input.

use serde::{Deserialize, Serialize};

use crate::{EstimatorError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Categorical(v) => {
                ColumnData::Categorical(rows.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Frame::push_column`].
    pub fn with_column(mut self, name: impl Into<String>, data: ColumnData) -> Result<Self> {
        self.push_column(name, data)?;
        Ok(self)
    }

    /// Appends a column. The first column fixes the row count.
    pub fn push_column(&mut self, name: impl Into<String>, data: ColumnData) -> Result<()> {
        let name = name.into();
        if self.column(&name).is_some() {
            return Err(EstimatorError::DuplicateColumn(name));
        }
        if self.columns.is_empty() {
            self.n_rows = data.len();
        } else if data.len() != self.n_rows {
            return Err(EstimatorError::LengthMismatch {
                expected: self.n_rows,
                actual: data.len(),
            });
        }
        self.columns.push(Column { name, data });
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn numeric(&self, name: &str) -> Result<&[f64]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Numeric(v)) => Ok(v),
            Some(ColumnData::Categorical(_)) => Err(EstimatorError::ColumnType {
                column: name.to_string(),
                expected: "numeric",
            }),
            None => Err(EstimatorError::MissingColumn(name.to_string())),
        }
    }

    pub fn categorical(&self, name: &str) -> Result<&[String]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Categorical(v)) => Ok(v),
            Some(ColumnData::Numeric(_)) => Err(EstimatorError::ColumnType {
                column: name.to_string(),
                expected: "categorical",
            }),
            None => Err(EstimatorError::MissingColumn(name.to_string())),
        }
    }

    /// Copy of the frame restricted to `rows`, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Frame {
        Frame {
            columns: self
                .columns
                .iter()
                .map(|c| Column { name: c.name.clone(), data: c.data.select(rows) })
                .collect(),
            n_rows: rows.len(),
        }
    }

    /// Copy of the frame without the named columns. Unknown names are ignored.
    pub fn without_columns(&self, names: &[&str]) -> Frame {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .filter(|c| !names.contains(&c.name.as_str()))
            .cloned()
            .collect();
        let n_rows = if columns.is_empty() { 0 } else { self.n_rows };
        Frame { columns, n_rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::new()
            .with_column(
                "type",
                ColumnData::Categorical(vec!["casa".into(), "departamento".into(), "casa".into()]),
            )
            .unwrap()
            .with_column("price", ColumnData::Numeric(vec![100.0, 200.0, 300.0]))
            .unwrap()
    }

    #[test]
    fn test_push_column_rejects_length_mismatch() {
        let res = sample().with_column("n_rooms", ColumnData::Numeric(vec![1.0]));
        assert!(matches!(res, Err(EstimatorError::LengthMismatch { expected: 3, actual: 1 })));
    }

    #[test]
    fn test_push_column_rejects_duplicate() {
        let res = sample().with_column("price", ColumnData::Numeric(vec![1.0, 2.0, 3.0]));
        assert!(matches!(res, Err(EstimatorError::DuplicateColumn(_))));
    }

    #[test]
    fn test_select_rows_and_drop_columns() {
        let f = sample().select_rows(&[2, 0]);
        assert_eq!(f.n_rows(), 2);
        assert_eq!(f.numeric("price").unwrap(), &[300.0, 100.0]);

        let f = f.without_columns(&["price", "id"]);
        assert_eq!(f.column_names(), vec!["type".to_string()]);
        assert!(matches!(f.numeric("price"), Err(EstimatorError::MissingColumn(_))));
    }

    #[test]
    fn test_typed_accessors() {
        let f = sample();
        assert!(matches!(f.numeric("type"), Err(EstimatorError::ColumnType { .. })));
        assert_eq!(f.categorical("type").unwrap()[1], "departamento");
    }
}
