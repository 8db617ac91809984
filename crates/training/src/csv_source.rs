use std::path::Path;

use estimator::{ColumnData, Frame};

use crate::{Result, TrainingError};

/// Reads a headered CSV file into a frame.
///
/// A column is numeric when every non-empty cell parses as `f64`; empty
/// cells in a numeric column become NaN. Anything else is categorical.
pub fn read_frame(path: &Path) -> Result<Frame> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if headers.is_empty() {
        return Err(TrainingError::DataSource(format!("{} has no header row", path.display())));
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(record.get(i).unwrap_or_default().trim().to_string());
        }
    }

    let mut frame = Frame::new();
    for (name, values) in headers.into_iter().zip(cells) {
        frame.push_column(name, infer_column(values))?;
    }
    Ok(frame)
}

fn infer_column(values: Vec<String>) -> ColumnData {
    let numeric: Option<Vec<f64>> = values
        .iter()
        .map(|v| if v.is_empty() { Some(f64::NAN) } else { v.parse().ok() })
        .collect();
    match numeric {
        Some(nums) => ColumnData::Numeric(nums),
        None => ColumnData::Categorical(values),
    }
}
