use estimator::Frame;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::{Result, TrainingError, TARGET_COLUMN};

/// Columns that must be strictly positive for a row to be kept by
/// [`remove_invalid_rows`].
pub const POSITIVE_COLUMNS: [&str; 3] = [TARGET_COLUMN, "net_usable_area", "net_area"];

/// Seeded shuffle, then the first `ceil(test_fraction * n)` rows of the
/// permutation are the test split. Returns `(train, test)`.
pub fn train_test_split(data: &Frame, test_fraction: f64, seed: u64) -> Result<(Frame, Frame)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrainingError::DataSource(format!(
            "test fraction {test_fraction} outside (0, 1)"
        )));
    }
    let n = data.n_rows();
    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n < 2 || n_test >= n {
        return Err(TrainingError::DataSource(format!("{n} rows are too few to split")));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    let (test_rows, train_rows) = order.split_at(n_test);
    Ok((data.select_rows(train_rows), data.select_rows(test_rows)))
}

/// Drops rows whose price or areas are not strictly positive.
pub fn remove_invalid_rows(data: &Frame) -> Result<Frame> {
    let columns = POSITIVE_COLUMNS
        .iter()
        .map(|c| data.numeric(c))
        .collect::<estimator::Result<Vec<_>>>()?;
    let keep: Vec<usize> = (0..data.n_rows())
        .filter(|&i| columns.iter().all(|c| c[i] > 0.0))
        .collect();
    Ok(data.select_rows(&keep))
}
