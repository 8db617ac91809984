use estimator::{ColumnData, Frame};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Row, TypeInfo};

use crate::{Result, TrainingError};

/// `SELECT * FROM table_name` into a frame. Numeric and boolean columns
/// become numeric (NULL is NaN), text columns become categorical (NULL is
/// the empty string). Any other column type is rejected.
pub async fn load_table(db_url: &str, table_name: &str) -> Result<Frame> {
    let table = quote_table_name(table_name)?;
    let pool = PgPool::connect(db_url).await?;
    let rows: Vec<PgRow> = sqlx::query(&format!("SELECT * FROM {table}"))
        .fetch_all(&pool)
        .await?;
    pool.close().await;

    let Some(first) = rows.first() else {
        return Err(TrainingError::DataSource(format!("table {table_name} is empty")));
    };

    let mut frame = Frame::new();
    for (i, column) in first.columns().iter().enumerate() {
        let data = decode_column(&rows, i, column.type_info().name())
            .ok_or_else(|| {
                TrainingError::DataSource(format!(
                    "column `{}` has unsupported type {}",
                    column.name(),
                    column.type_info().name()
                ))
            })??;
        frame.push_column(column.name(), data)?;
    }
    Ok(frame)
}

fn decode_column(rows: &[PgRow], i: usize, type_name: &str) -> Option<Result<ColumnData>> {
    fn numeric<T, F>(rows: &[PgRow], i: usize, f: F) -> Result<ColumnData>
    where
        T: for<'r> sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
        F: Fn(T) -> f64,
    {
        rows.iter()
            .map(|r| Ok(r.try_get::<Option<T>, _>(i)?.map(&f).unwrap_or(f64::NAN)))
            .collect::<Result<Vec<f64>>>()
            .map(ColumnData::Numeric)
    }

    Some(match type_name {
        "FLOAT8" => numeric::<f64, _>(rows, i, |v| v),
        "FLOAT4" => numeric::<f32, _>(rows, i, f64::from),
        "INT8" => numeric::<i64, _>(rows, i, |v| v as f64),
        "INT4" => numeric::<i32, _>(rows, i, f64::from),
        "INT2" => numeric::<i16, _>(rows, i, f64::from),
        "BOOL" => numeric::<bool, _>(rows, i, |v| if v { 1.0 } else { 0.0 }),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => rows
            .iter()
            .map(|r| Ok(r.try_get::<Option<String>, _>(i)?.unwrap_or_default()))
            .collect::<Result<Vec<String>>>()
            .map(ColumnData::Categorical),
        _ => return None,
    })
}

/// Accepts `table` or `schema.table` made of `[A-Za-z0-9_]` and returns it
/// double-quoted, so it can be spliced into SQL.
pub fn quote_table_name(table_name: &str) -> Result<String> {
    let parts: Vec<&str> = table_name.split('.').collect();
    let valid = parts.len() <= 2
        && parts.iter().all(|p| {
            !p.is_empty() && p.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
        });
    if !valid {
        return Err(TrainingError::DataSource(format!("invalid table name `{table_name}`")));
    }
    Ok(parts.iter().map(|p| format!("\"{p}\"")).collect::<Vec<_>>().join("."))
}
