//! Data Processor Module
//! Handles column renaming, row filtering and column extraction.

use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;

/// Date layout used by the price files.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Column '{0}' not found")]
    MissingColumn(String),
    #[error("Column '{column}' has no value at row {row}")]
    MissingValue { column: String, row: usize },
    #[error("Column '{column}' row {row}: '{value}' is not a YYYY-MM-DD date")]
    InvalidDate {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Nothing to concatenate")]
    NoFrames,
}

/// Handles data cleaning and transformation operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Fail with `MissingColumn` unless every column exists.
    pub fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<(), ProcessorError> {
        match columns.iter().find(|name| df.column(name).is_err()) {
            Some(missing) => Err(ProcessorError::MissingColumn(missing.to_string())),
            None => Ok(()),
        }
    }

    /// Rename a single column in place.
    pub fn rename_column(df: &mut DataFrame, from: &str, to: &str) -> Result<(), ProcessorError> {
        Self::require_columns(df, &[from])?;
        df.rename(from, to.into())?;
        Ok(())
    }

    /// Apply several renames in order.
    pub fn rename_columns(df: &mut DataFrame, pairs: &[(&str, &str)]) -> Result<(), ProcessorError> {
        for (from, to) in pairs {
            Self::rename_column(df, from, to)?;
        }
        Ok(())
    }

    /// Keep rows whose `column` equals `value`, in their original order.
    ///
    /// The comparison is done on the text form of the column so numeric
    /// categories such as years can be selected the same way.
    pub fn filter_by_value(
        df: &DataFrame,
        column: &str,
        value: &str,
    ) -> Result<DataFrame, ProcessorError> {
        Self::require_columns(df, &[column])?;
        let filtered = df
            .clone()
            .lazy()
            .filter(col(column).cast(DataType::String).eq(lit(value)))
            .collect()?;
        Ok(filtered)
    }

    /// Stack frames with identical schema on top of each other.
    pub fn concat_rows(frames: &[DataFrame]) -> Result<DataFrame, ProcessorError> {
        let (first, rest) = frames.split_first().ok_or(ProcessorError::NoFrames)?;
        let mut stacked = first.clone();
        for frame in rest {
            stacked = stacked.vstack(frame)?;
        }
        Ok(stacked)
    }

    /// Extract a column as floats. Null cells are an error.
    pub fn numeric_values(df: &DataFrame, column: &str) -> Result<Vec<f64>, ProcessorError> {
        Self::require_columns(df, &[column])?;
        let casted = df.column(column)?.cast(&DataType::Float64)?;
        let ca = casted.f64()?;

        ca.into_iter()
            .enumerate()
            .map(|(row, value)| match value {
                Some(v) if !v.is_nan() => Ok(v),
                _ => Err(ProcessorError::MissingValue {
                    column: column.to_string(),
                    row,
                }),
            })
            .collect()
    }

    /// Extract a column as text. Null cells are an error.
    pub fn string_values(df: &DataFrame, column: &str) -> Result<Vec<String>, ProcessorError> {
        Self::require_columns(df, &[column])?;
        let casted = df.column(column)?.cast(&DataType::String)?;
        let ca = casted.as_materialized_series().str()?;

        ca.into_iter()
            .enumerate()
            .map(|(row, value)| {
                value
                    .map(|s| s.to_string())
                    .ok_or_else(|| ProcessorError::MissingValue {
                        column: column.to_string(),
                        row,
                    })
            })
            .collect()
    }

    /// Extract a column of ISO dates.
    pub fn date_values(df: &DataFrame, column: &str) -> Result<Vec<NaiveDate>, ProcessorError> {
        Self::string_values(df, column)?
            .into_iter()
            .enumerate()
            .map(|(row, text)| {
                // Datetime columns render as "YYYY-MM-DD hh:mm:ss"
                let day = text.get(..10).unwrap_or(&text);
                NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|_| {
                    ProcessorError::InvalidDate {
                        column: column.to_string(),
                        row,
                        value: text.clone(),
                    }
                })
            })
            .collect()
    }

    /// Distinct values of a column in order of first appearance.
    pub fn unique_values(df: &DataFrame, column: &str) -> Result<Vec<String>, ProcessorError> {
        let mut seen: Vec<String> = Vec::new();
        for value in Self::string_values(df, column)? {
            if !seen.contains(&value) {
                seen.push(value);
            }
        }
        Ok(seen)
    }

    /// Group `value` by `category`, keeping categories in order of first
    /// appearance. Rows with a null in either column are skipped.
    pub fn group_values(
        df: &DataFrame,
        category: &str,
        value: &str,
    ) -> Result<Vec<(String, Vec<f64>)>, ProcessorError> {
        Self::require_columns(df, &[category, value])?;
        let category_col = df.column(category)?.cast(&DataType::String)?;
        let categories = category_col.as_materialized_series().str()?;
        let value_col = df.column(value)?.cast(&DataType::Float64)?;
        let values = value_col.f64()?;

        let mut groups: Vec<(String, Vec<f64>)> = Vec::new();
        for (c, v) in categories.into_iter().zip(values.into_iter()) {
            let (Some(c), Some(v)) = (c, v) else {
                continue;
            };
            if v.is_nan() {
                continue;
            }
            match groups.iter_mut().find(|(name, _)| name == c) {
                Some((_, bucket)) => bucket.push(v),
                None => groups.push((c.to_string(), vec![v])),
            }
        }
        Ok(groups)
    }
}
