//! Tab-separated table of run configurations keyed by timestamp.
//!
//! Each training run appends one row to `params.tsv` in the data directory of
//! its environment. Consumers of checkpoints and statistics look the row up by
//! the timestamp embedded in the file names.
use crate::error::CurioError;
use anyhow::Result;
use log::{info, trace};
use std::{
    collections::BTreeMap,
    fs::OpenOptions,
    path::Path,
    str::FromStr,
};

/// File name of the table in the data directory of an environment.
pub const PARAMS_FILE: &str = "params.tsv";

/// Name of the column holding the run timestamp.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// One row of the hyperparameter table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HyperparamRow(BTreeMap<String, String>);

impl HyperparamRow {
    /// Creates a row with the given timestamp.
    pub fn new(timestamp: impl Into<String>) -> Self {
        let mut row = BTreeMap::new();
        row.insert(TIMESTAMP_KEY.to_string(), timestamp.into());
        Self(row)
    }

    /// Sets a column value.
    pub fn set(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(key.into(), value.to_string());
        self
    }

    /// Raw value of a column.
    pub fn get(&self, key: &str) -> Result<&str, CurioError> {
        self.0
            .get(key)
            .map(|s| s.as_str())
            .ok_or_else(|| CurioError::HyperparamKeyError(key.to_string()))
    }

    /// Parsed value of a column.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Result<T, CurioError> {
        let value = self.get(key)?;
        value.parse().map_err(|_| CurioError::HyperparamValueError {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Timestamp of the run.
    pub fn timestamp(&self) -> Result<&str, CurioError> {
        self.get(TIMESTAMP_KEY)
    }

    /// Number of stacked frames.
    pub fn n_stack(&self) -> Result<i64, CurioError> {
        self.get_parsed("n_stack")
    }

    /// Column names, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

/// Hyperparameter table read from a tab-separated file with a header row.
#[derive(Debug, Clone, Default)]
pub struct HyperparamTable {
    rows: Vec<HyperparamRow>,
}

impl HyperparamTable {
    /// Reads a table.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(&path)?;
        let headers = rdr.headers()?.clone();
        if !headers.iter().any(|h| h == TIMESTAMP_KEY) {
            return Err(CurioError::HyperparamKeyError(TIMESTAMP_KEY.to_string()).into());
        }

        let mut rows = vec![];
        for record in rdr.records() {
            let record = record?;
            let row = headers
                .iter()
                .zip(record.iter())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            rows.push(HyperparamRow(row));
        }
        info!("Read {} rows from {:?}", rows.len(), path.as_ref());
        Ok(Self { rows })
    }

    /// Rows in file order.
    pub fn rows(&self) -> &[HyperparamRow] {
        &self.rows
    }

    /// Timestamps of all rows in file order.
    pub fn timestamps(&self) -> Vec<&str> {
        self.rows.iter().filter_map(|r| r.timestamp().ok()).collect()
    }

    /// Finds the row of a run.
    pub fn find(&self, timestamp: &str) -> Option<&HyperparamRow> {
        self.rows
            .iter()
            .find(|r| r.timestamp().map(|t| t == timestamp).unwrap_or(false))
    }

    /// Appends a row to a table file, writing the header if the file is new.
    ///
    /// Columns are written in sorted order; appending to an existing file
    /// requires the same set of columns.
    pub fn append(path: impl AsRef<Path>, row: &HyperparamRow) -> Result<()> {
        let path = path.as_ref();
        let is_new = !path.exists();

        if !is_new {
            let mut rdr = csv::ReaderBuilder::new().delimiter(b'\t').from_path(path)?;
            let headers = rdr.headers()?;
            let expected = row.keys().map(|k| k.as_str()).collect::<Vec<_>>();
            if headers.iter().collect::<Vec<_>>() != expected {
                let missing = headers
                    .iter()
                    .find(|h| !expected.contains(h))
                    .or_else(|| expected.iter().copied().find(|k| !headers.iter().any(|h| h == *k)))
                    .unwrap_or_default();
                return Err(CurioError::HyperparamKeyError(missing.to_string()).into());
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut wtr = csv::WriterBuilder::new().delimiter(b'\t').from_writer(file);
        if is_new {
            wtr.write_record(row.keys())?;
        }
        wtr.write_record(row.0.values())?;
        wtr.flush()?;
        trace!("Append hyperparameters to {:?}", path);
        Ok(())
    }
}
