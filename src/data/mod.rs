pub mod discovery;
pub mod loader;
pub mod validation;
pub mod writer;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// One validated row of a headerless exchange CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct StockRecord {
    pub stock_id: String,
    pub timestamp: String,
    pub price: f64,
}

impl StockRecord {
    pub fn new(stock_id: impl Into<String>, timestamp: impl Into<String>, price: f64) -> Self {
        Self {
            stock_id: stock_id.into(),
            timestamp: timestamp.into(),
            price,
        }
    }

    /// Calendar date of the row. The validator only checks the `dd-mm-yyyy`
    /// shape, so impossible dates such as `31-02-2024` yield `None` here.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.timestamp, "%d-%m-%Y").ok()
    }
}

impl fmt::Display for StockRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.stock_id, self.timestamp, self.price)
    }
}

/// Positional columns as they appear in the file, before validation.
/// An empty price column deserializes to `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStockRow {
    pub stock_id: String,
    pub timestamp: String,
    pub price: Option<f64>,
}

impl fmt::Display for RawStockRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.price {
            Some(price) => write!(f, "{},{},{}", self.stock_id, self.timestamp, price),
            None => write!(f, "{},{},", self.stock_id, self.timestamp),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierRecord {
    #[serde(rename = "Stock-ID")]
    pub stock_id: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "actual stock price at that timestamp")]
    pub price: f64,
    #[serde(rename = "mean of 30 data points")]
    pub window_mean: f64,
    #[serde(rename = "deviation")]
    pub deviation: f64,
    #[serde(rename = "percentage deviation")]
    pub percentage_deviation: f64,
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Failed to read directory {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed row in {path} at line {line}: {reason}")]
    Parse {
        path: PathBuf,
        line: u64,
        reason: String,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, DataError>;
