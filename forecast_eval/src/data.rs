//! Forecast store loading and lookup

use crate::error::{EvalError, Result};
use crate::period::Period;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Column holding the forecast month
pub const DATE_COLUMN: &str = "Prediction_Date";
/// Column holding the observed price
pub const ACTUAL_COLUMN: &str = "Actual_Price";
/// Column holding the LSTM forecast
pub const LSTM_COLUMN: &str = "Predicted_LSTM_Price";
/// Column holding the ARIMA forecast
pub const ARIMA_COLUMN: &str = "Predicted_ARIMA_Price";

const REQUIRED_COLUMNS: [&str; 4] = [DATE_COLUMN, ACTUAL_COLUMN, LSTM_COLUMN, ARIMA_COLUMN];

/// One month of actual price and the two model predictions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRecord {
    period: Period,
    actual_price: f64,
    predicted_lstm: f64,
    predicted_arima: f64,
}

impl ForecastRecord {
    /// Create a record. The actual price must be positive and all prices finite.
    pub fn new(
        period: Period,
        actual_price: f64,
        predicted_lstm: f64,
        predicted_arima: f64,
    ) -> Result<Self> {
        if !actual_price.is_finite() || actual_price <= 0.0 {
            return Err(EvalError::DataError(format!(
                "missing or invalid actual price for {}: {}",
                period, actual_price
            )));
        }
        if !predicted_lstm.is_finite() || !predicted_arima.is_finite() {
            return Err(EvalError::DataError(format!(
                "non-finite prediction for {}",
                period
            )));
        }

        Ok(Self {
            period,
            actual_price,
            predicted_lstm,
            predicted_arima,
        })
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn actual_price(&self) -> f64 {
        self.actual_price
    }

    pub fn predicted_lstm(&self) -> f64 {
        self.predicted_lstm
    }

    pub fn predicted_arima(&self) -> f64 {
        self.predicted_arima
    }
}

/// Immutable collection of forecast records, in source order
#[derive(Debug, Clone, Default)]
pub struct ForecastStore {
    records: Vec<ForecastRecord>,
    dropped: usize,
}

impl ForecastStore {
    /// Build a store from already-validated records.
    pub fn from_records(records: Vec<ForecastRecord>) -> Self {
        Self { records, dropped: 0 }
    }

    /// All records in source order
    pub fn records(&self) -> &[ForecastRecord] {
        &self.records
    }

    /// Number of source rows dropped while loading
    pub fn dropped_rows(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct periods in order of first appearance
    pub fn periods(&self) -> Vec<Period> {
        let mut periods: Vec<Period> = Vec::with_capacity(self.records.len());
        for record in &self.records {
            if !periods.contains(&record.period) {
                periods.push(record.period);
            }
        }
        periods
    }

    /// First record for `period`. Duplicate periods are not rejected at load
    /// time, so later rows for the same month are never returned here.
    pub fn find(&self, period: &Period) -> Option<&ForecastRecord> {
        self.records.iter().find(|r| &r.period == period)
    }

    /// Record with the most recent period
    pub fn latest(&self) -> Option<&ForecastRecord> {
        self.records.iter().max_by_key(|r| r.period)
    }
}

/// Raw CSV row; numeric fields are parsed by hand so that a bad cell drops
/// the row instead of failing the whole file.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Prediction_Date")]
    prediction_date: Option<String>,
    #[serde(rename = "Actual_Price")]
    actual_price: Option<String>,
    #[serde(rename = "Predicted_LSTM_Price")]
    predicted_lstm: Option<String>,
    #[serde(rename = "Predicted_ARIMA_Price")]
    predicted_arima: Option<String>,
}

impl RawRow {
    fn into_record(self) -> Result<ForecastRecord> {
        let period: Period = required(self.prediction_date, DATE_COLUMN)?.parse()?;
        let actual = parse_price(self.actual_price, ACTUAL_COLUMN)?;
        let lstm = parse_price(self.predicted_lstm, LSTM_COLUMN)?;
        let arima = parse_price(self.predicted_arima, ARIMA_COLUMN)?;
        ForecastRecord::new(period, actual, lstm, arima)
    }
}

fn required(value: Option<String>, column: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(EvalError::DataError(format!("missing value in {}", column))),
    }
}

fn parse_price(value: Option<String>, column: &str) -> Result<f64> {
    let raw = required(value, column)?;
    let price: f64 = raw.trim().replace(',', "").parse()?;
    if !price.is_finite() {
        return Err(EvalError::DataError(format!("non-finite value in {}", column)));
    }
    Ok(price)
}

/// Data loader for forecast files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load the forecast store from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<ForecastStore> {
        let path = path.as_ref();
        let file = File::open(path)?;
        info!(path = %path.display(), "loading forecast store");
        Self::from_reader(file)
    }

    /// Load the forecast store from any CSV source.
    ///
    /// Fails only when a required column is missing or the source cannot be
    /// read; rows with a bad date, a missing or non-numeric price, or a
    /// non-positive actual price are dropped and counted.
    pub fn from_reader<R: Read>(reader: R) -> Result<ForecastStore> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(EvalError::DataError(format!(
                    "required column '{}' not found",
                    column
                )));
            }
        }

        let mut records = Vec::new();
        let mut dropped = 0;

        for (line, row) in csv_reader.deserialize::<RawRow>().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    debug!(line = line + 2, error = %e, "dropping unreadable row");
                    dropped += 1;
                    continue;
                }
            };

            match row.into_record() {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!(line = line + 2, error = %e, "dropping invalid row");
                    dropped += 1;
                }
            }
        }

        if dropped > 0 {
            warn!(dropped, accepted = records.len(), "dropped incomplete forecast rows");
        }
        info!(records = records.len(), "forecast store loaded");

        Ok(ForecastStore { records, dropped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(s: &str) -> Period {
        s.parse().unwrap()
    }

    #[test]
    fn test_record_rejects_non_positive_actual() {
        assert!(ForecastRecord::new(period("2024-01"), 0.0, 1.0, 1.0).is_err());
        assert!(ForecastRecord::new(period("2024-01"), -5.0, 1.0, 1.0).is_err());
        assert!(ForecastRecord::new(period("2024-01"), f64::NAN, 1.0, 1.0).is_err());
        assert!(ForecastRecord::new(period("2024-01"), 10.0, f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_find_returns_first_duplicate() {
        let store = ForecastStore::from_records(vec![
            ForecastRecord::new(period("2024-01"), 100.0, 101.0, 99.0).unwrap(),
            ForecastRecord::new(period("2024-01"), 200.0, 201.0, 199.0).unwrap(),
        ]);

        let found = store.find(&period("2024-01")).unwrap();
        assert_eq!(found.actual_price(), 100.0);
        assert_eq!(store.periods(), vec![period("2024-01")]);
    }

    #[test]
    fn test_latest_uses_period_not_position() {
        let store = ForecastStore::from_records(vec![
            ForecastRecord::new(period("2024-03"), 100.0, 101.0, 99.0).unwrap(),
            ForecastRecord::new(period("2023-11"), 200.0, 201.0, 199.0).unwrap(),
        ]);

        assert_eq!(store.latest().unwrap().period(), period("2024-03"));
        assert!(ForecastStore::default().latest().is_none());
    }

    #[test]
    fn test_parse_price_strips_thousands_separator() {
        assert_eq!(parse_price(Some("1,250.50".to_string()), ACTUAL_COLUMN).unwrap(), 1250.5);
        assert!(parse_price(Some("  ".to_string()), ACTUAL_COLUMN).is_err());
        assert!(parse_price(None, ACTUAL_COLUMN).is_err());
        assert!(parse_price(Some("abc".to_string()), ACTUAL_COLUMN).is_err());
    }
}
