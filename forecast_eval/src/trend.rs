//! Rolling trend series for charting

use crate::data::ForecastStore;
use crate::error::{EvalError, Result};
use crate::metrics::{model_error, ModelKind};
use crate::period::Period;
use serde::Serialize;

/// Number of months shown on the trend chart
pub const DEFAULT_TREND_WINDOW: usize = 12;

/// A record annotated with both models' percentage errors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub period: Period,
    pub actual_price: f64,
    pub predicted_lstm: f64,
    pub predicted_arima: f64,
    pub lstm_percent_error: f64,
    pub arima_percent_error: f64,
    pub highlighted: bool,
}

/// The most recent `window` records in ascending period order.
///
/// Stores shorter than the window are returned whole. When `highlight` names a
/// period inside the window, the first matching point is marked; otherwise no
/// point is.
pub fn extract_trend(
    store: &ForecastStore,
    window: usize,
    highlight: Option<&Period>,
) -> Result<Vec<TrendPoint>> {
    if window == 0 {
        return Err(EvalError::InvalidParameter(
            "trend window must be greater than zero".to_string(),
        ));
    }

    let mut records: Vec<_> = store.records().iter().collect();
    records.sort_by_key(|r| r.period());
    let start = records.len().saturating_sub(window);

    let mut points = Vec::with_capacity(records.len() - start);
    for record in &records[start..] {
        points.push(TrendPoint {
            period: record.period(),
            actual_price: record.actual_price(),
            predicted_lstm: record.predicted_lstm(),
            predicted_arima: record.predicted_arima(),
            lstm_percent_error: model_error(record, ModelKind::Lstm)?.percent_error,
            arima_percent_error: model_error(record, ModelKind::Arima)?.percent_error,
            highlighted: false,
        });
    }

    if let Some(target) = highlight {
        if let Some(point) = points.iter_mut().find(|p| &p.period == target) {
            point.highlighted = true;
        }
    }

    Ok(points)
}

/// Periods of a trend series, for chart axis labels
pub fn trend_labels(points: &[TrendPoint]) -> Vec<String> {
    points.iter().map(|p| p.period.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ForecastRecord;

    fn store_of(months: &[&str]) -> ForecastStore {
        ForecastStore::from_records(
            months
                .iter()
                .map(|m| ForecastRecord::new(m.parse().unwrap(), 100.0, 102.0, 97.0).unwrap())
                .collect(),
        )
    }

    #[test]
    fn test_zero_window_rejected() {
        let store = store_of(&["2024-01"]);
        assert!(matches!(
            extract_trend(&store, 0, None),
            Err(EvalError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_unsorted_source_is_sorted() {
        let store = store_of(&["2024-03", "2024-01", "2024-02"]);
        let points = extract_trend(&store, 2, None).unwrap();
        assert_eq!(trend_labels(&points), vec!["2024-02", "2024-03"]);
    }

    #[test]
    fn test_empty_store_gives_empty_trend() {
        let points = extract_trend(&ForecastStore::default(), DEFAULT_TREND_WINDOW, None).unwrap();
        assert!(points.is_empty());
    }
}
