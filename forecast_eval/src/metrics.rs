//! Error metrics comparing model forecasts with actual prices

use crate::data::{ForecastRecord, ForecastStore};
use crate::error::{EvalError, Result};
use serde::Serialize;
use std::fmt;

/// The two forecasting models being compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModelKind {
    #[serde(rename = "LSTM")]
    Lstm,
    #[serde(rename = "ARIMA")]
    Arima,
}

impl ModelKind {
    /// Both models, in display order
    pub const ALL: [ModelKind; 2] = [ModelKind::Lstm, ModelKind::Arima];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Lstm => "LSTM",
            ModelKind::Arima => "ARIMA",
        }
    }

    /// Plain-language explanation shown next to the comparison
    pub fn description(&self) -> &'static str {
        match self {
            ModelKind::Lstm => {
                "LSTM (Long Short-Term Memory) is a deep learning model that learns from \
                 historical sequences of data. It detects complex, nonlinear patterns in time \
                 series, which suits forecasting in volatile markets."
            }
            ModelKind::Arima => {
                "ARIMA (AutoRegressive Integrated Moving Average) is a classical statistical \
                 model that uses past values and error terms to predict future points. It is \
                 transparent and interpretable but can struggle with rapidly changing trends."
            }
        }
    }

    /// The model's prediction stored in `record`
    pub fn prediction(&self, record: &ForecastRecord) -> f64 {
        match self {
            ModelKind::Lstm => record.predicted_lstm(),
            ModelKind::Arima => record.predicted_arima(),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Absolute and percentage error of one model for one period
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorResult {
    pub model: ModelKind,
    pub absolute_error: f64,
    pub percent_error: f64,
}

impl ErrorResult {
    /// Percentage error rounded for display
    pub fn percent_error_rounded(&self) -> f64 {
        round2(self.percent_error)
    }
}

/// One line of the forecast comparison table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub model: ModelKind,
    pub forecasted_price: f64,
    pub actual_price: f64,
    pub absolute_error: f64,
    /// Rounded to two decimals
    pub percent_error: f64,
}

/// Round half away from zero to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage error of `predicted` relative to `actual`
pub fn percent_error(actual: f64, predicted: f64) -> Result<f64> {
    if actual == 0.0 || !actual.is_finite() {
        return Err(EvalError::ComputationError(format!(
            "percentage error undefined for actual price {}",
            actual
        )));
    }
    Ok((predicted - actual).abs() / actual * 100.0)
}

/// Error of a single model against the record's actual price
pub fn model_error(record: &ForecastRecord, model: ModelKind) -> Result<ErrorResult> {
    let actual = record.actual_price();
    let predicted = model.prediction(record);

    Ok(ErrorResult {
        model,
        absolute_error: (predicted - actual).abs(),
        percent_error: percent_error(actual, predicted)?,
    })
}

/// Errors for both models, LSTM first
pub fn compute_errors(record: &ForecastRecord) -> Result<[ErrorResult; 2]> {
    Ok([
        model_error(record, ModelKind::Lstm)?,
        model_error(record, ModelKind::Arima)?,
    ])
}

/// The comparison table shown for a selected month
pub fn comparison_table(record: &ForecastRecord) -> Result<Vec<ComparisonRow>> {
    compute_errors(record).map(|errors| {
        errors
            .iter()
            .map(|e| ComparisonRow {
                model: e.model,
                forecasted_price: e.model.prediction(record),
                actual_price: record.actual_price(),
                absolute_error: e.absolute_error,
                percent_error: e.percent_error_rounded(),
            })
            .collect()
    })
}

/// Accuracy of one model across every record in the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelAccuracy {
    pub model: ModelKind,
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error
    pub mape: f64,
}

/// Whole-store accuracy summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreAccuracy {
    pub periods: usize,
    pub lstm: ModelAccuracy,
    pub arima: ModelAccuracy,
    /// Model with the lower MAPE, `None` on a tie
    pub better_model: Option<ModelKind>,
}

fn model_accuracy(store: &ForecastStore, model: ModelKind) -> Result<ModelAccuracy> {
    let n = store.len() as f64;
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut pct_sum = 0.0;

    for record in store.records() {
        let error = model_error(record, model)?;
        abs_sum += error.absolute_error;
        sq_sum += error.absolute_error.powi(2);
        pct_sum += error.percent_error;
    }

    Ok(ModelAccuracy {
        model,
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
        mape: pct_sum / n,
    })
}

/// Evaluate both models over the whole store
pub fn evaluate_store(store: &ForecastStore) -> Result<StoreAccuracy> {
    if store.is_empty() {
        return Err(EvalError::DataError(
            "cannot evaluate an empty forecast store".to_string(),
        ));
    }

    let lstm = model_accuracy(store, ModelKind::Lstm)?;
    let arima = model_accuracy(store, ModelKind::Arima)?;

    let better_model = if (lstm.mape - arima.mape).abs() < 1e-10 {
        None
    } else if lstm.mape < arima.mape {
        Some(ModelKind::Lstm)
    } else {
        Some(ModelKind::Arima)
    };

    Ok(StoreAccuracy {
        periods: store.len(),
        lstm,
        arima,
        better_model,
    })
}

impl fmt::Display for StoreAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Forecast Accuracy over {} periods:", self.periods)?;
        for acc in [&self.lstm, &self.arima] {
            writeln!(
                f,
                "  {:<6} MAE: {:.4}  RMSE: {:.4}  MAPE: {:.4}%",
                acc.model.name(),
                acc.mae,
                acc.rmse,
                acc.mape
            )?;
        }
        match self.better_model {
            Some(model) => writeln!(f, "  Lower MAPE: {}", model)?,
            None => writeln!(f, "  Lower MAPE: tie")?,
        }
        Ok(())
    }
}
