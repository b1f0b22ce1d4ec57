//! # Forecast Eval
//!
//! Evaluation of precomputed LSTM and ARIMA price forecasts against actual prices.
//!
//! ## Features
//!
//! - Forecast store loaded once from a CSV export, with incomplete rows filtered out
//! - Per-month absolute and percentage error for each model
//! - Rolling trend series with an optional highlighted month
//! - Whole-store accuracy summary (MAE, RMSE, MAPE)
//!
//! ## Quick Start
//!
//! ```no_run
//! use forecast_eval::data::DataLoader;
//! use forecast_eval::metrics::comparison_table;
//! use forecast_eval::trend::{extract_trend, DEFAULT_TREND_WINDOW};
//! use forecast_eval::Period;
//!
//! let store = DataLoader::from_csv("LSTM_ARIMA_ActualPrice.csv")?;
//!
//! let selected: Period = "2024-05".parse()?;
//! if let Some(record) = store.find(&selected) {
//!     for row in comparison_table(record)? {
//!         println!("{}: {:.2}%", row.model, row.percent_error);
//!     }
//! }
//!
//! let trend = extract_trend(&store, DEFAULT_TREND_WINDOW, Some(&selected))?;
//! # Ok::<(), forecast_eval::EvalError>(())
//! ```

pub mod data;
pub mod error;
pub mod metrics;
pub mod period;
pub mod trend;

// Re-export commonly used types
pub use crate::data::{DataLoader, ForecastRecord, ForecastStore};
pub use crate::error::EvalError;
pub use crate::metrics::{ComparisonRow, ErrorResult, ModelKind, StoreAccuracy};
pub use crate::period::Period;
pub use crate::trend::{TrendPoint, DEFAULT_TREND_WINDOW};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
