//! # Steel Forecast Workspace
//!
//! Umbrella crate for the steel price forecast evaluation tools.
//!
//! - [`forecast_eval`]: forecast store, error metrics and trend extraction
//! - [`feedback_relay`]: expert feedback delivery with ordered fallback
//! - [`dashboard`]: HTTP service tying the two together
//!
//! ## Example
//!
//! ```
//! use steel_forecast_workspace::forecast_eval::metrics::compute_errors;
//! use steel_forecast_workspace::forecast_eval::{ForecastRecord, Period};
//!
//! let record = ForecastRecord::new(Period::new(2024, 5).unwrap(), 650.0, 640.0, 670.0).unwrap();
//! let [lstm, arima] = compute_errors(&record).unwrap();
//! assert_eq!(lstm.percent_error_rounded(), 1.54);
//! assert_eq!(arima.percent_error_rounded(), 3.08);
//! ```

pub use dashboard;
pub use feedback_relay;
pub use forecast_eval;
