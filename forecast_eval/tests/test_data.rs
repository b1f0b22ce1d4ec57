use forecast_eval::data::DataLoader;
use forecast_eval::{EvalError, Period};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn period(s: &str) -> Period {
    s.parse().unwrap()
}

#[test]
fn test_data_loader_from_csv() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Prediction_Date,Actual_Price,Predicted_LSTM_Price,Predicted_ARIMA_Price").unwrap();
    writeln!(file, "2024-01-01,610.0,605.5,620.0").unwrap();
    writeln!(file, "2024-02-01,625.0,630.0,615.0").unwrap();
    writeln!(file, "2024-03-01,640.0,641.0,650.0").unwrap();

    let store = DataLoader::from_csv(file.path()).unwrap();

    assert_eq!(store.len(), 3);
    assert!(!store.is_empty());
    assert_eq!(store.dropped_rows(), 0);
    assert_eq!(
        store.periods(),
        vec![period("2024-01"), period("2024-02"), period("2024-03")]
    );
}

#[test]
fn test_incomplete_rows_are_dropped() {
    let csv = "\
Prediction_Date,Actual_Price,Predicted_LSTM_Price,Predicted_ARIMA_Price,Notes
2024-01-01,610.0,605.5,620.0,ok
2024-02-01,,630.0,615.0,missing actual
2024-03-01,640.0,,650.0,missing lstm
2024-04-01,655.0,660.0,,missing arima
2024-05-01,0,640.0,670.0,zero actual
not-a-date,700.0,690.0,710.0,bad date
2024-06-01,abc,690.0,710.0,bad number
2024-07-01 00:00:00,680.0,675.0,690.0,timestamp form
";

    let store = DataLoader::from_reader(csv.as_bytes()).unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.dropped_rows(), 6);
    assert_eq!(store.periods(), vec![period("2024-01"), period("2024-07")]);
}

#[test]
fn test_columns_may_appear_in_any_order() {
    let csv = "\
Predicted_ARIMA_Price,Prediction_Date,Predicted_LSTM_Price,Actual_Price
670.0,2024-05,640.0,650.0
";

    let store = DataLoader::from_reader(csv.as_bytes()).unwrap();
    let record = store.find(&period("2024-05")).unwrap();

    assert_eq!(record.actual_price(), 650.0);
    assert_eq!(record.predicted_lstm(), 640.0);
    assert_eq!(record.predicted_arima(), 670.0);
}

#[test]
fn test_data_loader_error_handling() {
    // Non-existent file
    let result = DataLoader::from_csv("nonexistent_file.csv");
    assert!(matches!(result, Err(EvalError::IoError(_))));

    // Missing required column
    let csv = "Prediction_Date,Actual_Price,Predicted_LSTM_Price\n2024-01-01,1.0,1.0\n";
    let result = DataLoader::from_reader(csv.as_bytes());
    match result {
        Err(EvalError::DataError(msg)) => assert!(msg.contains("Predicted_ARIMA_Price")),
        other => panic!("Expected DataError, got {:?}", other),
    }
}

#[test]
fn test_header_only_file_gives_empty_store() {
    let csv = "Prediction_Date,Actual_Price,Predicted_LSTM_Price,Predicted_ARIMA_Price\n";
    let store = DataLoader::from_reader(csv.as_bytes()).unwrap();

    assert!(store.is_empty());
    assert!(store.latest().is_none());
}

#[test]
fn test_bundled_sample_data() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../data/LSTM_ARIMA_ActualPrice.csv");
    let store = DataLoader::from_csv(path).unwrap();

    assert_eq!(store.len(), 24);
    assert_eq!(store.dropped_rows(), 0);
    assert_eq!(store.periods().first(), Some(&period("2022-07")));
    assert_eq!(store.latest().map(|r| r.period()), Some(period("2024-06")));
}
