use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::Json;
use dashboard::assistant::{AssistantError, ChatAssistant};
use dashboard::routes::{
    self, ChatRequest, FeedbackRequest, TrendParams, SESSION_HEADER,
};
use dashboard::session::SessionRegistry;
use dashboard::{ApiError, AppState};
use feedback_relay::{
    DeliveryChannel, DeliveryError, DispatchOutcome, FeedbackDispatcher, FeedbackPayload,
    SessionId, TrustedModel,
};
use forecast_eval::{DataLoader, ModelKind, Period};
use axum::body::Body;
use axum::http::{header, Request};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

const FORECAST_CSV: &str = "\
Prediction_Date,Actual_Price,Predicted_LSTM_Price,Predicted_ARIMA_Price
2024-01-01,600.0,606.0,590.0
2024-02-01,610.0,615.0,600.0
2024-03-01,,620.0,615.0
2024-04-01,630.0,628.0,640.0
2024-05-01,650.0,640.0,670.0
";

#[derive(Clone, Default)]
struct RecordingChannel {
    fail: bool,
    calls: Arc<Mutex<Vec<FeedbackPayload>>>,
}

#[async_trait]
impl DeliveryChannel for RecordingChannel {
    fn name(&self) -> &str {
        if self.fail {
            "spreadsheet"
        } else {
            "email"
        }
    }

    async fn deliver(&self, payload: &FeedbackPayload) -> feedback_relay::Result<()> {
        self.calls.lock().unwrap().push(payload.clone());
        if self.fail {
            Err(DeliveryError::NotFound("spreadsheet 'Steel Forecast Feedback'".to_string()))
        } else {
            Ok(())
        }
    }
}

struct CannedAssistant;

#[async_trait]
impl ChatAssistant for CannedAssistant {
    async fn ask(&self, question: &str) -> Result<String, AssistantError> {
        if question.contains("slow") {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if question.contains("fail") {
            Err(AssistantError::Api {
                status: 503,
                body: "overloaded".to_string(),
            })
        } else {
            Ok(format!("Answer to: {}", question))
        }
    }
}

struct Harness {
    state: AppState,
    primary: RecordingChannel,
    fallback: RecordingChannel,
}

fn harness() -> Harness {
    let store = DataLoader::from_reader(FORECAST_CSV.as_bytes()).unwrap();
    let primary = RecordingChannel {
        fail: true,
        ..Default::default()
    };
    let fallback = RecordingChannel::default();
    let dispatcher = FeedbackDispatcher::default()
        .with_channel(primary.clone())
        .with_channel(fallback.clone());

    let state = AppState::new(
        store,
        dispatcher,
        Arc::new(CannedAssistant),
        SessionRegistry::new(Duration::from_secs(600)),
        3,
    );

    Harness {
        state,
        primary,
        fallback,
    }
}

fn headers_for(id: SessionId) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(SESSION_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
    headers
}

fn session_of<T>(response: &([(&'static str, String); 1], Json<T>)) -> SessionId {
    response.0[0].1.parse().unwrap()
}

fn period(s: &str) -> Period {
    s.parse().unwrap()
}

#[tokio::test]
async fn test_periods_skip_incomplete_rows() {
    let h = harness();
    let Json(body) = routes::periods(State(h.state.clone())).await;

    assert_eq!(
        body.periods,
        vec![period("2024-01"), period("2024-02"), period("2024-04"), period("2024-05")]
    );
    assert_eq!(body.default, Some(period("2024-01")));
    assert_eq!(body.trusted_model_options.len(), 4);

    let described: Vec<ModelKind> = body.model_descriptions.iter().map(|d| d.model).collect();
    assert_eq!(described, vec![ModelKind::Lstm, ModelKind::Arima]);
    assert!(body.model_descriptions[1].description.contains("AutoRegressive"));
}

#[tokio::test]
async fn test_comparison_for_selected_month() {
    let h = harness();
    let response = routes::comparison(
        State(h.state.clone()),
        HeaderMap::new(),
        Path("2024-05".to_string()),
    )
    .await
    .unwrap();

    let id = session_of(&response);
    let Json(body) = response.1;
    assert_eq!(body.period, period("2024-05"));
    assert_eq!(body.rows[0].model, ModelKind::Lstm);
    assert_eq!(body.rows[0].absolute_error, 10.0);
    assert_eq!(body.rows[0].percent_error, 1.54);
    assert_eq!(body.rows[1].model, ModelKind::Arima);
    assert_eq!(body.rows[1].percent_error, 3.08);

    let selected = h.state.sessions.inspect(id, |s| s.selected_period).unwrap();
    assert_eq!(selected, Some(period("2024-05")));
}

#[tokio::test]
async fn test_comparison_errors() {
    let h = harness();

    let missing = routes::comparison(
        State(h.state.clone()),
        HeaderMap::new(),
        Path("2024-03".to_string()),
    )
    .await
    .unwrap_err();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let malformed = routes::comparison(
        State(h.state.clone()),
        HeaderMap::new(),
        Path("May".to_string()),
    )
    .await
    .unwrap_err();
    assert!(matches!(malformed, ApiError::BadRequest(_)));

    let mut bad_header = HeaderMap::new();
    bad_header.insert(SESSION_HEADER, HeaderValue::from_static("not-a-uuid"));
    let rejected = routes::comparison(
        State(h.state.clone()),
        bad_header,
        Path("2024-05".to_string()),
    )
    .await
    .unwrap_err();
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_trend_highlights_session_selection() {
    let h = harness();
    let selected = routes::comparison(
        State(h.state.clone()),
        HeaderMap::new(),
        Path("2024-04".to_string()),
    )
    .await
    .unwrap();
    let id = session_of(&selected);

    let response = routes::trend(
        State(h.state.clone()),
        headers_for(id),
        Query(TrendParams::default()),
    )
    .await
    .unwrap();
    let Json(body) = response.1;

    assert_eq!(body.window, 3);
    assert_eq!(body.labels, vec!["2024-02", "2024-04", "2024-05"]);
    assert_eq!(body.labels.len(), body.points.len());
    let highlighted: Vec<_> = body.points.iter().filter(|p| p.highlighted).collect();
    assert_eq!(highlighted.len(), 1);
    assert_eq!(highlighted[0].period, period("2024-04"));
}

#[tokio::test]
async fn test_trend_highlight_outside_window() {
    let h = harness();
    let response = routes::trend(
        State(h.state.clone()),
        HeaderMap::new(),
        Query(TrendParams {
            highlight: Some("2024-01".to_string()),
        }),
    )
    .await
    .unwrap();

    assert!(response.1 .0.points.iter().all(|p| !p.highlighted));
}

#[tokio::test]
async fn test_summary() {
    let h = harness();
    let Json(summary) = routes::summary(State(h.state.clone())).await.unwrap();
    assert_eq!(summary.periods, 4);
}

#[tokio::test]
async fn test_feedback_falls_back_to_email() {
    let h = harness();
    let selected = routes::comparison(
        State(h.state.clone()),
        HeaderMap::new(),
        Path("2024-05".to_string()),
    )
    .await
    .unwrap();
    let id = session_of(&selected);

    let response = routes::submit_feedback(
        State(h.state.clone()),
        headers_for(id),
        Ok(Json(FeedbackRequest {
            period: None,
            trusted_model: TrustedModel::Arima,
            confidence: Some(85),
            comment: "ARIMA closer on the spike".to_string(),
        })),
    )
    .await
    .unwrap();
    let Json(body) = response.1;

    assert_eq!(
        body.outcome,
        DispatchOutcome::DeliveredFallback {
            channel: "email".to_string()
        }
    );
    assert!(body.message.contains("e-mail"));
    assert_eq!(h.primary.calls.lock().unwrap().len(), 1);

    let delivered = h.fallback.calls.lock().unwrap().clone();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].session_id, id);
    assert_eq!(delivered[0].selected_period, period("2024-05"));
    assert_eq!(delivered[0].trusted_model, TrustedModel::Arima);
    assert_eq!(delivered[0].confidence, 85);
    assert_eq!(delivered[0].comment, "ARIMA closer on the spike");

    let trusted = h.state.sessions.inspect(id, |s| s.trusted_model).unwrap();
    assert_eq!(trusted, Some(TrustedModel::Arima));
}

#[tokio::test]
async fn test_feedback_validation() {
    let h = harness();

    let no_period = routes::submit_feedback(
        State(h.state.clone()),
        HeaderMap::new(),
        Ok(Json(FeedbackRequest {
            period: None,
            trusted_model: TrustedModel::Lstm,
            confidence: None,
            comment: String::new(),
        })),
    )
    .await
    .unwrap_err();
    assert_eq!(no_period.status(), StatusCode::BAD_REQUEST);

    let too_confident = routes::submit_feedback(
        State(h.state.clone()),
        HeaderMap::new(),
        Ok(Json(FeedbackRequest {
            period: Some("2024-05".to_string()),
            trusted_model: TrustedModel::Lstm,
            confidence: Some(150),
            comment: String::new(),
        })),
    )
    .await
    .unwrap_err();
    assert_eq!(too_confident.status(), StatusCode::BAD_REQUEST);

    let unknown_month = routes::submit_feedback(
        State(h.state.clone()),
        HeaderMap::new(),
        Ok(Json(FeedbackRequest {
            period: Some("2019-01".to_string()),
            trusted_model: TrustedModel::Neither,
            confidence: None,
            comment: String::new(),
        })),
    )
    .await
    .unwrap_err();
    assert_eq!(unknown_month.status(), StatusCode::NOT_FOUND);

    assert!(h.primary.calls.lock().unwrap().is_empty());
    assert!(h.fallback.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_records_history_and_survives_failures() {
    let h = harness();

    let first = routes::ask(
        State(h.state.clone()),
        HeaderMap::new(),
        Ok(Json(ChatRequest {
            question: "What does ARIMA assume?".to_string(),
        })),
    )
    .await
    .unwrap();
    let id = session_of(&first);
    let Json(body) = first.1;
    assert_eq!(body.answer.as_deref(), Some("Answer to: What does ARIMA assume?"));
    assert!(body.error.is_none());
    assert_eq!(body.history_len, 1);

    let failed = routes::ask(
        State(h.state.clone()),
        headers_for(id),
        Ok(Json(ChatRequest {
            question: "please fail".to_string(),
        })),
    )
    .await
    .unwrap();
    let Json(body) = failed.1;
    assert!(body.answer.is_none());
    assert!(body.error.unwrap().contains("overloaded"));
    assert_eq!(body.history_len, 1);

    let Json(history) = routes::chat_history(State(h.state.clone()), Path(id.to_string()))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].question, "What does ARIMA assume?");

    let pending = h
        .state
        .sessions
        .inspect(id, |s| s.pending_question().is_none())
        .unwrap();
    assert!(pending);
}

#[tokio::test]
async fn test_empty_question_rejected() {
    let h = harness();
    let err = routes::ask(
        State(h.state.clone()),
        HeaderMap::new(),
        Ok(Json(ChatRequest {
            question: "   ".to_string(),
        })),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_end_session() {
    let h = harness();
    let (id, _) = h.state.sessions.with_session(None, |_| ());

    let status = routes::end_session(State(h.state.clone()), Path(id.to_string()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let again = routes::end_session(State(h.state.clone()), Path(id.to_string()))
        .await
        .unwrap_err();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);

    let history = routes::chat_history(State(h.state.clone()), Path(id.to_string()))
        .await
        .unwrap_err();
    assert_eq!(history.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let Json(body) = routes::health().await;
    assert_eq!(body["status"], "alive");
}

#[test]
fn test_router_builds() {
    let h = harness();
    let _router = dashboard::router(h.state, None);
}

#[tokio::test]
async fn test_abandoned_question_releases_session() {
    let h = harness();
    let (id, _) = h.state.sessions.with_session(None, |_| ());

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        routes::ask(
            State(h.state.clone()),
            headers_for(id),
            Ok(Json(ChatRequest {
                question: "a slow one".to_string(),
            })),
        ),
    )
    .await;
    assert!(abandoned.is_err());

    let retried = routes::ask(
        State(h.state.clone()),
        headers_for(id),
        Ok(Json(ChatRequest {
            question: "Is the session still usable?".to_string(),
        })),
    )
    .await
    .unwrap();
    let Json(body) = retried.1;
    assert_eq!(
        body.answer.as_deref(),
        Some("Answer to: Is the session still usable?")
    );
    assert_eq!(body.history_len, 1);
}

async fn post_json(state: AppState, uri: &str, body: &'static str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = dashboard::router(state, None).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_malformed_feedback_body_is_a_json_400() {
    let h = harness();

    let (status, body) = post_json(
        h.state.clone(),
        "/api/v1/feedback",
        r#"{"period":"2024-05","trusted_model":"LSTM","confidence":300}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("invalid request"));

    let (status, _) = post_json(
        h.state.clone(),
        "/api/v1/feedback",
        r#"{"period":"2024-05","trusted_model":"Maybe"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json(
        h.state.clone(),
        "/api/v1/feedback",
        r#"{"period":"2024-05","trusted_model":"LSTM","confidence":101}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("confidence"));

    assert!(h.primary.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_chat_body_is_a_json_400() {
    let h = harness();
    let (status, body) = post_json(h.state.clone(), "/api/v1/chat", "{\"question\":").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_feedback_through_router() {
    let h = harness();
    let (status, body) = post_json(
        h.state.clone(),
        "/api/v1/feedback",
        r#"{"period":"2024-05","trusted_model":"Both equally","confidence":70}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["status"], "delivered_fallback");
    assert_eq!(body["outcome"]["channel"], "email");
}
