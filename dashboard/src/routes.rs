//! API route handlers

use crate::error::ApiError;
use crate::session::ChatExchange;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use feedback_relay::{DispatchOutcome, FeedbackPayload, SessionId, TrustedModel, DEFAULT_CONFIDENCE};
use forecast_eval::metrics::{comparison_table, evaluate_store};
use forecast_eval::trend::{extract_trend, trend_labels};
use forecast_eval::{ComparisonRow, ModelKind, Period, StoreAccuracy, TrendPoint};
use serde::{Deserialize, Serialize};

/// Header carrying the session identifier in both directions
pub const SESSION_HEADER: &str = "x-session-id";

/// Response body paired with the session header
pub type WithSession<T> = ([(&'static str, String); 1], Json<T>);

fn with_session<T>(id: SessionId, body: T) -> WithSession<T> {
    ([(SESSION_HEADER, id.to_string())], Json(body))
}

/// Session id from the request header, `None` when absent
pub fn session_from_headers(headers: &HeaderMap) -> Result<Option<SessionId>, ApiError> {
    match headers.get(SESSION_HEADER) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("malformed {} header", SESSION_HEADER))),
    }
}

fn parse_session_path(raw: &str) -> Result<SessionId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("malformed session id '{}'", raw)))
}

fn parse_period(raw: &str) -> Result<Period, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid period '{}'", raw)))
}

/// Liveness probe
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Debug, Serialize)]
pub struct ModelDescription {
    pub model: ModelKind,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PeriodsResponse {
    pub periods: Vec<Period>,
    /// Month preselected in the picker
    pub default: Option<Period>,
    pub trusted_model_options: Vec<TrustedModel>,
    pub model_descriptions: Vec<ModelDescription>,
}

pub async fn periods(State(state): State<AppState>) -> Json<PeriodsResponse> {
    let periods = state.store.periods();
    Json(PeriodsResponse {
        default: periods.first().copied(),
        periods,
        trusted_model_options: TrustedModel::ALL.to_vec(),
        model_descriptions: ModelKind::ALL
            .iter()
            .map(|&model| ModelDescription {
                model,
                description: model.description(),
            })
            .collect(),
    })
}

#[derive(Debug, Serialize)]
pub struct ComparisonResponse {
    pub period: Period,
    pub rows: Vec<ComparisonRow>,
}

/// Forecast comparison table for one month
pub async fn comparison(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_period): Path<String>,
) -> Result<WithSession<ComparisonResponse>, ApiError> {
    let session = session_from_headers(&headers)?;
    let period = parse_period(&raw_period)?;
    let record = state
        .store
        .find(&period)
        .ok_or_else(|| ApiError::NotFound(format!("no forecast for {}", period)))?;
    let rows = comparison_table(record)?;

    let (id, _) = state
        .sessions
        .with_session(session, |s| s.selected_period = Some(period));

    Ok(with_session(id, ComparisonResponse { period, rows }))
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendParams {
    pub highlight: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrendResponse {
    pub window: usize,
    /// Chart axis labels, one per point
    pub labels: Vec<String>,
    pub points: Vec<TrendPoint>,
}

/// Rolling trend; highlights the requested month, or the session's selection
pub async fn trend(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<TrendParams>,
) -> Result<WithSession<TrendResponse>, ApiError> {
    let session = session_from_headers(&headers)?;
    let requested = params.highlight.as_deref().map(parse_period).transpose()?;

    let (id, selected) = state.sessions.with_session(session, |s| s.selected_period);
    let highlight = requested.or(selected);
    let points = extract_trend(&state.store, state.trend_window, highlight.as_ref())?;

    Ok(with_session(
        id,
        TrendResponse {
            window: state.trend_window,
            labels: trend_labels(&points),
            points,
        },
    ))
}

/// Accuracy of both models over the whole store
pub async fn summary(State(state): State<AppState>) -> Result<Json<StoreAccuracy>, ApiError> {
    Ok(Json(evaluate_store(&state.store)?))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    /// Defaults to the month selected in this session
    pub period: Option<String>,
    pub trusted_model: TrustedModel,
    pub confidence: Option<u8>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub outcome: DispatchOutcome,
    pub message: String,
}

/// Record feedback through the dispatcher. Delivery failures are reported in
/// the body, not as an HTTP error.
pub async fn submit_feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<WithSession<FeedbackResponse>, ApiError> {
    let session = session_from_headers(&headers)?;
    let Json(request) = body?;
    let requested = request.period.as_deref().map(parse_period).transpose()?;

    let (id, selected) = state.sessions.with_session(session, |s| {
        s.trusted_model = Some(request.trusted_model);
        s.selected_period
    });

    let period = requested
        .or(selected)
        .ok_or_else(|| ApiError::BadRequest("no prediction month selected".to_string()))?;
    if state.store.find(&period).is_none() {
        return Err(ApiError::NotFound(format!("no forecast for {}", period)));
    }

    let payload = FeedbackPayload::new(
        id,
        period,
        request.trusted_model,
        request.confidence.unwrap_or(DEFAULT_CONFIDENCE),
        request.comment,
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let outcome = state.dispatcher.dispatch(&payload).await;
    let message = outcome.user_message();

    Ok(with_session(id, FeedbackResponse { outcome, message }))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: Option<String>,
    /// Transient error shown inline; the session is unaffected
    pub error: Option<String>,
    pub history_len: usize,
}

/// Ask the assistant one question
pub async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<WithSession<ChatResponse>, ApiError> {
    let session = session_from_headers(&headers)?;
    let Json(request) = body?;
    let question = request.question.trim().to_string();
    if question.is_empty() {
        return Err(ApiError::BadRequest("question is empty".to_string()));
    }

    // The guard releases the session if this future is dropped mid-call
    let (id, pending) = state.sessions.begin_question(session, &question);
    let Some(pending) = pending else {
        return Err(ApiError::BadRequest(
            "a question is already being answered".to_string(),
        ));
    };

    let result = state.assistant.ask(&question).await;

    let (answer, error) = match result {
        Ok(answer) => (Some(answer), None),
        Err(e) => {
            tracing::warn!(session = %id, error = %e, "chat request failed");
            (None, Some(format!("The assistant is unavailable right now: {}", e)))
        }
    };

    let history_len = pending.finish(answer.clone());

    Ok(with_session(
        id,
        ChatResponse {
            answer,
            error,
            history_len,
        },
    ))
}

/// Chat history of a session, oldest first
pub async fn chat_history(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Vec<ChatExchange>>, ApiError> {
    let id = parse_session_path(&raw_id)?;
    state
        .sessions
        .inspect(id, |s| s.chat_history().to_vec())
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("session {}", id)))
}

/// End a session and drop its state
pub async fn end_session(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_session_path(&raw_id)?;
    if state.sessions.end(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("session {}", id)))
    }
}
