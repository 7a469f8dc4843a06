use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::client_ip;
use crate::error::AppError;
use crate::llm::SummaryStyle;
use crate::metrics::{RATE_LIMITED, REQUEST_TOTAL, UPSTREAM_LATENCY};
use crate::models::{SummarizeRequest, SummarizeResponse};
use crate::state::AppState;
use crate::summary::{clean_summary, split_bullets, token_budget, validate_input};

pub async fn summarize_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummarizeResponse>, AppError> {
    REQUEST_TOTAL.inc();

    // rate limit before looking at the body
    let decision = state.rate_limiter.check(&client_ip(&headers)).await;
    if !decision.is_admitted() {
        let (window, err) = if !decision.per_minute {
            ("minute", AppError::TooManyPerMinute)
        } else {
            ("hour", AppError::TooManyPerHour)
        };
        RATE_LIMITED.with_label_values(&[window]).inc();
        warn!(window, "Rate limit exceeded");
        return Err(err);
    }

    let Json(payload) = payload.map_err(|e| {
        warn!(error = %e, "Rejected malformed summarize body");
        AppError::MalformedPayload
    })?;
    let text = validate_input(payload.text.as_deref())?;
    info!(chars = text.chars().count(), "Received text");

    let max_tokens = token_budget(text);
    let start_time = Instant::now();

    let (summary, bullets) = tokio::try_join!(
        state.summarizer.summarize(SummaryStyle::Prose, text, max_tokens),
        state.summarizer.summarize(SummaryStyle::Bullets, text, max_tokens),
    )
    .map_err(|e| {
        error!(error = %e, "Summarization failed");
        e
    })?;

    UPSTREAM_LATENCY.observe(start_time.elapsed().as_secs_f64());

    Ok(Json(SummarizeResponse {
        summary: clean_summary(&summary, text),
        bullet_points: split_bullets(&bullets),
    }))
}
