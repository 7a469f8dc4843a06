mod erase;
mod health;
mod metrics;
mod summarize;

pub use erase::delete_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use summarize::summarize_handler;

use axum::{
    Router,
    http::{HeaderMap, HeaderValue, header},
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::identity::UNKNOWN_CLIENT;
use crate::state::AppState;

const CONTENT_SECURITY_POLICY: &str =
    "default-src 'self'; img-src 'self' data:; script-src 'self' 'unsafe-inline' 'unsafe-eval';";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/summarize", post(summarize_handler))
        .route("/delete", delete(delete_handler))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .with_state(state)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

// First hop of X-Forwarded-For, then X-Real-IP, else "unknown"
pub fn client_ip(headers: &HeaderMap) -> String {
    header_value(headers, "x-forwarded-for")
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| header_value(headers, "x-real-ip"))
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
