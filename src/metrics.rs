use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Histogram, register_counter, register_counter_vec, register_histogram,
};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("summary_requests_total", "Total number of summarize requests").unwrap();
    pub static ref RATE_LIMITED: CounterVec = register_counter_vec!(
        "summary_rate_limited_total",
        "Requests rejected by the rate limiter",
        &["window"]
    )
    .unwrap();
    pub static ref STORE_FAILURES: Counter = register_counter!(
        "summary_rate_limit_store_failures_total",
        "Rate limit checks that failed open on a store error"
    )
    .unwrap();
    pub static ref DELETIONS: CounterVec = register_counter_vec!(
        "summary_deletions_total",
        "Data deletion requests by outcome",
        &["outcome"]
    )
    .unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "summary_upstream_latency_seconds",
        "Latency of the paired summarization calls in seconds"
    )
    .unwrap();
}
