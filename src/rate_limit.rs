// Per-identity sliding window rate limiting. Counts reset on time elapsed
// since the last counted request; records idle for a day are dropped on access.

use std::sync::Arc;
use tracing::{error, info};

use crate::clock::Clock;
use crate::identity::{IdentityToken, hash_identity};
use crate::metrics::STORE_FAILURES;
use crate::store::{RateLimitRecord, RecordStore, StoreError};

pub const MAX_REQUESTS_PER_MINUTE: u32 = 5;
pub const MAX_REQUESTS_PER_HOUR: u32 = 80;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const RETENTION_MS: i64 = 24 * HOUR_MS;

// Admission per window, both true lets the request through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub per_minute: bool,
    pub per_hour: bool,
}

impl RateLimitDecision {
    pub const ADMIT: Self = Self {
        per_minute: true,
        per_hour: true,
    };

    pub fn is_admitted(&self) -> bool {
        self.per_minute && self.per_hour
    }
}

pub struct RateLimiter {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    // Denied requests are still counted; store failures admit the request
    pub async fn check(&self, ip: &str) -> RateLimitDecision {
        let token = hash_identity(ip);
        match self.check_token(&token).await {
            Ok(decision) => decision,
            Err(e) => {
                STORE_FAILURES.inc();
                error!(error = %e, "Error checking rate limit, allowing request");
                RateLimitDecision::ADMIT
            }
        }
    }

    async fn check_token(&self, token: &IdentityToken) -> Result<RateLimitDecision, StoreError> {
        let now = self.clock.now_millis();

        let Some(mut record) = self.store.get(token).await? else {
            self.store
                .create(&RateLimitRecord::first_request(token, now))
                .await?;
            return Ok(RateLimitDecision::ADMIT);
        };

        let elapsed = now.saturating_sub(record.last_request_time);

        // expired record? drop it, this request starts over uncounted
        if elapsed > RETENTION_MS {
            self.store.delete(token).await?;
            info!(id = %token, "Removed stale rate limit record");
            return Ok(RateLimitDecision::ADMIT);
        }

        record.request_count_minute = if elapsed <= MINUTE_MS {
            record.request_count_minute.saturating_add(1)
        } else {
            1
        };
        record.request_count_hour = if elapsed <= HOUR_MS {
            record.request_count_hour.saturating_add(1)
        } else {
            1
        };
        record.last_request_time = record.last_request_time.max(now);

        self.store.replace(&record).await?;

        Ok(RateLimitDecision {
            per_minute: record.request_count_minute <= MAX_REQUESTS_PER_MINUTE,
            per_hour: record.request_count_hour <= MAX_REQUESTS_PER_HOUR,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::store::{FailingStore, MemoryStore};
    use std::time::Duration;

    const START: i64 = 1_700_000_000_000;

    fn limiter() -> (RateLimiter, Arc<MemoryStore>, MockClock) {
        let store = Arc::new(MemoryStore::new());
        let clock = MockClock::new(START);
        let limiter = RateLimiter::new(store.clone(), Arc::new(clock.clone()));
        (limiter, store, clock)
    }

    async fn record_for(store: &MemoryStore, ip: &str) -> Option<RateLimitRecord> {
        store.get(&hash_identity(ip)).await.unwrap()
    }

    #[tokio::test]
    async fn first_request_creates_record() {
        let (limiter, store, _) = limiter();

        assert_eq!(limiter.check("1.2.3.4").await, RateLimitDecision::ADMIT);

        let record = record_for(&store, "1.2.3.4").await.unwrap();
        assert_eq!(record.request_count_minute, 1);
        assert_eq!(record.request_count_hour, 1);
        assert_eq!(record.last_request_time, START);
        assert_eq!(record.id, hash_identity("1.2.3.4").as_str());
    }

    #[tokio::test]
    async fn sixth_request_within_a_minute_is_denied() {
        let (limiter, _, clock) = limiter();

        for _ in 0..5 {
            assert!(limiter.check("1.2.3.4").await.is_admitted());
            clock.advance(Duration::from_secs(2));
        }

        clock.advance(Duration::from_secs(5));
        let decision = limiter.check("1.2.3.4").await;
        assert!(!decision.per_minute);
        assert!(decision.per_hour);
    }

    #[tokio::test]
    async fn denied_requests_are_still_counted() {
        let (limiter, store, clock) = limiter();

        for _ in 0..7 {
            limiter.check("1.2.3.4").await;
            clock.advance(Duration::from_secs(1));
        }

        let record = record_for(&store, "1.2.3.4").await.unwrap();
        assert_eq!(record.request_count_minute, 7);
        assert_eq!(record.request_count_hour, 7);
    }

    #[tokio::test]
    async fn minute_count_resets_after_a_minute_of_quiet() {
        let (limiter, store, clock) = limiter();

        for _ in 0..4 {
            limiter.check("1.2.3.4").await;
        }
        clock.advance(Duration::from_secs(61));
        assert!(limiter.check("1.2.3.4").await.is_admitted());

        let record = record_for(&store, "1.2.3.4").await.unwrap();
        assert_eq!(record.request_count_minute, 1);
        assert_eq!(record.request_count_hour, 5);
        assert_eq!(record.last_request_time, START + 61_000);
    }

    #[tokio::test]
    async fn gap_of_exactly_a_minute_still_counts() {
        let (limiter, store, clock) = limiter();

        limiter.check("1.2.3.4").await;
        clock.advance(Duration::from_secs(60));
        limiter.check("1.2.3.4").await;

        let record = record_for(&store, "1.2.3.4").await.unwrap();
        assert_eq!(record.request_count_minute, 2);
    }

    #[tokio::test]
    async fn eighty_first_request_within_the_hour_is_denied() {
        let (limiter, _, clock) = limiter();

        // spaced past the minute window so only the hour counter accumulates
        for n in 1..=80 {
            let decision = limiter.check("1.2.3.4").await;
            assert!(decision.is_admitted(), "request {n} should be admitted");
            clock.advance(Duration::from_secs(61));
        }

        let decision = limiter.check("1.2.3.4").await;
        assert!(decision.per_minute);
        assert!(!decision.per_hour);
    }

    #[tokio::test]
    async fn hour_count_resets_after_an_hour_of_quiet() {
        let (limiter, store, clock) = limiter();

        for _ in 0..10 {
            limiter.check("1.2.3.4").await;
        }
        clock.advance(Duration::from_secs(3601));
        limiter.check("1.2.3.4").await;

        let record = record_for(&store, "1.2.3.4").await.unwrap();
        assert_eq!(record.request_count_minute, 1);
        assert_eq!(record.request_count_hour, 1);
    }

    #[tokio::test]
    async fn stale_record_is_removed_and_request_admitted() {
        let (limiter, store, clock) = limiter();

        for _ in 0..10 {
            limiter.check("1.2.3.4").await;
        }
        clock.advance(Duration::from_secs(25 * 60 * 60));

        assert_eq!(limiter.check("1.2.3.4").await, RateLimitDecision::ADMIT);
        assert_eq!(record_for(&store, "1.2.3.4").await, None);

        // the next request is treated as a brand new identity
        assert_eq!(limiter.check("1.2.3.4").await, RateLimitDecision::ADMIT);
        let record = record_for(&store, "1.2.3.4").await.unwrap();
        assert_eq!(record.request_count_minute, 1);
        assert_eq!(record.request_count_hour, 1);
    }

    #[tokio::test]
    async fn identities_are_independent() {
        let (limiter, _, _) = limiter();

        for _ in 0..6 {
            limiter.check("1.2.3.4").await;
        }
        assert!(!limiter.check("1.2.3.4").await.per_minute);
        assert!(limiter.check("5.6.7.8").await.is_admitted());
    }

    #[tokio::test]
    async fn clock_going_backwards_keeps_last_request_time() {
        let (limiter, store, clock) = limiter();

        limiter.check("1.2.3.4").await;
        clock.set(START - 5_000);
        limiter.check("1.2.3.4").await;

        let record = record_for(&store, "1.2.3.4").await.unwrap();
        assert_eq!(record.last_request_time, START);
        assert_eq!(record.request_count_minute, 2);
    }

    #[tokio::test]
    async fn corrupt_timestamps_do_not_panic() {
        let (limiter, store, _) = limiter();
        let token = hash_identity("1.2.3.4");
        let mut record = RateLimitRecord::first_request(&token, i64::MIN);
        store.create(&record).await.unwrap();

        // a timestamp from the far past reads as stale
        assert_eq!(limiter.check("1.2.3.4").await, RateLimitDecision::ADMIT);
        assert_eq!(record_for(&store, "1.2.3.4").await, None);

        record.last_request_time = i64::MAX;
        store.create(&record).await.unwrap();

        // one from the far future counts within both windows
        assert_eq!(limiter.check("1.2.3.4").await, RateLimitDecision::ADMIT);
        let stored = record_for(&store, "1.2.3.4").await.unwrap();
        assert_eq!(stored.request_count_minute, 2);
        assert_eq!(stored.last_request_time, i64::MAX);
    }

    #[tokio::test]
    async fn store_errors_fail_open() {
        let limiter = RateLimiter::new(Arc::new(FailingStore), Arc::new(MockClock::new(START)));

        for _ in 0..10 {
            assert_eq!(limiter.check("1.2.3.4").await, RateLimitDecision::ADMIT);
        }
    }
}
