use std::fmt::Debug;

// Wall-clock epoch millis; records persist these, so not `Instant`
pub trait Clock: Send + Sync + Debug {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[cfg(test)]
pub use mock::MockClock;

#[cfg(test)]
mod mock {
    use super::Clock;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;

    // clones share the same time
    #[derive(Debug, Clone)]
    pub struct MockClock {
        now: Arc<AtomicI64>,
    }

    impl MockClock {
        pub fn new(start_millis: i64) -> Self {
            Self {
                now: Arc::new(AtomicI64::new(start_millis)),
            }
        }

        pub fn advance(&self, by: Duration) {
            self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
        }

        pub fn set(&self, millis: i64) {
            self.now.store(millis, Ordering::SeqCst);
        }
    }

    impl Clock for MockClock {
        fn now_millis(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }
    }
}
