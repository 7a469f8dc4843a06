// One record per identity token, re-read on every request

mod cosmos;
mod memory;

pub use cosmos::CosmosStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::IdentityToken;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRecord {
    pub id: String,
    // partition key, same value as `id`
    pub ip: String,
    pub request_count_minute: u32,
    pub request_count_hour: u32,
    // epoch millis
    pub last_request_time: i64,
}

impl RateLimitRecord {
    pub fn first_request(token: &IdentityToken, now_millis: i64) -> Self {
        Self {
            id: token.to_string(),
            ip: token.to_string(),
            request_count_minute: 1,
            request_count_hour: 1,
            last_request_time: now_millis,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Entity with the specified id does not exist")]
    NotFound,

    #[error("Entity with the specified id already exists")]
    Conflict,

    #[error("store request failed: {0}")]
    Backend(String),

    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, token: &IdentityToken) -> Result<Option<RateLimitRecord>, StoreError>;

    // Conflict if a record already exists
    async fn create(&self, record: &RateLimitRecord) -> Result<(), StoreError>;

    // replace and delete fail with NotFound when there is no record
    async fn replace(&self, record: &RateLimitRecord) -> Result<(), StoreError>;

    async fn delete(&self, token: &IdentityToken) -> Result<(), StoreError>;
}

#[cfg(test)]
pub use testing::FailingStore;

#[cfg(test)]
mod testing {
    use super::*;

    // Every call fails with a backend error
    #[derive(Debug, Default)]
    pub struct FailingStore;

    #[async_trait]
    impl RecordStore for FailingStore {
        async fn get(&self, _: &IdentityToken) -> Result<Option<RateLimitRecord>, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn create(&self, _: &RateLimitRecord) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn replace(&self, _: &RateLimitRecord) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn delete(&self, _: &IdentityToken) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
    }
}
