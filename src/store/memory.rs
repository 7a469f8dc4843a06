use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{RateLimitRecord, RecordStore, StoreError};
use crate::identity::IdentityToken;

// In-process record store, keyed by identity token
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, RateLimitRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, token: &IdentityToken) -> Result<Option<RateLimitRecord>, StoreError> {
        Ok(self.records.get(token.as_str()).map(|r| r.value().clone()))
    }

    async fn create(&self, record: &RateLimitRecord) -> Result<(), StoreError> {
        match self.records.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn replace(&self, record: &RateLimitRecord) -> Result<(), StoreError> {
        match self.records.get_mut(&record.id) {
            Some(mut existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, token: &IdentityToken) -> Result<(), StoreError> {
        self.records
            .remove(token.as_str())
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
