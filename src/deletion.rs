use std::sync::Arc;
use tracing::{error, info};

use crate::identity::hash_identity;
use crate::metrics::DELETIONS;
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOutcome {
    Deleted,
    // nothing stored for this client, not a failure
    NotFound,
}

impl DeletionOutcome {
    fn label(&self) -> &'static str {
        match self {
            DeletionOutcome::Deleted => "deleted",
            DeletionOutcome::NotFound => "not_found",
        }
    }
}

pub struct DeletionHandler {
    store: Arc<dyn RecordStore>,
}

impl DeletionHandler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn delete(&self, ip: &str) -> Result<DeletionOutcome, StoreError> {
        let token = hash_identity(ip);

        let outcome = match self.store.delete(&token).await {
            Ok(()) => DeletionOutcome::Deleted,
            Err(StoreError::NotFound) => DeletionOutcome::NotFound,
            Err(e) => {
                DELETIONS.with_label_values(&["error"]).inc();
                error!(error = %e, "Error deleting data");
                return Err(e);
            }
        };

        DELETIONS.with_label_values(&[outcome.label()]).inc();
        info!(id = %token, outcome = outcome.label(), "Processed data deletion request");
        Ok(outcome)
    }
}
