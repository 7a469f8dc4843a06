use std::sync::Arc;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::{Args, ConfigError, StoreKind};
use crate::deletion::DeletionHandler;
use crate::llm::{AzureOpenAi, Summarizer};
use crate::rate_limit::RateLimiter;
use crate::store::{CosmosStore, MemoryStore, RecordStore};

// app's shared state, built once at startup
pub struct AppState {
    pub rate_limiter: RateLimiter,
    pub deletion: DeletionHandler,
    pub summarizer: Arc<dyn Summarizer>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Arc<Self> {
        Arc::new(Self {
            rate_limiter: RateLimiter::new(store.clone(), clock),
            deletion: DeletionHandler::new(store),
            summarizer,
        })
    }

    // Fails if a required endpoint or credential is missing
    pub fn from_args(args: &Args) -> Result<Arc<Self>, ConfigError> {
        let summarizer = Arc::new(AzureOpenAi::new(args.openai()?)?);

        let store: Arc<dyn RecordStore> = match args.store {
            StoreKind::Memory => {
                info!("Using in-memory rate limit store");
                Arc::new(MemoryStore::new())
            }
            StoreKind::Cosmos => {
                let settings = args.cosmos()?;
                info!(
                    database = %settings.database,
                    container = %settings.container,
                    "Using Cosmos DB rate limit store"
                );
                Arc::new(CosmosStore::new(reqwest::Client::new(), settings)?)
            }
        };

        Ok(Self::new(store, Arc::new(SystemClock), summarizer))
    }
}
