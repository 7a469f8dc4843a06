// Azure Cosmos DB document store over the REST API. Documents are keyed and
// partitioned by the identity token.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use sha2::Sha256;
use tracing::debug;

use super::{RateLimitRecord, RecordStore, StoreError};
use crate::config::{ConfigError, CosmosSettings};
use crate::identity::IdentityToken;

const API_VERSION: &str = "2018-12-31";

// Characters left alone by JavaScript's encodeURIComponent
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

type HmacSha256 = Hmac<Sha256>;

pub struct CosmosStore {
    client: reqwest::Client,
    endpoint: String,
    // "dbs/{db}/colls/{container}"
    collection_link: String,
    key: Vec<u8>,
}

impl CosmosStore {
    pub fn new(client: reqwest::Client, settings: CosmosSettings) -> Result<Self, ConfigError> {
        let key = STANDARD.decode(settings.key.trim())?;
        Ok(Self {
            client,
            endpoint: settings.endpoint,
            collection_link: format!("dbs/{}/colls/{}", settings.database, settings.container),
            key,
        })
    }

    fn document_link(&self, token: &str) -> String {
        format!("{}/docs/{}", self.collection_link, token)
    }

    fn request(
        &self,
        method: Method,
        resource_link: &str,
        url_path: &str,
        partition_key: &str,
    ) -> Result<RequestBuilder, StoreError> {
        let date = http_date(chrono::Utc::now());
        let authorization = self.auth_token(method.as_str(), "docs", resource_link, &date)?;
        let partition = serde_json::to_string(&[partition_key])?;

        Ok(self
            .client
            .request(method, format!("{}/{}", self.endpoint, url_path))
            .header("authorization", authorization)
            .header("x-ms-date", date)
            .header("x-ms-version", API_VERSION)
            .header("x-ms-documentdb-partitionkey", partition))
    }

    // Master key token: HMAC-SHA256 over verb, resource type, link and date
    fn auth_token(
        &self,
        verb: &str,
        resource_type: &str,
        resource_link: &str,
        date: &str,
    ) -> Result<String, StoreError> {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            verb.to_lowercase(),
            resource_type.to_lowercase(),
            resource_link,
            date.to_lowercase()
        );
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| StoreError::Backend(format!("invalid signing key: {e}")))?;
        mac.update(payload.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());
        let token = format!("type=master&ver=1.0&sig={signature}");
        Ok(utf8_percent_encode(&token, URI_COMPONENT).to_string())
    }
}

fn http_date(now: chrono::DateTime<chrono::Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

async fn read_document(response: Response) -> Result<Option<RateLimitRecord>, StoreError> {
    match check_status(response).await {
        Ok(response) => {
            let body = response.bytes().await?;
            Ok(Some(serde_json::from_slice(&body)?))
        }
        Err(StoreError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(StoreError::NotFound),
        StatusCode::CONFLICT => Err(StoreError::Conflict),
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::Backend(format!("{status}: {body}")))
        }
    }
}

#[async_trait]
impl RecordStore for CosmosStore {
    async fn get(&self, token: &IdentityToken) -> Result<Option<RateLimitRecord>, StoreError> {
        let link = self.document_link(token.as_str());
        let response = self
            .request(Method::GET, &link, &link, token.as_str())?
            .send()
            .await?;

        read_document(response).await
    }

    async fn create(&self, record: &RateLimitRecord) -> Result<(), StoreError> {
        let url_path = format!("{}/docs", self.collection_link);
        let response = self
            .request(Method::POST, &self.collection_link, &url_path, &record.ip)?
            .json(record)
            .send()
            .await?;
        check_status(response).await?;
        debug!(id = %record.id, "created rate limit document");
        Ok(())
    }

    async fn replace(&self, record: &RateLimitRecord) -> Result<(), StoreError> {
        let link = self.document_link(&record.id);
        let response = self
            .request(Method::PUT, &link, &link, &record.ip)?
            .json(record)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn delete(&self, token: &IdentityToken) -> Result<(), StoreError> {
        let link = self.document_link(token.as_str());
        let response = self
            .request(Method::DELETE, &link, &link, token.as_str())?
            .send()
            .await?;
        check_status(response).await?;
        debug!(id = %token, "deleted rate limit document");
        Ok(())
    }
}
