use clap::{Parser, ValueEnum};
use std::time::Duration;
use thiserror::Error;

// Which record store backs the rate limiter
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    // In-process map, lost on restart
    Memory,
    // Azure Cosmos DB container
    Cosmos,
}

// CLI argument structure, every option can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "summary-gateway")]
#[command(about = "Text summarization gateway with per-IP rate limiting")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Rate limit record store
    #[arg(long, env = "RATE_LIMIT_STORE", value_enum, default_value_t = StoreKind::Memory)]
    pub store: StoreKind,

    // Azure OpenAI resource endpoint, e.g. https://my-resource.openai.azure.com
    #[arg(long, env = "AZURE_OPENAI_ENDPOINT")]
    pub openai_endpoint: Option<String>,

    #[arg(long, env = "AZURE_OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "AZURE_OPENAI_DEPLOYMENT_NAME")]
    pub openai_deployment: Option<String>,

    #[arg(long, env = "AZURE_OPENAI_API_VERSION", default_value = "2023-03-15-preview")]
    pub openai_api_version: String,

    // Upstream request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub upstream_timeout: u64,

    // Cosmos DB account endpoint, e.g. https://my-account.documents.azure.com
    #[arg(long, env = "COSMOS_DB_ENDPOINT")]
    pub cosmos_endpoint: Option<String>,

    // Base64 master key
    #[arg(long, env = "COSMOS_DB_KEY", hide_env_values = true)]
    pub cosmos_key: Option<String>,

    #[arg(long, env = "COSMOS_DB_DATABASE")]
    pub cosmos_database: Option<String>,

    #[arg(long, env = "COSMOS_DB_CONTAINER")]
    pub cosmos_container: Option<String>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("COSMOS_DB_KEY is not valid base64: {0}")]
    InvalidKey(#[from] base64::DecodeError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CosmosSettings {
    pub endpoint: String,
    pub key: String,
    pub database: String,
    pub container: String,
}

impl Args {
    pub fn openai(&self) -> Result<OpenAiSettings, ConfigError> {
        Ok(OpenAiSettings {
            endpoint: required(&self.openai_endpoint, "AZURE_OPENAI_ENDPOINT")?
                .trim_end_matches('/')
                .to_string(),
            api_key: required(&self.openai_api_key, "AZURE_OPENAI_API_KEY")?,
            deployment: required(&self.openai_deployment, "AZURE_OPENAI_DEPLOYMENT_NAME")?,
            api_version: self.openai_api_version.clone(),
            timeout: Duration::from_secs(self.upstream_timeout),
        })
    }

    pub fn cosmos(&self) -> Result<CosmosSettings, ConfigError> {
        Ok(CosmosSettings {
            endpoint: required(&self.cosmos_endpoint, "COSMOS_DB_ENDPOINT")?
                .trim_end_matches('/')
                .to_string(),
            key: required(&self.cosmos_key, "COSMOS_DB_KEY")?,
            database: required(&self.cosmos_database, "COSMOS_DB_DATABASE")?,
            container: required(&self.cosmos_container, "COSMOS_DB_CONTAINER")?,
        })
    }
}

// Blank values count as missing
fn required(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::Missing(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["summary-gateway"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn openai_settings_require_all_three_values() {
        let args = parse(&[
            "--openai-endpoint",
            "https://example.openai.azure.com/",
            "--openai-api-key",
            "secret",
        ]);
        match args.openai() {
            Err(ConfigError::Missing(name)) => assert_eq!(name, "AZURE_OPENAI_DEPLOYMENT_NAME"),
            other => panic!("expected missing deployment, got {other:?}"),
        }
    }

    #[test]
    fn openai_endpoint_loses_trailing_slash() {
        let args = parse(&[
            "--openai-endpoint",
            "https://example.openai.azure.com/",
            "--openai-api-key",
            "secret",
            "--openai-deployment",
            "gpt",
        ]);
        let settings = args.openai().unwrap();
        assert_eq!(settings.endpoint, "https://example.openai.azure.com");
        assert_eq!(settings.api_version, "2023-03-15-preview");
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }

    #[test]
    fn blank_cosmos_value_is_missing() {
        let args = parse(&[
            "--store",
            "cosmos",
            "--cosmos-endpoint",
            "https://acct.documents.azure.com",
            "--cosmos-key",
            "  ",
        ]);
        assert_eq!(args.store, StoreKind::Cosmos);
        assert!(matches!(args.cosmos(), Err(ConfigError::Missing("COSMOS_DB_KEY"))));
    }
}
