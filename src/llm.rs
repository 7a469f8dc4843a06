// Outbound summarization calls against an Azure OpenAI chat deployment

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ConfigError, OpenAiSettings};

const TEMPERATURE: f32 = 0.3;
const STOP_SEQUENCE: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStyle {
    Prose,
    Bullets,
}

impl SummaryStyle {
    fn system_prompt(self) -> &'static str {
        match self {
            SummaryStyle::Prose => "You are an assistant that summarizes text.",
            SummaryStyle::Bullets => {
                "You are an assistant that summarizes text into bullet points."
            }
        }
    }

    fn user_prompt(self, text: &str) -> String {
        let instructions = match self {
            SummaryStyle::Prose => {
                "Write a concise, accurate summary of the text below. Use only information \
                 found in the text and keep it shorter than the original. Do not ask questions, \
                 add new information or repeat content. Finish the summary with a complete sentence."
            }
            SummaryStyle::Bullets => {
                "Summarize the text below as concise bullet points. Each bullet point must be a \
                 single complete sentence or phrase taken strictly from the text. Do not add \
                 information or opinions, and do not break a bullet point across lines."
            }
        };
        format!("{instructions}\n\n\"{text}\"")
    }
}

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Api(String),

    #[error("response contained no completion")]
    EmptyCompletion,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        style: SummaryStyle,
        text: &str,
        max_tokens: u32,
    ) -> Result<String, UpstreamError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stop: [&'a str; 1],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub struct AzureOpenAi {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl AzureOpenAi {
    pub fn new(settings: OpenAiSettings) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            client,
            url: completions_url(&settings),
            api_key: settings.api_key,
        })
    }
}

fn completions_url(settings: &OpenAiSettings) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        settings.endpoint, settings.deployment, settings.api_version
    )
}

fn chat_request(style: SummaryStyle, text: &str, max_tokens: u32) -> ChatRequest<'static> {
    ChatRequest {
        messages: vec![
            ChatMessage {
                role: "system",
                content: style.system_prompt().to_string(),
            },
            ChatMessage {
                role: "user",
                content: style.user_prompt(text),
            },
        ],
        max_tokens,
        temperature: TEMPERATURE,
        stop: [STOP_SEQUENCE],
    }
}

// Prefer the service's own error message, fall back to the raw body
fn api_error(status: StatusCode, body: &str) -> UpstreamError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }
        });
    UpstreamError::Api(message)
}

fn first_completion(response: ChatResponse) -> Result<String, UpstreamError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .ok_or(UpstreamError::EmptyCompletion)
}

#[async_trait]
impl Summarizer for AzureOpenAi {
    async fn summarize(
        &self,
        style: SummaryStyle,
        text: &str,
        max_tokens: u32,
    ) -> Result<String, UpstreamError> {
        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&chat_request(style, text, max_tokens))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = api_error(status, &body);
            warn!(?style, %status, error = %err, "Summarization request rejected");
            return Err(err);
        }

        let completion = first_completion(response.json::<ChatResponse>().await?)?;
        debug!(?style, chars = completion.len(), "Received completion");
        Ok(completion)
    }
}
