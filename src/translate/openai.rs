//! OpenAI-compatible chat completions backend.

use super::{classify_status, LanguageModel, Prompt, DEFAULT_REQUEST_TIMEOUT};
use crate::error::{Result, SubtransError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default API base; any OpenAI-compatible server can be used instead.
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Chat completions client.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: build_client(DEFAULT_REQUEST_TIMEOUT),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: OPENAI_API_BASE.to_string(),
        }
    }

    /// Set a different model (e.g., "gpt-4o").
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at another OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn post(&self, request: &ChatRequest<'_>) -> Result<ChatResponse> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("OpenAI API response status: {}", status);

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(classify_status("OpenAI", status, &message));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Deserialize, Debug)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            response_format: Some(ResponseFormat {
                r#type: "json_object",
            }),
            max_tokens: None,
        };

        let response = self.post(&request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| SubtransError::Reply("OpenAI reply had no content".to_string()))
    }

    async fn check_connection(&self) -> Result<()> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            response_format: None,
            max_tokens: Some(1),
        };

        self.post(&request).await.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
