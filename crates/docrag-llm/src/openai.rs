//! OpenAI-compatible `/chat/completions` (OpenAI, Ollama, vLLM, llama.cpp server).

use anyhow::{anyhow, bail, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use docrag_core::error::{Error as CoreError, Result as CoreResult};
use docrag_core::traits::Generator;
use docrag_core::types::GenerationRequest;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiGenerator {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    temperature: Option<f32>,
}

impl OpenAiGenerator {
    pub fn new(api_key: Option<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: super::http_client(timeout, "OpenAI")?,
            api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: None,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| anyhow!("invalid OpenAI API key header: {e}"))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn call(&self, request: &GenerationRequest) -> Result<String> {
        let body = chat_request(&self.model, request, self.temperature);
        tracing::debug!(model = %self.model, prompt_chars = request.prompt.len(), "calling chat completions");
        let response = self
            .client
            .post(self.endpoint())
            .headers(self.headers()?)
            .json(&body)
            .send()
            .map_err(|e| anyhow!("OpenAI request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("OpenAI request failed ({status}): {body}");
        }
        let parsed: ChatResponse =
            response.json().map_err(|e| anyhow!("failed to decode OpenAI response: {e}"))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| anyhow!("OpenAI response did not include any content"))
    }
}

impl Generator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    fn generate(&self, request: &GenerationRequest) -> CoreResult<String> {
        self.call(request).map_err(|e| CoreError::Generation(format!("{e:#}")))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

pub(crate) fn chat_request<'a>(
    model: &'a str,
    request: &'a GenerationRequest,
    temperature: Option<f32>,
) -> ChatRequest<'a> {
    let mut messages = Vec::with_capacity(2);
    if !request.system_instruction.trim().is_empty() {
        messages.push(ChatMessage { role: "system", content: &request.system_instruction });
    }
    messages.push(ChatMessage { role: "user", content: &request.prompt });
    ChatRequest { model, messages, temperature }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
