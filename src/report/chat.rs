use std::time::Duration;

use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::report::{ReportGenerator, ReportRequest};

const REQUEST_TIMEOUT_SECS: u64 = 60;

const SYSTEM_PROMPT: &str = "\
You are a professional cryptocurrency trading strategist. Using the live price \
and indicator snapshot you are given, write a strategy report in Markdown with \
exactly these sections, separated by two blank lines:

# Crypto Trading Strategy Report

## Long Strategy
### 1. Entry price range
### 2. Take-profit targets (TP1, TP2) with expected return and probability
### 3. Stop loss and risk
### 4. Expected return and risk/reward ratio
### 5. Technical rationale (at least two indicators)

## Short Strategy
### 1. Entry price range
### 2. Take-profit targets (TP1, TP2) with expected return and probability
### 3. Stop loss and risk
### 4. Expected return and risk/reward ratio
### 5. Technical rationale (at least two indicators)

## Recommendation
Compare both strategies and recommend one, in at least two sentences.

Leave one blank line between numbered subsections.";

/// OpenAI-compatible chat-completion client.
pub struct ChatCompletionReporter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl ChatCompletionReporter {
    /// Reads the API key from the environment variable named in `config`.
    pub fn from_config(config: &ReportConfig) -> Result<Self, Report<ReportError>> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Report::new(ReportError::MissingApiKey {
                    env: config.api_key_env.clone(),
                })
            })?;
        Self::new(config, api_key)
    }

    pub fn new(config: &ReportConfig, api_key: String) -> Result<Self, Report<ReportError>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .change_context(ReportError::Request)?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn body<'a>(&'a self, user_prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

impl ReportGenerator for ChatCompletionReporter {
    fn generate<'a>(
        &'a self,
        request: &'a ReportRequest,
    ) -> BoxFuture<'a, Result<String, Report<ReportError>>> {
        Box::pin(async move {
            let prompt = request.prompt();
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&self.body(&prompt))
                .send()
                .await
                .change_context(ReportError::Request)?;

            if !response.status().is_success() {
                return Err(Report::new(ReportError::Request)
                    .attach(format!("HTTP status: {}", response.status())));
            }

            let completion: ChatResponse = response
                .json()
                .await
                .change_context(ReportError::ResponseParse)?;

            let text = completion.into_text()?;
            info!(
                symbol = %request.symbol,
                model = %self.model,
                chars = text.len(),
                "strategy report generated"
            );
            Ok(text)
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> Result<String, Report<ReportError>> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                Report::new(ReportError::ResponseParse).attach("response has no message content")
            })
    }
}
