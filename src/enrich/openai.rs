//! OpenAI Chat Completions による説明文生成

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::EnrichError;
use crate::record::{Record, BESCHREIBUNG};
use crate::traits::Enricher;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_TOKENS: u32 = 400;

const SYSTEM_PROMPT: &str = "Du schreibst sachliche, ansprechende Exposé-Texte für \
Immobilienangebote auf Deutsch. Verwende nur die gegebenen Fakten, erfinde nichts. \
Höchstens 120 Wörter, keine Überschrift.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiEnricher {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiEnricher {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, EnrichError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| EnrichError::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// 抽出済みフィールドを箇条書きにしたユーザープロンプト
    fn user_prompt(record: &Record) -> String {
        let facts: Vec<String> = record
            .iter()
            .filter(|(name, _)| name.as_str() != BESCHREIBUNG)
            .map(|(name, value)| format!("- {}: {}", name, value))
            .collect();
        format!("Fakten zum Objekt:\n{}", facts.join("\n"))
    }
}

#[async_trait]
impl Enricher for OpenAiEnricher {
    async fn describe(&self, record: &Record) -> Result<String, EnrichError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::user_prompt(record),
                },
            ],
            temperature: 0.3,
            max_tokens: MAX_TOKENS,
        };

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                EnrichError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "OpenAI API error");
            return Err(EnrichError::Api(format!("status {}: {}", status, error_text)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| EnrichError::Parse(e.to_string()))?;

        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis(),
            "OpenAI chat completion"
        );

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| EnrichError::Api("empty completion".into()))
    }
}
