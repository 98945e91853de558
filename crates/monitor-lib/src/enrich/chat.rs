//! OpenAI-compatible chat completion enricher
//!
//! Works against any `/chat/completions` endpoint, including Ollama's
//! `/v1` compatibility layer.

use super::InsightEnricher;
use crate::error::{MonitorError, Result};
use crate::models::{EnrichedFinding, Finding};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

const SYSTEM_PROMPT: &str = "You are a performance engineer applying Brendan Gregg's USE Method \
(Utilization, Saturation, Errors). Given one finding from an automated resource check, explain \
the likely cause in two or three sentences and suggest what to inspect next. Do not restate the \
numbers and do not change the severity.";

/// Chat completion endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Base URL up to and including the API version, e.g. `http://localhost:11434/v1`
    pub url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434/v1".to_string(),
            model: "minimax-m2:cloud".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            timeout_secs: 120,
            api_key: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Enricher backed by a chat completion model
pub struct ChatCompletionEnricher {
    client: Client,
    endpoint: Url,
    config: ChatConfig,
}

impl ChatCompletionEnricher {
    pub fn new(config: ChatConfig) -> Result<Self> {
        let base = format!("{}/", config.url.trim_end_matches('/'));
        let endpoint = Url::parse(&base)
            .and_then(|url| url.join("chat/completions"))
            .map_err(|e| {
                MonitorError::Configuration(format!("invalid enricher URL '{}': {}", config.url, e))
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MonitorError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn user_prompt(finding: &Finding) -> String {
        let evidence: Vec<String> = finding
            .evidence
            .iter()
            .map(|(signal, value)| match value {
                Some(v) => format!("{}={:.2}", signal, v),
                None => format!("{}=absent", signal),
            })
            .collect();

        format!(
            "Component: {}\nSeverity: {}\nTitle: {}\nObservation: {}\nEvidence: {}\nRule-based hint: {}",
            finding.component,
            finding.severity,
            finding.title,
            finding.observation,
            evidence.join(", "),
            finding.root_cause_hint
        )
    }
}

#[async_trait]
impl InsightEnricher for ChatCompletionEnricher {
    async fn enrich(&self, finding: &Finding) -> Result<EnrichedFinding> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Self::user_prompt(finding),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        let mut builder = self.client.post(self.endpoint.clone()).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| MonitorError::Enrichment(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::Enrichment(format!("API error ({}): {}", status, body)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| MonitorError::Enrichment(format!("unreadable response: {}", e)))?;

        let narrative = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| MonitorError::Enrichment("empty completion".to_string()))?;

        debug!(finding = %finding.id, chars = narrative.len(), "Finding enriched");

        Ok(EnrichedFinding {
            finding: finding.clone(),
            narrative,
            enricher: self.config.model.clone(),
        })
    }

    fn name(&self) -> &str {
        "chat_completion"
    }
}
