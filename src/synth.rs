//! Answer synthesis: provider abstraction plus the extractive fallback.
//! Synthesis may fail at any time (quota, outage, timeout); callers route
//! every failure to the fallback path, never to the user as a hard error.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("synthesis backend unavailable")]
    Unavailable,
    #[error("synthesis quota exceeded")]
    QuotaExceeded,
    #[error("synthesis request timed out")]
    Timeout,
}

#[async_trait::async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, question: &str, context: &str) -> Result<String, SynthError>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynSynthesizer = std::sync::Arc<dyn Synthesizer>;

/// Factory: mock in test mode, OpenAI when a key is configured, otherwise
/// disabled (everything degrades to the extractive fallback).
pub fn build_synthesizer() -> DynSynthesizer {
    if std::env::var("SYNTH_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return std::sync::Arc::new(MockSynthesizer {
            fixed: "Mock answer.".to_string(),
        });
    }
    if std::env::var("OPENAI_API_KEY").map(|v| !v.is_empty()).unwrap_or(false) {
        let model = std::env::var("SYNTH_MODEL").ok();
        return std::sync::Arc::new(OpenAiSynthesizer::new(model.as_deref()));
    }
    std::sync::Arc::new(DisabledSynthesizer)
}

/// OpenAI chat-completions provider. Requires `OPENAI_API_KEY`.
pub struct OpenAiSynthesizer {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiSynthesizer {
    /// `model_override`: pass Some("gpt-4o-mini") to override; defaults to gpt-4o-mini.
    pub fn new(model_override: Option<&str>) -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("newsflow/0.1 (+github.com/lumlich/newsflow)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        let model = model_override.unwrap_or("gpt-4o-mini").to_string();
        Self {
            http,
            api_key,
            model,
        }
    }
}

#[async_trait::async_trait]
impl Synthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, question: &str, context: &str) -> Result<String, SynthError> {
        if self.api_key.is_empty() {
            return Err(SynthError::Unavailable);
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let sys = "You answer questions using ONLY the provided news items. \
                   Be concise (2-3 sentences). If the items do not cover the \
                   question, say so.";
        let user = format!("Question: {question}\n\nNews items:\n{context}");
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: sys,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.2,
            max_tokens: 300,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SynthError::Timeout
                } else {
                    SynthError::Unavailable
                }
            })?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SynthError::QuotaExceeded);
        }
        if !resp.status().is_success() {
            return Err(SynthError::Unavailable);
        }

        let body: Resp = resp.json().await.map_err(|_| SynthError::Unavailable)?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(SynthError::Unavailable);
        }
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Always `Unavailable`; forces the extractive fallback.
pub struct DisabledSynthesizer;

#[async_trait::async_trait]
impl Synthesizer for DisabledSynthesizer {
    async fn synthesize(&self, _question: &str, _context: &str) -> Result<String, SynthError> {
        Err(SynthError::Unavailable)
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed-answer provider for tests and local runs.
#[derive(Clone)]
pub struct MockSynthesizer {
    pub fixed: String,
}

#[async_trait::async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&self, _question: &str, _context: &str) -> Result<String, SynthError> {
        Ok(self.fixed.clone())
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

/// First-N-sentences fallback summarization.
pub fn extractive_summary(text: &str, max_sentences: usize) -> String {
    text.split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(max_sentences.max(1))
        .collect::<Vec<_>>()
        .join(". ")
}

/// Per-item summary used by the enrichment worker: real synthesis when the
/// provider cooperates, extractive fallback otherwise.
pub async fn summarize_item(synth: &dyn Synthesizer, text: &str) -> String {
    match synth
        .synthesize("Summarize this news article in 2-3 sentences.", text)
        .await
    {
        Ok(s) if !s.trim().is_empty() => s,
        _ => extractive_summary(text, 3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extractive_takes_first_sentences() {
        let text = "One. Two. Three. Four.";
        assert_eq!(extractive_summary(text, 3), "One. Two. Three");
        assert_eq!(extractive_summary(text, 1), "One");
        assert_eq!(extractive_summary("", 3), "");
    }

    #[tokio::test]
    async fn summarize_item_falls_back_when_disabled() {
        let out = summarize_item(&DisabledSynthesizer, "Alpha. Beta. Gamma. Delta.").await;
        assert_eq!(out, "Alpha. Beta. Gamma");
    }

    #[tokio::test]
    async fn summarize_item_uses_provider_when_available() {
        let mock = MockSynthesizer {
            fixed: "Short take.".into(),
        };
        let out = summarize_item(&mock, "Alpha. Beta.").await;
        assert_eq!(out, "Short take.");
    }
}
