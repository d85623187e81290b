// src/classify.rs
//! Topic classification over an external model. Backends are tried in the
//! configured order, first success wins, and total failure degrades to an
//! empty tag set — classification must never halt the pipeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::model::Tag;

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, title: &str, text: &str) -> Result<Vec<Tag>>;
    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynClassifier = Arc<dyn Classifier>;

/// Build the ordered backend list from config names. Unknown names are
/// skipped with a warning rather than refusing to boot.
pub fn build_backends(names: &[String]) -> Vec<DynClassifier> {
    let mut out: Vec<DynClassifier> = Vec::new();
    for n in names {
        match n.as_str() {
            "openai" => out.push(Arc::new(OpenAiClassifier::new(None))),
            "disabled" => out.push(Arc::new(DisabledClassifier)),
            other => tracing::warn!(backend = other, "unknown classifier backend, skipping"),
        }
    }
    out
}

/// Try each backend in order; first success wins. All-fail is an empty set,
/// logged and counted but never an error.
pub async fn classify_with_fallback(
    backends: &[DynClassifier],
    title: &str,
    text: &str,
) -> Vec<Tag> {
    for backend in backends {
        match backend.classify(title, text).await {
            Ok(tags) => return tags,
            Err(e) => {
                tracing::warn!(backend = backend.name(), error = %e, "classifier backend failed");
                counter!("classify_errors_total").increment(1);
            }
        }
    }
    Vec::new()
}

/// OpenAI chat-completions backend. Requires `OPENAI_API_KEY`.
pub struct OpenAiClassifier {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiClassifier {
    /// `model_override`: pass Some("gpt-4o") to override; defaults to gpt-4o-mini.
    pub fn new(model_override: Option<&str>) -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("threatwire/0.1 (feed watcher)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: model_override.unwrap_or("gpt-4o-mini").to_string(),
        }
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}
#[derive(Serialize)]
struct ChatReq<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}
#[derive(Deserialize)]
struct ChatResp {
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

const CLASSIFY_SYS: &str = "You label security news articles with topic tags. \
Return ONLY a JSON array of objects {\"name\": string, \"confidence\": number in [0,1]}, \
at most 6 tags, lowercase names, no prose.";

/// Model replies sometimes wrap the JSON in a markdown code fence; accept both.
fn parse_tag_json(content: &str) -> Option<Vec<Tag>> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    serde_json::from_str::<Vec<Tag>>(trimmed).ok()
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(&self, title: &str, text: &str) -> Result<Vec<Tag>> {
        let err = |reason: String| PipelineError::Classification {
            backend: "openai".to_string(),
            reason,
        };

        if self.api_key.is_empty() {
            return Err(err("OPENAI_API_KEY missing".into()));
        }

        let input = format!("Title: {title}\n\n{text}");
        let req = ChatReq {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: CLASSIFY_SYS,
                },
                Msg {
                    role: "user",
                    content: &input,
                },
            ],
            temperature: 0.2,
            max_tokens: 200,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| err(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(err(format!("status {}", resp.status())));
        }
        let body: ChatResp = resp.json().await.map_err(|e| err(e.to_string()))?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();

        parse_tag_json(content).ok_or_else(|| err("unparseable tag json".into()))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Always fails; used to exercise the fallback policy and as a stand-in
/// when no backend is configured.
pub struct DisabledClassifier;

#[async_trait]
impl Classifier for DisabledClassifier {
    async fn classify(&self, _title: &str, _text: &str) -> Result<Vec<Tag>> {
        Err(PipelineError::Classification {
            backend: "disabled".to_string(),
            reason: "classifier disabled".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic backend for tests and local runs.
#[derive(Clone)]
pub struct MockClassifier {
    pub fixed: Vec<Tag>,
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, _title: &str, _text: &str) -> Result<Vec<Tag>> {
        Ok(self.fixed.clone())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
