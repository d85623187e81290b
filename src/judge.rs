// src/judge.rs
//! Relevance judging: semantic match between one article and one
//! subscriber's preference model. The judge returns a short explanatory
//! summary for a match, or the not-relevant sentinel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::model::{Article, Subscriber};

/// Sentinel the model is instructed to emit for a non-match.
const NOT_RELEVANT_SENTINEL: &str = "NOT_RELEVANT";

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Short explanation of why the article matches, used as the mail body.
    Relevant(String),
    NotRelevant,
}

#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    async fn evaluate(&self, article: &Article, subscriber: &Subscriber) -> Result<Verdict>;
}

pub type DynJudge = Arc<dyn RelevanceJudge>;

/// OpenAI-backed judge. Requires `OPENAI_API_KEY`.
pub struct OpenAiJudge {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiJudge {
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

const JUDGE_SYS: &str = "You decide whether a news article matches a reader's interests. \
Compare meaning, not exact strings. If it matches, reply with ONE short sentence (<=200 chars) \
explaining why the reader will care. If it does not match, reply with exactly NOT_RELEVANT.";

fn render_prompt(article: &Article, subscriber: &Subscriber) -> String {
    let article_tags: Vec<String> = article
        .tags
        .iter()
        .map(|t| format!("{} ({:.2})", t.name, t.confidence))
        .collect();
    let reader_tags: Vec<String> = subscriber
        .tags
        .iter()
        .map(|t| format!("{} ({:.2})", t.name, t.confidence))
        .collect();

    // Content is truncated; the lede plus tags is enough signal for a
    // match/no-match call and keeps token spend flat.
    let content: String = article.content.chars().take(1_500).collect();
    format!(
        "Article title: {}\nArticle tags: {}\nArticle excerpt: {}\n\n\
         Reader interest tags: {}\nReader interests, in their own words: {}",
        article.title,
        article_tags.join(", "),
        content,
        reader_tags.join(", "),
        subscriber.interests_prompt,
    )
}

#[async_trait]
impl RelevanceJudge for OpenAiJudge {
    async fn evaluate(&self, article: &Article, subscriber: &Subscriber) -> Result<Verdict> {
        if self.api_key.is_empty() {
            return Err(PipelineError::Judge("OPENAI_API_KEY missing".into()));
        }

        let input = render_prompt(article, subscriber);
        let req = ChatReq {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: JUDGE_SYS,
                },
                Msg {
                    role: "user",
                    content: &input,
                },
            ],
            temperature: 0.2,
            max_tokens: 100,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| PipelineError::Judge(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(PipelineError::Judge(format!("status {}", resp.status())));
        }
        let body: ChatResp = resp
            .json()
            .await
            .map_err(|e| PipelineError::Judge(e.to_string()))?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.trim())
            .unwrap_or_default();

        if content.is_empty() || content.starts_with(NOT_RELEVANT_SENTINEL) {
            Ok(Verdict::NotRelevant)
        } else {
            Ok(Verdict::Relevant(content.to_string()))
        }
    }
}

/// Deterministic judge for tests: relevant whenever the article shares a
/// tag name with the subscriber.
pub struct TagOverlapJudge;

#[async_trait]
impl RelevanceJudge for TagOverlapJudge {
    async fn evaluate(&self, article: &Article, subscriber: &Subscriber) -> Result<Verdict> {
        let hit = article.tags.iter().find(|at| {
            subscriber
                .tags
                .iter()
                .any(|st| st.name.eq_ignore_ascii_case(&at.name))
        });
        Ok(match hit {
            Some(t) => Verdict::Relevant(format!("Covers {}, one of your topics.", t.name)),
            None => Verdict::NotRelevant,
        })
    }
}
