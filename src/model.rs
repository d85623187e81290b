// src/model.rs
//! Core records: Article, Tag, Subscriber.
//!
//! Tags have accumulated three on-disk shapes over the life of the data files:
//! a bare string, a `{name|tag, confidence}` object, and a categorical
//! "high"/"low" label in place of the number. Everything is normalized to the
//! canonical `{name, confidence in [0,1]}` form at deserialization, so the
//! rest of the crate only ever sees the numeric model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confidence assigned to a bare-string tag with no score attached.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;
/// Categorical label conversions, kept explicit rather than assumed.
pub const CONFIDENCE_HIGH: f32 = 0.85;
pub const CONFIDENCE_LOW: f32 = 0.2;

/// A named topic with a confidence score, attached to an article or to a
/// subscriber's preference model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub name: String,
    pub confidence: f32,
}

impl Tag {
    pub fn new(name: impl Into<String>, confidence: f32) -> Self {
        Self {
            name: name.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

// Legacy ingress shapes. `alias = "tag"` covers the oldest object form.
#[derive(Deserialize)]
#[serde(untagged)]
enum TagRepr {
    Full {
        #[serde(alias = "tag")]
        name: String,
        confidence: ConfidenceRepr,
    },
    Bare(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfidenceRepr {
    Number(f32),
    Label(String),
}

impl ConfidenceRepr {
    fn to_f32(&self) -> f32 {
        match self {
            ConfidenceRepr::Number(n) => n.clamp(0.0, 1.0),
            ConfidenceRepr::Label(s) => match s.to_ascii_lowercase().as_str() {
                "high" => CONFIDENCE_HIGH,
                "low" => CONFIDENCE_LOW,
                _ => DEFAULT_CONFIDENCE,
            },
        }
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let repr = TagRepr::deserialize(deserializer)?;
        Ok(match repr {
            TagRepr::Full { name, confidence } => Tag::new(name, confidence.to_f32()),
            TagRepr::Bare(name) => Tag::new(name, DEFAULT_CONFIDENCE),
        })
    }
}

/// Normalize a freshly deserialized tag list in place: clamp scores and drop
/// empty names. Deserialization already maps legacy shapes, this is the
/// belt for values arriving through code paths (e.g. profile updates).
pub fn normalize_tags(tags: &mut Vec<Tag>) {
    tags.retain(|t| !t.name.trim().is_empty());
    for t in tags.iter_mut() {
        t.name = t.name.trim().to_string();
        t.confidence = t.confidence.clamp(0.0, 1.0);
    }
}

/// One ingested feed item with extracted content and topic tags.
/// Immutable once stored; `content`/`tags` may stay empty after a
/// per-item extraction or classification failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub scraped_at: DateTime<Utc>,
}

/// A person with a persisted interest profile, eligible for notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub email: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub interests_prompt: String,
    #[serde(default)]
    pub otp: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub last_online: Option<DateTime<Utc>>,
}

impl Subscriber {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            tags: Vec::new(),
            interests_prompt: String::new(),
            otp: None,
            token: None,
            last_online: None,
        }
    }

    /// A subscriber who declared no interests at all is never notified.
    pub fn has_preferences(&self) -> bool {
        !self.tags.is_empty() || !self.interests_prompt.trim().is_empty()
    }
}

/// Explicit feedback on a delivered or browsed article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interaction {
    Like,
    Dislike,
}
