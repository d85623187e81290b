// src/reinforce.rs
//! Preference reinforcement: like/dislike feedback nudges the subscriber's
//! tag-confidence model. Like adds 0.1 (capped at 1.0) or adopts the
//! article tag outright; dislike subtracts 0.2 and evicts the tag once its
//! confidence falls to 0.1 or below.

use std::sync::Arc;

use crate::error::Result;
use crate::model::{Interaction, Subscriber, Tag};
use crate::store::SubscriberStore;

const LIKE_STEP: f32 = 0.1;
const DISLIKE_STEP: f32 = 0.2;
const EVICTION_THRESHOLD: f32 = 0.1;
const PROFILE_DEFAULT_CONFIDENCE: f32 = 0.5;

/// Apply one feedback action to a subscriber's tag model, in place.
/// Pure so the arithmetic is testable without a store.
pub fn apply_feedback(tags: &mut Vec<Tag>, article_tags: &[Tag], action: Interaction) {
    for at in article_tags {
        let existing = tags
            .iter()
            .position(|t| t.name.eq_ignore_ascii_case(&at.name));
        match (action, existing) {
            (Interaction::Like, Some(i)) => {
                tags[i].confidence = (tags[i].confidence + LIKE_STEP).min(1.0);
            }
            (Interaction::Like, None) => {
                tags.push(Tag::new(at.name.clone(), at.confidence));
            }
            (Interaction::Dislike, Some(i)) => {
                tags[i].confidence -= DISLIKE_STEP;
                if tags[i].confidence <= EVICTION_THRESHOLD {
                    tags.remove(i);
                }
            }
            (Interaction::Dislike, None) => {}
        }
    }
}

/// Merge explicit tag names into an existing model: new names enter at the
/// default confidence, names already present are left untouched.
pub fn merge_explicit_tags(tags: &mut Vec<Tag>, explicit: &[String]) {
    for name in explicit {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        if !tags.iter().any(|t| t.name.eq_ignore_ascii_case(name)) {
            tags.push(Tag::new(name, PROFILE_DEFAULT_CONFIDENCE));
        }
    }
}

pub struct PreferenceReinforcer {
    subscribers: Arc<SubscriberStore>,
}

impl PreferenceReinforcer {
    pub fn new(subscribers: Arc<SubscriberStore>) -> Self {
        Self { subscribers }
    }

    /// Returns false (not an error) when the token resolves to nobody.
    pub async fn reinforce(
        &self,
        token: &str,
        article_tags: &[Tag],
        action: Interaction,
    ) -> Result<bool> {
        self.subscribers
            .mutate(|subs| match find_by_token(subs, token) {
                Some(sub) => {
                    apply_feedback(&mut sub.tags, article_tags, action);
                    true
                }
                None => false,
            })
            .await
    }

    /// Merge explicit tags, replace the free-text prompt verbatim, persist.
    /// Unknown token means no update.
    pub async fn update_profile(
        &self,
        token: &str,
        explicit_tags: &[String],
        interests_prompt: &str,
    ) -> Result<bool> {
        self.subscribers
            .mutate(|subs| match find_by_token(subs, token) {
                Some(sub) => {
                    merge_explicit_tags(&mut sub.tags, explicit_tags);
                    sub.interests_prompt = interests_prompt.to_string();
                    true
                }
                None => false,
            })
            .await
    }
}

fn find_by_token<'a>(subs: &'a mut [Subscriber], token: &str) -> Option<&'a mut Subscriber> {
    subs.iter_mut()
        .find(|s| s.token.as_deref() == Some(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_on_existing_tag_adds_a_tenth() {
        let mut tags = vec![Tag::new("ai", 0.6)];
        apply_feedback(&mut tags, &[Tag::new("ai", 0.9)], Interaction::Like);
        assert_eq!(tags.len(), 1);
        assert!((tags[0].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn like_clamps_at_one() {
        let mut tags = vec![Tag::new("ai", 0.97)];
        apply_feedback(&mut tags, &[Tag::new("ai", 0.9)], Interaction::Like);
        assert!((tags[0].confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn like_adopts_unknown_tag_at_article_confidence() {
        let mut tags = Vec::new();
        apply_feedback(&mut tags, &[Tag::new("iot", 0.8)], Interaction::Like);
        assert_eq!(tags, vec![Tag::new("iot", 0.8)]);
    }

    #[test]
    fn dislike_decrements_by_a_fifth() {
        let mut tags = vec![Tag::new("ai", 0.6)];
        apply_feedback(&mut tags, &[Tag::new("ai", 0.9)], Interaction::Dislike);
        assert!((tags[0].confidence - 0.4).abs() < 1e-6);
    }

    #[test]
    fn dislike_below_threshold_evicts() {
        let mut tags = vec![Tag::new("ai", 0.25)];
        apply_feedback(&mut tags, &[Tag::new("ai", 0.5)], Interaction::Dislike);
        assert!(tags.is_empty());
    }

    #[test]
    fn dislike_on_absent_tag_is_a_noop() {
        let mut tags = vec![Tag::new("ai", 0.6)];
        apply_feedback(&mut tags, &[Tag::new("iot", 0.5)], Interaction::Dislike);
        assert_eq!(tags, vec![Tag::new("ai", 0.6)]);
    }

    #[test]
    fn confidence_stays_in_bounds_over_many_rounds() {
        let mut tags = vec![Tag::new("ai", 0.5)];
        let article = [Tag::new("ai", 0.9)];
        for _ in 0..20 {
            apply_feedback(&mut tags, &article, Interaction::Like);
        }
        for t in &tags {
            assert!((0.0..=1.0).contains(&t.confidence));
        }
        for _ in 0..20 {
            apply_feedback(&mut tags, &article, Interaction::Dislike);
        }
        for t in &tags {
            assert!((0.0..=1.0).contains(&t.confidence));
        }
    }

    #[test]
    fn merge_keeps_existing_confidence() {
        let mut tags = vec![Tag::new("ai", 0.9)];
        merge_explicit_tags(&mut tags, &["AI".into(), "iot".into(), " ".into()]);
        assert_eq!(tags.len(), 2);
        assert!((tags[0].confidence - 0.9).abs() < f32::EPSILON);
        assert_eq!(tags[1], Tag::new("iot", 0.5));
    }

    #[tokio::test]
    async fn unknown_token_is_a_noop_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(SubscriberStore::new(tmp.path().join("users.json")));
        let r = PreferenceReinforcer::new(store);
        let ok = r
            .reinforce("ghost", &[Tag::new("ai", 0.9)], Interaction::Like)
            .await
            .unwrap();
        assert!(!ok);
    }
}
