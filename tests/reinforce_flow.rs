// tests/reinforce_flow.rs
//! End-to-end reinforcement over a real store file: like/dislike arithmetic,
//! eviction, and the unknown-token no-op.

use std::sync::Arc;

use threatwire::reinforce::PreferenceReinforcer;
use threatwire::store::SubscriberStore;
use threatwire::{Interaction, Subscriber, Tag};

async fn store_with_subscriber(tags: Vec<Tag>) -> (Arc<SubscriberStore>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(SubscriberStore::new(tmp.path().join("users.json")));
    store
        .mutate(move |subs| {
            let mut s = Subscriber::new("a@example.com");
            s.token = Some("tok".into());
            s.tags = tags;
            subs.push(s);
            true
        })
        .await
        .unwrap();
    (store, tmp)
}

#[tokio::test]
async fn like_bumps_matching_tag_by_a_tenth() {
    let (store, _tmp) = store_with_subscriber(vec![Tag::new("ai", 0.6)]).await;
    let r = PreferenceReinforcer::new(Arc::clone(&store));

    let ok = r
        .reinforce("tok", &[Tag::new("ai", 0.9)], Interaction::Like)
        .await
        .unwrap();
    assert!(ok);

    let sub = store.find_by_token("tok").await.unwrap();
    assert_eq!(sub.tags.len(), 1);
    assert!((sub.tags[0].confidence - 0.7).abs() < 1e-6);
}

#[tokio::test]
async fn dislike_to_threshold_removes_the_tag() {
    let (store, _tmp) = store_with_subscriber(vec![Tag::new("ai", 0.25)]).await;
    let r = PreferenceReinforcer::new(Arc::clone(&store));

    r.reinforce("tok", &[Tag::new("ai", 0.9)], Interaction::Dislike)
        .await
        .unwrap();

    let sub = store.find_by_token("tok").await.unwrap();
    assert!(
        !sub.tags.iter().any(|t| t.name == "ai"),
        "0.25 - 0.2 = 0.05 <= 0.1, so the tag must be gone"
    );
}

#[tokio::test]
async fn confidence_bounds_hold_across_mixed_feedback() {
    let (store, _tmp) = store_with_subscriber(vec![Tag::new("ai", 0.5)]).await;
    let r = PreferenceReinforcer::new(Arc::clone(&store));
    let article = [Tag::new("ai", 0.9), Tag::new("iot", 0.4)];

    for i in 0..15 {
        let action = if i % 3 == 0 {
            Interaction::Dislike
        } else {
            Interaction::Like
        };
        r.reinforce("tok", &article, action).await.unwrap();
    }

    let sub = store.find_by_token("tok").await.unwrap();
    for t in &sub.tags {
        assert!((0.0..=1.0).contains(&t.confidence), "tag {t:?} out of bounds");
    }
}

#[tokio::test]
async fn unknown_token_changes_nothing_and_is_not_an_error() {
    let (store, _tmp) = store_with_subscriber(vec![Tag::new("ai", 0.6)]).await;
    let r = PreferenceReinforcer::new(Arc::clone(&store));

    let ok = r
        .reinforce("not-a-token", &[Tag::new("ai", 0.9)], Interaction::Like)
        .await
        .unwrap();
    assert!(!ok);

    let sub = store.find_by_token("tok").await.unwrap();
    assert!((sub.tags[0].confidence - 0.6).abs() < 1e-6);
}

#[tokio::test]
async fn profile_update_merges_and_replaces_prompt() {
    let (store, _tmp) = store_with_subscriber(vec![Tag::new("ai", 0.9)]).await;
    let r = PreferenceReinforcer::new(Arc::clone(&store));

    let ok = r
        .update_profile("tok", &["ai".into(), "cloud".into()], "less noise please")
        .await
        .unwrap();
    assert!(ok);

    let sub = store.find_by_token("tok").await.unwrap();
    assert_eq!(sub.interests_prompt, "less noise please");
    assert_eq!(sub.tags.len(), 2);
    // Existing name keeps its learned confidence; the new one enters at 0.5.
    assert!((sub.tags[0].confidence - 0.9).abs() < 1e-6);
    assert_eq!(sub.tags[1], Tag::new("cloud", 0.5));
}
