// tests/dispatcher_fanout.rs
//! Fan-out policy: who gets judged, who gets mailed, and how one
//! subscriber's failure stays contained.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use threatwire::error::{PipelineError, Result};
use threatwire::judge::{RelevanceJudge, TagOverlapJudge, Verdict};
use threatwire::notify::{DynMailer, Mailer};
use threatwire::store::SubscriberStore;
use threatwire::{Article, Dispatcher, Subscriber, Tag};

/// Judge that records which subscriber emails it was asked about.
struct CountingJudge {
    inner: TagOverlapJudge,
    seen: Mutex<Vec<String>>,
}

impl CountingJudge {
    fn new() -> Self {
        Self {
            inner: TagOverlapJudge,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RelevanceJudge for CountingJudge {
    async fn evaluate(&self, article: &Article, subscriber: &Subscriber) -> Result<Verdict> {
        self.seen.lock().unwrap().push(subscriber.email.clone());
        self.inner.evaluate(article, subscriber).await
    }
}

/// Mailer that records recipients and fails for one address.
struct RecordingMailer {
    sent: Mutex<Vec<String>>,
    fail_for: Option<String>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, _subject: &str, _body: &str) -> Result<()> {
        if self.fail_for.as_deref() == Some(to) {
            return Err(PipelineError::Mail {
                to: to.to_string(),
                reason: "smtp 550".to_string(),
            });
        }
        self.sent.lock().unwrap().push(to.to_string());
        Ok(())
    }
}

fn article_tagged(name: &str) -> Article {
    Article {
        url: "https://news.example.com/a".into(),
        title: "An article".into(),
        thumbnail: String::new(),
        description: String::new(),
        content: "body".into(),
        tags: vec![Tag::new(name, 0.9)],
        scraped_at: Utc::now(),
    }
}

async fn seed_subscribers(store: &SubscriberStore, subs: Vec<Subscriber>) {
    store
        .mutate(move |all| {
            all.extend(subs);
            true
        })
        .await
        .unwrap();
}

fn subscriber(email: &str, tags: Vec<Tag>, prompt: &str) -> Subscriber {
    let mut s = Subscriber::new(email);
    s.tags = tags;
    s.interests_prompt = prompt.to_string();
    s
}

#[tokio::test]
async fn no_preference_subscriber_gets_no_judge_and_no_mail() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(SubscriberStore::new(tmp.path().join("users.json")));
    seed_subscribers(
        &store,
        vec![
            subscriber("silent@example.com", vec![], ""),
            subscriber("keen@example.com", vec![Tag::new("ai", 0.6)], ""),
        ],
    )
    .await;

    let judge = Arc::new(CountingJudge::new());
    let mailer = Arc::new(RecordingMailer {
        sent: Mutex::new(vec![]),
        fail_for: None,
    });
    let dispatcher = Dispatcher::new(
        store,
        Arc::clone(&judge) as Arc<dyn RelevanceJudge>,
        Arc::clone(&mailer) as DynMailer,
        4,
    );

    let outcome = dispatcher.dispatch(article_tagged("ai")).await;

    assert_eq!(outcome.skipped_no_preferences, 1);
    assert_eq!(outcome.notified, 1);
    let judged = judge.seen.lock().unwrap().clone();
    assert_eq!(judged, vec!["keen@example.com".to_string()]);
    let sent = mailer.sent.lock().unwrap().clone();
    assert_eq!(sent, vec!["keen@example.com".to_string()]);
}

#[tokio::test]
async fn one_mail_failure_does_not_stop_the_rest() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(SubscriberStore::new(tmp.path().join("users.json")));
    seed_subscribers(
        &store,
        vec![
            subscriber("broken@example.com", vec![Tag::new("ai", 0.6)], ""),
            subscriber("fine@example.com", vec![Tag::new("ai", 0.7)], ""),
            subscriber("also-fine@example.com", vec![Tag::new("ai", 0.8)], ""),
        ],
    )
    .await;

    let mailer = Arc::new(RecordingMailer {
        sent: Mutex::new(vec![]),
        fail_for: Some("broken@example.com".to_string()),
    });
    let dispatcher = Dispatcher::new(
        store,
        Arc::new(TagOverlapJudge),
        Arc::clone(&mailer) as DynMailer,
        4,
    );

    let outcome = dispatcher.dispatch(article_tagged("ai")).await;

    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.notified, 2);
    let mut sent = mailer.sent.lock().unwrap().clone();
    sent.sort();
    assert_eq!(
        sent,
        vec![
            "also-fine@example.com".to_string(),
            "fine@example.com".to_string()
        ]
    );
}

#[tokio::test]
async fn not_relevant_subscribers_are_skipped_silently() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(SubscriberStore::new(tmp.path().join("users.json")));
    seed_subscribers(
        &store,
        vec![
            subscriber("iot-fan@example.com", vec![Tag::new("iot", 0.6)], ""),
            subscriber("ai-fan@example.com", vec![Tag::new("ai", 0.6)], ""),
        ],
    )
    .await;

    let mailer = Arc::new(RecordingMailer {
        sent: Mutex::new(vec![]),
        fail_for: None,
    });
    let dispatcher = Dispatcher::new(
        store,
        Arc::new(TagOverlapJudge),
        Arc::clone(&mailer) as DynMailer,
        4,
    );

    let outcome = dispatcher.dispatch(article_tagged("ai")).await;

    assert_eq!(outcome.skipped_not_relevant, 1);
    assert_eq!(outcome.notified, 1);
    assert_eq!(outcome.failed, 0);
    let sent = mailer.sent.lock().unwrap().clone();
    assert_eq!(sent, vec!["ai-fan@example.com".to_string()]);
}

#[tokio::test]
async fn prompt_only_subscriber_is_still_judged() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(SubscriberStore::new(tmp.path().join("users.json")));
    seed_subscribers(
        &store,
        vec![subscriber(
            "prose@example.com",
            vec![],
            "anything about machine learning",
        )],
    )
    .await;

    let judge = Arc::new(CountingJudge::new());
    let dispatcher = Dispatcher::new(
        store,
        Arc::clone(&judge) as Arc<dyn RelevanceJudge>,
        Arc::new(RecordingMailer {
            sent: Mutex::new(vec![]),
            fail_for: None,
        }) as DynMailer,
        4,
    );

    dispatcher.dispatch(article_tagged("ai")).await;

    let judged = judge.seen.lock().unwrap().clone();
    assert_eq!(judged, vec!["prose@example.com".to_string()]);
}
