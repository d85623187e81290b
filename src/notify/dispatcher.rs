// src/notify/dispatcher.rs
//! Per-article fan-out: judge every subscriber, mail the matches. Runs as
//! its own task off the poll cycle's critical path. One subscriber's judge
//! or mail failure never touches the others.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::judge::{DynJudge, Verdict};
use crate::model::{Article, Subscriber};
use crate::store::SubscriberStore;

use super::DynMailer;

/// Per-article tally; returned for observability and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub notified: usize,
    pub skipped_no_preferences: usize,
    pub skipped_not_relevant: usize,
    pub failed: usize,
}

pub struct Dispatcher {
    subscribers: Arc<SubscriberStore>,
    judge: DynJudge,
    mailer: DynMailer,
    concurrency: usize,
}

impl Dispatcher {
    pub fn new(
        subscribers: Arc<SubscriberStore>,
        judge: DynJudge,
        mailer: DynMailer,
        concurrency: usize,
    ) -> Self {
        Self {
            subscribers,
            judge,
            mailer,
            concurrency: concurrency.max(1),
        }
    }

    /// Match one freshly persisted article against all subscribers and mail
    /// the matches, bounded-parallel. Subscribers who declared no
    /// preference are skipped before any judge call.
    pub async fn dispatch(&self, article: Article) -> DispatchOutcome {
        let subscribers = self.subscribers.load_all().await;
        let mut outcome = DispatchOutcome::default();

        let article = Arc::new(article);
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<SubscriberResult> = JoinSet::new();

        for sub in subscribers {
            if !sub.has_preferences() {
                outcome.skipped_no_preferences += 1;
                counter!("notify_skipped_no_prefs_total").increment(1);
                continue;
            }

            let article = Arc::clone(&article);
            let permits = Arc::clone(&permits);
            let judge = Arc::clone(&self.judge);
            let mailer = Arc::clone(&self.mailer);

            tasks.spawn(async move {
                // Closed only on runtime shutdown; treat as a skip.
                let _permit = match permits.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return SubscriberResult::Failed,
                };
                notify_one(&article, &sub, judge, mailer).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(SubscriberResult::Notified) => outcome.notified += 1,
                Ok(SubscriberResult::NotRelevant) => outcome.skipped_not_relevant += 1,
                Ok(SubscriberResult::Failed) => outcome.failed += 1,
                Err(e) => {
                    tracing::error!(error = %e, "notification task panicked");
                    outcome.failed += 1;
                }
            }
        }

        counter!("notify_sent_total").increment(outcome.notified as u64);
        counter!("notify_errors_total").increment(outcome.failed as u64);
        tracing::info!(
            url = %article.url,
            notified = outcome.notified,
            no_prefs = outcome.skipped_no_preferences,
            not_relevant = outcome.skipped_not_relevant,
            failed = outcome.failed,
            "fan-out finished"
        );
        outcome
    }
}

enum SubscriberResult {
    Notified,
    NotRelevant,
    Failed,
}

async fn notify_one(
    article: &Article,
    sub: &Subscriber,
    judge: DynJudge,
    mailer: DynMailer,
) -> SubscriberResult {
    let summary = match judge.evaluate(article, sub).await {
        Ok(Verdict::Relevant(s)) => s,
        Ok(Verdict::NotRelevant) => return SubscriberResult::NotRelevant,
        Err(e) => {
            tracing::warn!(email = %sub.email, error = %e, "judge failed, skipping subscriber");
            return SubscriberResult::Failed;
        }
    };

    let subject = format!("New for you: {}", article.title);
    let body = format!("{}\n\n{}\n\nRead it: {}", article.title, summary, article.url);
    match mailer.send(&sub.email, &subject, &body).await {
        Ok(()) => SubscriberResult::Notified,
        Err(e) => {
            tracing::warn!(email = %sub.email, error = %e, "mail failed, skipping subscriber");
            SubscriberResult::Failed
        }
    }
}
