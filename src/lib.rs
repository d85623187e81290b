// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod auth;
pub mod classify;
pub mod config;
pub mod error;
pub mod judge;
pub mod metrics;
pub mod model;
pub mod notify;
pub mod poller;
pub mod reinforce;
pub mod sources;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::error::PipelineError;
pub use crate::model::{Article, Interaction, Subscriber, Tag};
pub use crate::notify::dispatcher::{DispatchOutcome, Dispatcher};
pub use crate::poller::FeedPoller;
pub use crate::store::{ArticleStore, SubscriberStore};
