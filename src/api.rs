// src/api.rs
//! Thin HTTP surface over the stores. Handlers stay one call deep; all
//! pipeline logic lives in the library modules.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::auth::Auth;
use crate::model::{Article, Interaction};
use crate::reinforce::PreferenceReinforcer;
use crate::store::ArticleStore;

#[derive(Clone)]
pub struct AppState {
    pub articles: Arc<ArticleStore>,
    pub auth: Arc<Auth>,
    pub reinforcer: Arc<PreferenceReinforcer>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/login", post(login))
        .route("/api/verify", post(verify))
        .route("/api/articles", get(list_articles))
        .route("/api/profile", post(update_profile))
        .route("/api/interact", post(interact))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct LoginReq {
    email: String,
}

#[derive(Serialize)]
struct StatusResp {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl StatusResp {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }
    fn fail(msg: &str) -> Self {
        Self {
            success: false,
            error: Some(msg.to_string()),
        }
    }
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginReq>,
) -> (StatusCode, Json<StatusResp>) {
    if body.email.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(StatusResp::fail("email is required")));
    }
    match state.auth.trigger_login(body.email.trim()).await {
        Ok(true) => (StatusCode::OK, Json(StatusResp::ok())),
        Ok(false) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(StatusResp::fail("failed to send OTP")),
        ),
        Err(e) => {
            tracing::error!(error = %e, "login failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResp::fail("internal error")),
            )
        }
    }
}

#[derive(Deserialize)]
struct VerifyReq {
    email: String,
    otp: String,
}

#[derive(Serialize)]
struct VerifyResp {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyReq>,
) -> (StatusCode, Json<VerifyResp>) {
    match state.auth.verify_code(&body.email, &body.otp).await {
        Ok(Some(token)) => (
            StatusCode::OK,
            Json(VerifyResp {
                success: true,
                token: Some(token),
                error: None,
            }),
        ),
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            Json(VerifyResp {
                success: false,
                token: None,
                error: Some("invalid OTP".to_string()),
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "verify failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(VerifyResp {
                    success: false,
                    token: None,
                    error: Some("internal error".to_string()),
                }),
            )
        }
    }
}

async fn list_articles(State(state): State<AppState>) -> Json<Vec<Article>> {
    Json(state.articles.load_all().await)
}

#[derive(Deserialize)]
struct ProfileReq {
    token: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    interests_prompt: String,
}

async fn update_profile(
    State(state): State<AppState>,
    Json(body): Json<ProfileReq>,
) -> (StatusCode, Json<StatusResp>) {
    match state
        .reinforcer
        .update_profile(&body.token, &body.tags, &body.interests_prompt)
        .await
    {
        Ok(true) => (StatusCode::OK, Json(StatusResp::ok())),
        Ok(false) => (StatusCode::UNAUTHORIZED, Json(StatusResp::fail("unknown token"))),
        Err(e) => {
            tracing::error!(error = %e, "profile update failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResp::fail("internal error")),
            )
        }
    }
}

#[derive(Deserialize)]
struct InteractReq {
    token: String,
    article_url: String,
    action: Interaction,
}

async fn interact(
    State(state): State<AppState>,
    Json(body): Json<InteractReq>,
) -> (StatusCode, Json<StatusResp>) {
    let Some(article) = state.articles.find_by_url(&body.article_url).await else {
        return (StatusCode::NOT_FOUND, Json(StatusResp::fail("unknown article")));
    };
    match state
        .reinforcer
        .reinforce(&body.token, &article.tags, body.action)
        .await
    {
        Ok(true) => (StatusCode::OK, Json(StatusResp::ok())),
        Ok(false) => (StatusCode::UNAUTHORIZED, Json(StatusResp::fail("unknown token"))),
        Err(e) => {
            tracing::error!(error = %e, "interaction failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResp::fail("internal error")),
            )
        }
    }
}
