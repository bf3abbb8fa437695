pub mod commands;
pub mod service;

pub use service::BacklogService;

use crate::ident::ArticleId;
use axum::Router;
use axum::routing::{delete, get};
use axum_login::login_required;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub fn router() -> Router<crate::StateType> {
    Router::new()
        .route("/articles", get(commands::list).post(commands::save))
        .route("/articles/{id}", delete(commands::remove))
        .route_layer(login_required!(crate::BackendType))
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Article {
    pub id: ArticleId,
    pub url: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// An article as it appears in someone's backlog.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SavedArticle {
    pub article: Article,
    pub saved_at: DateTime<Utc>,
}
