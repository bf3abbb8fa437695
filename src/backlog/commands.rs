use super::{Article, SavedArticle};
use crate::StateType;
use crate::ident::ArticleId;
use crate::identity::{AuthSession, current_user};
use crate::known_errors::KnownErrors;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::str::FromStr;
use url::Url;

pub async fn list(
    State(state): State<StateType>,
    auth_session: AuthSession,
) -> Result<Json<Vec<SavedArticle>>, KnownErrors> {
    let user = current_user(&auth_session)?;
    Ok(Json(state.list_articles(&user.id).await?))
}

#[derive(Deserialize)]
pub struct SaveArticleForm {
    url: String,
    title: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
    source: Option<String>,
    published_at: Option<DateTime<Utc>>,
}

pub async fn save(
    State(state): State<StateType>,
    auth_session: AuthSession,
    Json(form): Json<SaveArticleForm>,
) -> Result<Json<SavedArticle>, KnownErrors> {
    let user = current_user(&auth_session)?;

    let url = Url::parse(form.url.trim()).map_err(|_| KnownErrors::InvalidInput)?;

    let article = Article {
        id: ArticleId::new(),
        title: form.title.unwrap_or_else(|| url.to_string()),
        url: url.into(),
        description: form.description.unwrap_or_default(),
        image_url: form.image_url,
        source: form.source,
        published_at: form.published_at,
    };

    Ok(Json(state.save_article(&user.id, article).await?))
}

pub async fn remove(
    State(state): State<StateType>,
    auth_session: AuthSession,
    Path(id): Path<String>,
) -> Result<StatusCode, KnownErrors> {
    let user = current_user(&auth_session)?;
    let article = ArticleId::from_str(&id)?;

    state.remove_article(&user.id, &article).await?;
    Ok(StatusCode::NO_CONTENT)
}
