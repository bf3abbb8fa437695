use super::{Article, SavedArticle};
use crate::ident::{AccountId, ArticleId};
use crate::known_errors::NewsbreakResult;
use crate::store::{DocumentStore, fields};
use chrono::{DateTime, Utc};
use serde_json::json;

const ARTICLES: &str = "articles";
const SAVED_ARTICLES: &str = "savedArticles";
const BACKLOGS: &str = "backlogs";

/// The saved-article library.
///
/// Three collections: `articles` holds one shared document per article,
/// `savedArticles` holds the per-account link (keyed `{account}_{article}`),
/// and `backlogs` holds one index document per account listing saved
/// article ids newest-first. The index exists because the document-store
/// contract has no query-by-field operation.
#[derive(Clone)]
pub struct BacklogService<D: DocumentStore> {
    store: D,
}

impl<D: DocumentStore> BacklogService<D> {
    pub fn new(store: D) -> Self {
        Self { store }
    }

    pub async fn save(&self, account: &AccountId, article: Article) -> NewsbreakResult<SavedArticle> {
        let saved_at = Utc::now();

        // the first writer's metadata wins for the shared article document
        self.store
            .create(
                ARTICLES,
                &article.id.to_string(),
                fields(serde_json::to_value(&article)?),
            )
            .await?;

        // a repeat save just refreshes the link's timestamp
        self.store
            .write(
                SAVED_ARTICLES,
                &link_key(account, &article.id),
                fields(json!({
                    "account": account,
                    "article": article.id,
                    "saved_at": saved_at,
                    "shared_with": [],
                })),
                false,
            )
            .await?;

        let mut ids = self.index(account).await?;
        ids.retain(|id| *id != article.id);
        ids.insert(0, article.id);
        self.write_index(account, &ids).await?;

        let canonical = self.article(&article.id).await?.unwrap_or(article);
        Ok(SavedArticle {
            article: canonical,
            saved_at,
        })
    }

    pub async fn list(&self, account: &AccountId) -> NewsbreakResult<Vec<SavedArticle>> {
        let mut saved = Vec::new();

        for id in self.index(account).await? {
            let link = self
                .store
                .read(SAVED_ARTICLES, &link_key(account, &id))
                .await?;
            let article = self.article(&id).await?;

            match (link, article) {
                (Some(link), Some(article)) => {
                    let saved_at: DateTime<Utc> = match link.get("saved_at") {
                        Some(value) => serde_json::from_value(value.clone())?,
                        None => continue,
                    };
                    saved.push(SavedArticle { article, saved_at });
                }
                // the index outlived the link or article document; skip
                // the entry rather than failing the whole listing
                _ => tracing::warn!(
                    account = %account,
                    article = %id,
                    "dangling backlog index entry"
                ),
            }
        }

        Ok(saved)
    }

    /// Removing an article that was never saved is a no-op success.
    pub async fn remove(&self, account: &AccountId, article: &ArticleId) -> NewsbreakResult<()> {
        self.store
            .delete(SAVED_ARTICLES, &link_key(account, article))
            .await?;

        let mut ids = self.index(account).await?;
        ids.retain(|id| id != article);
        self.write_index(account, &ids).await
    }

    async fn article(&self, id: &ArticleId) -> NewsbreakResult<Option<Article>> {
        let Some(doc) = self.store.read(ARTICLES, &id.to_string()).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(serde_json::Value::Object(
            doc,
        ))?))
    }

    async fn index(&self, account: &AccountId) -> NewsbreakResult<Vec<ArticleId>> {
        let Some(doc) = self.store.read(BACKLOGS, &account.to_string()).await? else {
            return Ok(Vec::new());
        };
        match doc.get("article_ids") {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(Vec::new()),
        }
    }

    async fn write_index(&self, account: &AccountId, ids: &[ArticleId]) -> NewsbreakResult<()> {
        self.store
            .write(
                BACKLOGS,
                &account.to_string(),
                fields(json!({ "article_ids": ids })),
                false,
            )
            .await
    }
}

fn link_key(account: &AccountId, article: &ArticleId) -> String {
    format!("{account}_{article}")
}
