use crate::StateType;
use crate::backlog::{Article, SavedArticle};
use crate::ident::ArticleId;
use crate::identity::{AuthSession, current_user};
use crate::known_errors::KnownErrors;
use axum::Json;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use axum_login::login_required;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub fn router() -> Router<crate::StateType> {
    Router::new()
        .route("/friends", get(list))
        .route("/friends/search", post(search))
        .route("/friends/{id}/{action}", post(act))
        .route("/friends/suggestions", get(suggestions))
        .route("/friends/suggestions/{id}/accept", post(accept_suggestion))
        .route_layer(login_required!(crate::BackendType))
}

// Friend data is mocked throughout: there is no friend storage, only the
// canned lists the original app shipped with.

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    /// Mutual friends.
    Friend,
    /// They sent a request.
    Pending,
    /// You sent a request.
    Requested,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Friend {
    pub id: String,
    pub username: String,
    pub status: FriendStatus,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

fn friend(id: &str, username: &str, status: FriendStatus, avatar_url: Option<&str>) -> Friend {
    Friend {
        id: id.to_string(),
        username: username.to_string(),
        status,
        avatar_url: avatar_url.map(str::to_string),
    }
}

pub fn mock_friends() -> Vec<Friend> {
    vec![
        friend(
            "f1",
            "emma_watson",
            FriendStatus::Friend,
            Some("https://images.unsplash.com/photo-1534528741775-53994a69daeb"),
        ),
        friend(
            "f2",
            "robert_smith",
            FriendStatus::Friend,
            Some("https://images.unsplash.com/photo-1599566150163-29194dcaad36"),
        ),
        friend("f3", "alex_jones", FriendStatus::Friend, None),
    ]
}

pub fn mock_incoming() -> Vec<Friend> {
    vec![
        friend(
            "p1",
            "john_doe",
            FriendStatus::Pending,
            Some("https://images.unsplash.com/photo-1506794778202-cad84cf45f1d"),
        ),
        friend("p2", "sara_parker", FriendStatus::Pending, None),
    ]
}

pub fn mock_outgoing() -> Vec<Friend> {
    vec![friend("r1", "mike_johnson", FriendStatus::Requested, None)]
}

/// Canned search results: the query itself, a known friend, and a derived
/// name, mirroring the original mock.
pub fn search_results(query: &str) -> Vec<Friend> {
    let query = query.trim().to_lowercase();
    vec![
        friend("s1", &query, FriendStatus::Pending, None),
        friend(
            "f1",
            "emma_watson",
            FriendStatus::Friend,
            Some("https://images.unsplash.com/photo-1534528741775-53994a69daeb"),
        ),
        friend("s3", &format!("{query}_fan"), FriendStatus::Requested, None),
    ]
}

/// Articles "friends" suggest; a fixed set with stable ids so accepting one
/// is repeatable.
pub fn suggested_articles() -> Vec<Article> {
    fn suggestion(id: &str, url: &str, title: &str, description: &str, image: &str, source: &str) -> Article {
        Article {
            id: ArticleId::from_str(id).expect("suggestion ids are valid"),
            url: url.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            image_url: Some(image.to_string()),
            source: Some(source.to_string()),
            published_at: None,
        }
    }

    vec![
        suggestion(
            "saiemploy1",
            "https://example.com/suggested1",
            "The Impact of AI on Future Employment Opportunities",
            "Experts predict how artificial intelligence will transform job markets over the next decade.",
            "https://images.unsplash.com/photo-1488590528505-98d2b5aba04b",
            "Tech Insights",
        ),
        suggestion(
            "surbanplan",
            "https://example.com/suggested2",
            "Sustainable Urban Planning: Cities of Tomorrow",
            "How urban planners are incorporating green technologies into future city designs.",
            "https://images.unsplash.com/photo-1518770660439-4636190af475",
            "Environment Today",
        ),
        suggestion(
            "sdecisions",
            "https://example.com/suggested3",
            "The Psychology of Decision Making Under Pressure",
            "Research reveals how stress affects our ability to make rational choices.",
            "https://images.unsplash.com/photo-1461749280684-dccba630e2f6",
            "Psychology Weekly",
        ),
        suggestion(
            "senergysto",
            "https://example.com/suggested4",
            "Breakthroughs in Renewable Energy Storage",
            "New battery technologies that could revolutionize how we store and use clean energy.",
            "https://images.unsplash.com/photo-1486312338219-ce68d2c6f44d",
            "Science Daily",
        ),
    ]
}

#[derive(Serialize)]
pub struct FriendsResponse {
    pub friends: Vec<Friend>,
    pub incoming: Vec<Friend>,
    pub outgoing: Vec<Friend>,
}

async fn list(auth_session: AuthSession) -> Result<Json<FriendsResponse>, KnownErrors> {
    current_user(&auth_session)?;
    Ok(Json(FriendsResponse {
        friends: mock_friends(),
        incoming: mock_incoming(),
        outgoing: mock_outgoing(),
    }))
}

#[derive(Deserialize)]
pub struct SearchForm {
    query: String,
}

async fn search(
    auth_session: AuthSession,
    Json(form): Json<SearchForm>,
) -> Result<Json<Vec<Friend>>, KnownErrors> {
    current_user(&auth_session)?;
    if form.query.trim().is_empty() {
        return Err(KnownErrors::InvalidInput);
    }
    Ok(Json(search_results(&form.query)))
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FriendAction {
    Add,
    Accept,
    Reject,
    Remove,
    Unsend,
}

#[derive(Serialize)]
pub struct FriendActionResponse {
    pub message: String,
}

async fn act(
    auth_session: AuthSession,
    Path((id, action)): Path<(String, FriendAction)>,
) -> Result<Json<FriendActionResponse>, KnownErrors> {
    current_user(&auth_session)?;
    if id.trim().is_empty() {
        return Err(KnownErrors::InvalidId);
    }

    let message = match action {
        FriendAction::Add => "Friend request sent!",
        FriendAction::Accept => "Friend request accepted!",
        FriendAction::Reject => "Friend request rejected",
        FriendAction::Remove => "Friend removed",
        FriendAction::Unsend => "Friend request canceled",
    };

    Ok(Json(FriendActionResponse {
        message: message.to_string(),
    }))
}

async fn suggestions(auth_session: AuthSession) -> Result<Json<Vec<Article>>, KnownErrors> {
    current_user(&auth_session)?;
    Ok(Json(suggested_articles()))
}

async fn accept_suggestion(
    State(state): State<StateType>,
    auth_session: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<SavedArticle>, KnownErrors> {
    let user = current_user(&auth_session)?;
    let id = ArticleId::from_str(&id)?;

    let article = suggested_articles()
        .into_iter()
        .find(|a| a.id == id)
        .ok_or(KnownErrors::InvalidId)?;

    Ok(Json(state.save_article(&user.id, article).await?))
}

#[cfg(test)]
mod test_friends {
    use super::*;

    #[test]
    fn test_mock_lists_have_their_statuses() {
        assert!(
            mock_friends()
                .iter()
                .all(|f| f.status == FriendStatus::Friend)
        );
        assert!(
            mock_incoming()
                .iter()
                .all(|f| f.status == FriendStatus::Pending)
        );
        assert!(
            mock_outgoing()
                .iter()
                .all(|f| f.status == FriendStatus::Requested)
        );
    }

    #[test]
    fn test_search_echoes_the_query() {
        let results = search_results("  Nova  ");
        assert_eq!(results[0].username, "nova");
        assert_eq!(results[2].username, "nova_fan");
    }

    #[test]
    fn test_suggestion_ids_are_stable_and_distinct() {
        let suggestions = suggested_articles();
        assert_eq!(suggestions.len(), 4);

        let mut ids: Vec<_> = suggestions.iter().map(|a| a.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 4);

        // same ids on every call
        assert_eq!(
            suggested_articles()
                .iter()
                .map(|a| a.id)
                .collect::<Vec<_>>(),
            ids
        );
    }
}
