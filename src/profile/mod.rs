use crate::ident::AccountId;
use crate::identity::Email;
use crate::known_errors::{KnownErrors, NewsbreakResult};
use crate::registry::Username;
use crate::store::{DocumentStore, fields};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// The account profile document: everything the app knows about an account
/// besides its credential.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProfileState {
    pub account: AccountId,
    #[serde(default)]
    pub username: Option<Username>,
    pub email: Email,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub trait ProfileStore: Clone + Send + Sync + 'static {
    /// Writes the full profile (registration).
    async fn put(&self, profile: &ProfileState) -> NewsbreakResult<()>;

    /// Updates only the username field (rotation step 3); the rest of the
    /// profile is left untouched.
    async fn set_username(&self, account: &AccountId, name: &Username) -> NewsbreakResult<()>;

    /// Keeps the profile's email mirror in step with the identity provider.
    async fn set_email(&self, account: &AccountId, email: &Email) -> NewsbreakResult<()>;

    async fn get(&self, account: &AccountId) -> NewsbreakResult<Option<ProfileState>>;
}

const USERS: &str = "users";

/// Profile storage over the document store's `users` collection, keyed by
/// account id.
#[derive(Clone)]
pub struct DocumentProfileStore<D: DocumentStore> {
    store: D,
}

impl<D: DocumentStore> DocumentProfileStore<D> {
    pub fn new(store: D) -> Self {
        Self { store }
    }
}

impl<D: DocumentStore> ProfileStore for DocumentProfileStore<D> {
    async fn put(&self, profile: &ProfileState) -> NewsbreakResult<()> {
        let doc = fields(serde_json::to_value(profile)?);
        self.store
            .write(USERS, &profile.account.to_string(), doc, false)
            .await
    }

    async fn set_username(&self, account: &AccountId, name: &Username) -> NewsbreakResult<()> {
        self.store
            .write(
                USERS,
                &account.to_string(),
                fields(json!({ "username": name })),
                true,
            )
            .await
    }

    async fn set_email(&self, account: &AccountId, email: &Email) -> NewsbreakResult<()> {
        self.store
            .write(
                USERS,
                &account.to_string(),
                fields(json!({ "email": email })),
                true,
            )
            .await
    }

    async fn get(&self, account: &AccountId) -> NewsbreakResult<Option<ProfileState>> {
        let Some(doc) = self.store.read(USERS, &account.to_string()).await? else {
            return Ok(None);
        };

        let profile = serde_json::from_value(serde_json::Value::Object(doc)).map_err(|e| {
            KnownErrors::InternalError {
                context: format!("malformed profile document for {account}: {e}"),
            }
        })?;
        Ok(Some(profile))
    }
}

#[cfg(test)]
mod test_profile {
    use super::*;
    use crate::store::memory::MemoryDocumentStore;

    fn profile(account: AccountId) -> ProfileState {
        ProfileState {
            account,
            username: Some(Username::try_new("nova").expect("test username should be valid")),
            email: Email::try_new("a@x.com").expect("test email should be valid"),
            first_name: Some("Ada".to_string()),
            last_name: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = DocumentProfileStore::new(MemoryDocumentStore::new());
        let account = AccountId::new();
        let written = profile(account);

        store.put(&written).await.expect("put should succeed");

        let read = store
            .get(&account)
            .await
            .expect("get should succeed")
            .expect("profile should exist");
        assert_eq!(read, written);
    }

    #[tokio::test]
    async fn test_missing_profile_reads_as_none() {
        let store = DocumentProfileStore::new(MemoryDocumentStore::new());
        let read = store
            .get(&AccountId::new())
            .await
            .expect("get should succeed");
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_set_email_leaves_the_rest_alone() {
        let store = DocumentProfileStore::new(MemoryDocumentStore::new());
        let account = AccountId::new();
        let written = profile(account);
        store.put(&written).await.expect("put should succeed");

        let moved = Email::try_new("b@x.com").expect("test email should be valid");
        store
            .set_email(&account, &moved)
            .await
            .expect("email update should succeed");

        let read = store
            .get(&account)
            .await
            .expect("get should succeed")
            .expect("profile should exist");
        assert_eq!(read.email, moved);
        assert_eq!(read.username, written.username);
    }

    #[tokio::test]
    async fn test_set_username_leaves_the_rest_alone() {
        let store = DocumentProfileStore::new(MemoryDocumentStore::new());
        let account = AccountId::new();
        let written = profile(account);
        store.put(&written).await.expect("put should succeed");

        let astra = Username::try_new("astra").expect("test username should be valid");
        store
            .set_username(&account, &astra)
            .await
            .expect("username update should succeed");

        let read = store
            .get(&account)
            .await
            .expect("get should succeed")
            .expect("profile should exist");
        assert_eq!(read.username, Some(astra));
        assert_eq!(read.email, written.email);
        assert_eq!(read.first_name, written.first_name);
        assert_eq!(read.created_at, written.created_at);
    }
}
