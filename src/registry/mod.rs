pub mod remote;

use crate::ident::AccountId;
use crate::known_errors::{KnownErrors, NewsbreakResult};
use crate::store::{DocumentStore, fields};
use nutype::nutype;
use serde_json::json;
use std::str::FromStr;

/// Usernames are normalized (trimmed, lowercased) at the type boundary, so
/// every registry key is already canonical.
#[nutype(
    sanitize(trim, lowercase),
    validate(regex = r"^[a-z0-9_]{3,32}$"),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display,
        TryFrom
    )
)]
pub struct Username(String);

/// Single source of truth for username uniqueness: one record per
/// normalized name, owned by exactly one account.
///
/// `claim` must be linearizable per name. Both backings get that from their
/// conditional-write primitive; there is no cross-record transaction, so
/// drift against the profile store is possible and is repaired by the
/// reconciliation pass on login.
pub trait UsernameRegistry: Clone + Send + Sync + 'static {
    /// The account currently owning `name`, if any.
    async fn owner(&self, name: &Username) -> NewsbreakResult<Option<AccountId>>;

    /// A name is available when unclaimed, or when the requester already
    /// owns it (self-rename).
    async fn is_available(
        &self,
        name: &Username,
        requester: Option<&AccountId>,
    ) -> NewsbreakResult<bool> {
        Ok(match self.owner(name).await? {
            None => true,
            Some(owner) => requester.is_some_and(|r| *r == owner),
        })
    }

    /// Asserts ownership of `name`. `UsernameTaken` when another account
    /// holds the record; claiming an already-owned name is a no-op success.
    async fn claim(&self, name: &Username, account: &AccountId) -> NewsbreakResult<()>;

    /// Removes the record for `name`. Releasing an absent name is a no-op.
    async fn release(&self, name: &Username) -> NewsbreakResult<()>;
}

const USERNAMES: &str = "usernames";

/// Registry backed by the document store's `usernames` collection. Each
/// record is `{"uid": <account id>}` keyed by the normalized name.
#[derive(Clone)]
pub struct DocumentRegistry<D: DocumentStore> {
    store: D,
}

impl<D: DocumentStore> DocumentRegistry<D> {
    pub fn new(store: D) -> Self {
        Self { store }
    }
}

impl<D: DocumentStore> UsernameRegistry for DocumentRegistry<D> {
    async fn owner(&self, name: &Username) -> NewsbreakResult<Option<AccountId>> {
        let Some(doc) = self.store.read(USERNAMES, name.as_ref()).await? else {
            return Ok(None);
        };

        let uid = doc
            .get("uid")
            .and_then(|v| v.as_str())
            .ok_or(KnownErrors::InternalError {
                context: format!("username record for \"{name}\" has no uid field"),
            })?;

        Ok(Some(AccountId::from_str(uid)?))
    }

    async fn claim(&self, name: &Username, account: &AccountId) -> NewsbreakResult<()> {
        let taken = || KnownErrors::UsernameTaken {
            username: name.to_string(),
        };

        match self.owner(name).await? {
            Some(owner) if owner == *account => return Ok(()),
            Some(_) => return Err(taken()),
            None => {}
        }

        let created = self
            .store
            .create(USERNAMES, name.as_ref(), fields(json!({ "uid": account })))
            .await?;
        if created {
            return Ok(());
        }

        // lost a create race between the read and the write; the name is
        // ours only if the winner was us
        match self.owner(name).await? {
            Some(owner) if owner == *account => Ok(()),
            _ => Err(taken()),
        }
    }

    async fn release(&self, name: &Username) -> NewsbreakResult<()> {
        self.store.delete(USERNAMES, name.as_ref()).await
    }
}

#[cfg(test)]
mod test_registry {
    use super::*;
    use crate::store::memory::MemoryDocumentStore;

    fn username(s: &str) -> Username {
        Username::try_new(s).expect("test username should be valid")
    }

    fn registry() -> DocumentRegistry<MemoryDocumentStore> {
        DocumentRegistry::new(MemoryDocumentStore::new())
    }

    #[test]
    fn test_username_normalization() {
        assert_eq!(username("  Nova_99  ").to_string(), "nova_99");
    }

    #[test]
    fn test_username_validation() {
        assert_eq!(Username::try_new("ab"), Err(UsernameError::RegexViolated));
        assert_eq!(
            Username::try_new("has spaces"),
            Err(UsernameError::RegexViolated)
        );
        assert!(Username::try_new("nova").is_ok());
    }

    #[tokio::test]
    async fn test_claim_then_availability() {
        let registry = registry();
        let owner = AccountId::new();
        let other = AccountId::new();

        assert!(
            registry
                .is_available(&username("nova"), None)
                .await
                .expect("availability check should succeed")
        );

        registry
            .claim(&username("nova"), &owner)
            .await
            .expect("claim should succeed");

        // unavailable to everyone except the owner
        assert!(
            !registry
                .is_available(&username("nova"), Some(&other))
                .await
                .expect("availability check should succeed")
        );
        assert!(
            registry
                .is_available(&username("nova"), Some(&owner))
                .await
                .expect("availability check should succeed")
        );
    }

    #[tokio::test]
    async fn test_claim_by_other_account_fails() {
        let registry = registry();
        let owner = AccountId::new();
        let other = AccountId::new();

        registry
            .claim(&username("nova"), &owner)
            .await
            .expect("claim should succeed");

        let result = registry.claim(&username("nova"), &other).await;
        assert_eq!(
            result,
            Err(KnownErrors::UsernameTaken {
                username: "nova".to_string()
            })
        );

        // the record still points at the original owner
        assert_eq!(
            registry
                .owner(&username("nova"))
                .await
                .expect("owner lookup should succeed"),
            Some(owner)
        );
    }

    #[tokio::test]
    async fn test_reclaim_by_owner_is_a_noop() {
        let registry = registry();
        let owner = AccountId::new();

        registry
            .claim(&username("nova"), &owner)
            .await
            .expect("claim should succeed");
        registry
            .claim(&username("nova"), &owner)
            .await
            .expect("re-claim by the owner should succeed");
    }

    #[tokio::test]
    async fn test_release_frees_the_name() {
        let registry = registry();
        let owner = AccountId::new();
        let other = AccountId::new();

        registry
            .claim(&username("nova"), &owner)
            .await
            .expect("claim should succeed");
        registry
            .release(&username("nova"))
            .await
            .expect("release should succeed");

        registry
            .claim(&username("nova"), &other)
            .await
            .expect("claim after release should succeed");
    }

    #[tokio::test]
    async fn test_concurrent_claims_admit_one_winner() {
        let registry = registry();
        let a = AccountId::new();
        let b = AccountId::new();

        let name = username("nova");
        let (ra, rb) = tokio::join!(
            registry.claim(&name, &a),
            registry.claim(&name, &b),
        );

        assert!(
            ra.is_ok() ^ rb.is_ok(),
            "exactly one concurrent claim should win"
        );

        let winner = if ra.is_ok() { a } else { b };
        assert_eq!(
            registry
                .owner(&username("nova"))
                .await
                .expect("owner lookup should succeed"),
            Some(winner)
        );
    }
}
