use crate::ident::AccountId;
use crate::known_errors::{KnownErrors, NewsbreakResult};
use async_trait::async_trait;
use axum_login::{AuthUser, AuthnBackend};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use nutype::nutype;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::task;

/// Passwords shorter than this are rejected as weak credentials.
const MIN_PASSWORD_LEN: usize = 6;

#[nutype(
    sanitize(trim, lowercase),
    validate(regex = r"^[\w\-\.]+@([\w-]+\.)+[\w-]{2,}$"),
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
pub struct Email(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub id: AccountId,
    pub email: Email,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedAccount {
    pub id: AccountId,
    pub email: Email,
    pub display_name: Option<String>,
}

/// The credential half of the system: owns email/password verification and
/// the per-account display-name attribute. The document store never sees
/// passwords.
pub trait IdentityProvider: Clone + Send + Sync + 'static {
    async fn create_account(&self, email: &Email, password: &str) -> NewsbreakResult<NewAccount>;

    async fn authenticate(
        &self,
        email: &Email,
        password: &str,
    ) -> NewsbreakResult<AuthenticatedAccount>;

    async fn set_display_name(&self, account: &AccountId, name: &str) -> NewsbreakResult<()>;

    async fn display_name(&self, account: &AccountId) -> NewsbreakResult<Option<String>>;

    async fn update_email(&self, account: &AccountId, email: &Email) -> NewsbreakResult<()>;

    async fn update_password(&self, account: &AccountId, password: &str) -> NewsbreakResult<()>;

    /// Removes the credential. The registration flow uses this to compensate
    /// when a username claim is lost after the credential already exists.
    async fn delete_account(&self, account: &AccountId) -> NewsbreakResult<()>;
}

#[derive(Clone)]
struct CredentialRecord {
    id: AccountId,
    email: Email,
    pw_hash: String,
    display_name: Option<String>,
}

/// In-process identity provider storing bcrypt hashes. Stands in for the
/// managed identity service and doubles as the `axum-login` backend.
#[derive(Clone)]
pub struct MemoryIdentityProvider {
    email_to_account: Arc<DashMap<String, AccountId>>,
    accounts: Arc<DashMap<AccountId, CredentialRecord>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self {
            email_to_account: Arc::new(DashMap::new()),
            accounts: Arc::new(DashMap::new()),
        }
    }

    fn record_for_email(&self, email: &Email) -> Option<CredentialRecord> {
        let id = *self.email_to_account.get(email.as_ref())?;
        self.accounts.get(&id).map(|r| (*r).clone())
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    async fn create_account(&self, email: &Email, password: &str) -> NewsbreakResult<NewAccount> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(KnownErrors::InvalidCredential);
        }

        // hash before taking the entry guard; bcrypt is slow and the guard
        // must not be held across an await
        let password = password.to_string();
        let pw_hash = task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
            .await??;

        let id = AccountId::new();
        match self.email_to_account.entry(email.to_string()) {
            Entry::Occupied(_) => return Err(KnownErrors::EmailInUse),
            Entry::Vacant(vacant) => {
                vacant.insert(id);
            }
        }
        self.accounts.insert(
            id,
            CredentialRecord {
                id,
                email: email.clone(),
                pw_hash,
                display_name: None,
            },
        );

        Ok(NewAccount {
            id,
            email: email.clone(),
        })
    }

    async fn authenticate(
        &self,
        email: &Email,
        password: &str,
    ) -> NewsbreakResult<AuthenticatedAccount> {
        let record = self
            .record_for_email(email)
            .ok_or(KnownErrors::InvalidCredential)?;

        let password = password.to_string();
        let pw_hash = record.pw_hash.clone();
        let verified = task::spawn_blocking(move || bcrypt::verify(password, &pw_hash)).await??;

        if !verified {
            return Err(KnownErrors::InvalidCredential);
        }

        Ok(AuthenticatedAccount {
            id: record.id,
            email: record.email,
            display_name: record.display_name,
        })
    }

    async fn set_display_name(&self, account: &AccountId, name: &str) -> NewsbreakResult<()> {
        let mut record = self
            .accounts
            .get_mut(account)
            .ok_or(KnownErrors::NotAuthenticated)?;
        record.display_name = Some(name.to_string());
        Ok(())
    }

    async fn display_name(&self, account: &AccountId) -> NewsbreakResult<Option<String>> {
        Ok(self
            .accounts
            .get(account)
            .and_then(|r| r.display_name.clone()))
    }

    async fn update_email(&self, account: &AccountId, email: &Email) -> NewsbreakResult<()> {
        if !self.accounts.contains_key(account) {
            return Err(KnownErrors::NotAuthenticated);
        }

        match self.email_to_account.entry(email.to_string()) {
            Entry::Occupied(occupied) if *occupied.get() != *account => {
                return Err(KnownErrors::EmailInUse);
            }
            Entry::Occupied(_) => return Ok(()),
            Entry::Vacant(vacant) => {
                vacant.insert(*account);
            }
        }

        let old_email = {
            let mut record = self
                .accounts
                .get_mut(account)
                .ok_or(KnownErrors::NotAuthenticated)?;
            let old = record.email.clone();
            record.email = email.clone();
            old
        };
        self.email_to_account.remove(old_email.as_ref());
        Ok(())
    }

    async fn update_password(&self, account: &AccountId, password: &str) -> NewsbreakResult<()> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(KnownErrors::InvalidCredential);
        }

        let password = password.to_string();
        let pw_hash = task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
            .await??;

        let mut record = self
            .accounts
            .get_mut(account)
            .ok_or(KnownErrors::NotAuthenticated)?;
        record.pw_hash = pw_hash;
        Ok(())
    }

    async fn delete_account(&self, account: &AccountId) -> NewsbreakResult<()> {
        if let Some((_, record)) = self.accounts.remove(account) {
            self.email_to_account.remove(record.email.as_ref());
        }
        Ok(())
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: AccountId,
    pub email: Email,
    pw_hash: Vec<u8>,
}

impl fmt::Debug for SessionUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

impl AuthUser for SessionUser {
    type Id = AccountId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn session_auth_hash(&self) -> &[u8] {
        &self.pw_hash
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub email: Email,
    pub password: String,
}

#[async_trait]
impl AuthnBackend for MemoryIdentityProvider {
    type User = SessionUser;
    type Credentials = Credentials;
    type Error = KnownErrors;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        match IdentityProvider::authenticate(self, &creds.email, &creds.password).await {
            Ok(account) => Ok(AuthnBackend::get_user(self, &account.id).await?),
            Err(KnownErrors::InvalidCredential) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_user(&self, account: &AccountId) -> Result<Option<Self::User>, Self::Error> {
        Ok(self.accounts.get(account).map(|record| SessionUser {
            id: record.id,
            email: record.email.clone(),
            pw_hash: record.pw_hash.clone().into_bytes(),
        }))
    }
}

pub type AuthSession = axum_login::AuthSession<crate::BackendType>;

/// The signed-in user for a request, or `NotAuthenticated`.
pub fn current_user(session: &AuthSession) -> NewsbreakResult<SessionUser> {
    session.user.clone().ok_or(KnownErrors::NotAuthenticated)
}

#[cfg(test)]
mod test_identity {
    use super::*;

    fn email(s: &str) -> Email {
        Email::try_new(s).expect("test email should be valid")
    }

    #[test]
    fn test_email_validation() {
        assert!(Email::try_new("test@example.com").is_ok());

        // sanitization lowercases and trims
        assert!(
            Email::try_new("   test.test2@EXamPle.Com   ")
                .is_ok_and(|f| f.to_string() == "test.test2@example.com")
        );

        assert_eq!(
            Email::try_new("test@example"),
            Err(EmailError::RegexViolated)
        );
        assert_eq!(
            Email::try_new("@example.com"),
            Err(EmailError::RegexViolated)
        );
        assert_eq!(
            Email::try_new("testexample.com"),
            Err(EmailError::RegexViolated)
        );
    }

    #[tokio::test]
    async fn test_create_and_authenticate() {
        let provider = MemoryIdentityProvider::new();

        let created = provider
            .create_account(&email("a@x.com"), "secret1")
            .await
            .expect("account creation should succeed");

        let authed = IdentityProvider::authenticate(&provider, &email("a@x.com"), "secret1")
            .await
            .expect("authentication should succeed");
        assert_eq!(authed.id, created.id);
        assert_eq!(authed.display_name, None);
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let provider = MemoryIdentityProvider::new();
        provider
            .create_account(&email("a@x.com"), "secret1")
            .await
            .expect("account creation should succeed");

        let result = IdentityProvider::authenticate(&provider, &email("a@x.com"), "wrong1").await;
        assert_eq!(result, Err(KnownErrors::InvalidCredential));
    }

    #[tokio::test]
    async fn test_unknown_email_is_rejected() {
        let provider = MemoryIdentityProvider::new();
        let result = IdentityProvider::authenticate(&provider, &email("a@x.com"), "secret1").await;
        assert_eq!(result, Err(KnownErrors::InvalidCredential));
    }

    #[tokio::test]
    async fn test_weak_password_is_rejected() {
        let provider = MemoryIdentityProvider::new();
        let result = provider.create_account(&email("a@x.com"), "short").await;
        assert_eq!(result, Err(KnownErrors::InvalidCredential));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let provider = MemoryIdentityProvider::new();
        provider
            .create_account(&email("a@x.com"), "secret1")
            .await
            .expect("account creation should succeed");

        let result = provider.create_account(&email("a@x.com"), "secret2").await;
        assert_eq!(result, Err(KnownErrors::EmailInUse));
    }

    #[tokio::test]
    async fn test_display_name_roundtrip() {
        let provider = MemoryIdentityProvider::new();
        let created = provider
            .create_account(&email("a@x.com"), "secret1")
            .await
            .expect("account creation should succeed");

        provider
            .set_display_name(&created.id, "nova")
            .await
            .expect("display name update should succeed");
        assert_eq!(
            provider
                .display_name(&created.id)
                .await
                .expect("display name read should succeed"),
            Some("nova".to_string())
        );
    }

    #[tokio::test]
    async fn test_update_email_moves_the_mapping() {
        let provider = MemoryIdentityProvider::new();
        let created = provider
            .create_account(&email("a@x.com"), "secret1")
            .await
            .expect("account creation should succeed");

        provider
            .update_email(&created.id, &email("b@x.com"))
            .await
            .expect("email update should succeed");

        // only the new address authenticates
        assert!(
            IdentityProvider::authenticate(&provider, &email("b@x.com"), "secret1")
                .await
                .is_ok()
        );
        assert_eq!(
            IdentityProvider::authenticate(&provider, &email("a@x.com"), "secret1").await,
            Err(KnownErrors::InvalidCredential)
        );

        // the old address is registrable again
        provider
            .create_account(&email("a@x.com"), "secret2")
            .await
            .expect("freed email should be registrable");
    }

    #[tokio::test]
    async fn test_update_email_rejects_an_address_in_use() {
        let provider = MemoryIdentityProvider::new();
        let created = provider
            .create_account(&email("a@x.com"), "secret1")
            .await
            .expect("account creation should succeed");
        provider
            .create_account(&email("b@x.com"), "secret2")
            .await
            .expect("account creation should succeed");

        let result = provider.update_email(&created.id, &email("b@x.com")).await;
        assert_eq!(result, Err(KnownErrors::EmailInUse));
    }

    #[tokio::test]
    async fn test_update_password_rotates_the_hash() {
        let provider = MemoryIdentityProvider::new();
        let created = provider
            .create_account(&email("a@x.com"), "secret1")
            .await
            .expect("account creation should succeed");

        provider
            .update_password(&created.id, "secret2")
            .await
            .expect("password update should succeed");

        assert_eq!(
            IdentityProvider::authenticate(&provider, &email("a@x.com"), "secret1").await,
            Err(KnownErrors::InvalidCredential)
        );
        assert!(
            IdentityProvider::authenticate(&provider, &email("a@x.com"), "secret2")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_deleted_account_frees_the_email() {
        let provider = MemoryIdentityProvider::new();
        let created = provider
            .create_account(&email("a@x.com"), "secret1")
            .await
            .expect("account creation should succeed");

        provider
            .delete_account(&created.id)
            .await
            .expect("account deletion should succeed");

        // the email is registrable again
        provider
            .create_account(&email("a@x.com"), "secret2")
            .await
            .expect("re-registration should succeed");
    }

    #[tokio::test]
    async fn test_backend_authenticate_returns_none_on_bad_credentials() {
        let provider = MemoryIdentityProvider::new();
        provider
            .create_account(&email("a@x.com"), "secret1")
            .await
            .expect("account creation should succeed");

        let user = AuthnBackend::authenticate(
            &provider,
            Credentials {
                email: email("a@x.com"),
                password: "wrong1".to_string(),
            },
        )
        .await
        .expect("backend authenticate should not error");
        assert!(user.is_none());
    }
}
