use crate::account::{AccountService, Reconciliation};
use crate::backlog::{Article, BacklogService, SavedArticle};
use crate::ident::{AccountId, ArticleId};
use crate::identity::{Email, IdentityProvider, MemoryIdentityProvider};
use crate::known_errors::NewsbreakResult;
use crate::profile::{DocumentProfileStore, ProfileState, ProfileStore};
use crate::registry::{DocumentRegistry, Username, UsernameRegistry};
use crate::store::DocumentStore;
use crate::store::memory::MemoryDocumentStore;

/// Everything the HTTP handlers need, bundled as the router state.
#[derive(Clone)]
pub struct Service<I, R, P, D>
where
    I: IdentityProvider,
    R: UsernameRegistry,
    P: ProfileStore,
    D: DocumentStore,
{
    accounts: AccountService<I, R, P>,
    backlog: BacklogService<D>,
}

impl<I, R, P, D> Service<I, R, P, D>
where
    I: IdentityProvider,
    R: UsernameRegistry,
    P: ProfileStore,
    D: DocumentStore,
{
    pub fn new(identity: I, registry: R, profiles: P, documents: D) -> Self {
        Self {
            accounts: AccountService::new(identity, registry, profiles),
            backlog: BacklogService::new(documents),
        }
    }

    pub fn identity(&self) -> &I {
        self.accounts.identity()
    }

    pub(crate) async fn register(
        &self,
        email: Email,
        password: &str,
        username: Username,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> NewsbreakResult<ProfileState> {
        self.accounts
            .register(email, password, username, first_name, last_name)
            .await
    }

    pub(crate) async fn rename(
        &self,
        account: &AccountId,
        new_username: Username,
    ) -> NewsbreakResult<ProfileState> {
        self.accounts.rename(account, new_username).await
    }

    pub(crate) async fn reconcile(&self, account: &AccountId) -> NewsbreakResult<Reconciliation> {
        self.accounts.reconcile(account).await
    }

    pub(crate) async fn change_email(
        &self,
        account: &AccountId,
        email: Email,
    ) -> NewsbreakResult<()> {
        self.accounts.change_email(account, email).await
    }

    pub(crate) async fn change_password(
        &self,
        account: &AccountId,
        password: &str,
    ) -> NewsbreakResult<()> {
        self.accounts.change_password(account, password).await
    }

    pub(crate) async fn profile(
        &self,
        account: &AccountId,
    ) -> NewsbreakResult<Option<ProfileState>> {
        self.accounts.profile(account).await
    }

    pub(crate) async fn save_article(
        &self,
        account: &AccountId,
        article: Article,
    ) -> NewsbreakResult<SavedArticle> {
        self.backlog.save(account, article).await
    }

    pub(crate) async fn list_articles(
        &self,
        account: &AccountId,
    ) -> NewsbreakResult<Vec<SavedArticle>> {
        self.backlog.list(account).await
    }

    pub(crate) async fn remove_article(
        &self,
        account: &AccountId,
        article: &ArticleId,
    ) -> NewsbreakResult<()> {
        self.backlog.remove(account, article).await
    }
}

pub type MemoryService = Service<
    MemoryIdentityProvider,
    DocumentRegistry<MemoryDocumentStore>,
    DocumentProfileStore<MemoryDocumentStore>,
    MemoryDocumentStore,
>;

impl Default for MemoryService {
    fn default() -> Self {
        // one shared document store backs the registry, profiles, and
        // backlog, matching the single database of a deployment
        let documents = MemoryDocumentStore::new();
        Self::new(
            MemoryIdentityProvider::new(),
            DocumentRegistry::new(documents.clone()),
            DocumentProfileStore::new(documents.clone()),
            documents,
        )
    }
}
