use crate::ident::AccountId;
use crate::identity::{Email, IdentityProvider};
use crate::known_errors::{KnownErrors, NewsbreakResult};
use crate::profile::{ProfileState, ProfileStore};
use crate::registry::{Username, UsernameRegistry};
use chrono::Utc;

/// Outcome of the registry/profile consistency check that runs on login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// No profile document yet; nothing to check.
    NoProfile,
    /// Profile exists but carries no username.
    NoUsername,
    /// Registry record present and owned by this account.
    Consistent,
    /// Registry record was missing and has been re-claimed.
    Reclaimed,
    /// The profile's username belongs to another account. Logged, never
    /// surfaced to the caller.
    ConflictDetected,
}

/// Orchestrates the identity provider, username registry, and profile store
/// for registration and username rotation.
///
/// None of the three backends share a transaction, so the flows order their
/// effects to keep failures recoverable: the common registration failure
/// (name taken) happens before any credential exists, a lost claim after
/// credential creation is compensated by deleting the credential, and
/// rotation writes the profile before the registry so a crash leaves a
/// profile pointing at an unreserved name (re-claimable) rather than a
/// reserved name with no profile behind it.
#[derive(Clone)]
pub struct AccountService<I, R, P>
where
    I: IdentityProvider,
    R: UsernameRegistry,
    P: ProfileStore,
{
    identity: I,
    registry: R,
    profiles: P,
}

impl<I, R, P> AccountService<I, R, P>
where
    I: IdentityProvider,
    R: UsernameRegistry,
    P: ProfileStore,
{
    pub fn new(identity: I, registry: R, profiles: P) -> Self {
        Self {
            identity,
            registry,
            profiles,
        }
    }

    pub fn identity(&self) -> &I {
        &self.identity
    }

    pub async fn register(
        &self,
        email: Email,
        password: &str,
        username: Username,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> NewsbreakResult<ProfileState> {
        // check availability before creating the credential so the common
        // failure path leaves no orphaned account
        if !self.registry.is_available(&username, None).await? {
            return Err(KnownErrors::UsernameTaken {
                username: username.to_string(),
            });
        }

        let account = self.identity.create_account(&email, password).await?;

        // a concurrent registration may have won the name since the check;
        // compensate by deleting the credential we just created
        if let Err(claim_err) = self.registry.claim(&username, &account.id).await {
            self.roll_back_credential(&account.id).await;
            return Err(claim_err);
        }

        let profile = ProfileState {
            account: account.id,
            username: Some(username.clone()),
            email,
            first_name,
            last_name,
            created_at: Utc::now(),
        };
        if let Err(put_err) = self.profiles.put(&profile).await {
            if let Err(release_err) = self.registry.release(&username).await {
                tracing::warn!(
                    account = %account.id,
                    username = %username,
                    error = %release_err,
                    "failed to release claim while unwinding registration"
                );
            }
            self.roll_back_credential(&account.id).await;
            return Err(KnownErrors::ProfileUpdateFailed {
                context: put_err.to_string(),
            });
        }

        // denormalized copy for fast reads; profile and registry already
        // agree, so a failure here is not worth failing the registration
        if let Err(e) = self
            .identity
            .set_display_name(&account.id, username.as_ref())
            .await
        {
            tracing::warn!(
                account = %account.id,
                error = %e,
                "failed to set display name after registration"
            );
        }

        Ok(profile)
    }

    pub async fn rename(
        &self,
        account: &AccountId,
        new_username: Username,
    ) -> NewsbreakResult<ProfileState> {
        let profile =
            self.profiles
                .get(account)
                .await?
                .ok_or_else(|| KnownErrors::ProfileUpdateFailed {
                    context: format!("no profile for account {account}"),
                })?;

        // renaming to the current name never touches the registry
        if profile.username.as_ref() == Some(&new_username) {
            return Ok(profile);
        }

        if !self
            .registry
            .is_available(&new_username, Some(account))
            .await?
        {
            return Err(KnownErrors::UsernameTaken {
                username: new_username.to_string(),
            });
        }

        self.profiles
            .set_username(account, &new_username)
            .await
            .map_err(|e| KnownErrors::ProfileUpdateFailed {
                context: e.to_string(),
            })?;

        if let Err(claim_err) = self.registry.claim(&new_username, account).await {
            // lost the name since the availability check; put the profile
            // back so the caller's username stays what it was
            match &profile.username {
                Some(old) => {
                    if let Err(revert_err) = self.profiles.set_username(account, old).await {
                        tracing::warn!(
                            account = %account,
                            error = %revert_err,
                            "failed to revert profile after lost claim"
                        );
                    }
                }
                None => tracing::warn!(
                    account = %account,
                    username = %new_username,
                    "lost claim left profile naming an unreserved username"
                ),
            }
            return Err(claim_err);
        }

        if let Some(old) = &profile.username {
            if let Err(e) = self.registry.release(old).await {
                tracing::warn!(
                    account = %account,
                    username = %old,
                    error = %e,
                    "failed to release old username record"
                );
            }
        }

        if let Err(e) = self
            .identity
            .set_display_name(account, new_username.as_ref())
            .await
        {
            tracing::warn!(account = %account, error = %e, "failed to update display name");
        }

        Ok(ProfileState {
            username: Some(new_username),
            ..profile
        })
    }

    /// Read-and-repair pass run on login: the profile's username must map
    /// back to a registry record owned by this account. A missing record is
    /// re-claimed; a record owned by someone else is logged and left alone.
    pub async fn reconcile(&self, account: &AccountId) -> NewsbreakResult<Reconciliation> {
        let Some(profile) = self.profiles.get(account).await? else {
            return Ok(Reconciliation::NoProfile);
        };
        let Some(username) = profile.username else {
            return Ok(Reconciliation::NoUsername);
        };

        match self.registry.owner(&username).await? {
            Some(owner) if owner == *account => Ok(Reconciliation::Consistent),
            Some(owner) => {
                tracing::warn!(
                    account = %account,
                    username = %username,
                    owner = %owner,
                    "profile names a username owned by another account"
                );
                Ok(Reconciliation::ConflictDetected)
            }
            None => match self.registry.claim(&username, account).await {
                Ok(()) => {
                    tracing::info!(
                        account = %account,
                        username = %username,
                        "re-claimed username record missing from the registry"
                    );
                    Ok(Reconciliation::Reclaimed)
                }
                Err(KnownErrors::UsernameTaken { .. }) => {
                    // someone else won the record between the read and the
                    // re-claim; same treatment as an existing conflict
                    tracing::warn!(
                        account = %account,
                        username = %username,
                        "lost re-claim race during reconciliation"
                    );
                    Ok(Reconciliation::ConflictDetected)
                }
                Err(e) => Err(e),
            },
        }
    }

    /// Moves the credential to a new address, then refreshes the profile's
    /// email mirror. A stale mirror is only cosmetic, so a failure there is
    /// logged rather than unwound.
    pub async fn change_email(&self, account: &AccountId, email: Email) -> NewsbreakResult<()> {
        self.identity.update_email(account, &email).await?;

        if let Err(e) = self.profiles.set_email(account, &email).await {
            tracing::warn!(
                account = %account,
                error = %e,
                "failed to update profile email mirror"
            );
        }
        Ok(())
    }

    pub async fn change_password(&self, account: &AccountId, password: &str) -> NewsbreakResult<()> {
        self.identity.update_password(account, password).await
    }

    pub async fn profile(&self, account: &AccountId) -> NewsbreakResult<Option<ProfileState>> {
        self.profiles.get(account).await
    }

    async fn roll_back_credential(&self, account: &AccountId) {
        if let Err(e) = self.identity.delete_account(account).await {
            tracing::warn!(
                account = %account,
                error = %e,
                "failed to roll back orphaned credential"
            );
        }
    }
}
