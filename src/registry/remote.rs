use super::{Username, UsernameRegistry};
use crate::ident::AccountId;
use crate::known_errors::{KnownErrors, NewsbreakResult};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Claim payload for the remote endpoint. The endpoint also tolerates
/// optional name fields; this backing only asserts name ownership and
/// leaves profile persistence to the profile store.
#[derive(Serialize, Deserialize)]
pub struct ClaimForm {
    pub firebase_uid: String,
    pub username: String,
}

#[derive(Serialize, Deserialize)]
struct OwnerBody {
    uid: String,
}

/// Registry backed by a remote HTTP endpoint instead of the document store.
///
/// Wire contract: claim is a form-encoded POST answered with 2xx on success
/// and 409 when the name belongs to someone else; ownership lookup is a GET
/// with a `username` query parameter (404 = unclaimed); release is a
/// DELETE. Connection failures surface as `BackendUnavailable`.
#[derive(Clone)]
pub struct HttpRegistry {
    client: reqwest::Client,
    base: Url,
}

impl HttpRegistry {
    pub fn new(base: Url) -> NewsbreakResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> NewsbreakResult<Url> {
        self.base
            .join(path)
            .map_err(|e| KnownErrors::InternalError {
                context: format!("bad registry url: {e}"),
            })
    }
}

impl UsernameRegistry for HttpRegistry {
    async fn owner(&self, name: &Username) -> NewsbreakResult<Option<AccountId>> {
        let mut url = self.endpoint("usernames")?;
        url.set_query(Some(&format!(
            "username={}",
            urlencoding::encode(name.as_ref())
        )));

        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: OwnerBody = response.json().await?;
                Ok(Some(AccountId::from_str(&body.uid)?))
            }
            status => Err(KnownErrors::InternalError {
                context: format!("registry lookup returned {status}"),
            }),
        }
    }

    async fn claim(&self, name: &Username, account: &AccountId) -> NewsbreakResult<()> {
        let form = ClaimForm {
            firebase_uid: account.to_string(),
            username: name.to_string(),
        };

        let response = self
            .client
            .post(self.endpoint("usernames")?)
            .form(&form)
            .send()
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Err(KnownErrors::UsernameTaken {
                username: name.to_string(),
            }),
            status if status.is_success() => Ok(()),
            status => Err(KnownErrors::InternalError {
                context: format!("registry claim returned {status}"),
            }),
        }
    }

    async fn release(&self, name: &Username) -> NewsbreakResult<()> {
        let url = self.endpoint(&format!(
            "usernames/{}",
            urlencoding::encode(name.as_ref())
        ))?;

        let response = self.client.delete(url).send().await?;
        match response.status() {
            // releasing an absent name is a no-op
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            status => Err(KnownErrors::InternalError {
                context: format!("registry release returned {status}"),
            }),
        }
    }
}
