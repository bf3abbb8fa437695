use crate::backlog::Article;
use crate::ident::ArticleId;
use crate::identity::Email;
use crate::known_errors::{KnownErrors, NewsbreakResult};
use crate::registry::Username;
use crate::service::MemoryService;
use std::str::FromStr;

/// Dev accounts available after startup. The password is shared and only
/// ever lives in the in-memory provider.
pub const DEV_USERS: &[(&str, &str, &str)] = &[
    ("pacioli@newsbreak.dev", "pacioli", "Luca"),
    ("wedgwood@newsbreak.dev", "wedgwood", "Josiah"),
];

pub const DEV_PASSWORD: &str = "letmein";

/// The original dev backlog, saved for the first dev user.
fn dev_articles() -> NewsbreakResult<Vec<Article>> {
    fn article(
        id: &str,
        url: &str,
        title: &str,
        description: &str,
        image: &str,
        source: &str,
    ) -> NewsbreakResult<Article> {
        Ok(Article {
            id: ArticleId::from_str(id)?,
            url: url.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            image_url: Some(image.to_string()),
            source: Some(source.to_string()),
            published_at: None,
        })
    }

    Ok(vec![
        article(
            "aclimatef1",
            "https://example.com/article1",
            "Climate Change Impacts on Global Food Security",
            "New research reveals how climate change is affecting global food production and distribution systems.",
            "https://images.unsplash.com/photo-1500382017468-9049fed747ef",
            "The Guardian",
        )?,
        article(
            "aquantumc2",
            "https://example.com/article2",
            "Advances in Quantum Computing: Breaking New Barriers",
            "Scientists have achieved a breakthrough in quantum computing, potentially revolutionizing data processing.",
            "https://images.unsplash.com/photo-1518770660439-4636190af475",
            "MIT Technology Review",
        )?,
        article(
            "aremotewk3",
            "https://example.com/article3",
            "The Future of Remote Work After the Pandemic",
            "Companies are reimagining workplace policies as remote work becomes a permanent fixture in the business landscape.",
            "https://images.unsplash.com/photo-1585076641399-5c06d1b3365f",
            "Harvard Business Review",
        )?,
        article(
            "anaturemh4",
            "https://example.com/article4",
            "New Findings on Mental Health Benefits of Nature Exposure",
            "Research demonstrates significant improvements in mental wellbeing from regular exposure to natural environments.",
            "https://images.unsplash.com/photo-1518173946687-a4c8892bbd9f",
            "Psychology Today",
        )?,
    ])
}

/// Registers the dev users and fills the first one's backlog. Safe to run
/// against an already-seeded service.
pub async fn seed_dev_data(state: &MemoryService) -> NewsbreakResult<()> {
    let mut first_account = None;

    for (email, username, first_name) in DEV_USERS {
        let email = Email::try_new(*email).map_err(|e| KnownErrors::InternalError {
            context: e.to_string(),
        })?;
        let username = Username::try_new(*username).map_err(|e| KnownErrors::InternalError {
            context: e.to_string(),
        })?;

        match state
            .register(
                email,
                DEV_PASSWORD,
                username,
                Some(first_name.to_string()),
                None,
            )
            .await
        {
            Ok(profile) => {
                if first_account.is_none() {
                    first_account = Some(profile.account);
                }
            }
            // already seeded
            Err(KnownErrors::EmailInUse | KnownErrors::UsernameTaken { .. }) => {}
            Err(e) => return Err(e),
        }
    }

    if let Some(account) = first_account {
        // save oldest first so the listing comes back newest first
        for article in dev_articles()?.into_iter().rev() {
            state.save_article(&account, article).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test_seed {
    use super::*;
    use crate::identity::IdentityProvider;

    #[tokio::test]
    async fn test_seeding_registers_dev_users() {
        let state = MemoryService::default();
        seed_dev_data(&state).await.expect("seeding should succeed");

        for (email, _, _) in DEV_USERS {
            let email = Email::try_new(*email).expect("dev email should be valid");
            state
                .identity()
                .authenticate(&email, DEV_PASSWORD)
                .await
                .expect("dev user should authenticate");
        }
    }

    #[tokio::test]
    async fn test_first_dev_user_has_a_backlog() {
        let state = MemoryService::default();
        seed_dev_data(&state).await.expect("seeding should succeed");

        let email = Email::try_new(DEV_USERS[0].0).expect("dev email should be valid");
        let account = state
            .identity()
            .authenticate(&email, DEV_PASSWORD)
            .await
            .expect("dev user should authenticate")
            .id;

        let backlog = state
            .list_articles(&account)
            .await
            .expect("listing should succeed");
        assert_eq!(backlog.len(), 4);
        assert_eq!(
            backlog[0].article.title,
            "Climate Change Impacts on Global Food Security"
        );
    }

    #[tokio::test]
    async fn test_seeding_twice_is_harmless() {
        let state = MemoryService::default();
        seed_dev_data(&state).await.expect("seeding should succeed");
        seed_dev_data(&state)
            .await
            .expect("repeat seeding should succeed");
    }
}
