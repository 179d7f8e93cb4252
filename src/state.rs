use std::sync::Arc;

use crate::clients::email::{LogMailer, Mailer, ResendClient};
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountService, EventService, ModerationService, Notifier, ParentalService, SeaOrmAccountService,
    SeaOrmEventService, SeaOrmParentalService, SeaOrmSocialService, SecretHasher, SocialService,
};

/// Picks the mail transport from config: Resend when enabled, log-only otherwise.
pub fn build_mailer(config: &Config) -> anyhow::Result<Arc<dyn Mailer>> {
    if config.email.enabled {
        Ok(Arc::new(ResendClient::new(&config.email)?))
    } else {
        Ok(Arc::new(LogMailer))
    }
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub parental: Arc<dyn ParentalService>,

    pub accounts: Arc<dyn AccountService>,

    pub social: Arc<dyn SocialService>,

    pub moderation: Arc<dyn ModerationService>,

    pub events: Arc<dyn EventService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let mailer = build_mailer(&config)?;
        Self::with_mailer(config, mailer).await
    }

    /// Builds the state around an explicit mail transport.
    pub async fn with_mailer(config: Config, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let hasher = SecretHasher::new(config.security.clone());
        let notifier = Arc::new(Notifier::new(mailer, config.email.clone()));

        let parental: Arc<dyn ParentalService> = Arc::new(SeaOrmParentalService::new(
            store.clone(),
            hasher.clone(),
            config.parental.clone(),
            notifier.clone(),
        ));

        let accounts: Arc<dyn AccountService> = Arc::new(SeaOrmAccountService::new(
            store.clone(),
            hasher,
            config.accounts.clone(),
            config.parental.clone(),
            parental.clone(),
            notifier,
        ));

        let social_impl = Arc::new(SeaOrmSocialService::new(store.clone()));
        let social: Arc<dyn SocialService> = social_impl.clone();
        let moderation: Arc<dyn ModerationService> = social_impl;

        let events: Arc<dyn EventService> =
            Arc::new(SeaOrmEventService::new(store.clone(), parental.clone()));

        Ok(Self {
            config: Arc::new(config),
            store,
            parental,
            accounts,
            social,
            moderation,
            events,
        })
    }
}
