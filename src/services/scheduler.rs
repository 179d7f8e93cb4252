use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::db::Store;

/// Background maintenance: purges expired and redeemed reset tokens.
pub struct Scheduler {
    store: Store,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(store: Store, config: SchedulerConfig) -> Self {
        Self {
            store,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        let mut sched = JobScheduler::new().await?;

        let store = self.store.clone();
        let running = Arc::clone(&self.running);
        let job = Job::new_async(self.config.token_purge_cron.as_str(), move |_uuid, _lock| {
            let store = store.clone();
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                if let Err(e) = purge_tokens(&store).await {
                    error!(event = "job_failed", job_name = "purge_tokens", error = %e, "Scheduled token purge failed");
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;
        info!("Token purge scheduled: {}", self.config.token_purge_cron);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}

/// One purge pass. Returns the number of tokens removed.
pub async fn purge_tokens(store: &Store) -> Result<u64> {
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = "purge_tokens", "Purging reset tokens");

    let removed = store.purge_reset_tokens(Utc::now()).await?;

    info!(
        event = "job_finished",
        job_name = "purge_tokens",
        removed,
        duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Token purge finished"
    );
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_scheduler_returns_immediately() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let config = SchedulerConfig {
            enabled: false,
            ..SchedulerConfig::default()
        };

        let scheduler = Scheduler::new(store, config);
        scheduler.start().await.unwrap();
        assert!(!scheduler.is_running().await);
    }

    #[tokio::test]
    async fn test_purge_removes_expired_and_used_tokens() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let user = store
            .users()
            .create(crate::db::NewUser {
                name: "Sam".to_string(),
                username: "sam".to_string(),
                email: "sam@example.com".to_string(),
                password_hash: "x".to_string(),
                date_of_birth: None,
                age_category: crate::domain::AgeCategory::Adult,
                guardian_email: None,
            })
            .await
            .unwrap();

        let resets = store.password_resets();
        let now = Utc::now();
        resets
            .issue(&user.id, "expired", now - chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(purge_tokens(&store).await.unwrap(), 1);

        resets
            .issue(&user.id, "live", now + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(purge_tokens(&store).await.unwrap(), 0);
        assert!(resets.find("live").await.unwrap().is_some());
    }
}
