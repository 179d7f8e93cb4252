use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::event::{EventRecord, EventUpdate, GalleryItem, NewEvent};
pub use repositories::moderation::{NewReport, ReportRecord};
pub use repositories::parental::{ParentalSettings, SettingsUpdate};
pub use repositories::user::{NewUser, User};

/// Formats a timestamp the way every table stores it: second precision, `Z`
/// suffix, so string order matches time order.
#[must_use]
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // Each in-memory connection would otherwise be its own database.
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn users(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn parental(&self) -> repositories::parental::ParentalRepository {
        repositories::parental::ParentalRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn password_resets(&self) -> repositories::token::PasswordResetRepository {
        repositories::token::PasswordResetRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn social(&self) -> repositories::social::SocialRepository {
        repositories::social::SocialRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn moderation(&self) -> repositories::moderation::ModerationRepository {
        repositories::moderation::ModerationRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn events(&self) -> repositories::event::EventRepository {
        repositories::event::EventRepository::new(self.conn.clone())
    }

    /// Deletes expired or redeemed reset tokens of both kinds.
    /// Returns the number of rows removed.
    pub async fn purge_reset_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let pin = self.parental().purge_reset_tokens(now).await?;
        let password = self.password_resets().purge(now).await?;
        Ok(pin + password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_sort_lexicographically() {
        let a = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let b = a + chrono::Duration::milliseconds(1500);
        assert_eq!(timestamp(a), "2026-01-02T03:04:05Z");
        assert!(timestamp(a) < timestamp(b));
        assert_eq!(parse_timestamp(&timestamp(a)), Some(a));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
