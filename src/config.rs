use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub parental: ParentalConfig,

    pub accounts: AccountConfig,

    pub email: EmailConfig,

    pub scheduler: SchedulerConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/mirro.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Session inactivity expiry in minutes.
    pub session_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            secure_cookies: true,
            session_minutes: 60 * 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

/// PIN policy and age thresholds for minor accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParentalConfig {
    /// Exact number of digits a PIN must have.
    pub pin_length: usize,

    /// Consecutive failed verifications before the PIN gate locks.
    pub max_attempts: u32,

    /// How long the PIN gate stays locked once `max_attempts` is reached.
    pub lockout_seconds: u64,

    /// Lifetime of an emailed PIN reset link.
    pub reset_token_ttl_hours: i64,

    /// Age at which a minor account becomes an adult account.
    pub age_of_majority: u32,

    /// Registrations younger than this are rejected.
    pub minimum_age: u32,
}

impl Default for ParentalConfig {
    fn default() -> Self {
        Self {
            pin_length: 4,
            max_attempts: 5,
            lockout_seconds: 15 * 60,
            reset_token_ttl_hours: 24,
            age_of_majority: 18,
            minimum_age: 13,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub min_password_length: usize,

    pub password_reset_ttl_minutes: i64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            min_password_length: 8,
            password_reset_ttl_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// When disabled, outgoing mail is logged instead of sent.
    pub enabled: bool,

    /// Resend API key. `MIRRO_RESEND_API_KEY` overrides this value.
    pub resend_api_key: String,

    pub api_base_url: String,

    pub from: String,

    /// Base URL used to build links in emails (reset pages).
    pub public_base_url: String,

    pub support_address: String,

    pub request_timeout_seconds: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            resend_api_key: String::new(),
            api_base_url: "https://api.resend.com".to_string(),
            from: "noreply@mirro2.com".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            support_address: "mirrosocial@gmail.com".to_string(),
            request_timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    /// Six-field cron expression for purging expired and used reset tokens.
    pub token_purge_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token_purge_cron: "0 0 * * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            parental: ParentalConfig::default(),
            accounts: AccountConfig::default(),
            email: EmailConfig::default(),
            scheduler: SchedulerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("MIRRO_RESEND_API_KEY")
            && !key.trim().is_empty()
        {
            self.email.resend_api_key = key;
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("mirro").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".mirro").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.parental.pin_length < 4 {
            anyhow::bail!("parental.pin_length must be at least 4");
        }

        if self.parental.max_attempts == 0 {
            anyhow::bail!("parental.max_attempts must be > 0");
        }

        if self.parental.reset_token_ttl_hours <= 0 {
            anyhow::bail!("parental.reset_token_ttl_hours must be > 0");
        }

        if self.parental.minimum_age >= self.parental.age_of_majority {
            anyhow::bail!("parental.minimum_age must be below parental.age_of_majority");
        }

        if self.accounts.password_reset_ttl_minutes <= 0 {
            anyhow::bail!("accounts.password_reset_ttl_minutes must be > 0");
        }

        if self.email.enabled {
            if self.email.from.trim().is_empty() {
                anyhow::bail!("email.from cannot be empty when email is enabled");
            }
            if self.email.resend_api_key.trim().is_empty() {
                anyhow::bail!("email.resend_api_key must be set when email is enabled");
            }
            url::Url::parse(&self.email.api_base_url).context("Invalid email.api_base_url")?;
        }

        url::Url::parse(&self.email.public_base_url).context("Invalid email.public_base_url")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.parental.pin_length, 4);
        assert_eq!(config.parental.max_attempts, 5);
        assert_eq!(config.parental.lockout_seconds, 900);
        assert_eq!(config.parental.age_of_majority, 18);
        assert!(!config.email.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[parental]"));
        assert!(toml_str.contains("[email]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [parental]
            max_attempts = 3
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.parental.max_attempts, 3);

        assert_eq!(config.parental.lockout_seconds, 900);
        assert_eq!(config.email.api_base_url, "https://api.resend.com");
    }

    #[test]
    fn test_validate_rejects_bad_policy() {
        let mut config = Config::default();
        config.parental.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.parental.pin_length = 3;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.email.enabled = true;
        config.email.resend_api_key = String::new();
        assert!(config.validate().is_err());
    }
}
