//! Configuration module
//!
//! Configuration is read from the process environment (after loading an optional
//! `.env` file). Every setting has a default except `DATABASE_URL`.

use std::env;
use std::time::Duration;

// Common constants
const SERVER_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const BATCH_WORKERS: usize = 3;
const BATCH_POLL_INTERVAL_MS: u64 = 1000;
const BATCH_MAX_DOCUMENTS: usize = 50;
const BATCH_TASK_RETENTION_SECS: u64 = 86_400;
const BATCH_RETENTION_SWEEP_SECS: u64 = 300;
const BATCH_SHUTDOWN_GRACE_SECS: u64 = 30;

/// Server and database settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Number of reverse proxies whose `X-Forwarded-For` entries are trusted.
    pub trusted_proxy_count: usize,
    pub log_format: String,
}

/// Batch metadata engine settings
#[derive(Clone, Debug)]
pub struct BatchConfig {
    pub workers: usize,
    pub poll_interval_ms: u64,
    pub max_documents: usize,
    /// 0 = no per-task timeout.
    pub task_timeout_secs: u64,
    /// 0 = finished tasks are kept for the lifetime of the process.
    pub task_retention_secs: u64,
    pub retention_sweep_secs: u64,
    pub shutdown_grace_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: BATCH_WORKERS,
            poll_interval_ms: BATCH_POLL_INTERVAL_MS,
            max_documents: BATCH_MAX_DOCUMENTS,
            task_timeout_secs: 0,
            task_retention_secs: BATCH_TASK_RETENTION_SECS,
            retention_sweep_secs: BATCH_RETENTION_SWEEP_SECS,
            shutdown_grace_secs: BATCH_SHUTDOWN_GRACE_SECS,
        }
    }
}

impl BatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        (self.task_timeout_secs > 0).then(|| Duration::from_secs(self.task_timeout_secs))
    }

    pub fn task_retention(&self) -> Option<Duration> {
        (self.task_retention_secs > 0).then(|| Duration::from_secs(self.task_retention_secs))
    }

    pub fn retention_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.retention_sweep_secs.max(1))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub batch: BatchConfig,
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let base = BaseConfig {
            server_port: match var("PORT") {
                Some(port) => port
                    .parse()
                    .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
                None => SERVER_PORT,
            },
            environment,
            database_url: var("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: parse_or(&var, "DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            trusted_proxy_count: parse_or(&var, "TRUSTED_PROXY_COUNT", 0),
            log_format: var("LOG_FORMAT")
                .unwrap_or_else(|| "text".to_string())
                .to_lowercase(),
        };

        let batch = BatchConfig {
            workers: parse_or(&var, "BATCH_WORKERS", BATCH_WORKERS),
            poll_interval_ms: parse_or(&var, "BATCH_POLL_INTERVAL_MS", BATCH_POLL_INTERVAL_MS),
            max_documents: parse_or(&var, "BATCH_MAX_DOCUMENTS", BATCH_MAX_DOCUMENTS),
            task_timeout_secs: parse_or(&var, "BATCH_TASK_TIMEOUT_SECS", 0),
            task_retention_secs: parse_or(
                &var,
                "BATCH_TASK_RETENTION_SECS",
                BATCH_TASK_RETENTION_SECS,
            ),
            retention_sweep_secs: parse_or(
                &var,
                "BATCH_RETENTION_SWEEP_SECS",
                BATCH_RETENTION_SWEEP_SECS,
            ),
            shutdown_grace_secs: parse_or(
                &var,
                "BATCH_SHUTDOWN_GRACE_SECS",
                BATCH_SHUTDOWN_GRACE_SECS,
            ),
        };

        let config = Config { base, batch };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let url = &self.base.database_url;
        if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.batch.workers == 0 {
            return Err(anyhow::anyhow!("BATCH_WORKERS must be at least 1"));
        }

        if self.batch.max_documents == 0 {
            return Err(anyhow::anyhow!("BATCH_MAX_DOCUMENTS must be at least 1"));
        }

        if self.batch.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("BATCH_POLL_INTERVAL_MS must be greater than 0"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn database_url(&self) -> &str {
        &self.base.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.base.db_timeout_seconds
    }

    pub fn trusted_proxy_count(&self) -> usize {
        self.base.trusted_proxy_count
    }

    pub fn json_logs(&self) -> bool {
        self.base.log_format == "json"
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    var(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/docket")]).unwrap();
        assert_eq!(config.server_port(), 4000);
        assert_eq!(config.batch.workers, 3);
        assert_eq!(config.batch.max_documents, 50);
        assert_eq!(config.batch.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.batch.task_timeout(), None);
        assert_eq!(
            config.batch.task_retention(),
            Some(Duration::from_secs(86_400))
        );
        assert!(!config.is_production());
    }

    #[test]
    fn database_url_is_required() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("DATABASE_URL", "mysql://localhost/db")]).is_err());
    }

    #[test]
    fn zero_workers_rejected() {
        let result = config_from(&[
            ("DATABASE_URL", "postgresql://localhost/docket"),
            ("BATCH_WORKERS", "0"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("DATABASE_URL", "postgresql://localhost/docket"),
            ("PORT", "8080"),
            ("ENVIRONMENT", "Production"),
            ("BATCH_WORKERS", "8"),
            ("BATCH_TASK_TIMEOUT_SECS", "120"),
            ("BATCH_TASK_RETENTION_SECS", "0"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();
        assert_eq!(config.server_port(), 8080);
        assert_eq!(config.batch.workers, 8);
        assert_eq!(config.batch.task_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.batch.task_retention(), None);
        assert!(config.is_production());
        assert!(config.json_logs());
    }

    #[test]
    fn unparseable_numbers_fall_back_to_defaults() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/docket"),
            ("BATCH_MAX_DOCUMENTS", "lots"),
        ])
        .unwrap();
        assert_eq!(config.batch.max_documents, 50);
    }

    #[test]
    fn invalid_port_is_an_error() {
        let result = config_from(&[
            ("DATABASE_URL", "postgres://localhost/docket"),
            ("PORT", "eighty"),
        ]);
        assert!(result.is_err());
    }
}
