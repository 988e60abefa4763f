use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: Environment,
    pub storage: StorageBackend,
    pub request_timeout: Duration,
    /// Present when `storage` is `Postgres`.
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Full connection string; when set it takes precedence over the individual parts.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub ssl_mode: String,
    pub max_connections: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Local,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;
        if port == 0 {
            anyhow::bail!("PORT must be greater than 0");
        }

        let environment = match lookup("ENV").as_deref().unwrap_or("local") {
            "production" | "prod" => Environment::Production,
            _ => Environment::Local,
        };

        let storage = match lookup("STORAGE_BACKEND").as_deref().unwrap_or("postgres") {
            "postgres" | "postgresql" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            other => anyhow::bail!("STORAGE_BACKEND must be 'postgres' or 'memory', got '{}'", other),
        };

        let timeout_secs = lookup("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse::<u64>()
            .context("REQUEST_TIMEOUT_SECS must be a valid number of seconds")?;
        if timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than 0");
        }

        let database = match storage {
            StorageBackend::Postgres => Some(DatabaseConfig::from_lookup(&lookup)?),
            StorageBackend::Memory => None,
        };

        Ok(Config {
            port,
            environment,
            storage,
            request_timeout: Duration::from_secs(timeout_secs),
            database,
        })
    }
}

impl DatabaseConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<usize>()
            .context("DATABASE_MAX_CONNECTIONS must be a valid number")?;

        if let Some(url) = lookup("DATABASE_URL") {
            if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                anyhow::bail!("DATABASE_URL must start with 'postgresql://' or 'postgres://'");
            }

            let config = DatabaseConfig {
                url: Some(url),
                host: String::new(),
                port: 5432,
                database: String::new(),
                username: String::new(),
                password: String::new(),
                ssl_mode: "require".to_string(),
                max_connections,
            };
            config.validate()?;
            return Ok(config);
        }

        let port = lookup("DATABASE_PORT")
            .unwrap_or_else(|| "5432".to_string())
            .parse::<u16>()
            .context("DATABASE_PORT must be a valid port number")?;

        let config = DatabaseConfig {
            url: None,
            host: lookup("DATABASE_HOST").unwrap_or_else(|| "localhost".to_string()),
            port,
            database: lookup("DATABASE_NAME")
                .context("DATABASE_NAME environment variable is required")?,
            username: lookup("DATABASE_USERNAME")
                .context("DATABASE_USERNAME environment variable is required")?,
            password: lookup("DATABASE_PASSWORD")
                .context("DATABASE_PASSWORD environment variable is required")?,
            ssl_mode: lookup("DATABASE_SSL_MODE").unwrap_or_else(|| "require".to_string()),
            max_connections,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            anyhow::bail!("Max connections must be greater than 0");
        }

        if self.url.is_some() {
            return Ok(());
        }

        if self.host.trim().is_empty() {
            anyhow::bail!("Database host cannot be empty");
        }

        if self.port == 0 {
            anyhow::bail!("Database port must be greater than 0");
        }

        if self.database.trim().is_empty() {
            anyhow::bail!("Database name cannot be empty");
        }

        if self.username.trim().is_empty() {
            anyhow::bail!("Database username cannot be empty");
        }

        match self.ssl_mode.as_str() {
            "disable" | "prefer" | "require" => {}
            _ => anyhow::bail!("Invalid SSL mode. Must be one of: disable, prefer, require"),
        }

        Ok(())
    }

    /// Connection target for logs; never includes the password.
    pub fn describe(&self) -> String {
        match &self.url {
            Some(url) => {
                let target = url.rsplit('@').next().unwrap_or_default();
                format!("DATABASE_URL ({})", target)
            }
            None => format!("{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}
