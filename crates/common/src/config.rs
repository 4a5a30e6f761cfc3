//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Voting rules.
    #[serde(default)]
    pub voting: VotingConfig,
    /// Reserved administrator credentials.
    #[serde(default)]
    pub admin: AdminConfig,
    /// Image storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL (`PostgreSQL` in production).
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Voting rules shared by the vote recorder and the results aggregator.
#[derive(Debug, Clone, Deserialize)]
pub struct VotingConfig {
    /// How many nominees a voter may nominate per category in phase 1.
    #[serde(default = "default_nomination_cap")]
    pub nomination_cap: u32,
    /// How many top nominees are pre-selected as suggested finalists.
    #[serde(default = "default_finalist_suggestions")]
    pub finalist_suggestions: usize,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            nomination_cap: default_nomination_cap(),
            finalist_suggestions: default_finalist_suggestions(),
        }
    }
}

/// Reserved administrator identity.
///
/// When both fields are set, signing in with them yields an admin session
/// that has no backing user row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Admin email.
    #[serde(default)]
    pub email: Option<String>,
    /// Admin password.
    #[serde(default)]
    pub password: Option<String>,
}

/// Image storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory uploaded images are written to.
    #[serde(default = "default_storage_path")]
    pub base_path: PathBuf,
    /// URL prefix images are served from.
    #[serde(default = "default_storage_url")]
    pub base_url: String,
    /// Maximum accepted image size in bytes.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_storage_path(),
            base_url: default_storage_url(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_nomination_cap() -> u32 {
    2
}

const fn default_finalist_suggestions() -> usize {
    4
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./files")
}

fn default_storage_url() -> String {
    "/files".to_string()
}

const fn default_max_image_bytes() -> usize {
    5 * 1024 * 1024
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, exported into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `AWARDS_ENV`)
    /// 4. Environment variables with `AWARDS__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("AWARDS_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("AWARDS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("AWARDS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Returns the reserved admin credentials when both are configured.
    #[must_use]
    pub fn reserved_admin(&self) -> Option<(&str, &str)> {
        match (&self.admin.email, &self.admin.password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some((email.as_str(), password.as_str()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse(
            r#"
            [server]
            url = "http://localhost:3000"

            [database]
            url = "postgres://localhost/awards"
            "#,
        );

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.voting.nomination_cap, 2);
        assert_eq!(config.voting.finalist_suggestions, 4);
        assert_eq!(config.storage.max_image_bytes, 5 * 1024 * 1024);
        assert!(config.reserved_admin().is_none());
    }

    #[test]
    fn test_reserved_admin_requires_both_fields() {
        let config = parse(
            r#"
            [server]
            url = "http://localhost:3000"

            [database]
            url = "postgres://localhost/awards"

            [admin]
            email = "admin@example.com"
            "#,
        );
        assert!(config.reserved_admin().is_none());

        let config = parse(
            r#"
            [server]
            url = "http://localhost:3000"

            [database]
            url = "postgres://localhost/awards"

            [admin]
            email = "admin@example.com"
            password = "hunter22"
            "#,
        );
        assert_eq!(
            config.reserved_admin(),
            Some(("admin@example.com", "hunter22"))
        );
    }
}
