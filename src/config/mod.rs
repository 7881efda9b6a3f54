//! Application configuration loaded from CLI, environment, and files.
//!
//! This module provides a unified configuration struct that merges values
//! from command-line arguments, environment variables, and configuration
//! files using ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.pigeonhole.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `PIGEONHOLE_DATABASE_URL` and friends
//! 4. **Command-line arguments** – `--database-url`, `--migrate-db`, ...
//!
//! # Configuration File
//!
//! Place `.pigeonhole.toml` in the current directory, home directory, or
//! XDG config directory with:
//!
//! ```toml
//! database_url = "pigeonhole.sqlite"
//! bind_address = "127.0.0.1:8080"
//! github_app_id = 12345
//! github_private_key_path = "pigeonhole-app.pem"
//! ```

use std::fs;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::github::{GithubAppCredentials, GithubError};
use crate::persistence::PersistenceError;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Environment Variables
///
/// - `PIGEONHOLE_DATABASE_URL` or `--database-url`: `SQLite` database path
/// - `PIGEONHOLE_BIND_ADDRESS` or `--bind-address`: HTTP listen address
/// - `PIGEONHOLE_API_TOKEN` or `--api-token`: static bearer token for the
///   categorization endpoint
/// - `PIGEONHOLE_GITHUB_APP_ID` or `--github-app-id`: GitHub App identifier
/// - `PIGEONHOLE_GITHUB_PRIVATE_KEY` / `PIGEONHOLE_GITHUB_PRIVATE_KEY_PATH`:
///   the App's RSA private key, inline or as a file path
/// - `PIGEONHOLE_GITHUB_API_BASE` or `--github-api-base`: API base override
///   for GitHub Enterprise deployments
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "PIGEONHOLE",
    discovery(
        dotfile_name = ".pigeonhole.toml",
        config_file_name = "pigeonhole.toml",
        app_name = "pigeonhole"
    )
)]
pub struct PigeonholeConfig {
    /// Local `SQLite` database URL/path used for persistence.
    ///
    /// Diesel uses a filesystem path for `SQLite` connections. The same value
    /// is also used by the Diesel CLI via `DATABASE_URL` when running
    /// migrations.
    #[ortho_config(cli_short = 'd')]
    pub database_url: Option<String>,

    /// Runs database migrations and exits.
    ///
    /// When set, the service initialises the database at `database_url`,
    /// applies any pending Diesel migrations, records the schema version in
    /// telemetry, and exits without serving requests.
    #[ortho_config()]
    pub migrate_db: bool,

    /// Address the HTTP server binds to. Defaults to `127.0.0.1:8080`.
    #[ortho_config(cli_short = 'b')]
    pub bind_address: String,

    /// Static bearer token required on categorization requests.
    ///
    /// When unset the endpoint is open; session handling is expected to live
    /// in front of this service.
    #[ortho_config()]
    pub api_token: Option<String>,

    /// Numeric GitHub App identifier used for the App JWT exchange.
    #[ortho_config()]
    pub github_app_id: Option<u64>,

    /// PEM-encoded RSA private key for the GitHub App, inline.
    ///
    /// Takes precedence over `github_private_key_path` when both are set.
    #[ortho_config()]
    pub github_private_key: Option<String>,

    /// Path to the GitHub App's PEM-encoded RSA private key.
    #[ortho_config()]
    pub github_private_key_path: Option<Utf8PathBuf>,

    /// GitHub API base URL override for Enterprise deployments.
    #[ortho_config()]
    pub github_api_base: Option<String>,
}

impl Default for PigeonholeConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            migrate_db: false,
            bind_address: DEFAULT_BIND_ADDRESS.to_owned(),
            api_token: None,
            github_app_id: None,
            github_private_key: None,
            github_private_key_path: None,
            github_api_base: None,
        }
    }
}

impl PigeonholeConfig {
    /// Returns the database URL or an error if missing.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::MissingDatabaseUrl`] when no source
    /// provided a value.
    pub fn require_database_url(&self) -> Result<&str, PersistenceError> {
        self.database_url
            .as_deref()
            .ok_or(PersistenceError::MissingDatabaseUrl)
    }

    /// Resolves the GitHub API base, defaulting to the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`GithubError::InvalidUrl`] when the configured override is
    /// not a valid URL.
    pub fn github_api_base(&self) -> Result<Url, GithubError> {
        let base = self
            .github_api_base
            .as_deref()
            .unwrap_or(DEFAULT_GITHUB_API_BASE);
        Url::parse(base).map_err(|error| GithubError::InvalidUrl(error.to_string()))
    }

    /// Resolves the GitHub App credentials from inline or file sources.
    ///
    /// # Errors
    ///
    /// Returns [`GithubError::Configuration`] when the App id is missing, no
    /// key source is configured, or the key file cannot be read. A missing
    /// or malformed App credential is fatal; nothing in the pipeline retries
    /// it.
    pub fn github_app_credentials(&self) -> Result<GithubAppCredentials, GithubError> {
        let app_id = self.github_app_id.ok_or_else(|| GithubError::Configuration {
            message: "GitHub App id is required (use --github-app-id or \
                      PIGEONHOLE_GITHUB_APP_ID)"
                .to_owned(),
        })?;

        let private_key_pem = self.resolve_private_key()?;

        Ok(GithubAppCredentials {
            app_id,
            private_key_pem,
        })
    }

    fn resolve_private_key(&self) -> Result<String, GithubError> {
        if let Some(inline) = &self.github_private_key {
            return Ok(inline.clone());
        }

        let Some(path) = &self.github_private_key_path else {
            return Err(GithubError::Configuration {
                message: "GitHub App private key is required (use \
                          PIGEONHOLE_GITHUB_PRIVATE_KEY or \
                          --github-private-key-path)"
                    .to_owned(),
            });
        };

        fs::read_to_string(path.as_std_path()).map_err(|error| GithubError::Configuration {
            message: format!("failed to read GitHub App private key from {path}: {error}"),
        })
    }
}

#[cfg(test)]
mod tests;
