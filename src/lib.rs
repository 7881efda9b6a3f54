//! Pigeonhole library crate providing AI-assisted pull request categorization.
//!
//! The library wraps Octocrab and a set of LLM provider clients to fetch a
//! pull request's diff, ask a configured model which investment area the
//! change belongs to, resolve the model's answer against the organization's
//! configured categories, and persist the outcome with an auditable status
//! lifecycle.

pub mod ai;
pub mod api;
pub mod categorize;
pub mod config;
pub mod github;
pub mod persistence;
pub mod telemetry;

pub use categorize::{CategorizationOutcome, CategorizationService, CategorizeError};
pub use config::PigeonholeConfig;
pub use github::{
    GithubAppCredentials, GithubError, InstallationId, InstallationTokenCache,
    OctocrabAppAuthenticator, OctocrabDiffGateway, PullRequestLocator, RepositoryLocator,
};
