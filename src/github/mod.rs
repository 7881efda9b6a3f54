//! GitHub App authentication, installation token lifecycle, and diff intake.
//!
//! This module wraps Octocrab to exchange App credentials for installation
//! tokens, cache those tokens per installation, and retrieve pull request
//! diffs. Errors are mapped into variants that let callers distinguish
//! credential rejections (eligible for one token refresh and retry) from
//! everything else.

mod client;
pub mod error;
pub mod locator;

pub mod diff;
pub mod token;

pub use diff::{DiffGateway, OctocrabDiffGateway};
pub use error::GithubError;
pub use locator::{
    InstallationId, PullRequestLocator, PullRequestNumber, RepositoryLocator, RepositoryName,
    RepositoryOwner,
};
pub use token::{
    AppAuthenticator, GithubAppCredentials, InstallationToken, InstallationTokenCache,
    OctocrabAppAuthenticator,
};

#[cfg(test)]
pub use diff::MockDiffGateway;
#[cfg(test)]
pub use token::MockAppAuthenticator;

#[cfg(test)]
mod tests;
