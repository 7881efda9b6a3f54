//! Identity wrappers and locators for GitHub repositories and pull requests.

use url::Url;

use super::error::GithubError;

/// Repository owner wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOwner(String);

impl RepositoryOwner {
    pub(crate) fn new(value: &str, full_name: &str) -> Result<Self, GithubError> {
        if value.is_empty() {
            return Err(GithubError::InvalidRepositoryName {
                name: full_name.to_owned(),
            });
        }
        Ok(Self(value.to_owned()))
    }

    /// Borrow the owner value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository name wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryName(String);

impl RepositoryName {
    pub(crate) fn new(value: &str, full_name: &str) -> Result<Self, GithubError> {
        if value.is_empty() {
            return Err(GithubError::InvalidRepositoryName {
                name: full_name.to_owned(),
            });
        }
        Ok(Self(value.to_owned()))
    }

    /// Borrow the repository name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// GitHub App installation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstallationId(u64);

impl InstallationId {
    /// Wraps a raw installation identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Pull request number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullRequestNumber(u64);

impl PullRequestNumber {
    /// Validates that the number is positive.
    ///
    /// # Errors
    ///
    /// Returns `GithubError::InvalidPullRequestNumber` when the number is
    /// zero.
    pub const fn new(value: u64) -> Result<Self, GithubError> {
        if value == 0 {
            return Err(GithubError::InvalidPullRequestNumber);
        }
        Ok(Self(value))
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// A repository identified by owner and name against a fixed API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocator {
    api_base: Url,
    owner: RepositoryOwner,
    repository: RepositoryName,
}

impl RepositoryLocator {
    /// Parses a repository full name in the `owner/repo` form.
    ///
    /// # Errors
    ///
    /// Returns `GithubError::InvalidRepositoryName` when the full name does
    /// not consist of exactly two non-empty `/`-separated segments.
    pub fn parse_full_name(full_name: &str, api_base: &Url) -> Result<Self, GithubError> {
        let mut segments = full_name.split('/');

        let owner_segment = segments.next().unwrap_or_default();
        let repository_segment = segments.next().unwrap_or_default();

        if segments.next().is_some() {
            return Err(GithubError::InvalidRepositoryName {
                name: full_name.to_owned(),
            });
        }

        let owner = RepositoryOwner::new(owner_segment, full_name)?;
        let repository = RepositoryName::new(repository_segment, full_name)?;

        Ok(Self {
            api_base: api_base.clone(),
            owner,
            repository,
        })
    }

    /// API base URL the repository is addressed against.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Repository owner.
    #[must_use]
    pub const fn owner(&self) -> &RepositoryOwner {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        &self.repository
    }
}

/// A single pull request addressed through its repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestLocator {
    repository: RepositoryLocator,
    number: PullRequestNumber,
}

impl PullRequestLocator {
    /// Combines a repository locator with a pull request number.
    #[must_use]
    pub const fn new(repository: RepositoryLocator, number: PullRequestNumber) -> Self {
        Self { repository, number }
    }

    /// API base URL derived from the repository.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        self.repository.api_base()
    }

    /// Repository owner.
    #[must_use]
    pub const fn owner(&self) -> &RepositoryOwner {
        self.repository.owner()
    }

    /// Repository name.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        self.repository.repository()
    }

    /// Pull request number.
    #[must_use]
    pub const fn number(&self) -> PullRequestNumber {
        self.number
    }

    pub(crate) fn pull_request_path(&self) -> String {
        format!(
            "/repos/{}/{}/pulls/{}",
            self.owner().as_str(),
            self.repository().as_str(),
            self.number.get()
        )
    }
}
