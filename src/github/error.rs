//! Error types exposed by the GitHub integration layer.

use thiserror::Error;

/// Substrings that mark an error message as an installation-token failure.
///
/// GitHub phrases credential rejections inconsistently across endpoints, so
/// the classification matches on the raw error text rather than relying on
/// the status code alone.
const AUTH_FAILURE_MARKERS: [&str; 3] = ["expired", "invalid", "bad credentials"];

/// Errors surfaced while validating input or communicating with GitHub.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GithubError {
    /// A repository full name did not match the `owner/repo` shape.
    #[error("repository name must match owner/repo, got: {name}")]
    InvalidRepositoryName {
        /// The rejected full name.
        name: String,
    },

    /// The provided URL could not be parsed.
    #[error("GitHub URL is invalid: {0}")]
    InvalidUrl(String),

    /// The pull request number is not a valid positive integer.
    #[error("pull request number must be a positive integer")]
    InvalidPullRequestNumber,

    /// GitHub rejected the credentials presented with a request.
    #[error("GitHub rejected the token: {message}")]
    Authentication {
        /// GitHub error message returned with the 401/403 response.
        message: String,
    },

    /// GitHub returned a non-authentication API error.
    #[error("GitHub API error: {message}")]
    Api {
        /// Response body from GitHub describing the failure.
        message: String,
    },

    /// Networking failed while calling GitHub.
    #[error("network error talking to GitHub: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// The GitHub App credentials are missing or malformed.
    #[error("GitHub App configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },
}

impl GithubError {
    /// Reports whether this failure should be treated as an installation
    /// token problem, making the caller eligible to re-acquire a token and
    /// retry once.
    ///
    /// A plain `Authentication` variant always qualifies. Other variants
    /// qualify when their message carries one of the known credential-failure
    /// phrases, matched case-insensitively.
    #[must_use]
    pub fn indicates_auth_failure(&self) -> bool {
        match self {
            Self::Authentication { .. } => true,
            Self::Api { message } | Self::Network { message } => {
                let text = message.to_lowercase();
                AUTH_FAILURE_MARKERS
                    .iter()
                    .any(|marker| text.contains(marker))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::GithubError;

    #[rstest]
    #[case::authentication_variant(
        GithubError::Authentication { message: "401 Unauthorized".to_owned() },
        true
    )]
    #[case::expired_in_api_message(
        GithubError::Api { message: "GitHub token expired".to_owned() },
        true
    )]
    #[case::invalid_in_network_message(
        GithubError::Network { message: "Invalid credentials presented".to_owned() },
        true
    )]
    #[case::bad_credentials_mixed_case(
        GithubError::Api { message: "Bad Credentials".to_owned() },
        true
    )]
    #[case::unrelated_api_error(
        GithubError::Api { message: "Not Found".to_owned() },
        false
    )]
    #[case::unrelated_network_error(
        GithubError::Network { message: "connection reset by peer".to_owned() },
        false
    )]
    fn classifies_auth_failures(#[case] error: GithubError, #[case] expected: bool) {
        assert_eq!(
            error.indicates_auth_failure(),
            expected,
            "unexpected classification for {error:?}"
        );
    }
}
