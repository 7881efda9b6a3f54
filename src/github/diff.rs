//! Pull request diff retrieval through the GitHub pulls API.

use async_trait::async_trait;
use http::header::{ACCEPT, HeaderMap, HeaderValue};
use http::{StatusCode, Uri};

use super::client::{
    build_token_client, extract_github_message, map_http_error, map_octocrab_error,
};
use super::error::GithubError;
use super::locator::PullRequestLocator;
use super::token::InstallationToken;

const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";

/// Gateway that can load a pull request's unified diff.
///
/// Implementations never retry; the retry policy for rejected tokens lives
/// with the caller, which alone decides whether to re-acquire and try again.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiffGateway: Send + Sync {
    /// Fetch the unified diff for the pull request.
    async fn fetch_diff(
        &self,
        locator: &PullRequestLocator,
        token: &InstallationToken,
    ) -> Result<String, GithubError>;
}

/// Octocrab-backed diff gateway.
///
/// A fresh client is constructed per call because the bearer token can
/// change between calls when the token cache rotates.
#[derive(Debug, Default, Clone, Copy)]
pub struct OctocrabDiffGateway;

impl OctocrabDiffGateway {
    /// Creates the gateway.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DiffGateway for OctocrabDiffGateway {
    async fn fetch_diff(
        &self,
        locator: &PullRequestLocator,
        token: &InstallationToken,
    ) -> Result<String, GithubError> {
        let client = build_token_client(token.secret(), locator.api_base().as_str())?;

        let uri: Uri = locator
            .pull_request_path()
            .parse::<Uri>()
            .map_err(|error| GithubError::InvalidUrl(error.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(DIFF_MEDIA_TYPE));

        let response = client
            ._get_with_headers(uri, Some(headers))
            .await
            .map_err(|error| map_octocrab_error("fetch diff", &error))?;

        let status = response.status();
        if status == StatusCode::OK {
            return client
                .body_to_string(response)
                .await
                .map_err(|error| GithubError::Api {
                    message: format!("diff response decode failed: {error}"),
                });
        }

        let body = client
            .body_to_string(response)
            .await
            .unwrap_or_else(|_| String::new());

        Err(map_http_error(
            "fetch diff",
            status,
            extract_github_message(&body),
        ))
    }
}
