//! Octocrab client construction and error mapping shared by the GitHub
//! gateway implementations.

use http::{StatusCode, Uri};
use octocrab::Octocrab;

use super::error::GithubError;

/// Builds an Octocrab client authenticated with an installation access token.
///
/// # Errors
///
/// Returns `GithubError::InvalidUrl` when the base URI cannot be parsed or
/// `GithubError::Api` when Octocrab fails to construct a client.
pub(super) fn build_token_client(token: &str, api_base: &str) -> Result<Octocrab, GithubError> {
    let base_uri: Uri = api_base
        .parse::<Uri>()
        .map_err(|error| GithubError::InvalidUrl(error.to_string()))?;

    Octocrab::builder()
        .personal_token(token.to_owned())
        .base_uri(base_uri)
        .map_err(|error| GithubError::Api {
            message: format!("build client failed: {error}"),
        })?
        .build()
        .map_err(|error| map_octocrab_error("build client", &error))
}

/// Checks if a GitHub error status indicates an authentication failure.
pub(super) const fn is_auth_status(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Checks if an octocrab error represents a network/transport issue.
const fn is_network_error(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::Http { .. }
            | octocrab::Error::Hyper { .. }
            | octocrab::Error::Service { .. }
    )
}

pub(super) fn map_octocrab_error(operation: &str, error: &octocrab::Error) -> GithubError {
    if let octocrab::Error::GitHub { source, .. } = error {
        return if is_auth_status(source.status_code) {
            GithubError::Authentication {
                message: format!(
                    "{operation} failed: GitHub returned {status} {message}",
                    status = source.status_code,
                    message = source.message
                ),
            }
        } else {
            GithubError::Api {
                message: format!(
                    "{operation} failed with status {status}: {message}",
                    status = source.status_code,
                    message = source.message
                ),
            }
        };
    }

    if is_network_error(error) {
        return GithubError::Network {
            message: format!("{operation} failed: {error}"),
        };
    }

    GithubError::Api {
        message: format!("{operation} failed: {error}"),
    }
}

pub(super) fn map_http_error(
    operation: &str,
    status: StatusCode,
    maybe_message: Option<String>,
) -> GithubError {
    let message = maybe_message.unwrap_or_else(|| "unknown error".to_owned());
    if is_auth_status(status) {
        GithubError::Authentication {
            message: format!("{operation} failed: GitHub returned {status} {message}"),
        }
    } else {
        GithubError::Api {
            message: format!("{operation} failed with status {status}: {message}"),
        }
    }
}

pub(super) fn extract_github_message(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return None;
    };
    value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
}
