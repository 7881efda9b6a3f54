//! Error taxonomy for the categorization pipeline.

use http::StatusCode;
use thiserror::Error;

use crate::persistence::PersistenceError;

/// Audit message persisted when the model reply does not match the grammar.
pub const PARSE_FAILURE_MESSAGE: &str = "Could not parse AI category response";

/// Terminal outcome of a failed categorization request.
///
/// Variants that occur before the run is marked `processing` never mutate
/// pull request state; everything else is written back to the row as
/// `ai_status = error` before being surfaced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CategorizeError {
    /// The requested pull request does not exist.
    #[error("pull request {pull_request_id} not found")]
    MissingPullRequest {
        /// Requested row id.
        pull_request_id: i64,
    },

    /// The pull request's repository does not exist.
    #[error("repository {repository_id} not found")]
    MissingRepository {
        /// Referenced repository id.
        repository_id: i64,
    },

    /// The repository's organization does not exist.
    #[error("organization {organization_id} not found")]
    MissingOrganization {
        /// Referenced organization id.
        organization_id: i64,
    },

    /// The organization has no GitHub App installation.
    #[error("organization {organization_id} has no GitHub App installation")]
    MissingInstallation {
        /// Organization lacking an installation.
        organization_id: i64,
    },

    /// The stored repository full name is not `owner/repo`.
    #[error("repository name must match owner/repo, got: {name}")]
    InvalidRepositoryName {
        /// The rejected full name.
        name: String,
    },

    /// Organization, provider, model, or API key misconfiguration.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the misconfiguration.
        message: String,
    },

    /// The diff could not be fetched, including after the one token-refresh
    /// retry.
    #[error("failed to fetch pull request diff: {message}")]
    DiffFetch {
        /// Detail from the GitHub layer.
        message: String,
    },

    /// Model construction or invocation failed.
    #[error("AI model error: {message}")]
    Model {
        /// Detail from the AI layer.
        message: String,
    },

    /// The model reply did not match the required grammar.
    #[error("{PARSE_FAILURE_MESSAGE}")]
    UnparseableResponse,

    /// The suggested category name matched nothing, exactly or fuzzily.
    #[error("suggested category not found: {suggestion}")]
    UnresolvedCategory {
        /// The name the model suggested.
        suggestion: String,
    },

    /// A store read or write failed.
    #[error("persistence error: {message}")]
    Persistence {
        /// Detail from the persistence layer.
        message: String,
    },
}

impl CategorizeError {
    /// HTTP status the error maps to at the service boundary.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingOrganization { .. }
            | Self::InvalidRepositoryName { .. }
            | Self::Configuration { .. }
            | Self::UnparseableResponse => StatusCode::BAD_REQUEST,
            Self::MissingPullRequest { .. }
            | Self::MissingRepository { .. }
            | Self::MissingInstallation { .. }
            | Self::UnresolvedCategory { .. } => StatusCode::NOT_FOUND,
            Self::DiffFetch { .. } | Self::Model { .. } | Self::Persistence { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<PersistenceError> for CategorizeError {
    fn from(error: PersistenceError) -> Self {
        Self::Persistence {
            message: error.to_string(),
        }
    }
}
