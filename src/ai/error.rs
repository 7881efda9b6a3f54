//! Error types exposed by the AI provider layer.

use thiserror::Error;

/// Errors surfaced while constructing or invoking a chat model.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AiError {
    /// The provider, model, or API key configuration is unusable.
    ///
    /// Not retried; the request is rejected before any model call happens.
    #[error("AI configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// The generation call itself failed (network, rate limit, provider
    /// error). Carries the provider's message verbatim for diagnostics.
    #[error("AI generation failed: {message}")]
    Invocation {
        /// Provider-reported failure detail.
        message: String,
    },
}
