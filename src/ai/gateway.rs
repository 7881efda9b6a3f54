//! Uniform gateway over the supported LLM providers.
//!
//! Each provider gets its own implementation of the [`ChatModel`] trait with
//! the same `generate(system, user) -> text` capability, so callers depend
//! only on the interface and never branch on a provider tag at call sites.
//! Construction is the only place the provider set is enumerated, inside
//! [`ProviderChatModelFactory`].

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::AiError;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// The closed set of supported model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// OpenAI chat completions API.
    OpenAi,
    /// Google Gemini `generateContent` API.
    Google,
    /// Anthropic messages API.
    Anthropic,
}

impl Provider {
    /// Returns the canonical configuration tag for this provider.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Google => "google",
            Self::Anthropic => "anthropic",
        }
    }
}

impl FromStr for Provider {
    type Err = AiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "openai" => Ok(Self::OpenAi),
            "google" => Ok(Self::Google),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(AiError::Configuration {
                message: format!("unsupported AI provider: {other}"),
            }),
        }
    }
}

/// Fully resolved model selection for one organization.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Which provider to dispatch to.
    pub provider: Provider,
    /// Provider-specific model identifier.
    pub model: String,
    /// API key presented to the provider.
    pub api_key: String,
}

/// A model that can turn a system/user prompt pair into text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generates a completion for the given prompts.
    async fn generate(&self, system: &str, user: &str) -> Result<String, AiError>;
}

/// Factory that builds a [`ChatModel`] from an organization's settings.
#[cfg_attr(test, mockall::automock)]
pub trait ChatModelFactory: Send + Sync {
    /// Constructs the provider-specific model client.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Configuration`] when the API key or model
    /// identifier is unusable or the HTTP client cannot be constructed.
    fn build(&self, settings: &ModelSettings) -> Result<Box<dyn ChatModel>, AiError>;
}

/// Default factory dispatching over the closed provider set.
#[derive(Debug, Default, Clone)]
pub struct ProviderChatModelFactory {
    base_url_override: Option<String>,
}

impl ProviderChatModelFactory {
    /// Creates a factory targeting each provider's public endpoint.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base_url_override: None,
        }
    }

    /// Points every constructed client at the given base URL instead of the
    /// provider's public endpoint (proxies, test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }
}

impl ChatModelFactory for ProviderChatModelFactory {
    fn build(&self, settings: &ModelSettings) -> Result<Box<dyn ChatModel>, AiError> {
        match settings.provider {
            Provider::OpenAi => {
                let mut model = OpenAiChatModel::new(&settings.api_key, &settings.model)?;
                if let Some(base_url) = &self.base_url_override {
                    model = model.with_base_url(base_url);
                }
                Ok(Box::new(model))
            }
            Provider::Google => {
                let mut model = GoogleChatModel::new(&settings.api_key, &settings.model)?;
                if let Some(base_url) = &self.base_url_override {
                    model = model.with_base_url(base_url);
                }
                Ok(Box::new(model))
            }
            Provider::Anthropic => {
                let mut model = AnthropicChatModel::new(&settings.api_key, &settings.model)?;
                if let Some(base_url) = &self.base_url_override {
                    model = model.with_base_url(base_url);
                }
                Ok(Box::new(model))
            }
        }
    }
}

fn build_http_client() -> Result<Client, AiError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|error| AiError::Configuration {
            message: format!("failed to build HTTP client: {error}"),
        })
}

fn validate_credentials(
    provider: Provider,
    api_key: &str,
    model: &str,
) -> Result<(), AiError> {
    if api_key.trim().is_empty() {
        return Err(AiError::Configuration {
            message: format!(
                "{provider} API key must not be blank",
                provider = provider.as_str()
            ),
        });
    }
    if model.trim().is_empty() {
        return Err(AiError::Configuration {
            message: format!(
                "{provider} model identifier must not be blank",
                provider = provider.as_str()
            ),
        });
    }
    Ok(())
}

/// Extracts a human-readable message from a provider error body.
///
/// Providers wrap failures differently (`error.message`, bare `message`);
/// the raw body is surfaced when neither shape matches so no diagnostics are
/// lost.
fn extract_provider_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|error| error.get("message"))
        .or_else(|| value.get("message"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
}

async fn invocation_error(provider: Provider, response: reqwest::Response) -> AiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = extract_provider_message(&body).unwrap_or(body);
    AiError::Invocation {
        message: format!(
            "{provider} returned {status}: {detail}",
            provider = provider.as_str()
        ),
    }
}

fn send_error(provider: Provider, error: &reqwest::Error) -> AiError {
    AiError::Invocation {
        message: format!(
            "{provider} request failed: {error}",
            provider = provider.as_str()
        ),
    }
}

fn decode_error(provider: Provider, error: &reqwest::Error) -> AiError {
    AiError::Invocation {
        message: format!(
            "{provider} response decode failed: {error}",
            provider = provider.as_str()
        ),
    }
}

fn empty_response_error(provider: Provider) -> AiError {
    AiError::Invocation {
        message: format!(
            "{provider} returned an empty response",
            provider = provider.as_str()
        ),
    }
}

// --- OpenAI ---

/// OpenAI chat completions client.
pub struct OpenAiChatModel {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiChatModel {
    /// Builds a client for the OpenAI chat completions API.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Configuration`] for a blank key or model id, or
    /// when the HTTP client cannot be constructed.
    pub fn new(api_key: &str, model: &str) -> Result<Self, AiError> {
        validate_credentials(Provider::OpenAi, api_key, model)?;
        Ok(Self {
            client: build_http_client()?,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            base_url: OPENAI_BASE_URL.to_owned(),
        })
    }

    #[must_use]
    fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    content: String,
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn generate(&self, system: &str, user: &str) -> Result<String, AiError> {
        let request = OpenAiRequest {
            model: &self.model,
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: system,
                },
                OpenAiMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{base}/chat/completions", base = self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|error| send_error(Provider::OpenAi, &error))?;

        if !response.status().is_success() {
            return Err(invocation_error(Provider::OpenAi, response).await);
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|error| decode_error(Provider::OpenAi, &error))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| empty_response_error(Provider::OpenAi))
    }
}

// --- Anthropic ---

/// Anthropic messages API client.
pub struct AnthropicChatModel {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicChatModel {
    /// Builds a client for the Anthropic messages API.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Configuration`] for a blank key or model id, or
    /// when the HTTP client cannot be constructed.
    pub fn new(api_key: &str, model: &str) -> Result<Self, AiError> {
        validate_credentials(Provider::Anthropic, api_key, model)?;
        Ok(Self {
            client: build_http_client()?,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            base_url: ANTHROPIC_BASE_URL.to_owned(),
        })
    }

    #[must_use]
    fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    text: String,
}

#[async_trait]
impl ChatModel for AnthropicChatModel {
    async fn generate(&self, system: &str, user: &str) -> Result<String, AiError> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: ANTHROPIC_MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: user,
            }],
        };

        let response = self
            .client
            .post(format!("{base}/messages", base = self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|error| send_error(Provider::Anthropic, &error))?;

        if !response.status().is_success() {
            return Err(invocation_error(Provider::Anthropic, response).await);
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|error| decode_error(Provider::Anthropic, &error))?;

        parsed
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| empty_response_error(Provider::Anthropic))
    }
}

// --- Google ---

/// Google Gemini `generateContent` client.
pub struct GoogleChatModel {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GoogleChatModel {
    /// Builds a client for the Gemini `generateContent` API.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Configuration`] for a blank key or model id, or
    /// when the HTTP client cannot be constructed.
    pub fn new(api_key: &str, model: &str) -> Result<Self, AiError> {
        validate_credentials(Provider::Google, api_key, model)?;
        Ok(Self {
            client: build_http_client()?,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            base_url: GOOGLE_BASE_URL.to_owned(),
        })
    }

    #[must_use]
    fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleRequest<'a> {
    system_instruction: GoogleContent<'a>,
    contents: Vec<GoogleContent<'a>>,
}

#[derive(Debug, Serialize)]
struct GoogleContent<'a> {
    parts: Vec<GooglePart<'a>>,
}

#[derive(Debug, Serialize)]
struct GooglePart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    candidates: Vec<GoogleCandidate>,
}

#[derive(Debug, Deserialize)]
struct GoogleCandidate {
    content: GoogleCandidateContent,
}

#[derive(Debug, Deserialize)]
struct GoogleCandidateContent {
    parts: Vec<GoogleCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GoogleCandidatePart {
    text: String,
}

#[async_trait]
impl ChatModel for GoogleChatModel {
    async fn generate(&self, system: &str, user: &str) -> Result<String, AiError> {
        let request = GoogleRequest {
            system_instruction: GoogleContent {
                parts: vec![GooglePart { text: system }],
            },
            contents: vec![GoogleContent {
                parts: vec![GooglePart { text: user }],
            }],
        };

        let response = self
            .client
            .post(format!(
                "{base}/models/{model}:generateContent",
                base = self.base_url,
                model = self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|error| send_error(Provider::Google, &error))?;

        if !response.status().is_success() {
            return Err(invocation_error(Provider::Google, response).await);
        }

        let parsed: GoogleResponse = response
            .json()
            .await
            .map_err(|error| decode_error(Provider::Google, &error))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| empty_response_error(Provider::Google))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{
        AiError, ChatModel, ChatModelFactory, ModelSettings, Provider, ProviderChatModelFactory,
    };

    fn settings(provider: Provider) -> ModelSettings {
        ModelSettings {
            provider,
            model: "model-x".to_owned(),
            api_key: "key-x".to_owned(),
        }
    }

    #[test]
    fn parses_supported_provider_tags() {
        assert_eq!("openai".parse::<Provider>(), Ok(Provider::OpenAi));
        assert_eq!("google".parse::<Provider>(), Ok(Provider::Google));
        assert_eq!("anthropic".parse::<Provider>(), Ok(Provider::Anthropic));
    }

    #[test]
    fn rejects_unknown_provider_tag() {
        let error = "mistral"
            .parse::<Provider>()
            .expect_err("unknown provider should fail");
        assert!(
            matches!(error, AiError::Configuration { ref message } if message.contains("mistral")),
            "expected Configuration naming the provider, got {error:?}"
        );
    }

    #[test]
    fn rejects_blank_api_key() {
        let factory = ProviderChatModelFactory::new();
        let error = factory
            .build(&ModelSettings {
                provider: Provider::OpenAi,
                model: "model-x".to_owned(),
                api_key: "  ".to_owned(),
            })
            .err()
            .expect("blank key should be rejected");

        assert!(
            matches!(error, AiError::Configuration { .. }),
            "expected Configuration, got {error:?}"
        );
    }

    #[test]
    fn rejects_blank_model_identifier() {
        let factory = ProviderChatModelFactory::new();
        let error = factory
            .build(&ModelSettings {
                provider: Provider::Anthropic,
                model: String::new(),
                api_key: "key".to_owned(),
            })
            .err()
            .expect("blank model should be rejected");

        assert!(
            matches!(error, AiError::Configuration { .. }),
            "expected Configuration, got {error:?}"
        );
    }

    #[tokio::test]
    async fn openai_generates_from_chat_completions() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer key-x"))
            .and(body_partial_json(serde_json::json!({"model": "model-x"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Category: Bug Fix\nConfidence: 0.9"}}]
            })))
            .mount(&server)
            .await;

        let model = ProviderChatModelFactory::new()
            .with_base_url(server.uri())
            .build(&settings(Provider::OpenAi))
            .expect("model should build");

        let text = model
            .generate("system prompt", "user prompt")
            .await
            .expect("generation should succeed");

        assert_eq!(text, "Category: Bug Fix\nConfidence: 0.9");
    }

    #[tokio::test]
    async fn anthropic_generates_from_messages() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "key-x"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "Category: Feature, Confidence: 0.8"}]
            })))
            .mount(&server)
            .await;

        let model = ProviderChatModelFactory::new()
            .with_base_url(server.uri())
            .build(&settings(Provider::Anthropic))
            .expect("model should build");

        let text = model
            .generate("system prompt", "user prompt")
            .await
            .expect("generation should succeed");

        assert_eq!(text, "Category: Feature, Confidence: 0.8");
    }

    #[tokio::test]
    async fn google_generates_from_generate_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/model-x:generateContent"))
            .and(header("x-goog-api-key", "key-x"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "Category: Docs\nConfidence: 0.7"}]}}]
            })))
            .mount(&server)
            .await;

        let model = ProviderChatModelFactory::new()
            .with_base_url(server.uri())
            .build(&settings(Provider::Google))
            .expect("model should build");

        let text = model
            .generate("system prompt", "user prompt")
            .await
            .expect("generation should succeed");

        assert_eq!(text, "Category: Docs\nConfidence: 0.7");
    }

    #[tokio::test]
    async fn provider_error_message_is_carried_verbatim() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "Rate limit reached for requests"}
            })))
            .mount(&server)
            .await;

        let model = ProviderChatModelFactory::new()
            .with_base_url(server.uri())
            .build(&settings(Provider::OpenAi))
            .expect("model should build");

        let error = model
            .generate("system prompt", "user prompt")
            .await
            .expect_err("429 should fail");

        assert!(
            matches!(
                error,
                AiError::Invocation { ref message }
                    if message.contains("Rate limit reached for requests")
            ),
            "expected Invocation carrying the provider message, got {error:?}"
        );
    }

    #[tokio::test]
    async fn empty_choice_list_is_an_invocation_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let model = ProviderChatModelFactory::new()
            .with_base_url(server.uri())
            .build(&settings(Provider::OpenAi))
            .expect("model should build");

        let error = model
            .generate("system prompt", "user prompt")
            .await
            .expect_err("empty choices should fail");

        assert!(
            matches!(error, AiError::Invocation { .. }),
            "expected Invocation, got {error:?}"
        );
    }
}
