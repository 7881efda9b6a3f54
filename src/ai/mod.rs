//! LLM provider gateway, prompt construction, reply parsing, and category
//! resolution.
//!
//! This module owns everything between "we have a diff" and "we have a
//! resolved category": dispatching to the configured provider through a
//! uniform [`ChatModel`] interface, rendering the strict prompt grammar,
//! parsing the model's free-text reply, and mapping the suggested name onto
//! a configured category.

pub mod error;
pub mod gateway;
pub mod parser;
pub mod prompt;
pub mod resolver;

pub use error::AiError;
pub use gateway::{
    AnthropicChatModel, ChatModel, ChatModelFactory, GoogleChatModel, ModelSettings,
    OpenAiChatModel, Provider, ProviderChatModelFactory,
};
pub use parser::{ParsedCategorization, parse_categorization};
pub use prompt::{ChatPrompt, PromptInputs, build_prompt};
pub use resolver::{resolve_category, similarity_score};

#[cfg(test)]
pub use gateway::{MockChatModel, MockChatModelFactory};
