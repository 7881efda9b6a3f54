//! Prompt construction for the categorization request.
//!
//! The system prompt enumerates the organization's categories as a
//! 1-indexed numbered list, in the exact order given, and pins the model to
//! a strict `Category:`/`Confidence:` reply grammar the parser can rely on.
//! Rendering is template-driven so the grammar lives in one place.

use minijinja::{Environment, context};

use super::error::AiError;

const SYSTEM_TEMPLATE: &str = r"You are an engineering analytics assistant for a GitHub dashboard. Classify a pull request into exactly one of the organization's investment areas.

The available categories are:
{% for category in categories %}{{ loop.index }}. {{ category }}
{% endfor %}
Select exactly one category from the list above and copy its name verbatim. Do not invent new categories and do not abbreviate or reword a name.

Respond strictly in the form:
Category: <exact name>
Confidence: <decimal between 0.0 and 1.0>

For example:
Category: {{ categories|first }}
Confidence: 0.85";

const USER_TEMPLATE: &str = r"Title: {{ title }}
Body: {{ body }}
Diff: {{ diff }}";

/// A rendered system/user prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    /// System prompt carrying the category list and reply grammar.
    pub system: String,
    /// User prompt carrying the pull request content.
    pub user: String,
}

/// Inputs required to render the categorization prompts.
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    /// Category names in their canonical order.
    pub categories: &'a [String],
    /// Pull request title.
    pub title: &'a str,
    /// Pull request description, when present.
    pub description: Option<&'a str>,
    /// Unified diff text.
    pub diff: &'a str,
}

/// Renders the system and user prompts for one categorization request.
///
/// Performs no I/O. The category list is validated non-empty by the caller;
/// an empty list surfaces here as a template failure rather than a panic.
///
/// # Errors
///
/// Returns [`AiError::Configuration`] when template rendering fails.
pub fn build_prompt(inputs: &PromptInputs<'_>) -> Result<ChatPrompt, AiError> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);

    env.add_template("system", SYSTEM_TEMPLATE)
        .map_err(|error| AiError::Configuration {
            message: format!("invalid prompt template: {error}"),
        })?;
    env.add_template("user", USER_TEMPLATE)
        .map_err(|error| AiError::Configuration {
            message: format!("invalid prompt template: {error}"),
        })?;

    let system = render(&env, "system", inputs)?;
    let user = render(&env, "user", inputs)?;

    Ok(ChatPrompt { system, user })
}

fn render(
    env: &Environment<'_>,
    name: &str,
    inputs: &PromptInputs<'_>,
) -> Result<String, AiError> {
    let template = env
        .get_template(name)
        .map_err(|error| AiError::Configuration {
            message: format!("failed to retrieve prompt template: {error}"),
        })?;

    template
        .render(context! {
            categories => inputs.categories,
            title => inputs.title,
            body => inputs.description.unwrap_or_default(),
            diff => inputs.diff,
        })
        .map_err(|error| AiError::Configuration {
            message: format!("prompt rendering failed: {error}"),
        })
}
