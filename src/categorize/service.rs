//! Orchestration of one categorization run.
//!
//! A run is a strictly sequential chain: load and validate configuration,
//! mark the pull request as processing, fetch the diff (with at most one
//! token-refresh retry), prompt the model, parse the reply, resolve the
//! category, and persist the outcome. Every terminal failure after the
//! `processing` transition is written back to the pull request row before
//! being surfaced, so the dashboard can display what went wrong.

use std::sync::Arc;

use url::Url;

use crate::ai::{
    ChatModelFactory, ModelSettings, PromptInputs, Provider, build_prompt, parse_categorization,
    resolve_category,
};
use crate::github::{
    DiffGateway, GithubError, InstallationId, InstallationTokenCache, PullRequestLocator,
    PullRequestNumber, RepositoryLocator,
};
use crate::persistence::{
    CategorizationStore, CategoryRecord, PullRequestRecord, RepositoryRecord,
};

use super::error::CategorizeError;

/// Successful categorization result returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorizationOutcome {
    /// The resolved category record.
    pub category: CategoryRecord,
    /// Model-reported confidence, persisted as parsed (not clamped).
    pub confidence: f64,
}

/// Sequences the categorization pipeline for one pull request at a time.
pub struct CategorizationService {
    store: Arc<dyn CategorizationStore>,
    tokens: Arc<InstallationTokenCache>,
    diffs: Arc<dyn DiffGateway>,
    models: Arc<dyn ChatModelFactory>,
    api_base: Url,
}

impl CategorizationService {
    /// Wires the pipeline's collaborators together.
    #[must_use]
    pub const fn new(
        store: Arc<dyn CategorizationStore>,
        tokens: Arc<InstallationTokenCache>,
        diffs: Arc<dyn DiffGateway>,
        models: Arc<dyn ChatModelFactory>,
        api_base: Url,
    ) -> Self {
        Self {
            store,
            tokens,
            diffs,
            models,
            api_base,
        }
    }

    /// Runs one categorization request through to a terminal state.
    ///
    /// Precondition failures (missing records, missing AI configuration, no
    /// categories) reject the request without touching `ai_status`. Once the
    /// run is marked `processing` it always reaches `completed` or `error`.
    ///
    /// # Errors
    ///
    /// Returns a [`CategorizeError`] describing the terminal failure; see
    /// [`CategorizeError::status_code`] for the HTTP mapping.
    pub async fn categorize(
        &self,
        pull_request_id: i64,
    ) -> Result<CategorizationOutcome, CategorizeError> {
        let pull_request = self
            .store
            .find_pull_request(pull_request_id)?
            .ok_or(CategorizeError::MissingPullRequest { pull_request_id })?;

        let repository = self
            .store
            .find_repository(pull_request.repository_id)?
            .ok_or(CategorizeError::MissingRepository {
                repository_id: pull_request.repository_id,
            })?;

        let organization = self
            .store
            .find_organization(repository.organization_id)?
            .ok_or(CategorizeError::MissingOrganization {
                organization_id: repository.organization_id,
            })?;

        let installation = organization
            .installation_id
            .and_then(|raw| u64::try_from(raw).ok())
            .map(InstallationId::new)
            .ok_or(CategorizeError::MissingInstallation {
                organization_id: organization.id,
            })?;

        let settings = self.resolve_model_settings(organization.id)?;
        let locator = self.pull_request_locator(&repository, &pull_request)?;

        let categories = self.store.categories_for_organization(organization.id)?;
        if categories.is_empty() {
            return Err(CategorizeError::Configuration {
                message: "no categories configured for the organization".to_owned(),
            });
        }

        self.store.set_processing(pull_request_id)?;

        match self
            .run_pipeline(&pull_request, &locator, installation, &settings, &categories)
            .await
        {
            Ok(outcome) => {
                self.store.set_completed(
                    pull_request_id,
                    outcome.category.id,
                    outcome.confidence,
                )?;
                tracing::debug!(
                    "categorized pull request {pull_request_id} as {name}",
                    name = outcome.category.name
                );
                Ok(outcome)
            }
            Err(error) => {
                let message = error.to_string();
                if let Err(write_error) = self.store.set_error(pull_request_id, &message) {
                    tracing::warn!(
                        "failed to record categorization error for pull request \
                         {pull_request_id}: {write_error}"
                    );
                }
                Err(error)
            }
        }
    }

    async fn run_pipeline(
        &self,
        pull_request: &PullRequestRecord,
        locator: &PullRequestLocator,
        installation: InstallationId,
        settings: &ModelSettings,
        categories: &[CategoryRecord],
    ) -> Result<CategorizationOutcome, CategorizeError> {
        let diff = self.fetch_diff_with_retry(locator, installation).await?;

        let names: Vec<String> = categories
            .iter()
            .map(|category| category.name.clone())
            .collect();
        let prompt = build_prompt(&PromptInputs {
            categories: &names,
            title: &pull_request.title,
            description: pull_request.description.as_deref(),
            diff: &diff,
        })
        .map_err(|error| CategorizeError::Model {
            message: error.to_string(),
        })?;

        let model = self
            .models
            .build(settings)
            .map_err(|error| CategorizeError::Model {
                message: error.to_string(),
            })?;

        let reply = model
            .generate(&prompt.system, &prompt.user)
            .await
            .map_err(|error| CategorizeError::Model {
                message: error.to_string(),
            })?;

        let parsed =
            parse_categorization(&reply).ok_or(CategorizeError::UnparseableResponse)?;

        let category = resolve_category(&parsed.category_name, categories).ok_or_else(|| {
            CategorizeError::UnresolvedCategory {
                suggestion: parsed.category_name.clone(),
            }
        })?;

        Ok(CategorizationOutcome {
            category: category.clone(),
            confidence: parsed.confidence,
        })
    }

    /// Fetches the diff, refreshing the installation token and retrying
    /// exactly once when the failure looks like a rejected credential.
    async fn fetch_diff_with_retry(
        &self,
        locator: &PullRequestLocator,
        installation: InstallationId,
    ) -> Result<String, CategorizeError> {
        let token = self
            .tokens
            .get(installation)
            .await
            .map_err(diff_fetch_error)?;

        match self.diffs.fetch_diff(locator, &token).await {
            Ok(diff) => Ok(diff),
            Err(error) if error.indicates_auth_failure() => {
                tracing::debug!(
                    "installation token rejected, refreshing and retrying once: {error}"
                );
                self.tokens.invalidate(installation).await;
                let fresh = self
                    .tokens
                    .get(installation)
                    .await
                    .map_err(diff_fetch_error)?;
                self.diffs
                    .fetch_diff(locator, &fresh)
                    .await
                    .map_err(diff_fetch_error)
            }
            Err(error) => Err(diff_fetch_error(error)),
        }
    }

    fn resolve_model_settings(
        &self,
        organization_id: i64,
    ) -> Result<ModelSettings, CategorizeError> {
        let settings = self.store.ai_settings_for_organization(organization_id)?;

        let model = non_blank(settings.model).ok_or_else(|| CategorizeError::Configuration {
            message: "AI categorization is disabled: no model selected".to_owned(),
        })?;
        let provider_tag =
            non_blank(settings.provider).ok_or_else(|| CategorizeError::Configuration {
                message: "no AI provider configured".to_owned(),
            })?;
        let api_key = non_blank(settings.api_key).ok_or_else(|| CategorizeError::Configuration {
            message: "no AI API key configured".to_owned(),
        })?;

        let provider = provider_tag
            .parse::<Provider>()
            .map_err(|error| CategorizeError::Configuration {
                message: error.to_string(),
            })?;

        Ok(ModelSettings {
            provider,
            model,
            api_key,
        })
    }

    fn pull_request_locator(
        &self,
        repository: &RepositoryRecord,
        pull_request: &PullRequestRecord,
    ) -> Result<PullRequestLocator, CategorizeError> {
        let repository_locator =
            RepositoryLocator::parse_full_name(&repository.full_name, &self.api_base).map_err(
                |error| match error {
                    GithubError::InvalidRepositoryName { name } => {
                        CategorizeError::InvalidRepositoryName { name }
                    }
                    other => CategorizeError::Configuration {
                        message: other.to_string(),
                    },
                },
            )?;

        let number = u64::try_from(pull_request.number)
            .ok()
            .and_then(|value| PullRequestNumber::new(value).ok())
            .ok_or_else(|| CategorizeError::Configuration {
                message: format!(
                    "pull request number is invalid: {number}",
                    number = pull_request.number
                ),
            })?;

        Ok(PullRequestLocator::new(repository_locator, number))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|inner| !inner.trim().is_empty())
}

fn diff_fetch_error(error: GithubError) -> CategorizeError {
    CategorizeError::DiffFetch {
        message: error.to_string(),
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
