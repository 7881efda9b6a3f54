//! HTTP surface for on-demand categorization requests.
//!
//! One authenticated GET endpoint triggers a categorization run and returns
//! a JSON envelope; a health route reports liveness. Everything else the
//! dashboard serves lives outside this service.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};

use crate::categorize::{CategorizationOutcome, CategorizationService};

/// Shared state handed to the request handlers.
pub struct ApiState {
    /// The categorization pipeline.
    pub service: Arc<CategorizationService>,
    /// Static bearer token required on categorization requests, when set.
    pub api_token: Option<String>,
}

/// Builds the service router.
#[must_use]
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/pull-requests/categorize", get(categorize))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Deserialize)]
struct CategorizeParams {
    pr_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct CategorySummary {
    id: i64,
    name: String,
    confidence: f64,
}

#[derive(Debug, Serialize)]
struct CategorizeSuccess {
    success: bool,
    category: CategorySummary,
    message: String,
}

#[derive(Debug, Serialize)]
struct CategorizeFailure {
    success: bool,
    error: String,
}

async fn categorize(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Query(params): Query<CategorizeParams>,
) -> Response {
    if let Some(expected) = &state.api_token
        && !is_authorized(&headers, expected)
    {
        return failure(StatusCode::UNAUTHORIZED, "authentication required");
    }

    let Some(raw_id) = params.pr_id else {
        return failure(StatusCode::BAD_REQUEST, "pr_id query parameter is required");
    };
    let Ok(pull_request_id) = raw_id.parse::<i64>() else {
        return failure(StatusCode::BAD_REQUEST, "pr_id must be an integer");
    };

    match state.service.categorize(pull_request_id).await {
        Ok(outcome) => success(&outcome),
        Err(error) => failure(error.status_code(), &error.to_string()),
    }
}

fn is_authorized(headers: &HeaderMap, expected_token: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {expected_token}"))
}

fn success(outcome: &CategorizationOutcome) -> Response {
    let body = CategorizeSuccess {
        success: true,
        category: CategorySummary {
            id: outcome.category.id,
            name: outcome.category.name.clone(),
            confidence: outcome.confidence,
        },
        message: format!(
            "Pull request categorized as {name}",
            name = outcome.category.name
        ),
    };
    (StatusCode::OK, axum::Json(body)).into_response()
}

fn failure(status: StatusCode, message: &str) -> Response {
    let body = CategorizeFailure {
        success: false,
        error: message.to_owned(),
    };
    (status, axum::Json(body)).into_response()
}

#[cfg(test)]
mod tests;
