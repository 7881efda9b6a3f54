//! Router tests exercising parameter validation, authentication, and the
//! JSON envelope.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use tower::ServiceExt;
use url::Url;

use super::{ApiState, router};
use crate::ai::MockChatModelFactory;
use crate::categorize::CategorizationService;
use crate::github::token::InstallationToken;
use crate::github::{InstallationTokenCache, MockAppAuthenticator, MockDiffGateway};
use crate::persistence::{
    AiSettings, AiStatus, CategoryRecord, MockCategorizationStore, OrganizationRecord,
    PullRequestRecord, RepositoryRecord,
};

fn idle_service() -> Arc<CategorizationService> {
    let tokens = Arc::new(InstallationTokenCache::new(Arc::new(
        MockAppAuthenticator::new(),
    )));
    Arc::new(CategorizationService::new(
        Arc::new(MockCategorizationStore::new()),
        tokens,
        Arc::new(MockDiffGateway::new()),
        Arc::new(MockChatModelFactory::new()),
        Url::parse("https://api.github.com").expect("api base should parse"),
    ))
}

fn state_with(service: Arc<CategorizationService>, api_token: Option<&str>) -> Arc<ApiState> {
    Arc::new(ApiState {
        service,
        api_token: api_token.map(ToOwned::to_owned),
    })
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

#[tokio::test]
async fn health_reports_ok() {
    let app = router(state_with(idle_service(), None));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should run");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn missing_pr_id_is_a_bad_request() {
    let app = router(state_with(idle_service(), None));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/pull-requests/categorize")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should run");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|message| message.contains("pr_id")),
        "error should name the missing parameter: {body}"
    );
}

#[tokio::test]
async fn non_integer_pr_id_is_a_bad_request() {
    let app = router(state_with(idle_service(), None));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/pull-requests/categorize?pr_id=abc")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should run");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_bearer_token_is_unauthorized_when_configured() {
    let app = router(state_with(idle_service(), Some("secret")));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/pull-requests/categorize?pr_id=1")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should run");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_pull_request_maps_to_not_found() {
    let mut store = MockCategorizationStore::new();
    store.expect_find_pull_request().returning(|_| Ok(None));

    let tokens = Arc::new(InstallationTokenCache::new(Arc::new(
        MockAppAuthenticator::new(),
    )));
    let service = Arc::new(CategorizationService::new(
        Arc::new(store),
        tokens,
        Arc::new(MockDiffGateway::new()),
        Arc::new(MockChatModelFactory::new()),
        Url::parse("https://api.github.com").expect("api base should parse"),
    ));
    let app = router(state_with(service, None));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/pull-requests/categorize?pr_id=9")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should run");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn successful_run_returns_the_category_envelope() {
    let mut store = MockCategorizationStore::new();
    store.expect_find_pull_request().returning(|_| {
        Ok(Some(PullRequestRecord {
            id: 9,
            repository_id: 2,
            number: 5,
            title: "Fix crash".to_owned(),
            description: None,
            ai_status: AiStatus::None,
            category_id: None,
            confidence: None,
            error_message: None,
        }))
    });
    store.expect_find_repository().returning(|_| {
        Ok(Some(RepositoryRecord {
            id: 2,
            organization_id: 3,
            full_name: "octo/repo".to_owned(),
        }))
    });
    store.expect_find_organization().returning(|_| {
        Ok(Some(OrganizationRecord {
            id: 3,
            name: "octo".to_owned(),
            installation_id: Some(77),
        }))
    });
    store.expect_ai_settings_for_organization().returning(|_| {
        Ok(AiSettings {
            provider: Some("openai".to_owned()),
            model: Some("model-x".to_owned()),
            api_key: Some("key-x".to_owned()),
        })
    });
    store.expect_categories_for_organization().returning(|_| {
        Ok(vec![CategoryRecord {
            id: 10,
            organization_id: Some(3),
            name: "Bug Fix".to_owned(),
            description: String::new(),
            color: "#6b7280".to_owned(),
            is_default: false,
        }])
    });
    store.expect_set_processing().returning(|_| Ok(()));
    store.expect_set_completed().returning(|_, _, _| Ok(()));

    let mut authenticator = MockAppAuthenticator::new();
    authenticator
        .expect_create_installation_token()
        .returning(|_| {
            Ok(InstallationToken::new(
                "ghs_test",
                Utc::now() + Duration::hours(1),
            ))
        });

    let mut diffs = MockDiffGateway::new();
    diffs
        .expect_fetch_diff()
        .returning(|_, _| Ok("diff --git".to_owned()));

    let mut models = MockChatModelFactory::new();
    models.expect_build().returning(|_| {
        let mut model = crate::ai::MockChatModel::new();
        model
            .expect_generate()
            .returning(|_, _| Ok("Category: Bug Fix\nConfidence: 0.9".to_owned()));
        Ok(Box::new(model))
    });

    let service = Arc::new(CategorizationService::new(
        Arc::new(store),
        Arc::new(InstallationTokenCache::new(Arc::new(authenticator))),
        Arc::new(diffs),
        Arc::new(models),
        Url::parse("https://api.github.com").expect("api base should parse"),
    ));
    let app = router(state_with(service, Some("secret")));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/pull-requests/categorize?pr_id=9")
                .header("authorization", "Bearer secret")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should run");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["category"]["id"], 10);
    assert_eq!(body["category"]["name"], "Bug Fix");
    assert_eq!(body["category"]["confidence"], 0.9);
    assert!(
        body["message"]
            .as_str()
            .is_some_and(|message| message.contains("Bug Fix")),
        "message should name the category: {body}"
    );
}
