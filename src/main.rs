//! Pigeonhole service entrypoint.
//!
//! Loads configuration, optionally runs migrations, wires the categorization
//! pipeline together, and serves the HTTP surface.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use ortho_config::OrthoConfig;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use pigeonhole::ai::ProviderChatModelFactory;
use pigeonhole::api::{self, ApiState};
use pigeonhole::categorize::CategorizationService;
use pigeonhole::config::PigeonholeConfig;
use pigeonhole::github::{
    GithubError, InstallationTokenCache, OctocrabAppAuthenticator, OctocrabDiffGateway,
};
use pigeonhole::persistence::{PersistenceError, SqliteStore, migrate_database};
use pigeonhole::telemetry::StderrJsonlTelemetrySink;

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Github(#[from] GithubError),

    #[error("server error: {0}")]
    Server(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    init_tracing();

    let config = load_config()?;
    let database_url = config.require_database_url()?;

    if config.migrate_db {
        migrate_database(database_url, &StderrJsonlTelemetrySink)?;
        return Ok(());
    }

    let store = SqliteStore::new(database_url)?;
    let api_base = config.github_api_base()?;
    let credentials = config.github_app_credentials()?;
    let authenticator = OctocrabAppAuthenticator::new(&credentials, &api_base)?;
    let tokens = Arc::new(InstallationTokenCache::new(Arc::new(authenticator)));

    let service = CategorizationService::new(
        Arc::new(store),
        tokens,
        Arc::new(OctocrabDiffGateway::new()),
        Arc::new(ProviderChatModelFactory::new()),
        api_base,
    );

    let state = Arc::new(ApiState {
        service: Arc::new(service),
        api_token: config.api_token.clone(),
    });
    let app = api::router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .map_err(|error| {
            StartupError::Server(format!(
                "failed to bind {address}: {error}",
                address = config.bind_address
            ))
        })?;
    tracing::info!("listening on {address}", address = config.bind_address);

    axum::serve(listener, app)
        .await
        .map_err(|error| StartupError::Server(error.to_string()))
}

/// Loads configuration from CLI, environment, and files.
fn load_config() -> Result<PigeonholeConfig, StartupError> {
    PigeonholeConfig::load().map_err(|error| StartupError::Configuration(error.to_string()))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pigeonhole=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
