use identity_service::{
    build_router,
    config::{Environment, IdentityConfig, StoreBackend},
    db,
    services::{
        catalog::reconcile_catalog, events::publisher_from_config, CredentialStore, Database,
        InMemoryCredentialStore, KeyMaterial,
    },
    AppState,
};
use service_core::error::AppError;
use service_core::observability::{init_tracing, LogFormat};
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = IdentityConfig::from_env()?;

    let log_format = match config.environment {
        Environment::Dev => LogFormat::Pretty,
        Environment::Prod => LogFormat::Json,
    };
    init_tracing(
        &config.service_name,
        &config.log_level,
        log_format,
        config.otlp_endpoint.as_deref(),
    )?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        store = ?config.store.backend,
        "Starting identity service"
    );

    let store: Arc<dyn CredentialStore> = match config.store.backend {
        StoreBackend::Postgres => {
            let pool = db::create_pool(&config.store.database)
                .await
                .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;
            db::run_migrations(&pool)
                .await
                .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;
            Arc::new(Database::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory credential store; data is lost on restart");
            Arc::new(InMemoryCredentialStore::new())
        }
    };

    reconcile_catalog(store.as_ref()).await?;

    let keys = KeyMaterial::from_config(&config.jwt)?;
    check_key_material(&keys, &config.environment)?;

    let events = publisher_from_config(&config.events)?;

    let addr = config.common.bind_addr();
    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );

    let state = AppState::with_keys(config, store, events, keys);
    let app = build_router(state)?;

    let _guard = service_span.enter();
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    service_core::axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

/// A missing key aborts startup in prod; in dev the service starts and
/// reports the problem on first use.
fn check_key_material(keys: &KeyMaterial, environment: &Environment) -> Result<(), AppError> {
    match keys.ensure_complete() {
        Ok(()) => {
            tracing::info!(kid = ?keys.kid(), "Signing key pair loaded");
            Ok(())
        }
        Err(e) if *environment == Environment::Prod => Err(e.into()),
        Err(e) => {
            tracing::error!(
                error = %e,
                "Signing key pair incomplete; token issuance or verification will fail"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
