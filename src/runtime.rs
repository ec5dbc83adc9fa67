use crate::{
    app::{AppState, build_router},
    auth::AuthHook,
    config::Config,
    error::RegistryError,
    observability,
    plugin::AzureAdPlugin,
};
use std::sync::Arc;
use tracing::instrument;

/// Builds router state. An injected hook replaces the Azure AD plugin, which
/// lets embedders and tests drive the HTTP surface directly.
#[instrument(skip(config, auth_hook))]
pub fn build_state(
    config: &Config,
    auth_hook: Option<Arc<dyn AuthHook>>,
) -> Result<AppState, RegistryError> {
    let hook = match auth_hook {
        Some(hook) => hook,
        None => Arc::new(AzureAdPlugin::new(Arc::new(config.azure.clone()))?),
    };
    Ok(AppState { hook })
}

pub async fn run(
    config: Config,
    auth_hook: Option<Arc<dyn AuthHook>>,
) -> Result<(), RegistryError> {
    let bind = config.bind;
    let state = build_state(&config, auth_hook)?;
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;

    tracing::info!(
        bind = %bind,
        tenant = config.azure.tenant,
        allow_group_count = config.azure.allow_groups.len(),
        "rustaccio-azure-ad listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|_| RegistryError::Internal)
}

pub async fn run_standalone(config: Config) -> Result<(), RegistryError> {
    let tracing_settings = observability::init_from_env(&config.log_level);
    tracing::debug!(
        log_filter = tracing_settings.filter,
        log_format = tracing_settings.log_format.as_str(),
        "initialized tracing subscriber"
    );
    run(config, None).await
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let ctrl_c = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        let terminate = async {
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                let _ = sigterm.recv().await;
            }
        };
        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("shutdown signal received");
}
