//! Startup: provider selection, listener with port retry, serve until ctrl-c.

use crate::config::{CorsConfig, ProviderKind, ProxyConfig, StudioConfig, StudioEnv};
use crate::datasource::{load_data_source, LoadDataSourceOptions};
use crate::error::{ConfigError, ServerError};
use crate::provider::{InMemoryDataset, InMemoryProvider, OrmProvider, OrmProviderConfig, StudioProvider};
use crate::routes::studio_routes;
use crate::state::StudioState;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const DEFAULT_LOG_FILTER: &str = "orm_studio=info,tower_http=info";

/// Install the fmt subscriber; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();
}

/// Bind `host:port`, moving to the next port while the address is in use.
pub async fn bind_with_retry(host: &str, port: u16, attempts: u16) -> Result<TcpListener, ServerError> {
    let attempts = attempts.max(1);
    let last = port.saturating_add(attempts - 1);
    for candidate in port..=last {
        let addr = format!("{}:{}", host, candidate);
        match TcpListener::bind(&addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                tracing::warn!(port = candidate, "port in use, trying the next one");
            }
            Err(source) => return Err(ServerError::Bind { addr, source }),
        }
    }
    Err(ServerError::PortsExhausted { first: port, last })
}

pub async fn build_provider(env: &StudioEnv) -> Result<Arc<dyn StudioProvider>, ConfigError> {
    match env.provider {
        ProviderKind::Memory => {
            let dataset = match &env.fixture_path {
                Some(path) => InMemoryDataset::from_path(path).await?,
                None => InMemoryDataset::demo(),
            };
            tracing::info!(models = dataset.schema.models.len(), "using in-memory provider");
            Ok(Arc::new(InMemoryProvider::new(dataset)))
        }
        ProviderKind::Orm => {
            let module_path = env.data_source_path.clone().ok_or(ConfigError::MissingModulePath)?;
            let data_source = load_data_source(&LoadDataSourceOptions {
                module_path,
                export_name: env.data_source_export.clone(),
            })
            .await?;
            tracing::info!("using ORM provider");
            Ok(Arc::new(OrmProvider::new(
                data_source,
                OrmProviderConfig {
                    default_limit: env.default_limit,
                    max_limit: env.max_limit,
                },
            )))
        }
    }
}

pub fn studio_config(env: &StudioEnv, provider: Arc<dyn StudioProvider>) -> StudioConfig {
    let mut config = StudioConfig::new(provider).with_proxy(ProxyConfig {
        enabled: Some(env.client_origin.is_some()),
        origin: env.client_origin.clone(),
    });
    if let Some(prefix) = &env.api_prefix {
        config = config.with_api_prefix(prefix.clone());
    }
    if let Some(origin) = &env.cors_origin {
        config = config.with_cors(CorsConfig {
            origin: Some(origin.clone()),
            ..CorsConfig::default()
        });
    }
    config
}

pub async fn run(env: StudioEnv) -> Result<(), ServerError> {
    let provider = build_provider(&env).await?;
    let state = StudioState::new(studio_config(&env, provider))?;
    let prefix = state.config.api_prefix.clone();
    let app = studio_routes(state);

    let listener = bind_with_retry(&env.host, env.port, env.port_attempts).await?;
    let addr = listener.local_addr().map_err(|source| ServerError::Bind {
        addr: format!("{}:{}", env.host, env.port),
        source,
    })?;
    tracing::info!("ORM Studio API listening on http://{}{}", addr, prefix);
    if let Some(origin) = &env.client_origin {
        tracing::info!(origin = %origin, "proxying non-API paths to the client");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
