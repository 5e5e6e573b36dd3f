//! ORM Studio API: read-only schema and row browsing over pluggable data providers.

pub mod case;
pub mod config;
pub mod datasource;
pub mod error;
pub mod handlers;
pub mod provider;
pub mod request;
pub mod response;
pub mod routes;
pub mod server;
pub mod sql;
pub mod state;

pub use config::{resolve, CorsConfig, ProxyConfig, ResolvedStudioConfig, StudioConfig, StudioEnv};
pub use datasource::{load_data_source, DataSource, LoadDataSourceOptions, PgDataSource};
pub use error::{ConfigError, ServerError, StudioError};
pub use provider::{InMemoryDataset, InMemoryProvider, OrmProvider, OrmProviderConfig, StudioProvider};
pub use routes::studio_routes;
pub use server::{bind_with_retry, build_provider, init_tracing, run};
pub use state::StudioState;
