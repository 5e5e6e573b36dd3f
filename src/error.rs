//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::response::{error_json, INTERNAL_ERROR_MESSAGE};

/// Startup errors: the server refuses to start when any of these occur.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("data source module path is required (set STUDIO_DATA_SOURCE)")]
    MissingModulePath,
    #[error("data source module '{0}' not found")]
    ModuleNotFound(String),
    #[error("data source module '{path}' could not be parsed: {reason}")]
    ModuleParse { path: String, reason: String },
    #[error("Export '{name}' from '{path}' is not a valid ORM DataSource")]
    InvalidDataSource { name: String, path: String },
    #[error("fixture '{path}': {reason}")]
    Fixture { path: String, reason: String },
    #[error("validation: {0}")]
    Validation(String),
    #[error("environment: {0}")]
    Env(String),
    #[error("invalid header value for {field}: {value:?}")]
    HeaderValue { field: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no free port in {first}..={last}")]
    PortsExhausted { first: u16, last: u16 },
}

/// Request-time errors. The dispatcher turns every one of these into `{ok:false, error}`.
#[derive(Error, Debug)]
pub enum StudioError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    MethodNotAllowed(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("{0}")]
    Internal(String),
}

impl StudioError {
    pub fn model_not_found(table_name: &str) -> Self {
        StudioError::NotFound(format!("Model for table '{}' not found", table_name))
    }

    pub fn route_not_found() -> Self {
        StudioError::NotFound("Route not found".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            StudioError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            StudioError::NotFound(_) => StatusCode::NOT_FOUND,
            StudioError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            StudioError::Db(_) | StudioError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to send to the client. Internal causes stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            StudioError::Db(_) | StudioError::Internal(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for StudioError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        error_json(status, self.public_message())
    }
}
