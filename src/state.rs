//! Shared state for the studio router.

use crate::config::{resolve, ResolvedStudioConfig, StudioConfig};
use crate::error::ConfigError;
use std::sync::Arc;

#[derive(Clone)]
pub struct StudioState {
    pub config: Arc<ResolvedStudioConfig>,
    /// Client for the reverse proxy. Redirects are relayed, not followed.
    pub http: reqwest::Client,
}

impl StudioState {
    pub fn new(config: StudioConfig) -> Result<Self, ConfigError> {
        let resolved = resolve(config)?;
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ConfigError::Validation(format!("proxy client: {}", e)))?;
        Ok(StudioState {
            config: Arc::new(resolved),
            http,
        })
    }
}
