//! Partial API configuration supplied by the embedding application.

use crate::provider::StudioProvider;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub methods: Option<String>,
    #[serde(default)]
    pub headers: Option<String>,
}

/// Where requests outside the API prefix are forwarded (typically the UI dev server).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub origin: Option<String>,
}

#[derive(Clone)]
pub struct StudioConfig {
    pub provider: Arc<dyn StudioProvider>,
    pub api_prefix: Option<String>,
    pub cors: Option<CorsConfig>,
    pub proxy: Option<ProxyConfig>,
}

impl StudioConfig {
    pub fn new(provider: Arc<dyn StudioProvider>) -> Self {
        StudioConfig {
            provider,
            api_prefix: None,
            cors: None,
            proxy: None,
        }
    }

    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = Some(prefix.into());
        self
    }

    pub fn with_cors(mut self, cors: CorsConfig) -> Self {
        self.cors = Some(cors);
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }
}
