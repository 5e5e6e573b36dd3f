//! Resolved configuration: defaults applied and header values validated once at startup.

use crate::config::{CorsConfig, ProxyConfig, StudioConfig};
use crate::error::ConfigError;
use crate::provider::StudioProvider;
use axum::http::{header, HeaderMap, HeaderValue};
use std::sync::Arc;

pub const DEFAULT_API_PREFIX: &str = "/api";
pub const DEFAULT_CORS_ORIGIN: &str = "*";
pub const DEFAULT_CORS_METHODS: &str = "GET,OPTIONS";
pub const DEFAULT_CORS_HEADERS: &str = "Content-Type, Authorization";

#[derive(Clone, Debug)]
pub struct ResolvedCors {
    pub origin: String,
    pub methods: String,
    pub headers: String,
    /// The three `Access-Control-Allow-*` headers, ready to attach.
    header_map: HeaderMap,
}

impl ResolvedCors {
    pub fn header_map(&self) -> &HeaderMap {
        &self.header_map
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedProxy {
    pub enabled: bool,
    pub origin: String,
}

impl ResolvedProxy {
    /// Upstream origin when proxying is on and an origin is set.
    pub fn target(&self) -> Option<&str> {
        (self.enabled && !self.origin.is_empty()).then_some(self.origin.as_str())
    }
}

#[derive(Clone)]
pub struct ResolvedStudioConfig {
    pub provider: Arc<dyn StudioProvider>,
    pub api_prefix: String,
    pub cors: ResolvedCors,
    pub proxy: ResolvedProxy,
}

fn header_value(field: &'static str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|_| ConfigError::HeaderValue {
        field,
        value: value.to_string(),
    })
}

/// `/api/` and `api` both become `/api`; `/` and empty mean the root.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

pub fn resolve_cors(cors: Option<&CorsConfig>) -> Result<ResolvedCors, ConfigError> {
    let origin = cors
        .and_then(|c| c.origin.clone())
        .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.into());
    let methods = cors
        .and_then(|c| c.methods.clone())
        .unwrap_or_else(|| DEFAULT_CORS_METHODS.into());
    let headers = cors
        .and_then(|c| c.headers.clone())
        .unwrap_or_else(|| DEFAULT_CORS_HEADERS.into());

    let mut header_map = HeaderMap::new();
    header_map.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, header_value("cors.origin", &origin)?);
    header_map.insert(header::ACCESS_CONTROL_ALLOW_METHODS, header_value("cors.methods", &methods)?);
    header_map.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, header_value("cors.headers", &headers)?);

    Ok(ResolvedCors {
        origin,
        methods,
        headers,
        header_map,
    })
}

pub fn resolve_proxy(proxy: Option<&ProxyConfig>) -> ResolvedProxy {
    let origin = proxy
        .and_then(|p| p.origin.clone())
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .unwrap_or_default();
    ResolvedProxy {
        enabled: proxy.and_then(|p| p.enabled).unwrap_or(false),
        origin,
    }
}

pub fn resolve(config: StudioConfig) -> Result<ResolvedStudioConfig, ConfigError> {
    let cors = resolve_cors(config.cors.as_ref())?;
    let proxy = resolve_proxy(config.proxy.as_ref());
    let api_prefix = normalize_prefix(config.api_prefix.as_deref().unwrap_or(DEFAULT_API_PREFIX));
    Ok(ResolvedStudioConfig {
        provider: config.provider,
        api_prefix,
        cors,
        proxy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{InMemoryDataset, InMemoryProvider};

    fn base() -> StudioConfig {
        StudioConfig::new(Arc::new(InMemoryProvider::new(InMemoryDataset::default())))
    }

    #[test]
    fn defaults_fill_every_field() {
        let resolved = resolve(base()).unwrap();
        assert_eq!(resolved.api_prefix, "/api");
        assert_eq!(resolved.cors.origin, "*");
        assert_eq!(resolved.cors.methods, "GET,OPTIONS");
        assert_eq!(resolved.cors.headers, "Content-Type, Authorization");
        assert_eq!(resolved.cors.header_map().len(), 3);
        assert!(!resolved.proxy.enabled);
        assert_eq!(resolved.proxy.target(), None);
    }

    #[test]
    fn partial_values_override_defaults() {
        let resolved = resolve(
            base()
                .with_api_prefix("studio/")
                .with_cors(CorsConfig {
                    origin: Some("http://localhost:5173".into()),
                    ..Default::default()
                })
                .with_proxy(ProxyConfig {
                    enabled: Some(true),
                    origin: Some("http://127.0.0.1:5173/".into()),
                }),
        )
        .unwrap();
        assert_eq!(resolved.api_prefix, "/studio");
        assert_eq!(resolved.cors.origin, "http://localhost:5173");
        assert_eq!(resolved.cors.methods, "GET,OPTIONS");
        assert_eq!(resolved.proxy.target(), Some("http://127.0.0.1:5173"));
    }

    #[test]
    fn proxy_without_origin_stays_off() {
        let resolved = resolve(base().with_proxy(ProxyConfig {
            enabled: Some(true),
            origin: None,
        }))
        .unwrap();
        assert_eq!(resolved.proxy.target(), None);
    }

    #[test]
    fn invalid_header_values_are_rejected() {
        let err = resolve(base().with_cors(CorsConfig {
            origin: Some("bad\norigin".into()),
            ..Default::default()
        }))
        .err()
        .unwrap();
        assert!(matches!(err, ConfigError::HeaderValue { field: "cors.origin", .. }));
    }
}
