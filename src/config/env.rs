//! Bootstrap settings read from the process environment (and an optional `.env`).

use crate::error::ConfigError;
use crate::provider::{DEFAULT_LIMIT, DEFAULT_MAX_LIMIT};
use std::str::FromStr;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PORT_ATTEMPTS: u16 = 25;
pub const DEFAULT_EXPORT_NAME: &str = "AppDataSource";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Memory,
    Orm,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" | "fixture" => Ok(ProviderKind::Memory),
            "orm" | "typeorm" | "postgres" => Ok(ProviderKind::Orm),
            other => Err(ConfigError::Env(format!("unknown STUDIO_PROVIDER '{}'", other))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct StudioEnv {
    pub host: String,
    pub port: u16,
    pub port_attempts: u16,
    pub api_prefix: Option<String>,
    pub cors_origin: Option<String>,
    /// UI dev server origin; setting it turns the proxy on.
    pub client_origin: Option<String>,
    pub provider: ProviderKind,
    pub data_source_path: Option<String>,
    pub data_source_export: String,
    pub fixture_path: Option<String>,
    pub default_limit: u32,
    pub max_limit: u32,
}

impl StudioEnv {
    /// Read from the process environment after loading `.env` when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_source_path = get("STUDIO_DATA_SOURCE");
        let provider = match get("STUDIO_PROVIDER") {
            Some(kind) => kind.parse()?,
            None if data_source_path.is_some() => ProviderKind::Orm,
            None => ProviderKind::Memory,
        };

        let default_limit = parse_or(get("STUDIO_DEFAULT_LIMIT"), "STUDIO_DEFAULT_LIMIT", DEFAULT_LIMIT)?;
        let max_limit = parse_or(get("STUDIO_MAX_LIMIT"), "STUDIO_MAX_LIMIT", DEFAULT_MAX_LIMIT)?;
        if default_limit == 0 || max_limit == 0 {
            return Err(ConfigError::Env("row limits must be greater than 0".into()));
        }

        Ok(StudioEnv {
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.into()),
            port: parse_or(get("PORT"), "PORT", DEFAULT_PORT)?,
            port_attempts: parse_or(get("STUDIO_PORT_ATTEMPTS"), "STUDIO_PORT_ATTEMPTS", DEFAULT_PORT_ATTEMPTS)?.max(1),
            api_prefix: get("STUDIO_API_PREFIX"),
            cors_origin: get("STUDIO_CORS_ORIGIN"),
            client_origin: get("CLIENT_ORIGIN"),
            provider,
            data_source_path,
            data_source_export: get("STUDIO_DATA_SOURCE_EXPORT").unwrap_or_else(|| DEFAULT_EXPORT_NAME.into()),
            fixture_path: get("STUDIO_FIXTURE"),
            default_limit,
            max_limit,
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| ConfigError::Env(format!("{} must be a non-negative integer, got '{}'", key, v))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> Result<StudioEnv, ConfigError> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        StudioEnv::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let e = env(&[]).unwrap();
        assert_eq!(e.host, "127.0.0.1");
        assert_eq!(e.port, 3000);
        assert_eq!(e.port_attempts, 25);
        assert_eq!(e.provider, ProviderKind::Memory);
        assert_eq!(e.data_source_export, "AppDataSource");
        assert_eq!((e.default_limit, e.max_limit), (50, 200));
        assert!(e.client_origin.is_none());
    }

    #[test]
    fn data_source_path_selects_orm_provider() {
        let e = env(&[("STUDIO_DATA_SOURCE", "./ds.json"), ("STUDIO_MAX_LIMIT", "500")]).unwrap();
        assert_eq!(e.provider, ProviderKind::Orm);
        assert_eq!(e.data_source_path.as_deref(), Some("./ds.json"));
        assert_eq!(e.max_limit, 500);

        let e = env(&[("STUDIO_DATA_SOURCE", "./ds.json"), ("STUDIO_PROVIDER", "memory")]).unwrap();
        assert_eq!(e.provider, ProviderKind::Memory);
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(env(&[("PORT", "eighty")]).is_err());
        assert!(env(&[("STUDIO_PROVIDER", "mongo")]).is_err());
        assert!(env(&[("STUDIO_DEFAULT_LIMIT", "0")]).is_err());
        assert!(env(&[("STUDIO_MAX_LIMIT", "-5")]).is_err());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let e = env(&[("PORT", "  "), ("CLIENT_ORIGIN", "")]).unwrap();
        assert_eq!(e.port, 3000);
        assert!(e.client_origin.is_none());
    }
}
