//! Load a data source definition from a module file at startup.
//!
//! A module is a JSON object keyed by export name. The named export is checked for the
//! data-source capability surface on the untyped value first, and only then deserialized.

use super::postgres::{DEFAULT_MAX_CONNECTIONS, DEFAULT_SCHEMA};
use super::{find_duplicate_entity, DataSource, EntityMetadata, PgDataSource};
use crate::error::ConfigError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SUPPORTED_DRIVERS: &[&str] = &["postgres", "postgresql"];

/// Prefix on `url` that reads the connection string from an environment variable.
const ENV_URL_PREFIX: &str = "env:";

#[derive(Clone, Debug)]
pub struct LoadDataSourceOptions {
    pub module_path: String,
    pub export_name: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceDescriptor {
    #[serde(default, rename = "type")]
    pub driver: Option<String>,
    pub url: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub max_connections: Option<u32>,
    pub entity_metadatas: Vec<EntityMetadata>,
}

/// Capability check on the raw export: a connection `url`, an `entityMetadatas`
/// array, and a supported driver when one is named.
pub fn is_data_source_like(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let has_url = obj.get("url").and_then(Value::as_str).is_some_and(|u| !u.trim().is_empty());
    let has_metadata = obj.get("entityMetadatas").is_some_and(Value::is_array);
    let driver_ok = match obj.get("type") {
        None => true,
        Some(Value::String(d)) => SUPPORTED_DRIVERS.contains(&d.to_lowercase().as_str()),
        Some(_) => false,
    };
    has_url && has_metadata && driver_ok
}

/// Candidate files for a module path: as given, with `.json`, then `index.json` inside it.
fn module_candidates(absolute: &Path) -> Vec<PathBuf> {
    let mut with_ext = absolute.as_os_str().to_owned();
    with_ext.push(".json");
    vec![absolute.to_path_buf(), PathBuf::from(with_ext), absolute.join("index.json")]
}

async fn load_module(absolute: &Path, display_path: &str) -> Result<Map<String, Value>, ConfigError> {
    for candidate in module_candidates(absolute) {
        if !tokio::fs::metadata(&candidate).await.map(|m| m.is_file()).unwrap_or(false) {
            continue;
        }
        let text = tokio::fs::read_to_string(&candidate)
            .await
            .map_err(|e| ConfigError::ModuleParse {
                path: display_path.to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(path = %candidate.display(), "loaded data source module");
        return match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(ConfigError::ModuleParse {
                path: display_path.to_string(),
                reason: "module must be a JSON object of exports".into(),
            }),
            Err(e) => Err(ConfigError::ModuleParse {
                path: display_path.to_string(),
                reason: e.to_string(),
            }),
        };
    }
    Err(ConfigError::ModuleNotFound(display_path.to_string()))
}

fn resolve_url(url: &str) -> Result<String, ConfigError> {
    match url.strip_prefix(ENV_URL_PREFIX) {
        Some(var) => std::env::var(var.trim())
            .map_err(|_| ConfigError::Env(format!("{} referenced by data source url is not set", var.trim()))),
        None => Ok(url.to_string()),
    }
}

/// Resolve, validate and build the descriptor named by `options`, without connecting.
pub async fn load_descriptor(options: &LoadDataSourceOptions) -> Result<DataSourceDescriptor, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::Env(e.to_string()))?;
    let absolute = cwd.join(&options.module_path);
    let module = load_module(&absolute, &options.module_path).await?;

    let invalid = || ConfigError::InvalidDataSource {
        name: options.export_name.clone(),
        path: options.module_path.clone(),
    };
    let exported = module.get(&options.export_name).ok_or_else(invalid)?;
    if !is_data_source_like(exported) {
        return Err(invalid());
    }
    let mut descriptor: DataSourceDescriptor = serde_json::from_value(exported.clone()).map_err(|e| {
        tracing::error!(error = %e, export = %options.export_name, "data source export has malformed metadata");
        invalid()
    })?;
    if let Some(duplicate) = find_duplicate_entity(&descriptor.entity_metadatas) {
        return Err(ConfigError::Validation(format!(
            "export '{}' from '{}' declares {} more than once",
            options.export_name, options.module_path, duplicate
        )));
    }
    descriptor.url = resolve_url(&descriptor.url)?;
    Ok(descriptor)
}

/// Load the data source named by `options`. Connection happens lazily on first use.
pub async fn load_data_source(options: &LoadDataSourceOptions) -> Result<Arc<dyn DataSource>, ConfigError> {
    let descriptor = load_descriptor(options).await?;
    let schema = descriptor.schema.unwrap_or_else(|| DEFAULT_SCHEMA.to_string());
    tracing::info!(
        module = %options.module_path,
        export = %options.export_name,
        schema = %schema,
        declared_entities = descriptor.entity_metadatas.len(),
        "data source loaded"
    );
    let ds = PgDataSource::new(descriptor.url, schema, descriptor.entity_metadatas)
        .with_max_connections(descriptor.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS));
    Ok(Arc::new(ds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(path: &Path, export: &str) -> LoadDataSourceOptions {
        LoadDataSourceOptions {
            module_path: path.display().to_string(),
            export_name: export.into(),
        }
    }

    fn module() -> Value {
        json!({
            "AppDataSource": {
                "type": "postgres",
                "url": "postgres://localhost/app",
                "schema": "app",
                "entityMetadatas": [{
                    "name": "User",
                    "tableName": "users",
                    "columns": [
                        { "propertyName": "id", "type": "int", "isPrimary": true },
                        { "propertyName": "email", "type": { "name": "String" } }
                    ],
                    "relations": []
                }]
            },
            "NotADataSource": { "entityMetadatas": [] },
            "BadDriver": { "type": "mongodb", "url": "mongodb://x", "entityMetadatas": [] },
            "BadMetadata": { "url": "postgres://x", "entityMetadatas": [{ "name": 3 }] }
        })
    }

    #[test]
    fn capability_check_is_structural() {
        let m = module();
        assert!(is_data_source_like(&m["AppDataSource"]));
        assert!(!is_data_source_like(&m["NotADataSource"]));
        assert!(!is_data_source_like(&m["BadDriver"]));
        assert!(is_data_source_like(&json!({ "url": "postgres://x", "entityMetadatas": [] })));
        assert!(!is_data_source_like(&json!("postgres://x")));
    }

    #[tokio::test]
    async fn loads_named_export_and_falls_back_to_json_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("datasource.json"), module().to_string()).unwrap();

        let descriptor = load_descriptor(&options(&dir.path().join("datasource"), "AppDataSource"))
            .await
            .unwrap();
        assert_eq!(descriptor.url, "postgres://localhost/app");
        assert_eq!(descriptor.schema.as_deref(), Some("app"));
        assert_eq!(descriptor.entity_metadatas[0].columns[1].type_.normalized(), "string");

        let ds = load_data_source(&options(&dir.path().join("datasource.json"), "AppDataSource"))
            .await
            .unwrap();
        assert!(!ds.is_initialized());
        assert_eq!(ds.entity_metadatas()[0].table_name, "users");
    }

    #[tokio::test]
    async fn directory_module_uses_index_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.json"), module().to_string()).unwrap();
        let descriptor = load_descriptor(&options(dir.path(), "AppDataSource")).await.unwrap();
        assert_eq!(descriptor.entity_metadatas.len(), 1);
    }

    #[tokio::test]
    async fn invalid_exports_are_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ds.json");
        std::fs::write(&path, module().to_string()).unwrap();

        for export in ["NotADataSource", "BadDriver", "BadMetadata", "Missing"] {
            let err = load_descriptor(&options(&path, export)).await.unwrap_err();
            assert!(matches!(err, ConfigError::InvalidDataSource { .. }), "{export}");
            assert_eq!(
                err.to_string(),
                format!("Export '{}' from '{}' is not a valid ORM DataSource", export, path.display())
            );
        }
    }

    #[tokio::test]
    async fn missing_and_malformed_modules() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_descriptor(&options(&dir.path().join("nope"), "AppDataSource")).await.unwrap_err();
        assert!(matches!(err, ConfigError::ModuleNotFound(_)));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        let err = load_descriptor(&options(&broken, "AppDataSource")).await.unwrap_err();
        assert!(matches!(err, ConfigError::ModuleParse { .. }));
    }

    #[tokio::test]
    async fn duplicate_entity_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ds.json");
        let entity = |table: &str| json!({ "name": "User", "tableName": table, "columns": [] });
        let module = json!({ "AppDataSource": {
            "url": "postgres://localhost/app",
            "entityMetadatas": [entity("Users"), entity("users")]
        }});
        std::fs::write(&path, module.to_string()).unwrap();

        let err = load_descriptor(&options(&path, "AppDataSource")).await.unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("entity name 'User' more than once"), "{err}");
    }

    #[tokio::test]
    async fn env_url_is_resolved_from_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ds.json");
        let module = json!({ "Db": { "url": "env:ORM_STUDIO_LOADER_TEST_URL", "entityMetadatas": [] } });
        std::fs::write(&path, module.to_string()).unwrap();

        std::env::set_var("ORM_STUDIO_LOADER_TEST_URL", "postgres://from-env/db");
        let descriptor = load_descriptor(&options(&path, "Db")).await.unwrap();
        assert_eq!(descriptor.url, "postgres://from-env/db");
        std::env::remove_var("ORM_STUDIO_LOADER_TEST_URL");

        let err = load_descriptor(&options(&path, "Db")).await.unwrap_err();
        assert!(matches!(err, ConfigError::Env(_)));
    }
}
