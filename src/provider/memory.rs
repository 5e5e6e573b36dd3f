//! Fixture-backed provider for demos and tests.

use super::{require_positive_limit, Column, ListRowsOptions, Model, Relation, Row, RowPage, Schema, StudioProvider, DEFAULT_LIMIT};
use crate::error::{ConfigError, StudioError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InMemoryDataset {
    pub schema: Schema,
    #[serde(default)]
    pub rows: HashMap<String, Vec<Row>>,
}

impl InMemoryDataset {
    /// Load a `{ "schema": {...}, "rows": {...} }` JSON fixture.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let fixture_err = |reason: String| ConfigError::Fixture {
            path: path.display().to_string(),
            reason,
        };
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| fixture_err(e.to_string()))?;
        let dataset: InMemoryDataset = serde_json::from_str(&text).map_err(|e| fixture_err(e.to_string()))?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dup) = self.schema.duplicate_table_name() {
            return Err(ConfigError::Validation(format!("duplicate tableName '{}'", dup)));
        }
        Ok(())
    }

    /// Small users / projects / sessions dataset served when no fixture is configured.
    pub fn demo() -> Self {
        let schema = Schema {
            models: vec![
                model(
                    "User",
                    "users",
                    vec![
                        column("id", "int", true, false),
                        column("email", "varchar", false, false),
                        column("role", "varchar", false, false),
                        column("createdAt", "timestamp", false, false),
                        column("isActive", "boolean", false, false),
                    ],
                    vec![],
                ),
                model(
                    "Project",
                    "projects",
                    vec![
                        column("id", "int", true, false),
                        column("name", "varchar", false, false),
                        column("visibility", "varchar", false, false),
                        column("ownerId", "int", false, false),
                        column("archivedAt", "timestamp", false, true),
                    ],
                    vec![relation("ownerId", "users.id")],
                ),
                model(
                    "Session",
                    "sessions",
                    vec![
                        column("id", "int", true, false),
                        column("userId", "int", false, false),
                        column("status", "varchar", false, false),
                        column("device", "varchar", false, false),
                        column("expiresAt", "timestamp", false, false),
                    ],
                    vec![relation("userId", "users.id")],
                ),
            ],
        };

        let mut rows = HashMap::new();
        rows.insert(
            "users".to_string(),
            rows_of(vec![
                json!({ "id": 1, "email": "ada@example.com", "role": "admin", "createdAt": "2026-02-21", "isActive": true }),
                json!({ "id": 2, "email": "sam@example.com", "role": "editor", "createdAt": "2026-02-22", "isActive": false }),
                json!({ "id": 3, "email": "jules@example.com", "role": "viewer", "createdAt": "2026-02-24", "isActive": true }),
            ]),
        );
        rows.insert(
            "projects".to_string(),
            rows_of(vec![
                json!({ "id": 11, "name": "Studio", "visibility": "private", "ownerId": 1, "archivedAt": null }),
                json!({ "id": 12, "name": "Dashboard", "visibility": "public", "ownerId": 2, "archivedAt": null }),
                json!({ "id": 13, "name": "Internal API", "visibility": "private", "ownerId": 1, "archivedAt": "2026-02-25" }),
            ]),
        );
        rows.insert(
            "sessions".to_string(),
            rows_of(vec![
                json!({ "id": 101, "userId": 1, "status": "active", "device": "macOS", "expiresAt": "2026-03-01" }),
                json!({ "id": 102, "userId": 2, "status": "expired", "device": "Windows", "expiresAt": "2026-02-20" }),
                json!({ "id": 103, "userId": 3, "status": "active", "device": "Linux", "expiresAt": "2026-02-28" }),
            ]),
        );

        InMemoryDataset { schema, rows }
    }
}

fn column(name: &str, type_: &str, is_primary: bool, nullable: bool) -> Column {
    Column {
        name: name.into(),
        type_: type_.into(),
        is_primary,
        nullable,
    }
}

fn relation(field: &str, references: &str) -> Relation {
    Relation {
        field: field.into(),
        references: references.into(),
    }
}

fn model(name: &str, table_name: &str, columns: Vec<Column>, relations: Vec<Relation>) -> Model {
    Model {
        name: name.into(),
        table_name: table_name.into(),
        columns,
        relations,
    }
}

fn rows_of(values: Vec<Value>) -> Vec<Row> {
    values
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// Text a cell is searched by: null is empty, strings raw, other values as JSON.
fn searchable_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches_search(row: &Row, term: &str) -> bool {
    row.values()
        .any(|v| searchable_text(v).to_lowercase().contains(term))
}

#[derive(Clone)]
pub struct InMemoryProvider {
    dataset: Arc<InMemoryDataset>,
}

impl InMemoryProvider {
    pub fn new(dataset: InMemoryDataset) -> Self {
        InMemoryProvider {
            dataset: Arc::new(dataset),
        }
    }
}

#[async_trait]
impl StudioProvider for InMemoryProvider {
    async fn get_schema(&self) -> Result<Schema, StudioError> {
        Ok(self.dataset.schema.clone())
    }

    async fn get_model_shape(&self, table_name: &str) -> Result<Model, StudioError> {
        self.dataset
            .schema
            .model(table_name)
            .cloned()
            .ok_or_else(|| StudioError::model_not_found(table_name))
    }

    /// Unknown tables yield an empty page: fixtures carry no metadata to validate against.
    async fn list_rows(&self, table_name: &str, options: ListRowsOptions) -> Result<RowPage, StudioError> {
        let limit = require_positive_limit(options.limit.unwrap_or(DEFAULT_LIMIT))?;
        let offset = options.offset.unwrap_or(0);
        let term = options.search_term().map(str::to_lowercase);

        let source = self.dataset.rows.get(table_name).map(Vec::as_slice).unwrap_or(&[]);
        let filtered: Vec<&Row> = source
            .iter()
            .filter(|row| term.as_deref().map_or(true, |t| matches_search(row, t)))
            .collect();

        let rows = filtered
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|row| (*row).clone())
            .collect();

        Ok(RowPage {
            rows,
            total: filtered.len() as u64,
            limit,
            offset,
        })
    }
}
