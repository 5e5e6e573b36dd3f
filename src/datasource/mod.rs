//! Data source contract: the capability surface a live ORM connection exposes to the ORM provider.

pub mod loader;
pub mod postgres;

pub use loader::{load_data_source, DataSourceDescriptor, LoadDataSourceOptions};
pub use postgres::{PgDataSource, PgRepository};

use crate::error::StudioError;
use crate::provider::Row;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Native column type: a plain name (`"varchar"`) or a constructor-like descriptor (`{"name": "String"}`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnTypeDescriptor {
    Name(String),
    Constructor { name: String },
}

impl ColumnTypeDescriptor {
    /// Lowercase type tag used in models and for search-column selection.
    pub fn normalized(&self) -> String {
        match self {
            ColumnTypeDescriptor::Name(s) => s.to_lowercase(),
            ColumnTypeDescriptor::Constructor { name } => name.to_lowercase(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    pub property_name: String,
    /// Physical column name when it differs from the property name.
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(rename = "type")]
    pub type_: ColumnTypeDescriptor,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub is_nullable: bool,
}

impl ColumnMetadata {
    pub fn database_name(&self) -> &str {
        self.database_name.as_deref().unwrap_or(&self.property_name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationMetadata {
    pub property_name: String,
    #[serde(default)]
    pub inverse_table_name: Option<String>,
    #[serde(default)]
    pub inverse_entity_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    pub name: String,
    pub table_name: String,
    #[serde(default)]
    pub schema: Option<String>,
    pub columns: Vec<ColumnMetadata>,
    #[serde(default)]
    pub relations: Vec<RelationMetadata>,
}

impl EntityMetadata {
    pub fn column(&self, property_name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.property_name == property_name)
    }
}

/// Describes the first entity `name` or `tableName` that appears more than once.
/// Repositories are looked up by name and models by table, so both must be unique.
pub fn find_duplicate_entity(metadatas: &[EntityMetadata]) -> Option<String> {
    let mut names = HashSet::new();
    let mut tables = HashSet::new();
    for meta in metadatas {
        if !names.insert(meta.name.as_str()) {
            return Some(format!("entity name '{}'", meta.name));
        }
        if !tables.insert(meta.table_name.as_str()) {
            return Some(format!("table '{}'", meta.table_name));
        }
    }
    None
}

/// Substring match operators, strongest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchOperator {
    ILike,
    Like,
    Equal,
}

/// One `column <op> value` condition. Property names, not physical names.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldMatch {
    pub property: String,
    pub operator: MatchOperator,
    pub value: String,
}

/// Conditions OR-ed together.
pub type SearchFilter = Vec<FieldMatch>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FindOptions {
    pub take: u32,
    pub skip: u32,
    pub filter: Option<SearchFilter>,
    pub order: Option<(String, SortOrder)>,
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn count(&self, filter: Option<&SearchFilter>) -> Result<u64, StudioError>;

    async fn find(&self, options: &FindOptions) -> Result<Vec<Row>, StudioError>;
}

#[async_trait]
pub trait DataSource: Send + Sync {
    fn is_initialized(&self) -> bool;

    /// Connect and load metadata. Calling it on an initialized source is a no-op.
    async fn initialize(&self) -> Result<(), StudioError>;

    fn entity_metadatas(&self) -> Arc<Vec<EntityMetadata>>;

    /// Repository for the entity with this logical name.
    fn repository(&self, entity_name: &str) -> Result<Arc<dyn Repository>, StudioError>;

    fn supports(&self, operator: MatchOperator) -> bool;
}
