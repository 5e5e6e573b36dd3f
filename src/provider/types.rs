//! Wire types shared by every provider: schema, models, rows, pages.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub nullable: bool,
}

/// Directed reference from `field` to `"<targetTable>.<targetColumn>"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub field: String,
    pub references: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub name: String,
    /// Model identifier used in every route.
    pub table_name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub models: Vec<Model>,
}

impl Schema {
    pub fn model(&self, table_name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.table_name == table_name)
    }

    /// First `tableName` that appears more than once, if any.
    pub fn duplicate_table_name(&self) -> Option<&str> {
        let mut seen = std::collections::HashSet::new();
        self.models
            .iter()
            .map(|m| m.table_name.as_str())
            .find(|name| !seen.insert(*name))
    }
}

/// Open mapping from column name to scalar value.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Clone, Debug, Default)]
pub struct ListRowsOptions {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub search: Option<String>,
}

impl ListRowsOptions {
    /// Trimmed search term, None when absent or blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowPage {
    pub rows: Vec<Row>,
    /// Rows matching the search before pagination.
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}
