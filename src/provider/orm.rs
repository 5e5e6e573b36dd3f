//! Provider backed by a live ORM data source.

use super::{require_positive_limit, Column, ListRowsOptions, Model, Relation, RowPage, Schema, StudioProvider, DEFAULT_LIMIT, DEFAULT_MAX_LIMIT};
use crate::datasource::{DataSource, EntityMetadata, FieldMatch, FindOptions, MatchOperator, SearchFilter, SortOrder};
use crate::error::StudioError;
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use tokio::sync::OnceCell;

/// Column types searched by substring.
pub const TEXT_COLUMN_TYPES: &[&str] = &["varchar", "text", "char", "nvarchar"];

#[derive(Clone, Copy, Debug)]
pub struct OrmProviderConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for OrmProviderConfig {
    fn default() -> Self {
        OrmProviderConfig {
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

pub struct OrmProvider {
    data_source: Arc<dyn DataSource>,
    config: OrmProviderConfig,
    ready: OnceCell<()>,
    operator: OnceLock<MatchOperator>,
}

impl OrmProvider {
    pub fn new(data_source: Arc<dyn DataSource>, config: OrmProviderConfig) -> Self {
        OrmProvider {
            data_source,
            config,
            ready: OnceCell::new(),
            operator: OnceLock::new(),
        }
    }

    /// Concurrent first callers share one initialization; a failure leaves the cell empty for a retry.
    async fn ensure_data_source(&self) -> Result<(), StudioError> {
        self.ready
            .get_or_try_init(|| async {
                if !self.data_source.is_initialized() {
                    tracing::info!("initializing data source");
                    self.data_source.initialize().await?;
                }
                Ok::<_, StudioError>(())
            })
            .await?;
        Ok(())
    }

    fn metadata(metadatas: &[EntityMetadata], table_name: &str) -> Result<EntityMetadata, StudioError> {
        metadatas
            .iter()
            .find(|m| m.table_name == table_name)
            .cloned()
            .ok_or_else(|| StudioError::model_not_found(table_name))
    }

    fn resolve_limit(&self, limit: Option<u32>) -> Result<u32, StudioError> {
        let requested = require_positive_limit(limit.unwrap_or(self.config.default_limit))?;
        Ok(requested.min(self.config.max_limit))
    }

    /// Probed once per provider.
    fn match_operator(&self) -> MatchOperator {
        *self.operator.get_or_init(|| {
            let op = [MatchOperator::ILike, MatchOperator::Like]
                .into_iter()
                .find(|op| self.data_source.supports(*op))
                .unwrap_or(MatchOperator::Equal);
            tracing::debug!(operator = ?op, "search operator");
            op
        })
    }

    fn search_filter(&self, metadata: &EntityMetadata, term: Option<&str>) -> Option<SearchFilter> {
        let term = term?;
        let text_columns: Vec<&str> = metadata
            .columns
            .iter()
            .filter(|c| TEXT_COLUMN_TYPES.contains(&c.type_.normalized().as_str()))
            .map(|c| c.property_name.as_str())
            .collect();
        if text_columns.is_empty() {
            return None;
        }
        let operator = self.match_operator();
        let value = match operator {
            MatchOperator::ILike | MatchOperator::Like => format!("%{}%", term),
            MatchOperator::Equal => term.to_string(),
        };
        Some(
            text_columns
                .into_iter()
                .map(|property| FieldMatch {
                    property: property.to_string(),
                    operator,
                    value: value.clone(),
                })
                .collect(),
        )
    }
}

/// Map one entity's metadata to the wire model. Relations whose target table cannot be resolved are dropped.
pub(crate) fn normalize_model(meta: &EntityMetadata, all: &[EntityMetadata]) -> Model {
    let columns = meta
        .columns
        .iter()
        .map(|c| Column {
            name: c.property_name.clone(),
            type_: c.type_.normalized(),
            is_primary: c.is_primary,
            nullable: c.is_nullable,
        })
        .collect();

    let relations = meta
        .relations
        .iter()
        .filter_map(|r| {
            let target = r
                .inverse_table_name
                .clone()
                .filter(|t| !t.is_empty())
                .or_else(|| {
                    let entity = r.inverse_entity_name.as_deref()?;
                    all.iter().find(|m| m.name == entity).map(|m| m.table_name.clone())
                })?;
            // Target column is assumed to be `id`.
            Some(Relation {
                field: r.property_name.clone(),
                references: format!("{}.id", target),
            })
        })
        .collect();

    Model {
        name: meta.name.clone(),
        table_name: meta.table_name.clone(),
        columns,
        relations,
    }
}

#[async_trait]
impl StudioProvider for OrmProvider {
    async fn get_schema(&self) -> Result<Schema, StudioError> {
        self.ensure_data_source().await?;
        let metadatas = self.data_source.entity_metadatas();
        Ok(Schema {
            models: metadatas.iter().map(|m| normalize_model(m, &metadatas)).collect(),
        })
    }

    async fn get_model_shape(&self, table_name: &str) -> Result<Model, StudioError> {
        self.ensure_data_source().await?;
        let metadatas = self.data_source.entity_metadatas();
        let meta = Self::metadata(&metadatas, table_name)?;
        Ok(normalize_model(&meta, &metadatas))
    }

    async fn list_rows(&self, table_name: &str, options: ListRowsOptions) -> Result<RowPage, StudioError> {
        self.ensure_data_source().await?;
        let metadatas = self.data_source.entity_metadatas();
        let meta = Self::metadata(&metadatas, table_name)?;
        let repository = self.data_source.repository(&meta.name)?;

        let limit = self.resolve_limit(options.limit)?;
        let offset = options.offset.unwrap_or(0);
        let filter = self.search_filter(&meta, options.search_term());

        // Ordered by the first declared column, which is not necessarily the key.
        let order_column = meta
            .columns
            .first()
            .map(|c| c.property_name.clone())
            .unwrap_or_else(|| "id".into());
        let find = FindOptions {
            take: limit,
            skip: offset,
            filter: filter.clone(),
            order: Some((order_column, SortOrder::Desc)),
        };

        let (total, rows) = tokio::try_join!(repository.count(filter.as_ref()), repository.find(&find))?;

        Ok(RowPage {
            rows,
            total,
            limit,
            offset,
        })
    }
}
