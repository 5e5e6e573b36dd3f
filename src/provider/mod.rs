//! Provider contract: the read-only data access every backend implements.

mod memory;
mod orm;
mod types;

pub use memory::{InMemoryDataset, InMemoryProvider};
pub use orm::{OrmProvider, OrmProviderConfig, TEXT_COLUMN_TYPES};
pub use types::*;

use crate::error::StudioError;
use async_trait::async_trait;

/// Limit applied when the caller does not send one.
pub const DEFAULT_LIMIT: u32 = 50;

/// Ceiling the ORM provider applies to requested limits.
pub const DEFAULT_MAX_LIMIT: u32 = 200;

#[async_trait]
pub trait StudioProvider: Send + Sync {
    async fn get_schema(&self) -> Result<Schema, StudioError>;

    /// One model by table name. NotFound when no model has that table name.
    async fn get_model_shape(&self, table_name: &str) -> Result<Model, StudioError>;

    /// A searched, paginated slice of a table's rows.
    async fn list_rows(&self, table_name: &str, options: ListRowsOptions) -> Result<RowPage, StudioError>;
}

pub(crate) fn require_positive_limit(limit: u32) -> Result<u32, StudioError> {
    if limit == 0 {
        return Err(StudioError::InvalidArgument("limit must be greater than 0".into()));
    }
    Ok(limit)
}
