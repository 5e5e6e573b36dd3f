//! PostgreSQL data source over a sqlx pool, with optional reflection of `information_schema`.

use super::{find_duplicate_entity, ColumnMetadata, ColumnTypeDescriptor, DataSource, EntityMetadata, FindOptions, MatchOperator, RelationMetadata, Repository, SearchFilter};
use crate::case::to_pascal_case;
use crate::error::StudioError;
use crate::provider::Row;
use crate::sql::{self, qualified_table, row_to_json, QueryBuf, TableTarget, TargetColumn};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

pub const DEFAULT_SCHEMA: &str = "public";

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

pub struct PgDataSource {
    url: String,
    schema: String,
    max_connections: u32,
    /// Declared entities; empty means reflect from the database on initialize.
    declared: Vec<EntityMetadata>,
    pool: OnceLock<PgPool>,
    metadatas: RwLock<Arc<Vec<EntityMetadata>>>,
    initialized: AtomicBool,
}

impl PgDataSource {
    pub fn new(url: impl Into<String>, schema: impl Into<String>, declared: Vec<EntityMetadata>) -> Self {
        PgDataSource {
            url: url.into(),
            schema: schema.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            metadatas: RwLock::new(Arc::new(declared.clone())),
            declared,
            pool: OnceLock::new(),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Wrap an existing pool. Initialization then only loads metadata.
    pub fn from_pool(pool: PgPool, schema: impl Into<String>, declared: Vec<EntityMetadata>) -> Self {
        let ds = PgDataSource::new(String::new(), schema, declared);
        let _ = ds.pool.set(pool);
        ds
    }

    fn pool(&self) -> Result<&PgPool, StudioError> {
        self.pool
            .get()
            .ok_or_else(|| StudioError::Internal("data source is not initialized".into()))
    }

    fn pg_repository(&self, entity_name: &str) -> Result<PgRepository, StudioError> {
        let metadatas = self.entity_metadatas();
        let meta = metadatas
            .iter()
            .find(|m| m.name == entity_name)
            .ok_or_else(|| StudioError::Internal(format!("no repository for entity '{}'", entity_name)))?;
        Ok(PgRepository {
            pool: self.pool()?.clone(),
            target: self.target_for(meta),
        })
    }

    fn target_for(&self, meta: &EntityMetadata) -> TableTarget {
        let schema = meta.schema.as_deref().unwrap_or(&self.schema);
        TableTarget {
            qualified_name: qualified_table(schema, &meta.table_name),
            columns: meta
                .columns
                .iter()
                .map(|c| TargetColumn::new(&c.property_name, c.database_name(), &c.type_.normalized()))
                .collect(),
        }
    }
}

#[async_trait]
impl DataSource for PgDataSource {
    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    async fn initialize(&self) -> Result<(), StudioError> {
        if self.is_initialized() {
            return Ok(());
        }
        if self.pool.get().is_none() {
            let pool = PgPoolOptions::new()
                .max_connections(self.max_connections)
                .connect(&self.url)
                .await?;
            let _ = self.pool.set(pool);
        }
        let pool = self.pool()?;
        let metadatas = if self.declared.is_empty() {
            reflect_schema(pool, &self.schema).await?
        } else {
            self.declared.clone()
        };
        if let Some(duplicate) = find_duplicate_entity(&metadatas) {
            return Err(StudioError::Internal(format!("data source declares {} more than once", duplicate)));
        }
        tracing::info!(schema = %self.schema, entities = metadatas.len(), "data source initialized");
        if let Ok(mut guard) = self.metadatas.write() {
            *guard = Arc::new(metadatas);
        }
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    fn entity_metadatas(&self) -> Arc<Vec<EntityMetadata>> {
        self.metadatas
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn repository(&self, entity_name: &str) -> Result<Arc<dyn Repository>, StudioError> {
        Ok(Arc::new(self.pg_repository(entity_name)?))
    }

    fn supports(&self, _operator: MatchOperator) -> bool {
        true
    }
}

pub struct PgRepository {
    pool: PgPool,
    target: TableTarget,
}

impl PgRepository {
    fn bind_all<'q>(
        q: &'q QueryBuf,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.as_str());
        }
        query
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn count(&self, filter: Option<&SearchFilter>) -> Result<u64, StudioError> {
        let q = sql::count(&self.target, filter);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            query = query.bind(p.as_str());
        }
        let n = query.fetch_one(&self.pool).await?;
        Ok(n.max(0) as u64)
    }

    async fn find(&self, options: &FindOptions) -> Result<Vec<Row>, StudioError> {
        let q = sql::select_page(&self.target, options);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = Self::bind_all(&q).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }
}

const REFLECT_COLUMNS_SQL: &str = r#"
    SELECT c.table_name::text,
           c.column_name::text,
           c.udt_name::text,
           c.is_nullable = 'YES' AS nullable,
           EXISTS (
               SELECT 1
               FROM information_schema.table_constraints tc
               JOIN information_schema.key_column_usage k
                 ON k.constraint_name = tc.constraint_name
                AND k.table_schema = tc.table_schema
                AND k.table_name = tc.table_name
               WHERE tc.constraint_type = 'PRIMARY KEY'
                 AND k.table_schema = c.table_schema
                 AND k.table_name = c.table_name
                 AND k.column_name = c.column_name
           ) AS is_primary
    FROM information_schema.columns c
    JOIN information_schema.tables t
      ON t.table_schema = c.table_schema AND t.table_name = c.table_name
    WHERE c.table_schema = $1 AND t.table_type = 'BASE TABLE'
    ORDER BY c.table_name, c.ordinal_position
"#;

const REFLECT_FOREIGN_KEYS_SQL: &str = r#"
    SELECT kcu.table_name::text,
           kcu.column_name::text,
           ccu.table_name::text AS foreign_table
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON kcu.constraint_name = tc.constraint_name AND kcu.table_schema = tc.table_schema
    JOIN information_schema.constraint_column_usage ccu
      ON ccu.constraint_name = tc.constraint_name AND ccu.table_schema = tc.table_schema
    WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = $1
    ORDER BY kcu.table_name, kcu.ordinal_position
"#;

/// Map a PostgreSQL `udt_name` to the studio type tag.
pub fn normalize_pg_type(udt_name: &str) -> String {
    let lower = udt_name.to_lowercase();
    match lower.as_str() {
        "int2" => "smallint",
        "int4" => "int",
        "int8" => "bigint",
        "bpchar" => "char",
        "bool" => "boolean",
        "float4" => "float",
        "float8" => "double",
        other => return other.to_string(),
    }
    .to_string()
}

/// Build entity metadata for every base table in `schema`.
pub async fn reflect_schema(pool: &PgPool, schema: &str) -> Result<Vec<EntityMetadata>, StudioError> {
    tracing::debug!(sql = %REFLECT_COLUMNS_SQL.trim(), schema = %schema, "query");
    let columns = sqlx::query_as::<_, (String, String, String, bool, bool)>(REFLECT_COLUMNS_SQL)
        .bind(schema)
        .fetch_all(pool)
        .await?;
    tracing::debug!(sql = %REFLECT_FOREIGN_KEYS_SQL.trim(), schema = %schema, "query");
    let foreign_keys = sqlx::query_as::<_, (String, String, String)>(REFLECT_FOREIGN_KEYS_SQL)
        .bind(schema)
        .fetch_all(pool)
        .await?;
    Ok(assemble_metadata(schema, columns, foreign_keys))
}

fn assemble_metadata(
    schema: &str,
    columns: Vec<(String, String, String, bool, bool)>,
    foreign_keys: Vec<(String, String, String)>,
) -> Vec<EntityMetadata> {
    let mut order: Vec<String> = Vec::new();
    let mut by_table: HashMap<String, EntityMetadata> = HashMap::new();
    for (table, column, udt, nullable, is_primary) in columns {
        let entry = by_table.entry(table.clone()).or_insert_with(|| {
            order.push(table.clone());
            EntityMetadata {
                name: to_pascal_case(&table),
                table_name: table.clone(),
                schema: Some(schema.to_string()),
                columns: Vec::new(),
                relations: Vec::new(),
            }
        });
        entry.columns.push(ColumnMetadata {
            property_name: column,
            database_name: None,
            type_: ColumnTypeDescriptor::Name(normalize_pg_type(&udt)),
            is_primary,
            is_nullable: nullable,
        });
    }
    for (table, column, foreign_table) in foreign_keys {
        if let Some(entity) = by_table.get_mut(&table) {
            entity.relations.push(RelationMetadata {
                property_name: column,
                inverse_table_name: Some(foreign_table),
                inverse_entity_name: None,
            });
        }
    }
    let mut taken = HashSet::new();
    order
        .into_iter()
        .filter_map(|t| by_table.remove(&t))
        .map(|mut entity| {
            entity.name = unique_entity_name(&entity.table_name, &mut taken);
            entity
        })
        .collect()
}

/// PascalCase of the table, else the table name itself, else a numbered PascalCase name.
/// Tables such as `Users` and `users` would otherwise share one entity name.
fn unique_entity_name(table: &str, taken: &mut HashSet<String>) -> String {
    let pascal = to_pascal_case(table);
    let mut candidate = pascal.clone();
    if taken.contains(&candidate) {
        candidate = table.to_string();
    }
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{}{}", pascal, n);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}
