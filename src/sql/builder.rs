//! Builds parameterized COUNT and paged SELECT statements for a repository.

use crate::datasource::{FieldMatch, FindOptions, MatchOperator, SearchFilter, SortOrder};

/// Quote identifier for PostgreSQL (identifiers come from metadata, never from the request).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Schema-qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

/// Type tags the row decoder maps natively. Every other column is selected as `::text`,
/// so enums, `time`, `numeric` and unknown types arrive as strings instead of null.
const NATIVE_TYPES: &[&str] = &[
    "smallint", "int", "integer", "bigint", "int2", "int4", "int8",
    "float", "double", "real", "float4", "float8", "double precision",
    "boolean", "bool", "uuid",
    "timestamp", "timestamptz", "timestamp with time zone", "timestamp without time zone", "date",
    "varchar", "character varying", "text", "char", "character", "bpchar", "nvarchar", "name", "citext", "string",
    "json", "jsonb",
];

#[derive(Clone, Debug)]
pub struct TargetColumn {
    pub property: String,
    pub column: String,
    pub as_text: bool,
}

impl TargetColumn {
    pub fn new(property: &str, column: &str, type_tag: &str) -> Self {
        TargetColumn {
            property: property.to_string(),
            column: column.to_string(),
            as_text: !NATIVE_TYPES.contains(&type_tag),
        }
    }
}

/// Physical description of a table: qualified name and its columns in declared order.
#[derive(Clone, Debug)]
pub struct TableTarget {
    pub qualified_name: String,
    pub columns: Vec<TargetColumn>,
}

impl TableTarget {
    fn column_for(&self, property: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.property == property)
            .map(|c| c.column.as_str())
    }
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<String>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: String) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

fn operator_sql(op: MatchOperator) -> &'static str {
    match op {
        MatchOperator::ILike => "ILIKE",
        MatchOperator::Like => "LIKE",
        MatchOperator::Equal => "=",
    }
}

/// ` WHERE (a OR b ...)`, or empty when no condition maps to a known column.
fn where_clause(q: &mut QueryBuf, target: &TableTarget, filter: Option<&SearchFilter>) -> String {
    let Some(filter) = filter else {
        return String::new();
    };
    let parts: Vec<String> = filter
        .iter()
        .filter_map(|FieldMatch { property, operator, value }| {
            let column = target.column_for(property)?;
            let n = q.push_param(value.clone());
            Some(format!("{}::text {} ${}", quoted(column), operator_sql(*operator), n))
        })
        .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE ({})", parts.join(" OR "))
    }
}

pub fn count(target: &TableTarget, filter: Option<&SearchFilter>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, target, filter);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", target.qualified_name, where_sql);
    q
}

/// Paged SELECT projecting each column under its property name.
pub fn select_page(target: &TableTarget, options: &FindOptions) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cols = if target.columns.is_empty() {
        "*".to_string()
    } else {
        target
            .columns
            .iter()
            .map(|c| {
                let cast = if c.as_text { "::text" } else { "" };
                format!("{}{} AS {}", quoted(&c.column), cast, quoted(&c.property))
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    let where_sql = where_clause(&mut q, target, options.filter.as_ref());
    let order_sql = options
        .order
        .as_ref()
        .map(|(property, dir)| {
            let column = target.column_for(property).unwrap_or(property);
            let dir = match dir {
                SortOrder::Asc => "ASC",
                SortOrder::Desc => "DESC",
            };
            format!(" ORDER BY {} {}", quoted(column), dir)
        })
        .unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{}{} LIMIT {} OFFSET {}",
        cols, target.qualified_name, where_sql, order_sql, options.take, options.skip
    );
    q
}
