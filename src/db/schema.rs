//! Schema introspection.
//!
//! Turns the flat column catalog into a per-table description and renders it
//! as the compact text the SQL-generation prompt embeds.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::DatabaseClient;

/// Text substituted for the schema when the catalog query fails.
pub const SCHEMA_UNAVAILABLE: &str = "Error: Could not retrieve database schema.";

/// One row of the column catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Owning table.
    pub table_name: String,

    /// Column name.
    pub column_name: String,

    /// Data type as reported by the catalog (e.g. "integer", "character varying").
    pub data_type: String,
}

impl CatalogEntry {
    /// Creates a catalog entry.
    pub fn new(
        table_name: impl Into<String>,
        column_name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            column_name: column_name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Ordered description of the user-visible tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    /// Tables in catalog order.
    pub tables: Vec<TableSchema>,
}

/// A table and its columns in ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,

    /// Columns in ordinal order.
    pub columns: Vec<ColumnSchema>,
}

/// A column name and its data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,

    /// Data type name.
    pub data_type: String,
}

impl SchemaDescription {
    /// Groups catalog rows into tables.
    ///
    /// Consecutive rows sharing a table name form one group, so the input
    /// must already be ordered by table name then ordinal position. An
    /// unordered input produces repeated table groups.
    pub fn from_catalog(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut tables: Vec<TableSchema> = Vec::new();

        for entry in entries {
            let column = ColumnSchema {
                name: entry.column_name,
                data_type: entry.data_type,
            };
            match tables.last_mut() {
                Some(table) if table.name == entry.table_name => table.columns.push(column),
                _ => tables.push(TableSchema {
                    name: entry.table_name,
                    columns: vec![column],
                }),
            }
        }

        Self { tables }
    }

    /// Returns true if no tables are visible.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Renders the description for inclusion in a prompt.
    ///
    /// Each table is a `Table: <name>` header followed by `  - <column>: <type>`
    /// lines; a blank line separates tables.
    pub fn render(&self) -> String {
        self.tables
            .iter()
            .map(Self::render_table)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_table(table: &TableSchema) -> String {
        let column_lines = table
            .columns
            .iter()
            .map(|column| format!("  - {}: {}\n", column.name, column.data_type))
            .collect::<String>();

        format!("Table: {}\n{}", table.name, column_lines)
    }
}

/// Reads the live catalog and renders it.
///
/// Never fails: a catalog error degrades to [`SCHEMA_UNAVAILABLE`], which
/// downstream stages treat as ordinary context text.
pub async fn introspect_schema(db: &dyn DatabaseClient) -> String {
    match db.fetch_catalog().await {
        Ok(entries) => {
            let schema = SchemaDescription::from_catalog(entries);
            debug!("Introspected {} tables", schema.tables.len());
            schema.render()
        }
        Err(e) => {
            warn!("Error fetching schema: {}", e);
            SCHEMA_UNAVAILABLE.to_string()
        }
    }
}
