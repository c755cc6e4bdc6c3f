//! Schema Reporter - lists the tables present after a run

use crate::connection::SqlConnection;
use crate::error::{MigrationError, MigrationResult};

/// Schema inspected when none is configured
pub const DEFAULT_SCHEMA: &str = "public";

/// Tables visible in one schema at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSnapshot {
    pub schema: String,
    /// Sorted ascending
    pub tables: Vec<String>,
}

impl SchemaSnapshot {
    pub fn contains(&self, table: &str) -> bool {
        self.tables.binary_search_by(|t| t.as_str().cmp(table)).is_ok()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SchemaReporter {
    schema: String,
}

impl Default for SchemaReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaReporter {
    pub fn new() -> Self {
        Self {
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }

    pub fn with_schema(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Query the table names of the configured schema.
    ///
    /// Ordering is enforced here rather than trusted from the server.
    pub async fn snapshot<C>(&self, conn: &C) -> MigrationResult<SchemaSnapshot>
    where
        C: SqlConnection + ?Sized,
    {
        let mut tables = conn
            .table_names(&self.schema)
            .await
            .map_err(MigrationError::Report)?;
        tables.sort();

        tracing::info!("Tables in {} schema:", self.schema);
        for table in &tables {
            tracing::info!("  - {}", table);
        }

        Ok(SchemaSnapshot {
            schema: self.schema.clone(),
            tables,
        })
    }
}
