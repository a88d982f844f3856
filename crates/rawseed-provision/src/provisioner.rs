use std::fmt;
use std::path::Path;

use rawseed_core::ColumnTypes;

use crate::error::Result;

/// Fully qualified target table, rendered as `schema.table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePath {
    pub schema: String,
    pub table: String,
}

impl TablePath {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Performs DDL/DML against the target warehouse. Every call blocks until
/// the work is done.
pub trait Provisioner {
    fn name(&self) -> &'static str;

    fn create_schemas(&self, schemas: &[String]) -> Result<()>;

    fn create_table(&self, schema: &str, table: &str, columns: &ColumnTypes) -> Result<()>;

    /// `csv_path` is absolute.
    fn load_data(&self, csv_path: &Path, target: &TablePath) -> Result<()>;
}
