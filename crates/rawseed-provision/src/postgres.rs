// crates/rawseed-provision/src/postgres.rs

use std::fs;
use std::path::Path;
use std::time::Duration;

use rawseed_core::ColumnTypes;
use sqlx::postgres::{PgPoolCopyExt, PgPoolOptions};
use sqlx::PgPool;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use crate::error::{ProvisionError, Result};
use crate::provisioner::{Provisioner, TablePath};

const COPY_CHUNK_BYTES: usize = 64 * 1024;

/// Talks to Postgres directly instead of going through dbt macros.
///
/// Owns a current-thread runtime and blocks on every statement, so callers
/// stay synchronous.
pub struct PostgresProvisioner {
    runtime: Runtime,
    pool: PgPool,
}

impl PostgresProvisioner {
    pub fn connect(database_url: &str) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ProvisionError::Runtime)?;
        let pool = runtime.block_on(
            PgPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Duration::from_secs(10))
                .connect(database_url),
        )?;
        info!("Postgres connection pool established");
        Ok(Self { runtime, pool })
    }

    fn execute(&self, statement: &str) -> Result<()> {
        debug!(statement, "Executing statement");
        self.runtime
            .block_on(sqlx::query(statement).execute(&self.pool))?;
        Ok(())
    }
}

impl Provisioner for PostgresProvisioner {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn create_schemas(&self, schemas: &[String]) -> Result<()> {
        for schema in schemas {
            self.execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema)))?;
        }
        Ok(())
    }

    fn create_table(&self, schema: &str, table: &str, columns: &ColumnTypes) -> Result<()> {
        self.execute(&create_table_sql(schema, table, columns))
    }

    fn load_data(&self, csv_path: &Path, target: &TablePath) -> Result<()> {
        let columns = csv_header(csv_path)?;
        let content = fs::read(csv_path).map_err(|source| ProvisionError::Read {
            path: csv_path.to_path_buf(),
            source,
        })?;
        let statement = copy_sql(target, &columns);
        debug!(statement = %statement, "Executing COPY");

        let rows = self.runtime.block_on(async {
            let mut copy = self.pool.copy_in_raw(&statement).await?;
            for chunk in content.chunks(COPY_CHUNK_BYTES) {
                copy.send(chunk).await?;
            }
            copy.finish().await
        })?;
        info!(table = %target, rows, "COPY finished");
        Ok(())
    }
}

fn csv_header(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| ProvisionError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    let headers = reader.headers().map_err(|source| ProvisionError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(headers.iter().map(|name| name.to_lowercase()).collect())
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Maps inferred dtype labels to Postgres types. Anything else is an
/// override target and is used verbatim.
pub fn sql_type(label: &str) -> &str {
    match label {
        "int32" => "INTEGER",
        "int64" => "BIGINT",
        "uint32" => "BIGINT",
        "uint64" => "NUMERIC(20)",
        "float32" => "REAL",
        "float64" => "DOUBLE PRECISION",
        "object" => "TEXT",
        "bool" => "BOOLEAN",
        "datetime64[ns]" => "TIMESTAMP",
        other if other.starts_with("datetime64[ns,") => "TIMESTAMPTZ",
        other if other.starts_with("timedelta64") => "INTERVAL",
        other => other,
    }
}

pub fn create_table_sql(schema: &str, table: &str, columns: &ColumnTypes) -> String {
    let definitions: Vec<String> = columns
        .iter()
        .map(|(name, label)| format!("{} {}", quote_ident(name), sql_type(label)))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {}.{} ({})",
        quote_ident(schema),
        quote_ident(table),
        definitions.join(", ")
    )
}

pub fn copy_sql(target: &TablePath, columns: &[String]) -> String {
    let columns: Vec<String> = columns.iter().map(|name| quote_ident(name)).collect();
    format!(
        "COPY {}.{} ({}) FROM STDIN WITH (FORMAT csv, HEADER true)",
        quote_ident(&target.schema),
        quote_ident(&target.table),
        columns.join(", ")
    )
}
