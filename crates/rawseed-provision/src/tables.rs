// crates/rawseed-provision/src/tables.rs

use std::fs;
use std::path::{Path, PathBuf};

use rawseed_core::{DatasetIndex, Registry};
use tracing::{debug, error, info, warn};

use crate::error::{ProvisionError, Result};
use crate::provisioner::{Provisioner, TablePath};
use crate::scaffold::{ScaffoldWriter, SourceTable};

/// Settings of the table stage.
#[derive(Debug, Clone)]
pub struct TableStage<'a> {
    pub schema: &'a str,
    pub database: &'a str,
    pub insert_info: bool,
    pub models_dir: &'a Path,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    /// Table created; data loading was not requested.
    Created,
    Loaded,
    CreateFailed(String),
    LoadFailed(String),
    LoadSkipped(String),
}

impl TableOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::CreateFailed(_) | Self::LoadFailed(_))
    }
}

#[derive(Debug, Clone)]
pub struct TableReport {
    pub table: String,
    pub outcome: TableOutcome,
    pub staging_model: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct TableSummary {
    pub tables: Vec<TableReport>,
    pub sources_file: PathBuf,
}

impl TableSummary {
    pub fn failures(&self) -> usize {
        self.tables
            .iter()
            .filter(|report| report.outcome.is_failure())
            .count()
    }
}

/// Loads the registry snapshot and provisions every table in it. The dataset
/// root is only scanned when data loading is enabled.
pub fn create_tables_from_file(
    stage: &TableStage<'_>,
    registry_path: &Path,
    dataset_root: &Path,
    provisioner: &dyn Provisioner,
) -> Result<TableSummary> {
    info!(path = %registry_path.display(), "Starting table creation from registry");
    let registry = Registry::load(registry_path)?;
    let datasets = if stage.insert_info {
        let index = DatasetIndex::scan(dataset_root)?;
        info!(root = %dataset_root.display(), datasets = index.len(), "Indexed CSV files for loading");
        index
    } else {
        DatasetIndex::default()
    };
    create_tables(stage, &registry, &datasets, provisioner)
}

/// Creates one table per registry entry, scaffolds a staging model for each
/// created table and writes the schema's sources file at the end. A failing
/// table is logged and skipped; the remaining tables still run.
pub fn create_tables(
    stage: &TableStage<'_>,
    registry: &Registry,
    datasets: &DatasetIndex,
    provisioner: &dyn Provisioner,
) -> Result<TableSummary> {
    let scaffold = ScaffoldWriter::new(stage.models_dir, stage.schema, stage.database);
    let mut reports = Vec::with_capacity(registry.len());
    let mut source_tables = Vec::new();

    for (table, columns) in registry.iter() {
        debug!(table, provisioner = provisioner.name(), "Executing DDL");
        if let Err(err) = provisioner.create_table(stage.schema, table, columns) {
            log_failure(table, "create_table", &err);
            reports.push(TableReport {
                table: table.to_string(),
                outcome: TableOutcome::CreateFailed(err.to_string()),
                staging_model: None,
            });
            continue;
        }
        info!(table, "Table created");

        let staging_model = scaffold.write_staging_model(table)?;
        info!(table, path = %staging_model.display(), "Staging model created");
        source_tables.push(SourceTable::from_columns(stage.schema, table, columns));

        let outcome = if stage.insert_info {
            load_table(stage, table, datasets, provisioner)
        } else {
            TableOutcome::Created
        };

        reports.push(TableReport {
            table: table.to_string(),
            outcome,
            staging_model: Some(staging_model),
        });
    }

    let sources_file = scaffold.write_sources(source_tables)?;
    info!(path = %sources_file.display(), "Sources file created");

    Ok(TableSummary {
        tables: reports,
        sources_file,
    })
}

fn load_table(
    stage: &TableStage<'_>,
    table: &str,
    datasets: &DatasetIndex,
    provisioner: &dyn Provisioner,
) -> TableOutcome {
    let Some(csv_path) = datasets.get(table) else {
        warn!(table, "CSV file not found, skipping data load");
        return TableOutcome::LoadSkipped("no CSV file matches this table".to_string());
    };

    let absolute = match fs::canonicalize(csv_path) {
        Ok(path) => path,
        Err(err) => {
            warn!(table, path = %csv_path.display(), error = %err, "CSV file not accessible, skipping data load");
            return TableOutcome::LoadSkipped(err.to_string());
        }
    };

    let target = TablePath::new(stage.schema, table);
    debug!(table, path = %absolute.display(), "Executing DML");
    match provisioner.load_data(&absolute, &target) {
        Ok(()) => {
            info!(table, destination = %target, "Data loaded");
            TableOutcome::Loaded
        }
        Err(err) => {
            log_failure(table, "load_data", &err);
            TableOutcome::LoadFailed(err.to_string())
        }
    }
}

fn log_failure(table: &str, operation: &str, err: &ProvisionError) {
    match err {
        ProvisionError::CommandFailed {
            status,
            stdout,
            stderr,
            ..
        } => error!(table, operation, status = %status, stdout = %stdout, stderr = %stderr, "Provisioning failed"),
        other => error!(table, operation, error = %other, "Provisioning failed"),
    }
}
