//! Stage wrappers used by the CLI: timing, summaries and error logging.
//! A failed stage is logged and reported as `false`; it never panics.

use std::time::Instant;

use comfy_table::Table;
use rawseed_core::config::ProjectConfig;
use rawseed_core::profile::{HtmlProfiler, Profiler};
use rawseed_core::{analyse_datasets, Analysis, ScanReport};
use rawseed_provision::{
    create_schemas_and_models, create_tables_from_file, Provisioner, SchemaSummary, TableOutcome,
    TableStage, TableSummary,
};
use tracing::{error, info, warn};

pub fn create_schemas(config: &ProjectConfig, provisioner: &dyn Provisioner) -> bool {
    info!(path = %config.schema_file.display(), "Starting creation of schemas and models");
    let started = Instant::now();

    match create_schemas_and_models(&config.schema_file, &config.models_dir, provisioner) {
        Ok(summary) => {
            print_schemas(&summary);
            info!(
                seconds = started.elapsed().as_secs_f64(),
                "Schema and model creation completed"
            );
            true
        }
        Err(err) => {
            error!(error = %chain(err), "Schema and model creation failed");
            false
        }
    }
}

pub fn analyse(config: &ProjectConfig, profile: bool) -> bool {
    info!(root = %config.base_path.display(), "Starting dataset analysis");
    let started = Instant::now();

    let profiler = HtmlProfiler::new(&config.report_dir);
    let profiler: Option<&dyn Profiler> = if profile { Some(&profiler) } else { None };

    match analyse_datasets(&Analysis::from_config(config, profiler)) {
        Ok(report) => {
            print_scan(&report);
            info!(
                path = %config.column_types_output.display(),
                seconds = started.elapsed().as_secs_f64(),
                "Dataset analysis completed"
            );
            true
        }
        Err(err) => {
            error!(error = %chain(err), "Dataset analysis failed");
            false
        }
    }
}

pub fn create_tables(config: &ProjectConfig, provisioner: &dyn Provisioner, insert: bool) -> bool {
    info!(path = %config.column_types_output.display(), "Starting table creation");
    let started = Instant::now();

    let stage = TableStage {
        schema: &config.raw_schema,
        database: &config.database,
        insert_info: insert,
        models_dir: &config.models_dir,
    };

    match create_tables_from_file(
        &stage,
        &config.column_types_output,
        &config.base_path,
        provisioner,
    ) {
        Ok(summary) => {
            print_tables(&summary);
            let failures = summary.failures();
            if failures > 0 {
                warn!(failures, "Table creation finished with failures");
            }
            info!(
                tables = summary.tables.len(),
                seconds = started.elapsed().as_secs_f64(),
                "Table creation completed"
            );
            failures == 0
        }
        Err(err) => {
            error!(error = %chain(err), "Table creation failed");
            false
        }
    }
}

fn chain(err: impl Into<anyhow::Error>) -> String {
    format!("{:#}", err.into())
}

fn print_schemas(summary: &SchemaSummary) {
    let mut table = Table::new();
    table.set_header(vec!["Schema", "Model folder"]);
    for (schema, dir) in summary.schemas.iter().zip(&summary.model_dirs) {
        table.add_row(vec![schema.clone(), dir.display().to_string()]);
    }
    println!("{table}");
}

fn print_scan(report: &ScanReport) {
    let mut table = Table::new();
    table.set_header(vec!["Dataset", "Rows", "Columns", "Report"]);
    for dataset in &report.processed {
        table.add_row(vec![
            dataset.id.to_string(),
            dataset.rows.to_string(),
            dataset.columns.to_string(),
            dataset
                .report
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    println!("{table}");

    if !report.skipped.is_empty() {
        println!("Skipped {} file(s):", report.skipped.len());
        for skipped in &report.skipped {
            println!("  {}: {}", skipped.path.display(), skipped.reason);
        }
    }
}

fn print_tables(summary: &TableSummary) {
    let mut table = Table::new();
    table.set_header(vec!["Table", "Outcome", "Staging model"]);
    for report in &summary.tables {
        let outcome = match &report.outcome {
            TableOutcome::Created => "created".to_string(),
            TableOutcome::Loaded => "created, loaded".to_string(),
            TableOutcome::CreateFailed(reason) => format!("create failed: {reason}"),
            TableOutcome::LoadFailed(reason) => format!("created, load failed: {reason}"),
            TableOutcome::LoadSkipped(reason) => format!("created, load skipped: {reason}"),
        };
        table.add_row(vec![
            report.table.clone(),
            outcome,
            report
                .staging_model
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    println!("{table}");
    println!("Sources file: {}", summary.sources_file.display());
}
