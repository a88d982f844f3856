// crates/rawseed-core/src/analysis.rs

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::config::{CsvOptions, DatasetErrorPolicy, ProjectConfig};
use crate::dataset::{discover_datasets, DatasetId};
use crate::error::Result;
use crate::profile::Profiler;
use crate::registry::Registry;
use crate::resolver::{read_csv, resolve_columns};
use crate::rules::OverrideRules;

/// Inputs of one analysis run.
pub struct Analysis<'a> {
    pub base_path: &'a Path,
    pub rules_path: &'a Path,
    pub output_path: &'a Path,
    pub csv: &'a CsvOptions,
    pub on_dataset_error: DatasetErrorPolicy,
    pub profiler: Option<&'a dyn Profiler>,
}

impl<'a> Analysis<'a> {
    pub fn from_config(config: &'a ProjectConfig, profiler: Option<&'a dyn Profiler>) -> Self {
        Self {
            base_path: &config.base_path,
            rules_path: &config.column_type_config,
            output_path: &config.column_types_output,
            csv: &config.csv,
            on_dataset_error: config.on_dataset_error,
            profiler,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessedDataset {
    pub id: DatasetId,
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SkippedDataset {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub registry: Registry,
    pub processed: Vec<ProcessedDataset>,
    pub skipped: Vec<SkippedDataset>,
}

/// Loads the override rules, scans the dataset root and writes the registry
/// snapshot. Nothing is read or written when the rules cannot be loaded.
pub fn analyse_datasets(analysis: &Analysis<'_>) -> Result<ScanReport> {
    let rules = OverrideRules::load(analysis.rules_path)?;
    info!(rules = rules.len(), "Loaded column type overrides");

    let report = scan_datasets(analysis, &rules)?;

    report.registry.write(analysis.output_path)?;
    info!(
        path = %analysis.output_path.display(),
        datasets = report.registry.len(),
        "Column type registry saved"
    );
    Ok(report)
}

/// Resolves column types for every CSV under the dataset root.
pub fn scan_datasets(analysis: &Analysis<'_>, rules: &OverrideRules) -> Result<ScanReport> {
    info!(root = %analysis.base_path.display(), "Starting recursive dataset scan");

    let mut report = ScanReport::default();

    for file in discover_datasets(analysis.base_path)? {
        info!(dataset = %file.id, path = %file.path.display(), "Processing dataset");

        let df = match read_csv(&file.path, analysis.csv) {
            Ok(df) => df,
            Err(err) => match analysis.on_dataset_error {
                DatasetErrorPolicy::Skip => {
                    error!(dataset = %file.id, error = %err, "Skipping unreadable dataset");
                    report.skipped.push(SkippedDataset {
                        path: file.path,
                        reason: err.to_string(),
                    });
                    continue;
                }
                DatasetErrorPolicy::Abort => return Err(err),
            },
        };

        let columns = resolve_columns(&file.id, &df, rules);
        let column_count = columns.len();

        let report_path = match analysis.profiler {
            Some(profiler) => match profiler.profile(&file.id, &df) {
                Ok(path) => {
                    info!(dataset = %file.id, report = %path.display(), "Profiling report generated");
                    Some(path)
                }
                Err(err) => {
                    warn!(dataset = %file.id, error = %err, "Profiling report failed");
                    None
                }
            },
            None => None,
        };

        if report.registry.insert(file.id.clone(), columns).is_some() {
            warn!(dataset = %file.id, path = %file.path.display(), "Dataset identifier seen before; replacing its columns");
        }

        report.processed.push(ProcessedDataset {
            id: file.id,
            path: file.path,
            rows: df.height(),
            columns: column_count,
            report: report_path,
        });
    }

    info!(
        processed = report.processed.len(),
        skipped = report.skipped.len(),
        "Dataset scan finished"
    );
    Ok(report)
}
