// crates/rawseed-provision/src/dbt.rs

use std::path::{Path, PathBuf};
use std::process::Command;

use rawseed_core::config::DbtConfig;
use rawseed_core::ColumnTypes;
use serde::Serialize;
use tracing::debug;

use crate::error::{ProvisionError, Result};
use crate::provisioner::{Provisioner, TablePath};

/// Drives dbt macros through `dbt run-operation <macro> --args <json>`.
#[derive(Debug, Clone)]
pub struct DbtProvisioner {
    executable: String,
    project_dir: PathBuf,
    profiles_dir: PathBuf,
    create_schemas_macro: String,
    create_table_macro: String,
    load_data_macro: String,
}

/// Captured output of a successful run.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Serialize)]
struct CreateSchemasArgs<'a> {
    schema_list: &'a [String],
}

#[derive(Serialize)]
struct CreateTableArgs<'a> {
    schema: &'a str,
    table_name: &'a str,
    columns: &'a ColumnTypes,
}

#[derive(Serialize)]
struct LoadDataArgs {
    file_path: String,
    table_path: String,
}

impl DbtProvisioner {
    pub fn from_config(config: &DbtConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            project_dir: config.project_dir.clone(),
            profiles_dir: config.profiles_dir.clone(),
            create_schemas_macro: config.create_schemas_macro.clone(),
            create_table_macro: config.create_table_macro.clone(),
            load_data_macro: config.load_data_macro.clone(),
        }
    }

    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    fn command(&self, macro_name: &str, args_json: &str) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .arg("run-operation")
            .arg(macro_name)
            .arg("--args")
            .arg(args_json)
            .arg("--profiles-dir")
            .arg(&self.profiles_dir)
            .arg("--project-dir")
            .arg(&self.project_dir);
        command
    }

    /// Runs one macro. A non-zero exit becomes `CommandFailed` carrying the
    /// trimmed stdout and stderr.
    pub fn run_operation<A: Serialize>(&self, macro_name: &str, args: &A) -> Result<CommandOutput> {
        let args_json = serde_json::to_string(args).map_err(|source| ProvisionError::Arguments {
            operation: macro_name.to_string(),
            source,
        })?;

        debug!(
            executable = %self.executable,
            operation = macro_name,
            args = %args_json,
            "Executing dbt command"
        );

        let output = self
            .command(macro_name, &args_json)
            .output()
            .map_err(|source| ProvisionError::Spawn {
                program: self.executable.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(ProvisionError::CommandFailed {
                operation: macro_name.to_string(),
                status: output.status,
                stdout,
                stderr,
            });
        }

        debug!(operation = macro_name, stdout = %stdout, stderr = %stderr, "dbt command finished");
        Ok(CommandOutput { stdout, stderr })
    }
}

impl Provisioner for DbtProvisioner {
    fn name(&self) -> &'static str {
        "dbt"
    }

    fn create_schemas(&self, schemas: &[String]) -> Result<()> {
        self.run_operation(
            &self.create_schemas_macro,
            &CreateSchemasArgs {
                schema_list: schemas,
            },
        )
        .map(|_| ())
    }

    fn create_table(&self, schema: &str, table: &str, columns: &ColumnTypes) -> Result<()> {
        self.run_operation(
            &self.create_table_macro,
            &CreateTableArgs {
                schema,
                table_name: table,
                columns,
            },
        )
        .map(|_| ())
    }

    fn load_data(&self, csv_path: &Path, target: &TablePath) -> Result<()> {
        self.run_operation(
            &self.load_data_macro,
            &LoadDataArgs {
                file_path: csv_path.display().to_string(),
                table_path: target.to_string(),
            },
        )
        .map(|_| ())
    }
}
