// crates/rawseed-core/src/config.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PipelineError, Result};

pub const DBT_EXECUTABLE_ENV: &str = "RAWSEED_DBT_EXECUTABLE";

/// Run configuration. Every field has a default so a partial file works.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub base_path: PathBuf,
    pub raw_schema: String,
    pub database: String,
    pub insert_info: bool,
    pub schema_file: PathBuf,
    pub column_type_config: PathBuf,
    pub column_types_output: PathBuf,
    pub report_dir: PathBuf,
    pub profile: bool,
    pub models_dir: PathBuf,
    pub on_dataset_error: DatasetErrorPolicy,
    pub csv: CsvOptions,
    pub dbt: DbtConfig,
    pub logging: LoggingConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("datasets"),
            raw_schema: "bronze".to_string(),
            database: "DataWarehouse".to_string(),
            insert_info: false,
            schema_file: PathBuf::from("config/schema.json"),
            column_type_config: PathBuf::from("config/column_type_config.json"),
            column_types_output: PathBuf::from("config/column_types.json"),
            report_dir: PathBuf::from("profile_report/analysis_html"),
            profile: true,
            models_dir: PathBuf::from("sqlcreator/models"),
            on_dataset_error: DatasetErrorPolicy::default(),
            csv: CsvOptions::default(),
            dbt: DbtConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// What to do when a single CSV cannot be read or parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetErrorPolicy {
    #[default]
    Skip,
    Abort,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Rows used for dtype inference; `None` scans the whole file.
    pub infer_schema_length: Option<usize>,
    pub try_parse_dates: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbtConfig {
    pub executable: String,
    pub project_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub create_schemas_macro: String,
    pub create_table_macro: String,
    pub load_data_macro: String,
}

impl Default for DbtConfig {
    fn default() -> Self {
        Self {
            executable: "dbt".to_string(),
            project_dir: PathBuf::from("./sqlcreator"),
            profiles_dir: PathBuf::from("./sqlcreator/.dbt"),
            create_schemas_macro: "create_multiple_schemas".to_string(),
            create_table_macro: "create_table".to_string(),
            load_data_macro: "inser_data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub subdirectory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            subdirectory: "start_project".to_string(),
        }
    }
}

impl ProjectConfig {
    /// Reads a JSON config, or TOML when the file name ends in `.toml`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| PipelineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        if is_toml {
            toml::from_str(content).map_err(|err| boxed(path, err))
        } else {
            serde_json::from_str(content).map_err(|err| boxed(path, err))
        }
    }

    /// Applies environment overrides on top of the file values.
    pub fn apply_env(&mut self) {
        if let Ok(executable) = std::env::var(DBT_EXECUTABLE_ENV) {
            if !executable.is_empty() {
                self.dbt.executable = executable;
            }
        }
    }

    pub fn log_directory(&self) -> PathBuf {
        self.logging.dir.join(&self.logging.subdirectory)
    }
}

fn boxed(path: &Path, err: impl std::error::Error + Send + Sync + 'static) -> PipelineError {
    PipelineError::ConfigParse {
        path: path.to_path_buf(),
        source: Box::new(err),
    }
}
