use std::fs;
use std::path::{Path, PathBuf};

use rawseed_core::PipelineError;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{ProvisionError, Result};
use crate::provisioner::Provisioner;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaList {
    pub schema_list: Vec<String>,
}

impl SchemaList {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| PipelineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let list = serde_json::from_str(&content).map_err(|err| PipelineError::ConfigParse {
            path: path.to_path_buf(),
            source: Box::new(err),
        })?;
        Ok(list)
    }
}

#[derive(Debug, Clone)]
pub struct SchemaSummary {
    pub schemas: Vec<String>,
    pub model_dirs: Vec<PathBuf>,
}

/// Creates every schema listed in `schema_file`, then one model folder per
/// schema under `models_dir`. Folders are only created once the provisioner
/// succeeded.
pub fn create_schemas_and_models(
    schema_file: &Path,
    models_dir: &Path,
    provisioner: &dyn Provisioner,
) -> Result<SchemaSummary> {
    info!(path = %schema_file.display(), "Loading schema list");
    let list = SchemaList::load(schema_file)?;

    if let Err(err) = provisioner.create_schemas(&list.schema_list) {
        if let ProvisionError::CommandFailed { stdout, stderr, .. } = &err {
            error!(provisioner = provisioner.name(), stdout = %stdout, stderr = %stderr, "Schema creation failed");
        } else {
            error!(provisioner = provisioner.name(), error = %err, "Schema creation failed");
        }
        return Err(err);
    }
    info!(
        provisioner = provisioner.name(),
        schemas = list.schema_list.len(),
        "Schemas created"
    );

    let mut model_dirs = Vec::with_capacity(list.schema_list.len());
    for schema in &list.schema_list {
        let dir = models_dir.join(schema);
        fs::create_dir_all(&dir).map_err(|source| ProvisionError::Write {
            path: dir.clone(),
            source,
        })?;
        debug!(path = %dir.display(), "Model folder created");
        model_dirs.push(dir);
    }

    Ok(SchemaSummary {
        schemas: list.schema_list,
        model_dirs,
    })
}
