use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dataset::DatasetId;
use crate::error::{PipelineError, Result};
use crate::ordered::OrderedMap;

/// Column name to resolved type label, in source column order.
pub type ColumnTypes = OrderedMap<String>;

/// Consolidated dataset → column → type mapping produced by one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    datasets: OrderedMap<ColumnTypes>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `columns` under `id`. Re-inserting an identifier replaces its
    /// columns but keeps the original position.
    pub fn insert(&mut self, id: DatasetId, columns: ColumnTypes) -> Option<ColumnTypes> {
        self.datasets.insert(id.into_string(), columns)
    }

    pub fn get(&self, id: &str) -> Option<&ColumnTypes> {
        self.datasets.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnTypes)> {
        self.datasets.iter()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Pretty JSON with four-space indentation and a trailing newline.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;
        buffer.push(b'\n');
        Ok(buffer)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = self.to_json_pretty()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PipelineError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, bytes).map_err(|source| PipelineError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| PipelineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|err| PipelineError::ConfigParse {
            path: path.to_path_buf(),
            source: Box::new(err),
        })
    }
}
