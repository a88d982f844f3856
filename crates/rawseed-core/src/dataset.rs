use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::{PipelineError, Result};

const CSV_SUFFIX: &str = ".csv";

/// Normalized dataset name derived from a CSV path relative to the dataset
/// root: separators become `_`, the `.csv` suffix is dropped and the result is
/// lowercased. `crm/Customers.csv` becomes `crm_customers`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn from_relative_path(relative: &Path) -> Self {
        let joined = relative
            .to_string_lossy()
            .replace(['\\', '/'], "_")
            .to_lowercase();
        let name = joined.strip_suffix(CSV_SUFFIX).unwrap_or(&joined);
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DatasetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct DatasetFile {
    pub id: DatasetId,
    pub path: PathBuf,
    pub relative: PathBuf,
}

pub fn is_csv(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase().ends_with(CSV_SUFFIX))
        .unwrap_or(false)
}

/// Lists every `*.csv` file under `root`, recursively, in sorted path order.
///
/// Entries that cannot be read while walking are logged and skipped.
pub fn discover_datasets(root: &Path) -> Result<Vec<DatasetFile>> {
    let root_str = root.to_str().ok_or_else(|| PipelineError::NonUtf8Root {
        path: root.to_path_buf(),
    })?;
    let pattern = Path::new(&glob::Pattern::escape(root_str))
        .join("**")
        .join("*");
    let pattern_str = pattern.to_str().ok_or_else(|| PipelineError::NonUtf8Root {
        path: root.to_path_buf(),
    })?;

    let mut files = Vec::new();
    for entry in glob::glob(pattern_str)? {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                warn!(error = %err, "Could not read path while scanning datasets");
                continue;
            }
        };

        if !path.is_file() || !is_csv(&path) {
            continue;
        }

        let relative = relative_to(root, &path);
        files.push(DatasetFile {
            id: DatasetId::from_relative_path(&relative),
            path,
            relative,
        });
    }

    Ok(files)
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    if let Ok(relative) = path.strip_prefix(root) {
        return relative.to_path_buf();
    }

    let trimmed_root: PathBuf = root
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect();
    let trimmed_path: PathBuf = path
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect();

    trimmed_path
        .strip_prefix(&trimmed_root)
        .map(Path::to_path_buf)
        .unwrap_or(trimmed_path)
}

/// Lookup from dataset identifier back to the CSV it was derived from.
#[derive(Debug, Default)]
pub struct DatasetIndex {
    paths: HashMap<DatasetId, PathBuf>,
}

impl DatasetIndex {
    pub fn scan(root: &Path) -> Result<Self> {
        Ok(Self::from_files(discover_datasets(root)?))
    }

    pub fn from_files(files: impl IntoIterator<Item = DatasetFile>) -> Self {
        let mut paths = HashMap::new();
        for file in files {
            if let Some(previous) = paths.insert(file.id.clone(), file.path) {
                warn!(dataset = %file.id, previous = %previous.display(), "Dataset identifier is shared by several files; keeping the last one");
            }
        }
        Self { paths }
    }

    pub fn get(&self, id: &str) -> Option<&Path> {
        self.paths
            .get(&DatasetId(id.to_string()))
            .map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
