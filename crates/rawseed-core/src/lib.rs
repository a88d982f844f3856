pub mod analysis;
pub mod config;
pub mod dataset;
pub mod dtype;
pub mod error;
pub mod ordered;
pub mod profile;
pub mod registry;
pub mod resolver;
pub mod rules;

pub use analysis::{analyse_datasets, scan_datasets, Analysis, ProcessedDataset, ScanReport, SkippedDataset};
pub use dataset::{DatasetFile, DatasetId, DatasetIndex};
pub use error::{PipelineError, Result};
pub use registry::{ColumnTypes, Registry};
pub use rules::{OverrideRule, OverrideRules};
