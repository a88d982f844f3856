pub mod dbt;
pub mod error;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod provisioner;
pub mod scaffold;
pub mod schemas;
pub mod tables;

pub use dbt::DbtProvisioner;
pub use error::{ProvisionError, Result};
#[cfg(feature = "postgres")]
pub use postgres::PostgresProvisioner;
pub use provisioner::{Provisioner, TablePath};
pub use schemas::{create_schemas_and_models, SchemaList, SchemaSummary};
pub use tables::{create_tables, create_tables_from_file, TableOutcome, TableReport, TableStage, TableSummary};
