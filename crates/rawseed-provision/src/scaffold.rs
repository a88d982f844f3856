//! dbt staging models and source definitions for provisioned tables.

use std::fs;
use std::path::{Path, PathBuf};

use rawseed_core::ColumnTypes;
use serde::Serialize;

use crate::error::{ProvisionError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceDefinition>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceDefinition {
    pub name: String,
    pub database: String,
    pub schema: String,
    pub tables: Vec<SourceTable>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceTable {
    pub name: String,
    pub description: String,
    pub columns: Vec<SourceColumn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceColumn {
    pub name: String,
    pub description: String,
}

impl SourceTable {
    pub fn from_columns(schema: &str, table: &str, columns: &ColumnTypes) -> Self {
        Self {
            name: table.to_string(),
            description: format!("Source table {schema}.{table}"),
            columns: columns
                .keys()
                .map(|name| SourceColumn {
                    name: name.to_string(),
                    description: String::new(),
                })
                .collect(),
        }
    }
}

pub fn staging_sql(schema: &str, table: &str) -> String {
    format!("SELECT\n    *\nFROM {{{{ source('{schema}', '{table}') }}}}\n")
}

/// Writes scaffold files under `<models_dir>/staging/<schema>/`.
#[derive(Debug, Clone)]
pub struct ScaffoldWriter {
    schema: String,
    database: String,
    staging_dir: PathBuf,
}

impl ScaffoldWriter {
    pub fn new(models_dir: &Path, schema: &str, database: &str) -> Self {
        Self {
            schema: schema.to_string(),
            database: database.to_string(),
            staging_dir: models_dir.join("staging").join(schema),
        }
    }

    pub fn write_staging_model(&self, table: &str) -> Result<PathBuf> {
        let path = self.staging_dir.join(format!("stg_{table}.sql"));
        self.write(&path, staging_sql(&self.schema, table).as_bytes())?;
        Ok(path)
    }

    pub fn sources_file(&self, tables: Vec<SourceTable>) -> SourcesFile {
        SourcesFile {
            sources: vec![SourceDefinition {
                name: self.schema.clone(),
                database: self.database.clone(),
                schema: self.schema.clone(),
                tables,
            }],
        }
    }

    pub fn write_sources(&self, tables: Vec<SourceTable>) -> Result<PathBuf> {
        let path = self.staging_dir.join(format!("_src_{}.yml", self.schema));
        let yaml = serde_yaml::to_string(&self.sources_file(tables))?;
        self.write(&path, yaml.as_bytes())?;
        Ok(path)
    }

    fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.staging_dir).map_err(|source| ProvisionError::Write {
            path: self.staging_dir.clone(),
            source,
        })?;
        fs::write(path, content).map_err(|source| ProvisionError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_sql_selects_everything_from_source() {
        assert_eq!(
            staging_sql("bronze", "crm_customers"),
            "SELECT\n    *\nFROM {{ source('bronze', 'crm_customers') }}\n"
        );
    }

    #[test]
    fn source_table_lists_columns_in_registry_order() {
        let columns: ColumnTypes = [("id", "BIGINT"), ("name", "object")]
            .into_iter()
            .map(|(name, label)| (name, label.to_string()))
            .collect();

        let table = SourceTable::from_columns("bronze", "crm_customers", &columns);

        assert_eq!(table.description, "Source table bronze.crm_customers");
        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name"]);
        assert!(table.columns.iter().all(|c| c.description.is_empty()));
    }

    #[test]
    fn sources_yaml_keeps_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ScaffoldWriter::new(dir.path(), "bronze", "DataWarehouse");
        let columns: ColumnTypes = [("id", "BIGINT".to_string())].into_iter().collect();

        let path = writer
            .write_sources(vec![SourceTable::from_columns("bronze", "crm_customers", &columns)])
            .unwrap();

        assert_eq!(path, dir.path().join("staging/bronze/_src_bronze.yml"));
        let yaml = fs::read_to_string(&path).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        let source = &value["sources"][0];
        let keys: Vec<&str> = source
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(|key| key.as_str())
            .collect();
        assert_eq!(keys, vec!["name", "database", "schema", "tables"]);
        assert_eq!(source["database"].as_str(), Some("DataWarehouse"));
        assert_eq!(source["tables"][0]["name"].as_str(), Some("crm_customers"));
        assert_eq!(source["tables"][0]["columns"][0]["description"].as_str(), Some(""));
    }
}
