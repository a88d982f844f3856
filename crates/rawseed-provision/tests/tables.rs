use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use rawseed_core::{ColumnTypes, DatasetId, DatasetIndex, Registry};
use rawseed_provision::{
    create_schemas_and_models, create_tables, create_tables_from_file, Provisioner,
    ProvisionError, TableOutcome, TablePath, TableStage,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Schemas(Vec<String>),
    Create(String, String, Vec<String>),
    Load(PathBuf, String),
}

/// Records every call and fails the tables it was told to fail.
#[derive(Default)]
struct FakeProvisioner {
    calls: RefCell<Vec<Call>>,
    fail_create: Vec<&'static str>,
    fail_load: Vec<&'static str>,
    fail_schemas: bool,
}

fn failure(operation: &str) -> ProvisionError {
    ProvisionError::Spawn {
        program: operation.to_string(),
        source: std::io::Error::other("simulated failure"),
    }
}

impl Provisioner for FakeProvisioner {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn create_schemas(&self, schemas: &[String]) -> rawseed_provision::Result<()> {
        self.calls.borrow_mut().push(Call::Schemas(schemas.to_vec()));
        if self.fail_schemas {
            return Err(failure("create_schemas"));
        }
        Ok(())
    }

    fn create_table(
        &self,
        schema: &str,
        table: &str,
        columns: &ColumnTypes,
    ) -> rawseed_provision::Result<()> {
        self.calls.borrow_mut().push(Call::Create(
            schema.to_string(),
            table.to_string(),
            columns.keys().map(str::to_string).collect(),
        ));
        if self.fail_create.contains(&table) {
            return Err(failure("create_table"));
        }
        Ok(())
    }

    fn load_data(&self, csv_path: &Path, target: &TablePath) -> rawseed_provision::Result<()> {
        self.calls
            .borrow_mut()
            .push(Call::Load(csv_path.to_path_buf(), target.to_string()));
        if self.fail_load.contains(&target.table.as_str()) {
            return Err(failure("load_data"));
        }
        Ok(())
    }
}

fn columns(names: &[&str]) -> ColumnTypes {
    names
        .iter()
        .map(|name| (*name, "object".to_string()))
        .collect()
}

fn registry(tables: &[(&str, &[&str])]) -> Registry {
    let mut registry = Registry::new();
    for (relative, cols) in tables {
        registry.insert(
            DatasetId::from_relative_path(Path::new(relative)),
            columns(cols),
        );
    }
    registry
}

fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn failing_table_does_not_halt_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let models_dir = dir.path().join("models");
    let registry = registry(&[
        ("crm/customers.csv", &["id", "name"]),
        ("crm/broken.csv", &["id"]),
        ("erp/orders.csv", &["order_id", "amount"]),
    ]);
    let provisioner = FakeProvisioner {
        fail_create: vec!["crm_broken"],
        ..Default::default()
    };
    let stage = TableStage {
        schema: "bronze",
        database: "DataWarehouse",
        insert_info: false,
        models_dir: &models_dir,
    };

    let summary = create_tables(&stage, &registry, &DatasetIndex::default(), &provisioner)
        .expect("stage completes");

    let outcomes: Vec<(&str, &TableOutcome)> = summary
        .tables
        .iter()
        .map(|report| (report.table.as_str(), &report.outcome))
        .collect();
    assert_eq!(outcomes[0], ("crm_customers", &TableOutcome::Created));
    assert!(matches!(outcomes[1], ("crm_broken", TableOutcome::CreateFailed(_))));
    assert_eq!(outcomes[2], ("erp_orders", &TableOutcome::Created));
    assert_eq!(summary.failures(), 1);

    let created: Vec<String> = provisioner
        .calls
        .borrow()
        .iter()
        .filter_map(|call| match call {
            Call::Create(_, table, _) => Some(table.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(created, vec!["crm_customers", "crm_broken", "erp_orders"]);

    let staging = models_dir.join("staging/bronze");
    assert!(staging.join("stg_crm_customers.sql").is_file());
    assert!(!staging.join("stg_crm_broken.sql").exists());
    assert!(staging.join("stg_erp_orders.sql").is_file());

    let yaml: serde_yaml::Value =
        serde_yaml::from_str(&fs::read_to_string(&summary.sources_file).unwrap()).unwrap();
    let tables: Vec<&str> = yaml["sources"][0]["tables"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(|table| table["name"].as_str())
        .collect();
    assert_eq!(tables, vec!["crm_customers", "erp_orders"]);
}

#[test]
fn create_table_receives_columns_in_registry_order() {
    let dir = tempfile::tempdir().unwrap();
    let models_dir = dir.path().join("models");
    let registry = registry(&[("crm/customers.csv", &["zip", "id", "name"])]);
    let provisioner = FakeProvisioner::default();
    let stage = TableStage {
        schema: "raw",
        database: "DataWarehouse",
        insert_info: false,
        models_dir: &models_dir,
    };

    create_tables(&stage, &registry, &DatasetIndex::default(), &provisioner).unwrap();

    assert_eq!(
        provisioner.calls.borrow()[0],
        Call::Create(
            "raw".to_string(),
            "crm_customers".to_string(),
            vec!["zip".to_string(), "id".to_string(), "name".to_string()],
        )
    );
}

#[test]
fn data_is_loaded_from_the_matching_csv() {
    let dir = tempfile::tempdir().unwrap();
    let datasets = dir.path().join("datasets");
    let models_dir = dir.path().join("models");
    let customers = write(&datasets, "crm/customers.csv", "id,name\n1,Ana\n");
    write(&datasets, "erp/sales/order_lines.csv", "order_id\n7\n");

    let registry = registry(&[
        ("crm/customers.csv", &["id", "name"]),
        ("erp/sales/order_lines.csv", &["order_id"]),
        ("crm/vanished.csv", &["id"]),
    ]);
    let provisioner = FakeProvisioner {
        fail_load: vec!["erp_sales_order_lines"],
        ..Default::default()
    };
    let stage = TableStage {
        schema: "bronze",
        database: "DataWarehouse",
        insert_info: true,
        models_dir: &models_dir,
    };

    let index = DatasetIndex::scan(&datasets).unwrap();
    let summary = create_tables(&stage, &registry, &index, &provisioner).unwrap();

    assert_eq!(summary.tables[0].outcome, TableOutcome::Loaded);
    assert!(matches!(summary.tables[1].outcome, TableOutcome::LoadFailed(_)));
    assert!(matches!(summary.tables[2].outcome, TableOutcome::LoadSkipped(_)));
    assert_eq!(summary.failures(), 1);

    let loads: Vec<Call> = provisioner
        .calls
        .borrow()
        .iter()
        .filter(|call| matches!(call, Call::Load(..)))
        .cloned()
        .collect();
    assert_eq!(loads.len(), 2);
    assert_eq!(
        loads[0],
        Call::Load(
            fs::canonicalize(&customers).unwrap(),
            "bronze.crm_customers".to_string()
        )
    );
    if let Call::Load(path, _) = &loads[0] {
        assert!(path.is_absolute());
    }
}

#[test]
fn sources_file_is_written_even_when_every_table_fails() {
    let dir = tempfile::tempdir().unwrap();
    let models_dir = dir.path().join("models");
    let registry = registry(&[("crm/customers.csv", &["id"])]);
    let provisioner = FakeProvisioner {
        fail_create: vec!["crm_customers"],
        ..Default::default()
    };
    let stage = TableStage {
        schema: "bronze",
        database: "DataWarehouse",
        insert_info: true,
        models_dir: &models_dir,
    };

    let summary = create_tables(&stage, &registry, &DatasetIndex::default(), &provisioner).unwrap();

    assert!(summary.sources_file.is_file());
    assert!(!provisioner
        .calls
        .borrow()
        .iter()
        .any(|call| matches!(call, Call::Load(..))));
}

#[test]
fn missing_registry_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let models_dir = dir.path().join("models");
    let provisioner = FakeProvisioner::default();
    let stage = TableStage {
        schema: "bronze",
        database: "DataWarehouse",
        insert_info: false,
        models_dir: &models_dir,
    };

    let err = create_tables_from_file(
        &stage,
        &dir.path().join("column_types.json"),
        &dir.path().join("datasets"),
        &provisioner,
    )
    .unwrap_err();

    assert!(matches!(err, ProvisionError::Pipeline(_)));
    assert!(provisioner.calls.borrow().is_empty());
}

#[test]
fn schemas_then_model_folders() {
    let dir = tempfile::tempdir().unwrap();
    let schema_file = write(
        dir.path(),
        "config/schema.json",
        r#"{"schema_list": ["bronze", "silver", "gold"]}"#,
    );
    let models_dir = dir.path().join("models");
    let provisioner = FakeProvisioner::default();

    let summary = create_schemas_and_models(&schema_file, &models_dir, &provisioner).unwrap();

    assert_eq!(summary.schemas, vec!["bronze", "silver", "gold"]);
    assert_eq!(
        provisioner.calls.borrow()[0],
        Call::Schemas(vec!["bronze".into(), "silver".into(), "gold".into()])
    );
    for schema in ["bronze", "silver", "gold"] {
        assert!(models_dir.join(schema).is_dir());
    }
}

#[test]
fn failed_schema_creation_leaves_models_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let schema_file = write(dir.path(), "config/schema.json", r#"{"schema_list": ["bronze"]}"#);
    let models_dir = dir.path().join("models");
    let provisioner = FakeProvisioner {
        fail_schemas: true,
        ..Default::default()
    };

    assert!(create_schemas_and_models(&schema_file, &models_dir, &provisioner).is_err());
    assert!(!models_dir.exists());
}

#[test]
fn malformed_schema_file_provisions_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let schema_file = write(dir.path(), "config/schema.json", r#"{"schemas": ["bronze"]}"#);
    let provisioner = FakeProvisioner::default();

    let err = create_schemas_and_models(&schema_file, &dir.path().join("models"), &provisioner)
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Pipeline(_)));
    assert!(provisioner.calls.borrow().is_empty());
}
