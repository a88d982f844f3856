// crates/rawseed-core/src/resolver.rs

use std::fs;
use std::io::Cursor;
use std::path::Path;

use polars::prelude::*;
use tracing::debug;

use crate::config::CsvOptions;
use crate::dataset::DatasetId;
use crate::dtype::dtype_label;
use crate::error::{PipelineError, Result};
use crate::registry::ColumnTypes;
use crate::rules::OverrideRules;

/// Reads a CSV with a header row and polars' default parsing.
pub fn read_csv(path: &Path, options: &CsvOptions) -> Result<DataFrame> {
    let content = fs::read(path).map_err(|source| PipelineError::DatasetRead {
        path: path.to_path_buf(),
        source,
    })?;

    let parse_options = CsvParseOptions::default().with_try_parse_dates(options.try_parse_dates);

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(options.infer_schema_length)
        .with_parse_options(parse_options)
        .into_reader_with_file_handle(Cursor::new(content))
        .finish()
        .map_err(|source| PipelineError::DatasetParse {
            path: path.to_path_buf(),
            source,
        })
}

/// Lowercased column names paired with their inferred type labels.
///
/// Missing values widen the label the way pandas does: an all-empty column or
/// an integer column with gaps is `float64`, a boolean column with gaps is
/// `object`.
pub fn infer_column_types(df: &DataFrame) -> ColumnTypes {
    df.get_columns()
        .iter()
        .map(|column| (column.name().as_str().to_lowercase(), column_label(column)))
        .collect()
}

fn column_label(column: &Column) -> String {
    let nulls = column.as_materialized_series().null_count();
    let dtype = column.dtype();

    if nulls == 0 {
        dtype_label(dtype)
    } else if nulls == column.len() || dtype.is_integer() {
        "float64".to_string()
    } else if matches!(dtype, DataType::Boolean) {
        "object".to_string()
    } else {
        dtype_label(dtype)
    }
}

/// Applies every rule, in order, to every column. A rule replaces a column's
/// label when its key occurs in the column name or, failing that, in the
/// label the column carries at that moment, so later rules see (and may
/// overwrite) what earlier rules assigned.
pub fn apply_overrides(dataset: &DatasetId, columns: &mut ColumnTypes, rules: &OverrideRules) {
    for rule in rules {
        for (name, label) in columns.iter_mut() {
            if name.contains(rule.key.as_str()) {
                debug!(dataset = %dataset, column = name, key = %rule.key, mapped_to = %rule.target, "Mapped column by name match");
                *label = rule.target.clone();
            } else if label.contains(rule.key.as_str()) {
                debug!(dataset = %dataset, column = name, key = %rule.key, mapped_to = %rule.target, "Mapped column by dtype match");
                *label = rule.target.clone();
            }
        }
    }
}

pub fn resolve_columns(dataset: &DatasetId, df: &DataFrame, rules: &OverrideRules) -> ColumnTypes {
    let mut columns = infer_column_types(df);
    apply_overrides(dataset, &mut columns, rules);
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::OverrideRule;

    fn dataset() -> DatasetId {
        DatasetId::from_relative_path(Path::new("crm/orders.csv"))
    }

    fn columns(pairs: &[(&str, &str)]) -> ColumnTypes {
        pairs
            .iter()
            .map(|(name, label)| (*name, label.to_string()))
            .collect()
    }

    #[test]
    fn name_match_overrides_only_that_column() {
        let mut cols = columns(&[("id", "int64"), ("name", "object")]);
        let rules = OverrideRules::new(vec![OverrideRule::new("id", "BIGINT")]);

        apply_overrides(&dataset(), &mut cols, &rules);

        assert_eq!(cols.get("id").map(String::as_str), Some("BIGINT"));
        assert_eq!(cols.get("name").map(String::as_str), Some("object"));
    }

    #[test]
    fn substring_matches_name_or_dtype() {
        let mut cols = columns(&[
            ("order_date", "object"),
            ("shipped", "datetime64[ns]"),
            ("amount", "float64"),
        ]);
        let rules = OverrideRules::new(vec![OverrideRule::new("date", "DATE")]);

        apply_overrides(&dataset(), &mut cols, &rules);

        assert_eq!(cols.get("order_date").map(String::as_str), Some("DATE"));
        assert_eq!(cols.get("shipped").map(String::as_str), Some("DATE"));
        assert_eq!(cols.get("amount").map(String::as_str), Some("float64"));
    }

    #[test]
    fn later_rules_overwrite_earlier_results() {
        let mut cols = columns(&[("customer_id", "int64"), ("cst_key", "object")]);
        let rules = OverrideRules::new(vec![
            OverrideRule::new("int64", "INTEGER"),
            OverrideRule::new("id", "BIGINT"),
            OverrideRule::new("object", "VARCHAR(50)"),
        ]);

        apply_overrides(&dataset(), &mut cols, &rules);

        assert_eq!(cols.get("customer_id").map(String::as_str), Some("BIGINT"));
        assert_eq!(cols.get("cst_key").map(String::as_str), Some("VARCHAR(50)"));
    }

    #[test]
    fn rules_see_labels_assigned_by_earlier_rules() {
        let mut cols = columns(&[("price", "float64")]);
        let rules = OverrideRules::new(vec![
            OverrideRule::new("float", "NUMERIC(18,2)"),
            OverrideRule::new("NUMERIC", "DECIMAL(18,2)"),
        ]);

        apply_overrides(&dataset(), &mut cols, &rules);

        assert_eq!(cols.get("price").map(String::as_str), Some("DECIMAL(18,2)"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let mut cols = columns(&[("id", "int64")]);
        let rules = OverrideRules::new(vec![OverrideRule::new("ID", "BIGINT")]);

        apply_overrides(&dataset(), &mut cols, &rules);

        assert_eq!(cols.get("id").map(String::as_str), Some("int64"));
    }

    #[test]
    fn inference_lowercases_names_and_labels_dtypes() {
        let df = df!(
            "ID" => [1i64, 2, 3],
            "Name" => ["a", "b", "c"],
            "Score" => [1.5f64, 2.0, 3.25],
        )
        .unwrap();

        let cols = infer_column_types(&df);

        let pairs: Vec<(&str, &str)> = cols.iter().map(|(k, v)| (k, v.as_str())).collect();
        assert_eq!(
            pairs,
            vec![("id", "int64"), ("name", "object"), ("score", "float64")]
        );
    }

    #[test]
    fn read_csv_infers_types_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("customers.csv");
        fs::write(&path, "cst_id,cst_name,balance\n1,Ana,10.5\n2,Bruno,3.0\n").unwrap();

        let df = read_csv(&path, &CsvOptions::default()).unwrap();
        let cols = infer_column_types(&df);

        assert_eq!(df.height(), 2);
        assert_eq!(cols.get("cst_id").map(String::as_str), Some("int64"));
        assert_eq!(cols.get("cst_name").map(String::as_str), Some("object"));
        assert_eq!(cols.get("balance").map(String::as_str), Some("float64"));
    }

    #[test]
    fn missing_values_widen_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(
            &path,
            "id,amount,d,flag,empty\n1,2,2024-01-01,true,\n,3.5,2024-01-02,,\n",
        )
        .unwrap();

        let df = read_csv(&path, &CsvOptions::default()).unwrap();
        let cols = infer_column_types(&df);

        let pairs: Vec<(&str, &str)> = cols.iter().map(|(k, v)| (k, v.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("id", "float64"),
                ("amount", "float64"),
                ("d", "object"),
                ("flag", "object"),
                ("empty", "float64"),
            ]
        );
    }

    #[test]
    fn header_only_csv_keeps_object_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.csv");
        fs::write(&path, "id,name\n").unwrap();

        let df = read_csv(&path, &CsvOptions::default()).unwrap();
        let cols = infer_column_types(&df);

        assert_eq!(cols.get("id").map(String::as_str), Some("object"));
        assert_eq!(cols.get("name").map(String::as_str), Some("object"));
    }

    #[test]
    fn read_csv_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_csv(&dir.path().join("missing.csv"), &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::DatasetRead { .. }));
    }
}
