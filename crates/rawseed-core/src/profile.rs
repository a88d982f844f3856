use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use polars::prelude::*;

use crate::dataset::DatasetId;
use crate::dtype::dtype_label;
use crate::error::{PipelineError, Result};

const REPORT_TITLE: &str = "Profiling Report";

/// Produces a profiling artifact for one dataset and returns where it went.
pub trait Profiler {
    fn profile(&self, dataset: &DatasetId, df: &DataFrame) -> Result<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
    pub distinct_count: usize,
}

#[derive(Debug, Clone)]
pub struct DatasetProfile {
    pub rows: usize,
    pub columns: Vec<ColumnProfile>,
}

impl DatasetProfile {
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let columns = df
            .get_columns()
            .iter()
            .map(|column| {
                let series = column.as_materialized_series();
                Ok(ColumnProfile {
                    name: column.name().to_string(),
                    dtype: dtype_label(column.dtype()),
                    null_count: series.null_count(),
                    distinct_count: series.n_unique()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rows: df.height(),
            columns,
        })
    }
}

/// Writes `<output_dir>/<dataset>.html` with per-column null and distinct
/// counts.
#[derive(Debug, Clone)]
pub struct HtmlProfiler {
    output_dir: PathBuf,
}

impl HtmlProfiler {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn render(&self, dataset: &DatasetId, profile: &DatasetProfile) -> String {
        let mut html = String::new();
        let _ = writeln!(html, "<!DOCTYPE html>");
        let _ = writeln!(html, "<html lang=\"en\">");
        let _ = writeln!(html, "<head>");
        let _ = writeln!(html, "<meta charset=\"utf-8\">");
        let _ = writeln!(html, "<title>{} - {}</title>", REPORT_TITLE, escape(dataset.as_str()));
        let _ = writeln!(html, "</head>");
        let _ = writeln!(html, "<body>");
        let _ = writeln!(html, "<h1>{}</h1>", REPORT_TITLE);
        let _ = writeln!(html, "<h2>{}</h2>", escape(dataset.as_str()));
        let _ = writeln!(html, "<p>Generated at {}</p>", Utc::now().to_rfc3339());
        let _ = writeln!(
            html,
            "<p>{} rows, {} columns</p>",
            profile.rows,
            profile.columns.len()
        );
        let _ = writeln!(html, "<table>");
        let _ = writeln!(
            html,
            "<tr><th>Column</th><th>Type</th><th>Missing</th><th>Missing (%)</th><th>Distinct</th></tr>"
        );
        for column in &profile.columns {
            let missing_pct = if profile.rows == 0 {
                0.0
            } else {
                column.null_count as f64 * 100.0 / profile.rows as f64
            };
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.1}</td><td>{}</td></tr>",
                escape(&column.name),
                escape(&column.dtype),
                column.null_count,
                missing_pct,
                column.distinct_count
            );
        }
        let _ = writeln!(html, "</table>");
        let _ = writeln!(html, "</body>");
        let _ = writeln!(html, "</html>");
        html
    }
}

impl Profiler for HtmlProfiler {
    fn profile(&self, dataset: &DatasetId, df: &DataFrame) -> Result<PathBuf> {
        let profile = DatasetProfile::from_frame(df)?;
        let html = self.render(dataset, &profile);

        fs::create_dir_all(&self.output_dir).map_err(|source| PipelineError::Write {
            path: self.output_dir.clone(),
            source,
        })?;
        let path = self.output_dir.join(format!("{dataset}.html"));
        fs::write(&path, html).map_err(|source| PipelineError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
