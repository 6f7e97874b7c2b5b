//! Flattened `tool,path,value` view of a report.

use osintmaster_core::ResultBundle;
use serde_json::Value;

/// One leaf of a tool's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Tool that produced the value
    pub tool: String,
    /// Dotted path to the leaf, with `[i]` for array elements; empty for a scalar result
    pub path: String,
    /// Leaf value; strings unquoted, everything else as JSON text
    pub value: String,
}

/// Flatten every tool's result into one row per leaf.
///
/// Empty objects and arrays are kept as leaves so that every tool with a
/// result shows up in the table.
pub fn flatten(bundle: &ResultBundle) -> Vec<Row> {
    let mut rows = Vec::new();
    for (tool, value) in &bundle.results {
        walk(tool.as_str(), String::new(), value, &mut rows);
    }
    rows
}

fn walk(tool: &str, path: String, value: &Value, rows: &mut Vec<Row>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                walk(tool, child_path, child, rows);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                walk(tool, format!("{}[{}]", path, i), child, rows);
            }
        }
        Value::String(s) => rows.push(Row {
            tool: tool.to_string(),
            path,
            value: s.clone(),
        }),
        other => rows.push(Row {
            tool: tool.to_string(),
            path,
            value: other.to_string(),
        }),
    }
}

#[cfg(feature = "csv")]
mod csv_store {
    use super::flatten;
    use crate::{ReportStore, Result};
    use async_trait::async_trait;
    use osintmaster_core::ResultBundle;
    use std::path::{Path, PathBuf};
    use tokio::fs;
    use tracing::debug;

    /// Writes the flattened rows as CSV with a `tool,path,value` header.
    pub struct CsvReportStore {
        path: PathBuf,
    }

    impl CsvReportStore {
        /// Store writing to `path`.
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }
    }

    #[async_trait]
    impl ReportStore for CsvReportStore {
        fn location(&self) -> &Path {
            &self.path
        }

        async fn save(&self, bundle: &ResultBundle) -> Result<()> {
            let rows = flatten(bundle);
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record(["tool", "path", "value"])?;
            for row in &rows {
                writer.write_record([row.tool.as_str(), row.path.as_str(), row.value.as_str()])?;
            }
            let data = writer.into_inner().map_err(|e| e.into_error())?;

            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&self.path, data).await?;
            debug!("Wrote {} rows to {}", rows.len(), self.path.display());
            Ok(())
        }
    }
}

#[cfg(feature = "csv")]
pub use csv_store::CsvReportStore;

#[cfg(test)]
mod tests {
    use super::*;
    use osintmaster_core::{Identifier, ToolName, ToolOutcome};
    use serde_json::json;
    use std::time::Duration;

    fn bundle_with(results: &[(ToolName, Value)]) -> ResultBundle {
        let identifier = Identifier::new(None, Some("alice".to_string())).unwrap();
        let mut bundle = ResultBundle::new(&identifier);
        for (tool, value) in results {
            bundle.record(*tool, ToolOutcome::succeeded(value.clone(), Duration::ZERO));
        }
        bundle
    }

    fn row(tool: &str, path: &str, value: &str) -> Row {
        Row {
            tool: tool.to_string(),
            path: path.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_every_leaf_becomes_a_row() {
        let bundle = bundle_with(&[(
            ToolName::DarkSearch,
            json!({
                "total": 2,
                "data": [
                    {"title": "paste", "link": "http://a.onion"},
                    {"title": null, "tags": []}
                ]
            }),
        )]);

        assert_eq!(
            flatten(&bundle),
            vec![
                row("darksearch", "data[0].link", "http://a.onion"),
                row("darksearch", "data[0].title", "paste"),
                row("darksearch", "data[1].tags", "[]"),
                row("darksearch", "data[1].title", "null"),
                row("darksearch", "total", "2"),
            ]
        );
    }

    #[test]
    fn test_scalar_result_has_empty_path() {
        let bundle = bundle_with(&[(ToolName::Blackbird, json!("no accounts"))]);
        assert_eq!(flatten(&bundle), vec![row("blackbird", "", "no accounts")]);
    }

    #[test]
    fn test_tools_in_catalog_order() {
        let bundle = bundle_with(&[
            (ToolName::Maigret, json!({"stdout": "m"})),
            (ToolName::Sherlock, json!({"stdout": "s"})),
        ]);
        let tools: Vec<_> = flatten(&bundle).into_iter().map(|r| r.tool).collect();
        assert_eq!(tools, vec!["sherlock", "maigret"]);
    }

    #[cfg(feature = "csv")]
    #[tokio::test]
    async fn test_csv_file() {
        use crate::ReportStore;

        let dir = tempfile::tempdir().unwrap();
        let store = CsvReportStore::new(dir.path().join("osint_results.csv"));
        let bundle = bundle_with(&[(
            ToolName::Sherlock,
            json!({"exit_code": 0, "stdout": "a,b\nc", "stderr": ""}),
        )]);

        store.save(&bundle).await.unwrap();

        let raw = std::fs::read_to_string(store.location()).unwrap();
        let mut reader = csv::Reader::from_reader(raw.as_bytes());
        let headers: Vec<&str> = reader.headers().unwrap().iter().collect();
        assert_eq!(headers, vec!["tool", "path", "value"]);
        let records: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        assert_eq!(
            records,
            vec![
                vec!["sherlock", "exit_code", "0"],
                vec!["sherlock", "stderr", ""],
                vec!["sherlock", "stdout", "a,b\nc"],
            ]
        );
    }
}
