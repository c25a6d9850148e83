//! Writers for run results

use crate::source::Table;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize result: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write `value` as pretty JSON to `<dir>/<stem>.json`
pub fn to_json_file(value: &Value, stem: &str, dir: &Path) -> Result<PathBuf, ConvertError> {
    let content = serde_json::to_string_pretty(value)?;
    write(dir, &format!("{}.json", stem), content)
}

/// Write `value` as CSV to `<dir>/<stem>.csv`
pub fn to_csv_file(value: &Value, stem: &str, dir: &Path) -> Result<PathBuf, ConvertError> {
    write(dir, &format!("{}.csv", stem), to_table(value).to_csv_string())
}

/// Tabulate a result
///
/// An array of objects gives one row per object. An object whose values are
/// all arrays gives one column per key. Any other object is a single row.
/// Everything else lands in a single `content` column.
pub fn to_table(value: &Value) -> Table {
    match value {
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
            let mut columns: Vec<String> = Vec::new();
            for item in items.iter().filter_map(Value::as_object) {
                for key in item.keys() {
                    if !columns.contains(key) {
                        columns.push(key.clone());
                    }
                }
            }
            let rows = items
                .iter()
                .filter_map(Value::as_object)
                .map(|item| columns.iter().map(|c| cell(item.get(c))).collect())
                .collect();
            Table::new(columns, rows)
        }
        Value::Object(map) if !map.is_empty() && map.values().all(Value::is_array) => {
            let columns: Vec<String> = map.keys().cloned().collect();
            let height = map
                .values()
                .filter_map(Value::as_array)
                .map(Vec::len)
                .max()
                .unwrap_or(0);
            let rows = (0..height)
                .map(|i| {
                    map.values()
                        .map(|v| cell(v.as_array().and_then(|a| a.get(i))))
                        .collect()
                })
                .collect();
            Table::new(columns, rows)
        }
        Value::Object(map) => Table::new(
            map.keys().cloned().collect(),
            vec![map.values().map(|v| cell(Some(v))).collect()],
        ),
        other => Table::new(vec!["content".to_string()], vec![vec![cell(Some(other))]]),
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn write(dir: &Path, file_name: &str, content: String) -> Result<PathBuf, ConvertError> {
    let path = dir.join(file_name);
    let io_err = |source| ConvertError::Io {
        path: path.display().to_string(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;
    std::fs::write(&path, content).map_err(io_err)?;
    Ok(path)
}
