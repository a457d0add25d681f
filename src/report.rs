// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Tabular rendering of usage records and report file output.
///
/// Records are flattened without interpretation: every top-level key becomes
/// a column and every record a row.
use std::{collections::BTreeSet, fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    analyzer::UsageRecord,
    error::{Error, io_error},
};

/// Column used for records that are not JSON objects.
const VALUE_COLUMN: &str = "value";

/// Output formats a run can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Comma separated values.
    Csv,
    /// GitHub flavored Markdown table.
    Markdown
}

impl ReportFormat {
    /// Short label used in commit messages and logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Markdown => "md"
        }
    }

    /// Commit message used when pushing a report of this format.
    pub fn commit_message(self) -> String {
        format!("Save/Update GitHub Actions usage report ({})", self.label())
    }
}

/// Result of writing a report to the workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportFile {
    /// Location the report was written to.
    pub path:  std::path::PathBuf,
    /// Number of bytes written.
    pub bytes: usize
}

/// Renders records as CSV with a header row.
///
/// # Example
///
/// ```
/// use actions_usage::{UsageRecord, render_csv};
/// use serde_json::json;
///
/// let records = [UsageRecord(json!({"action": "actions/checkout", "count": 2}))];
/// assert_eq!(render_csv(&records), "action,count\nactions/checkout,2\n");
/// ```
pub fn render_csv(records: &[UsageRecord]) -> String {
    let columns = columns(records);
    if columns.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    push_csv_row(&mut out, columns.iter().map(|column| column.to_string()));
    for record in records {
        push_csv_row(&mut out, columns.iter().map(|column| cell(record, column)));
    }
    out
}

/// Renders records as a Markdown table.
///
/// # Example
///
/// ```
/// use actions_usage::{UsageRecord, render_markdown};
/// use serde_json::json;
///
/// let records = [UsageRecord(json!({"action": "actions/checkout"}))];
/// assert_eq!(
///     render_markdown(&records),
///     "| action |\n| --- |\n| actions/checkout |\n"
/// );
/// ```
pub fn render_markdown(records: &[UsageRecord]) -> String {
    let columns = columns(records);
    if columns.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    push_markdown_row(&mut out, columns.iter().map(|column| column.to_string()));
    push_markdown_row(&mut out, columns.iter().map(|_| "---".to_owned()));
    for record in records {
        push_markdown_row(&mut out, columns.iter().map(|column| cell(record, column)));
    }
    out
}

/// Writes a rendered report, creating parent directories.
///
/// # Errors
///
/// Returns [`Error::Io`] when the parent directory cannot be created or the
/// file cannot be written.
pub fn write_report(path: &Path, contents: &str) -> Result<ReportFile, Error> {
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
    }

    fs::write(path, contents).map_err(|source| io_error(path, source))?;

    Ok(ReportFile {
        path:  path.to_path_buf(),
        bytes: contents.len()
    })
}

fn columns(records: &[UsageRecord]) -> Vec<&str> {
    let mut columns = BTreeSet::new();
    for record in records {
        match record.as_value() {
            Value::Object(map) => columns.extend(map.keys().map(String::as_str)),
            _ => {
                columns.insert(VALUE_COLUMN);
            }
        }
    }
    columns.into_iter().collect()
}

fn cell(record: &UsageRecord, column: &str) -> String {
    let value = match record.as_value() {
        Value::Object(map) => map.get(column),
        other if column == VALUE_COLUMN => Some(other),
        _ => None
    };

    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(items)) if items.iter().all(is_scalar) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => text.clone(),
                other => other.to_string()
            })
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string()
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn push_csv_row(out: &mut String, cells: impl Iterator<Item = String>) {
    let row = cells
        .map(|cell| {
            if cell.contains([',', '"', '\r', '\n']) {
                format!("\"{}\"", cell.replace('"', "\"\""))
            } else {
                cell
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&row);
    out.push('\n');
}

fn push_markdown_row(out: &mut String, cells: impl Iterator<Item = String>) {
    out.push('|');
    for cell in cells {
        let escaped = cell
            .replace('|', "\\|")
            .replace("\r\n", "<br>")
            .replace('\n', "<br>");
        out.push(' ');
        out.push_str(&escaped);
        out.push_str(" |");
    }
    out.push('\n');
}
