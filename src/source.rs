//! Source content handed to a graph: plain text, a table, or an image

use crate::backend::Image;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors reading source content
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV line {line}: {message}")]
    Csv { line: usize, message: String },
}

/// Input to a scraper graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Source {
    Text { content: String },
    Table(Table),
    Image(Image),
}

impl Source {
    pub fn text(content: impl Into<String>) -> Self {
        Source::Text {
            content: content.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Source::Text { .. } => "text",
            Source::Table(_) => "table",
            Source::Image(_) => "image",
        }
    }
}

impl From<Table> for Source {
    fn from(table: Table) -> Self {
        Source::Table(table)
    }
}

impl From<Image> for Source {
    fn from(image: Image) -> Self {
        Source::Image(image)
    }
}

/// A header row plus data rows, all cells as text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Read a CSV file whose first record is the header
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_csv(&content)
    }

    /// Parse RFC 4180 style CSV: quoted fields, doubled quotes, embedded newlines
    pub fn from_csv(content: &str) -> Result<Self, SourceError> {
        let mut records = parse_records(content)?.into_iter();
        let columns = records.next().unwrap_or_default();
        let rows: Vec<Vec<String>> = records.collect();

        for (index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(SourceError::Csv {
                    line: index + 2,
                    message: format!("expected {} fields, found {}", columns.len(), row.len()),
                });
            }
        }

        Ok(Self { columns, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render back to CSV, quoting only where needed
    pub fn to_csv_string(&self) -> String {
        let mut out = String::new();
        for record in std::iter::once(&self.columns).chain(self.rows.iter()) {
            let line: Vec<String> = record.iter().map(|cell| quote_cell(cell)).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        out
    }

    /// Text form given to the model: one `column: value` block per row
    pub fn to_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| format!("{}: {}", column, value))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn quote_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn parse_records(content: &str) -> Result<Vec<Vec<String>>, SourceError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            '"' => {
                return Err(SourceError::Csv {
                    line,
                    message: "unexpected quote inside an unquoted field".to_string(),
                })
            }
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push(std::mem::take(&mut record));
                } else {
                    record.clear();
                }
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(SourceError::Csv {
            line,
            message: "unterminated quoted field".to_string(),
        });
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}
