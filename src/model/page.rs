//! Page-level types.

use std::fmt;

use super::{KeyValue, Line, Table};
use serde::{Deserialize, Serialize};

/// A single page in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Id of the PAGE block
    pub id: String,

    /// Lines, in the order the PAGE block lists them
    pub lines: Vec<Line>,

    /// Tables, in the order the PAGE block lists them
    pub tables: Vec<Table>,

    /// Key-value pairs, in the order the PAGE block lists their keys
    pub key_values: Vec<KeyValue>,

    /// Number of stream blocks that belonged to this page group
    pub block_count: usize,
}

impl Page {
    /// Create a new empty page.
    pub fn new(number: u32, id: impl Into<String>) -> Self {
        Self {
            number,
            id: id.into(),
            lines: Vec::new(),
            tables: Vec::new(),
            key_values: Vec::new(),
            block_count: 0,
        }
    }

    /// Add a line to the page.
    pub fn add_line(&mut self, line: Line) {
        self.lines.push(line);
    }

    /// Add a table to the page.
    pub fn add_table(&mut self, table: Table) {
        self.tables.push(table);
    }

    /// Add a key-value pair to the page.
    pub fn add_key_value(&mut self, key_value: KeyValue) {
        self.key_values.push(key_value);
    }

    /// Get the text of all lines joined by newlines, or by spaces when
    /// `keep_newlines` is false.
    pub fn text(&self, keep_newlines: bool) -> String {
        let sep = if keep_newlines { "\n" } else { " " };
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(sep)
    }

    /// Get plain text content of the page: lines first, then tables.
    pub fn plain_text(&self) -> String {
        let mut parts = Vec::new();
        if !self.lines.is_empty() {
            parts.push(self.text(true));
        }
        parts.extend(self.tables.iter().map(|t| t.plain_text()));
        parts.join("\n\n")
    }

    /// Check if the page has no content.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.tables.is_empty() && self.key_values.is_empty()
    }

    /// Get the number of lines on the page.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Page {}", self.number)?;
        writeln!(f, "==========")?;
        for line in &self.lines {
            writeln!(f, "Line: {}", line.text)?;
        }
        for table in &self.tables {
            writeln!(f, "Table: {} rows", table.row_count())?;
            for row in &table.rows {
                writeln!(f, "  {}", row.texts().join(" | "))?;
            }
        }
        for kv in &self.key_values {
            writeln!(f, "Field: {} = {}", kv.key, kv.value)?;
        }
        Ok(())
    }
}
