//! Table types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A table rebuilt from a TABLE block and its CELL children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Id of the TABLE block
    pub id: String,

    /// Rows ordered by ascending row index
    pub rows: Vec<TableRow>,

    /// Recognition confidence (0-100)
    pub confidence: Option<f32>,
}

impl Table {
    /// Create a new empty table.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rows: Vec::new(),
            confidence: None,
        }
    }

    /// Group cells into rows by row index, ordering each row by column index.
    ///
    /// Every row index that occurs gets a row. Gaps between them are filled
    /// with empty rows while the total padding stays within the number of
    /// cells; a larger gap is left implicit so a corrupt index cannot
    /// inflate the table.
    pub fn from_cells(id: impl Into<String>, mut cells: Vec<TableCell>) -> Self {
        let id = id.into();
        let padding_budget = cells.len();
        let mut padded = 0usize;
        let mut rows: Vec<TableRow> = Vec::new();

        // Stable sort keeps relationship order for duplicate positions
        cells.sort_by_key(|c| (c.row_index, c.column_index));
        for cell in cells {
            if cell.row_index == 0 {
                continue;
            }

            let previous = rows.last().map(|r| r.index).unwrap_or(0);
            if cell.row_index != previous {
                let gap = (cell.row_index - previous - 1) as usize;
                if padded.saturating_add(gap) <= padding_budget {
                    rows.extend((previous + 1..cell.row_index).map(TableRow::empty));
                    padded += gap;
                } else if gap > 0 {
                    log::warn!(
                        "Table {}: row {} follows row {}, not padding {} rows",
                        id,
                        cell.row_index,
                        previous,
                        gap
                    );
                }
                rows.push(TableRow::empty(cell.row_index));
            }

            if let Some(row) = rows.last_mut() {
                row.cells.push(cell);
            }
        }

        Self {
            id,
            rows,
            confidence: None,
        }
    }

    /// Add a row to the table.
    pub fn add_row(&mut self, row: TableRow) {
        self.rows.push(row);
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns (widest row).
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get the header row (the first row).
    pub fn header(&self) -> Option<&TableRow> {
        self.rows.first()
    }

    /// Get body rows (all rows after the header).
    pub fn body(&self) -> &[TableRow] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Map each body row onto the header row's cell texts.
    ///
    /// Cells are matched to header cells by column index. Cells in a column
    /// without a header are dropped and a missing cell leaves its header
    /// out of the record. A repeated header text keeps the last value.
    pub fn records(&self) -> Vec<IndexMap<String, String>> {
        let header = match self.header() {
            Some(header) => header,
            None => return Vec::new(),
        };

        self.body()
            .iter()
            .map(|row| {
                header
                    .cells
                    .iter()
                    .filter_map(|key| {
                        row.cell(key.column_index)
                            .map(|cell| (key.text.clone(), cell.text.clone()))
                    })
                    .collect()
            })
            .collect()
    }

    /// Get plain text representation of the table.
    pub fn plain_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check if any cell spans more than one row or column.
    pub fn has_merged_cells(&self) -> bool {
        self.rows
            .iter()
            .flat_map(|r| &r.cells)
            .any(|c| c.is_merged())
    }
}

/// A table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// 1-based row index
    pub index: u32,

    /// Cells ordered by ascending column index
    pub cells: Vec<TableCell>,
}

impl TableRow {
    /// Create an empty row at the given index.
    pub fn empty(index: u32) -> Self {
        Self {
            index,
            cells: Vec::new(),
        }
    }

    /// Create a row from text values, assigning column indices from 1.
    pub fn from_strings<S: Into<String>>(index: u32, values: impl IntoIterator<Item = S>) -> Self {
        let cells = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| TableCell::text(format!("r{}c{}", index, i + 1), index, i as u32 + 1, v))
            .collect();
        Self { index, cells }
    }

    /// Get the trimmed text of every cell, in column order.
    pub fn texts(&self) -> Vec<String> {
        self.cells.iter().map(|c| c.text.clone()).collect()
    }

    /// Get the cell at a column index.
    pub fn cell(&self, column_index: u32) -> Option<&TableCell> {
        self.cells.iter().find(|c| c.column_index == column_index)
    }

    /// Get plain text representation.
    pub fn plain_text(&self) -> String {
        self.texts().join("\t")
    }

    /// Check if the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    /// Id of the CELL block
    pub id: String,

    /// 1-based row index
    pub row_index: u32,

    /// 1-based column index
    pub column_index: u32,

    /// Number of rows this cell spans
    pub row_span: u32,

    /// Number of columns this cell spans
    pub column_span: u32,

    /// Trimmed cell text
    pub text: String,

    /// State of a selection element inside the cell, if any
    pub selected: Option<bool>,

    /// Recognition confidence (0-100)
    pub confidence: Option<f32>,
}

impl TableCell {
    /// Create a cell with text content. The text is trimmed.
    pub fn text(
        id: impl Into<String>,
        row_index: u32,
        column_index: u32,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            row_index,
            column_index,
            row_span: 1,
            column_span: 1,
            text: text.into().trim().to_string(),
            selected: None,
            confidence: None,
        }
    }

    /// Check if the cell is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Check if this cell spans multiple rows or columns.
    pub fn is_merged(&self) -> bool {
        self.row_span > 1 || self.column_span > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_new() {
        let table = Table::new("t1");
        assert!(table.is_empty());
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 0);
        assert!(table.records().is_empty());
    }

    #[test]
    fn test_from_cells_orders_rows_and_columns() {
        let cells = vec![
            TableCell::text("c22", 2, 2, "Ana"),
            TableCell::text("c11", 1, 1, "ID"),
            TableCell::text("c21", 2, 1, "7"),
            TableCell::text("c12", 1, 2, "Name"),
        ];
        let table = Table::from_cells("t1", cells);

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0].texts(), vec!["ID", "Name"]);
        assert_eq!(table.rows[1].texts(), vec!["7", "Ana"]);
        assert_eq!(table.rows[1].index, 2);
    }

    #[test]
    fn test_from_cells_gap_produces_empty_row() {
        let cells = vec![
            TableCell::text("a", 1, 1, "x"),
            TableCell::text("b", 3, 1, "y"),
        ];
        let table = Table::from_cells("t1", cells);

        assert_eq!(table.row_count(), 3);
        assert!(table.rows[1].is_empty());
        assert_eq!(table.rows[1].index, 2);
    }

    #[test]
    fn test_from_cells_huge_row_index_is_not_padded() {
        let cells = vec![
            TableCell::text("a", 1, 1, "ID"),
            TableCell::text("b", u32::MAX, 1, "corrupt"),
        ];
        let table = Table::from_cells("t1", cells);

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[1].index, u32::MAX);
        assert_eq!(table.rows[1].texts(), vec!["corrupt"]);
    }

    #[test]
    fn test_records() {
        let mut table = Table::new("t1");
        table.add_row(TableRow::from_strings(1, ["ID", "Name"]));
        table.add_row(TableRow::from_strings(2, ["7", "Ana"]));
        table.add_row(TableRow::from_strings(3, ["8"]));

        let records = table.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("ID").map(String::as_str), Some("7"));
        assert_eq!(records[0].get("Name").map(String::as_str), Some("Ana"));
        assert_eq!(records[1].len(), 1);
        let keys: Vec<_> = records[0].keys().cloned().collect();
        assert_eq!(keys, vec!["ID", "Name"]);
    }

    #[test]
    fn test_records_match_by_column() {
        let table = Table::from_cells(
            "t1",
            vec![
                TableCell::text("h1", 1, 1, "ID"),
                TableCell::text("h2", 1, 2, "Name"),
                TableCell::text("h3", 1, 3, "City"),
                TableCell::text("a", 2, 1, "7"),
                TableCell::text("b", 2, 3, "Lisbon"),
            ],
        );

        let records = table.records();
        assert_eq!(records[0].get("ID").map(String::as_str), Some("7"));
        assert_eq!(records[0].get("Name"), None);
        assert_eq!(records[0].get("City").map(String::as_str), Some("Lisbon"));
    }

    #[test]
    fn test_cell_text_trimmed() {
        let cell = TableCell::text("c", 1, 1, "  Hello \n");
        assert_eq!(cell.text, "Hello");
        assert!(!cell.is_empty());
        assert!(!cell.is_merged());
    }
}
