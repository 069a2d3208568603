//! Structural defects recovered during reconstruction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A defect in the block graph that was skipped rather than failing the
/// whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A relationship names a block id that is not in the result set.
    DanglingReference {
        /// Block holding the relationship
        parent: String,
        /// The id that could not be found
        missing: String,
    },

    /// A CELL block lacks its row or column index and was dropped.
    IncompleteCell {
        /// The TABLE block the cell belongs to
        table: String,
        /// The dropped CELL block
        cell: String,
    },
}

impl Diagnostic {
    /// Check if this is a dangling reference.
    pub fn is_dangling_reference(&self) -> bool {
        matches!(self, Diagnostic::DanglingReference { .. })
    }

    /// Check if this is an incomplete cell.
    pub fn is_incomplete_cell(&self) -> bool {
        matches!(self, Diagnostic::IncompleteCell { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DanglingReference { parent, missing } => {
                write!(f, "block {} references missing block {}", parent, missing)
            }
            Diagnostic::IncompleteCell { table, cell } => {
                write!(f, "cell {} of table {} has no row/column index", cell, table)
            }
        }
    }
}
