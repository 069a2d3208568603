//! Table rows as header-keyed records.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::Document;

use super::PageSelection;

/// One table body row keyed by its table's header texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRecord {
    /// Provider job the document came from
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub job_id: Option<String>,

    /// Source document name
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub document: Option<String>,

    pub page: u32,

    /// Id of the TABLE block
    pub table: String,

    /// Header text to cell text, in column order
    pub values: IndexMap<String, String>,
}

impl RowRecord {
    /// Attach the job and document the row came from.
    pub fn with_source(mut self, job_id: Option<&str>, document: Option<&str>) -> Self {
        self.job_id = job_id.map(str::to_string);
        self.document = document.map(str::to_string);
        self
    }

    /// Look up a value by header text.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.values.get(header).map(String::as_str)
    }
}

/// Every body row of every table on the selected pages.
///
/// The first row of each table is its header; tables with a single row
/// produce nothing.
pub fn to_rows(doc: &Document, pages: &PageSelection) -> Vec<RowRecord> {
    let job_id = doc.metadata.job_id.as_deref();

    doc.tables()
        .filter(|(page, _)| pages.includes(*page))
        .flat_map(|(page, table)| {
            table.records().into_iter().map(move |values| RowRecord {
                job_id: job_id.map(str::to_string),
                document: None,
                page,
                table: table.id.clone(),
                values,
            })
        })
        .collect()
}
