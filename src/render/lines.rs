//! Numbered line maps.

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::Document;

use super::PageSelection;

/// Line texts keyed `Page-01` then `Line-0001`, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineMap {
    pub pages: IndexMap<String, IndexMap<String, String>>,
    pub total_lines: usize,
}

impl LineMap {
    /// Number the lines of the selected pages.
    ///
    /// Pages are keyed by their page number; line numbers restart on every
    /// page.
    pub fn from_document(doc: &Document, pages: &PageSelection) -> Self {
        let mut map = LineMap::default();

        for page in doc.pages.iter().filter(|p| pages.includes(p.number)) {
            let lines: IndexMap<String, String> = page
                .lines
                .iter()
                .enumerate()
                .map(|(i, line)| (format!("Line-{:04}", i + 1), line.text.clone()))
                .collect();
            map.total_lines += lines.len();
            map.pages.insert(format!("Page-{:02}", page.number), lines);
        }

        map
    }

    /// Look up one line.
    pub fn get(&self, page: u32, line: usize) -> Option<&str> {
        self.pages
            .get(&format!("Page-{:02}", page))?
            .get(&format!("Line-{:04}", line))
            .map(String::as_str)
    }
}
