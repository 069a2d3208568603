//! Document-level types.

use std::fmt;

use super::{Block, Diagnostic, Page, Table};
use crate::parser::BlockIndex;
use serde::{Deserialize, Serialize};

/// A document rebuilt from a job's merged block stream.
///
/// The document owns the [`BlockIndex`] it was built from; pages, tables
/// and lines are read-only views derived from it at construction time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Document {
    /// Document metadata (job id, page counts)
    pub metadata: Metadata,

    /// Pages in stream order
    pub pages: Vec<Page>,

    /// Defects skipped during reconstruction
    pub diagnostics: Vec<Diagnostic>,

    #[serde(skip)]
    index: BlockIndex,
}

impl Document {
    /// Create a document from assembled parts.
    pub fn new(
        metadata: Metadata,
        pages: Vec<Page>,
        diagnostics: Vec<Diagnostic>,
        index: BlockIndex,
    ) -> Self {
        Self {
            metadata,
            pages,
            diagnostics,
            index,
        }
    }

    /// Get the number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Get a page by number (1-indexed).
    pub fn get_page(&self, page_num: u32) -> Option<&Page> {
        self.pages.iter().find(|p| p.number == page_num)
    }

    /// Look up a raw block by id.
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.index.get(id)
    }

    /// The block index the document was built from.
    pub fn index(&self) -> &BlockIndex {
        &self.index
    }

    /// Check if the document has any pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Iterate over all tables with their page numbers.
    pub fn tables(&self) -> impl Iterator<Item = (u32, &Table)> {
        self.pages
            .iter()
            .flat_map(|p| p.tables.iter().map(move |t| (p.number, t)))
    }

    /// Get the text of all lines in the document.
    ///
    /// Lines are joined by newlines when `keep_newlines` is set, by single
    /// spaces otherwise.
    pub fn text(&self, keep_newlines: bool) -> String {
        let sep = if keep_newlines { "\n" } else { " " };
        self.pages
            .iter()
            .filter(|p| !p.lines.is_empty())
            .map(|p| p.text(keep_newlines))
            .collect::<Vec<_>>()
            .join(sep)
    }

    /// Get plain text content of the entire document, tables included.
    pub fn plain_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.plain_text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Get the total number of lines across all pages.
    pub fn line_count(&self) -> usize {
        self.pages.iter().map(|p| p.line_count()).sum()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Document")?;
        writeln!(f, "==========")?;
        for page in &self.pages {
            writeln!(f, "{}", page)?;
        }
        Ok(())
    }
}

/// Document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Provider job the blocks came from
    pub job_id: Option<String>,

    /// Page count declared by the provider (0 = unknown)
    pub declared_pages: u32,

    /// Number of pages reconstructed
    pub page_count: u32,

    /// Number of blocks in the merged stream
    pub block_count: usize,
}

impl Metadata {
    /// Create metadata for a job.
    pub fn for_job(job_id: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Line;

    #[test]
    fn test_document_default() {
        let doc = Document::default();
        assert!(doc.is_empty());
        assert_eq!(doc.page_count(), 0);
        assert!(doc.block("anything").is_none());
    }

    #[test]
    fn test_document_text_joins_pages() {
        let mut p1 = Page::new(1, "p1");
        p1.add_line(Line::new("l1", "First"));
        let p2 = Page::new(2, "p2");
        let mut p3 = Page::new(3, "p3");
        p3.add_line(Line::new("l2", "Last"));

        let doc = Document::new(
            Metadata::default(),
            vec![p1, p2, p3],
            Vec::new(),
            BlockIndex::default(),
        );

        assert_eq!(doc.text(false), "First Last");
        assert_eq!(doc.text(true), "First\nLast");
        assert_eq!(doc.line_count(), 2);
        assert_eq!(doc.get_page(3).map(|p| p.id.as_str()), Some("p3"));
    }

    #[test]
    fn test_metadata_for_job() {
        let metadata = Metadata::for_job("job-1");
        assert_eq!(metadata.job_id.as_deref(), Some("job-1"));
        assert_eq!(metadata.declared_pages, 0);
    }
}
