//! # blockdoc
//!
//! Rebuild structured documents from the paginated block graphs returned by
//! asynchronous document-analysis services.
//!
//! The provider returns a flat list of typed blocks (pages, lines, words,
//! tables, cells, key-value sets) that reference each other by id. This
//! library merges the result fragments of a job, indexes the blocks and
//! rebuilds the hierarchy Document -> Page -> {Lines, Tables, KeyValues}.
//! It also drives the job protocol around it: submission with idempotency
//! tokens, paginated retrieval, and retry with per-class backoff.
//!
//! ## Quick Start
//!
//! ```no_run
//! use blockdoc::{parse_response_file, render};
//!
//! fn main() -> blockdoc::Result<()> {
//!     // Rebuild a document from a saved GetDocumentAnalysis response
//!     let doc = parse_response_file("response.json")?;
//!
//!     // Detected text, one line per row
//!     let options = render::TextOptions::new().with_newlines(true);
//!     println!("{}", render::to_text(&doc, &options));
//!
//!     // Table rows keyed by header text
//!     for row in render::to_rows(&doc, &render::PageSelection::All) {
//!         println!("{:?}", row.values);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Graph reconstruction**: pages, lines, words, tables, cells, forms
//! - **Partial documents**: dangling references and incomplete cells are
//!   skipped and reported as diagnostics
//! - **Job protocol**: submission, pagination, retry/backoff, cancellation
//! - **Parallel processing**: Rayon for pages, worker threads for jobs
//! - **Async**: optional tokio integration (`async` feature)

pub mod error;
pub mod model;
pub mod notify;
pub mod parser;
pub mod pipeline;
pub mod provider;
pub mod render;
pub mod sink;

// Re-export commonly used types
pub use error::{Error, Result};
pub use model::{
    Block, BlockKind, Diagnostic, Document, KeyValue, Line, Metadata, Page, Table, TableCell,
    TableRow, Word,
};
pub use notify::CompletionNotification;
pub use parser::{BuildOptions, DocumentBuilder};
pub use pipeline::{Pipeline, ProcessedJob, WorkerPool};
pub use provider::{
    CollectedResult, DocumentAnalysisProvider, JobKind, JobPoller, ProviderError, ReplayProvider,
    ResultCollector, ResultPage, RetryPolicy, SubmitOptions,
};
pub use render::{JsonFormat, LineMap, PageSelection, RowRecord, TextOptions};
pub use sink::{JsonDirSink, MemorySink, PersistenceSink, TextRecord};

use std::fs;
use std::path::Path;

/// Rebuild a document from a recorded provider response.
///
/// Accepts a single response object or an array of response fragments in
/// pagination order.
///
/// # Example
///
/// ```
/// use blockdoc::parse_response_json;
///
/// let json = r#"{"Blocks": [
///     {"BlockType": "PAGE", "Id": "p1", "Page": 1,
///      "Relationships": [{"Type": "CHILD", "Ids": ["l1"]}]},
///     {"BlockType": "LINE", "Id": "l1", "Text": "Hello world"}
/// ]}"#;
/// let doc = parse_response_json(json).unwrap();
/// assert_eq!(doc.page_count(), 1);
/// ```
pub fn parse_response_json(json: &str) -> Result<Document> {
    let pages = provider::parse_result_pages(json)?;
    DocumentBuilder::new().build_pages(pages)
}

/// Rebuild a document from a recorded response file.
pub fn parse_response_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    let json = fs::read_to_string(path)?;
    parse_response_json(&json)
}

/// Rebuild a document from several response files, merged in order.
///
/// # Example
///
/// ```no_run
/// use blockdoc::parse_response_files;
///
/// let doc = parse_response_files(&["part-1.json", "part-2.json"]).unwrap();
/// println!("Pages: {}", doc.page_count());
/// ```
pub fn parse_response_files<P: AsRef<Path>>(paths: &[P]) -> Result<Document> {
    let mut pages = Vec::new();
    for path in paths {
        let json = fs::read_to_string(path.as_ref())?;
        pages.extend(provider::parse_result_pages(&json)?);
    }
    DocumentBuilder::new().build_pages(pages)
}

/// Extract the detected text of a recorded response file.
///
/// Lines are joined by single spaces.
///
/// # Example
///
/// ```no_run
/// use blockdoc::extract_text;
///
/// let text = extract_text("response.json").unwrap();
/// println!("{}", text);
/// ```
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let doc = parse_response_file(path)?;
    Ok(render::to_text(&doc, &TextOptions::default()))
}

/// Extract every table body row of a recorded response file.
pub fn extract_rows<P: AsRef<Path>>(path: P) -> Result<Vec<RowRecord>> {
    let doc = parse_response_file(path)?;
    Ok(render::to_rows(&doc, &PageSelection::All))
}

/// Builder for rebuilding and rendering recorded responses.
///
/// # Example
///
/// ```no_run
/// use blockdoc::{Blockdoc, PageSelection};
///
/// let text = Blockdoc::new()
///     .sequential()
///     .keep_newlines()
///     .with_pages(PageSelection::Range(1..=3))
///     .parse_file("response.json")?
///     .to_text();
/// # Ok::<(), blockdoc::Error>(())
/// ```
pub struct Blockdoc {
    build_options: BuildOptions,
    text_options: TextOptions,
}

impl Blockdoc {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            build_options: BuildOptions::default(),
            text_options: TextOptions::default(),
        }
    }

    /// Disable parallel page construction.
    pub fn sequential(mut self) -> Self {
        self.build_options = self.build_options.sequential();
        self
    }

    /// Join lines with newlines in text output.
    pub fn keep_newlines(mut self) -> Self {
        self.text_options = self.text_options.with_newlines(true);
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.build_options = self.build_options.with_pages(pages.clone());
        self.text_options = self.text_options.with_pages(pages);
        self
    }

    /// Rebuild a document from recorded response JSON.
    pub fn parse_json(self, json: &str) -> Result<BlockdocResult> {
        let pages = provider::parse_result_pages(json)?;
        let document = DocumentBuilder::with_options(self.build_options).build_pages(pages)?;
        Ok(BlockdocResult {
            document,
            text_options: self.text_options,
        })
    }

    /// Rebuild a document from a recorded response file.
    pub fn parse_file<P: AsRef<Path>>(self, path: P) -> Result<BlockdocResult> {
        let json = fs::read_to_string(path)?;
        self.parse_json(&json)
    }
}

impl Default for Blockdoc {
    fn default() -> Self {
        Self::new()
    }
}

/// A rebuilt document together with its rendering options.
pub struct BlockdocResult {
    /// The rebuilt document
    pub document: Document,
    text_options: TextOptions,
}

impl BlockdocResult {
    /// Detected text.
    pub fn to_text(&self) -> String {
        render::to_text(&self.document, &self.text_options)
    }

    /// Table body rows keyed by header text.
    pub fn rows(&self) -> Vec<RowRecord> {
        render::to_rows(&self.document, &self.text_options.pages)
    }

    /// Numbered lines per page.
    pub fn lines(&self) -> LineMap {
        LineMap::from_document(&self.document, &self.text_options.pages)
    }

    /// Convert to JSON.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        render::to_json(&self.document, format)
    }

    /// Get the document.
    pub fn document(&self) -> &Document {
        &self.document
    }
}
