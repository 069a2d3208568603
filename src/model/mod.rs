//! Document model types for analysis results.
//!
//! [`Block`] is the provider's flat, id-linked unit; the remaining types
//! form the hierarchy rebuilt from it:
//! Document -> Page -> {Lines, Tables, KeyValues} -> {Words | Rows -> Cells}.

mod block;
mod diagnostic;
mod document;
mod line;
mod page;
mod table;

pub use block::{
    Block, BlockKind, EntityType, RawBlock, RawRelationship, Relationship, RelationshipKind,
};
pub use diagnostic::Diagnostic;
pub use document::{Document, Metadata};
pub use line::{KeyValue, Line, Word};
pub(crate) use line::join_words;
pub use page::Page;
pub use table::{Table, TableCell, TableRow};
