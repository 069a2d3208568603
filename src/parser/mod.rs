//! Block graph reconstruction.
//!
//! [`BlockIndex`] indexes the merged stream, [`PageAssembler`] splits it on
//! PAGE markers, [`RelationshipResolver`] follows one relationship hop at a
//! time, and [`DocumentBuilder`] drives the three to produce a document.

mod assembler;
mod builder;
mod index;
mod options;
mod resolver;

pub use assembler::{PageAssembler, PageGroup};
pub use builder::DocumentBuilder;
pub use index::BlockIndex;
pub use options::BuildOptions;
pub use resolver::RelationshipResolver;
