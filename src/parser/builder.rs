//! Document construction from a merged block stream.

use rayon::prelude::*;

use crate::error::Result;
use crate::model::{
    join_words, Block, BlockKind, Diagnostic, Document, EntityType, KeyValue, Line, Metadata,
    Page, RelationshipKind, Table, TableCell, Word,
};
use crate::provider::{CollectedResult, ResultPage};

use super::assembler::{PageAssembler, PageGroup};
use super::index::BlockIndex;
use super::options::BuildOptions;
use super::resolver::RelationshipResolver;

/// Builds [`Document`]s from block streams.
pub struct DocumentBuilder {
    options: BuildOptions,
}

impl DocumentBuilder {
    /// Create a builder with default options.
    pub fn new() -> Self {
        Self::with_options(BuildOptions::default())
    }

    /// Create a builder with custom options.
    pub fn with_options(options: BuildOptions) -> Self {
        Self { options }
    }

    /// Build a document from an already merged block stream.
    pub fn build(&self, blocks: Vec<Block>) -> Result<Document> {
        self.build_with_metadata(blocks, Metadata::default())
    }

    /// Merge result pages in order and build a document from them.
    pub fn build_pages(&self, pages: Vec<ResultPage>) -> Result<Document> {
        self.build_collected(CollectedResult::from_pages(pages))
    }

    /// Build a document from a collector's output.
    pub fn build_collected(&self, collected: CollectedResult) -> Result<Document> {
        let metadata = Metadata {
            job_id: collected.job_id,
            declared_pages: collected.declared_pages,
            ..Default::default()
        };
        self.build_with_metadata(collected.blocks, metadata)
    }

    fn build_with_metadata(&self, blocks: Vec<Block>, mut metadata: Metadata) -> Result<Document> {
        let index = BlockIndex::build(blocks);
        if self.options.log_block_counts {
            index.log_counts();
        }

        let groups: Vec<PageGroup<'_>> = PageAssembler::assemble(index.blocks())?
            .into_iter()
            .filter(|g| self.options.pages.includes(g.number()))
            .collect();

        let built: Vec<(Page, Vec<Diagnostic>)> = if self.options.parallel {
            groups.par_iter().map(|g| build_page(&index, g)).collect()
        } else {
            groups.iter().map(|g| build_page(&index, g)).collect()
        };

        let mut pages = Vec::with_capacity(built.len());
        let mut diagnostics = Vec::new();
        for (page, page_diagnostics) in built {
            pages.push(page);
            diagnostics.extend(page_diagnostics);
        }

        metadata.page_count = pages.len() as u32;
        metadata.block_count = index.len();

        if !diagnostics.is_empty() {
            log::warn!(
                "Rebuilt {} pages with {} skipped defects",
                pages.len(),
                diagnostics.len()
            );
        }

        Ok(Document::new(metadata, pages, diagnostics, index))
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn build_page(index: &BlockIndex, group: &PageGroup<'_>) -> (Page, Vec<Diagnostic>) {
    let resolver = RelationshipResolver::new(index);
    let mut diagnostics = Vec::new();
    let page_block = group.page_block();

    let mut page = Page::new(group.number(), page_block.id.clone());
    page.block_count = group.len();

    for child in resolver.children(page_block, &mut diagnostics) {
        match &child.kind {
            BlockKind::Line { .. } => {
                let line = build_line(&resolver, child, &mut diagnostics);
                page.add_line(line);
            }
            BlockKind::Table => {
                let table = build_table(&resolver, child, &mut diagnostics);
                page.add_table(table);
            }
            BlockKind::KeyValueSet {
                entity: EntityType::Key,
            } => {
                let key_value = build_key_value(&resolver, child, &mut diagnostics);
                page.add_key_value(key_value);
            }
            BlockKind::Unknown { block_type } => {
                log::debug!("Skipping unsupported {} block {}", block_type, child.id);
            }
            _ => {
                log::debug!(
                    "Ignoring {} block {} listed under page {}",
                    child.type_name(),
                    child.id,
                    page.number
                );
            }
        }
    }

    (page, diagnostics)
}

fn to_word(block: &Block) -> Option<Word> {
    match &block.kind {
        BlockKind::Word { text, text_type } => Some(Word {
            id: block.id.clone(),
            text: text.clone().unwrap_or_default(),
            confidence: block.confidence,
            handwritten: text_type.as_deref() == Some("HANDWRITING"),
        }),
        _ => None,
    }
}

fn child_words(
    resolver: &RelationshipResolver<'_>,
    block: &Block,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Word> {
    resolver
        .children(block, diagnostics)
        .into_iter()
        .filter_map(to_word)
        .collect()
}

fn build_line(
    resolver: &RelationshipResolver<'_>,
    block: &Block,
    diagnostics: &mut Vec<Diagnostic>,
) -> Line {
    let words = child_words(resolver, block, diagnostics);
    let text = match block.text() {
        Some(text) => text.to_string(),
        None => join_words(&words),
    };

    Line {
        id: block.id.clone(),
        text,
        confidence: block.confidence,
        words,
    }
}

fn build_table(
    resolver: &RelationshipResolver<'_>,
    block: &Block,
    diagnostics: &mut Vec<Diagnostic>,
) -> Table {
    let mut cells = Vec::new();

    for child in resolver.children(block, diagnostics) {
        let BlockKind::Cell {
            row_index,
            column_index,
            row_span,
            column_span,
            text,
        } = &child.kind
        else {
            log::debug!(
                "Ignoring {} block {} inside table {}",
                child.type_name(),
                child.id,
                block.id
            );
            continue;
        };

        let (row, column) = match (row_index, column_index) {
            (Some(r), Some(c)) if *r > 0 && *c > 0 => (*r, *c),
            _ => {
                log::warn!(
                    "Dropping cell {} of table {}: missing row/column index",
                    child.id,
                    block.id
                );
                diagnostics.push(Diagnostic::IncompleteCell {
                    table: block.id.clone(),
                    cell: child.id.clone(),
                });
                continue;
            }
        };

        let mut words = Vec::new();
        let mut selected = None;
        for part in resolver.children(child, diagnostics) {
            match &part.kind {
                BlockKind::SelectionElement { selected: state } => selected = Some(*state),
                _ => words.extend(to_word(part)),
            }
        }

        let content = match text {
            Some(text) => text.clone(),
            None => join_words(&words),
        };

        let mut cell = TableCell::text(child.id.clone(), row, column, content);
        cell.row_span = *row_span;
        cell.column_span = *column_span;
        cell.selected = selected;
        cell.confidence = child.confidence;
        cells.push(cell);
    }

    let mut table = Table::from_cells(block.id.clone(), cells);
    table.confidence = block.confidence;
    table
}

fn build_key_value(
    resolver: &RelationshipResolver<'_>,
    block: &Block,
    diagnostics: &mut Vec<Diagnostic>,
) -> KeyValue {
    let key = join_words(&child_words(resolver, block, diagnostics));

    let value = resolver
        .resolve(block, &RelationshipKind::Value, diagnostics)
        .into_iter()
        .map(|v| join_words(&child_words(resolver, v, diagnostics)))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    KeyValue {
        id: block.id.clone(),
        key,
        value,
        confidence: block.confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::PageSelection;

    fn table_page() -> Vec<Block> {
        vec![
            Block::page("p1", 1).with_children(["t1", "l1"]),
            Block::table("t1").with_children(["c21", "c12", "c11", "c22"]),
            Block::cell("c11", 1, 1).with_children(["w1"]),
            Block::cell("c12", 1, 2).with_children(["w2"]),
            Block::cell("c21", 2, 1).with_children(["w3"]),
            Block::cell("c22", 2, 2).with_children(["w4", "w5"]),
            Block::word("w1", "ID"),
            Block::word("w2", "Name"),
            Block::word("w3", "7"),
            Block::word("w4", "Ana"),
            Block::word("w5", "Lee"),
            Block::line("l1", "Roster"),
        ]
    }

    #[test]
    fn test_build_table_rows() {
        let doc = DocumentBuilder::new().build(table_page()).unwrap();
        let page = &doc.pages[0];

        assert_eq!(page.tables.len(), 1);
        let table = &page.tables[0];
        assert_eq!(table.rows[0].texts(), vec!["ID", "Name"]);
        assert_eq!(table.rows[1].texts(), vec!["7", "Ana Lee"]);
        assert_eq!(page.lines[0].text, "Roster");
        assert!(doc.diagnostics.is_empty());
    }

    #[test]
    fn test_incomplete_cell_is_dropped() {
        let mut blocks = table_page();
        blocks.push(Block::new(
            "bad",
            BlockKind::Cell {
                row_index: Some(1),
                column_index: None,
                row_span: 1,
                column_span: 1,
                text: Some("x".to_string()),
            },
        ));
        blocks[1] = Block::table("t1").with_children(["c11", "bad", "c12"]);

        let doc = DocumentBuilder::new().build(blocks).unwrap();
        let table = &doc.pages[0].tables[0];

        assert_eq!(table.row_count(), 1);
        assert_eq!(table.rows[0].texts(), vec!["ID", "Name"]);
        assert_eq!(
            doc.diagnostics,
            vec![Diagnostic::IncompleteCell {
                table: "t1".to_string(),
                cell: "bad".to_string(),
            }]
        );
    }

    #[test]
    fn test_line_text_from_words_when_missing() {
        let blocks = vec![
            Block::page("p1", 1).with_children(["l1"]),
            Block::new("l1", BlockKind::Line { text: None }).with_children(["w1", "w2"]),
            Block::word("w1", "Hello"),
            Block::word("w2", "world"),
        ];
        let doc = DocumentBuilder::new().build(blocks).unwrap();
        assert_eq!(doc.pages[0].lines[0].text, "Hello world");
        assert_eq!(doc.pages[0].lines[0].words.len(), 2);
    }

    #[test]
    fn test_key_value_pairs() {
        let blocks = vec![
            Block::page("p1", 1).with_children(["k1", "v1"]),
            Block::key_value_set("k1", EntityType::Key)
                .with_children(["w1"])
                .with_relationship(RelationshipKind::Value, ["v1"]),
            Block::key_value_set("v1", EntityType::Value).with_children(["w2", "w3"]),
            Block::word("w1", "Name:"),
            Block::word("w2", "Ana"),
            Block::word("w3", "Lee"),
        ];
        let doc = DocumentBuilder::new().build(blocks).unwrap();
        let page = &doc.pages[0];

        assert_eq!(page.key_values.len(), 1);
        assert_eq!(page.key_values[0].key, "Name:");
        assert_eq!(page.key_values[0].value, "Ana Lee");
    }

    #[test]
    fn test_selection_element_in_cell() {
        let blocks = vec![
            Block::page("p1", 1).with_children(["t1"]),
            Block::table("t1").with_children(["c1"]),
            Block::cell("c1", 1, 1).with_children(["s1"]),
            Block::new("s1", BlockKind::SelectionElement { selected: true }),
        ];
        let doc = DocumentBuilder::new().build(blocks).unwrap();
        let cell = &doc.pages[0].tables[0].rows[0].cells[0];
        assert_eq!(cell.selected, Some(true));
        assert_eq!(cell.text, "");
    }

    #[test]
    fn test_page_selection_and_sequential() {
        let blocks = vec![
            Block::page("p1", 1).with_children(["l1"]),
            Block::line("l1", "one"),
            Block::page("p2", 2).with_children(["l2"]),
            Block::line("l2", "two"),
        ];
        let options = BuildOptions::new()
            .sequential()
            .with_pages(PageSelection::Pages(vec![2]));
        let doc = DocumentBuilder::with_options(options).build(blocks).unwrap();

        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.pages[0].number, 2);
        assert_eq!(doc.metadata.block_count, 4);
        assert!(doc.block("l1").is_some());
    }

    #[test]
    fn test_unknown_children_are_skipped() {
        let blocks = vec![
            Block::page("p1", 1).with_children(["x", "l1"]),
            Block::new(
                "x",
                BlockKind::Unknown {
                    block_type: "LAYOUT_TEXT".to_string(),
                },
            ),
            Block::line("l1", "kept"),
        ];
        let doc = DocumentBuilder::new().build(blocks).unwrap();
        assert_eq!(doc.pages[0].lines.len(), 1);
        assert!(doc.diagnostics.is_empty());
    }
}
