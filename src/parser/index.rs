//! Id and type lookup over a job's merged block stream.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::model::Block;

/// Arena of blocks with an id lookup table and a per-type grouping.
///
/// Blocks keep their stream order. When two blocks share an id, the id
/// lookup resolves to the later one; the type grouping lists both.
#[derive(Debug, Clone, Default)]
pub struct BlockIndex {
    blocks: Vec<Block>,
    by_id: HashMap<String, usize>,
    by_type: IndexMap<String, Vec<usize>>,
}

impl BlockIndex {
    /// Build the index, taking ownership of the stream.
    pub fn build(blocks: Vec<Block>) -> Self {
        let mut by_id = HashMap::with_capacity(blocks.len());
        let mut by_type: IndexMap<String, Vec<usize>> = IndexMap::new();

        for (pos, block) in blocks.iter().enumerate() {
            if let Some(previous) = by_id.insert(block.id.clone(), pos) {
                log::debug!(
                    "Duplicate block id {} at positions {} and {}, keeping the later one",
                    block.id,
                    previous,
                    pos
                );
            }
            by_type
                .entry(block.type_name().to_string())
                .or_default()
                .push(pos);
        }

        Self {
            blocks,
            by_id,
            by_type,
        }
    }

    /// Look up a block by id.
    pub fn get(&self, id: &str) -> Option<&Block> {
        self.by_id.get(id).map(|&pos| &self.blocks[pos])
    }

    /// Check if a block id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// All blocks in stream order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Blocks of one wire type (e.g. `"LINE"`), in first-seen order.
    pub fn of_type<'a>(&'a self, block_type: &str) -> impl Iterator<Item = &'a Block> + 'a {
        self.by_type
            .get(block_type)
            .into_iter()
            .flatten()
            .map(move |&pos| &self.blocks[pos])
    }

    /// Block counts per wire type, in first-seen type order.
    pub fn counts(&self) -> IndexMap<&str, usize> {
        self.by_type
            .iter()
            .map(|(t, positions)| (t.as_str(), positions.len()))
            .collect()
    }

    /// Log the block counts per type.
    pub fn log_counts(&self) {
        log::info!("Extracted block types:");
        for (block_type, count) in self.counts() {
            log::info!("    {} = {}", block_type, count);
        }
    }

    /// Number of blocks in the stream.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Check if the stream was empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Block> {
        vec![
            Block::page("p1", 1).with_children(["l1", "l2"]),
            Block::line("l1", "first"),
            Block::word("w1", "first"),
            Block::line("l2", "second"),
        ]
    }

    #[test]
    fn test_lookup_by_id() {
        let index = BlockIndex::build(sample());
        assert_eq!(index.len(), 4);
        assert_eq!(index.get("l2").and_then(|b| b.text()), Some("second"));
        assert!(index.get("missing").is_none());
        assert!(index.contains("w1"));
    }

    #[test]
    fn test_grouping_preserves_first_seen_order() {
        let index = BlockIndex::build(sample());

        let lines: Vec<_> = index.of_type("LINE").map(|b| b.id.as_str()).collect();
        assert_eq!(lines, vec!["l1", "l2"]);
        assert_eq!(index.of_type("TABLE").count(), 0);

        let counts: Vec<_> = index.counts().into_iter().collect();
        assert_eq!(counts, vec![("PAGE", 1), ("LINE", 2), ("WORD", 1)]);
    }

    #[test]
    fn test_duplicate_id_last_write_wins() {
        let blocks = vec![
            Block::page("p1", 1),
            Block::line("dup", "old"),
            Block::line("dup", "new"),
        ];
        let index = BlockIndex::build(blocks);

        assert_eq!(index.get("dup").and_then(|b| b.text()), Some("new"));
        assert_eq!(index.of_type("LINE").count(), 2);
        assert_eq!(index.len(), 3);
    }
}
