//! Splitting a flat block stream into per-page groups.

use crate::error::{Error, Result};
use crate::model::Block;

/// The blocks of one page: its PAGE block followed by every block up to
/// the next PAGE block.
#[derive(Debug, Clone, Copy)]
pub struct PageGroup<'a> {
    /// 1-based position of this group in the stream
    pub ordinal: u32,
    blocks: &'a [Block],
}

impl<'a> PageGroup<'a> {
    /// The PAGE block that opened this group.
    pub fn page_block(&self) -> &'a Block {
        &self.blocks[0]
    }

    /// Every block in the group, PAGE block first.
    pub fn blocks(&self) -> &'a [Block] {
        self.blocks
    }

    /// Page number: the PAGE block's own number, else the stream ordinal.
    pub fn number(&self) -> u32 {
        self.page_block().page.unwrap_or(self.ordinal)
    }

    /// Number of blocks in the group, PAGE block included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false; a group holds at least its PAGE block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Splits a stream into page groups on PAGE markers.
pub struct PageAssembler;

impl PageAssembler {
    /// Split the stream into one group per PAGE block, in stream order.
    ///
    /// Fails with [`Error::MalformedStream`] when a non-PAGE block precedes
    /// the first PAGE block. An empty stream yields no groups.
    pub fn assemble(blocks: &[Block]) -> Result<Vec<PageGroup<'_>>> {
        if let Some(first) = blocks.first() {
            if !first.is_page() {
                return Err(Error::MalformedStream(format!(
                    "{} block {} precedes the first PAGE block",
                    first.type_name(),
                    first.id
                )));
            }
        }

        let starts: Vec<usize> = blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_page())
            .map(|(pos, _)| pos)
            .collect();

        let groups = starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = starts.get(i + 1).copied().unwrap_or(blocks.len());
                PageGroup {
                    ordinal: i as u32 + 1,
                    blocks: &blocks[start..end],
                }
            })
            .collect();

        Ok(groups)
    }
}
