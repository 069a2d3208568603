//! One-hop relationship resolution against a [`BlockIndex`].

use crate::model::{Block, Diagnostic, RelationshipKind};

use super::BlockIndex;

/// Resolves the ids named by a block's relationships into blocks.
///
/// Missing ids are skipped and reported as
/// [`Diagnostic::DanglingReference`].
#[derive(Debug, Clone, Copy)]
pub struct RelationshipResolver<'a> {
    index: &'a BlockIndex,
}

impl<'a> RelationshipResolver<'a> {
    /// Create a resolver over an index.
    pub fn new(index: &'a BlockIndex) -> Self {
        Self { index }
    }

    /// Resolve the CHILD relationship of a block.
    pub fn children(&self, block: &Block, diagnostics: &mut Vec<Diagnostic>) -> Vec<&'a Block> {
        self.resolve(block, &RelationshipKind::Child, diagnostics)
    }

    /// Resolve every relationship of the given kind, in id order.
    ///
    /// Returns an empty list when the block has no such relationship.
    pub fn resolve(
        &self,
        block: &Block,
        kind: &RelationshipKind,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<&'a Block> {
        let mut resolved = Vec::new();
        for id in block.related_ids(kind) {
            match self.index.get(id) {
                Some(child) => resolved.push(child),
                None => {
                    log::warn!(
                        "{} block {} references missing block {}",
                        block.type_name(),
                        block.id,
                        id
                    );
                    diagnostics.push(Diagnostic::DanglingReference {
                        parent: block.id.clone(),
                        missing: id.to_string(),
                    });
                }
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_in_relationship_order() {
        let index = BlockIndex::build(vec![
            Block::page("p1", 1).with_children(["l2", "l1"]),
            Block::line("l1", "one"),
            Block::line("l2", "two"),
        ]);
        let resolver = RelationshipResolver::new(&index);
        let mut diagnostics = Vec::new();

        let page = index.get("p1").unwrap();
        let ids: Vec<_> = resolver
            .children(page, &mut diagnostics)
            .into_iter()
            .map(|b| b.id.as_str())
            .collect();

        assert_eq!(ids, vec!["l2", "l1"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_no_relationship_is_empty() {
        let index = BlockIndex::build(vec![Block::page("p1", 1)]);
        let resolver = RelationshipResolver::new(&index);
        let mut diagnostics = Vec::new();

        let page = index.get("p1").unwrap();
        assert!(resolver.children(page, &mut diagnostics).is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_missing_child_is_skipped_and_reported() {
        let index = BlockIndex::build(vec![
            Block::page("p1", 1).with_children(["l1", "gone", "l2"]),
            Block::line("l1", "one"),
            Block::line("l2", "two"),
        ]);
        let resolver = RelationshipResolver::new(&index);
        let mut diagnostics = Vec::new();

        let page = index.get("p1").unwrap();
        let children = resolver.children(page, &mut diagnostics);

        assert_eq!(children.len(), 2);
        assert_eq!(
            diagnostics,
            vec![Diagnostic::DanglingReference {
                parent: "p1".to_string(),
                missing: "gone".to_string(),
            }]
        );
    }

    #[test]
    fn test_resolve_value_relationship() {
        let index = BlockIndex::build(vec![
            Block::key_value_set("k", crate::model::EntityType::Key)
                .with_relationship(RelationshipKind::Value, ["v"]),
            Block::key_value_set("v", crate::model::EntityType::Value),
        ]);
        let resolver = RelationshipResolver::new(&index);
        let mut diagnostics = Vec::new();

        let key = index.get("k").unwrap();
        let values = resolver.resolve(key, &RelationshipKind::Value, &mut diagnostics);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].id, "v");
    }
}
