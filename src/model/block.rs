//! Raw analysis blocks as delivered by the provider.
//!
//! The provider's JSON schema (`BlockType`, `Id`, `Relationships`, ...) is
//! parsed into [`RawBlock`] and converted into the typed [`Block`], whose
//! [`BlockKind`] carries only the fields meaningful for each block type.

use serde::{Deserialize, Serialize};

/// A block exactly as it appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawBlock {
    /// Block type (`PAGE`, `LINE`, `WORD`, `TABLE`, `CELL`, ...)
    pub block_type: String,

    /// Identifier, unique within one job's result set
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_type: Option<String>,

    /// 1-indexed page number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Vec<RawRelationship>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_index: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_span: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_span: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_types: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_status: Option<String>,
}

/// A relationship exactly as it appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawRelationship {
    /// Relationship type (`CHILD`, `VALUE`, ...)
    #[serde(rename = "Type")]
    pub kind: String,

    /// Referenced block ids, in order
    #[serde(default)]
    pub ids: Vec<String>,
}

/// Kind of a relationship between blocks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    /// Structural containment
    Child,
    /// KEY -> VALUE link of a key-value pair
    Value,
    /// Cell -> merged cell link
    MergedCell,
    /// Any other relationship type, kept verbatim
    Other(String),
}

impl RelationshipKind {
    /// Wire name of the relationship type.
    pub fn as_str(&self) -> &str {
        match self {
            RelationshipKind::Child => "CHILD",
            RelationshipKind::Value => "VALUE",
            RelationshipKind::MergedCell => "MERGED_CELL",
            RelationshipKind::Other(s) => s,
        }
    }
}

impl From<&str> for RelationshipKind {
    fn from(s: &str) -> Self {
        match s {
            "CHILD" => RelationshipKind::Child,
            "VALUE" => RelationshipKind::Value,
            "MERGED_CELL" => RelationshipKind::MergedCell,
            other => RelationshipKind::Other(other.to_string()),
        }
    }
}

/// A typed, ordered list of referenced block ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub ids: Vec<String>,
}

/// Entity type of a KEY_VALUE_SET block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Key,
    Value,
    Unknown,
}

/// Block variants with the fields meaningful for each type.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    /// A page marker; starts a page group in the stream
    Page,
    /// A line of text
    Line { text: Option<String> },
    /// A single word
    Word {
        text: Option<String>,
        text_type: Option<String>,
    },
    /// A table; its children are cells
    Table,
    /// A table cell; indices are 1-based and may be missing on malformed input
    Cell {
        row_index: Option<u32>,
        column_index: Option<u32>,
        row_span: u32,
        column_span: u32,
        text: Option<String>,
    },
    /// One side of a key-value pair
    KeyValueSet { entity: EntityType },
    /// A checkbox or radio button
    SelectionElement { selected: bool },
    /// A block type this library does not model; no fields are guessed
    Unknown { block_type: String },
}

impl BlockKind {
    /// Wire name of the block type.
    pub fn type_name(&self) -> &str {
        match self {
            BlockKind::Page => "PAGE",
            BlockKind::Line { .. } => "LINE",
            BlockKind::Word { .. } => "WORD",
            BlockKind::Table => "TABLE",
            BlockKind::Cell { .. } => "CELL",
            BlockKind::KeyValueSet { .. } => "KEY_VALUE_SET",
            BlockKind::SelectionElement { .. } => "SELECTION_ELEMENT",
            BlockKind::Unknown { block_type } => block_type,
        }
    }
}

/// A typed analysis block.
///
/// Deserializes directly from the provider's wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBlock", into = "RawBlock")]
pub struct Block {
    /// Identifier, unique within one job's result set
    pub id: String,

    /// Type-specific payload
    pub kind: BlockKind,

    /// 1-indexed page number, when reported
    pub page: Option<u32>,

    /// Recognition confidence (0-100)
    pub confidence: Option<f32>,

    /// Outgoing relationships, in wire order
    pub relationships: Vec<Relationship>,
}

impl Block {
    /// Create a block with no relationships.
    pub fn new(id: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            kind,
            page: None,
            confidence: None,
            relationships: Vec::new(),
        }
    }

    /// Create a PAGE block.
    pub fn page(id: impl Into<String>, number: u32) -> Self {
        Self::new(id, BlockKind::Page).on_page(number)
    }

    /// Create a LINE block with text.
    pub fn line(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(
            id,
            BlockKind::Line {
                text: Some(text.into()),
            },
        )
    }

    /// Create a WORD block with text.
    pub fn word(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(
            id,
            BlockKind::Word {
                text: Some(text.into()),
                text_type: None,
            },
        )
    }

    /// Create a TABLE block.
    pub fn table(id: impl Into<String>) -> Self {
        Self::new(id, BlockKind::Table)
    }

    /// Create a CELL block at the given 1-based position.
    pub fn cell(id: impl Into<String>, row_index: u32, column_index: u32) -> Self {
        Self::new(
            id,
            BlockKind::Cell {
                row_index: Some(row_index),
                column_index: Some(column_index),
                row_span: 1,
                column_span: 1,
                text: None,
            },
        )
    }

    /// Create a KEY_VALUE_SET block.
    pub fn key_value_set(id: impl Into<String>, entity: EntityType) -> Self {
        Self::new(id, BlockKind::KeyValueSet { entity })
    }

    /// Set the page number and return self.
    pub fn on_page(mut self, number: u32) -> Self {
        self.page = Some(number);
        self
    }

    /// Add a CHILD relationship and return self.
    pub fn with_children<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_relationship(RelationshipKind::Child, ids)
    }

    /// Add a relationship of the given kind and return self.
    pub fn with_relationship<I, S>(mut self, kind: RelationshipKind, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationships.push(Relationship {
            kind,
            ids: ids.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Check if this is a PAGE block.
    pub fn is_page(&self) -> bool {
        matches!(self.kind, BlockKind::Page)
    }

    /// Wire name of the block type.
    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    /// Text carried by the block itself (LINE, WORD, CELL).
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            BlockKind::Line { text } | BlockKind::Word { text, .. } | BlockKind::Cell { text, .. } => {
                text.as_deref()
            }
            _ => None,
        }
    }

    /// Ids referenced by all relationships of the given kind, in order.
    pub fn related_ids(&self, kind: &RelationshipKind) -> impl Iterator<Item = &str> + '_ {
        let kind = kind.clone();
        self.relationships
            .iter()
            .filter(move |r| r.kind == kind)
            .flat_map(|r| r.ids.iter().map(String::as_str))
    }

    /// Check if the block has at least one relationship of the given kind.
    pub fn has_relationship(&self, kind: &RelationshipKind) -> bool {
        self.relationships.iter().any(|r| &r.kind == kind)
    }
}

impl From<RawBlock> for Block {
    fn from(raw: RawBlock) -> Self {
        let kind = match raw.block_type.as_str() {
            "PAGE" => BlockKind::Page,
            "LINE" => BlockKind::Line { text: raw.text },
            "WORD" => BlockKind::Word {
                text: raw.text,
                text_type: raw.text_type,
            },
            "TABLE" => BlockKind::Table,
            "CELL" => BlockKind::Cell {
                row_index: raw.row_index,
                column_index: raw.column_index,
                row_span: raw.row_span.unwrap_or(1),
                column_span: raw.column_span.unwrap_or(1),
                text: raw.text,
            },
            "KEY_VALUE_SET" => {
                let types = raw.entity_types.unwrap_or_default();
                let entity = if types.iter().any(|t| t == "KEY") {
                    EntityType::Key
                } else if types.iter().any(|t| t == "VALUE") {
                    EntityType::Value
                } else {
                    EntityType::Unknown
                };
                BlockKind::KeyValueSet { entity }
            }
            "SELECTION_ELEMENT" => BlockKind::SelectionElement {
                selected: raw.selection_status.as_deref() == Some("SELECTED"),
            },
            _ => BlockKind::Unknown {
                block_type: raw.block_type,
            },
        };

        let relationships = raw
            .relationships
            .unwrap_or_default()
            .into_iter()
            .map(|r| Relationship {
                kind: RelationshipKind::from(r.kind.as_str()),
                ids: r.ids,
            })
            .collect();

        Block {
            id: raw.id,
            kind,
            page: raw.page,
            confidence: raw.confidence,
            relationships,
        }
    }
}

impl From<Block> for RawBlock {
    fn from(block: Block) -> Self {
        let mut raw = RawBlock {
            block_type: block.kind.type_name().to_string(),
            id: block.id,
            page: block.page,
            confidence: block.confidence,
            ..Default::default()
        };

        if !block.relationships.is_empty() {
            raw.relationships = Some(
                block
                    .relationships
                    .into_iter()
                    .map(|r| RawRelationship {
                        kind: r.kind.as_str().to_string(),
                        ids: r.ids,
                    })
                    .collect(),
            );
        }

        match block.kind {
            BlockKind::Line { text } => raw.text = text,
            BlockKind::Word { text, text_type } => {
                raw.text = text;
                raw.text_type = text_type;
            }
            BlockKind::Cell {
                row_index,
                column_index,
                row_span,
                column_span,
                text,
            } => {
                raw.row_index = row_index;
                raw.column_index = column_index;
                raw.row_span = Some(row_span);
                raw.column_span = Some(column_span);
                raw.text = text;
            }
            BlockKind::KeyValueSet { entity } => {
                raw.entity_types = match entity {
                    EntityType::Key => Some(vec!["KEY".to_string()]),
                    EntityType::Value => Some(vec!["VALUE".to_string()]),
                    EntityType::Unknown => None,
                };
            }
            BlockKind::SelectionElement { selected } => {
                raw.selection_status = Some(if selected { "SELECTED" } else { "NOT_SELECTED" }.to_string());
            }
            BlockKind::Page | BlockKind::Table | BlockKind::Unknown { .. } => {}
        }

        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_cell() {
        let json = r#"{
            "BlockType": "CELL",
            "Id": "c1",
            "Page": 2,
            "RowIndex": 3,
            "ColumnIndex": 1,
            "Confidence": 97.5,
            "Geometry": {"BoundingBox": {"Width": 0.1}},
            "Relationships": [{"Type": "CHILD", "Ids": ["w1", "w2"]}]
        }"#;
        let block: Block = serde_json::from_str(json).unwrap();

        assert_eq!(block.id, "c1");
        assert_eq!(block.page, Some(2));
        assert_eq!(
            block.kind,
            BlockKind::Cell {
                row_index: Some(3),
                column_index: Some(1),
                row_span: 1,
                column_span: 1,
                text: None,
            }
        );
        let children: Vec<_> = block.related_ids(&RelationshipKind::Child).collect();
        assert_eq!(children, vec!["w1", "w2"]);
    }

    #[test]
    fn test_unknown_type_is_quarantined() {
        let json = r#"{"BlockType": "LAYOUT_TITLE", "Id": "x", "Text": "ignored"}"#;
        let block: Block = serde_json::from_str(json).unwrap();

        assert_eq!(
            block.kind,
            BlockKind::Unknown {
                block_type: "LAYOUT_TITLE".to_string()
            }
        );
        assert_eq!(block.text(), None);
        assert_eq!(block.type_name(), "LAYOUT_TITLE");
    }

    #[test]
    fn test_key_value_entity() {
        let json = r#"{"BlockType": "KEY_VALUE_SET", "Id": "k", "EntityTypes": ["KEY"]}"#;
        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(
            block.kind,
            BlockKind::KeyValueSet {
                entity: EntityType::Key
            }
        );
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let block = Block::line("l1", "Hello").on_page(1).with_children(["w1"]);
        let json = serde_json::to_value(&block).unwrap();

        assert_eq!(json["BlockType"], "LINE");
        assert_eq!(json["Text"], "Hello");
        assert_eq!(json["Relationships"][0]["Type"], "CHILD");
        assert!(json.get("RowIndex").is_none());
    }
}
