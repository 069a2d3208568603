//! Line, word and key-value types.

use serde::{Deserialize, Serialize};

/// A line of text on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Id of the LINE block
    pub id: String,

    /// Line text
    pub text: String,

    /// Recognition confidence (0-100)
    pub confidence: Option<f32>,

    /// Words of the line, in relationship order
    pub words: Vec<Word>,
}

impl Line {
    /// Create a line with text and no words.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            confidence: None,
            words: Vec::new(),
        }
    }

    /// Create a line whose text is derived from its words.
    pub fn from_words(id: impl Into<String>, words: Vec<Word>) -> Self {
        let text = join_words(&words);
        Self {
            id: id.into(),
            text,
            confidence: None,
            words,
        }
    }

    /// Get the number of words.
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Check if the line has no visible text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A single recognized word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// Id of the WORD block
    pub id: String,

    /// Word text
    pub text: String,

    /// Recognition confidence (0-100)
    pub confidence: Option<f32>,

    /// Whether the word was recognized as handwriting
    pub handwritten: bool,
}

impl Word {
    /// Create a printed word.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            confidence: None,
            handwritten: false,
        }
    }
}

/// Join word texts with single spaces.
pub(crate) fn join_words(words: &[Word]) -> String {
    words
        .iter()
        .map(|w| w.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A key-value pair (form field).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    /// Id of the KEY block
    pub id: String,

    /// Key text
    pub key: String,

    /// Value text (empty when the value block has no words)
    pub value: String,

    /// Recognition confidence of the key (0-100)
    pub confidence: Option<f32>,
}

impl KeyValue {
    /// Create a key-value pair.
    pub fn new(id: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            value: value.into(),
            confidence: None,
        }
    }
}
