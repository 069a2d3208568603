//! Rendering options and configuration.

use std::ops::RangeInclusive;

/// Options for extracting document text.
#[derive(Debug, Clone, Default)]
pub struct TextOptions {
    /// Join lines with newlines instead of single spaces
    pub keep_newlines: bool,

    /// Page selection
    pub pages: PageSelection,
}

impl TextOptions {
    /// Create new text options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable newline preservation.
    pub fn with_newlines(mut self, keep: bool) -> Self {
        self.keep_newlines = keep;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, selection: PageSelection) -> Self {
        self.pages = selection;
        self
    }

    /// Set specific page range.
    pub fn with_page_range(mut self, range: RangeInclusive<u32>) -> Self {
        self.pages = PageSelection::Range(range);
        self
    }
}

/// Page selection for building and rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// A range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Specific pages (1-indexed)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                let start: u32 = start.trim().parse().map_err(|_| "Invalid start page")?;
                let end: u32 = end.trim().parse().map_err(|_| "Invalid end page")?;
                if start > end {
                    return Err(format!("Empty page range {}-{}", start, end));
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let start: u32 = start.trim().parse().map_err(|_| "Invalid page number")?;
                let end: u32 = end.trim().parse().map_err(|_| "Invalid page number")?;
                for p in start..=end {
                    if !pages.contains(&p) {
                        pages.push(p);
                    }
                }
            } else {
                let p: u32 = part.parse().map_err(|_| "Invalid page number")?;
                if !pages.contains(&p) {
                    pages.push(p);
                }
            }
        }

        pages.sort();
        Ok(PageSelection::Pages(pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_options_builder() {
        let options = TextOptions::new().with_newlines(true).with_page_range(2..=4);
        assert!(options.keep_newlines);
        assert!(options.pages.includes(3));
        assert!(!options.pages.includes(5));
    }

    #[test]
    fn test_page_selection_includes() {
        let range = PageSelection::Range(5..=10);
        assert!(!range.includes(4));
        assert!(range.includes(10));

        let pages = PageSelection::Pages(vec![1, 3]);
        assert!(pages.includes(3));
        assert!(!pages.includes(2));
        assert!(PageSelection::All.includes(100));
    }

    #[test]
    fn test_page_selection_parse() {
        assert_eq!(PageSelection::parse("all").unwrap(), PageSelection::All);
        assert_eq!(PageSelection::parse("1-10").unwrap(), PageSelection::Range(1..=10));
        assert_eq!(
            PageSelection::parse("1,3,5-7,10").unwrap(),
            PageSelection::Pages(vec![1, 3, 5, 6, 7, 10])
        );
        assert!(PageSelection::parse("5-2").is_err());
        assert!(PageSelection::parse("x").is_err());
    }
}
