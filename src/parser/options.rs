//! Document construction options.

use crate::render::PageSelection;

/// Options for building documents from block streams.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Whether to build pages in parallel
    pub parallel: bool,

    /// Page selection (which pages to build)
    pub pages: PageSelection,

    /// Whether to log per-type block counts while indexing
    pub log_block_counts: bool,
}

impl BuildOptions {
    /// Create new build options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Enable or disable block count logging.
    pub fn with_block_counts(mut self, log_counts: bool) -> Self {
        self.log_block_counts = log_counts;
        self
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            pages: PageSelection::All,
            log_block_counts: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_options_builder() {
        let options = BuildOptions::new()
            .sequential()
            .with_pages(PageSelection::Range(2..=3))
            .with_block_counts(false);

        assert!(!options.parallel);
        assert!(!options.log_block_counts);
        assert!(options.pages.includes(2));
        assert!(!options.pages.includes(1));
    }

    #[test]
    fn test_default_options() {
        let options = BuildOptions::default();
        assert!(options.parallel);
        assert!(matches!(options.pages, PageSelection::All));
    }
}
