//! Plain text rendering.

use crate::model::Document;

use super::TextOptions;

/// Extract the detected text of the selected pages.
///
/// Lines keep their reading order; pages without lines contribute nothing.
pub fn to_text(doc: &Document, options: &TextOptions) -> String {
    let sep = if options.keep_newlines { "\n" } else { " " };
    doc.pages
        .iter()
        .filter(|p| options.pages.includes(p.number) && !p.lines.is_empty())
        .map(|p| p.text(options.keep_newlines))
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Block;
    use crate::parser::DocumentBuilder;
    use crate::render::PageSelection;

    fn doc() -> Document {
        DocumentBuilder::new()
            .build(vec![
                Block::page("p1", 1).with_children(["l1", "l2"]),
                Block::line("l1", "Hello"),
                Block::line("l2", "world"),
                Block::page("p2", 2),
                Block::page("p3", 3).with_children(["l3"]),
                Block::line("l3", "Bye"),
            ])
            .unwrap()
    }

    #[test]
    fn test_to_text_joins_with_spaces() {
        assert_eq!(to_text(&doc(), &TextOptions::default()), "Hello world Bye");
    }

    #[test]
    fn test_to_text_keep_newlines() {
        let options = TextOptions::new().with_newlines(true);
        assert_eq!(to_text(&doc(), &options), "Hello\nworld\nBye");
    }

    #[test]
    fn test_to_text_page_selection() {
        let options = TextOptions::new().with_pages(PageSelection::Pages(vec![3]));
        assert_eq!(to_text(&doc(), &options), "Bye");
    }
}
