//! Pull suggested video titles out of a discovery document.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// Text of every level-4 heading in `markdown`, trimmed, in document order.
///
/// The discovery prompt asks for one `####` title per suggested topic, so
/// these are the candidates offered for deep research. Inline formatting is
/// flattened to its text and empty headings are skipped. Glyphs appended by
/// link annotation inside a heading are kept.
pub fn extract_titles(markdown: &str) -> Vec<String> {
    let parser = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH);

    let mut titles = Vec::new();
    let mut current: Option<String> = None;

    for event in parser {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H4,
                ..
            }) => current = Some(String::new()),
            Event::End(TagEnd::Heading(HeadingLevel::H4)) => {
                if let Some(title) = current.take() {
                    let title = title.trim();
                    if !title.is_empty() {
                        titles.push(title.to_string());
                    }
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(title) = current.as_mut() {
                    title.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(title) = current.as_mut() {
                    title.push(' ');
                }
            }
            _ => {}
        }
    }

    titles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_level_four_headings_in_order() {
        let doc = "\
### Topic 1: Chip exports
#### Why Nvidia's China ban matters
Some analysis.

#### **The Fed's next move**, explained
More.
";
        assert_eq!(
            extract_titles(doc),
            vec![
                "Why Nvidia's China ban matters".to_string(),
                "The Fed's next move, explained".to_string(),
            ]
        );
    }

    #[test]
    fn test_ignores_other_levels_and_empty_headings() {
        let doc = "# Title\n## Sub\n####\n##### Deeper\n#### `TSLA` deliveries\n";
        assert_eq!(extract_titles(doc), vec!["TSLA deliveries".to_string()]);
    }

    #[test]
    fn test_no_headings() {
        assert!(extract_titles("just prose, no headings").is_empty());
        assert!(extract_titles("").is_empty());
    }
}
