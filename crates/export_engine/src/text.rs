use engine_logging::engine_info;

use crate::types::{segments_with_urls, ContentBlock};

const LIST_PREFIX: &str = "\u{2022} ";

#[derive(Debug, Default, Clone, Copy)]
pub struct TextRenderer;

impl TextRenderer {
    /// Title, a blank line, then one paragraph per block separated by blank lines.
    pub fn render(&self, title: &str, blocks: &[ContentBlock]) -> Vec<u8> {
        let mut paragraphs = vec![title.trim().to_string()];
        paragraphs.extend(blocks.iter().map(block_text));

        let mut out = paragraphs.join("\n\n");
        out.push('\n');
        engine_info!("Rendered text export with {} blocks ({} bytes)", blocks.len(), out.len());
        out.into_bytes()
    }
}

fn block_text(block: &ContentBlock) -> String {
    match block {
        ContentBlock::Heading { text, .. } => text.clone(),
        ContentBlock::Paragraph { segments } => segments_with_urls(segments).trim().to_string(),
        ContentBlock::ListItem { segments } => {
            format!("{LIST_PREFIX}{}", segments_with_urls(segments).trim())
        }
        ContentBlock::Image { src } => format!("[Image: {src}]"),
        ContentBlock::HorizontalRule => "---".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Segment;
    use pretty_assertions::assert_eq;

    #[test]
    fn blocks_are_separated_by_blank_lines() {
        let blocks = vec![
            ContentBlock::Heading {
                level: 2,
                text: "Intro".into(),
            },
            ContentBlock::Paragraph {
                segments: vec![
                    Segment::plain("See "),
                    Segment {
                        text: "docs".into(),
                        href: Some("https://d.example".into()),
                        bold: false,
                        italic: false,
                    },
                ],
            },
            ContentBlock::ListItem {
                segments: vec![Segment::plain("one")],
            },
            ContentBlock::Image {
                src: "/a.png".into(),
            },
            ContentBlock::HorizontalRule,
        ];
        let text = String::from_utf8(TextRenderer.render("Title", &blocks)).unwrap();
        assert_eq!(
            text,
            "Title\n\nIntro\n\nSee docs (https://d.example)\n\n\u{2022} one\n\n[Image: /a.png]\n\n---\n"
        );
    }

    #[test]
    fn empty_article_is_just_the_title() {
        assert_eq!(TextRenderer.render("Only", &[]), b"Only\n".to_vec());
    }
}
