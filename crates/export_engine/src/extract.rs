use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::types::{segments_text, ContentBlock, Segment};

pub trait Extractor: Send + Sync {
    fn extract(&self, html: &str) -> Vec<ContentBlock>;
}

/// Walks an HTML fragment and emits headings, paragraphs, list items, images
/// and rules in document order. Parsing is lenient; malformed markup never
/// fails, unknown content is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockExtractor;

/// Inherited inline style, passed down by value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct InlineStyle {
    bold: bool,
    italic: bool,
}

impl InlineStyle {
    fn bold(self) -> Self {
        Self { bold: true, ..self }
    }

    fn italic(self) -> Self {
        Self {
            italic: true,
            ..self
        }
    }
}

impl Extractor for BlockExtractor {
    fn extract(&self, html: &str) -> Vec<ContentBlock> {
        let fragment = Html::parse_fragment(html);
        let mut blocks = Vec::new();
        self.visit_children(fragment.root_element(), &mut blocks);
        blocks
    }
}

impl BlockExtractor {
    fn visit_children(&self, element: ElementRef, blocks: &mut Vec<ContentBlock>) {
        for child in element.children() {
            if let Some(child) = ElementRef::wrap(child) {
                self.visit_element(child, blocks);
            }
        }
    }

    fn visit_element(&self, element: ElementRef, blocks: &mut Vec<ContentBlock>) {
        let tag = element.value().name().to_ascii_lowercase();
        match tag.as_str() {
            "h1" | "h2" | "h3" | "h4" => {
                let text = collect_text(element);
                let text = text.trim();
                if !text.is_empty() {
                    let level = tag.as_bytes()[1] - b'0';
                    blocks.push(ContentBlock::Heading {
                        level,
                        text: text.to_string(),
                    });
                }
            }
            "p" => {
                if let Some(img) = sole_image_child(element) {
                    push_image(img, blocks);
                } else if let Some(segments) = self.block_segments(element) {
                    blocks.push(ContentBlock::Paragraph { segments });
                }
            }
            "img" => push_image(element, blocks),
            "ul" | "ol" => {
                let Ok(selector) = Selector::parse("li") else {
                    return;
                };
                for item in element.select(&selector) {
                    if let Some(segments) = self.block_segments(item) {
                        blocks.push(ContentBlock::ListItem { segments });
                    }
                }
            }
            "li" => {
                if let Some(segments) = self.block_segments(element) {
                    blocks.push(ContentBlock::ListItem { segments });
                }
            }
            "hr" => blocks.push(ContentBlock::HorizontalRule),
            "div" | "section" | "article" | "figure" | "blockquote" | "main" | "header"
            | "footer" | "aside" | "body" | "html" => self.visit_children(element, blocks),
            _ => {}
        }
    }

    /// Inline segments of a block element, or `None` when its text is blank.
    fn block_segments(&self, element: ElementRef) -> Option<Vec<Segment>> {
        let mut segments = Vec::new();
        for child in element.children() {
            self.inline_node(child, InlineStyle::default(), &mut segments);
        }
        if segments_text(&segments).trim().is_empty() {
            None
        } else {
            Some(segments)
        }
    }

    fn inline_node(&self, node: NodeRef<'_, Node>, style: InlineStyle, out: &mut Vec<Segment>) {
        match node.value() {
            Node::Text(text) => push_segment(out, String::from(&**text), None, style),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    self.inline_element(element, style, out);
                }
            }
            _ => {}
        }
    }

    fn inline_element(&self, element: ElementRef, style: InlineStyle, out: &mut Vec<Segment>) {
        let tag = element.value().name().to_ascii_lowercase();
        match tag.as_str() {
            "a" => {
                let text = collect_text(element).trim().to_string();
                let href = element
                    .value()
                    .attr("href")
                    .map(str::trim)
                    .filter(|href| !href.is_empty())
                    .map(str::to_string);
                push_segment(out, text, href, style);
            }
            "strong" | "b" => self.inline_children(element, style.bold(), out),
            "em" | "i" => self.inline_children(element, style.italic(), out),
            "u" | "span" | "mark" | "code" | "small" | "sub" | "sup" | "s" | "del" | "ins"
            | "abbr" | "cite" | "q" | "time" => self.inline_children(element, style, out),
            // Nested lists are emitted by the list walk itself.
            "ul" | "ol" => {}
            _ => push_segment(out, collect_text(element), None, style),
        }
    }

    fn inline_children(&self, element: ElementRef, style: InlineStyle, out: &mut Vec<Segment>) {
        for child in element.children() {
            self.inline_node(child, style, out);
        }
    }
}

fn push_segment(out: &mut Vec<Segment>, text: String, href: Option<String>, style: InlineStyle) {
    if text.is_empty() {
        return;
    }
    out.push(Segment {
        text,
        href,
        bold: style.bold,
        italic: style.italic,
    });
}

fn collect_text(element: ElementRef) -> String {
    element.text().collect()
}

fn push_image(img: ElementRef, blocks: &mut Vec<ContentBlock>) {
    let src = img.value().attr("src").map(str::trim).unwrap_or("");
    if !src.is_empty() {
        blocks.push(ContentBlock::Image {
            src: src.to_string(),
        });
    }
}

/// `<p><img></p>` with nothing but whitespace around the image.
fn sole_image_child(element: ElementRef) -> Option<ElementRef> {
    let mut image = None;
    for child in element.children() {
        match child.value() {
            Node::Text(text) if text.trim().is_empty() => {}
            Node::Comment(_) => {}
            Node::Element(el) if el.name().eq_ignore_ascii_case("img") && image.is_none() => {
                image = ElementRef::wrap(child);
            }
            _ => return None,
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_level_comes_from_tag() {
        let blocks = BlockExtractor.extract("<h3> Deep </h3><h5>ignored</h5>");
        assert_eq!(
            blocks,
            vec![ContentBlock::Heading {
                level: 3,
                text: "Deep".into()
            }]
        );
    }

    #[test]
    fn image_wrapped_in_paragraph_is_unwrapped() {
        let blocks = BlockExtractor.extract("<p>\n  <img src=\" /a.png \">\n</p>");
        assert_eq!(blocks, vec![ContentBlock::Image { src: "/a.png".into() }]);
    }

    #[test]
    fn paragraph_with_image_and_text_keeps_text_only() {
        let blocks = BlockExtractor.extract("<p>caption <img src=\"/a.png\"></p>");
        assert_eq!(
            blocks,
            vec![ContentBlock::Paragraph {
                segments: vec![Segment::plain("caption ")]
            }]
        );
    }
}
