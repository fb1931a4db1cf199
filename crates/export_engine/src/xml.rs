use std::borrow::Cow;

use quick_xml::escape::escape;

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

#[derive(Debug, Clone, PartialEq, Eq)]
enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// Element tree for package parts. Text and attribute values are escaped on
/// output, so callers pass raw strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attrs.push((key.into(), value.to_string()));
        self
    }

    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = XmlElement>) -> Self {
        self.children
            .extend(children.into_iter().map(XmlNode::Element));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Element with a single text child, e.g. `<dc:title>..</dc:title>`.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).text(text)
    }

    pub fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(&*strip_illegal(value)));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                XmlNode::Element(element) => element.write_to(out),
                XmlNode::Text(text) => out.push_str(&escape(&*strip_illegal(text))),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }
}

/// Characters XML 1.0 cannot carry, even as character references.
fn is_illegal(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}'
    )
}

fn strip_illegal(value: &str) -> Cow<'_, str> {
    if value.chars().any(is_illegal) {
        Cow::Owned(value.chars().filter(|&c| !is_illegal(c)).collect())
    } else {
        Cow::Borrowed(value)
    }
}

/// Serialize a full part: declaration, newline, root element.
pub fn document(root: &XmlElement) -> Vec<u8> {
    let mut out = String::from(DECLARATION);
    out.push('\n');
    root.write_to(&mut out);
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::{document, XmlElement};

    #[test]
    fn empty_elements_self_close() {
        let el = XmlElement::new("a:p");
        assert_eq!(el.render(), "<a:p/>");
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let el = XmlElement::new("a:t")
            .attr("title", "say \"hi\" & <bye>")
            .text("1 < 2 & 3 > \"0\"");
        assert_eq!(
            el.render(),
            "<a:t title=\"say &quot;hi&quot; &amp; &lt;bye&gt;\">1 &lt; 2 &amp; 3 &gt; &quot;0&quot;</a:t>"
        );
    }

    #[test]
    fn nested_children_keep_order() {
        let el = XmlElement::new("r")
            .child(XmlElement::new("a"))
            .children(vec![XmlElement::new("b"), XmlElement::new("c")])
            .text("d");
        assert_eq!(el.render(), "<r><a/><b/><c/>d</r>");
    }

    #[test]
    fn control_characters_are_dropped() {
        let el = XmlElement::new("a:t")
            .attr("name", "Q3\u{8}Report")
            .text("tab\there\u{b}\u{1}\r\nend\u{ffff}");
        assert_eq!(el.render(), "<a:t name=\"Q3Report\">tab\there\r\nend</a:t>");
    }

    #[test]
    fn document_has_declaration() {
        let bytes = document(&XmlElement::new("Types"));
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\""));
        assert!(text.ends_with("<Types/>"));
    }
}
