use crate::error::ExportError;
use crate::package::{add_document_properties, OpcPackage, Relationships};
use crate::types::ExportFormat;
use crate::xml::{document, XmlElement};

const MAIN_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const STYLES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const WP_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

pub const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
pub const LINK_COLOR: &str = "1155CC";
const FONT: &str = "Calibri";

/// Heading sizes in half-points, Heading1..Heading4.
const HEADING_SIZES: [u32; 4] = [32, 28, 26, 24];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn styled(text: impl Into<String>, bold: bool, italic: bool) -> Self {
        Self {
            text: text.into(),
            bold,
            italic,
        }
    }
}

/// Inline PNG picture, sized in EMU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    pub png: Vec<u8>,
    pub width_emu: u64,
    pub height_emu: u64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(Run),
    Hyperlink { href: String, run: Run },
    Picture(Picture),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    style: Option<String>,
    bottom_border: bool,
    inlines: Vec<Inline>,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paragraph styled `Heading{level}`; levels outside 1..=4 are clamped.
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self {
            style: Some(format!("Heading{}", level.clamp(1, 4))),
            ..Self::default()
        }
        .run(Run::new(text))
    }

    pub fn rule() -> Self {
        Self {
            bottom_border: true,
            ..Self::default()
        }
    }

    pub fn run(mut self, run: Run) -> Self {
        self.inlines.push(Inline::Text(run));
        self
    }

    pub fn hyperlink(mut self, href: impl Into<String>, text: impl Into<String>) -> Self {
        self.inlines.push(Inline::Hyperlink {
            href: href.into(),
            run: Run::new(text),
        });
        self
    }

    pub fn picture(mut self, picture: Picture) -> Self {
        self.inlines.push(Inline::Picture(picture));
        self
    }

    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    pub fn inlines(&self) -> &[Inline] {
        &self.inlines
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocxDocument {
    title: String,
    paragraphs: Vec<Paragraph>,
}

/// Relationship and media bookkeeping while writing `word/document.xml`.
struct BodyWriter {
    rels: Relationships,
    media: Vec<(String, Vec<u8>)>,
    next_drawing_id: u32,
}

impl DocxDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            paragraphs: Vec::new(),
        }
    }

    pub fn push(&mut self, paragraph: Paragraph) {
        self.paragraphs.push(paragraph);
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ExportError> {
        let mut writer = BodyWriter {
            rels: Relationships::new(),
            media: Vec::new(),
            next_drawing_id: 1,
        };
        writer.rels.add(REL_STYLES, "styles.xml");

        let mut body = XmlElement::new("w:body");
        for paragraph in &self.paragraphs {
            body.push(writer.paragraph(paragraph));
        }
        body.push(section_properties());

        let root = XmlElement::new("w:document")
            .attr("xmlns:w", W_NS)
            .attr("xmlns:r", R_NS)
            .attr("xmlns:wp", WP_NS)
            .attr("xmlns:a", A_NS)
            .attr("xmlns:pic", PIC_NS)
            .child(body);

        let mut package = OpcPackage::new(ExportFormat::Docx);
        let root_rels = add_document_properties(
            &mut package,
            DOCUMENT_PART,
            &self.title,
            Vec::<XmlElement>::new(),
        );
        package.set_relationships("", root_rels);
        package.add_part(DOCUMENT_PART, MAIN_CONTENT_TYPE, document(&root));
        package.add_part(STYLES_PART, STYLES_CONTENT_TYPE, styles_xml());
        if !writer.media.is_empty() {
            package.add_default("png", "image/png");
        }
        for (name, bytes) in writer.media {
            package.add_media(name, bytes);
        }
        package.set_relationships(DOCUMENT_PART, writer.rels);
        package.finish()
    }
}

impl BodyWriter {
    fn paragraph(&mut self, paragraph: &Paragraph) -> XmlElement {
        let mut p = XmlElement::new("w:p");
        if paragraph.style.is_some() || paragraph.bottom_border {
            let mut ppr = XmlElement::new("w:pPr");
            if let Some(style) = &paragraph.style {
                ppr.push(XmlElement::new("w:pStyle").attr("w:val", style));
            }
            if paragraph.bottom_border {
                ppr.push(
                    XmlElement::new("w:pBdr").child(
                        XmlElement::new("w:bottom")
                            .attr("w:val", "single")
                            .attr("w:sz", 6)
                            .attr("w:space", 1)
                            .attr("w:color", "auto"),
                    ),
                );
            }
            p.push(ppr);
        }

        for inline in &paragraph.inlines {
            match inline {
                Inline::Text(run) => p.push(text_run(run, None)),
                Inline::Hyperlink { href, run } => {
                    let id = self.rels.add_external(REL_HYPERLINK, href.as_str());
                    p.push(
                        XmlElement::new("w:hyperlink")
                            .attr("r:id", id)
                            .child(text_run(run, Some(LINK_COLOR))),
                    );
                }
                Inline::Picture(picture) => {
                    let index = self.media.len() + 1;
                    let target = format!("media/image{index}.png");
                    let id = self.rels.add(REL_IMAGE, target.as_str());
                    self.media
                        .push((format!("word/{target}"), picture.png.clone()));
                    let drawing_id = self.next_drawing_id;
                    self.next_drawing_id += 1;
                    p.push(
                        XmlElement::new("w:r")
                            .child(drawing(picture, &id, drawing_id)),
                    );
                }
            }
        }
        p
    }
}

fn text_run(run: &Run, link_color: Option<&str>) -> XmlElement {
    let mut rpr = XmlElement::new("w:rPr");
    let mut has_props = false;
    if run.bold {
        rpr.push(XmlElement::new("w:b"));
        has_props = true;
    }
    if run.italic {
        rpr.push(XmlElement::new("w:i"));
        has_props = true;
    }
    if let Some(color) = link_color {
        rpr.push(XmlElement::new("w:color").attr("w:val", color));
        rpr.push(XmlElement::new("w:u").attr("w:val", "single"));
        has_props = true;
    }

    let mut r = XmlElement::new("w:r");
    if has_props {
        r.push(rpr);
    }
    r.child(
        XmlElement::new("w:t")
            .attr("xml:space", "preserve")
            .text(run.text.as_str()),
    )
}

fn drawing(picture: &Picture, rel_id: &str, drawing_id: u32) -> XmlElement {
    let extent = |name: &str| {
        XmlElement::new(name)
            .attr("cx", picture.width_emu)
            .attr("cy", picture.height_emu)
    };
    let name = format!("Picture {drawing_id}");

    let pic = XmlElement::new("pic:pic")
        .child(
            XmlElement::new("pic:nvPicPr")
                .child(
                    XmlElement::new("pic:cNvPr")
                        .attr("id", 0)
                        .attr("name", &name)
                        .attr("descr", &picture.description),
                )
                .child(XmlElement::new("pic:cNvPicPr")),
        )
        .child(
            XmlElement::new("pic:blipFill")
                .child(XmlElement::new("a:blip").attr("r:embed", rel_id))
                .child(XmlElement::new("a:stretch").child(XmlElement::new("a:fillRect"))),
        )
        .child(
            XmlElement::new("pic:spPr")
                .child(
                    XmlElement::new("a:xfrm")
                        .child(XmlElement::new("a:off").attr("x", 0).attr("y", 0))
                        .child(extent("a:ext")),
                )
                .child(
                    XmlElement::new("a:prstGeom")
                        .attr("prst", "rect")
                        .child(XmlElement::new("a:avLst")),
                ),
        );

    XmlElement::new("w:drawing").child(
        XmlElement::new("wp:inline")
            .attr("distT", 0)
            .attr("distB", 0)
            .attr("distL", 0)
            .attr("distR", 0)
            .child(extent("wp:extent"))
            .child(
                XmlElement::new("wp:effectExtent")
                    .attr("l", 0)
                    .attr("t", 0)
                    .attr("r", 0)
                    .attr("b", 0),
            )
            .child(
                XmlElement::new("wp:docPr")
                    .attr("id", drawing_id)
                    .attr("name", &name)
                    .attr("descr", &picture.description),
            )
            .child(
                XmlElement::new("wp:cNvGraphicFramePr").child(
                    XmlElement::new("a:graphicFrameLocks").attr("noChangeAspect", 1),
                ),
            )
            .child(
                XmlElement::new("a:graphic").child(
                    XmlElement::new("a:graphicData")
                        .attr("uri", PIC_NS)
                        .child(pic),
                ),
            ),
    )
}

/// A4 portrait with one-inch margins, in twentieths of a point.
fn section_properties() -> XmlElement {
    XmlElement::new("w:sectPr")
        .child(
            XmlElement::new("w:pgSz")
                .attr("w:w", 11906)
                .attr("w:h", 16838),
        )
        .child(
            XmlElement::new("w:pgMar")
                .attr("w:top", 1440)
                .attr("w:right", 1440)
                .attr("w:bottom", 1440)
                .attr("w:left", 1440)
                .attr("w:header", 720)
                .attr("w:footer", 720)
                .attr("w:gutter", 0),
        )
}

fn styles_xml() -> Vec<u8> {
    let fonts = || {
        XmlElement::new("w:rFonts")
            .attr("w:ascii", FONT)
            .attr("w:hAnsi", FONT)
            .attr("w:cs", FONT)
    };

    let defaults = XmlElement::new("w:docDefaults")
        .child(
            XmlElement::new("w:rPrDefault").child(
                XmlElement::new("w:rPr")
                    .child(fonts())
                    .child(XmlElement::new("w:sz").attr("w:val", 22)),
            ),
        )
        .child(
            XmlElement::new("w:pPrDefault").child(
                XmlElement::new("w:pPr").child(
                    XmlElement::new("w:spacing")
                        .attr("w:after", 160)
                        .attr("w:line", 259)
                        .attr("w:lineRule", "auto"),
                ),
            ),
        );

    let normal = XmlElement::new("w:style")
        .attr("w:type", "paragraph")
        .attr("w:default", 1)
        .attr("w:styleId", "Normal")
        .child(XmlElement::new("w:name").attr("w:val", "Normal"))
        .child(XmlElement::new("w:qFormat"));

    let headings = HEADING_SIZES.iter().enumerate().map(|(index, size)| {
        let level = index + 1;
        XmlElement::new("w:style")
            .attr("w:type", "paragraph")
            .attr("w:styleId", format!("Heading{level}"))
            .child(XmlElement::new("w:name").attr("w:val", format!("heading {level}")))
            .child(XmlElement::new("w:basedOn").attr("w:val", "Normal"))
            .child(XmlElement::new("w:next").attr("w:val", "Normal"))
            .child(XmlElement::new("w:qFormat"))
            .child(
                XmlElement::new("w:pPr")
                    .child(XmlElement::new("w:keepNext"))
                    .child(
                        XmlElement::new("w:spacing")
                            .attr("w:before", 240)
                            .attr("w:after", 120),
                    )
                    .child(XmlElement::new("w:outlineLvl").attr("w:val", index)),
            )
            .child(
                XmlElement::new("w:rPr")
                    .child(XmlElement::new("w:b"))
                    .child(XmlElement::new("w:sz").attr("w:val", size)),
            )
    });

    let root = XmlElement::new("w:styles")
        .attr("xmlns:w", W_NS)
        .child(defaults)
        .child(normal)
        .children(headings);
    document(&root)
}
