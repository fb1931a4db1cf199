use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::fonts::{FontStyle, ALL_STYLES};

pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const fn from_hex(hex: u32) -> Self {
        Rgb(
            ((hex >> 16) & 0xFF) as f32 / 255.0,
            ((hex >> 8) & 0xFF) as f32 / 255.0,
            (hex & 0xFF) as f32 / 255.0,
        )
    }

    fn operands(self) -> Vec<Object> {
        vec![self.0.into(), self.1.into(), self.2.into()]
    }
}

#[derive(Default)]
struct PageBuilder {
    operations: Vec<Operation>,
    annotations: Vec<ObjectId>,
    xobjects: Dictionary,
}

/// Page-oriented drawing surface over a `lopdf` document. Coordinates are PDF
/// user space: origin bottom left, points.
pub struct PdfCanvas {
    doc: Document,
    pages_id: ObjectId,
    fonts_id: ObjectId,
    pages: Vec<ObjectId>,
    current: PageBuilder,
    image_count: usize,
}

impl PdfCanvas {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for style in ALL_STYLES {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => style.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(style.resource_name(), font_id);
        }
        let fonts_id = doc.add_object(fonts);

        Self {
            doc,
            pages_id,
            fonts_id,
            pages: Vec::new(),
            current: PageBuilder::default(),
            image_count: 0,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len() + 1
    }

    pub fn text(
        &mut self,
        x: f32,
        baseline: f32,
        style: FontStyle,
        size: f32,
        color: Rgb,
        text: &[u8],
    ) {
        let ops = &mut self.current.operations;
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("rg", color.operands()));
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(style.resource_name().as_bytes().to_vec()), size.into()],
        ));
        ops.push(Operation::new("Td", vec![x.into(), baseline.into()]));
        ops.push(Operation::new("Tj", vec![Object::string_literal(text.to_vec())]));
        ops.push(Operation::new("ET", vec![]));
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgb) {
        let ops = &mut self.current.operations;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("RG", color.operands()));
        ops.push(Operation::new("w", vec![width.into()]));
        ops.push(Operation::new("m", vec![from.0.into(), from.1.into()]));
        ops.push(Operation::new("l", vec![to.0.into(), to.1.into()]));
        ops.push(Operation::new("S", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    /// Clickable `/URI` area. `rect` is `[x1, y1, x2, y2]`.
    pub fn link(&mut self, rect: [f32; 4], href: &str) {
        let annotation = self.doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => rect.iter().map(|&v| Object::from(v)).collect::<Vec<_>>(),
            "Border" => vec![0.into(), 0.into(), 0.into()],
            "A" => dictionary! {
                "S" => "URI",
                "URI" => Object::string_literal(href.as_bytes().to_vec()),
            },
        });
        self.current.annotations.push(annotation);
    }

    /// Draw `image` with its lower left corner at `(x, y)`, scaled to `width` x `height`.
    pub fn image(&mut self, image: RgbImage, x: f32, y: f32, width: f32, height: f32) {
        let (px_width, px_height) = image.dimensions();
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(px_width),
                "Height" => i64::from(px_height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            image.into_raw(),
        );
        let image_id = self.doc.add_object(stream);
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);
        self.current.xobjects.set(name.as_bytes().to_vec(), image_id);

        let ops = &mut self.current.operations;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![
                width.into(),
                0.into(),
                0.into(),
                height.into(),
                x.into(),
                y.into(),
            ],
        ));
        ops.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
        ops.push(Operation::new("Q", vec![]));
    }

    pub fn new_page(&mut self) -> Result<(), lopdf::Error> {
        let page = std::mem::take(&mut self.current);
        let content = Content {
            operations: page.operations,
        };
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.encode()?));

        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => self.fonts_id,
                "XObject" => page.xobjects,
            },
        };
        if !page.annotations.is_empty() {
            page_dict.set(
                "Annots",
                page.annotations
                    .into_iter()
                    .map(Object::Reference)
                    .collect::<Vec<_>>(),
            );
        }
        let page_id = self.doc.add_object(page_dict);
        self.pages.push(page_id);
        Ok(())
    }

    /// Close the last page and serialize with compressed streams.
    pub fn finish(mut self, title: &str) -> Result<Vec<u8>, lopdf::Error> {
        self.new_page()?;

        let count = self.pages.len() as i64;
        let kids: Vec<Object> = self.pages.iter().copied().map(Object::Reference).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Title" => Object::string_literal(text_string(title)),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);
        self.doc.compress();

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

/// PDF text string: plain bytes for ASCII, otherwise UTF-16BE behind a BOM.
fn text_string(text: &str) -> Vec<u8> {
    if text.is_ascii() {
        return text.as_bytes().to_vec();
    }
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}
