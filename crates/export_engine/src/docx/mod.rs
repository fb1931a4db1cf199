mod builder;

use std::io::Cursor;

use engine_logging::{engine_debug, engine_info, engine_warn};
use image::ImageFormat;

use crate::error::ExportError;
use crate::types::{segments_with_urls, ContentBlock, ResolvedImages, Segment};

pub use builder::{DocxDocument, Inline, Paragraph, Picture, Run, DOCUMENT_PART, LINK_COLOR};

const EMU_PER_PIXEL: u64 = 9525;
const EMU_PER_INCH: u64 = 914_400;
const MAX_WIDTH_EMU: u64 = 6 * EMU_PER_INCH;
const MAX_HEIGHT_EMU: u64 = 4 * EMU_PER_INCH;
const LIST_PREFIX: &str = "\u{2022} ";

#[derive(Debug, Default, Clone, Copy)]
pub struct DocxRenderer;

impl DocxRenderer {
    pub fn render(
        &self,
        title: &str,
        blocks: &[ContentBlock],
        images: &ResolvedImages,
    ) -> Result<Vec<u8>, ExportError> {
        let document = self.build(title, blocks, images);
        let bytes = document.to_bytes()?;
        engine_info!(
            "Rendered DOCX with {} paragraphs ({} bytes)",
            document.paragraphs().len(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Document model for `blocks`, before packaging.
    pub fn build(
        &self,
        title: &str,
        blocks: &[ContentBlock],
        images: &ResolvedImages,
    ) -> DocxDocument {
        let mut document = DocxDocument::new(title);
        document.push(Paragraph::heading(1, title));
        document.push(Paragraph::new());

        for block in blocks {
            match block {
                ContentBlock::Heading { level, text } => {
                    document.push(Paragraph::heading(*level, text.as_str()))
                }
                ContentBlock::Paragraph { segments } => {
                    document.push(inline_paragraph(segments, None));
                }
                ContentBlock::ListItem { segments } => {
                    document.push(inline_paragraph(segments, Some(LIST_PREFIX)));
                }
                ContentBlock::Image { src } => match picture_for(src, images) {
                    Some(picture) => document.push(Paragraph::new().picture(picture)),
                    None => engine_debug!("Image {} omitted from DOCX", src),
                },
                ContentBlock::HorizontalRule => document.push(Paragraph::rule()),
            }
        }
        document
    }
}

/// Mixed runs when the block carries links; otherwise one plain run with
/// link targets spelled out.
fn inline_paragraph(segments: &[Segment], prefix: Option<&str>) -> Paragraph {
    let has_links = segments.iter().any(Segment::is_link);
    if !has_links {
        let text = format!("{}{}", prefix.unwrap_or(""), segments_with_urls(segments));
        return Paragraph::new().run(Run::new(text));
    }

    let mut paragraph = Paragraph::new();
    if let Some(prefix) = prefix {
        paragraph = paragraph.run(Run::new(prefix));
    }
    for segment in segments {
        paragraph = match &segment.href {
            Some(href) => paragraph.hyperlink(href.as_str(), segment.text.as_str()),
            None => paragraph.run(Run::styled(
                segment.text.as_str(),
                segment.bold,
                segment.italic,
            )),
        };
    }
    paragraph
}

fn picture_for(src: &str, images: &ResolvedImages) -> Option<Picture> {
    let bytes = images.get(src)?;
    let decoded = match image::load_from_memory(bytes) {
        Ok(decoded) => decoded,
        Err(err) => {
            engine_warn!("Could not decode image {}: {}", src, err);
            return None;
        }
    };

    let mut png = Cursor::new(Vec::new());
    if let Err(err) = decoded.write_to(&mut png, ImageFormat::Png) {
        engine_warn!("Could not re-encode image {} as PNG: {}", src, err);
        return None;
    }

    let (width_emu, height_emu) = fit_emu(
        u64::from(decoded.width()) * EMU_PER_PIXEL,
        u64::from(decoded.height()) * EMU_PER_PIXEL,
    );
    Some(Picture {
        png: png.into_inner(),
        width_emu,
        height_emu,
        description: src.to_string(),
    })
}

/// Fit into 6 x 4 inches keeping the aspect ratio. Never scales up.
fn fit_emu(width: u64, height: u64) -> (u64, u64) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    if width <= MAX_WIDTH_EMU && height <= MAX_HEIGHT_EMU {
        return (width, height);
    }
    // Compare width/MAX_W against height/MAX_H without floating point.
    if width * MAX_HEIGHT_EMU >= height * MAX_WIDTH_EMU {
        (MAX_WIDTH_EMU, (height * MAX_WIDTH_EMU / width).max(1))
    } else {
        ((width * MAX_HEIGHT_EMU / height).max(1), MAX_HEIGHT_EMU)
    }
}
