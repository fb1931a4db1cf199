//! Paginated A4 rendering of content blocks.

mod canvas;
mod fonts;
mod layout;

use engine_logging::{engine_debug, engine_info, engine_warn};
use image::{DynamicImage, RgbImage};

use crate::error::ExportError;
use crate::types::{segments_text, ContentBlock, ExportFormat, ResolvedImages, Segment};

use canvas::{PdfCanvas, Rgb, PAGE_HEIGHT, PAGE_WIDTH};
use fonts::FontStyle;
use layout::{wrap, InlineRun};

const MARGIN_TOP: f32 = 50.0;
const MARGIN_RIGHT: f32 = 60.0;
const MARGIN_BOTTOM: f32 = 50.0;
const MARGIN_LEFT: f32 = 60.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;

const TITLE_SIZE: f32 = 24.0;
const BODY_SIZE: f32 = 11.0;
const LIST_INDENT: f32 = 12.0;
const IMAGE_MAX_WIDTH: f32 = 475.0;
const IMAGE_MAX_HEIGHT: f32 = 300.0;

const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
const LINK_COLOR: Rgb = Rgb::from_hex(0x1155CC);
const RULE_COLOR: Rgb = Rgb::from_hex(0x999999);

/// Font size and space before, by heading level.
fn heading_metrics(level: u8) -> (f32, f32) {
    match level {
        1 => (20.0, 10.0),
        2 => (17.0, 8.0),
        3 => (14.0, 6.0),
        _ => (12.0, 4.0),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn render(
        &self,
        title: &str,
        blocks: &[ContentBlock],
        images: &ResolvedImages,
    ) -> Result<Vec<u8>, ExportError> {
        let mut writer = PageWriter::new();
        writer
            .write_document(title, blocks, images)
            .map_err(|err| ExportError::render(ExportFormat::Pdf, err))?;
        let pages = writer.canvas.page_count();
        let bytes = writer
            .canvas
            .finish(title)
            .map_err(|err| ExportError::render(ExportFormat::Pdf, err))?;
        engine_info!(
            "Rendered PDF with {} blocks on {} pages ({} bytes)",
            blocks.len(),
            pages,
            bytes.len()
        );
        Ok(bytes)
    }
}

/// Tracks the vertical cursor, measured downward from the top edge.
struct PageWriter {
    canvas: PdfCanvas,
    y: f32,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            canvas: PdfCanvas::new(),
            y: MARGIN_TOP,
        }
    }

    fn write_document(
        &mut self,
        title: &str,
        blocks: &[ContentBlock],
        images: &ResolvedImages,
    ) -> Result<(), lopdf::Error> {
        let title_run = [InlineRun::new(title, FontStyle::Bold)];
        self.flow(&title_run, TITLE_SIZE, 6.0, MARGIN_LEFT, CONTENT_WIDTH)?;
        self.y += 12.0;

        for block in blocks {
            match block {
                ContentBlock::Heading { level, text } => {
                    let (size, space_before) = heading_metrics(*level);
                    self.y += space_before;
                    let runs = [InlineRun::new(text.as_str(), FontStyle::Bold)];
                    self.flow(&runs, size, 4.0, MARGIN_LEFT, CONTENT_WIDTH)?;
                    self.y += 4.0;
                }
                ContentBlock::Paragraph { segments } => {
                    if segments_text(segments).trim().is_empty() {
                        continue;
                    }
                    self.flow(&runs_for(segments), BODY_SIZE, 4.0, MARGIN_LEFT, CONTENT_WIDTH)?;
                    self.y += 8.0;
                }
                ContentBlock::ListItem { segments } => {
                    let mut runs = vec![InlineRun::new("\u{2022} ", FontStyle::Regular)];
                    runs.extend(runs_for(segments));
                    self.flow(
                        &runs,
                        BODY_SIZE,
                        4.0,
                        MARGIN_LEFT + LIST_INDENT,
                        CONTENT_WIDTH - LIST_INDENT,
                    )?;
                    self.y += 4.0;
                }
                ContentBlock::Image { src } => self.image(src, images)?,
                ContentBlock::HorizontalRule => {
                    self.y += 6.0;
                    self.ensure(1.0)?;
                    let y = PAGE_HEIGHT - self.y;
                    self.canvas.line(
                        (MARGIN_LEFT, y),
                        (PAGE_WIDTH - MARGIN_RIGHT, y),
                        1.0,
                        RULE_COLOR,
                    );
                    self.y += 10.0;
                }
            }
        }
        Ok(())
    }

    /// Start a new page when `height` more points do not fit.
    fn ensure(&mut self, height: f32) -> Result<(), lopdf::Error> {
        if self.y > MARGIN_TOP && self.y + height > PAGE_HEIGHT - MARGIN_BOTTOM {
            self.canvas.new_page()?;
            self.y = MARGIN_TOP;
        }
        Ok(())
    }

    fn flow(
        &mut self,
        runs: &[InlineRun],
        size: f32,
        leading: f32,
        left: f32,
        width: f32,
    ) -> Result<(), lopdf::Error> {
        let line_height = size + leading;
        for line in wrap(runs, size, width) {
            self.ensure(line_height)?;
            let baseline = PAGE_HEIGHT - self.y - size;
            let mut x = left;
            for fragment in &line.fragments {
                match &fragment.href {
                    Some(href) => {
                        self.canvas
                            .text(x, baseline, fragment.style, size, LINK_COLOR, &fragment.bytes);
                        let underline_y = baseline - 1.5;
                        self.canvas.line(
                            (x, underline_y),
                            (x + fragment.width, underline_y),
                            0.5,
                            LINK_COLOR,
                        );
                        self.canvas
                            .link([x, baseline - 2.0, x + fragment.width, baseline + size], href);
                    }
                    None => {
                        self.canvas
                            .text(x, baseline, fragment.style, size, BLACK, &fragment.bytes);
                    }
                }
                x += fragment.width;
            }
            self.y += line_height;
        }
        Ok(())
    }

    fn image(&mut self, src: &str, images: &ResolvedImages) -> Result<(), lopdf::Error> {
        let Some(bytes) = images.get(src) else {
            engine_debug!("No image data for {}, skipping", src);
            return Ok(());
        };
        let decoded = match image::load_from_memory(bytes) {
            Ok(decoded) => decoded,
            Err(err) => {
                engine_warn!("Could not decode image {}: {}", src, err);
                return Ok(());
            }
        };

        let (width, height) = fit_within(
            decoded.width() as f32,
            decoded.height() as f32,
            IMAGE_MAX_WIDTH,
            IMAGE_MAX_HEIGHT,
        );
        if width <= 0.0 || height <= 0.0 {
            return Ok(());
        }
        self.ensure(height)?;
        let x = MARGIN_LEFT + (CONTENT_WIDTH - width) / 2.0;
        let y = PAGE_HEIGHT - self.y - height;
        self.canvas
            .image(flatten_onto_white(decoded), x, y, width, height);
        self.y += height + 8.0;
        Ok(())
    }
}

fn runs_for(segments: &[Segment]) -> Vec<InlineRun> {
    segments
        .iter()
        .map(|segment| InlineRun {
            text: segment.text.clone(),
            style: FontStyle::from_flags(segment.bold, segment.italic),
            href: segment.href.clone(),
        })
        .collect()
}

/// Scale down to fit the box, preserving aspect ratio. Never scales up.
pub fn fit_within(width: f32, height: f32, max_width: f32, max_height: f32) -> (f32, f32) {
    if width <= 0.0 || height <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (max_width / width).min(max_height / height).min(1.0);
    (width * scale, height * scale)
}

fn flatten_onto_white(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.into_rgb8();
    }
    let rgba = image.into_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (source, target) in rgba.pixels().zip(rgb.pixels_mut()) {
        let alpha = u32::from(source[3]);
        for channel in 0..3 {
            let value = u32::from(source[channel]);
            target[channel] = ((value * alpha + 255 * (255 - alpha)) / 255) as u8;
        }
    }
    rgb
}
