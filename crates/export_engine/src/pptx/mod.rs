mod parts;
mod shapes;

use engine_logging::{engine_debug, engine_info};

use crate::error::ExportError;
use crate::package::{add_document_properties, OpcPackage, Relationships};
use crate::types::{ExportFormat, Slide};
use crate::xml::XmlElement;

pub use shapes::{
    ACCENT, BG, BORDER, EMPTY_SECTION_TEXT, LIGHT, MUTED, PLACEHOLDER_TEXT, SLIDE_HEIGHT,
    SLIDE_WIDTH, SUBTITLE_TEXT, WHITE,
};

pub const PRESENTATION_PART: &str = "ppt/presentation.xml";
const THEME_PART: &str = "ppt/theme/theme1.xml";
const MASTER_PART: &str = "ppt/slideMasters/slideMaster1.xml";
const LAYOUT_PART: &str = "ppt/slideLayouts/slideLayout1.xml";

const PRESENTATION_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
const MASTER_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
const LAYOUT_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
const SLIDE_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const THEME_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.theme+xml";

const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

fn rel_type(kind: &str) -> String {
    format!("{REL_BASE}/{kind}")
}

/// First slide id; slide `n` (1-based) gets `FIRST_SLIDE_ID + n - 1`.
pub const FIRST_SLIDE_ID: u32 = 256;

pub fn slide_part(number: usize) -> String {
    format!("ppt/slides/slide{number}.xml")
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PptxBuilder;

impl PptxBuilder {
    pub fn build(&self, title: &str, slides: &[Slide]) -> Result<Vec<u8>, ExportError> {
        let mut package = OpcPackage::new(ExportFormat::Pptx);

        let app_stats = [XmlElement::with_text("Slides", slides.len().to_string())];
        let root_rels =
            add_document_properties(&mut package, PRESENTATION_PART, title, app_stats);
        package.set_relationships("", root_rels);

        package.add_part(THEME_PART, THEME_CONTENT_TYPE, parts::theme_xml());

        let mut master_rels = Relationships::new();
        master_rels.add(&rel_type("theme"), "../theme/theme1.xml");
        let layout_rel =
            master_rels.add(&rel_type("slideLayout"), "../slideLayouts/slideLayout1.xml");
        package.add_part(
            MASTER_PART,
            MASTER_CONTENT_TYPE,
            parts::slide_master_xml(&layout_rel),
        );
        package.set_relationships(MASTER_PART, master_rels);

        let mut layout_rels = Relationships::new();
        layout_rels.add(&rel_type("slideMaster"), "../slideMasters/slideMaster1.xml");
        package.add_part(LAYOUT_PART, LAYOUT_CONTENT_TYPE, parts::slide_layout_xml());
        package.set_relationships(LAYOUT_PART, layout_rels);

        let mut presentation_rels = Relationships::new();
        let master_rel =
            presentation_rels.add(&rel_type("slideMaster"), "slideMasters/slideMaster1.xml");
        let mut slide_ids = Vec::with_capacity(slides.len());
        for (index, _) in slides.iter().enumerate() {
            let number = index + 1;
            let rel_id =
                presentation_rels.add(&rel_type("slide"), format!("slides/slide{number}.xml"));
            slide_ids.push((FIRST_SLIDE_ID + index as u32, rel_id));
        }
        package.add_part(
            PRESENTATION_PART,
            PRESENTATION_CONTENT_TYPE,
            parts::presentation_xml(&master_rel, &slide_ids),
        );
        package.set_relationships(PRESENTATION_PART, presentation_rels);

        for (index, slide) in slides.iter().enumerate() {
            let part = slide_part(index + 1);
            package.add_part(
                part.as_str(),
                SLIDE_CONTENT_TYPE,
                parts::slide_xml(shapes::slide_shapes(slide)),
            );
            let mut slide_rels = Relationships::new();
            slide_rels.add(&rel_type("slideLayout"), "../slideLayouts/slideLayout1.xml");
            package.set_relationships(part, slide_rels);
            engine_debug!(
                "Slide {} {:?} with {} bullets",
                index + 1,
                slide.title,
                slide.bullets.len()
            );
        }

        let bytes = package.finish()?;
        engine_info!("Built PPTX with {} slides ({} bytes)", slides.len(), bytes.len());
        Ok(bytes)
    }
}
