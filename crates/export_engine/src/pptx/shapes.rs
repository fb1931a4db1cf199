use crate::types::{Slide, SlideKind};
use crate::xml::XmlElement;

/// Slide canvas in EMU, 16:9.
pub const SLIDE_WIDTH: u64 = 9_144_000;
pub const SLIDE_HEIGHT: u64 = 5_143_500;

pub const BG: &str = "0F172A";
pub const ACCENT: &str = "10B981";
pub const WHITE: &str = "FFFFFF";
pub const LIGHT: &str = "E2E8F0";
pub const MUTED: &str = "64748B";
pub const BORDER: &str = "334155";
pub const FONT: &str = "Calibri";

const MARGIN_X: u64 = 457_200;
const TEXT_WIDTH: u64 = 8_229_600;
const BULLETS_WIDTH: u64 = 5_100_000;
const CONTENT_Y: u64 = 800_000;
const CONTENT_BOTTOM_GAP: u64 = 150_000;
const PLACEHOLDER_GAP: u64 = 228_600;
const PLACEHOLDER_RIGHT_GAP: u64 = 200_000;

pub const PLACEHOLDER_TEXT: &str = "[ Add Image Here ]";
pub const EMPTY_SECTION_TEXT: &str = "No content";
pub const SUBTITLE_TEXT: &str = "Presentation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub x: u64,
    pub y: u64,
    pub cx: u64,
    pub cy: u64,
}

impl Frame {
    pub const fn new(x: u64, y: u64, cx: u64, cy: u64) -> Self {
        Self { x, y, cx, cy }
    }

    fn xfrm(self) -> XmlElement {
        XmlElement::new("a:xfrm")
            .child(XmlElement::new("a:off").attr("x", self.x).attr("y", self.y))
            .child(XmlElement::new("a:ext").attr("cx", self.cx).attr("cy", self.cy))
    }
}

/// Text run settings shared by titles, bullets and placeholder captions.
#[derive(Debug, Clone, Copy)]
struct TextStyle<'a> {
    size: u32,
    bold: bool,
    color: &'a str,
}

fn solid_fill(color: &str) -> XmlElement {
    XmlElement::new("a:solidFill").child(XmlElement::new("a:srgbClr").attr("val", color))
}

fn no_line() -> XmlElement {
    XmlElement::new("a:ln").child(XmlElement::new("a:noFill"))
}

fn rect_geometry() -> XmlElement {
    XmlElement::new("a:prstGeom")
        .attr("prst", "rect")
        .child(XmlElement::new("a:avLst"))
}

fn non_visual(id: u32, name: &str) -> XmlElement {
    XmlElement::new("p:nvSpPr")
        .child(XmlElement::new("p:cNvPr").attr("id", id).attr("name", name))
        .child(
            XmlElement::new("p:cNvSpPr").child(XmlElement::new("a:spLocks").attr("noGrp", 1)),
        )
        .child(XmlElement::new("p:nvPr"))
}

fn run(text: &str, style: TextStyle<'_>) -> XmlElement {
    let mut rpr = XmlElement::new("a:rPr")
        .attr("lang", "en-US")
        .attr("sz", style.size);
    if style.bold {
        rpr = rpr.attr("b", 1);
    }
    XmlElement::new("a:r")
        .child(
            rpr.attr("dirty", 0)
                .child(solid_fill(style.color))
                .child(XmlElement::new("a:latin").attr("typeface", FONT)),
        )
        .child(XmlElement::with_text("a:t", text))
}

fn text_body(anchor: &str, paragraphs: impl IntoIterator<Item = XmlElement>) -> XmlElement {
    XmlElement::new("p:txBody")
        .child(
            XmlElement::new("a:bodyPr")
                .attr("wrap", "square")
                .attr("rtlCol", 0)
                .attr("anchor", anchor),
        )
        .child(XmlElement::new("a:lstStyle"))
        .children(paragraphs)
}

/// Group properties every `p:spTree` starts with.
pub fn group_header() -> [XmlElement; 2] {
    let zero_xfrm = XmlElement::new("a:xfrm")
        .child(XmlElement::new("a:off").attr("x", 0).attr("y", 0))
        .child(XmlElement::new("a:ext").attr("cx", 0).attr("cy", 0))
        .child(XmlElement::new("a:chOff").attr("x", 0).attr("y", 0))
        .child(XmlElement::new("a:chExt").attr("cx", 0).attr("cy", 0));
    [
        XmlElement::new("p:nvGrpSpPr")
            .child(XmlElement::new("p:cNvPr").attr("id", 1).attr("name", ""))
            .child(XmlElement::new("p:cNvGrpSpPr"))
            .child(XmlElement::new("p:nvPr")),
        XmlElement::new("p:grpSpPr").child(zero_xfrm),
    ]
}

pub fn rect_shape(id: u32, name: &str, frame: Frame, fill: &str) -> XmlElement {
    XmlElement::new("p:sp")
        .child(non_visual(id, name))
        .child(
            XmlElement::new("p:spPr")
                .child(frame.xfrm())
                .child(rect_geometry())
                .child(solid_fill(fill))
                .child(no_line()),
        )
        .child(
            XmlElement::new("p:txBody")
                .child(XmlElement::new("a:bodyPr"))
                .child(XmlElement::new("a:lstStyle"))
                .child(XmlElement::new("a:p")),
        )
}

fn text_shape(
    id: u32,
    name: &str,
    frame: Frame,
    text: &str,
    style: TextStyle<'_>,
    align: &str,
    anchor: &str,
) -> XmlElement {
    let paragraph = XmlElement::new("a:p")
        .child(XmlElement::new("a:pPr").attr("algn", align))
        .child(run(text, style));
    XmlElement::new("p:sp")
        .child(non_visual(id, name))
        .child(
            XmlElement::new("p:spPr")
                .child(frame.xfrm())
                .child(rect_geometry())
                .child(XmlElement::new("a:noFill"))
                .child(no_line()),
        )
        .child(text_body(anchor, [paragraph]))
}

fn bullet_paragraph(text: &str) -> XmlElement {
    XmlElement::new("a:p")
        .child(
            XmlElement::new("a:pPr")
                .attr("marL", 342_900)
                .attr("indent", -342_900)
                .child(XmlElement::new("a:buChar").attr("char", "\u{2022}")),
        )
        .child(run(
            text,
            TextStyle {
                size: 1800,
                bold: false,
                color: LIGHT,
            },
        ))
}

fn muted_paragraph(text: &str) -> XmlElement {
    XmlElement::new("a:p")
        .child(XmlElement::new("a:pPr").child(XmlElement::new("a:buNone")))
        .child(run(
            text,
            TextStyle {
                size: 1800,
                bold: false,
                color: MUTED,
            },
        ))
}

fn bullets_shape(id: u32, frame: Frame, bullets: &[String]) -> XmlElement {
    let paragraphs: Vec<XmlElement> = if bullets.is_empty() {
        vec![muted_paragraph(EMPTY_SECTION_TEXT)]
    } else {
        bullets.iter().map(|bullet| bullet_paragraph(bullet)).collect()
    };
    XmlElement::new("p:sp")
        .child(non_visual(id, "BulletContent"))
        .child(
            XmlElement::new("p:spPr")
                .child(frame.xfrm())
                .child(rect_geometry())
                .child(XmlElement::new("a:noFill"))
                .child(no_line()),
        )
        .child(text_body("t", paragraphs))
}

fn placeholder_shape(id: u32, frame: Frame) -> XmlElement {
    let border = XmlElement::new("a:ln")
        .attr("w", 19_050)
        .attr("cmpd", "sng")
        .child(solid_fill(BORDER))
        .child(XmlElement::new("a:prstDash").attr("val", "dash"));
    let caption = XmlElement::new("a:p")
        .child(XmlElement::new("a:pPr").attr("algn", "ctr"))
        .child(run(
            PLACEHOLDER_TEXT,
            TextStyle {
                size: 1400,
                bold: false,
                color: BORDER,
            },
        ));
    XmlElement::new("p:sp")
        .child(non_visual(id, "ImagePlaceholder"))
        .child(
            XmlElement::new("p:spPr")
                .child(frame.xfrm())
                .child(rect_geometry())
                .child(XmlElement::new("a:noFill"))
                .child(border),
        )
        .child(text_body("ctr", [caption]))
}

fn title_slide_shapes(title: &str) -> Vec<XmlElement> {
    vec![
        rect_shape(2, "LeftStripe", Frame::new(0, 0, 55_000, SLIDE_HEIGHT), ACCENT),
        rect_shape(
            3,
            "BottomBar",
            Frame::new(0, SLIDE_HEIGHT - 100_000, SLIDE_WIDTH, 100_000),
            ACCENT,
        ),
        text_shape(
            4,
            "Title",
            Frame::new(MARGIN_X, 1_371_600, TEXT_WIDTH, 1_800_000),
            title,
            TextStyle {
                size: 4400,
                bold: true,
                color: WHITE,
            },
            "ctr",
            "ctr",
        ),
        text_shape(
            5,
            "Subtitle",
            Frame::new(MARGIN_X, 3_300_000, TEXT_WIDTH, 400_000),
            SUBTITLE_TEXT,
            TextStyle {
                size: 2000,
                bold: false,
                color: MUTED,
            },
            "ctr",
            "ctr",
        ),
    ]
}

/// Bullet column and image placeholder frames of a content slide.
pub fn content_frames() -> (Frame, Frame) {
    let content_cy = SLIDE_HEIGHT - CONTENT_Y - CONTENT_BOTTOM_GAP;
    let image_x = MARGIN_X + BULLETS_WIDTH + PLACEHOLDER_GAP;
    (
        Frame::new(MARGIN_X, CONTENT_Y, BULLETS_WIDTH, content_cy),
        Frame::new(
            image_x,
            CONTENT_Y,
            SLIDE_WIDTH - image_x - PLACEHOLDER_RIGHT_GAP,
            content_cy,
        ),
    )
}

fn content_slide_shapes(title: &str, bullets: &[String]) -> Vec<XmlElement> {
    let (bullet_frame, image_frame) = content_frames();
    vec![
        rect_shape(2, "TopBar", Frame::new(0, 0, SLIDE_WIDTH, 28_000), ACCENT),
        text_shape(
            3,
            "SectionTitle",
            Frame::new(MARGIN_X, 80_000, TEXT_WIDTH, 571_500),
            title,
            TextStyle {
                size: 2800,
                bold: true,
                color: WHITE,
            },
            "l",
            "ctr",
        ),
        rect_shape(4, "Divider", Frame::new(MARGIN_X, 690_000, TEXT_WIDTH, 9_525), ACCENT),
        bullets_shape(5, bullet_frame, bullets),
        placeholder_shape(6, image_frame),
    ]
}

pub fn slide_shapes(slide: &Slide) -> Vec<XmlElement> {
    match slide.kind {
        SlideKind::Title => title_slide_shapes(&slide.title),
        SlideKind::Content => content_slide_shapes(&slide.title, &slide.bullets),
    }
}
