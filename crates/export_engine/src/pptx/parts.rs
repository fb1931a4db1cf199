use crate::xml::{document, XmlElement};

use super::shapes::{
    group_header, ACCENT, BG, BORDER, FONT, LIGHT, SLIDE_HEIGHT, SLIDE_WIDTH, WHITE,
};

pub const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const P_NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

const THEME_NAME: &str = "Export";
pub const MASTER_ID: u64 = 2_147_483_648;
pub const LAYOUT_ID: u64 = 2_147_483_649;

/// Root element carrying the three PresentationML namespaces.
pub fn pml_root(name: &str) -> XmlElement {
    XmlElement::new(name)
        .attr("xmlns:a", A_NS)
        .attr("xmlns:r", R_NS)
        .attr("xmlns:p", P_NS)
}

fn srgb(color: &str) -> XmlElement {
    XmlElement::new("a:srgbClr").attr("val", color)
}

fn solid_fill(color: &str) -> XmlElement {
    XmlElement::new("a:solidFill").child(srgb(color))
}

fn scheme_color(slot: &str, color: &str) -> XmlElement {
    XmlElement::new(slot).child(srgb(color))
}

pub fn background() -> XmlElement {
    XmlElement::new("p:bg").child(
        XmlElement::new("p:bgPr")
            .child(solid_fill(BG))
            .child(XmlElement::new("a:effectLst")),
    )
}

pub fn shape_tree(shapes: Vec<XmlElement>) -> XmlElement {
    XmlElement::new("p:spTree")
        .children(group_header())
        .children(shapes)
}

fn master_color_mapping() -> XmlElement {
    XmlElement::new("p:clrMapOvr").child(XmlElement::new("a:masterClrMapping"))
}

pub fn theme_xml() -> Vec<u8> {
    let font_face = |name: &str| {
        XmlElement::new(name)
            .child(XmlElement::new("a:latin").attr("typeface", FONT))
            .child(XmlElement::new("a:ea").attr("typeface", ""))
            .child(XmlElement::new("a:cs").attr("typeface", ""))
    };
    let line = |width: u32| XmlElement::new("a:ln").attr("w", width).child(solid_fill(BORDER));
    let effect = || XmlElement::new("a:effectStyle").child(XmlElement::new("a:effectLst"));

    let colors = XmlElement::new("a:clrScheme")
        .attr("name", THEME_NAME)
        .child(scheme_color("a:dk1", BG))
        .child(scheme_color("a:lt1", WHITE))
        .child(scheme_color("a:dk2", "1E293B"))
        .child(scheme_color("a:lt2", LIGHT))
        .child(scheme_color("a:accent1", ACCENT))
        .child(scheme_color("a:accent2", "6366F1"))
        .child(scheme_color("a:accent3", "F59E0B"))
        .child(scheme_color("a:accent4", "EF4444"))
        .child(scheme_color("a:accent5", "3B82F6"))
        .child(scheme_color("a:accent6", "8B5CF6"))
        .child(scheme_color("a:hlink", ACCENT))
        .child(scheme_color("a:folHlink", "059669"));

    let fonts = XmlElement::new("a:fontScheme")
        .attr("name", THEME_NAME)
        .child(font_face("a:majorFont"))
        .child(font_face("a:minorFont"));

    let formats = XmlElement::new("a:fmtScheme")
        .attr("name", THEME_NAME)
        .child(
            XmlElement::new("a:fillStyleLst")
                .child(solid_fill(BG))
                .child(solid_fill("1E293B"))
                .child(solid_fill(BORDER)),
        )
        .child(
            XmlElement::new("a:lnStyleLst")
                .child(line(6_350))
                .child(line(12_700))
                .child(line(19_050)),
        )
        .child(
            XmlElement::new("a:effectStyleLst")
                .child(effect())
                .child(effect())
                .child(effect()),
        )
        .child(
            XmlElement::new("a:bgFillStyleLst")
                .child(solid_fill(BG))
                .child(solid_fill("1E293B"))
                .child(solid_fill(BG)),
        );

    let root = XmlElement::new("a:theme")
        .attr("xmlns:a", A_NS)
        .attr("name", THEME_NAME)
        .child(
            XmlElement::new("a:themeElements")
                .child(colors)
                .child(fonts)
                .child(formats),
        );
    document(&root)
}

/// The master refers to its layout as `layout_rel_id`.
pub fn slide_master_xml(layout_rel_id: &str) -> Vec<u8> {
    let text_level = |size: u32, bold: bool, color: &str| {
        let mut def = XmlElement::new("a:defRPr")
            .attr("lang", "en-US")
            .attr("sz", size);
        if bold {
            def = def.attr("b", 1);
        }
        XmlElement::new("a:lvl1pPr").child(
            def.attr("dirty", 0)
                .child(solid_fill(color))
                .child(XmlElement::new("a:latin").attr("typeface", FONT)),
        )
    };

    let color_map = XmlElement::new("p:clrMap")
        .attr("bg1", "lt1")
        .attr("tx1", "dk1")
        .attr("bg2", "lt2")
        .attr("tx2", "dk2")
        .attr("accent1", "accent1")
        .attr("accent2", "accent2")
        .attr("accent3", "accent3")
        .attr("accent4", "accent4")
        .attr("accent5", "accent5")
        .attr("accent6", "accent6")
        .attr("hlink", "hlink")
        .attr("folHlink", "folHlink");

    let text_styles = XmlElement::new("p:txStyles")
        .child(XmlElement::new("p:titleStyle").child(text_level(3200, true, WHITE)))
        .child(XmlElement::new("p:bodyStyle").child(text_level(1800, false, LIGHT)))
        .child(
            XmlElement::new("p:otherStyle").child(
                XmlElement::new("a:defPPr").child(
                    XmlElement::new("a:defRPr")
                        .attr("lang", "en-US")
                        .attr("dirty", 0),
                ),
            ),
        );

    let root = pml_root("p:sldMaster")
        .child(
            XmlElement::new("p:cSld")
                .child(background())
                .child(shape_tree(Vec::new())),
        )
        .child(color_map)
        .child(
            XmlElement::new("p:sldLayoutIdLst").child(
                XmlElement::new("p:sldLayoutId")
                    .attr("id", LAYOUT_ID)
                    .attr("r:id", layout_rel_id),
            ),
        )
        .child(text_styles);
    document(&root)
}

pub fn slide_layout_xml() -> Vec<u8> {
    let root = pml_root("p:sldLayout")
        .attr("type", "blank")
        .attr("preserve", 1)
        .child(
            XmlElement::new("p:cSld")
                .attr("name", "Blank")
                .child(shape_tree(Vec::new())),
        )
        .child(master_color_mapping());
    document(&root)
}

/// `slides` holds `(slide id, relationship id)` pairs in deck order.
pub fn presentation_xml(master_rel_id: &str, slides: &[(u32, String)]) -> Vec<u8> {
    let slide_ids = slides.iter().map(|(id, rel_id)| {
        XmlElement::new("p:sldId")
            .attr("id", id)
            .attr("r:id", rel_id)
    });

    let root = pml_root("p:presentation")
        .attr("saveSubsetFonts", 1)
        .child(
            XmlElement::new("p:sldMasterIdLst").child(
                XmlElement::new("p:sldMasterId")
                    .attr("id", MASTER_ID)
                    .attr("r:id", master_rel_id),
            ),
        )
        .child(XmlElement::new("p:sldIdLst").children(slide_ids))
        .child(
            XmlElement::new("p:sldSz")
                .attr("cx", SLIDE_WIDTH)
                .attr("cy", SLIDE_HEIGHT),
        )
        .child(
            XmlElement::new("p:notesSz")
                .attr("cx", SLIDE_HEIGHT)
                .attr("cy", SLIDE_WIDTH),
        );
    document(&root)
}

pub fn slide_xml(shapes: Vec<XmlElement>) -> Vec<u8> {
    let root = pml_root("p:sld")
        .child(
            XmlElement::new("p:cSld")
                .child(background())
                .child(shape_tree(shapes)),
        )
        .child(master_color_mapping());
    document(&root)
}
