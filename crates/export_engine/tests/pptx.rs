mod common;

use export_engine::pptx::{PptxBuilder, EMPTY_SECTION_TEXT, PLACEHOLDER_TEXT, SUBTITLE_TEXT};
use export_engine::Slide;
use pretty_assertions::assert_eq;

use common::{
    assert_no_control_chars, assert_well_formed, attribute_values, element_texts, entry_names,
    read_entry,
};

const SLIDE_CT: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const SLIDE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

fn deck(title: &str, sections: usize) -> Vec<Slide> {
    let mut slides = vec![Slide::title(title)];
    for n in 1..=sections {
        slides.push(Slide::content(
            format!("Section {n}"),
            vec![format!("Point {n}a"), format!("Point {n}b")],
        ));
    }
    slides
}

#[test]
fn package_has_expected_parts_in_order() {
    let bytes = PptxBuilder.build("Deck", &deck("Deck", 1)).unwrap();
    assert_eq!(
        entry_names(&bytes),
        vec![
            "[Content_Types].xml",
            "_rels/.rels",
            "docProps/app.xml",
            "docProps/core.xml",
            "ppt/theme/theme1.xml",
            "ppt/slideMasters/slideMaster1.xml",
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            "ppt/slideLayouts/slideLayout1.xml",
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            "ppt/presentation.xml",
            "ppt/_rels/presentation.xml.rels",
            "ppt/slides/slide1.xml",
            "ppt/slides/_rels/slide1.xml.rels",
            "ppt/slides/slide2.xml",
            "ppt/slides/_rels/slide2.xml.rels",
        ]
    );
    for name in entry_names(&bytes) {
        assert_well_formed(&read_entry(&bytes, &name));
    }
}

#[test]
fn slide_counts_agree_across_manifest_and_relationships() {
    let headings = 3;
    let bytes = PptxBuilder.build("Deck", &deck("Deck", headings)).unwrap();
    let expected = headings + 1;

    let content_types = read_entry(&bytes, "[Content_Types].xml");
    let slide_overrides = attribute_values(&content_types, "Override", "ContentType")
        .into_iter()
        .filter(|ct| ct == SLIDE_CT)
        .count();
    assert_eq!(slide_overrides, expected);

    let presentation_rels = read_entry(&bytes, "ppt/_rels/presentation.xml.rels");
    let rel_ids = attribute_values(&presentation_rels, "Relationship", "Id");
    let rel_types = attribute_values(&presentation_rels, "Relationship", "Type");
    let slide_rel_ids: Vec<String> = rel_ids
        .into_iter()
        .zip(rel_types)
        .filter(|(_, ty)| ty == SLIDE_REL)
        .map(|(id, _)| id)
        .collect();
    assert_eq!(slide_rel_ids, vec!["rId2", "rId3", "rId4", "rId5"]);

    let presentation = read_entry(&bytes, "ppt/presentation.xml");
    assert_eq!(
        attribute_values(&presentation, "p:sldId", "id"),
        vec!["256", "257", "258", "259"]
    );
    assert_eq!(attribute_values(&presentation, "p:sldId", "r:id"), slide_rel_ids);

    let slide_rels = entry_names(&bytes)
        .into_iter()
        .filter(|name| name.starts_with("ppt/slides/_rels/"))
        .count();
    assert_eq!(slide_rels, expected);

    let app = read_entry(&bytes, "docProps/app.xml");
    assert_eq!(element_texts(&app, "Slides"), vec!["4"]);
}

#[test]
fn title_is_escaped_everywhere_and_reads_back() {
    let title = "Fish & \"Chips\" <Deluxe>";
    let bytes = PptxBuilder.build(title, &deck(title, 1)).unwrap();

    let slide = read_entry(&bytes, "ppt/slides/slide1.xml");
    assert!(slide.contains("Fish &amp; &quot;Chips&quot; &lt;Deluxe&gt;"));
    assert!(!slide.contains("<Deluxe>"));
    assert_eq!(element_texts(&slide, "a:t"), vec![title, SUBTITLE_TEXT]);

    let core = read_entry(&bytes, "docProps/core.xml");
    assert_eq!(element_texts(&core, "dc:title"), vec![title]);
}

#[test]
fn control_characters_never_reach_the_package() {
    let title = "Q3\u{8}Report";
    let slides = vec![
        Slide::title(title),
        Slide::content("Tabs\u{b}and\u{1}more", vec!["Line\u{c}feed\tkept".into()]),
    ];
    let bytes = PptxBuilder.build(title, &slides).unwrap();

    assert_no_control_chars(&bytes);
    let slide = read_entry(&bytes, "ppt/slides/slide1.xml");
    assert_eq!(element_texts(&slide, "a:t")[0], "Q3Report");
    let core = read_entry(&bytes, "docProps/core.xml");
    assert_eq!(element_texts(&core, "dc:title"), vec!["Q3Report"]);
    let content = read_entry(&bytes, "ppt/slides/slide2.xml");
    let texts = element_texts(&content, "a:t");
    assert_eq!(texts[0], "Tabsandmore");
    assert_eq!(texts[1], "Linefeed\tkept");
}

#[test]
fn content_slide_lists_bullets_and_placeholder() {
    let bytes = PptxBuilder.build("Deck", &deck("Deck", 1)).unwrap();
    let slide = read_entry(&bytes, "ppt/slides/slide2.xml");
    assert_eq!(
        element_texts(&slide, "a:t"),
        vec!["Section 1", "Point 1a", "Point 1b", PLACEHOLDER_TEXT]
    );
    let rels = read_entry(&bytes, "ppt/slides/_rels/slide2.xml.rels");
    assert_eq!(
        attribute_values(&rels, "Relationship", "Target"),
        vec!["../slideLayouts/slideLayout1.xml"]
    );
}

#[test]
fn empty_section_shows_muted_line() {
    let slides = vec![Slide::title("Deck"), Slide::content("Nothing here", Vec::new())];
    let bytes = PptxBuilder.build("Deck", &slides).unwrap();
    let slide = read_entry(&bytes, "ppt/slides/slide2.xml");
    assert!(element_texts(&slide, "a:t").contains(&EMPTY_SECTION_TEXT.to_string()));
    assert!(!slide.contains("a:buChar"));
}

#[test]
fn identical_input_gives_identical_bytes() {
    let slides = deck("Same", 2);
    let first = PptxBuilder.build("Same", &slides).unwrap();
    let second = PptxBuilder.build("Same", &slides).unwrap();
    assert_eq!(first, second);
}
