mod common;

use bytes::Bytes;
use export_engine::pdf::PdfRenderer;
use export_engine::{BlockExtractor, ContentBlock, Extractor, ResolvedImages, Segment};
use lopdf::content::Content;
use lopdf::{Document, Object};
use pretty_assertions::assert_eq;

use common::png_fixture;

fn load(bytes: &[u8]) -> Document {
    let mut doc = Document::load_mem(bytes).expect("readable pdf");
    doc.decompress();
    doc
}

/// `Tj` strings of every page, in drawing order.
fn page_texts(doc: &Document) -> Vec<Vec<String>> {
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let data = doc.get_page_content(page_id).expect("page content");
            let content = Content::decode(&data).expect("decodable content");
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Tj")
                .filter_map(|op| match op.operands.first() {
                    Some(Object::String(bytes, _)) => {
                        Some(bytes.iter().map(|&b| char::from(b)).collect::<String>())
                    }
                    _ => None,
                })
                .collect::<Vec<String>>()
        })
        .collect()
}

fn link_targets(doc: &Document) -> Vec<String> {
    let mut targets = Vec::new();
    for object in doc.objects.values() {
        let Object::Dictionary(dict) = object else {
            continue;
        };
        let is_link = matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Link");
        if !is_link {
            continue;
        }
        if let Ok(Object::Dictionary(action)) = dict.get(b"A") {
            if let Ok(Object::String(uri, _)) = action.get(b"URI") {
                targets.push(String::from_utf8_lossy(uri).into_owned());
            }
        }
    }
    targets
}

fn image_sizes(doc: &Document) -> Vec<(i64, i64)> {
    doc.objects
        .values()
        .filter_map(|object| match object {
            Object::Stream(stream) => {
                let is_image =
                    matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Image");
                if !is_image {
                    return None;
                }
                match (stream.dict.get(b"Width"), stream.dict.get(b"Height")) {
                    (Ok(Object::Integer(w)), Ok(Object::Integer(h))) => Some((*w, *h)),
                    _ => None,
                }
            }
            _ => None,
        })
        .collect()
}

fn render(html: &str, images: &ResolvedImages) -> Vec<u8> {
    let blocks = BlockExtractor.extract(html);
    PdfRenderer.render("Report", &blocks, images).unwrap()
}

#[test]
fn draws_title_then_blocks_in_order() {
    let bytes = render(
        "<h2>Summary</h2><p>Hello <b>world</b></p><ul><li>item</li></ul><hr>",
        &ResolvedImages::new(),
    );
    assert!(bytes.starts_with(b"%PDF-1.5"));
    let doc = load(&bytes);
    assert_eq!(doc.get_pages().len(), 1);
    assert_eq!(
        page_texts(&doc),
        vec![vec!["Report", "Summary", "Hello ", "world", "\u{95} item"]]
    );
}

fn info_title(doc: &Document) -> Vec<u8> {
    let info = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => doc.get_object(*id).unwrap(),
        other => panic!("no info reference: {other:?}"),
    };
    let Object::Dictionary(info) = info else {
        panic!("info is not a dictionary");
    };
    match info.get(b"Title") {
        Ok(Object::String(title, _)) => title.clone(),
        other => panic!("no title: {other:?}"),
    }
}

#[test]
fn info_dictionary_carries_title() {
    let doc = load(&render("<p>x</p>", &ResolvedImages::new()));
    assert_eq!(info_title(&doc), b"Report".to_vec());
}

#[test]
fn non_ascii_title_is_utf16_with_bom() {
    let title = "Q3 \u{2014} Review\u{2026} \u{2022} caf\u{e9}";
    let blocks = BlockExtractor.extract("<p>x</p>");
    let bytes = PdfRenderer
        .render(title, &blocks, &ResolvedImages::new())
        .unwrap();

    let raw = info_title(&load(&bytes));
    assert_eq!(&raw[..2], &[0xFE, 0xFF]);
    let units: Vec<u16> = raw[2..]
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    assert_eq!(String::from_utf16(&units).unwrap(), title);
}

#[test]
fn links_get_annotations() {
    let doc = load(&render(
        r#"<p>See <a href="https://d.example/x">the docs</a> today</p>"#,
        &ResolvedImages::new(),
    ));
    assert_eq!(link_targets(&doc), vec!["https://d.example/x"]);
    assert_eq!(
        page_texts(&doc),
        vec![vec!["Report", "See ", "the docs", " today"]]
    );
}

#[test]
fn text_outside_win_ansi_becomes_question_marks() {
    let blocks = vec![ContentBlock::Paragraph {
        segments: vec![Segment::plain("Caf\u{e9} \u{65e5}")],
    }];
    let doc = load(&PdfRenderer.render("T", &blocks, &ResolvedImages::new()).unwrap());
    assert_eq!(page_texts(&doc)[0][1], "Caf\u{e9} ?");
}

#[test]
fn resolved_images_are_embedded_and_bad_ones_skipped() {
    let mut images = ResolvedImages::new();
    images.insert("/ok.png".into(), Bytes::from(png_fixture(20, 10)));
    images.insert("/broken.png".into(), Bytes::from_static(b"not an image"));
    let bytes = render(
        r#"<img src="/ok.png"><img src="/broken.png"><img src="/absent.png"><p>after</p>"#,
        &images,
    );
    let doc = load(&bytes);
    assert_eq!(image_sizes(&doc), vec![(20, 10)]);
    assert_eq!(page_texts(&doc), vec![vec!["Report", "after"]]);
}

#[test]
fn long_articles_break_across_pages() {
    let html = "<p>Lorem ipsum dolor sit amet, consectetur adipiscing elit.</p>".repeat(120);
    let doc = load(&render(&html, &ResolvedImages::new()));
    assert!(doc.get_pages().len() > 1);
    let total: usize = page_texts(&doc).iter().map(Vec::len).sum();
    assert_eq!(total, 121);
}

#[test]
fn rendering_is_deterministic() {
    let html = "<h1>A</h1><p>b <a href=\"/c\">c</a></p><hr>";
    assert_eq!(
        render(html, &ResolvedImages::new()),
        render(html, &ResolvedImages::new())
    );
}
