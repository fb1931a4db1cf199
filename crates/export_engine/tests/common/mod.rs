#![allow(dead_code)]

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

pub fn archive(bytes: &[u8]) -> ZipArchive<Cursor<&[u8]>> {
    ZipArchive::new(Cursor::new(bytes)).expect("valid zip")
}

pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = archive(bytes);
    let names = archive.file_names().map(str::to_string).collect();
    names
}

pub fn read_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = archive(bytes);
    let mut file = archive.by_name(name).unwrap_or_else(|_| panic!("missing {name}"));
    let mut text = String::new();
    file.read_to_string(&mut text).expect("utf-8 part");
    text
}

/// Unescaped text of every `tag` element in document order.
pub fn element_texts(xml: &str, tag: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut texts = Vec::new();
    let mut inside = false;
    loop {
        match reader.read_event().expect("well-formed xml") {
            Event::Start(e) if e.name().as_ref() == tag.as_bytes() => {
                inside = true;
                texts.push(String::new());
            }
            Event::End(e) if e.name().as_ref() == tag.as_bytes() => inside = false,
            Event::Text(t) if inside => {
                let text = t.unescape().expect("valid escapes");
                if let Some(last) = texts.last_mut() {
                    last.push_str(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    texts
}

/// Unescaped `attr` values of every `tag` element (empty or not).
pub fn attribute_values(xml: &str, tag: &str, attr: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut values = Vec::new();
    loop {
        match reader.read_event().expect("well-formed xml") {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == tag.as_bytes() => {
                for attribute in e.attributes() {
                    let attribute = attribute.expect("valid attribute");
                    if attribute.key.as_ref() == attr.as_bytes() {
                        values.push(
                            attribute
                                .unescape_value()
                                .expect("valid escapes")
                                .into_owned(),
                        );
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    values
}

pub fn assert_well_formed(xml: &str) {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => panic!("malformed xml: {err}\n{xml}"),
        }
    }
}

/// No XML part may carry a control character other than tab, LF or CR.
pub fn assert_no_control_chars(bytes: &[u8]) {
    for name in entry_names(bytes)
        .iter()
        .filter(|name| name.ends_with(".xml") || name.ends_with(".rels"))
    {
        let xml = read_entry(bytes, name);
        let bad: Vec<char> = xml
            .chars()
            .filter(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
            .collect();
        assert!(bad.is_empty(), "{name} contains {bad:?}");
    }
}

/// Solid-colour PNG of the given size.
pub fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}
