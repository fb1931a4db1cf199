use encoding_rs::WINDOWS_1252;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Regular,
    Bold,
    Oblique,
    BoldOblique,
}

pub const ALL_STYLES: [FontStyle; 4] = [
    FontStyle::Regular,
    FontStyle::Bold,
    FontStyle::Oblique,
    FontStyle::BoldOblique,
];

impl FontStyle {
    pub fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => FontStyle::Regular,
            (true, false) => FontStyle::Bold,
            (false, true) => FontStyle::Oblique,
            (true, true) => FontStyle::BoldOblique,
        }
    }

    pub fn resource_name(self) -> &'static str {
        match self {
            FontStyle::Regular => "F1",
            FontStyle::Bold => "F2",
            FontStyle::Oblique => "F3",
            FontStyle::BoldOblique => "F4",
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            FontStyle::Regular => "Helvetica",
            FontStyle::Bold => "Helvetica-Bold",
            FontStyle::Oblique => "Helvetica-Oblique",
            FontStyle::BoldOblique => "Helvetica-BoldOblique",
        }
    }

    fn is_bold(self) -> bool {
        matches!(self, FontStyle::Bold | FontStyle::BoldOblique)
    }
}

// Advance widths for 0x20..=0x7E in 1/1000 em. Oblique faces share the upright widths.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const BULLET: u8 = 0x95;
const ELLIPSIS: u8 = 0x85;
const DEFAULT_WIDTH: u16 = 556;

fn glyph_width(byte: u8, style: FontStyle) -> u16 {
    match byte {
        0x20..=0x7E => {
            let table = if style.is_bold() {
                &HELVETICA_BOLD
            } else {
                &HELVETICA
            };
            table[usize::from(byte - 0x20)]
        }
        BULLET => 350,
        ELLIPSIS => 1000,
        _ => DEFAULT_WIDTH,
    }
}

/// Width in points of WinAnsi-encoded text.
pub fn text_width(encoded: &[u8], style: FontStyle, size: f32) -> f32 {
    let units: u32 = encoded
        .iter()
        .map(|&byte| u32::from(glyph_width(byte, style)))
        .sum();
    units as f32 * size / 1000.0
}

/// Encode to Windows-1252. Characters without a mapping become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        if ch.is_ascii() {
            out.push(ch as u8);
            continue;
        }
        let (encoded, _, had_errors) = WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
        match encoded.as_ref() {
            [byte] if !had_errors => out.push(*byte),
            _ => out.push(b'?'),
        }
    }
    out
}
