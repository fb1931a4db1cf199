use crate::types::ExportFormat;

const MAX_STEM_CHARS: usize = 80;
const FALLBACK_STEM: &str = "article";

/// `{parameterised title}.{ext}`: lowercase ASCII alphanumerics joined by
/// single dashes.
pub fn suggested_filename(title: &str, format: ExportFormat) -> String {
    format!("{}.{}", parameterize(title), format.extension())
}

pub fn parameterize(title: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !stem.is_empty() {
                stem.push('-');
            }
            pending_dash = false;
            stem.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    // ASCII only, so byte truncation is a char boundary.
    if stem.len() > MAX_STEM_CHARS {
        stem.truncate(MAX_STEM_CHARS);
        let trimmed = stem.trim_end_matches('-').len();
        stem.truncate(trimmed);
    }
    if stem.is_empty() {
        stem = FALLBACK_STEM.to_string();
    }
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    stem
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
