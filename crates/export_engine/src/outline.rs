use engine_logging::{engine_debug, engine_warn};
use futures_util::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{GenerationSettings, OutlineSettings};
use crate::generate::{ChatMessage, GenerationRequest, TextGenerator};
use crate::types::{segments_text, ContentBlock, Slide};

const SYSTEM_PROMPT: &str = "You are a presentation assistant. Given a section of an article, \
write 3-4 concise bullet points for a presentation slide. Each bullet must be short \
(max 10 words), punchy, and capture the key insight. Reply with only the bullet points, \
one per line, no bullet characters or numbering.";

const ELLIPSIS: char = '\u{2026}';

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s\-•*\d.]+").expect("valid list marker regex"));
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").expect("valid sentence regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    title: String,
    parts: Vec<String>,
}

pub struct OutlineBuilder<'a> {
    generator: &'a dyn TextGenerator,
    generation: &'a GenerationSettings,
    settings: &'a OutlineSettings,
}

impl<'a> OutlineBuilder<'a> {
    pub fn new(
        generator: &'a dyn TextGenerator,
        generation: &'a GenerationSettings,
        settings: &'a OutlineSettings,
    ) -> Self {
        Self {
            generator,
            generation,
            settings,
        }
    }

    /// Title slide first, then one content slide per heading, in heading order.
    pub async fn build(&self, title: &str, blocks: &[ContentBlock]) -> Vec<Slide> {
        let sections = collect_sections(blocks);
        let bullets: Vec<Vec<String>> = if self.settings.parallel {
            join_all(sections.iter().map(|section| self.summarize(section))).await
        } else {
            let mut all = Vec::with_capacity(sections.len());
            for section in &sections {
                all.push(self.summarize(section).await);
            }
            all
        };

        let mut slides = Vec::with_capacity(sections.len() + 1);
        slides.push(Slide::title(title));
        slides.extend(
            sections
                .into_iter()
                .zip(bullets)
                .map(|(section, bullets)| Slide::content(section.title, bullets)),
        );
        slides
    }

    async fn summarize(&self, section: &Section) -> Vec<String> {
        if section.parts.is_empty() {
            return Vec::new();
        }

        let request = GenerationRequest {
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(format!(
                    "Section: {}\n\n{}",
                    section.title,
                    section.parts.join("\n\n")
                )),
            ],
            primary_model: self.generation.primary_model.clone(),
            fallback_model: self.generation.fallback_model.clone(),
            temperature: self.generation.temperature,
            max_tokens: self.generation.max_tokens,
        };

        match self.generator.generate(&request).await {
            Ok(text) => {
                let bullets = parse_bullets(&text, self.settings.max_bullets)
                    .into_iter()
                    .map(|bullet| clip_bullet(&bullet, self.settings.bullet_max_chars))
                    .collect::<Vec<_>>();
                if bullets.is_empty() {
                    engine_warn!(
                        "Summary for section {:?} had no usable lines, using fallback",
                        section.title
                    );
                    self.fallback(section)
                } else {
                    engine_debug!(
                        "Summarized section {:?} into {} bullets",
                        section.title,
                        bullets.len()
                    );
                    bullets
                }
            }
            Err(err) => {
                engine_warn!(
                    "Summarizing section {:?} failed ({}), using fallback",
                    section.title,
                    err
                );
                self.fallback(section)
            }
        }
    }

    fn fallback(&self, section: &Section) -> Vec<String> {
        fallback_bullets(
            &section.parts,
            self.settings.max_bullets,
            self.settings.bullet_max_chars,
        )
    }
}

fn collect_sections(blocks: &[ContentBlock]) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    for block in blocks {
        match block {
            ContentBlock::Heading { text, .. } => sections.push(Section {
                title: text.clone(),
                parts: Vec::new(),
            }),
            ContentBlock::Paragraph { segments } | ContentBlock::ListItem { segments } => {
                if let Some(current) = sections.last_mut() {
                    let text = segments_text(segments).trim().to_string();
                    if !text.is_empty() {
                        current.parts.push(text);
                    }
                }
            }
            ContentBlock::Image { .. } | ContentBlock::HorizontalRule => {}
        }
    }
    sections
}

/// One bullet per non-blank line with leading markers and numbering removed.
pub fn parse_bullets(text: &str, max: usize) -> Vec<String> {
    text.lines()
        .map(|line| LIST_MARKER.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .take(max)
        .collect()
}

/// Text up to and including the first `.`, `!` or `?` followed by whitespace.
pub fn first_sentence(text: &str) -> &str {
    match SENTENCE_END.find(text) {
        Some(found) => text[..found.start() + 1].trim(),
        None => text.trim(),
    }
}

/// Clip to at most `max` characters, ellipsis included.
pub fn clip_bullet(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max.saturating_sub(1)).collect();
    let head = head
        .trim_end()
        .trim_end_matches(['.', ',', ';', ':', '-', '\u{2014}'])
        .trim_end();
    format!("{head}{ELLIPSIS}")
}

/// Offline bullets: the first sentence of up to `max` parts, clipped.
pub fn fallback_bullets(parts: &[String], max: usize, max_chars: usize) -> Vec<String> {
    parts
        .iter()
        .take(max)
        .map(|part| clip_bullet(first_sentence(part), max_chars))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Segment;

    #[test]
    fn markers_and_numbering_are_stripped() {
        let text = "1. First point\n- Second\n\n• Third\n* Fourth\n5) Fifth";
        assert_eq!(
            parse_bullets(text, 4),
            vec!["First point", "Second", "Third", "Fourth"]
        );
    }

    #[test]
    fn first_sentence_splits_on_terminator_and_space() {
        assert_eq!(first_sentence("One. Two. Three."), "One.");
        assert_eq!(first_sentence("Version 2.5 is out! Yes."), "Version 2.5 is out!");
        assert_eq!(first_sentence("  no terminator  "), "no terminator");
    }

    #[test]
    fn clip_keeps_short_text() {
        assert_eq!(clip_bullet("short", 110), "short");
    }

    #[test]
    fn clip_strips_trailing_punctuation_before_ellipsis() {
        let text = format!("{}, and more", "a".repeat(9));
        assert_eq!(clip_bullet(&text, 11), "aaaaaaaaa\u{2026}");
    }

    #[test]
    fn sections_ignore_blocks_before_first_heading() {
        let blocks = vec![
            ContentBlock::Paragraph {
                segments: vec![Segment::plain("intro")],
            },
            ContentBlock::Heading {
                level: 2,
                text: "A".into(),
            },
            ContentBlock::ListItem {
                segments: vec![Segment::plain("  item ")],
            },
            ContentBlock::HorizontalRule,
        ];
        assert_eq!(
            collect_sections(&blocks),
            vec![Section {
                title: "A".into(),
                parts: vec!["item".into()],
            }]
        );
    }
}
