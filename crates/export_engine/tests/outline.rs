use std::sync::Mutex;
use std::time::Duration;

use export_engine::{
    clip_bullet, BlockExtractor, Extractor, GenerationError, GenerationRequest,
    GenerationSettings, OutlineBuilder, OutlineSettings, SlideKind, TextGenerator,
};
use pretty_assertions::assert_eq;

const ARTICLE: &str = "<p>Preface is skipped.</p>\
    <h2>Alpha</h2><p>Alpha starts here. More alpha.</p><ul><li>Alpha item!</li></ul>\
    <h2>Beta</h2><p>Beta text? Yes.</p>\
    <h2>Empty</h2><hr>";

struct Scripted {
    reply: Result<String, GenerationError>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl Scripted {
    fn replying(reply: Result<&str, GenerationError>) -> Self {
        Self {
            reply: reply.map(str::to_string),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for Scripted {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone()
    }
}

/// Answers with the section title, slower for earlier sections.
struct Staggered;

#[async_trait::async_trait]
impl TextGenerator for Staggered {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let user = &request.messages[1].content;
        let title = user
            .lines()
            .next()
            .and_then(|line| line.strip_prefix("Section: "))
            .unwrap_or_default()
            .to_string();
        let delay = if title == "Alpha" { 50 } else { 5 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(format!("- about {title}"))
    }
}

async fn outline(
    generator: &dyn TextGenerator,
    settings: &OutlineSettings,
) -> Vec<export_engine::Slide> {
    let blocks = BlockExtractor.extract(ARTICLE);
    let generation = GenerationSettings::default();
    OutlineBuilder::new(generator, &generation, settings)
        .build("Deck <Title>", &blocks)
        .await
}

#[tokio::test]
async fn one_slide_per_heading_after_title() {
    let generator = Scripted::replying(Ok("1. First\n2. Second\n\n- Third\n* Fourth\n- Fifth"));
    let slides = outline(&generator, &OutlineSettings::default()).await;

    assert_eq!(slides.len(), 4);
    assert_eq!(slides[0].kind, SlideKind::Title);
    assert_eq!(slides[0].title, "Deck <Title>");
    assert!(slides[0].bullets.is_empty());

    let titles: Vec<&str> = slides[1..].iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Alpha", "Beta", "Empty"]);
    assert_eq!(slides[1].bullets, vec!["First", "Second", "Third", "Fourth"]);
    assert!(slides[3].bullets.is_empty());

    // Sections without text are never sent to the generator.
    assert_eq!(generator.requests.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn request_carries_prompt_and_models() {
    let generator = Scripted::replying(Ok("ok"));
    let settings = OutlineSettings {
        parallel: false,
        ..OutlineSettings::default()
    };
    outline(&generator, &settings).await;

    let requests = generator.requests.lock().unwrap();
    let first = &requests[0];
    assert_eq!(first.primary_model, "gpt-4.1-mini");
    assert_eq!(first.fallback_model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(first.temperature, 0.4);
    assert_eq!(first.max_tokens, Some(200));
    assert_eq!(first.messages[0].role, "system");
    assert_eq!(
        first.messages[1].content,
        "Section: Alpha\n\nAlpha starts here. More alpha.\n\nAlpha item!"
    );
}

#[tokio::test]
async fn generator_failure_falls_back_to_first_sentences() {
    let generator = Scripted::replying(Err(GenerationError::RateLimited("slow down".into())));
    let slides = outline(&generator, &OutlineSettings::default()).await;
    assert_eq!(slides[1].bullets, vec!["Alpha starts here.", "Alpha item!"]);
    assert_eq!(slides[2].bullets, vec!["Beta text?"]);
}

#[tokio::test]
async fn blank_reply_falls_back() {
    let generator = Scripted::replying(Ok(" \n - \n"));
    let slides = outline(&generator, &OutlineSettings::default()).await;
    assert_eq!(slides[2].bullets, vec!["Beta text?"]);
}

#[tokio::test]
async fn long_bullets_are_clipped() {
    let long = "word ".repeat(60);
    let generator = Scripted::replying(Ok(long.as_str()));
    let slides = outline(&generator, &OutlineSettings::default()).await;
    let bullet = &slides[1].bullets[0];
    assert!(bullet.chars().count() <= 110);
    assert!(bullet.ends_with('\u{2026}'));
}

#[tokio::test]
async fn parallel_summaries_keep_section_order() {
    let slides = outline(&Staggered, &OutlineSettings::default()).await;
    assert_eq!(slides[1].bullets, vec!["about Alpha"]);
    assert_eq!(slides[2].bullets, vec!["about Beta"]);
}

#[test]
fn clip_of_long_text_ends_with_ellipsis() {
    let text = "x".repeat(200);
    let clipped = clip_bullet(&text, 110);
    assert_eq!(clipped.chars().count(), 110);
    assert!(clipped.ends_with('\u{2026}'));
    assert_eq!(clip_bullet("short and sweet", 110), "short and sweet");
}
