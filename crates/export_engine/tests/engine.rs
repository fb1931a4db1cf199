use std::sync::Arc;
use std::time::{Duration, Instant};

use export_engine::{
    BlockExtractor, EngineEvent, ExportEngine, ExportError, ExportRequest, ExportService,
    ExportSettings, GenerationError, GenerationRequest, ImageFetchError, ImageSource,
    JobProgress, Stage, TextGenerator,
};

struct NoImages;

#[async_trait::async_trait]
impl ImageSource for NoImages {
    async fn load(&self, src: &str) -> Result<bytes::Bytes, ImageFetchError> {
        Err(ImageFetchError {
            kind: export_engine::FailureKind::NotFound,
            message: src.to_string(),
        })
    }
}

struct Echo;

#[async_trait::async_trait]
impl TextGenerator for Echo {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        Ok("- summary".to_string())
    }
}

fn engine() -> ExportEngine {
    engine_logging::initialize_for_tests();
    let service = ExportService::new(
        Arc::new(BlockExtractor),
        Arc::new(NoImages),
        Arc::new(Echo),
        ExportSettings::default(),
    );
    ExportEngine::new(Arc::new(service)).expect("engine starts")
}

/// Events until every job in `jobs` has completed.
fn collect(engine: &ExportEngine, jobs: usize) -> Vec<EngineEvent> {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut events = Vec::new();
    let mut completed = 0;
    while completed < jobs && Instant::now() < deadline {
        if let Some(event) = engine.recv_timeout(Duration::from_millis(100)) {
            if matches!(event, EngineEvent::ExportCompleted { .. }) {
                completed += 1;
            }
            events.push(event);
        }
    }
    assert_eq!(completed, jobs, "jobs did not finish: {events:?}");
    events
}

fn stages_of(events: &[EngineEvent], job: u64) -> Vec<Stage> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Progress(JobProgress { job_id, stage }) if *job_id == job => Some(*stage),
            _ => None,
        })
        .collect()
}

#[test]
fn jobs_report_progress_and_results() {
    let engine = engine();
    engine.enqueue(
        1,
        ExportRequest::new("Deck", Some("<h2>A</h2><p>text</p>"), "pptx"),
    );
    engine.enqueue(
        2,
        ExportRequest::new("Doc", Some("<p>body</p><img src=\"/x.png\">"), "pdf"),
    );

    let events = collect(&engine, 2);
    assert_eq!(
        stages_of(&events, 1),
        vec![
            Stage::Queued,
            Stage::Extracting,
            Stage::Summarizing,
            Stage::Rendering,
            Stage::Done
        ]
    );
    assert_eq!(
        stages_of(&events, 2),
        vec![
            Stage::Queued,
            Stage::Extracting,
            Stage::ResolvingImages,
            Stage::Rendering,
            Stage::Done
        ]
    );

    for event in &events {
        if let EngineEvent::ExportCompleted { job_id, result } = event {
            let output = result.as_ref().expect("export succeeds");
            let expected = if *job_id == 1 { "deck.pptx" } else { "doc.pdf" };
            assert_eq!(output.filename, expected);
        }
    }
}

#[test]
fn failures_come_back_as_completed_errors() {
    let engine = engine();
    engine.enqueue(9, ExportRequest::new("T", Some("<p>x</p>"), "odt"));

    let events = collect(&engine, 1);
    let result = events.iter().find_map(|event| match event {
        EngineEvent::ExportCompleted { job_id: 9, result } => Some(result.clone()),
        _ => None,
    });
    assert_eq!(result, Some(Err(ExportError::UnknownFormat("odt".into()))));
    assert_eq!(stages_of(&events, 9), vec![Stage::Queued]);
    assert!(engine.try_recv().is_none());
}
