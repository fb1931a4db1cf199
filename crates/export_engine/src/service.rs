use std::collections::BTreeSet;
use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::future::join_all;
use thiserror::Error;

use crate::config::ExportSettings;
use crate::docx::DocxRenderer;
use crate::error::ExportError;
use crate::extract::{BlockExtractor, Extractor};
use crate::fetch::{ChainedImageResolver, ImageSource};
use crate::filename::suggested_filename;
use crate::generate::{GenerationError, OpenAiChatClient, TextGenerator};
use crate::outline::OutlineBuilder;
use crate::pdf::PdfRenderer;
use crate::pptx::PptxBuilder;
use crate::text::TextRenderer;
use crate::types::{
    ContentBlock, EngineEvent, ExportFormat, ExportOutput, ExportRequest, ImageFetchError, JobId,
    JobProgress, ResolvedImages, Stage,
};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

struct SilentSink;

impl ProgressSink for SilentSink {
    fn emit(&self, _event: EngineEvent) {}
}

/// Collaborator wiring failed while building a service from settings.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("image resolver: {0}")]
    Images(#[from] ImageFetchError),
    #[error("text generator: {0}")]
    Generator(#[from] GenerationError),
}

pub struct ExportService {
    extractor: Arc<dyn Extractor>,
    images: Arc<dyn ImageSource>,
    generator: Arc<dyn TextGenerator>,
    settings: ExportSettings,
}

impl ExportService {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        images: Arc<dyn ImageSource>,
        generator: Arc<dyn TextGenerator>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            extractor,
            images,
            generator,
            settings,
        }
    }

    /// Default collaborators: storage-then-HTTP image resolution and the
    /// chat-completions client.
    pub fn from_settings(settings: ExportSettings) -> Result<Self, SetupError> {
        let images = ChainedImageResolver::from_settings(&settings.image_fetch, &settings.storage)?;
        let generator = OpenAiChatClient::new(settings.generation.clone())?;
        Ok(Self::new(
            Arc::new(BlockExtractor),
            Arc::new(images),
            Arc::new(generator),
            settings,
        ))
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub async fn call(&self, request: &ExportRequest) -> Result<ExportOutput, ExportError> {
        self.run_job(0, request, &SilentSink).await
    }

    /// Same as [`ExportService::call`], reporting each stage to `sink`.
    pub async fn run_job(
        &self,
        job_id: JobId,
        request: &ExportRequest,
        sink: &dyn ProgressSink,
    ) -> Result<ExportOutput, ExportError> {
        let emit = |stage| sink.emit(EngineEvent::Progress(JobProgress { job_id, stage }));

        let content = request
            .content
            .as_deref()
            .filter(|content| !content.trim().is_empty())
            .ok_or(ExportError::ContentEmpty)?;
        let format: ExportFormat = request.format.parse()?;
        let title = request.title.trim();

        emit(Stage::Extracting);
        let blocks = self.extractor.extract(content);
        engine_debug!("Job {} extracted {} blocks", job_id, blocks.len());

        let bytes = match format {
            ExportFormat::Pdf => {
                emit(Stage::ResolvingImages);
                let images = self.resolve_images(&blocks).await;
                emit(Stage::Rendering);
                PdfRenderer.render(title, &blocks, &images)?
            }
            ExportFormat::Docx => {
                emit(Stage::ResolvingImages);
                let images = self.resolve_images(&blocks).await;
                emit(Stage::Rendering);
                DocxRenderer.render(title, &blocks, &images)?
            }
            ExportFormat::Pptx => {
                emit(Stage::Summarizing);
                let slides = OutlineBuilder::new(
                    self.generator.as_ref(),
                    &self.settings.generation,
                    &self.settings.outline,
                )
                .build(title, &blocks)
                .await;
                emit(Stage::Rendering);
                PptxBuilder.build(title, &slides)?
            }
            ExportFormat::Txt => {
                emit(Stage::Rendering);
                TextRenderer.render(title, &blocks)
            }
        };

        emit(Stage::Done);
        let filename = suggested_filename(title, format);
        engine_info!("Job {} exported {} ({} bytes)", job_id, filename, bytes.len());
        Ok(ExportOutput {
            bytes,
            mime_type: format.mime_type(),
            filename,
        })
    }

    /// Load every distinct image source concurrently. Failures are logged and
    /// left out of the map.
    async fn resolve_images(&self, blocks: &[ContentBlock]) -> ResolvedImages {
        let sources: BTreeSet<&str> = blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Image { src } => Some(src.as_str()),
                _ => None,
            })
            .collect();

        let loads = sources.into_iter().map(|src| async move {
            let result = self.images.load(src).await;
            (src, result)
        });

        let mut images = ResolvedImages::new();
        for (src, result) in join_all(loads).await {
            match result {
                Ok(bytes) => {
                    images.insert(src.to_string(), bytes);
                }
                Err(err) => engine_warn!("Skipping image {}: {}", src, err),
            }
        }
        images
    }
}
