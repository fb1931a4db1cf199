//! Article export engine: turns an HTML article body into PDF, DOCX, PPTX or
//! plain text.
mod config;
mod engine;
mod error;
mod extract;
mod fetch;
mod filename;
mod generate;
mod outline;
mod package;
mod persist;
mod service;
mod text;
mod types;
mod xml;

pub mod docx;
pub mod pdf;
pub mod pptx;

pub use config::{
    load_settings, ConfigError, ExportSettings, GenerationSettings, OutlineSettings,
    StorageSettings,
};
pub use engine::ExportEngine;
pub use error::{ExportError, PackageAssemblyError};
pub use extract::{BlockExtractor, Extractor};
pub use fetch::{
    ChainedImageResolver, FetchSettings, ImageSource, ReqwestImageFetcher, StorageImageSource,
};
pub use filename::{parameterize, suggested_filename};
pub use generate::{
    ChatMessage, GenerationError, GenerationRequest, OpenAiChatClient, TextGenerator,
};
pub use outline::{clip_bullet, fallback_bullets, first_sentence, parse_bullets, OutlineBuilder};
pub use package::{OpcPackage, Relationship, Relationships};
pub use persist::{ensure_output_dir, save_export, AtomicFileWriter, PersistError};
pub use service::{ChannelProgressSink, ExportService, ProgressSink, SetupError};
pub use text::TextRenderer;
pub use types::{
    segments_text, segments_with_urls, ContentBlock, EngineEvent, ExportFormat, ExportOutput,
    ExportRequest, FailureKind, ImageFetchError, JobId, JobProgress, ResolvedImages, Segment,
    Slide, SlideKind, Stage,
};
pub use xml::XmlElement;
