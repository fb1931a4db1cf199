use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::error::ExportError;

pub type JobId = u64;

/// Image bytes keyed by the `src` they were resolved from.
pub type ResolvedImages = HashMap<String, Bytes>;

/// One styled run of inline text inside a paragraph or list item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub href: Option<String>,
    pub bold: bool,
    pub italic: bool,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: None,
            bold: false,
            italic: false,
        }
    }

    pub fn is_link(&self) -> bool {
        self.href.is_some()
    }
}

/// Structural unit of article content, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Heading { level: u8, text: String },
    Paragraph { segments: Vec<Segment> },
    ListItem { segments: Vec<Segment> },
    Image { src: String },
    HorizontalRule,
}

impl ContentBlock {
    pub fn segments(&self) -> Option<&[Segment]> {
        match self {
            ContentBlock::Paragraph { segments } | ContentBlock::ListItem { segments } => {
                Some(segments)
            }
            _ => None,
        }
    }
}

/// Concatenated segment text, links included verbatim.
pub fn segments_text(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect()
}

/// Concatenated segment text with links degraded to `text (url)`.
pub fn segments_with_urls(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push_str(&segment.text);
        if let Some(href) = &segment.href {
            out.push_str(" (");
            out.push_str(href);
            out.push(')');
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideKind {
    Title,
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub kind: SlideKind,
    pub title: String,
    pub bullets: Vec<String>,
}

impl Slide {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            kind: SlideKind::Title,
            title: title.into(),
            bullets: Vec::new(),
        }
    }

    pub fn content(title: impl Into<String>, bullets: Vec<String>) -> Self {
        Self {
            kind: SlideKind::Content,
            title: title.into(),
            bullets,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Pdf,
    Docx,
    Pptx,
    Txt,
}

impl ExportFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            ExportFormat::Txt => "text/plain",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
            ExportFormat::Pptx => "pptx",
            ExportFormat::Txt => "txt",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "docx" => Ok(ExportFormat::Docx),
            "pptx" => Ok(ExportFormat::Pptx),
            "txt" => Ok(ExportFormat::Txt),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub title: String,
    pub content: Option<String>,
    pub format: String,
}

impl ExportRequest {
    pub fn new(
        title: impl Into<String>,
        content: Option<impl Into<String>>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.map(Into::into),
            format: format.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutput {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Queued,
    Extracting,
    ResolvingImages,
    Summarizing,
    Rendering,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    pub job_id: JobId,
    pub stage: Stage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(JobProgress),
    ExportCompleted {
        job_id: JobId,
        result: Result<ExportOutput, ExportError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ImageFetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl ImageFetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    NotFound,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Io,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::NotFound => write!(f, "not found"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
