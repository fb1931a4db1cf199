use thiserror::Error;

use crate::types::ExportFormat;

/// Fatal export failures. An export either yields a complete document or one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("article has no content to export")]
    ContentEmpty,
    #[error("unknown format: {0}")]
    UnknownFormat(String),
    #[error("package assembly failed: {0}")]
    PackageAssembly(#[from] PackageAssemblyError),
    #[error("failed to render {format}: {message}")]
    Render {
        format: ExportFormat,
        message: String,
    },
}

impl ExportError {
    pub(crate) fn render(format: ExportFormat, err: impl std::fmt::Display) -> Self {
        ExportError::Render {
            format,
            message: err.to_string(),
        }
    }
}

/// A structural invariant of an OOXML package was violated. Always a defect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackageAssemblyError {
    #[error("part {0} was added twice")]
    DuplicatePart(String),
    #[error("content type override for {0} has no matching part")]
    MissingPart(String),
    #[error("part {0} has no content type")]
    MissingContentType(String),
    #[error("relationship {id} in {source_part} targets missing part {target}")]
    DanglingRelationship {
        source_part: String,
        id: String,
        target: String,
    },
}
