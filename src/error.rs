use thiserror::Error;

use crate::model::PageId;
use crate::source::SourceId;

#[derive(Debug, Error)]
pub enum WorkbenchError {
    #[error("Unreadable source '{name}': {reason}")]
    UnreadableSource { name: String, reason: String },

    #[error("Source unavailable: {0}")]
    SourceUnavailable(SourceId),

    #[error("Embed failure: {0}")]
    EmbedFailure(String),

    #[error("Invalid crop geometry: {0}")]
    InvalidCropGeometry(String),

    #[error("Invalid rotation: {0} degrees is not a multiple of 90")]
    InvalidRotation(i64),

    #[error("Unknown page: {0}")]
    UnknownPage(PageId),

    #[error("Index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("An export is already running for this workspace")]
    ExportInProgress,

    #[error("Preview render superseded")]
    PreviewCancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("PDF read error: {0}")]
    PdfReadError(String),

    #[error("PDF write error: {0}")]
    PdfWriteError(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Archive error: {0}")]
    ArchiveError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`WorkbenchError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl WorkbenchError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create an embed failure.
    embed => EmbedFailure,
    /// Create an invalid crop geometry error.
    invalid_crop => InvalidCropGeometry,
    /// Create a configuration error.
    config => ConfigError,
    /// Create a PDF read error.
    pdf_read => PdfReadError,
    /// Create a PDF write error.
    pdf_write => PdfWriteError,
    /// Create a render error.
    render => RenderError,
    /// Create an archive error.
    archive => ArchiveError,
}

impl WorkbenchError {
    /// Create an unreadable source error for the named upload.
    pub fn unreadable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnreadableSource {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl From<lopdf::Error> for WorkbenchError {
    fn from(e: lopdf::Error) -> Self {
        Self::PdfReadError(e.to_string())
    }
}

impl From<serde_yml::Error> for WorkbenchError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

#[cfg(feature = "pdfium")]
impl From<pdfium_render::prelude::PdfiumError> for WorkbenchError {
    fn from(e: pdfium_render::prelude::PdfiumError) -> Self {
        Self::RenderError(e.to_string())
    }
}

impl From<image::ImageError> for WorkbenchError {
    fn from(e: image::ImageError) -> Self {
        Self::EmbedFailure(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WorkbenchError>;
