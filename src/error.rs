//! Error types for the printsize library.
//!
//! Two error types reflect two layers of failure:
//!
//! * [`PrintSizeError`]: **fatal** for one conversion: bad size key, missing
//!   input, undecodable file, failed write. Returned as `Err(PrintSizeError)`
//!   from [`crate::process`].
//!
//! * [`ToolError`]: why an external rasterizer (Ghostscript, Inkscape) did
//!   not produce an image. Carried inside
//!   [`PrintSizeError::PageRasterizationFailed`] and used by the decoder
//!   cascade to decide between falling back, skipping, and failing.
//!
//! [`ErrorKind`] is the stable machine-readable code written into
//! [`crate::output::ErrorRecord`]s.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Maximum number of characters of tool output kept in diagnostics.
pub const MAX_DIAGNOSTIC_CHARS: usize = 2000;

/// All fatal errors returned by the printsize library.
#[derive(Debug, Error)]
pub enum PrintSizeError {
    // ── Size errors ───────────────────────────────────────────────────────
    /// The size key is not part of the selected catalog.
    #[error("Unknown size key '{key}' in catalog '{catalog}'. Available: {}", .available.join(", "))]
    UnknownSizeKey {
        key: String,
        catalog: String,
        available: Vec<String>,
    },

    /// DPI or computed canvas dimensions are zero.
    #[error("Invalid canvas dimensions: {0}")]
    InvalidDimensions(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the resolved path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// No decoder recognises the file and its extension is unknown.
    #[error("Unsupported image format: '{path}'")]
    UnsupportedFormat { path: PathBuf },

    /// The extension names a raster format but the bytes did not decode.
    #[error("Unsupported or unreadable image: '{path}': {detail}")]
    UnreadableFile { path: PathBuf, detail: String },

    /// A camera RAW file could not be demosaiced. Never suppressed.
    #[error(
        "RAW file detected but could not decode: '{path}'\nReason: {reason}\n\
         Rebuild with `--features raw` or convert the file to TIFF/JPG first."
    )]
    RawDecodeFailed { path: PathBuf, reason: String },

    /// The file needs a decoder that was left out of this build.
    #[error(
        "'{path}' is {format}, but {format} decoding was not compiled in.\n\
         Rebuild with `--features {feature}` (needs the system library) or convert the file to PNG/JPG first."
    )]
    DecoderUnavailable {
        path: PathBuf,
        format: &'static str,
        feature: &'static str,
    },

    /// Ghostscript is missing or failed on a PDF/PS/EPS/AI file.
    #[error("Ghostscript failed to render '{path}'\n{source}")]
    PageRasterizationFailed {
        path: PathBuf,
        #[source]
        source: ToolError,
    },

    /// Every SVG rasterization capability failed.
    #[error(
        "SVG file detected but cannot be rasterized on this system: '{path}'\n\
         Attempts:\n  {}\n\
         Fix options:\n  1) Install Inkscape and add it to PATH (or set INKSCAPE_EXE)\n  \
         2) Or convert the SVG to PNG first", .attempts.join("\n  ")
    )]
    VectorRasterizationFailed { path: PathBuf, attempts: Vec<String> },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The output extension does not select a format that can carry DPI.
    #[error("Unsupported output format for '{path}'\nUse .png (keeps transparency), .jpg, .tif or .bmp.")]
    UnsupportedOutputFormat { path: PathBuf },

    /// Encoding or writing the output file failed.
    #[error("Failed to write output file '{path}': {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PrintSizeError {
    /// Machine-readable code for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownSizeKey { .. } => ErrorKind::UnknownSizeKey,
            Self::InvalidDimensions(_) => ErrorKind::InvalidDimensions,
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::UnreadableFile { .. } => ErrorKind::UnreadableFile,
            Self::RawDecodeFailed { .. } => ErrorKind::RawDecodeFailed,
            Self::DecoderUnavailable { .. } => ErrorKind::DecoderUnavailable,
            Self::PageRasterizationFailed { .. } => ErrorKind::PageRasterizationFailed,
            Self::VectorRasterizationFailed { .. } => ErrorKind::VectorRasterizationFailed,
            Self::UnsupportedOutputFormat { .. } => ErrorKind::UnsupportedOutputFormat,
            Self::OutputWriteFailed { .. } => ErrorKind::OutputWriteFailed,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Why an external rasterizer produced no usable image.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The executable could not be located.
    #[error(transparent)]
    NotFound(#[from] tool_locate::LocateError),

    /// The tool was turned off in the configuration.
    #[error("{tool} is disabled in the configuration")]
    Disabled { tool: &'static str },

    /// The process could not be started.
    #[error("Failed to launch {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The process exited unsuccessfully.
    #[error("{tool} exited with {status}\nCommand: {command}\n\n--- {tool} output ---\n{diagnostics}")]
    Failed {
        tool: &'static str,
        status: String,
        command: String,
        diagnostics: String,
    },

    /// The process outlived the configured timeout and was killed.
    #[error("{tool} did not finish within {secs}s and was killed")]
    TimedOut { tool: &'static str, secs: u64 },

    /// The process succeeded but its raster output could not be read.
    #[error("{tool} output could not be decoded: {detail}")]
    BadOutput { tool: &'static str, detail: String },
}

/// Stable error codes used in [`crate::output::ErrorRecord`].
///
/// The first three are produced when a skip flag turns a missing or failing
/// rasterizer into a skipped file; the rest mirror [`PrintSizeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// PDF/PS/EPS/AI input skipped: Ghostscript missing or failed.
    GsRequired,
    /// SVG input skipped: no SVG rasterizer succeeded.
    SvgToolRequired,
    /// Input skipped for any other reason.
    Unreadable,
    UnknownSizeKey,
    InvalidDimensions,
    FileNotFound,
    UnsupportedFormat,
    UnreadableFile,
    RawDecodeFailed,
    DecoderUnavailable,
    PageRasterizationFailed,
    VectorRasterizationFailed,
    UnsupportedOutputFormat,
    OutputWriteFailed,
    InvalidConfig,
    Internal,
}

impl ErrorKind {
    /// The serialised code, e.g. `"GS_REQUIRED"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GsRequired => "GS_REQUIRED",
            Self::SvgToolRequired => "SVG_TOOL_REQUIRED",
            Self::Unreadable => "UNREADABLE",
            Self::UnknownSizeKey => "UNKNOWN_SIZE_KEY",
            Self::InvalidDimensions => "INVALID_DIMENSIONS",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            Self::UnreadableFile => "UNREADABLE_FILE",
            Self::RawDecodeFailed => "RAW_DECODE_FAILED",
            Self::DecoderUnavailable => "DECODER_UNAVAILABLE",
            Self::PageRasterizationFailed => "PAGE_RASTERIZATION_FAILED",
            Self::VectorRasterizationFailed => "VECTOR_RASTERIZATION_FAILED",
            Self::UnsupportedOutputFormat => "UNSUPPORTED_OUTPUT_FORMAT",
            Self::OutputWriteFailed => "OUTPUT_WRITE_FAILED",
            Self::InvalidConfig => "INVALID_CONFIG",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Truncate tool output to [`MAX_DIAGNOSTIC_CHARS`] characters.
pub(crate) fn truncate_diagnostics(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(MAX_DIAGNOSTIC_CHARS) {
        Some((cut, _)) => format!("{}\u{2026}", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
