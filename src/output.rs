//! Result records returned for each conversion.
//!
//! A record is plain data: it serialises to JSON with a `status` tag so batch
//! callers can log one line per file.
//!
//! ```json
//! {"status":"success","size_catalog":"a","size_key":"A4","dpi":300, ...}
//! {"status":"error","error":"GS_REQUIRED","message":"EPS/AI/PDF needs ...","src_path":"..."}
//! ```

use crate::catalog::CanvasSize;
use crate::config::{Orientation, PlacementMode};
use crate::error::{ErrorKind, PrintSizeError};
use crate::pipeline::format::FormatClass;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Message for a skipped page-description file.
pub const GS_REQUIRED_MESSAGE: &str =
    "EPS/AI/PDF needs Ghostscript. Install Ghostscript or convert to PNG/JPG first.";

/// Message for a skipped SVG file.
pub const SVG_TOOL_REQUIRED_MESSAGE: &str =
    "SVG needs Inkscape on Windows (recommended) or a working Cairo runtime.";

/// Message for any other skipped file.
pub const UNREADABLE_MESSAGE: &str = "File could not be opened.";

/// Outcome of one conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResultRecord {
    Success(ConversionRecord),
    Error(ErrorRecord),
}

/// Everything resolved for a successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    /// Catalog name, e.g. `"a"` or `"4x5"`.
    pub size_catalog: String,
    /// Upper-cased size key.
    pub size_key: String,
    pub dpi: u32,
    pub mode: PlacementMode,
    pub orientation: Orientation,
    pub target_px: CanvasSize,
    pub output: PathBuf,
    /// The source path after resolution.
    pub src_path: PathBuf,
}

/// A conversion that produced no output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub error: ErrorKind,
    pub message: String,
    pub src_path: PathBuf,
}

impl ResultRecord {
    pub fn is_success(&self) -> bool {
        matches!(self, ResultRecord::Success(_))
    }

    /// The record for a file the decoder cascade skipped.
    pub fn skipped(class: FormatClass, src_path: &Path) -> Self {
        let (error, message) = match class {
            FormatClass::PageDescription(_) => (ErrorKind::GsRequired, GS_REQUIRED_MESSAGE),
            FormatClass::Vector => (ErrorKind::SvgToolRequired, SVG_TOOL_REQUIRED_MESSAGE),
            _ => (ErrorKind::Unreadable, UNREADABLE_MESSAGE),
        };
        ResultRecord::Error(ErrorRecord {
            error,
            message: message.to_string(),
            src_path: src_path.to_path_buf(),
        })
    }

    /// Fold a typed error into a record.
    pub fn from_error(err: &PrintSizeError, src_path: &Path) -> Self {
        ResultRecord::Error(ErrorRecord {
            error: err.kind(),
            message: err.to_string(),
            src_path: src_path.to_path_buf(),
        })
    }
}

impl fmt::Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultRecord::Success(r) => write!(
                f,
                "{} → {} ({} {} @ {} DPI, {}, {}, {})",
                r.src_path.display(),
                r.output.display(),
                r.size_catalog,
                r.size_key,
                r.dpi,
                r.target_px,
                r.mode,
                r.orientation
            ),
            ResultRecord::Error(e) => write!(f, "{}: {} [{}]", e.src_path.display(), e.message, e.error),
        }
    }
}
