//! Pipeline stages for fitting one image onto a print canvas.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ format ──▶ decode ──▶ preprocess ──▶ compose ──▶ encode
//! (path)    (bucket)   (cascade)  (orient/crop/  (stretch/   (PNG pHYs,
//!                        │         flatten)       fill/fit)   JPEG JFIF)
//!                        └── tools (Ghostscript, Inkscape)
//! ```
//!
//! 1. [`input`]      resolve the user-supplied path to an existing file
//! 2. [`format`]     bucket the file by extension
//! 3. [`decode`]     open it through the decoder cascade
//! 4. [`tools`]      run external rasterizers with a timeout
//! 5. [`preprocess`] orientation, autocrop, alpha flattening
//! 6. [`compose`]    place onto the target canvas
//! 7. [`encode`]     write the output with its DPI

pub mod compose;
pub mod decode;
pub mod encode;
pub mod format;
pub mod input;
pub mod preprocess;
pub mod tools;
