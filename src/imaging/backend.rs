//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: resize (for `rodeo resize`) and convert (TIFF → JPEG before
//! upload).
//!
//! Two implementations ship:
//! - [`ConvertBackend`](super::convert_backend::ConvertBackend) runs
//!   ImageMagick `convert`. The default, matching what most users already have.
//! - [`RustBackend`](super::rust_backend::RustBackend) is pure Rust, with no
//!   external tool to install.

use super::params::{ConvertParams, ResizeParams};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },
}

/// Trait for image processing backends.
///
/// Both operations must be supported by every backend so the rest of the
/// codebase is backend-agnostic.
pub trait ImageBackend {
    /// Scale an image to fit a bounding box and write it as a new file.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;

    /// Re-encode an image in the format implied by the output extension.
    fn convert(&self, params: &ConvertParams) -> Result<(), BackendError>;
}
