//! High-level image operations.
//!
//! These functions decide output paths and parameters, then call the backend.

use super::backend::{BackendError, ImageBackend};
use super::params::{ConvertParams, Interpolation, Quality, ResizeParams, Scale};
use crate::config::ResizeConfig;
use crate::naming;
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Parsed `[resize]` settings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WebResize {
    pub scale: Scale,
    pub method: Interpolation,
    pub quality: Quality,
}

impl TryFrom<&ResizeConfig> for WebResize {
    type Error = String;

    fn try_from(config: &ResizeConfig) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            scale: Scale::parse(&config.scale)?,
            method: config.method.parse()?,
            quality: Quality::new(config.quality),
        })
    }
}

/// Write a web-sized copy of `source` next to it as `<stem>-web<ext>`.
///
/// Returns the path written.
pub fn resize_for_web(
    backend: &dyn ImageBackend,
    source: &Path,
    settings: &WebResize,
) -> Result<PathBuf> {
    let output = naming::web_variant_path(source);
    backend.resize(&ResizeParams {
        source: source.to_path_buf(),
        output: output.clone(),
        scale: settings.scale,
        method: settings.method,
        quality: settings.quality,
    })?;
    Ok(output)
}

/// Convert a TIFF to `<dir>/<stem>.jpeg`. The caller owns `dir` and
/// removes it when done.
pub fn convert_tiff_to_jpeg(
    backend: &dyn ImageBackend,
    source: &Path,
    dir: &Path,
) -> Result<PathBuf> {
    let output = naming::jpeg_path_in(dir, source);
    backend.convert(&ConvertParams {
        source: source.to_path_buf(),
        output: output.clone(),
    })?;
    Ok(output)
}
