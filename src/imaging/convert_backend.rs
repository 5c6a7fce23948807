//! ImageMagick backend.
//!
//! | Operation | Command |
//! |---|---|
//! | Resize | `convert SRC -scale WxH -interpolate METHOD -quality Q DST` |
//! | Convert | `convert SRC DST` |
//!
//! The binary comes from `cmd.convert`. Argument lists are built by pure
//! functions so they can be checked without ImageMagick installed.

use super::backend::{BackendError, ImageBackend};
use super::params::{ConvertParams, ResizeParams};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

pub struct ConvertBackend {
    binary: PathBuf,
}

impl ConvertBackend {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, args: Vec<OsString>) -> Result<(), BackendError> {
        log::debug!("{} {:?}", self.binary.display(), args);
        let output = Command::new(&self.binary).args(&args).output()?;
        if !output.status.success() {
            return Err(BackendError::ToolFailed {
                tool: self.binary.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

pub(crate) fn resize_args(params: &ResizeParams) -> Vec<OsString> {
    vec![
        params.source.clone().into(),
        "-scale".into(),
        params.scale.to_string().into(),
        "-interpolate".into(),
        params.method.as_str().into(),
        "-quality".into(),
        params.quality.value().to_string().into(),
        params.output.clone().into(),
    ]
}

pub(crate) fn convert_args(params: &ConvertParams) -> Vec<OsString> {
    vec![params.source.clone().into(), params.output.clone().into()]
}

impl ImageBackend for ConvertBackend {
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        self.run(resize_args(params))
    }

    fn convert(&self, params: &ConvertParams) -> Result<(), BackendError> {
        self.run(convert_args(params))
    }
}
