//! Image processing: web resizing and TIFF → JPEG conversion.
//!
//! | Operation | ImageMagick | Pure Rust |
//! |---|---|---|
//! | **Resize** | `convert -scale -interpolate -quality` | `DynamicImage::resize` + JPEG encoder |
//! | **Convert** | `convert SRC DST` | decode + re-encode by extension |
//!
//! The module is split into:
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`ConvertBackend`] and [`RustBackend`]
//! - **Operations**: High-level functions choosing output paths and calling the backend

pub mod backend;
pub mod convert_backend;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use convert_backend::ConvertBackend;
pub use operations::{WebResize, convert_tiff_to_jpeg, resize_for_web};
pub use params::{ConvertParams, Interpolation, Quality, ResizeParams, Scale};
pub use rust_backend::{RustBackend, supported_input_extensions};

use crate::config::{Config, ConfigError, ResizeBackendKind};

/// Build the backend selected by `resize.backend`.
pub fn backend_from_config(config: &Config) -> Result<Box<dyn ImageBackend>, ConfigError> {
    Ok(match config.resize.backend {
        ResizeBackendKind::Convert => Box::new(ConvertBackend::new(config.require_convert()?)),
        ResizeBackendKind::Native => Box::new(RustBackend::new()),
    })
}
