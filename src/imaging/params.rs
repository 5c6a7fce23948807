//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides output paths) and the [`backend`](super::backend) (which
//! does the actual pixel work). This separation allows swapping backends
//! (e.g. for testing with a mock) without changing operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 75). Clamped on construction.
//! - [`Scale`]: bounding box `WxH` the output must fit in.
//! - [`Interpolation`]: resampling filter, named the way ImageMagick names it.
//! - [`ResizeParams`]: source, output, scale, filter and quality for one resize.
//! - [`ConvertParams`]: source and output for a plain format conversion.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

/// Bounding box for a resize. Aspect ratio is always preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scale {
    pub width: u32,
    pub height: u32,
}

impl Scale {
    /// Parse `"2000x2000"`. Both sides must be non-zero.
    pub fn parse(s: &str) -> Result<Self, String> {
        let err = || format!("resize.scale must look like 2000x2000, got {s:?}");
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(err)?;
        let width: u32 = w.trim().parse().map_err(|_| err())?;
        let height: u32 = h.trim().parse().map_err(|_| err())?;
        if width == 0 || height == 0 {
            return Err(format!("resize.scale sides must be non-zero, got {s:?}"));
        }
        Ok(Self { width, height })
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self {
            width: 2000,
            height: 2000,
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Resampling filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Catmull-Rom cubic.
    #[default]
    Catrom,
    Lanczos,
    Triangle,
    Gaussian,
    /// Nearest neighbour.
    Point,
}

impl Interpolation {
    pub const ALL: [Interpolation; 5] = [
        Interpolation::Catrom,
        Interpolation::Lanczos,
        Interpolation::Triangle,
        Interpolation::Gaussian,
        Interpolation::Point,
    ];

    /// Name as passed to ImageMagick's `-interpolate`.
    pub fn as_str(self) -> &'static str {
        match self {
            Interpolation::Catrom => "catrom",
            Interpolation::Lanczos => "lanczos",
            Interpolation::Triangle => "triangle",
            Interpolation::Gaussian => "gaussian",
            Interpolation::Point => "point",
        }
    }
}

impl FromStr for Interpolation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|m| m.as_str()).collect();
                format!(
                    "unknown resize.method {s:?} (expected one of: {})",
                    known.join(", ")
                )
            })
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for a resize operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub scale: Scale,
    pub method: Interpolation,
    pub quality: Quality,
}

/// Parameters for a format conversion. The output format follows the
/// output extension.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertParams {
    pub source: PathBuf,
    pub output: PathBuf,
}
