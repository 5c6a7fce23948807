//! Filename conventions.
//!
//! - `IMG_7029.jpeg` → `IMG_7029-web.jpeg` (web-sized copy written by `rodeo resize`)
//! - `scan.tiff` → `scan.jpeg` (temporary JPEG uploaded in place of a TIFF)
//! - `IMG_7029.jpeg` with no title → uploaded as "IMG_7029"

use std::path::{Path, PathBuf};

/// Title to upload under: the trimmed embedded title, or the filename
/// without extension when that is empty.
pub fn upload_title(title: &str, path: &Path) -> String {
    let trimmed = title.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<dir>/<stem>-web<.ext>`, next to the input.
pub fn web_variant_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}-web.{}", ext.to_string_lossy()),
        None => format!("{stem}-web"),
    };
    path.with_file_name(name)
}

/// `<dir>/<stem>.jpeg`, where `dir` is usually a scratch directory so the
/// input's own folder is never written to.
pub fn jpeg_path_in(dir: &Path, path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.join(format!("{stem}.jpeg"))
}

/// `.tif` / `.tiff`, any case.
pub fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
}
