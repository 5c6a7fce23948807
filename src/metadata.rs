//! Image metadata via exiftool.
//!
//! `exiftool -j FILE` prints a one-element JSON array with every tag it
//! knows. The fields rodeo reads, and where each falls back to:
//!
//! | [`ImageRecord`] field | exiftool tag | Fallback |
//! |---|---|---|
//! | `title` | `Title` | `ObjectName` (IPTC) |
//! | `description` | `Description` | `Caption-Abstract` (IPTC) |
//! | `keywords` | `Keywords` | `Subject` (XMP) |
//! | `captured_at` | `DateTimeOriginal` | none |
//! | `width` / `height` | `ImageWidth` / `ImageHeight` | none |
//! | `camera` | `Make`, `Model`, `ShutterSpeedValue`, `ApertureValue`, `ISO` | none |
//!
//! exiftool emits a single keyword as a bare string and numeric-looking
//! values as JSON numbers, so every text field accepts a string or a number
//! and every keyword field additionally accepts an array of them.
//!
//! ## Capture time
//!
//! `DateTimeOriginal` is `YYYY:MM:DD HH:MM:SS` in camera local time. A
//! `±HH:MM` suffix on the date itself sets the offset; without one it comes
//! from `OffsetTimeOriginal`, else `OffsetTime`, else UTC. A trailing `Z` and a `T`
//! date/time separator are tolerated.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error running exiftool: {0}")]
    Io(#[from] io::Error),
    #[error("exiftool failed on {path}: {stderr}")]
    ToolFailed { path: PathBuf, stderr: String },
    #[error("cannot parse exiftool output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("exiftool returned no metadata")]
    Empty,
}

/// Camera and exposure details, as exiftool prints them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraInfo {
    pub make: String,
    pub model: String,
    pub shutter_speed: String,
    pub aperture: String,
    pub iso: String,
}

/// Everything rodeo needs to know about one image file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageRecord {
    pub title: String,
    pub description: String,
    /// In file order. May repeat.
    pub keywords: Vec<String>,
    pub captured_at: Option<DateTime<FixedOffset>>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub camera: CameraInfo,
}

/// Reads and edits embedded image metadata.
pub trait MetadataTool {
    fn extract(&self, path: &Path) -> Result<ImageRecord, MetadataError>;

    /// Remove the given keywords from both the IPTC `Keywords` and XMP
    /// `Subject` fields, in place.
    fn remove_keywords(&self, path: &Path, keywords: &[String]) -> Result<(), MetadataError>;
}

/// The exiftool binary at `cmd.exiftool`.
pub struct ExifTool {
    binary: PathBuf,
}

impl ExifTool {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(
        &self,
        path: &Path,
        args: Vec<OsString>,
        dir: Option<&Path>,
    ) -> Result<Vec<u8>, MetadataError> {
        log::debug!("{} {:?}", self.binary.display(), args);
        let mut command = Command::new(&self.binary);
        command.args(&args);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }
        let output = command.output()?;
        if !output.status.success() {
            return Err(MetadataError::ToolFailed {
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

impl MetadataTool for ExifTool {
    fn extract(&self, path: &Path) -> Result<ImageRecord, MetadataError> {
        let stdout = self.run(path, vec!["-j".into(), path.into()], None)?;
        parse_exiftool_json(&String::from_utf8_lossy(&stdout))
    }

    fn remove_keywords(&self, path: &Path, keywords: &[String]) -> Result<(), MetadataError> {
        if keywords.is_empty() {
            return Ok(());
        }
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let target = match dir {
            Some(_) => path.file_name().map(PathBuf::from).unwrap_or_else(|| path.to_path_buf()),
            None => path.to_path_buf(),
        };
        self.run(path, strip_keyword_args(&target, keywords), dir)?;
        Ok(())
    }
}

/// `-overwrite_original -keywords-=K -subject-=K … FILE`
pub(crate) fn strip_keyword_args(file: &Path, keywords: &[String]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-overwrite_original".into()];
    for k in keywords {
        args.push(format!("-keywords-={k}").into());
        args.push(format!("-subject-={k}").into());
    }
    args.push(file.into());
    args
}

// =============================================================================
// exiftool JSON parsing
// =============================================================================

/// Parse the output of `exiftool -j FILE`. Only the first record is used.
pub fn parse_exiftool_json(json: &str) -> Result<ImageRecord, MetadataError> {
    let records: Vec<Map<String, Value>> = serde_json::from_str(json)?;
    let tags = records.into_iter().next().ok_or(MetadataError::Empty)?;
    Ok(record_from_tags(&tags))
}

fn record_from_tags(tags: &Map<String, Value>) -> ImageRecord {
    let first_text = |keys: &[&str]| {
        keys.iter()
            .filter_map(|k| tags.get(*k).and_then(scalar_text))
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    };
    let keywords = ["Keywords", "Subject"]
        .iter()
        .map(|k| tags.get(*k).map(text_list).unwrap_or_default())
        .find(|list| !list.is_empty())
        .unwrap_or_default();

    let captured_at = tags
        .get("DateTimeOriginal")
        .and_then(scalar_text)
        .and_then(|date| {
            parse_capture_time(
                &date,
                tags.get("OffsetTimeOriginal").and_then(scalar_text).as_deref(),
                tags.get("OffsetTime").and_then(scalar_text).as_deref(),
            )
        });

    ImageRecord {
        title: first_text(&["Title", "ObjectName"]),
        description: first_text(&["Description", "Caption-Abstract"]),
        keywords,
        captured_at,
        width: tags.get("ImageWidth").and_then(Value::as_u64).map(|v| v as u32),
        height: tags.get("ImageHeight").and_then(Value::as_u64).map(|v| v as u32),
        camera: CameraInfo {
            make: first_text(&["Make"]),
            model: first_text(&["Model"]),
            shutter_speed: first_text(&["ShutterSpeedValue"]),
            aperture: first_text(&["ApertureValue"]),
            iso: first_text(&["ISO"]),
        },
    }
}

/// A string, number or bool as text. Arrays and objects are not scalars.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A scalar or an array of scalars as a list of strings.
fn text_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

// =============================================================================
// Capture time
// =============================================================================

const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Length of `YYYY:MM:DD HH:MM:SS`; anything after it may be an offset.
const EXIF_DATE_LEN: usize = 19;

/// Combine `DateTimeOriginal` with the best available UTC offset.
pub fn parse_capture_time(
    date: &str,
    offset_time_original: Option<&str>,
    offset_time: Option<&str>,
) -> Option<DateTime<FixedOffset>> {
    let mut date = date.trim().replacen('T', " ", 1);
    if date.ends_with('Z') {
        date.pop();
    }

    let mut inline_offset = None;
    if let Some(idx) = date
        .char_indices()
        .skip(EXIF_DATE_LEN)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map(|(i, _)| i)
    {
        inline_offset = parse_offset(&date[idx..]);
        date.truncate(idx);
    }

    let offset = inline_offset
        .or_else(|| offset_time_original.and_then(parse_offset))
        .or_else(|| offset_time.and_then(parse_offset))
        .or_else(|| FixedOffset::east_opt(0))?;

    let naive = NaiveDateTime::parse_from_str(date.trim(), EXIF_DATE_FORMAT).ok()?;
    offset.from_local_datetime(&naive).single()
}

/// Parse `±HH:MM` (or `±HHMM`).
pub fn parse_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    let sign = match s.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let digits: String = s[1..].chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory metadata source. Paths without a record fail extraction.
    #[derive(Default)]
    pub struct MockMetadata {
        pub records: HashMap<PathBuf, ImageRecord>,
        pub fail_strip: bool,
        pub extracted: Mutex<Vec<PathBuf>>,
        pub stripped: Mutex<Vec<(PathBuf, Vec<String>)>>,
    }

    impl MockMetadata {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_record(mut self, path: impl Into<PathBuf>, record: ImageRecord) -> Self {
            self.records.insert(path.into(), record);
            self
        }

        pub fn with_keywords(self, path: impl Into<PathBuf>, keywords: &[&str]) -> Self {
            self.with_record(
                path,
                ImageRecord {
                    keywords: keywords.iter().map(|k| k.to_string()).collect(),
                    ..ImageRecord::default()
                },
            )
        }

        pub fn get_stripped(&self) -> Vec<(PathBuf, Vec<String>)> {
            self.stripped.lock().unwrap().clone()
        }
    }

    impl MetadataTool for MockMetadata {
        fn extract(&self, path: &Path) -> Result<ImageRecord, MetadataError> {
            self.extracted.lock().unwrap().push(path.to_path_buf());
            self.records.get(path).cloned().ok_or(MetadataError::Empty)
        }

        fn remove_keywords(&self, path: &Path, keywords: &[String]) -> Result<(), MetadataError> {
            self.stripped
                .lock()
                .unwrap()
                .push((path.to_path_buf(), keywords.to_vec()));
            if self.fail_strip {
                return Err(MetadataError::ToolFailed {
                    path: path.to_path_buf(),
                    stderr: "mock failure".into(),
                });
            }
            Ok(())
        }
    }

    fn offset(secs: i32) -> FixedOffset {
        FixedOffset::east_opt(secs).unwrap()
    }

    // =========================================================================
    // JSON parsing
    // =========================================================================

    #[test]
    fn parses_full_record() {
        let json = r#"[{
            "SourceFile": "IMG_7029.jpeg",
            "ImageWidth": 6000,
            "ImageHeight": 4000,
            "Title": "Harbour at dusk",
            "Description": "Boats coming in",
            "Keywords": ["sea", "boats", "sea"],
            "Make": "FUJIFILM",
            "Model": "X-T4",
            "ShutterSpeedValue": "1/250",
            "ApertureValue": 5.6,
            "ISO": 160,
            "DateTimeOriginal": "2020:05:27 07:38:35",
            "OffsetTimeOriginal": "+01:00"
        }]"#;
        let rec = parse_exiftool_json(json).unwrap();
        assert_eq!(rec.title, "Harbour at dusk");
        assert_eq!(rec.description, "Boats coming in");
        assert_eq!(rec.keywords, vec!["sea", "boats", "sea"]);
        assert_eq!(rec.width, Some(6000));
        assert_eq!(rec.height, Some(4000));
        assert_eq!(rec.camera.make, "FUJIFILM");
        assert_eq!(rec.camera.model, "X-T4");
        assert_eq!(rec.camera.shutter_speed, "1/250");
        assert_eq!(rec.camera.aperture, "5.6");
        assert_eq!(rec.camera.iso, "160");

        let at = rec.captured_at.unwrap();
        assert_eq!(at.offset(), &offset(3600));
        assert_eq!(at.to_rfc3339(), "2020-05-27T07:38:35+01:00");
    }

    #[test]
    fn iptc_fallbacks() {
        let json = r#"[{
            "ObjectName": "Old title",
            "Caption-Abstract": "Old caption",
            "Subject": ["a", "b"]
        }]"#;
        let rec = parse_exiftool_json(json).unwrap();
        assert_eq!(rec.title, "Old title");
        assert_eq!(rec.description, "Old caption");
        assert_eq!(rec.keywords, vec!["a", "b"]);
    }

    #[test]
    fn primary_fields_win_over_fallbacks() {
        let json = r#"[{
            "Title": "New", "ObjectName": "Old",
            "Keywords": ["k"], "Subject": ["s"]
        }]"#;
        let rec = parse_exiftool_json(json).unwrap();
        assert_eq!(rec.title, "New");
        assert_eq!(rec.keywords, vec!["k"]);
    }

    #[test]
    fn single_keyword_as_string() {
        let rec = parse_exiftool_json(r#"[{"Keywords": "solo"}]"#).unwrap();
        assert_eq!(rec.keywords, vec!["solo"]);
    }

    #[test]
    fn numeric_keywords_become_strings() {
        let rec = parse_exiftool_json(r#"[{"Keywords": [2024, "travel"]}]"#).unwrap();
        assert_eq!(rec.keywords, vec!["2024", "travel"]);

        let rec = parse_exiftool_json(r#"[{"Subject": 1999}]"#).unwrap();
        assert_eq!(rec.keywords, vec!["1999"]);
    }

    #[test]
    fn numeric_title() {
        let rec = parse_exiftool_json(r#"[{"Title": 1984}]"#).unwrap();
        assert_eq!(rec.title, "1984");
    }

    #[test]
    fn missing_fields_are_empty() {
        let rec = parse_exiftool_json(r#"[{"SourceFile": "x.jpg"}]"#).unwrap();
        assert_eq!(rec, ImageRecord::default());
    }

    #[test]
    fn empty_array_is_error() {
        assert!(matches!(
            parse_exiftool_json("[]"),
            Err(MetadataError::Empty)
        ));
    }

    #[test]
    fn garbage_is_json_error() {
        assert!(matches!(
            parse_exiftool_json("File not found"),
            Err(MetadataError::Json(_))
        ));
    }

    // =========================================================================
    // Capture time
    // =========================================================================

    #[test]
    fn date_without_offset_is_utc() {
        let at = parse_capture_time("2020:05:27 07:38:35", None, None).unwrap();
        assert_eq!(at.to_rfc3339(), "2020-05-27T07:38:35+00:00");
        assert_eq!(at.timestamp(), 1590565115);
    }

    #[test]
    fn offset_time_original_wins() {
        let at = parse_capture_time("2020:05:27 07:38:35", Some("-05:00"), Some("+02:00")).unwrap();
        assert_eq!(at.offset(), &offset(-5 * 3600));
    }

    #[test]
    fn offset_time_used_when_original_missing() {
        let at = parse_capture_time("2020:05:27 07:38:35", None, Some("+02:00")).unwrap();
        assert_eq!(at.offset(), &offset(2 * 3600));
    }

    #[test]
    fn inline_offset_suffix() {
        let at = parse_capture_time("2020:05:27 07:38:35+05:30", None, None).unwrap();
        assert_eq!(at.offset(), &offset(5 * 3600 + 30 * 60));
        assert_eq!(at.to_rfc3339(), "2020-05-27T07:38:35+05:30");
    }

    #[test]
    fn inline_offset_beats_offset_fields() {
        let at = parse_capture_time(
            "2020:05:27 07:38:35+05:30",
            Some("-05:00"),
            Some("+02:00"),
        )
        .unwrap();
        assert_eq!(at.offset(), &offset(5 * 3600 + 30 * 60));
    }

    #[test]
    fn negative_inline_offset_with_minutes() {
        let at = parse_capture_time("2020:05:27 07:38:35-03:30", None, None).unwrap();
        assert_eq!(at.offset(), &offset(-(3 * 3600 + 30 * 60)));
    }

    #[test]
    fn trailing_z_and_t_separator() {
        let at = parse_capture_time("2020:05:27T07:38:35Z", None, None).unwrap();
        assert_eq!(at.to_rfc3339(), "2020-05-27T07:38:35+00:00");
    }

    #[test]
    fn unparseable_date_is_none() {
        assert!(parse_capture_time("0000:00:00 00:00:00", None, None).is_none());
        assert!(parse_capture_time("yesterday", None, None).is_none());
    }

    #[test]
    fn bad_offset_field_falls_through() {
        let at = parse_capture_time("2020:05:27 07:38:35", Some("local"), Some("+01:00")).unwrap();
        assert_eq!(at.offset(), &offset(3600));
    }

    #[test]
    fn offset_parsing() {
        assert_eq!(parse_offset("+01:00"), Some(offset(3600)));
        assert_eq!(parse_offset("-0930"), Some(offset(-(9 * 3600 + 30 * 60))));
        assert_eq!(parse_offset("+00:00"), Some(offset(0)));
        assert_eq!(parse_offset("01:00"), None);
        assert_eq!(parse_offset("+1:00"), None);
        assert_eq!(parse_offset("+25:00"), None);
    }

    // =========================================================================
    // exiftool invocation
    // =========================================================================

    #[test]
    fn strip_args_remove_from_keywords_and_subject() {
        let args = strip_keyword_args(Path::new("IMG_1.jpg"), &["private".into(), "work".into()]);
        let args: Vec<&str> = args.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(
            args,
            vec![
                "-overwrite_original",
                "-keywords-=private",
                "-subject-=private",
                "-keywords-=work",
                "-subject-=work",
                "IMG_1.jpg",
            ]
        );
    }

    #[test]
    fn remove_no_keywords_runs_nothing() {
        let tool = ExifTool::new("/nonexistent/exiftool");
        assert!(tool.remove_keywords(Path::new("a.jpg"), &[]).is_ok());
    }

    #[test]
    fn missing_binary_is_io_error() {
        let tool = ExifTool::new("/nonexistent/exiftool");
        assert!(matches!(
            tool.extract(Path::new("a.jpg")),
            Err(MetadataError::Io(_))
        ));
    }

    #[test]
    #[ignore] // Requires exiftool
    fn extract_real_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("a.jpg");
        image::RgbImage::new(4, 3).save(&path).unwrap();

        let rec = ExifTool::new("exiftool").extract(&path).unwrap();
        assert_eq!(rec.width, Some(4));
        assert_eq!(rec.height, Some(3));
    }
}
