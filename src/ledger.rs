//! Upload ledger: which local files are already on Flickr.
//!
//! Re-running `rodeo upload` over a directory must not publish the same
//! photo twice. The ledger remembers, per local **base filename**, the
//! Flickr photo id it was uploaded as.
//!
//! # Storage
//!
//! A ledger is a flat JSON object, pretty-printed:
//!
//! ```json
//! {
//!   "IMG_7028.jpg": "50123456789",
//!   "IMG_7029.jpg": "50123456790"
//! }
//! ```
//!
//! Where it lives is chosen by `upload.store_uploaded_list_in_image_dir`:
//!
//! | [`LedgerLocation`] | Path |
//! |---|---|
//! | `ImageDir` | `<image dir>/.rodeo-uploaded-files.json` (one per directory) |
//! | `Shared(dir)` | `<config dir>/rodeo-uploaded-files.json` (one for everything) |
//!
//! The two choices are separate namespaces: switching location starts from
//! an empty ledger. Within one ledger, two files with the same base name
//! collide and the first one recorded wins.
//!
//! # Semantics
//!
//! - **Lookup** never fails. A missing file is an empty ledger; so is a file
//!   that can't be read or parsed (a warning is logged).
//! - **Record** is insert-if-absent: once a filename has a photo id it keeps
//!   it, even after a forced re-upload.
//! - Every record re-reads the file, merges the one new key, and writes the
//!   whole object back before returning. A crash loses at most the photo
//!   being processed. There is no locking; one process at a time.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Base name of the ledger file. Hidden with a leading `.` in image directories.
pub const LEDGER_FILENAME: &str = "rodeo-uploaded-files.json";

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where ledger files are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerLocation {
    /// A hidden ledger next to the images, one per directory.
    ImageDir,
    /// A single ledger in the given (config) directory.
    Shared(PathBuf),
}

impl LedgerLocation {
    /// Ledger file governing `image`.
    pub fn ledger_path(&self, image: &Path) -> PathBuf {
        match self {
            LedgerLocation::ImageDir => image
                .parent()
                .unwrap_or(Path::new(""))
                .join(format!(".{LEDGER_FILENAME}")),
            LedgerLocation::Shared(dir) => dir.join(LEDGER_FILENAME),
        }
    }
}

/// The ledger key for an image: its base filename.
pub fn ledger_key(image: &Path) -> String {
    image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| image.to_string_lossy().into_owned())
}

/// One ledger file. Loaded on first lookup, written through on every record.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: Option<BTreeMap<String, String>>,
}

impl Ledger {
    /// Bind to a ledger file. Nothing is read until the first lookup.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All recorded uploads.
    pub fn entries(&mut self) -> &BTreeMap<String, String> {
        self.entries.get_or_insert_with(|| read_entries(&self.path))
    }

    /// Photo id previously recorded for `basename`, if any.
    pub fn lookup(&mut self, basename: &str) -> Option<String> {
        self.entries().get(basename).cloned()
    }

    /// Record an upload. Returns `Ok(false)` without touching the file when
    /// `basename` is already recorded.
    pub fn record(&mut self, basename: &str, photo_id: &str) -> Result<bool, LedgerError> {
        let mut entries = read_entries(&self.path);
        if entries.contains_key(basename) {
            self.entries = Some(entries);
            return Ok(false);
        }

        entries.insert(basename.to_string(), photo_id.to_string());
        write_entries(&self.path, &entries)?;
        self.entries = Some(entries);
        Ok(true)
    }
}

/// Single read attempt. Anything other than a well-formed JSON object of
/// strings is an empty ledger.
fn read_entries(path: &Path) -> BTreeMap<String, String> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            log::warn!("cannot read ledger {}: {}", path.display(), e);
            return BTreeMap::new();
        }
    };
    if content.trim().is_empty() {
        return BTreeMap::new();
    }
    match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("ignoring corrupt ledger {}: {}", path.display(), e);
            BTreeMap::new()
        }
    }
}

fn write_entries(path: &Path, entries: &BTreeMap<String, String>) -> Result<(), LedgerError> {
    let io_err = |source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, json).map_err(io_err)
}

/// The ledgers touched during one run, keyed by ledger file.
///
/// With [`LedgerLocation::ImageDir`] files from several directories map to
/// several ledgers; each is loaded once and kept for the rest of the run.
#[derive(Debug)]
pub struct LedgerBook {
    location: LedgerLocation,
    ledgers: HashMap<PathBuf, Ledger>,
}

impl LedgerBook {
    pub fn new(location: LedgerLocation) -> Self {
        Self {
            location,
            ledgers: HashMap::new(),
        }
    }

    pub fn location(&self) -> &LedgerLocation {
        &self.location
    }

    fn ledger_for(&mut self, image: &Path) -> &mut Ledger {
        let path = self.location.ledger_path(image);
        self.ledgers
            .entry(path.clone())
            .or_insert_with(|| Ledger::open(path))
    }

    /// Photo id recorded for `image`, looked up by base filename.
    pub fn lookup(&mut self, image: &Path) -> Option<String> {
        let key = ledger_key(image);
        self.ledger_for(image).lookup(&key)
    }

    /// Record `image` as uploaded under `photo_id`.
    pub fn record(&mut self, image: &Path, photo_id: &str) -> Result<bool, LedgerError> {
        let key = ledger_key(image);
        self.ledger_for(image).record(&key, photo_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // Ledger basics
    // =========================================================================

    #[test]
    fn lookup_on_missing_file_is_none() {
        let tmp = TempDir::new().unwrap();
        let mut ledger = Ledger::open(tmp.path().join(LEDGER_FILENAME));
        assert_eq!(ledger.lookup("a.jpg"), None);
        assert!(!ledger.path().exists());
    }

    #[test]
    fn record_then_lookup() {
        let tmp = TempDir::new().unwrap();
        let mut ledger = Ledger::open(tmp.path().join(LEDGER_FILENAME));
        assert!(ledger.record("a.jpg", "100").unwrap());
        assert_eq!(ledger.lookup("a.jpg"), Some("100".to_string()));
    }

    #[test]
    fn record_is_insert_if_absent() {
        let tmp = TempDir::new().unwrap();
        let mut ledger = Ledger::open(tmp.path().join(LEDGER_FILENAME));
        assert_eq!(ledger.lookup("a.jpg"), None);

        assert!(ledger.record("a.jpg", "100").unwrap());
        assert_eq!(ledger.lookup("a.jpg"), Some("100".to_string()));

        assert!(!ledger.record("a.jpg", "200").unwrap());
        assert_eq!(ledger.lookup("a.jpg"), Some("100".to_string()));

        // And on disk
        let mut reopened = Ledger::open(ledger.path());
        assert_eq!(reopened.lookup("a.jpg"), Some("100".to_string()));
    }

    #[test]
    fn record_persists_immediately() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LEDGER_FILENAME);
        let mut ledger = Ledger::open(&path);
        ledger.record("a.jpg", "1").unwrap();

        let on_disk: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.get("a.jpg").map(String::as_str), Some("1"));
    }

    #[test]
    fn written_file_is_pretty_printed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LEDGER_FILENAME);
        let mut ledger = Ledger::open(&path);
        ledger.record("a.jpg", "1").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\n  \"a.jpg\": \"1\"\n}");
    }

    #[test]
    fn record_preserves_unrelated_keys() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LEDGER_FILENAME);
        fs::write(&path, r#"{"old.jpg": "7", "other.png": "8"}"#).unwrap();

        let mut ledger = Ledger::open(&path);
        ledger.record("new.jpg", "9").unwrap();

        let mut reopened = Ledger::open(&path);
        assert_eq!(reopened.entries().len(), 3);
        assert_eq!(reopened.lookup("old.jpg"), Some("7".to_string()));
        assert_eq!(reopened.lookup("new.jpg"), Some("9".to_string()));
    }

    #[test]
    fn record_merges_keys_written_since_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LEDGER_FILENAME);
        let mut ledger = Ledger::open(&path);
        assert_eq!(ledger.lookup("a.jpg"), None);

        // Someone else writes the file after our load
        fs::write(&path, r#"{"b.jpg": "2"}"#).unwrap();
        ledger.record("a.jpg", "1").unwrap();

        assert_eq!(ledger.lookup("b.jpg"), Some("2".to_string()));
        let mut reopened = Ledger::open(&path);
        assert_eq!(reopened.entries().len(), 2);
    }

    #[test]
    fn lookup_loads_once() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LEDGER_FILENAME);
        fs::write(&path, r#"{"a.jpg": "1"}"#).unwrap();

        let mut ledger = Ledger::open(&path);
        assert_eq!(ledger.lookup("a.jpg"), Some("1".to_string()));

        fs::remove_file(&path).unwrap();
        assert_eq!(ledger.lookup("a.jpg"), Some("1".to_string()));
    }

    // =========================================================================
    // Tolerated bad input
    // =========================================================================

    #[test]
    fn corrupt_file_is_empty_ledger() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LEDGER_FILENAME);
        fs::write(&path, "not json").unwrap();

        let mut ledger = Ledger::open(&path);
        assert_eq!(ledger.lookup("a.jpg"), None);
    }

    #[test]
    fn empty_file_is_empty_ledger() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LEDGER_FILENAME);
        fs::write(&path, "").unwrap();

        let mut ledger = Ledger::open(&path);
        assert_eq!(ledger.lookup("a.jpg"), None);
        assert!(ledger.record("a.jpg", "1").unwrap());
        assert_eq!(Ledger::open(&path).lookup("a.jpg"), Some("1".to_string()));
    }

    #[test]
    fn non_object_json_is_empty_ledger() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LEDGER_FILENAME);
        fs::write(&path, r#"["a.jpg"]"#).unwrap();

        let mut ledger = Ledger::open(&path);
        assert!(ledger.entries().is_empty());
    }

    #[test]
    fn compact_json_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LEDGER_FILENAME);
        fs::write(&path, r#"{"a.jpg":"1"}"#).unwrap();
        assert_eq!(Ledger::open(&path).lookup("a.jpg"), Some("1".to_string()));
    }

    #[test]
    fn record_creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config/rodeo").join(LEDGER_FILENAME);
        let mut ledger = Ledger::open(&path);
        ledger.record("a.jpg", "1").unwrap();
        assert!(path.exists());
    }

    // =========================================================================
    // Locations and LedgerBook
    // =========================================================================

    #[test]
    fn image_dir_ledger_is_hidden_next_to_image() {
        let path = LedgerLocation::ImageDir.ledger_path(Path::new("/photos/2024/a.jpg"));
        assert_eq!(
            path,
            PathBuf::from("/photos/2024/.rodeo-uploaded-files.json")
        );
    }

    #[test]
    fn image_dir_ledger_for_bare_filename() {
        let path = LedgerLocation::ImageDir.ledger_path(Path::new("a.jpg"));
        assert_eq!(path, PathBuf::from(".rodeo-uploaded-files.json"));
    }

    #[test]
    fn shared_ledger_ignores_image_directory() {
        let loc = LedgerLocation::Shared(PathBuf::from("/home/me/.config/rodeo"));
        assert_eq!(
            loc.ledger_path(Path::new("/a/x.jpg")),
            loc.ledger_path(Path::new("/b/y.jpg"))
        );
    }

    #[test]
    fn ledger_key_is_base_filename() {
        assert_eq!(ledger_key(Path::new("/photos/2024/IMG_1.jpg")), "IMG_1.jpg");
        assert_eq!(ledger_key(Path::new("IMG_1.jpg")), "IMG_1.jpg");
    }

    #[test]
    fn book_keeps_directories_apart_with_image_dir() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a/same.jpg");
        let b = tmp.path().join("b/same.jpg");
        fs::create_dir_all(a.parent().unwrap()).unwrap();
        fs::create_dir_all(b.parent().unwrap()).unwrap();

        let mut book = LedgerBook::new(LedgerLocation::ImageDir);
        book.record(&a, "1").unwrap();

        assert_eq!(book.lookup(&a), Some("1".to_string()));
        assert_eq!(book.lookup(&b), None);
        assert!(tmp.path().join("a/.rodeo-uploaded-files.json").exists());
        assert!(!tmp.path().join("b/.rodeo-uploaded-files.json").exists());
    }

    #[test]
    fn book_collides_same_basename_in_shared_ledger() {
        let tmp = TempDir::new().unwrap();
        let mut book = LedgerBook::new(LedgerLocation::Shared(tmp.path().to_path_buf()));

        book.record(Path::new("/a/same.jpg"), "1").unwrap();
        assert!(!book.record(Path::new("/b/same.jpg"), "2").unwrap());
        assert_eq!(book.lookup(Path::new("/b/same.jpg")), Some("1".to_string()));
    }

    #[test]
    fn locations_are_independent_namespaces() {
        let tmp = TempDir::new().unwrap();
        let image = tmp.path().join("img/a.jpg");
        fs::create_dir_all(image.parent().unwrap()).unwrap();

        let mut shared = LedgerBook::new(LedgerLocation::Shared(tmp.path().join("cfg")));
        shared.record(&image, "1").unwrap();

        let mut local = LedgerBook::new(LedgerLocation::ImageDir);
        assert_eq!(local.lookup(&image), None);
    }
}
