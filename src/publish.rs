//! Publish orchestration: one file at a time from disk to Flickr.
//!
//! For each input file:
//!
//! 1. **Ledger**: already recorded and not `--force` → skip.
//! 2. **TIFF**: converted to `<stem>.jpeg` in a scratch directory, removed
//!    afterwards. The source's own folder is never written to.
//! 3. **Metadata**: read from the original file.
//! 4. **Rules**: resolved against its keywords. The `--album` album goes first.
//! 5. **Plan**: reported. `--dry-run` stops here.
//! 6. **Strip**: removed keywords are deleted from the file being uploaded.
//! 7. **Upload** with the kept keywords as tags.
//! 8. **Ledger**: recorded under the original base filename.
//! 9. **Date**: posted date set to the capture time, if configured.
//! 10. **Albums**: attached, creating albums that have no id. An album
//!     created earlier in the run is reused by name.
//!
//! ## Failure policy
//!
//! | Step | On error |
//! |---|---|
//! | TIFF conversion, metadata, upload | file skipped, run continues |
//! | Strip, ledger write, date, albums, temp removal | warning, file still counts as uploaded |
//!
//! Progress is reported as [`PublishEvent`]s over an optional channel; the
//! CLI prints them on a separate thread.

use crate::host::{PhotoHost, UploadRequest};
use crate::imaging::{self, ImageBackend};
use crate::ledger::LedgerBook;
use crate::metadata::MetadataTool;
use crate::naming;
use crate::rules::{self, AlbumRef, Resolution, Rule};
use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use tempfile::TempDir;

/// Command-line switches for one `upload` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Upload even if the ledger has the file.
    pub force: bool,
    /// Report the plan, change nothing.
    pub dry_run: bool,
    /// Album from `--album` / `--create-album`, placed before rule albums.
    pub album: Option<AlbumRef>,
    /// Set the posted date to the capture time after upload.
    pub set_date_posted: bool,
}

/// Progress reported while publishing.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishEvent {
    FileStarted {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    AlreadyUploaded {
        path: PathBuf,
        photo_id: String,
    },
    ForcingUpload {
        path: PathBuf,
        photo_id: String,
    },
    Converted {
        source: PathBuf,
        jpeg: PathBuf,
    },
    Planned {
        path: PathBuf,
        title: String,
        plan: Resolution,
    },
    WouldUpload {
        path: PathBuf,
    },
    Uploaded {
        path: PathBuf,
        photo_id: String,
        title: String,
    },
    DatePosted {
        photo_id: String,
        posted: DateTime<FixedOffset>,
    },
    AddedToAlbum {
        photo_id: String,
        album: AlbumRef,
        created: bool,
    },
    Skipped {
        path: PathBuf,
        reason: String,
    },
    Warning {
        path: PathBuf,
        message: String,
    },
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Uploaded(String),
    AlreadyUploaded(String),
    DryRun,
    Skipped,
}

/// Totals for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishSummary {
    /// New photo ids, in upload order.
    pub uploaded: Vec<String>,
    pub already_uploaded: usize,
    pub dry_run: usize,
    pub skipped: usize,
}

impl PublishSummary {
    fn add(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Uploaded(id) => self.uploaded.push(id),
            FileOutcome::AlreadyUploaded(_) => self.already_uploaded += 1,
            FileOutcome::DryRun => self.dry_run += 1,
            FileOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Publishes files with a fixed set of collaborators and options.
pub struct Publisher<'a> {
    rules: &'a [Rule],
    metadata: &'a dyn MetadataTool,
    host: &'a dyn PhotoHost,
    backend: &'a dyn ImageBackend,
    ledger: LedgerBook,
    options: PublishOptions,
    /// Album name → id for albums created during this run.
    created_albums: HashMap<String, String>,
    events: Option<Sender<PublishEvent>>,
}

impl<'a> Publisher<'a> {
    pub fn new(
        rules: &'a [Rule],
        metadata: &'a dyn MetadataTool,
        host: &'a dyn PhotoHost,
        backend: &'a dyn ImageBackend,
        ledger: LedgerBook,
        options: PublishOptions,
    ) -> Self {
        Self {
            rules,
            metadata,
            host,
            backend,
            ledger,
            options,
            created_albums: HashMap::new(),
            events: None,
        }
    }

    /// Send progress to `tx`. Dropping the publisher closes the channel.
    pub fn with_events(mut self, tx: Sender<PublishEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    fn emit(&self, event: PublishEvent) {
        if let Some(tx) = &self.events {
            // The printer may have gone away; progress is not essential
            tx.send(event).ok();
        }
    }

    fn warn(&self, path: &Path, message: String) {
        self.emit(PublishEvent::Warning {
            path: path.to_path_buf(),
            message,
        });
    }

    fn skip(&self, path: &Path, reason: String) -> FileOutcome {
        self.emit(PublishEvent::Skipped {
            path: path.to_path_buf(),
            reason,
        });
        FileOutcome::Skipped
    }

    /// Publish every file in order.
    pub fn publish_all(&mut self, paths: &[PathBuf]) -> PublishSummary {
        let mut summary = PublishSummary::default();
        for (i, path) in paths.iter().enumerate() {
            self.emit(PublishEvent::FileStarted {
                index: i + 1,
                total: paths.len(),
                path: path.clone(),
            });
            summary.add(self.publish_file(path));
        }
        summary
    }

    /// Publish one file.
    pub fn publish_file(&mut self, path: &Path) -> FileOutcome {
        if let Some(photo_id) = self.ledger.lookup(path) {
            if !self.options.force {
                self.emit(PublishEvent::AlreadyUploaded {
                    path: path.to_path_buf(),
                    photo_id: photo_id.clone(),
                });
                return FileOutcome::AlreadyUploaded(photo_id);
            }
            self.emit(PublishEvent::ForcingUpload {
                path: path.to_path_buf(),
                photo_id,
            });
        }

        let scratch = if naming::is_tiff(path) && !self.options.dry_run {
            match self.convert_to_scratch(path) {
                Ok(scratch) => Some(scratch),
                Err(reason) => return self.skip(path, reason),
            }
        } else {
            None
        };

        let upload_path = scratch.as_ref().map_or(path, |(_, jpeg)| jpeg.as_path());
        let outcome = self.publish_prepared(path, upload_path);

        if let Some((dir, _)) = scratch
            && let Err(e) = dir.close()
        {
            self.warn(path, format!("cannot remove temporary JPEG: {e}"));
        }
        outcome
    }

    /// Convert a TIFF into a fresh scratch directory. Nothing is written next
    /// to the source, so an existing `<stem>.jpeg` there is left alone.
    fn convert_to_scratch(&self, path: &Path) -> Result<(TempDir, PathBuf), String> {
        let dir = tempfile::Builder::new()
            .prefix("rodeo-")
            .tempdir()
            .map_err(|e| format!("cannot create temporary directory: {e}"))?;
        let jpeg = imaging::convert_tiff_to_jpeg(self.backend, path, dir.path())
            .map_err(|e| format!("cannot convert to JPEG: {e}"))?;
        self.emit(PublishEvent::Converted {
            source: path.to_path_buf(),
            jpeg: jpeg.clone(),
        });
        Ok((dir, jpeg))
    }

    /// Steps 3-10. `original` names the file for the ledger and titles;
    /// `upload_path` is the file actually sent.
    fn publish_prepared(&mut self, original: &Path, upload_path: &Path) -> FileOutcome {
        let record = match self.metadata.extract(original) {
            Ok(record) => record,
            Err(e) => return self.skip(original, format!("cannot read metadata: {e}")),
        };

        let mut plan = rules::resolve(self.rules, &record.keywords);
        if let Some(album) = &self.options.album {
            plan.prepend_album(album.clone());
        }
        let title = naming::upload_title(&record.title, original);
        self.emit(PublishEvent::Planned {
            path: original.to_path_buf(),
            title: title.clone(),
            plan: plan.clone(),
        });

        if self.options.dry_run {
            self.emit(PublishEvent::WouldUpload {
                path: original.to_path_buf(),
            });
            return FileOutcome::DryRun;
        }

        if !plan.keywords_to_remove.is_empty()
            && let Err(e) = self
                .metadata
                .remove_keywords(upload_path, &plan.keywords_to_remove)
        {
            self.warn(original, format!("cannot strip keywords: {e}"));
        }

        let request = UploadRequest {
            path: upload_path.to_path_buf(),
            title: title.clone(),
            description: record.description.clone(),
            tags: plan.keywords_to_keep.clone(),
            privacy: plan.privacy,
        };
        let photo_id = match self.host.upload(&request) {
            Ok(id) => id,
            Err(e) => return self.skip(original, format!("upload failed: {e}")),
        };
        self.emit(PublishEvent::Uploaded {
            path: original.to_path_buf(),
            photo_id: photo_id.clone(),
            title,
        });

        match self.ledger.record(original, &photo_id) {
            Ok(true) => {}
            Ok(false) => log::debug!(
                "{} already in ledger, keeping the earlier photo id",
                original.display()
            ),
            Err(e) => self.warn(original, format!("cannot record upload: {e}")),
        }

        if self.options.set_date_posted
            && let Some(taken) = record.captured_at
        {
            match self.host.set_posted_date(&photo_id, taken) {
                Ok(()) => self.emit(PublishEvent::DatePosted {
                    photo_id: photo_id.clone(),
                    posted: taken,
                }),
                Err(e) => self.warn(original, format!("cannot set date posted: {e}")),
            }
        }

        for album in &plan.albums {
            self.add_to_album(original, &photo_id, album);
        }

        FileOutcome::Uploaded(photo_id)
    }

    fn add_to_album(&mut self, path: &Path, photo_id: &str, album: &AlbumRef) {
        let known_id = album
            .remote_id()
            .map(String::from)
            .or_else(|| self.created_albums.get(&album.name).cloned());

        match known_id {
            Some(id) => match self.host.add_photo_to_album(&id, photo_id) {
                Ok(()) => self.emit(PublishEvent::AddedToAlbum {
                    photo_id: photo_id.to_string(),
                    album: AlbumRef::existing(id, album.name.clone()),
                    created: false,
                }),
                Err(e) => self.warn(path, format!("cannot add to album {album}: {e}")),
            },
            None => match self.host.create_album(&album.name, photo_id) {
                Ok(id) => {
                    self.created_albums.insert(album.name.clone(), id.clone());
                    self.emit(PublishEvent::AddedToAlbum {
                        photo_id: photo_id.to_string(),
                        album: AlbumRef::existing(id, album.name.clone()),
                        created: true,
                    });
                }
                Err(e) => self.warn(path, format!("cannot create album {}: {e}", album.name)),
            },
        }
    }
}
