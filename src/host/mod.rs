//! Photo hosting: the [`PhotoHost`] trait and its Flickr implementation.
//!
//! | Operation | Flickr API |
//! |---|---|
//! | [`upload`](PhotoHost::upload) | `POST up.flickr.com/services/upload/` (multipart) |
//! | [`create_album`](PhotoHost::create_album) | `flickr.photosets.create` |
//! | [`add_photo_to_album`](PhotoHost::add_photo_to_album) | `flickr.photosets.addPhoto` |
//! | [`set_posted_date`](PhotoHost::set_posted_date) | `flickr.photos.setDates` |
//! | [`list_albums`](PhotoHost::list_albums) | `flickr.photosets.getList` (all pages) |
//!
//! Every request is OAuth 1.0a signed; see [`oauth`]. Nothing is retried.

pub mod flickr;
pub mod oauth;

pub use flickr::FlickrClient;

use crate::rules::{AlbumRef, Permissions};
use chrono::{DateTime, FixedOffset};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Flickr API error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("'{query}' matches {} albums: {}", .matches.len(), format_matches(.matches))]
    AmbiguousAlbum {
        query: String,
        matches: Vec<RemoteAlbum>,
    },
}

fn format_matches(matches: &[RemoteAlbum]) -> String {
    matches
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One photo to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub privacy: Permissions,
}

/// An album (photoset) that exists on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAlbum {
    pub id: String,
    pub title: String,
    pub photos: u32,
}

impl fmt::Display for RemoteAlbum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.id)
    }
}

impl From<&RemoteAlbum> for AlbumRef {
    fn from(album: &RemoteAlbum) -> Self {
        AlbumRef::existing(album.id.clone(), album.title.clone())
    }
}

/// A photo hosting service.
pub trait PhotoHost {
    /// Upload a file. Returns the new photo id.
    fn upload(&self, request: &UploadRequest) -> Result<String, HostError>;

    /// Create an album with `primary_photo_id` as its cover. Returns the album id.
    fn create_album(&self, title: &str, primary_photo_id: &str) -> Result<String, HostError>;

    fn add_photo_to_album(&self, album_id: &str, photo_id: &str) -> Result<(), HostError>;

    /// Move the photo to `posted` in the photostream.
    fn set_posted_date(
        &self,
        photo_id: &str,
        posted: DateTime<FixedOffset>,
    ) -> Result<(), HostError>;

    /// Every album of the authenticated user.
    fn list_albums(&self) -> Result<Vec<RemoteAlbum>, HostError>;
}

// =============================================================================
// Album lookup for --album / --create-album
// =============================================================================

/// Albums whose id equals `query` or whose title contains it, ignoring case.
pub fn find_albums<'a>(albums: &'a [RemoteAlbum], query: &str) -> Vec<&'a RemoteAlbum> {
    let needle = query.to_lowercase();
    albums
        .iter()
        .filter(|a| a.id == query || a.title.to_lowercase().contains(&needle))
        .collect()
}

/// Resolve `--album`: exactly one match is used, no match means a new
/// album called `query`, several matches are an error.
pub fn select_album(albums: &[RemoteAlbum], query: &str) -> Result<AlbumRef, HostError> {
    match find_albums(albums, query).as_slice() {
        [] => Ok(AlbumRef::to_create(query)),
        [one] => Ok(AlbumRef::from(*one)),
        many => Err(HostError::AmbiguousAlbum {
            query: query.to_string(),
            matches: many.iter().map(|a| (*a).clone()).collect(),
        }),
    }
}

/// Resolve `--create-album`: the first matching album, else a new one.
pub fn album_for_creation(albums: &[RemoteAlbum], name: &str) -> AlbumRef {
    find_albums(albums, name)
        .first()
        .map(|a| AlbumRef::from(*a))
        .unwrap_or_else(|| AlbumRef::to_create(name))
}

// =============================================================================
// Links
// =============================================================================

pub fn photostream_url(user: &str) -> String {
    format!("https://www.flickr.com/photos/{user}")
}

pub fn photo_url(user: &str, photo_id: &str) -> String {
    format!("https://www.flickr.com/photos/{user}/{photo_id}")
}

/// Flickr's bulk editor, preloaded with `photo_ids`.
pub fn edit_url(photo_ids: &[String]) -> String {
    format!(
        "https://www.flickr.com/photos/upload/edit/?ids={}",
        photo_ids.join(",")
    )
}
