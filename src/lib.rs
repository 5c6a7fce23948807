//! # Rodeo
//!
//! Publish photos to Flickr, letting the keywords embedded in each file
//! decide what happens to it. Rules in `rodeo.toml` match keywords and can
//! strip them before upload, restrict who sees the photo, and file it into
//! albums.
//!
//! # Pipeline
//!
//! ```text
//! file ─► ledger ─► (TIFF → JPEG) ─► exiftool ─► rules ─► strip ─► upload ─► ledger
//!                                                                     └─► date, albums
//! ```
//!
//! Files are published one at a time. Progress is reported as
//! [`publish::PublishEvent`]s, which the CLI prints as they arrive.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`keywords`] | Set algebra over keyword lists: dedup, intersection, difference |
//! | [`rules`] | Rule model, evaluation, and the fold into a [`rules::Resolution`] |
//! | [`ledger`] | JSON record of uploaded files, so reruns skip them |
//! | [`publish`] | Per-file orchestration and its failure policy |
//! | [`metadata`] | `exiftool` reading and keyword stripping |
//! | [`imaging`] | Web resizing and TIFF conversion, ImageMagick or pure Rust |
//! | [`host`] | The [`host::PhotoHost`] trait and the OAuth-signed Flickr client |
//! | [`config`] | `rodeo.toml` loading, merging onto stock defaults, validation |
//! | [`naming`] | Upload titles and derived file names |
//! | [`output`] | CLI output formatting |
//!
//! # Rules
//!
//! A rule fires when its condition holds for an image's keyword set. All
//! fired rules contribute, in order:
//!
//! - `delete` moves the matched keywords from "keep" to "remove";
//! - `privacy` replaces the permissions (last rule wins);
//! - `albums` are appended, without repeats.
//!
//! A rule with an empty condition never fires.

pub mod config;
pub mod host;
pub mod imaging;
pub mod keywords;
pub mod ledger;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod publish;
pub mod rules;

#[cfg(test)]
pub(crate) mod test_helpers;
