//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Upload
//!
//! ```text
//! [1/2] dawn.jpg
//!     Title: Dawn
//!     Remove keywords: private
//!     Tags: beach, family
//!     Privacy: Family: false, Friends: false, Public: false
//!     Albums: Summer (721001)
//!     Uploaded as 53012345678
//!         https://www.flickr.com/photos/me/53012345678
//!     Added to album Summer (721001)
//! [2/2] dusk.jpg
//!     Already uploaded as 53012345600
//!         https://www.flickr.com/photos/me/53012345600
//!
//! Uploaded 1, already uploaded 1, skipped 0
//! View: https://www.flickr.com/photos/me
//! Edit: https://www.flickr.com/photos/upload/edit/?ids=53012345678
//! ```
//!
//! ## Albums
//!
//! ```text
//! 1: Svalbard 2019 (721001)
//! 2: Family (721003)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::{Config, ResizeBackendKind};
use crate::host::{self, RemoteAlbum};
use crate::metadata::ImageRecord;
use crate::publish::{PublishEvent, PublishSummary};
use crate::rules::{AlbumRef, Condition, Rule};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// File name for display, falling back to the whole path.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

fn albums_line(albums: &[AlbumRef]) -> String {
    let names: Vec<String> = albums.iter().map(|a| a.to_string()).collect();
    join_or_none(&names)
}

// ============================================================================
// Upload progress
// ============================================================================

/// Format one publish event. `user` (Flickr user name or NSID) is used for
/// photo links; empty means no links.
pub fn format_publish_event(event: &PublishEvent, user: &str) -> Vec<String> {
    let link = |photo_id: &str| -> Option<String> {
        (!user.is_empty()).then(|| format!("{}{}", indent(2), host::photo_url(user, photo_id)))
    };

    match event {
        PublishEvent::FileStarted { index, total, path } => {
            vec![format!("[{}/{}] {}", index, total, display_name(path))]
        }
        PublishEvent::AlreadyUploaded { photo_id, .. } => {
            let mut lines = vec![format!("{}Already uploaded as {}", indent(1), photo_id)];
            lines.extend(link(photo_id));
            lines
        }
        PublishEvent::ForcingUpload { photo_id, .. } => vec![format!(
            "{}Already uploaded as {}, uploading again",
            indent(1),
            photo_id
        )],
        PublishEvent::Converted { jpeg, .. } => {
            vec![format!("{}Converted to {}", indent(1), display_name(jpeg))]
        }
        PublishEvent::Planned { title, plan, .. } => {
            let mut lines = vec![format!("{}Title: {}", indent(1), title)];
            if !plan.keywords_to_remove.is_empty() {
                lines.push(format!(
                    "{}Remove keywords: {}",
                    indent(1),
                    plan.keywords_to_remove.join(", ")
                ));
            }
            lines.push(format!(
                "{}Tags: {}",
                indent(1),
                join_or_none(&plan.keywords_to_keep)
            ));
            lines.push(format!("{}Privacy: {}", indent(1), plan.privacy));
            if !plan.albums.is_empty() {
                lines.push(format!("{}Albums: {}", indent(1), albums_line(&plan.albums)));
            }
            lines
        }
        PublishEvent::WouldUpload { .. } => {
            vec![format!("{}Dry run, not uploaded", indent(1))]
        }
        PublishEvent::Uploaded { photo_id, .. } => {
            let mut lines = vec![format!("{}Uploaded as {}", indent(1), photo_id)];
            lines.extend(link(photo_id));
            lines
        }
        PublishEvent::DatePosted { posted, .. } => vec![format!(
            "{}Date posted: {}",
            indent(1),
            posted.format("%Y-%m-%d %H:%M:%S %:z")
        )],
        PublishEvent::AddedToAlbum { album, created, .. } => {
            let verb = if *created { "Created album" } else { "Added to album" };
            vec![format!("{}{} {}", indent(1), verb, album)]
        }
        PublishEvent::Skipped { reason, .. } => {
            vec![format!("{}Skipped: {}", indent(1), reason)]
        }
        PublishEvent::Warning { message, .. } => {
            vec![format!("{}Warning: {}", indent(1), message)]
        }
    }
}

/// Totals plus photostream and bulk-edit links for new uploads.
pub fn format_summary(summary: &PublishSummary, user: &str) -> Vec<String> {
    let mut lines = vec![String::new()];
    if summary.dry_run > 0 {
        lines.push(format!(
            "Dry run: {} would be uploaded, already uploaded {}, skipped {}",
            summary.dry_run, summary.already_uploaded, summary.skipped
        ));
    } else {
        lines.push(format!(
            "Uploaded {}, already uploaded {}, skipped {}",
            summary.uploaded.len(),
            summary.already_uploaded,
            summary.skipped
        ));
    }
    if !summary.uploaded.is_empty() {
        if !user.is_empty() {
            lines.push(format!("View: {}", host::photostream_url(user)));
        }
        lines.push(format!("Edit: {}", host::edit_url(&summary.uploaded)));
    }
    lines
}

pub fn print_summary(summary: &PublishSummary, user: &str) {
    for line in format_summary(summary, user) {
        println!("{}", line);
    }
}

// ============================================================================
// Resize
// ============================================================================

pub fn format_resized(source: &Path, output: &Path) -> Vec<String> {
    vec![format!("{} → {}", display_name(source), output.display())]
}

// ============================================================================
// Info
// ============================================================================

/// Everything `exiftool` told us about one image. Keywords are sorted.
pub fn format_info(path: &Path, record: &ImageRecord) -> Vec<String> {
    let mut lines = vec![path.display().to_string()];
    let field = |label: &str, value: &str| format!("{}{}: {}", indent(1), label, value);

    if !record.title.trim().is_empty() {
        lines.push(field("Title", record.title.trim()));
    }
    if !record.description.trim().is_empty() {
        lines.push(field("Description", record.description.trim()));
    }

    let mut keywords = record.keywords.clone();
    keywords.sort();
    lines.push(field("Keywords", &join_or_none(&keywords)));

    if let (Some(w), Some(h)) = (record.width, record.height) {
        lines.push(field("Dimensions", &format!("{}x{}", w, h)));
    }
    if let Some(taken) = record.captured_at {
        lines.push(field(
            "Taken",
            &taken.format("%Y-%m-%d %H:%M:%S %:z").to_string(),
        ));
    }

    let camera = &record.camera;
    let body = format!("{} {}", camera.make.trim(), camera.model.trim());
    if !body.trim().is_empty() {
        lines.push(field("Camera", body.trim()));
    }

    let mut exposure = Vec::new();
    if !camera.shutter_speed.is_empty() {
        exposure.push(format!("{}s", camera.shutter_speed));
    }
    if !camera.aperture.is_empty() {
        exposure.push(format!("f/{}", camera.aperture));
    }
    if !camera.iso.is_empty() {
        exposure.push(format!("ISO {}", camera.iso));
    }
    if !exposure.is_empty() {
        lines.push(field("Exposure", &exposure.join(" ")));
    }
    lines
}

pub fn print_info(path: &Path, record: &ImageRecord) {
    for line in format_info(path, record) {
        println!("{}", line);
    }
}

// ============================================================================
// Albums
// ============================================================================

/// `N: Title (id)`, numbered from 1.
pub fn format_album_list(albums: &[RemoteAlbum]) -> Vec<String> {
    albums
        .iter()
        .enumerate()
        .map(|(i, a)| format!("{}: {}", i + 1, a))
        .collect()
}

pub fn print_album_list(albums: &[RemoteAlbum]) {
    for line in format_album_list(albums) {
        println!("{}", line);
    }
}

// ============================================================================
// Config
// ============================================================================

fn condition_line(condition: &Condition) -> String {
    let parts: Vec<String> = [
        ("includes_any", &condition.includes_any),
        ("includes_all", &condition.includes_all),
        ("excludes_any", &condition.excludes_any),
        ("excludes_all", &condition.excludes_all),
    ]
    .iter()
    .filter(|(_, list)| !list.is_empty())
    .map(|(name, list)| format!("{} [{}]", name, list.join(", ")))
    .collect();
    join_or_none(&parts)
}

fn rule_lines(index: usize, rule: &Rule) -> Vec<String> {
    let mut lines = vec![
        format!("{}{} {}", indent(1), format_index(index), rule.name),
        format!("{}Condition: {}", indent(2), condition_line(&rule.condition)),
    ];
    let action = &rule.action;
    if action.delete {
        lines.push(format!("{}Delete matched keywords", indent(2)));
    }
    if let Some(privacy) = action.privacy {
        lines.push(format!("{}Privacy: {}", indent(2), privacy));
    }
    if !action.albums.is_empty() {
        lines.push(format!("{}Albums: {}", indent(2), albums_line(&action.albums)));
    }
    lines
}

/// Summary of the effective configuration.
pub fn format_config(config_path: &Path, config: &Config) -> Vec<String> {
    let flickr = &config.flickr;
    let mut lines = vec![
        "Config".to_string(),
        format!("{}{}", indent(1), config_path.display()),
        String::new(),
        "Flickr".to_string(),
    ];

    let identity = match (flickr.username.is_empty(), flickr.user_nsid.is_empty()) {
        (true, true) => "(not set)".to_string(),
        (false, true) => flickr.username.clone(),
        (true, false) => flickr.user_nsid.clone(),
        (false, false) => format!("{} ({})", flickr.username, flickr.user_nsid),
    };
    lines.push(format!("{}User: {}", indent(1), identity));
    if !flickr.full_name.is_empty() {
        lines.push(format!("{}Name: {}", indent(1), flickr.full_name));
    }
    lines.push(format!(
        "{}Credentials: {}",
        indent(1),
        match flickr.require_credentials() {
            Ok(()) => "configured".to_string(),
            Err(e) => e.to_string(),
        }
    ));

    let tool = |path: &str| {
        if path.trim().is_empty() {
            "(not set)".to_string()
        } else {
            path.to_string()
        }
    };
    lines.push(String::new());
    lines.push("Tools".to_string());
    lines.push(format!("{}convert: {}", indent(1), tool(&config.cmd.convert)));
    lines.push(format!("{}exiftool: {}", indent(1), tool(&config.cmd.exiftool)));

    lines.push(String::new());
    lines.push("Upload".to_string());
    lines.push(format!(
        "{}Set date posted: {}",
        indent(1),
        yes_no(config.upload.set_date_posted)
    ));
    lines.push(format!(
        "{}Ledger: {}",
        indent(1),
        if config.upload.store_uploaded_list_in_image_dir {
            "in each image directory"
        } else {
            "shared, in the config directory"
        }
    ));

    let resize = &config.resize;
    let backend = match resize.backend {
        ResizeBackendKind::Convert => "convert",
        ResizeBackendKind::Native => "native",
    };
    lines.push(String::new());
    lines.push("Resize".to_string());
    lines.push(format!(
        "{}{} {} {} quality {}",
        indent(1),
        backend,
        resize.scale,
        resize.method,
        resize.quality
    ));

    lines.push(String::new());
    lines.push(format!("Rules ({})", config.rules.len()));
    for (i, rule) in config.rules.iter().enumerate() {
        lines.extend(rule_lines(i + 1, rule));
    }
    lines
}

pub fn print_config(config_path: &Path, config: &Config) {
    for line in format_config(config_path, config) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
