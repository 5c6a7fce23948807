//! Configuration module.
//!
//! Handles loading, validating, and merging `rodeo.toml`. Stock defaults are
//! serialized to a TOML table and the user file is merged on top, so the file
//! only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! `~/.config/rodeo/rodeo.toml` unless `--config <FILE>` says otherwise. The
//! same directory holds the shared upload ledger. A missing file means stock
//! defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! [cmd]
//! convert = "/usr/local/bin/convert"  # ImageMagick, for resize and TIFF conversion
//! exiftool = ""                       # Required for upload and info
//!
//! [flickr]
//! api_key = ""
//! api_secret = ""
//! oauth_token = ""
//! oauth_token_secret = ""
//! user_nsid = ""
//! username = ""
//! full_name = ""
//!
//! [upload]
//! set_date_posted = false             # Post date := capture date
//! store_uploaded_list_in_image_dir = false
//!
//! [resize]
//! backend = "convert"                 # or "native"
//! scale = "2000x2000"                 # Bounding box, WxH
//! method = "catrom"
//! quality = 75
//!
//! [[rules]]
//! name = "Private"
//! condition = { includes_any = ["private"] }
//! action = { delete = true, privacy = { family = false, friends = false, public = false } }
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Interpolation, Scale};
use crate::ledger::LedgerLocation;
use crate::rules::Rule;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the config inside [`config_dir`].
pub const CONFIG_FILENAME: &str = "rodeo.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("{0} is not configured")]
    MissingTool(&'static str),
    #[error("Flickr credentials are not configured (missing {0})")]
    MissingCredentials(&'static str),
}

/// Everything `rodeo.toml` can set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// External tool locations.
    pub cmd: CmdConfig,
    /// Flickr API credentials and identity.
    pub flickr: FlickrConfig,
    /// Upload behaviour.
    pub upload: UploadConfig,
    /// Web resize settings.
    pub resize: ResizeConfig,
    /// Keyword rules, evaluated in order.
    pub rules: Vec<Rule>,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resize.quality == 0 || self.resize.quality > 100 {
            return Err(ConfigError::Validation(
                "resize.quality must be 1-100".into(),
            ));
        }
        Scale::parse(&self.resize.scale).map_err(ConfigError::Validation)?;
        self.resize
            .method
            .parse::<Interpolation>()
            .map_err(ConfigError::Validation)?;

        for (i, rule) in self.rules.iter().enumerate() {
            if rule.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "rules[{i}] must have a name"
                )));
            }
            if rule
                .action
                .albums
                .iter()
                .any(|a| a.remote_id().is_none() && a.name.trim().is_empty())
            {
                return Err(ConfigError::Validation(format!(
                    "rule '{}': every album needs an id or a name",
                    rule.name
                )));
            }
        }
        Ok(())
    }

    /// Path to exiftool, or an error if it isn't configured.
    pub fn require_exiftool(&self) -> Result<&str, ConfigError> {
        non_empty(&self.cmd.exiftool).ok_or(ConfigError::MissingTool("cmd.exiftool"))
    }

    /// Path to ImageMagick `convert`, or an error if it isn't configured.
    pub fn require_convert(&self) -> Result<&str, ConfigError> {
        non_empty(&self.cmd.convert).ok_or(ConfigError::MissingTool("cmd.convert"))
    }

    /// Where upload ledgers live for this configuration.
    pub fn ledger_location(&self, config_dir: &Path) -> LedgerLocation {
        if self.upload.store_uploaded_list_in_image_dir {
            LedgerLocation::ImageDir
        } else {
            LedgerLocation::Shared(config_dir.to_path_buf())
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

/// External tool locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CmdConfig {
    /// ImageMagick `convert` binary.
    pub convert: String,
    /// `exiftool` binary.
    pub exiftool: String,
}

impl Default for CmdConfig {
    fn default() -> Self {
        Self {
            convert: "/usr/local/bin/convert".to_string(),
            exiftool: String::new(),
        }
    }
}

/// Flickr API credentials plus the identity they belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlickrConfig {
    pub api_key: String,
    pub api_secret: String,
    pub oauth_token: String,
    pub oauth_token_secret: String,
    /// Flickr user id, e.g. `12345678@N00`.
    pub user_nsid: String,
    pub username: String,
    pub full_name: String,
}

impl FlickrConfig {
    /// Fail with the first missing credential.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        let required = [
            ("flickr.api_key", &self.api_key),
            ("flickr.api_secret", &self.api_secret),
            ("flickr.oauth_token", &self.oauth_token),
            ("flickr.oauth_token_secret", &self.oauth_token_secret),
        ];
        match required.iter().find(|(_, v)| v.trim().is_empty()) {
            Some((key, _)) => Err(ConfigError::MissingCredentials(key)),
            None => Ok(()),
        }
    }
}

/// Upload behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Set Flickr's "posted" date to the capture date after upload.
    pub set_date_posted: bool,
    /// Keep a hidden ledger in each image directory instead of one shared
    /// ledger in the config directory.
    pub store_uploaded_list_in_image_dir: bool,
}

/// Which [`ImageBackend`](crate::imaging::ImageBackend) does resizing and conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeBackendKind {
    /// ImageMagick `convert`, at `cmd.convert`.
    #[default]
    Convert,
    /// The built-in `image` crate backend.
    Native,
}

/// Web resize settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub backend: ResizeBackendKind,
    /// Bounding box the output must fit in, as `WxH`.
    pub scale: String,
    /// Interpolation filter name.
    pub method: String,
    /// JPEG quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            backend: ResizeBackendKind::Convert,
            scale: "2000x2000".to_string(),
            method: "catrom".to_string(),
            quality: 75,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// `~/.config/rodeo`. Holds the config file and the shared ledger.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".config")
        .join("rodeo")
}

/// `~/.config/rodeo/rodeo.toml`.
pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILENAME)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely. A user
///   `[[rules]]` array replaces the (empty) stock one.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `rodeo.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Rodeo Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Default location: ~/.config/rodeo/rodeo.toml
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# External tools
# ---------------------------------------------------------------------------
[cmd]
# ImageMagick convert, used by `rodeo resize` and for TIFF -> JPEG before upload.
convert = "/usr/local/bin/convert"

# exiftool, required by `rodeo upload` and `rodeo info`.
exiftool = ""

# ---------------------------------------------------------------------------
# Flickr
# ---------------------------------------------------------------------------
[flickr]
# API key and secret from https://www.flickr.com/services/apps/create/
api_key = ""
api_secret = ""

# OAuth access token for your account.
oauth_token = ""
oauth_token_secret = ""

# Who the token belongs to. Used for links and `view-config`.
user_nsid = ""
username = ""
full_name = ""

# ---------------------------------------------------------------------------
# Upload
# ---------------------------------------------------------------------------
[upload]
# Set the Flickr "posted" date to when the photo was taken.
set_date_posted = false

# Keep the list of uploaded files in a hidden .rodeo-uploaded-files.json in
# each image directory instead of one list next to this config file.
store_uploaded_list_in_image_dir = false

# ---------------------------------------------------------------------------
# Resize (`rodeo resize`)
# ---------------------------------------------------------------------------
[resize]
# "convert" (ImageMagick) or "native" (built in).
backend = "convert"

# Bounding box, WxH. Aspect ratio is preserved.
scale = "2000x2000"

# Interpolation: catrom, lanczos, triangle, gaussian or point.
method = "catrom"

# JPEG quality (1 = worst, 100 = best).
quality = 75

# ---------------------------------------------------------------------------
# Keyword rules
# ---------------------------------------------------------------------------
# Evaluated in order against each image's keywords. A rule fires when its
# include condition holds and no exclude condition does:
#
#   excludes_all  skip the rule if the image has every one of these
#   excludes_any  skip the rule if the image has any of these
#   includes_all  fire if the image has every one of these
#   includes_any  fire if the image has any of these (used when includes_all is empty)
#
# When a rule fires:
#
#   delete   strip the matched keywords from the file and the upload
#   privacy  replace the photo's visibility (last firing rule wins);
#            family, friends and public left out are false
#   albums   add to albums; an album without id is created on first use
#
# [[rules]]
# name = "Private"
# condition = { includes_any = ["private"] }
# action = { delete = true, privacy = { family = false, friends = false, public = false } }
#
# [[rules]]
# name = "Holidays"
# condition = { includes_all = ["holiday", "2024"], excludes_any = ["private"] }
# action = { albums = [{ id = "72157719000000000", name = "Holidays" }, { name = "2024" }] }
"##
}
