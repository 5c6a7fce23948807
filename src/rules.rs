//! Keyword rules: what to strip, where to file, who may see.
//!
//! Rules are declared in the `[[rules]]` array of `rodeo.toml` and evaluated
//! in declaration order against the keywords of one image:
//!
//! ```toml
//! [[rules]]
//! name = "Family only"
//! condition = { includes_any = ["kids", "grandma"], excludes_any = ["public"] }
//! action = { delete = true, privacy = { family = true, friends = false, public = false } }
//!
//! [[rules]]
//! name = "Svalbard album"
//! condition = { includes_all = ["svalbard", "travel"] }
//! action = { albums = [{ id = "72157719000000000", name = "Svalbard" }, { name = "Arctic" }] }
//! ```
//!
//! ## Evaluation
//!
//! For each rule:
//!
//! 1. **excludes_all**: if every listed keyword is on the image, the rule is skipped.
//! 2. **excludes_any**: if any listed keyword is on the image, the rule is skipped.
//! 3. **includes_all** (checked first) or **includes_any** decides whether the
//!    rule fires. A rule with neither is inert, even with excludes set.
//!
//! A firing rule contributes to the [`Resolution`]:
//!
//! - `delete = true` marks the matched include keywords for removal.
//! - `privacy` replaces the current privacy; the last firing rule with a
//!   privacy wins.
//! - `albums` are appended; a repeated `(id, name)` pair is kept once.
//!
//! Matching never stops at the first firing rule. All rules are evaluated.

use crate::keywords;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Flickr visibility flags for an uploaded photo.
///
/// A flag left out of a rule's `privacy` table is `false`: a rule grants
/// exactly the audiences it names. [`Permissions::default`] (everyone) only
/// applies when no rule sets a privacy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Permissions {
    #[serde(default)]
    pub family: bool,
    #[serde(default)]
    pub friends: bool,
    #[serde(default)]
    pub public: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            family: true,
            friends: true,
            public: true,
        }
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Family: {}, Friends: {}, Public: {}",
            self.family, self.friends, self.public
        )
    }
}

/// Reference to a remote album.
///
/// Without an `id` the album does not exist yet and is created, under
/// `name`, the first time a photo is filed into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlbumRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

impl AlbumRef {
    pub fn existing(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
        }
    }

    pub fn to_create(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    /// The remote id, treating an empty string as absent.
    pub fn remote_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

impl fmt::Display for AlbumRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remote_id() {
            Some(id) => write!(f, "{} ({})", self.name, id),
            None => write!(f, "{} (new)", self.name),
        }
    }
}

/// Keyword sets deciding whether a rule applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Condition {
    /// Skip the rule when the image carries all of these.
    pub excludes_all: Vec<String>,
    /// Skip the rule when the image carries any of these.
    pub excludes_any: Vec<String>,
    /// Fire when the image carries all of these.
    pub includes_all: Vec<String>,
    /// Fire when the image carries at least one of these (ignored if
    /// `includes_all` is set).
    pub includes_any: Vec<String>,
}

impl Condition {
    /// True when no keyword set is given. Such a condition never matches.
    pub fn is_empty(&self) -> bool {
        self.excludes_all.is_empty()
            && self.excludes_any.is_empty()
            && self.includes_all.is_empty()
            && self.includes_any.is_empty()
    }

    /// Evaluate against an image's keywords.
    pub fn evaluate<S: AsRef<str>>(&self, image: &[S]) -> RuleOutcome {
        if !self.excludes_all.is_empty() {
            let hits = keywords::intersection(image, &self.excludes_all);
            if hits.len() == keywords::dedup(&self.excludes_all).len() {
                return RuleOutcome::ExcludedByAll;
            }
        }

        if !self.excludes_any.is_empty()
            && !keywords::intersection(image, &self.excludes_any).is_empty()
        {
            return RuleOutcome::ExcludedByAny;
        }

        if !self.includes_all.is_empty() {
            let matched = keywords::intersection(image, &self.includes_all);
            if matched.len() == keywords::dedup(&self.includes_all).len() {
                RuleOutcome::Fired { matched }
            } else {
                RuleOutcome::IncludesAllUnmet
            }
        } else if !self.includes_any.is_empty() {
            let matched = keywords::intersection(image, &self.includes_any);
            if matched.is_empty() {
                RuleOutcome::IncludesAnyUnmet
            } else {
                RuleOutcome::Fired { matched }
            }
        } else {
            RuleOutcome::NoIncludeCondition
        }
    }
}

/// Effects of a rule when it fires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Action {
    /// Strip the matched include keywords before upload.
    pub delete: bool,
    /// Replace the photo's privacy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<Permissions>,
    /// Albums to file the photo into.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub albums: Vec<AlbumRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub action: Action,
}

/// Why a rule did or did not fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    ExcludedByAll,
    ExcludedByAny,
    IncludesAllUnmet,
    IncludesAnyUnmet,
    NoIncludeCondition,
    /// The rule fires; `matched` are the image keywords from the include set
    /// that triggered it.
    Fired { matched: Vec<String> },
}

impl RuleOutcome {
    pub fn fired(&self) -> bool {
        matches!(self, RuleOutcome::Fired { .. })
    }
}

impl fmt::Display for RuleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOutcome::ExcludedByAll => write!(f, "excluded by excludes_all"),
            RuleOutcome::ExcludedByAny => write!(f, "excluded by excludes_any"),
            RuleOutcome::IncludesAllUnmet => write!(f, "includes_all not met"),
            RuleOutcome::IncludesAnyUnmet => write!(f, "includes_any not met"),
            RuleOutcome::NoIncludeCondition => write!(f, "no include condition"),
            RuleOutcome::Fired { matched } => write!(f, "fired on {}", matched.join(", ")),
        }
    }
}

/// Accumulated effect of all rules on one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Keywords to strip from the file and leave off the upload.
    pub keywords_to_remove: Vec<String>,
    /// Keywords to upload as tags.
    pub keywords_to_keep: Vec<String>,
    /// Albums to file the photo into, in rule order, without repeats.
    pub albums: Vec<AlbumRef>,
    pub privacy: Permissions,
}

impl Resolution {
    /// The resolution when no rule fires.
    pub fn identity<S: AsRef<str>>(image: &[S]) -> Self {
        Self {
            keywords_to_remove: Vec::new(),
            keywords_to_keep: keywords::dedup(image),
            albums: Vec::new(),
            privacy: Permissions::default(),
        }
    }

    /// Put `album` at the front of the album list (used for the album chosen
    /// on the command line). A repeat further down is dropped.
    pub fn prepend_album(&mut self, album: AlbumRef) {
        let rest = std::mem::take(&mut self.albums);
        self.albums = dedup_albums(std::iter::once(album).chain(rest));
    }
}

/// Drop repeated albums, comparing the `(id, name)` pair. First one wins.
pub fn dedup_albums(albums: impl IntoIterator<Item = AlbumRef>) -> Vec<AlbumRef> {
    let mut out: Vec<AlbumRef> = Vec::new();
    for album in albums {
        if !out
            .iter()
            .any(|a| a.remote_id() == album.remote_id() && a.name == album.name)
        {
            out.push(album);
        }
    }
    out
}

/// Evaluate every rule's condition, in order, without applying actions.
pub fn evaluate_all<'a, S: AsRef<str>>(
    rules: &'a [Rule],
    image: &[S],
) -> Vec<(&'a Rule, RuleOutcome)> {
    rules
        .iter()
        .map(|rule| (rule, rule.condition.evaluate(image)))
        .collect()
}

/// Run every rule, in order, against an image's keywords.
pub fn resolve<S: AsRef<str>>(rules: &[Rule], image: &[S]) -> Resolution {
    let image = keywords::dedup(image);
    let mut resolution = Resolution::identity(&image);
    let mut albums = Vec::new();

    for (rule, outcome) in evaluate_all(rules, &image) {
        log::debug!("rule '{}': {}", rule.name, outcome);

        if let RuleOutcome::Fired { matched } = outcome {
            if rule.action.delete {
                resolution.keywords_to_remove.extend(matched);
            }
            if let Some(privacy) = rule.action.privacy {
                resolution.privacy = privacy;
            }
            albums.extend(rule.action.albums.iter().cloned());
        }
    }

    resolution.keywords_to_remove = keywords::dedup(&resolution.keywords_to_remove);
    resolution.keywords_to_keep = keywords::difference(&image, &resolution.keywords_to_remove);
    resolution.albums = dedup_albums(albums);
    resolution
}
