//! Queries over the release catalog.
//!
//! The catalog maps each tool to its known versions and their metadata.
//! It is read from JSON:
//!
//! ```json
//! {
//!   "ghc": {
//!     "9.4.8": { "tags": ["Recommended", "base-4.17.2.1"], "changelog": "https://..." }
//!   }
//! }
//! ```

use hvm_core::{Error, Result, TargetVersion, Tool, Version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// A release tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tag {
    Latest,
    Recommended,
    Prerelease,
    LatestPrerelease,
    Old,
    /// The `base` library version a GHC release ships.
    Base(Version),
    /// A tag this version of hvm does not know about, kept verbatim.
    Unknown(String),
}

impl From<String> for Tag {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Latest" => Tag::Latest,
            "Recommended" => Tag::Recommended,
            "Prerelease" => Tag::Prerelease,
            "LatestPrerelease" => Tag::LatestPrerelease,
            "Old" => Tag::Old,
            _ => match s.strip_prefix("base-").map(str::parse::<Version>) {
                Some(Ok(v)) => Tag::Base(v),
                _ => Tag::Unknown(s),
            },
        }
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.to_string()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Latest => f.write_str("Latest"),
            Tag::Recommended => f.write_str("Recommended"),
            Tag::Prerelease => f.write_str("Prerelease"),
            Tag::LatestPrerelease => f.write_str("LatestPrerelease"),
            Tag::Old => f.write_str("Old"),
            Tag::Base(v) => write!(f, "base-{}", v),
            Tag::Unknown(s) => f.write_str(s),
        }
    }
}

impl std::str::FromStr for Tag {
    type Err = Error;

    /// Case-insensitive for the known tags.
    fn from_str(s: &str) -> Result<Self> {
        let tag = match s.to_ascii_lowercase().as_str() {
            "latest" => Tag::Latest,
            "recommended" => Tag::Recommended,
            "prerelease" => Tag::Prerelease,
            "latestprerelease" | "latest-prerelease" => Tag::LatestPrerelease,
            "old" => Tag::Old,
            _ => Tag::from(s.to_string()),
        };
        Ok(tag)
    }
}

/// Metadata of one catalog version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VersionInfo {
    #[serde(default)]
    pub tags: Vec<Tag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_install: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_install: Option<String>,
}

impl VersionInfo {
    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }
}

/// Known versions per tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    tools: BTreeMap<Tool, BTreeMap<Version, VersionInfo>>,
}

impl Catalog {
    /// Parse a JSON catalog.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::parse("catalog", "<json>", e.to_string()))
    }

    /// Read a JSON catalog from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io("failed to read catalog", path, e))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::parse("catalog", path.display().to_string(), e.to_string()))
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, tool: Tool, version: Version, info: VersionInfo) {
        self.tools.entry(tool).or_default().insert(version, info);
    }

    /// Metadata for one version.
    pub fn get(&self, tool: Tool, version: &Version) -> Option<&VersionInfo> {
        self.tools.get(&tool)?.get(version)
    }

    /// Versions of `tool` matching `pred`, in ascending order.
    pub fn filter<'a, F>(&'a self, tool: Tool, pred: F) -> impl Iterator<Item = (&'a Version, &'a VersionInfo)>
    where
        F: Fn(&Version, &VersionInfo) -> bool + 'a,
    {
        self.tools
            .get(&tool)
            .into_iter()
            .flat_map(|versions| versions.iter())
            .filter(move |(v, info)| pred(v, info))
    }

    /// The greatest version of `tool` carrying `tag`, labelled with it.
    pub fn tagged_version(&self, tool: Tool, tag: &Tag) -> Option<TargetVersion> {
        max_by_version(self.filter(tool, |_, info| info.has_tag(tag)))
            .map(|(v, _)| TargetVersion::new(v.clone()).with_tag(tag.to_string()))
    }

    pub fn latest(&self, tool: Tool) -> Option<TargetVersion> {
        self.tagged_version(tool, &Tag::Latest)
    }

    pub fn recommended(&self, tool: Tool) -> Option<TargetVersion> {
        self.tagged_version(tool, &Tag::Recommended)
    }

    /// The greatest catalog version of a `major.minor` series.
    pub fn latest_for_major_minor(&self, tool: Tool, major: u64, minor: u64) -> Option<&Version> {
        max_by_version(self.filter(tool, move |v, _| v.major_minor() == Some((major, minor))))
            .map(|(v, _)| v)
    }

    /// The `base` library version shipped with a GHC release.
    pub fn base_version(&self, version: &Version) -> Option<&Version> {
        self.get(Tool::Ghc, version)?
            .tags
            .iter()
            .find_map(|tag| match tag {
                Tag::Base(v) => Some(v),
                _ => None,
            })
    }
}

/// The entry with the greatest version.
pub fn max_by_version<'a, I>(entries: I) -> Option<(&'a Version, &'a VersionInfo)>
where
    I: IntoIterator<Item = (&'a Version, &'a VersionInfo)>,
{
    entries.into_iter().max_by(|a, b| a.0.cmp(b.0))
}

/// The greatest installed version of a `major.minor` series for `target`.
pub fn latest_installed_for_major_minor(
    installed: &[TargetVersion],
    major: u64,
    minor: u64,
    target: Option<&str>,
) -> Option<TargetVersion> {
    installed
        .iter()
        .filter(|tv| tv.is_for_target(target) && tv.version.major_minor() == Some((major, minor)))
        .max_by(|a, b| a.version.cmp(&b.version))
        .cloned()
}
