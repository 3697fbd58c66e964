//! Version parsing and comparison.
//!
//! Toolchain versions are not semver: GHC ships `9.4.8`, Cabal ships four
//! components (`3.10.2.1`), pre-releases look like `9.2.1-alpha1` and
//! nightly builds carry dates. A [`Version`] is therefore a list of
//! `.`-separated chunks, each chunk a run of numeric and alphabetic
//! components, with an optional `-release` and `+meta` suffix.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{Error, Result};

/// A single component of a version chunk.
///
/// Numbers sort before text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    Number(u64),
    Text(String),
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Number(n) => write!(f, "{}", n),
            Component::Text(t) => f.write_str(t),
        }
    }
}

/// A `.`-separated chunk: `10`, `rc1`, `0a`.
pub type Chunk = Vec<Component>;

/// A parsed toolchain version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    chunks: Vec<Chunk>,
    release: Vec<Chunk>,
    meta: Option<String>,
}

impl Version {
    /// Build a plain numeric version such as `9.4.8`.
    pub fn from_numbers(numbers: &[u64]) -> Self {
        Self {
            chunks: numbers.iter().map(|n| vec![Component::Number(*n)]).collect(),
            release: Vec::new(),
            meta: None,
        }
    }

    /// The main chunks, before any `-release` suffix.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The release suffix chunks (`alpha1` in `9.2.1-alpha1`).
    pub fn release(&self) -> &[Chunk] {
        &self.release
    }

    /// Build metadata after `+`.
    pub fn meta(&self) -> Option<&str> {
        self.meta.as_deref()
    }

    /// Whether this version carries a release suffix.
    pub fn is_prerelease(&self) -> bool {
        !self.release.is_empty()
    }

    /// Decompose into `(major, minor)`.
    ///
    /// The first chunk must be a single number and the second chunk must
    /// start with a number. `9.10.1` gives `(9, 10)`, `9.2rc1` gives `(9, 2)`,
    /// `9` or `nightly.1` give `None`.
    pub fn major_minor(&self) -> Option<(u64, u64)> {
        let major = match self.chunks.first()?.as_slice() {
            [Component::Number(n)] => *n,
            _ => return None,
        };
        let minor = match self.chunks.get(1)?.first()? {
            Component::Number(n) => *n,
            Component::Text(_) => return None,
        };
        Some((major, minor))
    }
}

fn parse_chunk(text: &str) -> std::result::Result<Chunk, String> {
    if text.is_empty() {
        return Err("empty version chunk".to_string());
    }

    let mut components = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        let numeric = c.is_ascii_digit();
        if !numeric && !c.is_ascii_alphabetic() {
            return Err(format!("unexpected character '{}'", c));
        }

        let mut end = start;
        while let Some(&(i, c)) = chars.peek() {
            let same_kind = if numeric {
                c.is_ascii_digit()
            } else {
                c.is_ascii_alphabetic()
            };
            if !same_kind {
                break;
            }
            end = i + c.len_utf8();
            chars.next();
        }

        let run = &text[start..end];
        if numeric {
            let n = run
                .parse::<u64>()
                .map_err(|_| format!("number out of range: {}", run))?;
            components.push(Component::Number(n));
        } else {
            components.push(Component::Text(run.to_string()));
        }
    }

    Ok(components)
}

fn parse_chunks(text: &str) -> std::result::Result<Vec<Chunk>, String> {
    text.split('.').map(parse_chunk).collect()
}

fn write_chunks(f: &mut fmt::Formatter<'_>, chunks: &[Chunk]) -> fmt::Result {
    for (i, chunk) in chunks.iter().enumerate() {
        if i > 0 {
            f.write_str(".")?;
        }
        for component in chunk {
            write!(f, "{}", component)?;
        }
    }
    Ok(())
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_chunks(f, &self.chunks)?;
        if !self.release.is_empty() {
            f.write_str("-")?;
            write_chunks(f, &self.release)?;
        }
        if let Some(ref meta) = self.meta {
            write!(f, "+{}", meta)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let input = s.trim();
        if input.is_empty() {
            return Err(Error::parse("version", s, "empty input"));
        }

        let (rest, meta) = match input.split_once('+') {
            Some((rest, meta)) => {
                if meta.is_empty()
                    || !meta
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
                {
                    return Err(Error::parse("version", s, "invalid build metadata"));
                }
                (rest, Some(meta.to_string()))
            }
            None => (input, None),
        };

        let (main, release) = match rest.split_once('-') {
            Some((main, release)) => (main, Some(release)),
            None => (rest, None),
        };

        let chunks = parse_chunks(main).map_err(|reason| Error::parse("version", s, reason))?;
        let release = match release {
            Some(r) => parse_chunks(r).map_err(|reason| Error::parse("version", s, reason))?,
            None => Vec::new(),
        };

        Ok(Version {
            chunks,
            release,
            meta,
        })
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.chunks
            .cmp(&other.chunks)
            .then_with(|| {
                // A release suffix marks a pre-release of the same main version
                match (self.release.is_empty(), other.release.is_empty()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => self.release.cmp(&other.release),
                }
            })
            .then_with(|| self.meta.cmp(&other.meta))
    }
}

/// Parse a bare version string.
pub fn parse_version(text: &str) -> Result<Version> {
    text.parse()
}

/// A version plus an optional cross-compilation target triple.
///
/// Two target versions are equal when version and target match; the `tag`
/// is a display label and takes no part in identity.
#[derive(Debug, Clone)]
pub struct TargetVersion {
    /// Target triple, `None` for the host.
    pub target: Option<String>,
    /// The tool version.
    pub version: Version,
    /// Optional label, e.g. the catalog tag this version was picked by.
    pub tag: Option<String>,
}

impl TargetVersion {
    /// A host version.
    pub fn new(version: Version) -> Self {
        Self {
            target: None,
            version,
            tag: None,
        }
    }

    /// A version for a target triple.
    pub fn with_target(version: Version, target: Option<String>) -> Self {
        Self {
            target,
            version,
            tag: None,
        }
    }

    /// Attach a label.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Whether this is for `target`. `None` only matches host versions.
    pub fn is_for_target(&self, target: Option<&str>) -> bool {
        self.target.as_deref() == target
    }
}

impl PartialEq for TargetVersion {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target && self.version == other.version
    }
}

impl Eq for TargetVersion {}

impl Hash for TargetVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.target.hash(state);
        self.version.hash(state);
    }
}

impl PartialOrd for TargetVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TargetVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.target
            .cmp(&other.target)
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl From<Version> for TargetVersion {
    fn from(version: Version) -> Self {
        Self::new(version)
    }
}

impl fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref target) = self.target {
            write!(f, "{}-", target)?;
        }
        write!(f, "{}", self.version)
    }
}

impl FromStr for TargetVersion {
    type Err = Error;

    /// Split `[<triple>-]<version>`.
    ///
    /// The target is the shortest prefix ending in `-` whose remainder is a
    /// version starting with a digit. Triples never start with a digit, which
    /// keeps `9.2.1-1` a version with a release suffix.
    fn from_str(s: &str) -> Result<Self> {
        let input = s.trim();

        for (i, c) in input.char_indices() {
            if c != '-' || i == 0 {
                continue;
            }
            let prefix = &input[..i];
            let rest = &input[i + 1..];
            if prefix.starts_with(|c: char| c.is_ascii_digit())
                || !rest.starts_with(|c: char| c.is_ascii_digit())
            {
                continue;
            }
            if let Ok(version) = rest.parse::<Version>() {
                return Ok(Self::with_target(version, Some(prefix.to_string())));
            }
        }

        let version = input
            .parse::<Version>()
            .map_err(|_| Error::parse("target version", s, "expected [<target>-]<version>"))?;
        Ok(Self::new(version))
    }
}

/// Parse a `[<triple>-]<version>` string.
pub fn parse_target_version(text: &str) -> Result<TargetVersion> {
    text.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_version() {
        let version = v("9.4.8");
        assert_eq!(version, Version::from_numbers(&[9, 4, 8]));
        assert!(!version.is_prerelease());

        let version = v("9.2.1-alpha1");
        assert_eq!(version.chunks().len(), 3);
        assert_eq!(
            version.release(),
            &[vec![
                Component::Text("alpha".to_string()),
                Component::Number(1)
            ]]
        );
    }

    #[test]
    fn test_display_roundtrip() {
        for s in [
            "8.10.4",
            "9.2.1-alpha1",
            "3.10.2.1",
            "2.9.3",
            "9.2rc1",
            "1.7.0.0-rc.2",
            "9.8.1+dwarf",
            "0.20231101",
        ] {
            assert_eq!(v(s).to_string(), s);
        }
    }

    #[test]
    fn test_display_normalizes_leading_zeros() {
        assert_eq!(v("9.04.08").to_string(), "9.4.8");
    }

    #[test]
    fn test_parse_errors_carry_input() {
        for s in ["", "9..2", "9.2.", "9.2_1", "9.2.1-", "9.2.1+"] {
            match s.parse::<Version>() {
                Err(Error::Parse { input, .. }) => assert_eq!(input, s),
                other => panic!("expected parse error for {:?}, got {:?}", s, other),
            }
        }
    }

    #[test]
    fn test_version_ordering() {
        assert!(v("9.4.8") > v("9.2.8"));
        assert!(v("9.10.1") > v("9.8.4"));
        assert!(v("10.0") > v("9.99.99"));
        assert!(v("9.2") < v("9.2.0"));
        assert!(v("9.2.1-alpha1") < v("9.2.1"));
        assert!(v("9.2.1-alpha1") < v("9.2.1-alpha2"));
        assert!(v("9.2.1-alpha2") < v("9.2.1-rc1"));
        assert!(v("9.2.0") < v("9.2.1-alpha1"));
        assert!(v("9.2rc1") > v("9.2"));
        assert!(v("9.2.1") < v("9.2.1+meta"));
    }

    #[test]
    fn test_major_minor() {
        assert_eq!(v("9.10.1").major_minor(), Some((9, 10)));
        assert_eq!(v("8.10.4").major_minor(), Some((8, 10)));
        assert_eq!(v("9.2rc1").major_minor(), Some((9, 2)));
        assert_eq!(v("9").major_minor(), None);
        assert_eq!(v("9a.2").major_minor(), None);
        assert_eq!(v("nightly.1").major_minor(), None);
    }

    #[test]
    fn test_string_conversions() {
        let text = String::from(v("9.2.1-alpha1"));
        assert_eq!(text, "9.2.1-alpha1");
        assert_eq!(Version::try_from(text).unwrap(), v("9.2.1-alpha1"));
        assert!(Version::try_from("9..1".to_string()).is_err());
    }

    #[test]
    fn test_parse_target_version() {
        let tv: TargetVersion = "9.4.8".parse().unwrap();
        assert_eq!(tv.target, None);
        assert_eq!(tv.version, v("9.4.8"));

        let tv: TargetVersion = "x86_64-linux-musl-9.2.1".parse().unwrap();
        assert_eq!(tv.target.as_deref(), Some("x86_64-linux-musl"));
        assert_eq!(tv.version, v("9.2.1"));
        assert_eq!(tv.to_string(), "x86_64-linux-musl-9.2.1");

        let tv: TargetVersion = "wasm32-wasi-9.6.2-rc1".parse().unwrap();
        assert_eq!(tv.target.as_deref(), Some("wasm32-wasi"));
        assert_eq!(tv.version, v("9.6.2-rc1"));
    }

    #[test]
    fn test_target_version_keeps_release_suffix() {
        let tv: TargetVersion = "9.2.1-alpha1".parse().unwrap();
        assert_eq!(tv.target, None);
        assert_eq!(tv.version, v("9.2.1-alpha1"));

        let tv: TargetVersion = "9.2.1-1".parse().unwrap();
        assert_eq!(tv.target, None);
        assert_eq!(tv.version.to_string(), "9.2.1-1");
    }

    #[test]
    fn test_target_version_identity_ignores_tag() {
        let a = TargetVersion::new(v("9.4.8")).with_tag("recommended");
        let b = TargetVersion::new(v("9.4.8"));
        assert_eq!(a, b);

        let cross = TargetVersion::with_target(v("9.4.8"), Some("armv7-linux".into()));
        assert_ne!(a, cross);
    }

    #[test]
    fn test_target_version_rejects_garbage() {
        assert!(matches!(
            "ghc-latest!".parse::<TargetVersion>(),
            Err(Error::Parse { .. })
        ));
    }
}
