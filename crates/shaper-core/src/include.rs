//! Include paths selecting which properties an expansion surfaces.
//!
//! A [`PropertyReference`] is one dotted path (`Owner.Address.City`), outer
//! property first. An [`IncludeSet`] holds the paths a caller asked for, plus
//! optional exclusions written with a leading `-` (`-Owner.Secret`).
//! Exclusions always win over inclusions.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use shaper_error::{IncludeErrorKind, Result, ShaperError};

use crate::registry::Inclusion;

static SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("segment pattern is a valid regex")
});

/// Ordered, non-empty path of property names.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyReference {
    segments: Vec<String>,
}

impl PropertyReference {
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        let display = segments.join(".");
        if segments.is_empty() {
            return Err(ShaperError::include(
                "include path has no segments",
                display,
                IncludeErrorKind::EmptyPath,
            ));
        }
        if let Some(bad) = segments.iter().find(|s| !SEGMENT.is_match(s)) {
            return Err(ShaperError::include(
                format!("'{bad}' is not a valid property name"),
                display,
                IncludeErrorKind::InvalidSegment,
            ));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Outermost property name.
    pub fn head(&self) -> &str {
        &self.segments[0]
    }

    /// Path below the outermost property, if any.
    pub fn tail(&self) -> Option<PropertyReference> {
        if self.segments.len() > 1 {
            Some(Self {
                segments: self.segments[1..].to_vec(),
            })
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: a reference has at least one segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl FromStr for PropertyReference {
    type Err = ShaperError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ShaperError::include(
                "include path is empty",
                s,
                IncludeErrorKind::EmptyPath,
            ));
        }
        Self::new(trimmed.split('.').map(str::trim))
    }
}

impl fmt::Display for PropertyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Included and excluded paths for one level of an expansion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IncludeSet {
    included: BTreeSet<PropertyReference>,
    excluded: BTreeSet<PropertyReference>,
}

impl IncludeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma separated list such as `Name,Friends.Name,-Friends.Email`.
    /// A leading `+` is accepted and ignored; blank entries are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut set = Self::new();
        for raw in text.split(',') {
            let entry = raw.trim();
            if entry.is_empty() {
                continue;
            }
            match entry.strip_prefix('-') {
                Some(path) => set.exclude(path.parse()?),
                None => set.include(entry.strip_prefix('+').unwrap_or(entry).parse()?),
            }
        }
        Ok(set)
    }

    pub fn include(&mut self, path: PropertyReference) {
        self.included.insert(path);
    }

    pub fn exclude(&mut self, path: PropertyReference) {
        self.excluded.insert(path);
    }

    pub fn with(mut self, path: PropertyReference) -> Self {
        self.include(path);
        self
    }

    pub fn without(mut self, path: PropertyReference) -> Self {
        self.exclude(path);
        self
    }

    pub fn included(&self) -> impl Iterator<Item = &PropertyReference> {
        self.included.iter()
    }

    pub fn excluded(&self) -> impl Iterator<Item = &PropertyReference> {
        self.excluded.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty() && self.excluded.is_empty()
    }

    /// `name`, or a path below it, was requested.
    pub fn requests(&self, name: &str) -> bool {
        self.included.iter().any(|p| p.head() == name)
    }

    /// `name` itself was excluded (not merely something below it).
    pub fn excludes(&self, name: &str) -> bool {
        self.excluded.iter().any(|p| p.len() == 1 && p.head() == name)
    }

    /// Whether a property with the given inclusion policy is surfaced.
    pub fn selects(&self, name: &str, inclusion: Inclusion) -> bool {
        if self.excludes(name) {
            return false;
        }
        match inclusion {
            Inclusion::Default => true,
            Inclusion::Explicit => self.requests(name),
        }
    }

    /// The paths that apply below `name`, with `name` stripped off.
    pub fn narrow(&self, name: &str) -> IncludeSet {
        let below = |paths: &BTreeSet<PropertyReference>| -> BTreeSet<PropertyReference> {
            paths
                .iter()
                .filter(|p| p.head() == name)
                .filter_map(PropertyReference::tail)
                .collect()
        };
        IncludeSet {
            included: below(&self.included),
            excluded: below(&self.excluded),
        }
    }

    /// Requested top-level names that are not among `known`.
    pub fn unmatched<'a, I>(&'a self, known: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let known: BTreeSet<&str> = known.into_iter().collect();
        let mut out: Vec<&str> = self
            .included
            .iter()
            .map(PropertyReference::head)
            .filter(|head| !known.contains(head))
            .collect();
        out.dedup();
        out
    }
}

impl FromStr for IncludeSet {
    type Err = ShaperError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromIterator<PropertyReference> for IncludeSet {
    fn from_iter<I: IntoIterator<Item = PropertyReference>>(iter: I) -> Self {
        IncludeSet {
            included: iter.into_iter().collect(),
            excluded: BTreeSet::new(),
        }
    }
}
