//! Elm package versions and version constraints.
//!
//! Elm versions are plain `MAJOR.MINOR.PATCH` triples. Package manifests
//! declare acceptable versions as bounded ranges:
//!
//! ```text
//! "elm/core": "1.0.0 <= v < 2.0.0"
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing versions and constraints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Not a `MAJOR.MINOR.PATCH` version.
    #[error("invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    /// Not a recognized version range.
    #[error("invalid constraint '{input}': {reason}")]
    InvalidConstraint { input: String, reason: String },
}

/// A `MAJOR.MINOR.PATCH` version.
///
/// A trailing pre-release or build tag (`1.0.0-beta`, `1.0.0+abc`) is kept
/// for display only. Ordering, equality and hashing look at the numeric
/// triple alone, so `1.0.0-beta == 1.0.0`.
#[derive(Debug, Clone)]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
    suffix: Option<String>,
}

impl Version {
    /// Create a version without a suffix.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            suffix: None,
        }
    }

    /// Parse a version string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `MAJOR.MINOR.PATCH`, optionally
    /// followed by a pre-release or build tag.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let parsed = semver::Version::parse(input).map_err(|e| VersionError::InvalidVersion {
            input: input.to_string(),
            reason: e.to_string(),
        })?;

        let mut suffix = String::new();
        if !parsed.pre.is_empty() {
            suffix.push('-');
            suffix.push_str(parsed.pre.as_str());
        }
        if !parsed.build.is_empty() {
            suffix.push('+');
            suffix.push_str(parsed.build.as_str());
        }

        Ok(Self {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            suffix: (!suffix.is_empty()).then_some(suffix),
        })
    }

    #[must_use]
    pub fn major(&self) -> u64 {
        self.major
    }

    #[must_use]
    pub fn minor(&self) -> u64 {
        self.minor
    }

    #[must_use]
    pub fn patch(&self) -> u64 {
        self.patch
    }

    /// The pre-release/build tag including its leading `-` or `+`.
    #[must_use]
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.triple() == other.triple()
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.triple().hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple().cmp(&other.triple())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(ref suffix) = self.suffix {
            f.write_str(suffix)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A range of acceptable versions with explicit bound inclusivity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
    lower: Version,
    lower_inclusive: bool,
    upper: Version,
    upper_inclusive: bool,
}

impl Constraint {
    /// Create a constraint from its bounds.
    #[must_use]
    pub fn new(lower: Version, lower_inclusive: bool, upper: Version, upper_inclusive: bool) -> Self {
        Self {
            lower,
            lower_inclusive,
            upper,
            upper_inclusive,
        }
    }

    /// Parse a constraint.
    ///
    /// Two spellings are accepted:
    /// - the Elm form `"1.0.0 <= v < 2.0.0"`
    /// - the comparator form `">=1.0.0 <2.0.0"` (a comma between the two
    ///   comparators is allowed)
    ///
    /// # Errors
    ///
    /// Returns an error if the string matches neither form, if a bound is
    /// not a valid version, or if the lower bound exceeds the upper bound.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let invalid = |reason: &str| VersionError::InvalidConstraint {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .collect();

        let (lower, lower_inclusive, upper, upper_inclusive) = if compact.starts_with('>') {
            split_comparator_form(&compact)
                .ok_or_else(|| invalid("expected '>=LOWER <UPPER'"))?
        } else {
            split_elm_form(&compact)
                .ok_or_else(|| invalid("expected 'LOWER <= v < UPPER'"))?
        };

        let bound = |s: &str| {
            Version::parse(s).map_err(|e| VersionError::InvalidConstraint {
                input: input.to_string(),
                reason: e.to_string(),
            })
        };
        let lower = bound(lower)?;
        let upper = bound(upper)?;

        if lower > upper {
            return Err(invalid("lower bound is greater than upper bound"));
        }

        Ok(Self::new(lower, lower_inclusive, upper, upper_inclusive))
    }

    /// Returns true if `version` lies within the bounds.
    #[must_use]
    pub fn contains(&self, version: &Version) -> bool {
        let above = if self.lower_inclusive {
            *version >= self.lower
        } else {
            *version > self.lower
        };
        let below = if self.upper_inclusive {
            *version <= self.upper
        } else {
            *version < self.upper
        };
        above && below
    }

    /// The smallest of `versions` that satisfies this constraint.
    pub fn select_minimum<'a, I>(&self, versions: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        versions.into_iter().filter(|v| self.contains(v)).min()
    }

    #[must_use]
    pub fn lower(&self) -> &Version {
        &self.lower
    }

    #[must_use]
    pub fn upper(&self) -> &Version {
        &self.upper
    }

    #[must_use]
    pub fn is_lower_inclusive(&self) -> bool {
        self.lower_inclusive
    }

    #[must_use]
    pub fn is_upper_inclusive(&self) -> bool {
        self.upper_inclusive
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = |inclusive: bool| if inclusive { "<=" } else { "<" };
        write!(
            f,
            "{} {} v {} {}",
            self.lower,
            op(self.lower_inclusive),
            op(self.upper_inclusive),
            self.upper
        )
    }
}

impl FromStr for Constraint {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split `1.0.0<=v<2.0.0` into its bounds.
fn split_elm_form(compact: &str) -> Option<(&str, bool, &str, bool)> {
    // Longest operators first: "<=v<" is a prefix of "<=v<=".
    const SEPARATORS: [(&str, bool, bool); 4] = [
        ("<=v<=", true, true),
        ("<=v<", true, false),
        ("<v<=", false, true),
        ("<v<", false, false),
    ];

    SEPARATORS.iter().find_map(|(sep, lower_inclusive, upper_inclusive)| {
        compact
            .split_once(sep)
            .map(|(lower, upper)| (lower, *lower_inclusive, upper, *upper_inclusive))
    })
}

/// Split `>=1.0.0<2.0.0` into its bounds.
fn split_comparator_form(compact: &str) -> Option<(&str, bool, &str, bool)> {
    let rest = compact.strip_prefix('>')?;
    let (lower_inclusive, rest) = match rest.strip_prefix('=') {
        Some(rest) => (true, rest),
        None => (false, rest),
    };

    let (lower, rest) = rest.split_once('<')?;
    let (upper_inclusive, upper) = match rest.strip_prefix('=') {
        Some(upper) => (true, upper),
        None => (false, rest),
    };

    Some((lower, lower_inclusive, upper, upper_inclusive))
}
