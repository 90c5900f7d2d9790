use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A `MAJOR.MINOR.PATCH[-pre]` version number.
///
/// The patch component may be omitted when parsing (`"0.8"` is `0.8.0`).
/// A pre-release sorts before the corresponding release, so
/// `0.2.0-dev < 0.2.0`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Pre-release tag without the leading `-`.
    pub pre: Option<String>,
}

impl Version {
    /// Create a release version.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// The same version with any pre-release tag stripped.
    pub fn base(&self) -> Self {
        Self::new(self.major, self.minor, self.patch)
    }

    /// Returns `true` if this is a pre-release.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }

    /// Parse a version string.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidVersion {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let (core, pre) = match trimmed.split_once('-') {
            Some((_, pre)) if pre.is_empty() => {
                return Err(invalid("empty pre-release tag"));
            }
            Some((core, pre)) => (core, Some(pre.to_string())),
            None => (trimmed, None),
        };

        let mut parts = core.split('.');
        let mut next = |label: &str, required: bool| -> Result<u64, TypeError> {
            match parts.next() {
                Some(p) if !p.is_empty() => p
                    .parse::<u64>()
                    .map_err(|_| invalid(&format!("{label} component is not a number"))),
                Some(_) => Err(invalid(&format!("empty {label} component"))),
                None if required => Err(invalid(&format!("missing {label} component"))),
                None => Ok(0),
            }
        };
        let major = next("major", true)?;
        let minor = next("minor", true)?;
        let patch = next("patch", false)?;
        if parts.next().is_some() {
            return Err(invalid("too many components"));
        }

        Ok(Self {
            major,
            minor,
            patch,
            pre,
        })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({self})")
    }
}

impl FromStr for Version {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.to_string()
    }
}

// ---------------------------------------------------------------------------
// Stamps
// ---------------------------------------------------------------------------

/// The version pair recorded in a container at creation time.
///
/// Written once and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionStamp {
    /// Storage-format compatibility version of the build that created the container.
    pub storage_version: Version,
    /// Library version of the build that created the container.
    pub library_version: Version,
}

/// Outcome of checking a [`VersionStamp`] against a running build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The container can be opened.
    Compatible,
    /// The container was written by a newer format than this build understands.
    StorageTooNew { stored: Version, running: Version },
    /// The container was written by a format older than this build requires.
    StorageTooOld { stored: Version, required: Version },
}

/// The version pair a running build uses to stamp new containers and to gate
/// opening existing ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Compatibility {
    /// Oldest storage format this build can read; also stamped on creation.
    pub storage_version: Version,
    /// Version of the running library.
    pub library_version: Version,
}

impl Compatibility {
    pub fn new(storage_version: Version, library_version: Version) -> Self {
        Self {
            storage_version,
            library_version,
        }
    }

    /// The stamp this build writes into a freshly created container.
    pub fn stamp(&self) -> VersionStamp {
        VersionStamp {
            storage_version: self.storage_version.clone(),
            library_version: self.library_version.clone(),
        }
    }

    /// Check whether a container carrying `stamp` can be opened.
    ///
    /// The stored storage version must not be newer than the running library
    /// (ignoring its pre-release tag), and must not be older than the storage
    /// version this build requires.
    pub fn check(&self, stamp: &VersionStamp) -> Verdict {
        let running = self.library_version.base();
        if running < stamp.storage_version {
            return Verdict::StorageTooNew {
                stored: stamp.storage_version.clone(),
                running,
            };
        }
        if self.storage_version > stamp.storage_version {
            return Verdict::StorageTooOld {
                stored: stamp.storage_version.clone(),
                required: self.storage_version.clone(),
            };
        }
        Verdict::Compatible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn parse_full_version() {
        let ver = v("1.2.3");
        assert_eq!(ver, Version::new(1, 2, 3));
        assert!(!ver.is_prerelease());
    }

    #[test]
    fn parse_defaults_patch_to_zero() {
        assert_eq!(v("0.8"), Version::new(0, 8, 0));
    }

    #[test]
    fn parse_prerelease() {
        let ver = v("0.2.0-dev1");
        assert_eq!(ver.pre.as_deref(), Some("dev1"));
        assert_eq!(ver.base(), Version::new(0, 2, 0));
        assert_eq!(ver.to_string(), "0.2.0-dev1");
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", "1", "1.x", "1..2", "1.2.3.4", "1.2.3-"] {
            let err = Version::parse(bad).unwrap_err();
            assert!(matches!(err, TypeError::InvalidVersion { .. }), "{bad}");
        }
    }

    #[test]
    fn prerelease_sorts_before_release() {
        assert!(v("0.2.0-dev") < v("0.2.0"));
        assert!(v("0.1.9") < v("0.2.0-dev"));
    }

    #[test]
    fn serde_uses_string_form() {
        let json = serde_json::to_string(&v("0.8.1")).unwrap();
        assert_eq!(json, "\"0.8.1\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("0.8.1"));
        assert!(serde_json::from_str::<Version>("\"nope\"").is_err());
    }

    // -----------------------------------------------------------------------
    // Compatibility
    // -----------------------------------------------------------------------

    fn compat(storage: &str, library: &str) -> Compatibility {
        Compatibility::new(v(storage), v(library))
    }

    #[test]
    fn own_stamp_is_compatible() {
        let c = compat("0.1.0", "0.1.3");
        assert_eq!(c.check(&c.stamp()), Verdict::Compatible);
    }

    #[test]
    fn newer_storage_is_rejected() {
        let writer = compat("0.3.0", "0.3.0");
        let reader = compat("0.1.0", "0.2.5");
        assert!(matches!(
            reader.check(&writer.stamp()),
            Verdict::StorageTooNew { .. }
        ));
    }

    #[test]
    fn older_storage_is_rejected() {
        let writer = compat("0.1.0", "0.1.0");
        let reader = compat("0.2.0", "0.2.0");
        assert_eq!(
            reader.check(&writer.stamp()),
            Verdict::StorageTooOld {
                stored: v("0.1.0"),
                required: v("0.2.0"),
            }
        );
    }

    #[test]
    fn prerelease_library_reads_its_own_format() {
        let c = compat("0.2.0", "0.2.0-dev");
        assert_eq!(c.check(&c.stamp()), Verdict::Compatible);
    }

    proptest! {
        #[test]
        fn release_ordering_matches_tuple_ordering(
            a in (0u64..50, 0u64..50, 0u64..50),
            b in (0u64..50, 0u64..50, 0u64..50),
        ) {
            let va = Version::new(a.0, a.1, a.2);
            let vb = Version::new(b.0, b.1, b.2);
            prop_assert_eq!(va.cmp(&vb), a.cmp(&b));
            prop_assert_eq!(Version::parse(&va.to_string()).unwrap(), va);
        }
    }
}
