use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Suffix reserved by on-disk backends for dataset files.
pub const RESERVED_SUFFIX: &str = ".dset";

/// A validated name of a namespace member (group, dataset or rack key).
///
/// Names are non-empty, contain no path separators or NUL bytes, do not start
/// with `.` and do not end with [`RESERVED_SUFFIX`]. These rules keep every
/// name usable as a single path component by the directory backend.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeName(String);

impl NodeName {
    /// Validate and wrap a name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("name is empty")
        } else if name.contains(['/', '\\', '\0']) {
            Some("name contains a path separator or NUL byte")
        } else if name.starts_with('.') {
            Some("name starts with '.'")
        } else if name.ends_with(RESERVED_SUFFIX) {
            Some("name ends with the reserved dataset suffix")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(TypeError::InvalidName {
                name,
                reason: reason.to_string(),
            }),
            None => Ok(Self(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for NodeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeName({:?})", self.0)
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NodeName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for NodeName {
    type Error = TypeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<NodeName> for String {
    fn from(n: NodeName) -> Self {
        n.0
    }
}
