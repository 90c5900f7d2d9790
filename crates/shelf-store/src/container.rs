use std::fs;
use std::path::Path;

use shelf_types::{Compatibility, Verdict, Version, VersionStamp};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::fs::DirGroup;
use crate::memory::MemoryGroup;
use crate::traits::Group;

/// Root attribute holding the storage-format compatibility version.
pub const STORAGE_VERSION_ATTR: &str = "storage_version";
/// Root attribute holding the producing library version.
pub const LIBRARY_VERSION_ATTR: &str = "library_version";

/// How to open a container location.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only; the container must exist.
    Read,
    /// Read/write; the container must exist.
    ReadWrite,
    /// Create; an existing container is truncated.
    Create,
    /// Create; fail if the location exists.
    CreateNew,
    /// Read/write if the container exists, create it otherwise.
    #[default]
    Append,
}

impl OpenMode {
    /// Returns `true` if the mode permits mutation.
    pub fn is_writable(self) -> bool {
        !matches!(self, Self::Read)
    }
}

/// A namespace tree carrying a version stamp.
///
/// On creation the stamp of the running build is written as root attributes.
/// On every later open the stored stamp is checked against the running
/// build's [`Compatibility`] and the open fails with
/// [`StoreError::Incompatible`] on mismatch. The stamp is never rewritten.
#[derive(Debug)]
pub struct Container<G: Group> {
    root: G,
    stamp: VersionStamp,
    created: bool,
}

impl<G: Group> Container<G> {
    /// Wrap a root group, stamping it when `fresh` and validating it otherwise.
    pub fn from_root(root: G, fresh: bool, compat: &Compatibility) -> StoreResult<Self> {
        let stamp = if fresh {
            let stamp = compat.stamp();
            root.set_attr(STORAGE_VERSION_ATTR, &stamp.storage_version.to_string())?;
            root.set_attr(LIBRARY_VERSION_ATTR, &stamp.library_version.to_string())?;
            info!(
                storage_version = %stamp.storage_version,
                library_version = %stamp.library_version,
                "stamped new container"
            );
            stamp
        } else {
            let stamp = read_stamp(&root)?;
            match compat.check(&stamp) {
                Verdict::Compatible => {}
                Verdict::StorageTooNew { stored, running } => {
                    return Err(StoreError::Incompatible {
                        path: root.path().to_string(),
                        reason: format!(
                            "written by a newer storage format v{stored} than this build \
                             (v{running}) understands; you need at least v{stored} to open it"
                        ),
                    });
                }
                Verdict::StorageTooOld { stored, required } => {
                    return Err(StoreError::Incompatible {
                        path: root.path().to_string(),
                        reason: format!(
                            "written with storage format v{stored}, older than the required \
                             v{required}; open it with a build supporting v{stored}"
                        ),
                    });
                }
            }
            debug!(storage_version = %stamp.storage_version, "opened container");
            stamp
        };
        Ok(Self {
            root,
            stamp,
            created: fresh,
        })
    }

    /// The root group.
    pub fn root(&self) -> &G {
        &self.root
    }

    /// The version stamp stored in this container.
    pub fn stamp(&self) -> &VersionStamp {
        &self.stamp
    }

    /// Returns `true` if this open created the container.
    pub fn was_created(&self) -> bool {
        self.created
    }
}

impl Container<MemoryGroup> {
    /// Create a fresh in-memory container.
    pub fn in_memory(compat: &Compatibility) -> StoreResult<Self> {
        Self::from_root(MemoryGroup::new_root(), true, compat)
    }
}

impl Container<DirGroup> {
    /// Open or create a directory-backed container according to `mode`.
    pub fn open_dir(
        path: impl AsRef<Path>,
        mode: OpenMode,
        compat: &Compatibility,
    ) -> StoreResult<Self> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let exists = path.exists();

        let fresh = match mode {
            OpenMode::Read | OpenMode::ReadWrite => {
                if !exists {
                    return Err(StoreError::NotFound { path: shown });
                }
                false
            }
            OpenMode::CreateNew => {
                if exists {
                    return Err(StoreError::AlreadyExists { path: shown });
                }
                fs::create_dir_all(path)?;
                true
            }
            OpenMode::Create => {
                if exists {
                    let existing = DirGroup::open_root(path, false)?;
                    let is_empty = fs::read_dir(path)?.next().is_none();
                    if read_stamp(&existing).is_err() && !is_empty {
                        return Err(StoreError::NotAContainer { path: shown });
                    }
                    debug!(path = %shown, "truncating container");
                    fs::remove_dir_all(path)?;
                }
                fs::create_dir_all(path)?;
                true
            }
            OpenMode::Append => {
                if !exists {
                    fs::create_dir_all(path)?;
                }
                !exists
            }
        };

        let root = DirGroup::open_root(path, !mode.is_writable())?;
        Self::from_root(root, fresh, compat)
    }
}

/// Read the version stamp from a root group.
pub fn read_stamp<G: Group>(root: &G) -> StoreResult<VersionStamp> {
    let read = |attr: &str| -> StoreResult<Version> {
        let raw = root.attr(attr)?.ok_or_else(|| StoreError::NotAContainer {
            path: root.path().to_string(),
        })?;
        Ok(Version::parse(&raw)?)
    };
    Ok(VersionStamp {
        storage_version: read(STORAGE_VERSION_ATTR)?,
        library_version: read(LIBRARY_VERSION_ATTR)?,
    })
}
