use crate::error::{StoreError, StoreResult};

/// A named, resizable, one-dimensional byte array.
///
/// This is the durable storage primitive everything else is built on. Its
/// native operations are "resize" and "slice read/write", not stream I/O;
/// the stream adapters in `shelf-stream` bridge the gap.
///
/// Implementations must satisfy:
/// - `resize` grows with zero bytes and shrinks by truncation.
/// - `read_slice` clamps `start..end` to the current length, so reading past
///   the end yields a short or empty vector rather than an error.
/// - `write_slice` never grows the dataset; writing past the end is
///   [`StoreError::OutOfBounds`].
pub trait Dataset {
    /// Name of the dataset inside its group.
    fn name(&self) -> &str;

    /// Current length in bytes.
    fn len(&self) -> StoreResult<u64>;

    /// Returns `true` if the dataset holds no bytes.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Grow or shrink the dataset to exactly `new_len` bytes.
    fn resize(&mut self, new_len: u64) -> StoreResult<()>;

    /// Read the bytes in `start..end`, clamped to the current length.
    fn read_slice(&self, start: u64, end: u64) -> StoreResult<Vec<u8>>;

    /// Overwrite the bytes in `start..start + data.len()`.
    fn write_slice(&mut self, start: u64, data: &[u8]) -> StoreResult<()>;

    /// Ask the backend to persist written data.
    ///
    /// Default implementation does nothing (suitable for memory backends).
    fn flush(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

/// A node of the namespace tree: holds datasets, child groups and string
/// attributes.
///
/// Handles are cheap to clone and refer to the same underlying node. All
/// names are validated with [`shelf_types::NodeName`]; a dataset and a group
/// can never share a name inside one parent.
pub trait Group: Sized {
    /// Dataset handle type produced by this backend.
    type Dataset: Dataset;

    /// Absolute path of this group, `/` for the root.
    fn path(&self) -> &str;

    /// Returns `true` if mutating operations are rejected with
    /// [`StoreError::ReadOnly`].
    fn is_read_only(&self) -> bool {
        false
    }

    /// Open an existing dataset.
    fn open_dataset(&self, name: &str) -> StoreResult<Self::Dataset>;

    /// Create a growable byte dataset of `initial_len` zero bytes.
    fn create_dataset(&self, name: &str, initial_len: u64) -> StoreResult<Self::Dataset>;

    /// Open an existing child group.
    fn open_group(&self, name: &str) -> StoreResult<Self>;

    /// Create a new, empty child group.
    fn create_group(&self, name: &str) -> StoreResult<Self>;

    /// Open the child group `name`, creating it if absent.
    fn require_group(&self, name: &str) -> StoreResult<Self> {
        match self.open_group(name) {
            Err(StoreError::NotFound { .. }) => self.create_group(name),
            other => other,
        }
    }

    /// Returns `true` if a dataset or group named `name` exists.
    fn contains(&self, name: &str) -> StoreResult<bool>;

    /// Remove the dataset or group (recursively) named `name`.
    fn remove(&self, name: &str) -> StoreResult<()>;

    /// Names of child groups, sorted.
    fn groups(&self) -> StoreResult<Vec<String>>;

    /// Names of datasets, sorted.
    fn datasets(&self) -> StoreResult<Vec<String>>;

    /// Names of all members (groups and datasets), sorted.
    fn members(&self) -> StoreResult<Vec<String>> {
        let mut names = self.groups()?;
        names.extend(self.datasets()?);
        names.sort();
        Ok(names)
    }

    /// Remove every member of this group. Attributes are kept.
    fn clear(&self) -> StoreResult<()> {
        for name in self.members()? {
            self.remove(&name)?;
        }
        Ok(())
    }

    /// Read a string attribute.
    fn attr(&self, name: &str) -> StoreResult<Option<String>>;

    /// Write (create or replace) a string attribute.
    fn set_attr(&self, name: &str, value: &str) -> StoreResult<()>;
}

/// Absolute path of member `name` inside the group at `parent`.
pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Clamp a requested slice to a dataset of length `len`.
pub(crate) fn clamp_slice(start: u64, end: u64, len: u64) -> (u64, u64) {
    let start = start.min(len);
    let end = end.clamp(start, len);
    (start, end)
}

/// Convert a dataset offset to an in-memory index.
pub(crate) fn to_index(value: u64, path: &str) -> StoreResult<usize> {
    usize::try_from(value).map_err(|_| StoreError::OutOfBounds {
        path: path.to_string(),
        start: value,
        end: value,
        len: usize::MAX as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_path_from_root() {
        assert_eq!(join_path("/", "a"), "/a");
        assert_eq!(join_path("/a", "b"), "/a/b");
    }

    #[test]
    fn clamp_slice_bounds() {
        assert_eq!(clamp_slice(0, 10, 5), (0, 5));
        assert_eq!(clamp_slice(7, 10, 5), (5, 5));
        assert_eq!(clamp_slice(3, 1, 5), (3, 3));
        assert_eq!(clamp_slice(1, 4, 5), (1, 4));
    }
}
