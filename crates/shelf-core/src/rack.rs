use shelf_store::{Group, StoreError};
use shelf_types::NodeName;
use tracing::debug;

use crate::config::ShelfConfig;
use crate::error::{ShelfError, ShelfResult};
use crate::hooks::{ContextHooks, HookedShelf};

/// Dict-like collection of shelves, one child group per key.
///
/// Setting a key replaces the whole child group, so entries never merge
/// with previously stored data.
///
/// Keys are namespace member names on every backend: non-empty, without
/// `/`, `\` or NUL, not starting with `.` and not ending in `.dset`. Any
/// other key fails with [`ShelfError::InvalidArgument`].
#[derive(Debug, Clone)]
pub struct Rack<G: Group> {
    group: G,
    config: ShelfConfig,
}

impl<G: Group> Rack<G> {
    pub fn new(group: G) -> Self {
        Self::with_config(group, ShelfConfig::default())
    }

    pub fn with_config(group: G, config: ShelfConfig) -> Self {
        Self { group, config }
    }

    pub fn group(&self) -> &G {
        &self.group
    }

    fn check_key(key: &str) -> ShelfResult<NodeName> {
        NodeName::new(key).map_err(|e| ShelfError::InvalidArgument(format!("invalid key: {e}")))
    }

    fn missing(&self, key: &str) -> ShelfError {
        ShelfError::NotFound(format!("no entry {key:?} in {}", self.group.path()))
    }

    /// Shelf for an existing key.
    pub fn shelf(&self, key: &str) -> ShelfResult<HookedShelf<G>> {
        let key = Self::check_key(key)?;
        match self.group.open_group(key.as_str()) {
            Ok(child) => Ok(HookedShelf::with_config(child, self.config.clone())),
            Err(StoreError::NotFound { .. }) => Err(self.missing(key.as_str())),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the object stored under `key`.
    ///
    /// Fails with [`ShelfError::InvalidArgument`] for keys that are not valid
    /// member names (see [`Rack`]) and [`ShelfError::NotFound`] if absent.
    pub fn get<T: ContextHooks<G>>(&self, key: &str) -> ShelfResult<T> {
        self.shelf(key)?.load()
    }

    /// Store `obj` under `key`, discarding anything stored there before.
    ///
    /// `key` follows the member name rules described on [`Rack`].
    pub fn set<T: ContextHooks<G>>(&self, key: &str, obj: &T) -> ShelfResult<()> {
        let key = Self::check_key(key)?;
        match self.group.remove(key.as_str()) {
            Ok(()) | Err(StoreError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }
        let child = self.group.create_group(key.as_str())?;
        HookedShelf::with_config(child, self.config.clone()).save(obj, true)?;
        debug!(rack = %self.group.path(), key = %key, "stored entry");
        Ok(())
    }

    /// Remove the entry under `key`.
    pub fn delete(&self, key: &str) -> ShelfResult<()> {
        let key = Self::check_key(key)?;
        match self.group.remove(key.as_str()) {
            Ok(()) => {
                debug!(rack = %self.group.path(), key = %key, "deleted entry");
                Ok(())
            }
            Err(StoreError::NotFound { .. }) => Err(self.missing(key.as_str())),
            Err(e) => Err(e.into()),
        }
    }

    pub fn contains(&self, key: &str) -> ShelfResult<bool> {
        let key = Self::check_key(key)?;
        match self.group.open_group(key.as_str()) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Keys currently stored, sorted.
    pub fn keys(&self) -> ShelfResult<Vec<String>> {
        Ok(self.group.groups()?)
    }

    pub fn len(&self) -> ShelfResult<usize> {
        Ok(self.keys()?.len())
    }

    pub fn is_empty(&self) -> ShelfResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Load every entry as `T`.
    pub fn entries<T: ContextHooks<G>>(&self) -> ShelfResult<Vec<(String, T)>> {
        self.keys()?
            .into_iter()
            .map(|key| {
                let value = self.get(&key)?;
                Ok((key, value))
            })
            .collect()
    }
}
