//! Shelves for objects that take part in their own persistence.
//!
//! An object that is partly derived from, or too large for, the blob can
//! implement [`ContextHooks`] to:
//!
//! - hand the shelf a reduced substitute to encode, writing the omitted parts
//!   as sibling datasets of the namespace (`PRODUCES_SUBSTITUTE`);
//! - rebuild those parts from the namespace after decoding
//!   (`COMPLETES_FROM_GROUP`).
//!
//! Capabilities are declared with associated constants, so an object without
//! them behaves exactly as on a plain [`ObjectShelf`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;
use shelf_store::Group;
use tracing::debug;

use crate::config::ShelfConfig;
use crate::error::{ShelfError, ShelfResult};
use crate::shelf::ObjectShelf;

/// Persistence hooks for objects stored in group `G`.
pub trait ContextHooks<G: Group>: Serialize + DeserializeOwned {
    /// `substitute` may return a reduced copy to encode instead of `self`.
    const PRODUCES_SUBSTITUTE: bool = false;
    /// `complete` must run on every decoded object.
    const COMPLETES_FROM_GROUP: bool = false;

    /// Produce the object to encode in place of `self`, or `None` to encode
    /// `self` unchanged. May write sibling datasets into `group`.
    fn substitute(&self, group: &G, overwrite: bool) -> ShelfResult<Option<Self>> {
        let _ = (group, overwrite);
        Ok(None)
    }

    /// Rebuild the parts omitted by [`substitute`](Self::substitute).
    fn complete(self, group: &G) -> ShelfResult<Self> {
        let _ = group;
        Ok(self)
    }
}

/// Implement [`ContextHooks`] with no capabilities for plain data types.
#[macro_export]
macro_rules! plain_hooks {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl<G: $crate::shelf_store::Group> $crate::ContextHooks<G> for $ty {}
        )+
    };
}

plain_hooks!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
    serde_json::Value,
);

impl<G: Group, T: Serialize + DeserializeOwned> ContextHooks<G> for Vec<T> {}
impl<G: Group, T: Serialize + DeserializeOwned> ContextHooks<G> for Option<T> {}
impl<G: Group, T: Serialize + DeserializeOwned + Ord> ContextHooks<G> for BTreeSet<T> {}
impl<G: Group, K, V> ContextHooks<G> for BTreeMap<K, V>
where
    K: Serialize + DeserializeOwned + Ord,
    V: Serialize + DeserializeOwned,
{
}
impl<G: Group, K, V> ContextHooks<G> for HashMap<K, V>
where
    K: Serialize + DeserializeOwned + Eq + Hash,
    V: Serialize + DeserializeOwned,
{
}

/// An [`ObjectShelf`] that runs [`ContextHooks`] around save and load.
#[derive(Debug, Clone)]
pub struct HookedShelf<G: Group> {
    inner: ObjectShelf<G>,
}

impl<G: Group> HookedShelf<G> {
    pub fn new(group: G) -> Self {
        Self::with_config(group, ShelfConfig::default())
    }

    pub fn with_config(group: G, config: ShelfConfig) -> Self {
        Self {
            inner: ObjectShelf::with_config(group, config),
        }
    }

    pub fn group(&self) -> &G {
        self.inner.group()
    }

    /// The underlying shelf, bypassing hooks.
    pub fn shelf(&self) -> &ObjectShelf<G> {
        &self.inner
    }

    pub fn exists(&self) -> ShelfResult<bool> {
        self.inner.exists()
    }

    /// Save `obj`, encoding its substitute when it produces one.
    ///
    /// An occupied shelf is refused with [`ShelfError::Conflict`] before
    /// `substitute` runs, so a refused save never touches sibling datasets.
    pub fn save<T: ContextHooks<G>>(&self, obj: &T, overwrite: bool) -> ShelfResult<()> {
        if !overwrite && self.inner.exists()? {
            return Err(ShelfError::Conflict(format!(
                "an object is already stored in {}",
                self.group().path()
            )));
        }
        if T::PRODUCES_SUBSTITUTE {
            if let Some(reduced) = obj.substitute(self.group(), overwrite)? {
                debug!(group = %self.group().path(), "saving substitute");
                return self.inner.save(&reduced, overwrite);
            }
        }
        self.inner.save(obj, overwrite)
    }

    /// Load an object, completing it from the group when it asks to be.
    pub fn load<T: ContextHooks<G>>(&self) -> ShelfResult<T> {
        let obj: T = self.inner.load()?;
        if T::COMPLETES_FROM_GROUP {
            debug!(group = %self.group().path(), "completing loaded object");
            return obj.complete(self.group());
        }
        Ok(obj)
    }
}
