//! Versioned object storage.
//!
//! Layout inside a container:
//!
//! ```text
//! <root>                 storage_version, library_version attributes
//! └── shelf_data/
//!     ├── racks/<rack>/<key>/shelf_blob
//!     ├── slots/<slot>/shelf_blob
//!     └── cache/         scratch space, emptied on open and close
//! ```

use std::path::Path;

use shelf_store::{Container, DirGroup, Group, MemoryGroup, OpenMode};
use shelf_types::{Compatibility, Version, VersionStamp};
use tracing::{debug, info, warn};

use crate::config::ShelfConfig;
use crate::error::ShelfResult;
use crate::rack::Rack;
use crate::shelf::ObjectShelf;

pub const DATA_GROUP: &str = "shelf_data";
pub const RACKS_GROUP: &str = "racks";
pub const SLOTS_GROUP: &str = "slots";
pub const CACHE_GROUP: &str = "cache";
/// Rack returned by [`Storage::rack`].
pub const DEFAULT_RACK: &str = "objects";

/// Oldest storage format this build reads, stamped into new containers.
pub const STORAGE_FORMAT_VERSION: Version = Version::new(0, 1, 0);

/// Version of this library.
pub fn library_version() -> ShelfResult<Version> {
    Ok(Version::parse(env!("CARGO_PKG_VERSION"))?)
}

/// Compatibility pair of the running build.
pub fn compatibility() -> ShelfResult<Compatibility> {
    Ok(Compatibility::new(STORAGE_FORMAT_VERSION, library_version()?))
}

/// Racks, slots and a cache inside a versioned container.
#[derive(Debug)]
pub struct Storage<G: Group> {
    container: Container<G>,
    data: G,
    config: ShelfConfig,
}

impl Storage<DirGroup> {
    /// Open a directory-backed storage with this build's compatibility.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode, config: ShelfConfig) -> ShelfResult<Self> {
        Self::open_with(path, mode, config, &compatibility()?)
    }

    pub fn open_with(
        path: impl AsRef<Path>,
        mode: OpenMode,
        config: ShelfConfig,
        compat: &Compatibility,
    ) -> ShelfResult<Self> {
        config.validate()?;
        let path = path.as_ref();
        let container = Container::open_dir(path, mode, compat)?;
        info!(path = %path.display(), ?mode, created = container.was_created(), "opened storage");
        Self::from_container(container, config)
    }
}

impl Storage<MemoryGroup> {
    /// Fresh in-memory storage.
    pub fn in_memory(config: ShelfConfig) -> ShelfResult<Self> {
        config.validate()?;
        Self::from_container(Container::in_memory(&compatibility()?)?, config)
    }
}

impl<G: Group> Storage<G> {
    pub fn from_container(container: Container<G>, config: ShelfConfig) -> ShelfResult<Self> {
        let data = child(container.root(), DATA_GROUP)?;
        let storage = Self {
            container,
            data,
            config,
        };
        if !storage.is_read_only() {
            let racks = child(&storage.data, RACKS_GROUP)?;
            child(&racks, DEFAULT_RACK)?;
            child(&storage.data, SLOTS_GROUP)?;
        }
        storage.clear_cache()?;
        Ok(storage)
    }

    pub fn version_stamp(&self) -> &VersionStamp {
        self.container.stamp()
    }

    pub fn was_created(&self) -> bool {
        self.container.was_created()
    }

    pub fn is_read_only(&self) -> bool {
        self.data.is_read_only()
    }

    pub fn config(&self) -> &ShelfConfig {
        &self.config
    }

    /// The default rack.
    pub fn rack(&self) -> ShelfResult<Rack<G>> {
        self.rack_named(DEFAULT_RACK)
    }

    /// Rack `name`, created on first use unless read-only.
    pub fn rack_named(&self, name: &str) -> ShelfResult<Rack<G>> {
        let racks = child(&self.data, RACKS_GROUP)?;
        Ok(Rack::with_config(child(&racks, name)?, self.config.clone()))
    }

    pub fn rack_names(&self) -> ShelfResult<Vec<String>> {
        list(&self.data, RACKS_GROUP)
    }

    /// Single-object shelf `name`.
    pub fn slot(&self, name: &str) -> ShelfResult<ObjectShelf<G>> {
        let slots = child(&self.data, SLOTS_GROUP)?;
        Ok(ObjectShelf::with_config(child(&slots, name)?, self.config.clone()))
    }

    pub fn slot_names(&self) -> ShelfResult<Vec<String>> {
        list(&self.data, SLOTS_GROUP)
    }

    /// Scratch namespace; its contents do not survive a reopen.
    pub fn cache(&self) -> ShelfResult<G> {
        child(&self.data, CACHE_GROUP)
    }

    /// Empty the cache and release the storage.
    pub fn close(self) -> ShelfResult<()> {
        self.clear_cache()?;
        debug!(root = %self.container.root().path(), "closed storage");
        Ok(())
    }

    fn clear_cache(&self) -> ShelfResult<()> {
        if self.is_read_only() {
            return Ok(());
        }
        let cache = child(&self.data, CACHE_GROUP)?;
        let stale = cache.members()?;
        if !stale.is_empty() {
            warn!(entries = stale.len(), "discarding stale cache entries");
            cache.clear()?;
        }
        Ok(())
    }
}

/// Open `name`, creating it unless `parent` is read-only.
fn child<G: Group>(parent: &G, name: &str) -> ShelfResult<G> {
    if parent.is_read_only() {
        Ok(parent.open_group(name)?)
    } else {
        Ok(parent.require_group(name)?)
    }
}

fn list<G: Group>(parent: &G, name: &str) -> ShelfResult<Vec<String>> {
    match parent.open_group(name) {
        Ok(group) => Ok(group.groups()?),
        Err(e) if e.is_not_found() => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}
