//! Object shelves on top of shelf datasets.
//!
//! - [`ObjectShelf`] -- one serialized object per namespace
//! - [`HookedShelf`] / [`ContextHooks`] -- objects that substitute or
//!   complete themselves around save and load
//! - [`Rack`] -- dict-like collection of shelves keyed by child namespace
//! - [`Storage`] -- racks, slots and a cache inside a versioned container
//!
//! ```no_run
//! use shelf_core::{OpenMode, ShelfConfig, Storage};
//!
//! # fn main() -> shelf_core::ShelfResult<()> {
//! let storage = Storage::open("/tmp/models", OpenMode::Append, ShelfConfig::default())?;
//! let rack = storage.rack()?;
//! rack.set("weights", &vec![0.5f64, 0.25])?;
//! let weights: Vec<f64> = rack.get("weights")?;
//! # let _ = weights;
//! storage.close()?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod hooks;
pub mod rack;
pub mod shelf;
pub mod storage;

pub use codec::Codec;
pub use config::{ShelfConfig, DEFAULT_BUFFER_SIZE};
pub use error::{ShelfError, ShelfResult};
pub use hooks::{ContextHooks, HookedShelf};
pub use rack::Rack;
pub use shelf::{ObjectShelf, BLOB_DATASET, CODEC_ATTR};
pub use storage::{compatibility, library_version, Storage, DEFAULT_RACK, STORAGE_FORMAT_VERSION};

pub use shelf_store;
pub use shelf_store::{DirGroup, Group, MemoryGroup, OpenMode};
