//! Resizable byte-array datasets and versioned namespace containers.
//!
//! A container is a tree of groups. Groups hold child groups, string
//! attributes and [`Dataset`]s: named, growable one-dimensional byte arrays
//! whose only operations are resize and slice read/write.
//!
//! # Backends
//!
//! All backends implement the [`Group`] and [`Dataset`] traits:
//!
//! - [`MemoryGroup`] -- `RwLock`-guarded tree for tests and embedding
//! - [`DirGroup`] -- directory per group, file per dataset
//!
//! # Containers
//!
//! [`Container`] stamps a fresh root with the running build's version pair
//! and refuses to open roots whose stamp is incompatible.
//!
//! # Design Rules
//!
//! 1. Reads past the end of a dataset are clamped, never an error.
//! 2. Slice writes never grow a dataset; callers resize first.
//! 3. A name identifies at most one member of a group, dataset or group.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod container;
pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use container::{read_stamp, Container, OpenMode};
pub use error::{StoreError, StoreResult};
pub use fs::{DirGroup, FileDataset};
pub use memory::{MemoryDataset, MemoryGroup};
pub use traits::{Dataset, Group};
