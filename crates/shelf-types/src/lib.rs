//! Foundation types for shelf.
//!
//! This crate provides the small value types shared by every other shelf
//! crate: version numbers used to stamp and gate containers, and validated
//! namespace names used for groups, datasets and rack keys.
//!
//! # Key Types
//!
//! - [`Version`] -- `MAJOR.MINOR.PATCH[-pre]` version number with release ordering
//! - [`VersionStamp`] -- the pair written into a container when it is created
//! - [`Compatibility`] -- the pair a running build checks a stamp against
//! - [`NodeName`] -- a validated name of a namespace member

pub mod error;
pub mod name;
pub mod version;

pub use error::TypeError;
pub use name::NodeName;
pub use version::{Compatibility, Verdict, Version, VersionStamp};
