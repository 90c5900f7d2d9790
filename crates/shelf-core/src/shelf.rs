use serde::de::DeserializeOwned;
use serde::Serialize;
use shelf_store::{Dataset, Group, StoreError};
use shelf_stream::{BufferedDatasetReader, BufferedDatasetWriter, DatasetWriter};
use tracing::debug;

use crate::codec::Codec;
use crate::config::ShelfConfig;
use crate::error::{ShelfError, ShelfResult};

/// Name of the dataset holding a shelf's encoded object.
pub const BLOB_DATASET: &str = "shelf_blob";
/// Group attribute recording the codec of the stored blob.
pub const CODEC_ATTR: &str = "shelf_codec";

/// Persists a single object in one byte dataset of a namespace.
///
/// The object is encoded with the configured [`Codec`] through a
/// [`BufferedDatasetWriter`] (or a plain [`DatasetWriter`] when
/// `write_buffer` is `None`) into the `shelf_blob` dataset, and decoded back
/// through a [`BufferedDatasetReader`]. The codec used for a save is recorded
/// on the group so a later load decodes with the right one.
#[derive(Debug, Clone)]
pub struct ObjectShelf<G: Group> {
    group: G,
    config: ShelfConfig,
}

impl<G: Group> ObjectShelf<G> {
    /// Shelf over `group` with the default configuration.
    pub fn new(group: G) -> Self {
        Self::with_config(group, ShelfConfig::default())
    }

    pub fn with_config(group: G, config: ShelfConfig) -> Self {
        Self { group, config }
    }

    /// Use `codec` for subsequent saves.
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.config.codec = codec;
        self
    }

    pub fn group(&self) -> &G {
        &self.group
    }

    pub fn config(&self) -> &ShelfConfig {
        &self.config
    }

    /// Returns `true` if an object has been saved here.
    pub fn exists(&self) -> ShelfResult<bool> {
        Ok(self.group.contains(BLOB_DATASET)?)
    }

    /// Open the raw blob dataset.
    pub fn blob(&self) -> ShelfResult<G::Dataset> {
        self.group.open_dataset(BLOB_DATASET).map_err(|e| match e {
            StoreError::NotFound { .. } => {
                ShelfError::NotFound(format!("no object stored in {}", self.group.path()))
            }
            other => other.into(),
        })
    }

    /// Codec a stored blob was written with, falling back to the configured one.
    pub fn stored_codec(&self) -> ShelfResult<Codec> {
        match self.group.attr(CODEC_ATTR)? {
            Some(name) => name.parse(),
            None => Ok(self.config.codec),
        }
    }

    /// Encode `obj` into the blob dataset.
    ///
    /// Fails with [`ShelfError::Conflict`] if an object is already stored and
    /// `overwrite` is `false`. On failure the dataset keeps whatever was
    /// flushed before the error.
    pub fn save<T: Serialize + ?Sized>(&self, obj: &T, overwrite: bool) -> ShelfResult<()> {
        let mut dset = match self.group.open_dataset(BLOB_DATASET) {
            Ok(dset) => {
                if !overwrite {
                    return Err(ShelfError::Conflict(format!(
                        "an object is already stored in {}",
                        self.group.path()
                    )));
                }
                dset
            }
            Err(StoreError::NotFound { .. }) => self.group.create_dataset(BLOB_DATASET, 0)?,
            Err(e) => return Err(e.into()),
        };

        let codec = self.config.codec;
        match self.config.write_buffer {
            Some(capacity) => {
                let mut writer = BufferedDatasetWriter::new(&mut dset, capacity)?
                    .sync_on_close(self.config.sync_on_close);
                codec.encode(obj, &mut writer)?;
                writer.close()?;
            }
            None => {
                let mut writer =
                    DatasetWriter::new(&mut dset)?.sync_on_flush(self.config.sync_on_close);
                codec.encode(obj, &mut writer)?;
                writer.flush_dataset()?;
            }
        }
        self.group.set_attr(CODEC_ATTR, codec.name())?;

        let bytes = dset.len()?;
        debug!(group = %self.group.path(), codec = %codec, bytes, "saved object");
        Ok(())
    }

    /// Decode the stored object.
    pub fn load<T: DeserializeOwned>(&self) -> ShelfResult<T> {
        let dset = self.blob()?;
        let codec = self.stored_codec()?;
        let reader = BufferedDatasetReader::new(&dset, self.config.read_buffer)?;
        let obj = codec.decode(reader)?;
        debug!(group = %self.group.path(), codec = %codec, "loaded object");
        Ok(obj)
    }
}
