//! Shelf configuration.
//!
//! Loaded from TOML; every field is optional and falls back to
//! [`ShelfConfig::default`]:
//!
//! ```toml
//! write_buffer = 1048576
//! read_buffer = 65536
//! codec = "json"
//! sync_on_close = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::error::{ShelfError, ShelfResult};

/// Default capacity of the write and read buffers (1 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 1 << 20;

/// Tuning knobs for shelves, racks and storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfConfig {
    /// Capacity of the buffered writer; `None` writes through unbuffered.
    pub write_buffer: Option<usize>,
    /// Chunk size of the buffered reader.
    pub read_buffer: usize,
    /// Codec for newly saved objects.
    pub codec: Codec,
    /// Sync datasets to durable storage when a save completes.
    pub sync_on_close: bool,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            write_buffer: Some(DEFAULT_BUFFER_SIZE),
            read_buffer: DEFAULT_BUFFER_SIZE,
            codec: Codec::default(),
            sync_on_close: false,
        }
    }
}

impl ShelfConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> ShelfResult<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| ShelfError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ShelfResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ShelfError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> ShelfResult<String> {
        toml::to_string(self).map_err(|e| ShelfError::Config(e.to_string()))
    }

    /// Reject zero-sized buffers.
    pub fn validate(&self) -> ShelfResult<()> {
        if self.write_buffer == Some(0) {
            return Err(ShelfError::Config("write_buffer must be positive".into()));
        }
        if self.read_buffer == 0 {
            return Err(ShelfError::Config("read_buffer must be positive".into()));
        }
        Ok(())
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn unbuffered(mut self) -> Self {
        self.write_buffer = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(ShelfConfig::from_toml_str("").unwrap(), ShelfConfig::default());
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config = ShelfConfig::from_toml_str("read_buffer = 4096\ncodec = \"json\"\n").unwrap();
        assert_eq!(config.read_buffer, 4096);
        assert_eq!(config.codec, Codec::Json);
        assert_eq!(config.write_buffer, Some(DEFAULT_BUFFER_SIZE));
        assert!(!config.sync_on_close);
    }

    #[test]
    fn zero_sizes_are_rejected() {
        for doc in ["read_buffer = 0", "write_buffer = 0"] {
            assert!(matches!(
                ShelfConfig::from_toml_str(doc),
                Err(ShelfError::Config(_))
            ));
        }
    }

    #[test]
    fn unknown_codec_is_config_error() {
        assert!(matches!(
            ShelfConfig::from_toml_str("codec = \"pickle\""),
            Err(ShelfError::Config(_))
        ));
    }

    #[test]
    fn toml_roundtrip() {
        let config = ShelfConfig {
            write_buffer: Some(512),
            read_buffer: 256,
            codec: Codec::Json,
            sync_on_close: true,
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(ShelfConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.toml");
        std::fs::write(&path, "sync_on_close = true\n").unwrap();
        assert!(ShelfConfig::load(&path).unwrap().sync_on_close);
        assert!(matches!(
            ShelfConfig::load(dir.path().join("missing.toml")),
            Err(ShelfError::Config(_))
        ));
    }
}
