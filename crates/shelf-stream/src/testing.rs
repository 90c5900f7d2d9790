//! Instrumented in-memory dataset for exercising the adapters.

use std::cell::Cell;

use shelf_store::{Dataset, StoreError, StoreResult};

/// A `Vec`-backed dataset that counts the operations performed on it.
#[derive(Debug, Default)]
pub(crate) struct CountingDataset {
    pub(crate) data: Vec<u8>,
    pub resizes: usize,
    pub writes: usize,
    pub syncs: usize,
    pub reads: Cell<usize>,
    /// Number of upcoming `write_slice` calls that fail with an I/O error.
    pub failing_writes: usize,
}

impl CountingDataset {
    pub fn with_content(content: &[u8]) -> Self {
        Self {
            data: content.to_vec(),
            ..Self::default()
        }
    }

    pub fn content(&self) -> &[u8] {
        &self.data
    }
}

impl Dataset for CountingDataset {
    fn name(&self) -> &str {
        "counting"
    }

    fn len(&self) -> StoreResult<u64> {
        Ok(self.data.len() as u64)
    }

    fn resize(&mut self, new_len: u64) -> StoreResult<()> {
        self.resizes += 1;
        self.data.resize(new_len as usize, 0);
        Ok(())
    }

    fn read_slice(&self, start: u64, end: u64) -> StoreResult<Vec<u8>> {
        self.reads.set(self.reads.get() + 1);
        let len = self.data.len() as u64;
        let start = start.min(len);
        let end = end.clamp(start, len);
        Ok(self.data[start as usize..end as usize].to_vec())
    }

    fn write_slice(&mut self, start: u64, bytes: &[u8]) -> StoreResult<()> {
        self.writes += 1;
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(StoreError::Io(std::io::Error::other("disk hiccup")));
        }
        let end = start as usize + bytes.len();
        if end > self.data.len() {
            return Err(StoreError::OutOfBounds {
                path: "/counting".into(),
                start,
                end: end as u64,
                len: self.data.len() as u64,
            });
        }
        self.data[start as usize..end].copy_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> StoreResult<()> {
        self.syncs += 1;
        Ok(())
    }
}
