use std::io;

use shelf_store::Dataset;
use tracing::{debug, warn};

use crate::error::{StreamError, StreamResult};

/// Append `bytes` to the end of `dataset` via resize + slice write.
///
/// If the slice write fails the dataset is shrunk back, so its length only
/// ever covers bytes that were actually written.
fn append<D: Dataset + ?Sized>(dataset: &mut D, bytes: &[u8]) -> StreamResult<()> {
    let old_len = dataset.len()?;
    dataset.resize(old_len + bytes.len() as u64)?;
    if let Err(e) = dataset.write_slice(old_len, bytes) {
        if let Err(undo) = dataset.resize(old_len) {
            warn!(
                dataset = dataset.name(),
                len = old_len,
                error = %undo,
                "could not roll back failed append"
            );
        }
        return Err(e.into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unbuffered
// ---------------------------------------------------------------------------

/// Writes every call straight through to a dataset.
///
/// Construction TRUNCATES the dataset to zero length; any previous content is
/// gone. Each write grows the dataset by exactly the number of bytes written.
pub struct DatasetWriter<'a, D: Dataset + ?Sized> {
    dataset: &'a mut D,
    sync_on_flush: bool,
}

impl<'a, D: Dataset + ?Sized> DatasetWriter<'a, D> {
    /// Truncate `dataset` and wrap it.
    pub fn new(dataset: &'a mut D) -> StreamResult<Self> {
        dataset.resize(0)?;
        Ok(Self {
            dataset,
            sync_on_flush: false,
        })
    }

    /// When set, [`flush`](Self::flush_dataset) asks the dataset to persist.
    /// Otherwise flushing is a no-op since nothing is buffered.
    pub fn sync_on_flush(mut self, sync: bool) -> Self {
        self.sync_on_flush = sync;
        self
    }

    /// Append `bytes` and return how many were written (always all of them).
    pub fn write_bytes(&mut self, bytes: &[u8]) -> StreamResult<usize> {
        if !bytes.is_empty() {
            append(&mut *self.dataset, bytes)?;
        }
        Ok(bytes.len())
    }

    /// Nothing is buffered; only syncs the dataset if configured to.
    pub fn flush_dataset(&mut self) -> StreamResult<()> {
        if self.sync_on_flush {
            self.dataset.flush()?;
        }
        Ok(())
    }
}

impl<D: Dataset + ?Sized> io::Write for DatasetWriter<'_, D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_bytes(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.flush_dataset()?)
    }
}

impl<D: Dataset + ?Sized> std::fmt::Debug for DatasetWriter<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetWriter")
            .field("dataset", &self.dataset.name())
            .field("sync_on_flush", &self.sync_on_flush)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Buffered
// ---------------------------------------------------------------------------

/// Batches writes in a fixed-capacity buffer in front of a dataset.
///
/// Construction TRUNCATES the dataset to zero length. Small writes only touch
/// the buffer; the dataset grows when the buffer overflows, on
/// [`flush_buffer`](Self::flush_buffer) / [`close`](Self::close), and when the
/// writer is dropped. Memory use never exceeds the capacity, no matter how
/// large a single write is.
///
/// Dropping the writer flushes pending bytes, but a failure at that point can
/// only be logged. Call [`close`](Self::close) to observe it.
pub struct BufferedDatasetWriter<'a, D: Dataset + ?Sized> {
    dataset: &'a mut D,
    /// Pending bytes; `buf.len()` is the fill pointer.
    buf: Vec<u8>,
    capacity: usize,
    sync_on_close: bool,
    flushes: usize,
}

impl<'a, D: Dataset + ?Sized> BufferedDatasetWriter<'a, D> {
    /// Truncate `dataset` and wrap it with a buffer of `capacity` bytes.
    pub fn new(dataset: &'a mut D, capacity: usize) -> StreamResult<Self> {
        if capacity == 0 {
            return Err(StreamError::InvalidArgument(
                "write buffer capacity must be non-zero".into(),
            ));
        }
        dataset.resize(0)?;
        Ok(Self {
            dataset,
            buf: Vec::with_capacity(capacity),
            capacity,
            sync_on_close: false,
            flushes: 0,
        })
    }

    /// When set, [`close`](Self::close) also asks the dataset to persist.
    pub fn sync_on_close(mut self, sync: bool) -> Self {
        self.sync_on_close = sync;
        self
    }

    /// Buffer capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes written but not yet in the dataset.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Number of times the buffer has been appended to the dataset.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Buffer `bytes` and return how many were accepted (always all of them).
    pub fn write_bytes(&mut self, bytes: &[u8]) -> StreamResult<usize> {
        let add_len = bytes.len();
        if self.capacity - self.buf.len() >= add_len {
            self.buf.extend_from_slice(bytes);
            return Ok(add_len);
        }

        self.flush_buffer()?;
        let mut rest = bytes;
        while rest.len() > self.capacity {
            let (head, tail) = rest.split_at(self.capacity);
            self.buf.extend_from_slice(head);
            self.flush_buffer()?;
            rest = tail;
        }
        // At most `capacity` bytes remain and the buffer is empty.
        self.buf.extend_from_slice(rest);
        Ok(add_len)
    }

    /// Append pending bytes to the dataset and empty the buffer.
    pub fn flush_buffer(&mut self) -> StreamResult<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        append(&mut *self.dataset, &self.buf)?;
        self.flushes += 1;
        debug!(
            dataset = self.dataset.name(),
            bytes = self.buf.len(),
            flushes = self.flushes,
            "flushed write buffer"
        );
        self.buf.clear();
        Ok(())
    }

    /// Flush pending bytes (and sync if configured). Idempotent.
    pub fn close(&mut self) -> StreamResult<()> {
        self.flush_buffer()?;
        if self.sync_on_close {
            self.dataset.flush()?;
        }
        Ok(())
    }
}

impl<D: Dataset + ?Sized> io::Write for BufferedDatasetWriter<'_, D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_bytes(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.flush_buffer()?)
    }
}

impl<D: Dataset + ?Sized> Drop for BufferedDatasetWriter<'_, D> {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let pending = self.buf.len();
        if let Err(e) = self.flush_buffer() {
            warn!(
                dataset = self.dataset.name(),
                pending,
                error = %e,
                "dropping buffered writer lost pending bytes"
            );
        }
    }
}

impl<D: Dataset + ?Sized> std::fmt::Debug for BufferedDatasetWriter<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedDatasetWriter")
            .field("dataset", &self.dataset.name())
            .field("capacity", &self.capacity)
            .field("pending", &self.buf.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CountingDataset;
    use std::io::Write;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    // -----------------------------------------------------------------------
    // Unbuffered
    // -----------------------------------------------------------------------

    #[test]
    fn unbuffered_truncates_on_construction() {
        let mut dset = CountingDataset::with_content(b"stale content");
        DatasetWriter::new(&mut dset).unwrap();
        assert_eq!(dset.len().unwrap(), 0);
    }

    #[test]
    fn unbuffered_appends_each_write() {
        let mut dset = CountingDataset::default();
        {
            let mut w = DatasetWriter::new(&mut dset).unwrap();
            assert_eq!(w.write_bytes(b"abc").unwrap(), 3);
            assert_eq!(w.write_bytes(b"").unwrap(), 0);
            assert_eq!(w.write_bytes(b"defg").unwrap(), 4);
        }
        assert_eq!(dset.content(), b"abcdefg");
        // one truncate + one resize per non-empty write
        assert_eq!(dset.resizes, 3);
        assert_eq!(dset.writes, 2);
    }

    #[test]
    fn unbuffered_flush_is_noop_unless_configured() {
        let mut dset = CountingDataset::default();
        {
            let mut w = DatasetWriter::new(&mut dset).unwrap();
            w.write_all(b"x").unwrap();
            w.flush().unwrap();
        }
        assert_eq!(dset.syncs, 0);

        {
            let mut w = DatasetWriter::new(&mut dset).unwrap().sync_on_flush(true);
            w.flush().unwrap();
        }
        assert_eq!(dset.syncs, 1);
    }

    // -----------------------------------------------------------------------
    // Buffered
    // -----------------------------------------------------------------------

    #[test]
    fn zero_capacity_is_rejected() {
        let mut dset = CountingDataset::default();
        let err = BufferedDatasetWriter::new(&mut dset, 0).unwrap_err();
        assert!(matches!(err, StreamError::InvalidArgument(_)));
    }

    #[test]
    fn buffered_truncates_on_construction() {
        let mut dset = CountingDataset::with_content(b"old");
        BufferedDatasetWriter::new(&mut dset, 8).unwrap();
        assert_eq!(dset.len().unwrap(), 0);
    }

    #[test]
    fn small_writes_stay_in_buffer() {
        let mut dset = CountingDataset::default();
        let mut w = BufferedDatasetWriter::new(&mut dset, 16).unwrap();
        w.write_bytes(b"hello ").unwrap();
        w.write_bytes(b"world").unwrap();
        assert_eq!(w.pending(), 11);
        assert_eq!(w.flushes(), 0);
        drop(w);
        assert_eq!(dset.content(), b"hello world");
        assert_eq!(dset.writes, 1);
    }

    #[test]
    fn overflow_flushes_previous_buffer_first() {
        let mut dset = CountingDataset::default();
        let mut w = BufferedDatasetWriter::new(&mut dset, 8).unwrap();
        w.write_bytes(b"abcde").unwrap();
        w.write_bytes(b"fghij").unwrap();
        assert_eq!(w.flushes(), 1);
        assert_eq!(w.pending(), 5);
        w.close().unwrap();
        drop(w);
        assert_eq!(dset.content(), b"abcdefghij");
    }

    #[test]
    fn exact_capacity_write_is_buffered() {
        let mut dset = CountingDataset::default();
        let mut w = BufferedDatasetWriter::new(&mut dset, 8).unwrap();
        w.write_bytes(b"12345678").unwrap();
        assert_eq!(w.pending(), 8);
        assert_eq!(w.flushes(), 0);
    }

    #[test]
    fn large_write_is_split_at_capacity() {
        let data = payload(10_000);
        let mut dset = CountingDataset::default();
        let mut w = BufferedDatasetWriter::new(&mut dset, 4096).unwrap();
        assert_eq!(w.write_bytes(&data).unwrap(), 10_000);
        // flushed at offsets 4096 and 8192, the tail is pending
        assert_eq!(w.flushes(), 2);
        assert_eq!(w.pending(), 1808);
        w.close().unwrap();
        assert_eq!(w.flushes(), 3);
        drop(w);
        assert_eq!(dset.len().unwrap(), 10_000);
        assert_eq!(dset.content(), data);
    }

    #[test]
    fn close_is_idempotent() {
        let mut dset = CountingDataset::default();
        let mut w = BufferedDatasetWriter::new(&mut dset, 4).unwrap();
        w.write_bytes(b"ab").unwrap();
        w.close().unwrap();
        w.close().unwrap();
        assert_eq!(w.flushes(), 1);
        drop(w);
        assert_eq!(dset.content(), b"ab");
    }

    #[test]
    fn sync_on_close_persists_dataset() {
        let mut dset = CountingDataset::default();
        let mut w = BufferedDatasetWriter::new(&mut dset, 4)
            .unwrap()
            .sync_on_close(true);
        w.write_bytes(b"ab").unwrap();
        w.close().unwrap();
        drop(w);
        assert_eq!(dset.syncs, 1);
    }

    #[test]
    fn drop_flushes_on_error_paths() {
        fn fails_midway<D: Dataset>(dset: &mut D) -> StreamResult<()> {
            let mut w = BufferedDatasetWriter::new(dset, 64)?;
            w.write_bytes(b"partial")?;
            Err(StreamError::InvalidArgument("caller bailed out".into()))
        }

        let mut dset = CountingDataset::default();
        assert!(fails_midway(&mut dset).is_err());
        assert_eq!(dset.content(), b"partial");
    }

    #[test]
    fn failed_flush_leaves_no_gap() {
        let mut dset = CountingDataset {
            failing_writes: 1,
            ..CountingDataset::default()
        };
        {
            let mut w = BufferedDatasetWriter::new(&mut dset, 8).unwrap();
            w.write_bytes(b"abcd").unwrap();
            assert!(w.close().is_err());
            assert_eq!(w.pending(), 4);
            // dropped here; the retry succeeds
        }
        assert_eq!(dset.content(), b"abcd");
    }

    #[test]
    fn failed_unbuffered_write_restores_length() {
        let mut dset = CountingDataset {
            failing_writes: 1,
            ..CountingDataset::default()
        };
        {
            let mut w = DatasetWriter::new(&mut dset).unwrap();
            assert!(w.write_bytes(b"lost").is_err());
            w.write_bytes(b"kept").unwrap();
        }
        assert_eq!(dset.content(), b"kept");
    }

    #[test]
    fn io_write_integration() {
        let mut dset = CountingDataset::default();
        {
            let mut w = BufferedDatasetWriter::new(&mut dset, 3).unwrap();
            write!(w, "{}-{}", "left", "right").unwrap();
            w.flush().unwrap();
            assert_eq!(w.pending(), 0);
        }
        assert_eq!(dset.content(), b"left-right");
    }

    #[test]
    fn debug_format() {
        let mut dset = CountingDataset::default();
        let w = BufferedDatasetWriter::new(&mut dset, 4).unwrap();
        let debug = format!("{w:?}");
        assert!(debug.contains("BufferedDatasetWriter"));
        assert!(debug.contains("pending"));
    }
}
