use std::io::{self, BufRead, Read, Seek, SeekFrom};

use shelf_store::Dataset;
use tracing::trace;

use crate::error::{StreamError, StreamResult};

/// Line delimiter recognised by [`BufferedDatasetReader::readline`].
pub const NEWLINE: u8 = b'\n';

/// Origin of a seek.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Whence {
    /// Absolute offset from the start of the stream (origin `0`).
    Start,
    /// Relative to the current position (origin `1`).
    Current,
    /// Relative to the end of the dataset (origin `2`).
    End,
}

impl TryFrom<i32> for Whence {
    type Error = StreamError;

    fn try_from(origin: i32) -> StreamResult<Self> {
        match origin {
            0 => Ok(Self::Start),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            other => Err(StreamError::InvalidArgument(format!(
                "whence must be 0, 1 or 2, got {other}"
            ))),
        }
    }
}

/// Reads a dataset as a byte stream through a sliding window.
///
/// At most `buffsize` bytes of the dataset are held in memory at a time. The
/// window (chunk) always starts at the logical read position it was loaded
/// from, and the offsets of every [`NEWLINE`] inside it are computed once per
/// load so that [`readline`](Self::readline) does not rescan.
///
/// The dataset length is snapshotted at construction. Reads at or past the
/// end return empty vectors rather than errors, and short reads at the end
/// are normal.
pub struct BufferedDatasetReader<'a, D: Dataset + ?Sized> {
    dataset: &'a D,
    buffsize: usize,
    /// Logical position in the stream.
    readpointer: u64,
    dset_len: u64,
    chunk: Vec<u8>,
    /// Position inside `chunk`.
    datapointer: usize,
    /// The chunk reaches the end of the dataset.
    last_chunk: bool,
    /// Sorted offsets of `NEWLINE` within `chunk`.
    line_breaks: Vec<usize>,
    chunk_loads: usize,
}

impl<'a, D: Dataset + ?Sized> BufferedDatasetReader<'a, D> {
    /// Wrap `dataset` with a window of `buffsize` bytes and load the first chunk.
    pub fn new(dataset: &'a D, buffsize: usize) -> StreamResult<Self> {
        if buffsize == 0 {
            return Err(StreamError::InvalidArgument(
                "read buffer size must be non-zero".into(),
            ));
        }
        let dset_len = dataset.len()?;
        let mut reader = Self {
            dataset,
            buffsize,
            readpointer: 0,
            dset_len,
            chunk: Vec::new(),
            datapointer: 0,
            last_chunk: true,
            line_breaks: Vec::new(),
            chunk_loads: 0,
        };
        reader.fill_chunk()?;
        Ok(reader)
    }

    /// Window size in bytes.
    pub fn buffsize(&self) -> usize {
        self.buffsize
    }

    /// Dataset length as seen at construction.
    pub fn dataset_len(&self) -> u64 {
        self.dset_len
    }

    /// Number of chunks loaded so far, including the initial one.
    pub fn chunk_loads(&self) -> usize {
        self.chunk_loads
    }

    /// Current logical position.
    pub fn tell(&self) -> u64 {
        self.readpointer
    }

    fn at_eof(&self) -> bool {
        self.readpointer > self.dset_len
    }

    fn remaining_in_chunk(&self) -> usize {
        self.chunk.len() - self.datapointer
    }

    /// Load the window starting at `readpointer`.
    fn fill_chunk(&mut self) -> StreamResult<()> {
        let start = self.readpointer;
        let remaining = self.dset_len.saturating_sub(start);
        let (end, last) = if remaining <= self.buffsize as u64 {
            (self.dset_len, true)
        } else {
            (start + self.buffsize as u64, false)
        };
        self.chunk = self.dataset.read_slice(start, end)?;
        // A dataset that shrank under us yields a short chunk; stop there.
        self.last_chunk = last || (self.chunk.len() as u64) < end.saturating_sub(start);
        self.line_breaks = self
            .chunk
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| (b == NEWLINE).then_some(i))
            .collect();
        self.datapointer = 0;
        self.chunk_loads += 1;
        trace!(
            dataset = self.dataset.name(),
            start,
            len = self.chunk.len(),
            last = self.last_chunk,
            "loaded read chunk"
        );
        Ok(())
    }

    /// Move `n` bytes of the current chunk into `out`.
    fn take(&mut self, n: usize, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.chunk[self.datapointer..self.datapointer + n]);
        self.datapointer += n;
        self.readpointer += n as u64;
    }

    /// Read up to `size` bytes, or everything that is left when `size` is `None`.
    ///
    /// A sized read is served from the window, loading further chunks only
    /// when the current one runs out; it comes back short at the end of the
    /// data. Reading everything bypasses the window and slices the dataset
    /// directly.
    pub fn read_bytes(&mut self, size: Option<usize>) -> StreamResult<Vec<u8>> {
        if self.at_eof() {
            return Ok(Vec::new());
        }
        let Some(size) = size else {
            return self.read_rest();
        };

        let mut out = Vec::with_capacity(size.min(self.buffsize));
        let mut missing = size;
        loop {
            let available = self.remaining_in_chunk();
            if available >= missing {
                self.take(missing, &mut out);
                break;
            }
            self.take(available, &mut out);
            missing -= available;
            if self.last_chunk {
                break;
            }
            self.fill_chunk()?;
        }
        Ok(out)
    }

    fn read_rest(&mut self) -> StreamResult<Vec<u8>> {
        let start = self.readpointer;
        let bytes = self.dataset.read_slice(start, self.dset_len)?;
        self.readpointer = self.dset_len;
        // The window is stale now; leave an exhausted final chunk behind.
        self.chunk.clear();
        self.line_breaks.clear();
        self.datapointer = 0;
        self.last_chunk = true;
        Ok(bytes)
    }

    /// Read through the next [`NEWLINE`] (inclusive).
    ///
    /// At the end of the data the last line is returned without a delimiter;
    /// after that the result is empty.
    pub fn readline(&mut self) -> StreamResult<Vec<u8>> {
        if self.at_eof() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        loop {
            let dp = self.datapointer;
            let idx = self.line_breaks.partition_point(|&b| b < dp);
            if let Some(&brk) = self.line_breaks.get(idx) {
                self.take(brk + 1 - dp, &mut out);
                break;
            }
            let available = self.remaining_in_chunk();
            self.take(available, &mut out);
            if self.last_chunk {
                break;
            }
            self.fill_chunk()?;
        }
        Ok(out)
    }

    /// Move the logical position and reload the window there.
    ///
    /// Seeking past the end is allowed; subsequent reads return nothing.
    /// Seeking before the start is an [`StreamError::InvalidArgument`].
    pub fn seek(&mut self, offset: i64, whence: Whence) -> StreamResult<u64> {
        let base: i128 = match whence {
            Whence::Start => 0,
            Whence::Current => i128::from(self.readpointer),
            Whence::End => i128::from(self.dset_len),
        };
        let target = base + i128::from(offset);
        self.readpointer = u64::try_from(target).map_err(|_| {
            StreamError::InvalidArgument(format!("cannot seek to negative position {target}"))
        })?;
        self.fill_chunk()?;
        Ok(self.readpointer)
    }

    /// [`seek`](Self::seek) with a numeric origin (`0`, `1` or `2`).
    pub fn seek_origin(&mut self, offset: i64, origin: i32) -> StreamResult<u64> {
        self.seek(offset, Whence::try_from(origin)?)
    }
}

impl<D: Dataset + ?Sized> BufRead for BufferedDatasetReader<'_, D> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.at_eof() {
            return Ok(&[]);
        }
        if self.remaining_in_chunk() == 0 && !self.last_chunk {
            self.fill_chunk()?;
        }
        Ok(&self.chunk[self.datapointer..])
    }

    fn consume(&mut self, amt: usize) {
        let amt = amt.min(self.remaining_in_chunk());
        self.datapointer += amt;
        self.readpointer += amt as u64;
    }
}

impl<D: Dataset + ?Sized> Read for BufferedDatasetReader<'_, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<D: Dataset + ?Sized> Seek for BufferedDatasetReader<'_, D> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            SeekFrom::Start(n) => {
                let n = i64::try_from(n).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek offset too large")
                })?;
                (n, Whence::Start)
            }
            SeekFrom::Current(n) => (n, Whence::Current),
            SeekFrom::End(n) => (n, Whence::End),
        };
        Ok(BufferedDatasetReader::seek(self, offset, whence)?)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.readpointer)
    }
}

impl<D: Dataset + ?Sized> std::fmt::Debug for BufferedDatasetReader<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedDatasetReader")
            .field("dataset", &self.dataset.name())
            .field("buffsize", &self.buffsize)
            .field("readpointer", &self.readpointer)
            .field("dset_len", &self.dset_len)
            .field("chunk_len", &self.chunk.len())
            .field("last_chunk", &self.last_chunk)
            .finish()
    }
}
