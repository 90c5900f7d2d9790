//! Byte-stream adapters over resizable datasets.
//!
//! Serializers want a file: something to `write` bytes into and `read` /
//! `readline` bytes out of. A [`shelf_store::Dataset`] only knows how to
//! resize and read or write slices. This crate bridges the two:
//!
//! - [`DatasetWriter`] -- appends every write directly (resize + slice write)
//! - [`BufferedDatasetWriter`] -- batches writes in a fixed-capacity buffer
//! - [`BufferedDatasetReader`] -- sliding-window reader with `read`,
//!   `readline`, `seek` and `tell`
//!
//! Writers implement [`std::io::Write`]; the reader implements
//! [`std::io::Read`], [`std::io::BufRead`] and [`std::io::Seek`], so any
//! codec working on std streams can use them unchanged.
//!
//! Both writers truncate their dataset on construction. The adapters borrow
//! the dataset and cannot outlive it; one adapter per dataset at a time.

pub mod error;
pub mod reader;
pub mod writer;

#[cfg(test)]
mod testing;

pub use error::{StreamError, StreamResult};
pub use reader::{BufferedDatasetReader, Whence, NEWLINE};
pub use writer::{BufferedDatasetWriter, DatasetWriter};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shelf_store::{Group, MemoryGroup};

    fn write_buffered(data: &[u8], capacity: usize) -> shelf_store::MemoryDataset {
        let root = MemoryGroup::new_root();
        let mut dset = root.create_dataset("blob", 0).unwrap();
        {
            let mut w = BufferedDatasetWriter::new(&mut dset, capacity).unwrap();
            // feed in uneven pieces to exercise both write paths
            for piece in data.chunks(capacity / 2 + 3) {
                w.write_bytes(piece).unwrap();
            }
            w.close().unwrap();
        }
        dset
    }

    fn read_all(dset: &shelf_store::MemoryDataset, buffsize: usize) -> Vec<u8> {
        let mut r = BufferedDatasetReader::new(dset, buffsize).unwrap();
        let mut out = Vec::new();
        loop {
            let part = r.read_bytes(Some(buffsize / 3 + 1)).unwrap();
            if part.is_empty() {
                break;
            }
            out.extend(part);
        }
        out
    }

    #[test]
    fn boundary_lengths_roundtrip() {
        let capacity = 64;
        for len in [0, 1, capacity - 1, capacity, capacity + 1, 3 * capacity, 5 * capacity + 7] {
            let data: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
            let dset = write_buffered(&data, capacity);
            for buffsize in [1, 13, capacity, 1000] {
                assert_eq!(read_all(&dset, buffsize), data, "len {len} buffsize {buffsize}");
            }
        }
    }

    #[test]
    fn unbuffered_and_buffered_agree() {
        let data = b"line one\nline two\n\x00\x01binary\n".repeat(20);
        let root = MemoryGroup::new_root();

        let mut plain = root.create_dataset("plain", 0).unwrap();
        {
            let mut w = DatasetWriter::new(&mut plain).unwrap();
            for piece in data.chunks(11) {
                w.write_bytes(piece).unwrap();
            }
        }
        let buffered = write_buffered(&data, 32);
        assert_eq!(read_all(&plain, 17), read_all(&buffered, 17));
    }

    proptest! {
        #[test]
        fn roundtrip_any_payload(
            data in proptest::collection::vec(any::<u8>(), 0..2048),
            capacity in 1usize..300,
            buffsize in 1usize..300,
        ) {
            let dset = write_buffered(&data, capacity);
            prop_assert_eq!(read_all(&dset, buffsize), data);
        }

        #[test]
        fn readline_reconstructs_stream(
            data in proptest::collection::vec(prop_oneof![Just(b'\n'), any::<u8>()], 0..512),
            buffsize in 1usize..64,
        ) {
            let dset = write_buffered(&data, 50);
            let mut r = BufferedDatasetReader::new(&dset, buffsize).unwrap();
            let mut joined = Vec::new();
            loop {
                let line = r.readline().unwrap();
                if line.is_empty() {
                    break;
                }
                let newlines = line.iter().filter(|&&b| b == NEWLINE).count();
                prop_assert!(newlines <= 1);
                if newlines == 1 {
                    prop_assert_eq!(line.last(), Some(&NEWLINE));
                }
                joined.extend(line);
            }
            prop_assert_eq!(joined, data);
        }

        #[test]
        fn tell_tracks_reads_and_seeks(
            len in 0usize..500,
            ops in proptest::collection::vec((0u8..4, 0i64..120), 1..30),
            buffsize in 1usize..64,
        ) {
            let data: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();
            let dset = write_buffered(&data, 40);
            let mut r = BufferedDatasetReader::new(&dset, buffsize).unwrap();
            let mut expected: u64 = 0;
            for (op, n) in ops {
                match op {
                    0 => {
                        let got = r.read_bytes(Some(n as usize)).unwrap();
                        let start = expected.min(len as u64) as usize;
                        let end = (start + n as usize).min(len);
                        if expected <= len as u64 {
                            prop_assert_eq!(&got[..], &data[start..end]);
                            expected += got.len() as u64;
                        } else {
                            prop_assert!(got.is_empty());
                        }
                    }
                    1 => {
                        expected = r.seek(n, Whence::Start).unwrap();
                    }
                    2 => {
                        let target = expected as i64 - n;
                        if target >= 0 {
                            expected = r.seek(-n, Whence::Current).unwrap();
                        }
                    }
                    _ => {
                        let target = len as i64 - n;
                        if target >= 0 {
                            expected = r.seek(-n, Whence::End).unwrap();
                        }
                    }
                }
                prop_assert_eq!(r.tell(), expected);
            }
            r.seek(0, Whence::Start).unwrap();
            prop_assert_eq!(r.read_bytes(None).unwrap(), data);
        }
    }
}
