//! Directory-backed namespace tree.
//!
//! Each group is a directory, each dataset is a regular file named
//! `<name>.dset`, and group attributes live in a `.attrs.json` file holding a
//! JSON object of strings. Attribute files are replaced atomically through a
//! temporary file in the same directory.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use shelf_types::name::RESERVED_SUFFIX;
use shelf_types::NodeName;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{clamp_slice, join_path, to_index, Dataset, Group};

const ATTRS_FILE: &str = ".attrs.json";

/// A group stored as a directory on disk.
#[derive(Clone, Debug)]
pub struct DirGroup {
    dir: PathBuf,
    path: String,
    read_only: bool,
}

/// A dataset stored as a single file on disk.
#[derive(Debug)]
pub struct FileDataset {
    name: String,
    path: String,
    file: File,
    read_only: bool,
}

impl DirGroup {
    /// Open an existing directory as the root group.
    pub fn open_root(dir: impl AsRef<Path>, read_only: bool) -> StoreResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(StoreError::NotFound {
                path: dir.display().to_string(),
            });
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            path: "/".to_string(),
            read_only,
        })
    }

    /// Directory on disk backing this group.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.read_only {
            return Err(StoreError::ReadOnly {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    fn group_dir(&self, name: &NodeName) -> PathBuf {
        self.dir.join(name.as_str())
    }

    fn dataset_file(&self, name: &NodeName) -> PathBuf {
        self.dir.join(format!("{name}{RESERVED_SUFFIX}"))
    }

    fn read_attrs(&self) -> StoreResult<BTreeMap<String, String>> {
        match fs::read(self.dir.join(ATTRS_FILE)) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_attrs(&self, attrs: &BTreeMap<String, String>) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(attrs)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.dir.join(ATTRS_FILE))
            .map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn list(&self, want_dirs: bool) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.starts_with('.') {
                continue;
            }
            let file_type = entry.file_type()?;
            if want_dirs && file_type.is_dir() {
                names.push(file_name.to_string());
            } else if !want_dirs && file_type.is_file() {
                if let Some(stem) = file_name.strip_suffix(RESERVED_SUFFIX) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

impl Group for DirGroup {
    type Dataset = FileDataset;

    fn path(&self) -> &str {
        &self.path
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn open_dataset(&self, name: &str) -> StoreResult<FileDataset> {
        let name = NodeName::new(name)?;
        let path = join_path(&self.path, name.as_str());
        let file_path = self.dataset_file(&name);
        if !file_path.is_file() {
            if self.group_dir(&name).is_dir() {
                return Err(StoreError::WrongKind {
                    path,
                    expected: "dataset",
                });
            }
            return Err(StoreError::NotFound { path });
        }
        let file = OpenOptions::new()
            .read(true)
            .write(!self.read_only)
            .open(&file_path)?;
        Ok(FileDataset {
            name: name.into_string(),
            path,
            file,
            read_only: self.read_only,
        })
    }

    fn create_dataset(&self, name: &str, initial_len: u64) -> StoreResult<FileDataset> {
        self.check_writable()?;
        let name = NodeName::new(name)?;
        let path = join_path(&self.path, name.as_str());
        if self.group_dir(&name).exists() {
            return Err(StoreError::AlreadyExists { path });
        }
        let file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(self.dataset_file(&name))
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists { path });
            }
            Err(e) => return Err(e.into()),
        };
        file.set_len(initial_len)?;
        debug!(path = %path, initial_len, "created dataset");
        Ok(FileDataset {
            name: name.into_string(),
            path,
            file,
            read_only: false,
        })
    }

    fn open_group(&self, name: &str) -> StoreResult<DirGroup> {
        let name = NodeName::new(name)?;
        let path = join_path(&self.path, name.as_str());
        let dir = self.group_dir(&name);
        if dir.is_dir() {
            return Ok(DirGroup {
                dir,
                path,
                read_only: self.read_only,
            });
        }
        if self.dataset_file(&name).is_file() {
            return Err(StoreError::WrongKind {
                path,
                expected: "group",
            });
        }
        Err(StoreError::NotFound { path })
    }

    fn create_group(&self, name: &str) -> StoreResult<DirGroup> {
        self.check_writable()?;
        let name = NodeName::new(name)?;
        let path = join_path(&self.path, name.as_str());
        if self.dataset_file(&name).exists() {
            return Err(StoreError::AlreadyExists { path });
        }
        let dir = self.group_dir(&name);
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists { path });
            }
            Err(e) => return Err(e.into()),
        }
        Ok(DirGroup {
            dir,
            path,
            read_only: false,
        })
    }

    fn contains(&self, name: &str) -> StoreResult<bool> {
        let name = NodeName::new(name)?;
        Ok(self.group_dir(&name).is_dir() || self.dataset_file(&name).is_file())
    }

    fn remove(&self, name: &str) -> StoreResult<()> {
        self.check_writable()?;
        let name = NodeName::new(name)?;
        let dir = self.group_dir(&name);
        if dir.is_dir() {
            fs::remove_dir_all(&dir)?;
            return Ok(());
        }
        let file = self.dataset_file(&name);
        if file.is_file() {
            fs::remove_file(&file)?;
            return Ok(());
        }
        Err(StoreError::NotFound {
            path: join_path(&self.path, name.as_str()),
        })
    }

    fn groups(&self) -> StoreResult<Vec<String>> {
        self.list(true)
    }

    fn datasets(&self) -> StoreResult<Vec<String>> {
        self.list(false)
    }

    fn attr(&self, name: &str) -> StoreResult<Option<String>> {
        Ok(self.read_attrs()?.remove(name))
    }

    fn set_attr(&self, name: &str, value: &str) -> StoreResult<()> {
        self.check_writable()?;
        let mut attrs = self.read_attrs()?;
        attrs.insert(name.to_string(), value.to_string());
        self.write_attrs(&attrs)
    }
}

impl FileDataset {
    fn check_writable(&self) -> StoreResult<()> {
        if self.read_only {
            return Err(StoreError::ReadOnly {
                path: self.path.clone(),
            });
        }
        Ok(())
    }
}

impl Dataset for FileDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> StoreResult<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn resize(&mut self, new_len: u64) -> StoreResult<()> {
        self.check_writable()?;
        self.file.set_len(new_len)?;
        Ok(())
    }

    fn read_slice(&self, start: u64, end: u64) -> StoreResult<Vec<u8>> {
        let (start, end) = clamp_slice(start, end, self.len()?);
        let mut buf = vec![0u8; to_index(end - start, &self.path)?];
        if !buf.is_empty() {
            let mut file = &self.file;
            file.seek(SeekFrom::Start(start))?;
            file.read_exact(&mut buf)?;
        }
        Ok(buf)
    }

    fn write_slice(&mut self, start: u64, data: &[u8]) -> StoreResult<()> {
        self.check_writable()?;
        let len = self.len()?;
        let end = start.saturating_add(data.len() as u64);
        if end > len {
            return Err(StoreError::OutOfBounds {
                path: self.path.clone(),
                start,
                end,
                len,
            });
        }
        self.file.seek(SeekFrom::Start(start))?;
        self.file.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> StoreResult<()> {
        if !self.read_only {
            self.file.sync_data()?;
        }
        Ok(())
    }
}
