use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use shelf_types::NodeName;

use crate::error::{StoreError, StoreResult};
use crate::traits::{clamp_slice, join_path, to_index, Dataset, Group};

type SharedBytes = Arc<RwLock<Vec<u8>>>;
type SharedNode = Arc<RwLock<GroupNode>>;

enum Member {
    Group(SharedNode),
    Dataset(SharedBytes),
}

#[derive(Default)]
struct GroupNode {
    members: BTreeMap<String, Member>,
    attrs: BTreeMap<String, String>,
}

/// In-memory namespace tree.
///
/// Intended for tests and embedding. Every node sits behind a `RwLock`, and
/// handles share the node they were opened from. A handle to a removed member
/// stays usable but is detached from the tree.
#[derive(Clone)]
pub struct MemoryGroup {
    path: String,
    node: SharedNode,
}

/// Dataset handle of the in-memory backend.
#[derive(Clone)]
pub struct MemoryDataset {
    name: String,
    path: String,
    data: SharedBytes,
}

impl MemoryGroup {
    /// Create a new, empty root group.
    pub fn new_root() -> Self {
        Self {
            path: "/".to_string(),
            node: Arc::new(RwLock::new(GroupNode::default())),
        }
    }

    fn child_path(&self, name: &NodeName) -> String {
        join_path(&self.path, name.as_str())
    }
}

impl Default for MemoryGroup {
    fn default() -> Self {
        Self::new_root()
    }
}

impl Group for MemoryGroup {
    type Dataset = MemoryDataset;

    fn path(&self) -> &str {
        &self.path
    }

    fn open_dataset(&self, name: &str) -> StoreResult<MemoryDataset> {
        let name = NodeName::new(name)?;
        let path = self.child_path(&name);
        let node = self.node.read().expect("lock poisoned");
        match node.members.get(name.as_str()) {
            Some(Member::Dataset(data)) => Ok(MemoryDataset {
                name: name.into_string(),
                path,
                data: Arc::clone(data),
            }),
            Some(Member::Group(_)) => Err(StoreError::WrongKind {
                path,
                expected: "dataset",
            }),
            None => Err(StoreError::NotFound { path }),
        }
    }

    fn create_dataset(&self, name: &str, initial_len: u64) -> StoreResult<MemoryDataset> {
        let name = NodeName::new(name)?;
        let path = self.child_path(&name);
        let len = to_index(initial_len, &path)?;
        let mut node = self.node.write().expect("lock poisoned");
        if node.members.contains_key(name.as_str()) {
            return Err(StoreError::AlreadyExists { path });
        }
        let data = Arc::new(RwLock::new(vec![0u8; len]));
        node.members
            .insert(name.as_str().to_string(), Member::Dataset(Arc::clone(&data)));
        Ok(MemoryDataset {
            name: name.into_string(),
            path,
            data,
        })
    }

    fn open_group(&self, name: &str) -> StoreResult<MemoryGroup> {
        let name = NodeName::new(name)?;
        let path = self.child_path(&name);
        let node = self.node.read().expect("lock poisoned");
        match node.members.get(name.as_str()) {
            Some(Member::Group(child)) => Ok(MemoryGroup {
                path,
                node: Arc::clone(child),
            }),
            Some(Member::Dataset(_)) => Err(StoreError::WrongKind {
                path,
                expected: "group",
            }),
            None => Err(StoreError::NotFound { path }),
        }
    }

    fn create_group(&self, name: &str) -> StoreResult<MemoryGroup> {
        let name = NodeName::new(name)?;
        let path = self.child_path(&name);
        let mut node = self.node.write().expect("lock poisoned");
        if node.members.contains_key(name.as_str()) {
            return Err(StoreError::AlreadyExists { path });
        }
        let child: SharedNode = Arc::new(RwLock::new(GroupNode::default()));
        node.members
            .insert(name.as_str().to_string(), Member::Group(Arc::clone(&child)));
        Ok(MemoryGroup { path, node: child })
    }

    fn contains(&self, name: &str) -> StoreResult<bool> {
        let name = NodeName::new(name)?;
        let node = self.node.read().expect("lock poisoned");
        Ok(node.members.contains_key(name.as_str()))
    }

    fn remove(&self, name: &str) -> StoreResult<()> {
        let name = NodeName::new(name)?;
        let mut node = self.node.write().expect("lock poisoned");
        match node.members.remove(name.as_str()) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                path: self.child_path(&name),
            }),
        }
    }

    fn groups(&self) -> StoreResult<Vec<String>> {
        let node = self.node.read().expect("lock poisoned");
        Ok(node
            .members
            .iter()
            .filter(|(_, m)| matches!(m, Member::Group(_)))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn datasets(&self) -> StoreResult<Vec<String>> {
        let node = self.node.read().expect("lock poisoned");
        Ok(node
            .members
            .iter()
            .filter(|(_, m)| matches!(m, Member::Dataset(_)))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn attr(&self, name: &str) -> StoreResult<Option<String>> {
        let node = self.node.read().expect("lock poisoned");
        Ok(node.attrs.get(name).cloned())
    }

    fn set_attr(&self, name: &str, value: &str) -> StoreResult<()> {
        let mut node = self.node.write().expect("lock poisoned");
        node.attrs.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

impl std::fmt::Debug for MemoryGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.node.read().expect("lock poisoned").members.len();
        f.debug_struct("MemoryGroup")
            .field("path", &self.path)
            .field("member_count", &count)
            .finish()
    }
}

impl Dataset for MemoryDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> StoreResult<u64> {
        Ok(self.data.read().expect("lock poisoned").len() as u64)
    }

    fn resize(&mut self, new_len: u64) -> StoreResult<()> {
        let new_len = to_index(new_len, &self.path)?;
        self.data
            .write()
            .expect("lock poisoned")
            .resize(new_len, 0);
        Ok(())
    }

    fn read_slice(&self, start: u64, end: u64) -> StoreResult<Vec<u8>> {
        let data = self.data.read().expect("lock poisoned");
        let (start, end) = clamp_slice(start, end, data.len() as u64);
        Ok(data[start as usize..end as usize].to_vec())
    }

    fn write_slice(&mut self, start: u64, bytes: &[u8]) -> StoreResult<()> {
        let mut data = self.data.write().expect("lock poisoned");
        let len = data.len() as u64;
        let end = start.saturating_add(bytes.len() as u64);
        if end > len {
            return Err(StoreError::OutOfBounds {
                path: self.path.clone(),
                start,
                end,
                len,
            });
        }
        data[start as usize..end as usize].copy_from_slice(bytes);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.data.read().expect("lock poisoned").len();
        f.debug_struct("MemoryDataset")
            .field("path", &self.path)
            .field("len", &len)
            .finish()
    }
}
