//! An in-memory store.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;

use crate::{
    array::chunk_key_encoding::ChunkKeySeparator,
    storage::{
        MaybeBytes, StorageError, Store, StoreKey, StoreKeys, StoreKeysPrefixes, StorePrefix,
    },
};

/// An in-memory store.
///
/// All state lives in a single mapping from key to bytes. Delete operations always succeed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data_map: RwLock<BTreeMap<StoreKey, Vec<u8>>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the store, removing every key.
    pub fn clear(&self) {
        self.data_map.write().clear();
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        Ok(self.data_map.read().get(key).cloned())
    }

    fn exists(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self.data_map.read().contains_key(key))
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        Ok(self.data_map.read().get(key).map(|v| v.len() as u64))
    }

    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        self.data_map.write().insert(key.clone(), value.to_vec());
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self.data_map.write().remove(key).is_some())
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<bool, StorageError> {
        let mut data_map = self.data_map.write();
        let count = data_map.len();
        data_map.retain(|key, _| !key.has_prefix(prefix));
        Ok(data_map.len() != count)
    }

    fn list(&self) -> Result<StoreKeys, StorageError> {
        Ok(self.data_map.read().keys().cloned().collect())
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        Ok(self
            .data_map
            .read()
            .keys()
            .filter(|key| key.has_prefix(prefix))
            .cloned()
            .collect())
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let mut keys: StoreKeys = vec![];
        let mut prefixes: BTreeSet<StorePrefix> = BTreeSet::default();
        let data_map = self.data_map.read();
        for key in data_map.keys() {
            if key.has_prefix(prefix) {
                let key_strip = key.as_str().strip_prefix(prefix.as_str()).unwrap();
                let components: Vec<_> = key_strip.split('/').collect();
                if components.len() > 1 {
                    prefixes.insert(StorePrefix::new(
                        prefix.as_str().to_string() + components[0] + "/",
                    )?);
                } else if key.parent().eq(prefix) {
                    keys.push(key.clone());
                }
            }
        }
        let prefixes: Vec<StorePrefix> = prefixes.into_iter().collect();
        Ok(StoreKeysPrefixes::new(keys, prefixes))
    }

    fn default_chunk_key_separator(&self) -> ChunkKeySeparator {
        ChunkKeySeparator::Dot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn memory_store() -> Result<(), Box<dyn Error>> {
        let store = MemoryStore::new();
        crate::storage::store::test_util::store_write(&store)?;
        crate::storage::store::test_util::store_read(&store)?;
        crate::storage::store::test_util::store_list(&store)?;
        Ok(())
    }

    #[test]
    fn memory_list_dir() -> Result<(), Box<dyn Error>> {
        let store = MemoryStore::new();
        store.set(&"a/b".try_into()?, &[])?;
        store.set(&"a/c".try_into()?, &[])?;
        store.set(&"a/d/e".try_into()?, &[])?;
        store.set(&"a/f/g".try_into()?, &[])?;
        store.set(&"b/c/d".try_into()?, &[])?;

        let list_dir = store.list_dir(&StorePrefix::root())?;
        assert_eq!(list_dir.prefixes(), &["a/".try_into()?, "b/".try_into()?]);

        let list_dir = store.list_dir(&"a/".try_into()?)?;
        assert_eq!(list_dir.keys(), &["a/b".try_into()?, "a/c".try_into()?]);
        assert_eq!(list_dir.prefixes(), &["a/d/".try_into()?, "a/f/".try_into()?]);

        store.erase_prefix(&"b/".try_into()?)?;
        let list_dir = store.list_dir(&StorePrefix::root())?;
        assert_eq!(list_dir.prefixes(), &["a/".try_into()?]);

        Ok(())
    }

    #[test]
    fn memory_clear() -> Result<(), Box<dyn Error>> {
        let store = MemoryStore::new();
        store.set(&"a/b".try_into()?, &[1])?;
        store.clear();
        assert!(store.list()?.is_empty());
        Ok(())
    }
}
