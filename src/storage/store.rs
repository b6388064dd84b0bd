//! Zarr store backends.

mod filesystem;
mod http;
mod memory;

pub use filesystem::{FilesystemStore, FilesystemStoreCreateError};
pub use http::{HttpStore, HttpStoreCreateError};
pub use memory::MemoryStore;

#[cfg(test)]
pub(crate) mod test_util {
    use crate::byte_range::ByteRange;
    use crate::storage::{Store, StoreKey, StorePrefix};

    pub fn store_write(store: &dyn Store) -> Result<(), Box<dyn std::error::Error>> {
        store.set(&StoreKey::new("a/b")?, &[0, 1, 2, 3])?;
        store.set(&StoreKey::new("a/c")?, &[0])?;
        store.set(&StoreKey::new("a/d/e")?, &[])?;
        store.set(&StoreKey::new("a/d/f")?, &[])?;
        assert!(!store.set_if_not_exists(&StoreKey::new("a/b")?, &[4])?);
        assert!(store.set_if_not_exists(&StoreKey::new("a/g")?, &[4])?);
        assert!(store.erase(&StoreKey::new("a/g")?)?);
        assert!(store.erase_prefix(&StorePrefix::new("a/d/")?)?);
        Ok(())
    }

    pub fn store_read(store: &dyn Store) -> Result<(), Box<dyn std::error::Error>> {
        assert!(store.exists(&StoreKey::new("a/b")?)?);
        assert!(!store.exists(&StoreKey::new("a/missing")?)?);
        assert_eq!(store.get(&StoreKey::new("a/b")?)?.unwrap(), &[0, 1, 2, 3]);
        assert!(store.get(&StoreKey::new("a/missing")?)?.is_none());
        assert_eq!(store.size_key(&StoreKey::new("a/b")?)?, Some(4));
        assert_eq!(
            store
                .get_partial(&StoreKey::new("a/b")?, &ByteRange::FromStart(1, Some(2)))?
                .unwrap(),
            &[1, 2]
        );
        assert_eq!(
            store
                .get_partial(&StoreKey::new("a/b")?, &ByteRange::FromEnd(0, Some(2)))?
                .unwrap(),
            &[2, 3]
        );
        assert!(store
            .get_partial(&StoreKey::new("a/b")?, &ByteRange::FromStart(4, None))
            .is_err());
        Ok(())
    }

    pub fn store_list(store: &dyn Store) -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(
            store.list()?,
            &[StoreKey::new("a/b")?, StoreKey::new("a/c")?]
        );
        assert_eq!(
            store.list_prefix(&StorePrefix::new("a/")?)?,
            &[StoreKey::new("a/b")?, StoreKey::new("a/c")?]
        );
        assert!(store.list_prefix(&StorePrefix::new("b/")?)?.is_empty());
        let list_dir = store.list_dir(&StorePrefix::new("a/")?)?;
        assert_eq!(
            list_dir.keys(),
            &[StoreKey::new("a/b")?, StoreKey::new("a/c")?]
        );
        Ok(())
    }
}
