//! A local filesystem store.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/stores/filesystem/v1.0.html>.

use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use thiserror::Error;
use walkdir::WalkDir;

use crate::{
    byte_range::ByteRange,
    storage::{
        MaybeBytes, StorageError, Store, StoreKey, StoreKeyError, StoreKeys, StoreKeysPrefixes,
        StorePrefix, StorePrefixes,
    },
};

/// A local filesystem store.
///
/// Keys are paths relative to a base directory. `set` creates intermediate directories.
#[derive(Debug)]
pub struct FilesystemStore {
    base_path: PathBuf,
    readonly: bool,
    // serializes mutations of the directory tree (set/erase of overlapping paths)
    mutation: Mutex<()>,
}

/// A filesystem store creation error.
#[derive(Debug, Error)]
pub enum FilesystemStoreCreateError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The path is not valid on this system.
    #[error("base path {0} is not valid")]
    InvalidBasePath(PathBuf),
}

impl FilesystemStore {
    /// Create a new filesystem store at a given `base_path`.
    ///
    /// The directory is created if it does not exist.
    ///
    /// # Errors
    /// Returns a [`FilesystemStoreCreateError`] if `base_path` is not valid or points to an
    /// existing file rather than a directory.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, FilesystemStoreCreateError> {
        let base_path = base_path.as_ref().to_path_buf();
        if base_path.to_str().is_none() {
            return Err(FilesystemStoreCreateError::InvalidBasePath(base_path));
        }

        let readonly = if base_path.exists() {
            if base_path.is_file() {
                return Err(FilesystemStoreCreateError::InvalidBasePath(base_path));
            }
            let md = std::fs::metadata(&base_path)?;
            md.permissions().readonly()
        } else {
            std::fs::create_dir_all(&base_path)?;
            false
        };

        Ok(Self {
            base_path,
            readonly,
            mutation: Mutex::default(),
        })
    }

    /// Maps a [`StoreKey`] to a filesystem [`PathBuf`].
    #[must_use]
    pub fn key_to_fspath(&self, key: &StoreKey) -> PathBuf {
        let mut path = self.base_path.clone();
        if !key.as_str().is_empty() {
            path.push(key.as_str());
        }
        path
    }

    /// Maps a filesystem path to a [`StoreKey`].
    fn fspath_to_key(&self, path: &Path) -> Result<StoreKey, StoreKeyError> {
        let path = pathdiff::diff_paths(path, &self.base_path)
            .ok_or_else(|| StoreKeyError::from(path.to_str().unwrap_or_default().to_string()))?;
        // store keys are `/` separated regardless of the platform separator
        let components: Vec<_> = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        StoreKey::new(components.join("/"))
    }

    /// Maps a [`StorePrefix`] to a filesystem [`PathBuf`].
    #[must_use]
    pub fn prefix_to_fspath(&self, prefix: &StorePrefix) -> PathBuf {
        let mut path = self.base_path.clone();
        path.push(prefix.as_str());
        path
    }
}

impl Store for FilesystemStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let mut file = match File::open(self.key_to_fspath(key)) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(Some(buffer))
    }

    fn get_partial(
        &self,
        key: &StoreKey,
        byte_range: &ByteRange,
    ) -> Result<MaybeBytes, StorageError> {
        let mut file = match File::open(self.key_to_fspath(key)) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let size = file.metadata()?.len();
        crate::byte_range::validate_byte_ranges(&[*byte_range], size)?;
        if byte_range.start(size) >= size || byte_range.length(size) == 0 {
            return Err(crate::byte_range::InvalidByteRangeError::new(*byte_range, size).into());
        }
        file.seek(SeekFrom::Start(byte_range.start(size)))?;
        let length = usize::try_from(byte_range.length(size)).unwrap();
        let mut buffer = vec![0; length];
        file.read_exact(&mut buffer)?;
        Ok(Some(buffer))
    }

    fn exists(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self.key_to_fspath(key).is_file())
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let key_path = self.key_to_fspath(key);
        std::fs::metadata(key_path).map_or(Ok(None), |metadata| Ok(Some(metadata.len())))
    }

    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }
        let _lock = self.mutation.lock();

        let key_path = self.key_to_fspath(key);
        if let Some(parent) = key_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(key_path)?;
        file.write_all(value)?;
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<bool, StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }
        let _lock = self.mutation.lock();

        let key_path = self.key_to_fspath(key);
        if key_path.is_dir() {
            // a directory key is erasable only if no descendant directory exists
            let has_descendant_dir = WalkDir::new(&key_path)
                .min_depth(1)
                .into_iter()
                .filter_map(Result::ok)
                .any(|entry| entry.path().is_dir());
            if has_descendant_dir {
                return Err(StorageError::Other(format!(
                    "cannot erase {}: it has descendant directories",
                    key.as_str()
                )));
            }
            std::fs::remove_dir_all(&key_path)?;
            return Ok(true);
        }
        match std::fs::remove_file(key_path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<bool, StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }
        let _lock = self.mutation.lock();

        let prefix_path = self.prefix_to_fspath(prefix);
        if prefix.as_str().is_empty() {
            // erase the children of the base directory, not the base directory itself
            let mut any = false;
            for entry in std::fs::read_dir(&self.base_path)? {
                let entry = entry?;
                if entry.path().is_dir() {
                    std::fs::remove_dir_all(entry.path())?;
                } else {
                    std::fs::remove_file(entry.path())?;
                }
                any = true;
            }
            return Ok(any);
        }
        match std::fs::remove_dir_all(prefix_path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn list(&self) -> Result<StoreKeys, StorageError> {
        Ok(WalkDir::new(&self.base_path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| self.fspath_to_key(entry.path()).ok())
            .collect())
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        Ok(WalkDir::new(self.prefix_to_fspath(prefix))
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| self.fspath_to_key(entry.path()).ok())
            .collect())
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let prefix_path = self.prefix_to_fspath(prefix);
        let mut keys: StoreKeys = vec![];
        let mut prefixes: StorePrefixes = vec![];
        if let Ok(dir) = std::fs::read_dir(prefix_path) {
            for entry in dir {
                let entry = entry?;
                let fs_path = entry.path();
                let name = fs_path.file_name().unwrap().to_string_lossy().into_owned();
                if fs_path.is_dir() {
                    prefixes.push(StorePrefix::new(
                        prefix.as_str().to_string() + &name + "/",
                    )?);
                } else {
                    keys.push(StoreKey::new(prefix.as_str().to_string() + &name)?);
                }
            }
        }
        keys.sort();
        prefixes.sort();
        Ok(StoreKeysPrefixes::new(keys, prefixes))
    }

    fn read_only(&self) -> bool {
        self.readonly
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn filesystem_store() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;
        crate::storage::store::test_util::store_write(&store)?;
        crate::storage::store::test_util::store_read(&store)?;
        crate::storage::store::test_util::store_list(&store)?;
        Ok(())
    }

    #[test]
    fn filesystem_set_creates_directories() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;
        store.set(&"a/b/c/d".try_into()?, &[1, 2, 3])?;
        assert!(path.path().join("a/b/c/d").is_file());
        Ok(())
    }

    #[test]
    fn filesystem_erase_directory_leaf_rule() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;
        store.set(&"array/zarr.json".try_into()?, b"{}")?;
        store.set(&"array/c.0.0".try_into()?, &[1])?;
        store.set(&"group/array/zarr.json".try_into()?, b"{}")?;

        // a directory with only files can be erased
        assert!(store.erase(&"array".try_into()?)?);
        assert!(!path.path().join("array").exists());

        // a directory with a descendant directory cannot
        assert!(store.erase(&"group".try_into()?).is_err());
        assert!(path.path().join("group").exists());
        Ok(())
    }

    #[test]
    fn filesystem_erase_missing() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;
        assert!(!store.erase(&"missing".try_into()?)?);
        Ok(())
    }
}
