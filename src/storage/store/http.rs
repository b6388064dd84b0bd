//! A read-only HTTP store.
//!
//! Keys are resolved against a base URL with a single fetch per key. A 404 response maps to an
//! absent key. Zarr V2 consolidated metadata (`.zmetadata`) at the store root is used for node
//! discovery, since plain HTTP has no directory listing.

use std::str::FromStr;
use std::sync::OnceLock;

use reqwest::{blocking::Client, StatusCode, Url};
use thiserror::Error;

use crate::{
    metadata::{ConsolidatedMetadataV2, GroupMetadataV2},
    node::{NodeMetadata, NodePath},
    storage::{
        get_metadata_v3_then_v2, MaybeBytes, StorageError, Store, StoreKey, StoreKeys,
        StoreKeysPrefixes, StorePrefix, StorePrefixes,
    },
};

/// A read-only HTTP store.
#[derive(Debug)]
pub struct HttpStore {
    base_url: Url,
    client: Client,
    consolidated: OnceLock<Option<ConsolidatedMetadataV2>>,
}

/// An HTTP store creation error.
#[derive(Debug, Error)]
pub enum HttpStoreCreateError {
    /// The URL is not valid.
    #[error("base URL {0} is not valid")]
    InvalidBaseUrl(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<url::ParseError> for StorageError {
    fn from(err: url::ParseError) -> Self {
        Self::Other(err.to_string())
    }
}

impl HttpStore {
    /// Create a new HTTP store at a given `base_url`.
    ///
    /// # Errors
    /// Returns an [`HttpStoreCreateError`] if `base_url` is not a valid URL.
    pub fn new(base_url: &str) -> Result<Self, HttpStoreCreateError> {
        let base_url = Url::from_str(base_url)
            .map_err(|_| HttpStoreCreateError::InvalidBaseUrl(base_url.into()))?;
        Ok(Self {
            base_url,
            client: Client::new(),
            consolidated: OnceLock::new(),
        })
    }

    /// Maps a [`StoreKey`] to an HTTP [`Url`].
    ///
    /// # Errors
    /// Returns an error if the resolved URL is invalid.
    pub fn key_to_url(&self, key: &StoreKey) -> Result<Url, url::ParseError> {
        let mut url = self.base_url.as_str().to_string();
        if !key.as_str().is_empty() {
            if !url.ends_with('/') {
                url.push('/');
            }
            url += key.as_str();
        }
        Url::parse(&url)
    }

    /// Return the consolidated metadata at the store root, fetching `.zmetadata` on first use.
    pub fn consolidated_metadata(&self) -> Option<&ConsolidatedMetadataV2> {
        self.consolidated
            .get_or_init(|| match self.fetch_consolidated() {
                Ok(consolidated) => consolidated,
                Err(err) => {
                    log::warn!("failed to retrieve consolidated metadata: {err}");
                    None
                }
            })
            .as_ref()
    }

    fn fetch_consolidated(&self) -> Result<Option<ConsolidatedMetadataV2>, StorageError> {
        let key = unsafe { StoreKey::new_unchecked(".zmetadata".to_string()) };
        let Some(bytes) = self.get(&key)? else {
            return Ok(None);
        };
        let consolidated: ConsolidatedMetadataV2 = serde_json::from_slice(&bytes)
            .map_err(|err| StorageError::InvalidMetadata(key, err.to_string()))?;
        Ok(Some(consolidated))
    }

    /// Return the node prefixes recorded in the consolidated metadata.
    fn consolidated_node_prefixes(&self) -> Vec<StorePrefix> {
        let Some(consolidated) = self.consolidated_metadata() else {
            return vec![];
        };
        let mut prefixes: Vec<StorePrefix> = consolidated
            .metadata
            .keys()
            .filter_map(|key| {
                let (node, _metadata_name) = key.rsplit_once('/')?;
                StorePrefix::new(format!("{node}/")).ok()
            })
            .collect();
        prefixes.sort();
        prefixes.dedup();
        prefixes
    }

    /// A consolidated store root with only nested metadata is an implicit group.
    fn implicit_root_group(&self, path: &NodePath) -> Result<Option<NodeMetadata>, StorageError> {
        if path.is_root() && self.consolidated_metadata().is_some() {
            let group = GroupMetadataV2::default();
            return Ok(Some(NodeMetadata::Group(
                crate::metadata::group_metadata_v2_to_v3(&group),
            )));
        }
        Ok(None)
    }

    fn get_metadata_consolidated(
        &self,
        path: &NodePath,
    ) -> Result<Option<NodeMetadata>, StorageError> {
        let Some(consolidated) = self.consolidated_metadata() else {
            return Ok(None);
        };
        let node_prefix = if path.is_root() {
            String::new()
        } else {
            format!("{}/", path.as_str().strip_prefix('/').unwrap_or(path.as_str()))
        };
        let document = |metadata_name: &str| -> Result<MaybeBytes, StorageError> {
            consolidated
                .metadata
                .get(&format!("{node_prefix}{metadata_name}"))
                .map(|value| {
                    serde_json::to_vec(value).map_err(|err| StorageError::Other(err.to_string()))
                })
                .transpose()
        };
        get_metadata_v3_then_v2(
            &|key: &StoreKey| {
                let name = key
                    .as_str()
                    .rsplit('/')
                    .next()
                    .expect("split always yields at least one element");
                document(name)
            },
            path,
        )
    }
}

impl Store for HttpStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let url = self.key_to_url(key)?;
        let response = self.client.get(url).send()?;
        match response.status() {
            StatusCode::OK => Ok(Some(response.bytes()?.to_vec())),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(StorageError::Other(format!(
                "http unexpected status code: {status}"
            ))),
        }
    }

    fn set(&self, _key: &StoreKey, _value: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::ReadOnly)
    }

    fn erase(&self, _key: &StoreKey) -> Result<bool, StorageError> {
        Err(StorageError::ReadOnly)
    }

    fn erase_prefix(&self, _prefix: &StorePrefix) -> Result<bool, StorageError> {
        Err(StorageError::ReadOnly)
    }

    fn list(&self) -> Result<StoreKeys, StorageError> {
        Err(StorageError::Unsupported(
            "the http store does not support listing keys".to_string(),
        ))
    }

    fn list_prefix(&self, _prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        Err(StorageError::Unsupported(
            "the http store does not support listing keys".to_string(),
        ))
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        // node discovery is driven by the unique prefixes of the consolidated metadata keys
        let node_prefixes = self.consolidated_node_prefixes();
        if node_prefixes.is_empty() {
            return Ok(StoreKeysPrefixes::default());
        }
        let mut prefixes: StorePrefixes = node_prefixes
            .into_iter()
            .filter(|node_prefix| {
                node_prefix.as_str().starts_with(prefix.as_str())
                    && node_prefix
                        .as_str()
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.matches('/').count() == 1)
            })
            .collect();
        prefixes.sort();
        Ok(StoreKeysPrefixes::new(vec![], prefixes))
    }

    fn get_metadata(&self, path: &NodePath) -> Result<Option<NodeMetadata>, StorageError> {
        // once consolidated metadata is known it is authoritative, avoiding per-node fetches
        if self.consolidated.get().is_some_and(Option::is_some) {
            if let Some(metadata) = self.get_metadata_consolidated(path)? {
                return Ok(Some(metadata));
            }
            return self.implicit_root_group(path);
        }
        if let Some(metadata) = get_metadata_v3_then_v2(&|key| self.get(key), path)? {
            return Ok(Some(metadata));
        }
        if let Some(metadata) = self.get_metadata_consolidated(path)? {
            return Ok(Some(metadata));
        }
        self.implicit_root_group(path)
    }

    fn set_metadata(&self, _path: &NodePath, _metadata: &NodeMetadata) -> Result<(), StorageError> {
        Err(StorageError::ReadOnly)
    }

    fn read_only(&self) -> bool {
        true
    }

    fn supports_listing(&self) -> bool {
        self.consolidated_metadata().is_some()
    }

    fn supports_consolidated_metadata(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_key_to_url() {
        let store = HttpStore::new("http://example.com/data.zarr").unwrap();
        let url = store
            .key_to_url(&StoreKey::new("latitude/.zarray").unwrap())
            .unwrap();
        assert_eq!(url.as_str(), "http://example.com/data.zarr/latitude/.zarray");
    }

    #[test]
    fn http_store_invalid_url() {
        assert!(HttpStore::new("not a url").is_err());
    }

    #[test]
    fn http_store_consolidated_discovery() {
        let consolidated: ConsolidatedMetadataV2 = serde_json::from_str(
            r#"{
                "zarr_consolidated_format": 1,
                "metadata": {
                    ".zgroup": { "zarr_format": 2 },
                    "age_band_lower_bound/.zarray": {
                        "chunks": [26], "compressor": null, "dtype": "<f8",
                        "fill_value": null, "filters": null, "order": "C",
                        "shape": [26], "zarr_format": 2
                    },
                    "demographic_totals/.zarray": {
                        "chunks": [26, 180, 360], "compressor": null, "dtype": "<f8",
                        "fill_value": null, "filters": null, "order": "C",
                        "shape": [26, 720, 1440], "zarr_format": 2
                    },
                    "latitude/.zarray": {
                        "chunks": [720], "compressor": null, "dtype": "<f8",
                        "fill_value": null, "filters": null, "order": "C",
                        "shape": [720], "zarr_format": 2
                    },
                    "latitude/.zattrs": { "units": "degrees_north" },
                    "longitude/.zarray": {
                        "chunks": [1440], "compressor": null, "dtype": "<f8",
                        "fill_value": null, "filters": null, "order": "C",
                        "shape": [1440], "zarr_format": 2
                    },
                    "year/.zarray": {
                        "chunks": [1], "compressor": null, "dtype": "<i8",
                        "fill_value": null, "filters": null, "order": "C",
                        "shape": [1], "zarr_format": 2
                    }
                }
            }"#,
        )
        .unwrap();

        let store = HttpStore::new("http://example.com/data.zarr").unwrap();
        store.consolidated.set(Some(consolidated)).unwrap();
        assert!(store.supports_listing());

        let list_dir = store.list_dir(&StorePrefix::root()).unwrap();
        let children: Vec<_> = list_dir
            .prefixes()
            .iter()
            .map(|prefix| prefix.as_str().to_string())
            .collect();
        assert_eq!(
            children,
            vec![
                "age_band_lower_bound/",
                "demographic_totals/",
                "latitude/",
                "longitude/",
                "year/"
            ]
        );

        let latitude = store
            .get_metadata(&NodePath::new("/latitude").unwrap())
            .unwrap()
            .unwrap();
        let NodeMetadata::Array(latitude) = latitude else {
            panic!("latitude must be an array");
        };
        assert_eq!(latitude.shape, vec![720]);
        assert_eq!(latitude.data_type.name(), "float64");
        assert_eq!(
            latitude.attributes.get("units"),
            Some(&serde_json::json!("degrees_north"))
        );

        let root = store
            .get_metadata(&NodePath::root())
            .unwrap()
            .unwrap();
        assert!(matches!(root, NodeMetadata::Group(_)));
    }

    #[test]
    fn http_store_is_read_only() {
        let store = HttpStore::new("http://example.com/data.zarr").unwrap();
        assert!(store.read_only());
        assert!(!store.supports_writes());
        assert!(!store.supports_deletes());
        assert!(matches!(
            store.set(&StoreKey::new("a").unwrap(), &[0]),
            Err(StorageError::ReadOnly)
        ));
    }
}
