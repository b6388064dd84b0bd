use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Zarr group metadata (storage specification v3).
///
/// See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#group-metadata>.
///
/// An example `JSON` document for an explicit Zarr V3 group:
/// ```json
/// {
///     "zarr_format": 3,
///     "node_type": "group",
///     "attributes": {
///         "spam": "ham",
///         "eggs": 42
///     }
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct GroupMetadataV3 {
    /// An integer defining the version of the storage specification to which the group adheres. Must be `3`.
    pub zarr_format: monostate::MustBe!(3u64),
    /// A string defining the type of hierarchy node element, must be `group` here.
    pub node_type: monostate::MustBe!("group"),
    /// Optional user metadata.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Default for GroupMetadataV3 {
    fn default() -> Self {
        Self::new(serde_json::Map::new())
    }
}

impl GroupMetadataV3 {
    /// Create group metadata.
    #[must_use]
    pub fn new(attributes: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            zarr_format: monostate::MustBe!(3u64),
            node_type: monostate::MustBe!("group"),
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_metadata() {
        let metadata: GroupMetadataV3 = serde_json::from_str(
            r#"{"zarr_format":3,"node_type":"group","attributes":{"spam":"ham"}}"#,
        )
        .unwrap();
        assert_eq!(
            metadata.attributes.get("spam").unwrap().as_str(),
            Some("ham")
        );
        assert_eq!(
            serde_json::to_string(&GroupMetadataV3::default()).unwrap(),
            r#"{"zarr_format":3,"node_type":"group"}"#
        );
    }

    #[test]
    fn group_metadata_invalid_format() {
        assert!(serde_json::from_str::<GroupMetadataV3>(
            r#"{"zarr_format":2,"node_type":"group"}"#
        )
        .is_err());
    }
}
