//! Zarr hierarchy nodes.
//!
//! A node in a Zarr hierarchy is either a [`Group`] or an [`Array`], addressed by a
//! [`NodePath`] and named by a [`NodeName`].

mod node_name;
mod node_path;

pub use node_name::{NodeName, NodeNameError};
pub use node_path::{NodePath, NodePathError};

use serde::{Deserialize, Serialize};

use crate::{
    array::Array,
    group::Group,
    metadata::{ArrayMetadataV3, GroupMetadataV3},
};

/// The metadata document of a node: either array or group metadata.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(untagged)]
pub enum NodeMetadata {
    /// Array metadata.
    Array(ArrayMetadataV3),
    /// Group metadata.
    Group(GroupMetadataV3),
}

/// A node in a Zarr hierarchy.
#[derive(Debug)]
pub enum Node {
    /// A group node.
    Group(Group),
    /// An array node.
    Array(Array),
}

impl Node {
    /// Return the path of the node.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        match self {
            Self::Group(group) => group.path(),
            Self::Array(array) => array.path(),
        }
    }

    /// Return the name of the node (the final path segment; empty for the root).
    #[must_use]
    pub fn name(&self) -> &str {
        self.path().name()
    }

    /// Returns [`true`] if the node is a group.
    #[must_use]
    pub const fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    /// Returns [`true`] if the node is an array.
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Return the node as a group, if it is one.
    #[must_use]
    pub const fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Group(group) => Some(group),
            Self::Array(_) => None,
        }
    }

    /// Return the node as a mutable group, if it is one.
    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Self::Group(group) => Some(group),
            Self::Array(_) => None,
        }
    }

    /// Return the node as an array, if it is one.
    #[must_use]
    pub const fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Group(_) => None,
            Self::Array(array) => Some(array),
        }
    }

    /// Return the node as a mutable array, if it is one.
    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            Self::Group(_) => None,
            Self::Array(array) => Some(array),
        }
    }

    /// Create the metadata document of the node from its current state.
    #[must_use]
    pub fn metadata(&self) -> NodeMetadata {
        match self {
            Self::Group(group) => NodeMetadata::Group(group.metadata()),
            Self::Array(array) => NodeMetadata::Array(array.metadata()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_metadata_group() {
        let json = r#"{"zarr_format":3,"node_type":"group"}"#;
        let metadata: NodeMetadata = serde_json::from_str(json).unwrap();
        assert!(matches!(metadata, NodeMetadata::Group(_)));
    }

    #[test]
    fn node_metadata_array() {
        let json = r#"{
            "zarr_format": 3,
            "node_type": "array",
            "shape": [4],
            "data_type": "uint8",
            "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": [2]}},
            "chunk_key_encoding": {"name": "default", "configuration": {"separator": "/"}},
            "fill_value": 0,
            "codecs": ["bytes"]
        }"#;
        let metadata: NodeMetadata = serde_json::from_str(json).unwrap();
        assert!(matches!(metadata, NodeMetadata::Array(_)));
    }

    #[test]
    fn node_metadata_invalid() {
        assert!(serde_json::from_str::<NodeMetadata>(r#"{"zarr_format":3}"#).is_err());
    }
}
