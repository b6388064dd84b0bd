//! Zarr groups.
//!
//! A group is a node in a Zarr hierarchy that can hold child nodes (groups or
//! [`arrays`](crate::array)) and user attributes.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#group>.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::{
    metadata::GroupMetadataV3,
    node::{Node, NodeMetadata, NodePath, NodePathError},
    storage::{StorageError, Store, StoreHandle},
};

/// A group creation error.
#[derive(Debug, Error)]
pub enum GroupCreateError {
    /// An invalid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// No group metadata exists at the path.
    #[error("group metadata is missing at {0}")]
    MissingMetadata(NodePath),
    /// The node at the path is not a group.
    #[error("the node at {0} is not a group")]
    NotAGroup(NodePath),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
}

/// A Zarr group.
#[derive(Debug)]
pub struct Group {
    store: StoreHandle,
    path: NodePath,
    attributes: serde_json::Map<String, serde_json::Value>,
    attributes_dirty: bool,
    children: BTreeMap<String, Node>,
}

impl Group {
    /// Create a group at `path` from `metadata`.
    ///
    /// This does **not** write to the store; use [`store_metadata`](Group::store_metadata) to
    /// persist the metadata.
    ///
    /// # Errors
    /// Returns a [`GroupCreateError`] if the path is invalid.
    pub fn new_with_metadata(
        store: StoreHandle,
        path: &str,
        metadata: GroupMetadataV3,
    ) -> Result<Self, GroupCreateError> {
        let path = NodePath::new(path)?;
        Ok(Self {
            store,
            path,
            attributes: metadata.attributes,
            attributes_dirty: false,
            children: BTreeMap::new(),
        })
    }

    /// Open an existing group at `path`, reading its metadata from the store.
    ///
    /// The children of the group are not discovered; see
    /// [`Hierarchy::open`](crate::hierarchy::Hierarchy::open).
    ///
    /// # Errors
    /// Returns a [`GroupCreateError`] if there is a storage error, the metadata is missing, or
    /// the node is not a group.
    pub fn open(store: StoreHandle, path: &str) -> Result<Self, GroupCreateError> {
        let node_path = NodePath::new(path)?;
        match store.get_metadata(&node_path)? {
            Some(NodeMetadata::Group(metadata)) => Self::new_with_metadata(store, path, metadata),
            Some(NodeMetadata::Array(_)) => Err(GroupCreateError::NotAGroup(node_path)),
            None => Err(GroupCreateError::MissingMetadata(node_path)),
        }
    }

    /// Return the node path of the group.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// Return the name of the group (empty for the root).
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Return the store of the group.
    #[must_use]
    pub fn store(&self) -> StoreHandle {
        self.store.clone()
    }

    /// Return the user attributes.
    #[must_use]
    pub const fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.attributes
    }

    /// Set a user attribute, marking the attributes dirty.
    ///
    /// Dirty attributes are persisted by [`save`](crate::hierarchy::Hierarchy::save).
    pub fn set_attribute(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(name.into(), value);
        self.attributes_dirty = true;
    }

    /// Remove all user attributes, marking the attributes dirty.
    pub fn delete_attributes(&mut self) {
        if !self.attributes.is_empty() {
            self.attributes.clear();
            self.attributes_dirty = true;
        }
    }

    /// Returns whether the attributes have unpersisted modifications.
    #[must_use]
    pub const fn attributes_dirty(&self) -> bool {
        self.attributes_dirty
    }

    /// Create the group metadata document from the current state.
    #[must_use]
    pub fn metadata(&self) -> GroupMetadataV3 {
        GroupMetadataV3::new(self.attributes.clone())
    }

    /// Write the group metadata document to the store.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure to store.
    pub fn store_metadata(&self) -> Result<(), StorageError> {
        self.store
            .set_metadata(&self.path, &NodeMetadata::Group(self.metadata()))
    }

    /// Persist dirty attributes.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure to store.
    pub fn save(&mut self) -> Result<(), StorageError> {
        if self.attributes_dirty {
            self.store_metadata()?;
            self.attributes_dirty = false;
        }
        Ok(())
    }

    /// Return the children of the group, keyed by name.
    #[must_use]
    pub const fn children(&self) -> &BTreeMap<String, Node> {
        &self.children
    }

    /// Return the child named `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    /// Return the mutable child named `name`.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.get_mut(name)
    }

    /// Returns whether the group has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Return the sorted paths of the child groups.
    #[must_use]
    pub fn groups(&self) -> Vec<String> {
        self.children
            .values()
            .filter(|node| node.is_group())
            .map(|node| node.path().to_string())
            .collect()
    }

    /// Return the sorted paths of the child arrays.
    #[must_use]
    pub fn arrays(&self) -> Vec<String> {
        self.children
            .values()
            .filter(|node| node.is_array())
            .map(|node| node.path().to_string())
            .collect()
    }

    pub(crate) fn insert_child(&mut self, name: String, node: Node) -> &mut Node {
        self.children.entry(name).or_insert(node)
    }

    pub(crate) fn remove_child(&mut self, name: &str) -> Option<Node> {
        self.children.remove(name)
    }
}
