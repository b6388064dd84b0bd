//! The Zarr hierarchy: the dataset root.
//!
//! A [`Hierarchy`] owns a [store](crate::storage::Store) and the tree of nodes read from it.
//! Opening a store materializes the tree: the root metadata document determines whether the
//! dataset is a single array or a group hierarchy, and group children are discovered recursively
//! through store listing (or consolidated metadata for HTTP stores). Unrecognized children are
//! skipped with a warning.
//!
//! Paths are resolved absolutely from the root, or relative to any group including `..` segments;
//! resolving above the root yields nothing, and resolution never descends into arrays.

use thiserror::Error;

use crate::{
    array::{
        chunk_key_encoding::{ChunkKeyEncoding, DefaultChunkKeyEncoding},
        Array, ArrayCreateError, ArrayError, ArrayMetadataBuilder,
    },
    group::{Group, GroupCreateError},
    metadata::{ArrayMetadataV3, GroupMetadataV3},
    node::{Node, NodeMetadata, NodeName, NodePath, NodePathError},
    storage::{erase_node, node_exists, StorageError, Store, StoreHandle, StorePrefix},
};

/// A hierarchy error.
#[derive(Debug, Error)]
pub enum HierarchyError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An array creation error.
    #[error(transparent)]
    ArrayCreateError(#[from] ArrayCreateError),
    /// A group creation error.
    #[error(transparent)]
    GroupCreateError(#[from] GroupCreateError),
    /// An array operation error.
    #[error(transparent)]
    ArrayError(#[from] ArrayError),
    /// An invalid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// No metadata document exists at the store root.
    #[error("the store has no root metadata document")]
    MissingRootMetadata,
    /// An invalid node name.
    #[error("invalid node name {0}")]
    InvalidName(String),
    /// A child with the name already exists.
    #[error("a child named {0} already exists")]
    DuplicateName(String),
    /// The path does not refer to a node.
    #[error("no node exists at {0}")]
    NotFound(String),
    /// The path does not refer to a group.
    #[error("the node at {0} is not a group")]
    NotAGroup(String),
    /// The group is not empty.
    #[error("the group at {0} is not empty")]
    NotEmpty(String),
}

/// A Zarr hierarchy: a store paired with its tree of nodes.
#[derive(Debug)]
pub struct Hierarchy {
    store: StoreHandle,
    root: Node,
}

impl Hierarchy {
    /// Create a new hierarchy on `store` with an empty root group.
    ///
    /// The root group metadata is written to the store.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if the metadata cannot be stored.
    pub fn create_with_group(store: StoreHandle) -> Result<Self, HierarchyError> {
        let group = Group::new_with_metadata(store.clone(), "/", GroupMetadataV3::default())?;
        group.store_metadata()?;
        Ok(Self {
            store,
            root: Node::Group(group),
        })
    }

    /// Create a new hierarchy on `store` with a root array: a single-array dataset with no groups.
    ///
    /// The array metadata is written to the store.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if the metadata is invalid or cannot be stored.
    pub fn create_with_array(
        store: StoreHandle,
        metadata: ArrayMetadataV3,
    ) -> Result<Self, HierarchyError> {
        let array = Array::new_with_metadata(store.clone(), "/", metadata)?;
        array.store_metadata()?;
        Ok(Self {
            store,
            root: Node::Array(array),
        })
    }

    /// Open the hierarchy on `store`, reading the root metadata document and recursively
    /// materializing the tree.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if the root metadata is missing or invalid.
    pub fn open(store: StoreHandle) -> Result<Self, HierarchyError> {
        let root_path = NodePath::root();
        let root = match store.get_metadata(&root_path)? {
            Some(NodeMetadata::Array(metadata)) => {
                Node::Array(Array::new_with_metadata(store.clone(), "/", metadata)?)
            }
            Some(NodeMetadata::Group(metadata)) => {
                let mut group = Group::new_with_metadata(store.clone(), "/", metadata)?;
                discover_children(&store, &mut group)?;
                Node::Group(group)
            }
            None => return Err(HierarchyError::MissingRootMetadata),
        };
        Ok(Self { store, root })
    }

    /// Return the store of the hierarchy.
    #[must_use]
    pub fn store(&self) -> StoreHandle {
        self.store.clone()
    }

    /// Return the root node.
    #[must_use]
    pub const fn root(&self) -> &Node {
        &self.root
    }

    /// Return the mutable root node.
    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// Return the node at an absolute `path`, or [`None`] if no such node exists.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Node> {
        self.resolve("/", path)
    }

    /// Return the mutable node at an absolute `path`.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut Node> {
        let path = normalize_path("/", path)?;
        let mut node = &mut self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = node.as_group_mut()?.child_mut(segment)?;
        }
        Some(node)
    }

    /// Return the group at an absolute `path`.
    #[must_use]
    pub fn get_group(&self, path: &str) -> Option<&Group> {
        self.get(path)?.as_group()
    }

    /// Return the array at an absolute `path`.
    #[must_use]
    pub fn get_array(&self, path: &str) -> Option<&Array> {
        self.get(path)?.as_array()
    }

    /// Resolve `path` against `base`: absolute when starting with `/`, otherwise relative to
    /// `base` with `.` and `..` segments.
    ///
    /// Returns [`None`] when a segment does not match a child, when `..` escapes above the root,
    /// or when traversal would descend into an array.
    #[must_use]
    pub fn resolve(&self, base: &str, path: &str) -> Option<&Node> {
        let path = normalize_path(base, path)?;
        let mut node = &self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = node.as_group()?.child(segment)?;
        }
        Some(node)
    }

    /// Create a group at an absolute `path` and attach it to its parent.
    ///
    /// The group metadata is committed to the store before the child entry is attached.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if the name is invalid, the parent is missing or not a group,
    /// a child with the name exists, or the store refuses the write.
    pub fn create_group(&mut self, path: &str) -> Result<&mut Group, HierarchyError> {
        let (name, parent) = self.prepare_child(path)?;
        let group = Group::new_with_metadata(
            parent.store(),
            &parent.path().child(&name).to_string(),
            GroupMetadataV3::default(),
        )?;
        group.store_metadata()?;
        let node = parent.insert_child(name, Node::Group(group));
        Ok(node.as_group_mut().expect("just inserted a group"))
    }

    /// Create an array at an absolute `path` from `metadata` and attach it to its parent.
    ///
    /// The array metadata is committed to the store before the child entry is attached.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if the name is invalid, the parent is missing or not a group,
    /// a child with the name exists, the metadata is invalid, or the store refuses the write.
    pub fn create_array(
        &mut self,
        path: &str,
        metadata: ArrayMetadataV3,
    ) -> Result<&mut Array, HierarchyError> {
        let (name, parent) = self.prepare_child(path)?;
        let array = Array::new_with_metadata(
            parent.store(),
            &parent.path().child(&name).to_string(),
            metadata,
        )?;
        array.store_metadata()?;
        let node = parent.insert_child(name, Node::Array(array));
        Ok(node.as_array_mut().expect("just inserted an array"))
    }

    /// Create an array at an absolute `path` from an [`ArrayMetadataBuilder`].
    ///
    /// The chunk key separator defaults to the store's preference when the builder has not set a
    /// chunk key encoding.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] as for [`create_array`](Hierarchy::create_array).
    pub fn create_array_with_builder(
        &mut self,
        path: &str,
        builder: &ArrayMetadataBuilder,
    ) -> Result<&mut Array, HierarchyError> {
        let mut builder = builder.clone();
        if builder.chunk_key_encoding().is_none() {
            builder.set_chunk_key_encoding(ChunkKeyEncoding::new(DefaultChunkKeyEncoding::new(
                self.store.default_chunk_key_separator(),
            )));
        }
        let metadata = builder
            .metadata()
            .map_err(|err| HierarchyError::StorageError(StorageError::Other(err.to_string())))?;
        self.create_array(path, metadata)
    }

    /// Delete the node at an absolute `path`.
    ///
    /// Deleting a non-empty group requires `recursive`. Deleting the root erases all descendants
    /// but preserves the root as an empty group; deleting a root array converts the dataset into
    /// one with an empty root group.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if the node does not exist, the group is not empty and
    /// `recursive` is false, or the store refuses the erase.
    pub fn delete(&mut self, path: &str, recursive: bool) -> Result<(), HierarchyError> {
        let normalized = normalize_path("/", path).ok_or_else(|| {
            HierarchyError::NotFound(path.to_string())
        })?;

        if normalized == "/" {
            match &self.root {
                Node::Group(group) => {
                    if !group.is_empty() && !recursive {
                        return Err(HierarchyError::NotEmpty(normalized));
                    }
                }
                Node::Array(_) => {}
            }
            return self.delete_all("/");
        }

        let node = self
            .get(&normalized)
            .ok_or_else(|| HierarchyError::NotFound(normalized.clone()))?;
        if let Node::Group(group) = node {
            if !group.is_empty() && !recursive {
                return Err(HierarchyError::NotEmpty(normalized));
            }
        }

        let node_path = NodePath::new(&normalized)?;
        erase_node(self.store.as_ref(), &node_path)?;

        let parent_path = node_path.parent().expect("a non-root path has a parent");
        let name = node_path.name().to_string();
        let parent = self
            .get_mut(parent_path.as_str())
            .and_then(Node::as_group_mut)
            .expect("the parent of a resolved child is a group");
        parent.remove_child(&name);
        Ok(())
    }

    /// Erase all descendants of the group at an absolute `path`, preserving the node itself with
    /// a minimal group metadata document.
    ///
    /// A root array is replaced by an empty root group.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if the node does not exist or the store refuses the erase.
    pub fn delete_all(&mut self, path: &str) -> Result<(), HierarchyError> {
        let normalized =
            normalize_path("/", path).ok_or_else(|| HierarchyError::NotFound(path.to_string()))?;
        let node_path = NodePath::new(&normalized)?;
        if self.get(&normalized).is_none() {
            return Err(HierarchyError::NotFound(normalized));
        }

        erase_node(self.store.as_ref(), &node_path)?;
        let group = Group::new_with_metadata(
            self.store.clone(),
            node_path.as_str(),
            GroupMetadataV3::default(),
        )?;
        group.store_metadata()?;

        if node_path.is_root() {
            self.root = Node::Group(group);
        } else {
            let node = self
                .get_mut(&normalized)
                .expect("the node was resolved above");
            *node = Node::Group(group);
        }
        Ok(())
    }

    /// Return the sorted paths of all groups in the hierarchy, including the root.
    #[must_use]
    pub fn groups(&self) -> Vec<String> {
        let mut paths = vec![];
        collect_paths(&self.root, true, &mut paths);
        paths.sort();
        paths
    }

    /// Return the sorted paths of all arrays in the hierarchy.
    #[must_use]
    pub fn arrays(&self) -> Vec<String> {
        let mut paths = vec![];
        collect_paths(&self.root, false, &mut paths);
        paths.sort();
        paths
    }

    /// Persist dirty attributes and flush all arrays.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if a metadata write or chunk flush fails.
    pub fn save(&mut self) -> Result<(), HierarchyError> {
        save_node(&mut self.root)
    }

    /// Validate the child name of `path` and return it with the parent group.
    fn prepare_child(&mut self, path: &str) -> Result<(String, &mut Group), HierarchyError> {
        let node_path = NodePath::new(path)?;
        let name = node_path.name().to_string();
        if name.is_empty() || !NodeName::validate(&name) {
            return Err(HierarchyError::InvalidName(name));
        }
        if node_exists(self.store.as_ref(), &node_path)? {
            return Err(HierarchyError::DuplicateName(name));
        }
        let parent_path = node_path.parent().expect("a non-root path has a parent");
        let parent = self
            .get_mut(parent_path.as_str())
            .ok_or_else(|| HierarchyError::NotFound(parent_path.to_string()))?;
        let parent = parent
            .as_group_mut()
            .ok_or_else(|| HierarchyError::NotAGroup(parent_path.to_string()))?;
        if parent.child(&name).is_some() {
            return Err(HierarchyError::DuplicateName(name));
        }
        Ok((name, parent))
    }
}

/// Normalize `path` against `base`, resolving `.` and `..` segments.
///
/// Returns [`None`] if `..` escapes above the root.
fn normalize_path(base: &str, path: &str) -> Option<String> {
    let mut segments: Vec<&str> = vec![];
    if !path.starts_with('/') {
        segments.extend(base.split('/').filter(|s| !s.is_empty()));
    }
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        match segment {
            "." => {}
            ".." => {
                segments.pop()?;
            }
            _ => segments.push(segment),
        }
    }
    if segments.is_empty() {
        Some("/".to_string())
    } else {
        Some(format!("/{}", segments.join("/")))
    }
}

/// Recursively discover and attach the children of `group`.
fn discover_children(store: &StoreHandle, group: &mut Group) -> Result<(), HierarchyError> {
    if !store.supports_listing() {
        return Ok(());
    }
    let prefix: StorePrefix = group
        .path()
        .try_into()
        .map_err(|err: crate::storage::StorePrefixError| {
            HierarchyError::StorageError(StorageError::from(err.to_string()))
        })?;
    for child_prefix in store.list_dir(&prefix)?.prefixes() {
        let Ok(child_path) = NodePath::try_from(child_prefix) else {
            continue;
        };
        let metadata = match store.get_metadata(&child_path) {
            Ok(Some(metadata)) => metadata,
            Ok(None) => continue,
            Err(err) => {
                log::warn!("skipping node at {child_path}: {err}");
                continue;
            }
        };
        let name = child_path.name().to_string();
        match metadata {
            NodeMetadata::Array(metadata) => {
                match Array::new_with_metadata(store.clone(), child_path.as_str(), metadata) {
                    Ok(array) => {
                        group.insert_child(name, Node::Array(array));
                    }
                    Err(err) => log::warn!("skipping array at {child_path}: {err}"),
                }
            }
            NodeMetadata::Group(metadata) => {
                let mut child =
                    Group::new_with_metadata(store.clone(), child_path.as_str(), metadata)?;
                discover_children(store, &mut child)?;
                group.insert_child(name, Node::Group(child));
            }
        }
    }
    Ok(())
}

fn collect_paths(node: &Node, groups: bool, paths: &mut Vec<String>) {
    match node {
        Node::Group(group) => {
            if groups {
                paths.push(group.path().to_string());
            }
            for child in group.children().values() {
                collect_paths(child, groups, paths);
            }
        }
        Node::Array(array) => {
            if !groups {
                paths.push(array.path().to_string());
            }
        }
    }
}

fn save_node(node: &mut Node) -> Result<(), HierarchyError> {
    match node {
        Node::Group(group) => {
            group.save()?;
            // a group's children are saved through the mutable child map
            let names: Vec<String> = group.children().keys().cloned().collect();
            for name in names {
                if let Some(child) = group.child_mut(&name) {
                    save_node(child)?;
                }
            }
            Ok(())
        }
        Node::Array(array) => {
            array.save()?;
            Ok(())
        }
    }
}
