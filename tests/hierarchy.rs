use std::sync::Arc;

use zarrkit::array::{ArrayMetadataBuilder, DataType};
use zarrkit::hierarchy::{Hierarchy, HierarchyError};
use zarrkit::storage::store::MemoryStore;

fn int32_builder(shape: Vec<u64>) -> ArrayMetadataBuilder {
    let mut builder = ArrayMetadataBuilder::new();
    builder.set_data_type(DataType::Int32);
    builder.set_shape(shape);
    builder
}

fn build_tree(hierarchy: &mut Hierarchy) {
    hierarchy.create_group("/grp1").unwrap();
    hierarchy.create_group("/grp2").unwrap();
    hierarchy.create_group("/grp3").unwrap();
    hierarchy.create_group("/grp1/subgrp11").unwrap();
    hierarchy.create_group("/grp1/subgrp11/subsubgrp111").unwrap();
    hierarchy.create_group("/grp2/subgrp21").unwrap();
    hierarchy.create_group("/grp2/subgrp21/µs").unwrap();
    hierarchy.create_group("/grp2/subgrp21/µs/Đà_Lạt").unwrap();
    hierarchy.create_group("/grp2/subgrp21/µs/東京").unwrap();

    let builder = int32_builder(vec![10, 10]);
    hierarchy
        .create_array_with_builder("/grp2/subgrp21/arr211", &builder)
        .unwrap();
    hierarchy
        .create_array_with_builder("/grp2/subgrp21/arr212", &builder)
        .unwrap();
}

#[test]
fn hierarchy_navigation_and_deletion() {
    let store = Arc::new(MemoryStore::new());
    let mut hierarchy = Hierarchy::create_with_group(store).unwrap();
    build_tree(&mut hierarchy);

    // relative resolution with `..`
    let dalat = "/grp2/subgrp21/µs/Đà_Lạt";
    assert_eq!(hierarchy.resolve(dalat, "..").unwrap().name(), "µs");
    assert_eq!(hierarchy.resolve(dalat, "../..").unwrap().name(), "subgrp21");
    assert_eq!(hierarchy.resolve(dalat, "../../../..").unwrap().path().as_str(), "/");
    assert!(hierarchy.resolve(dalat, "../../../../..").is_none());
    assert_eq!(hierarchy.resolve(dalat, "../東京").unwrap().name(), "東京");
    assert!(hierarchy.resolve(dalat, "../../arr212").unwrap().is_array());

    // resolution does not traverse into arrays
    assert!(hierarchy.resolve("/", "grp2/subgrp21/arr212/x").is_none());

    // deletion of one array
    hierarchy.delete("/grp2/subgrp21/arr211", false).unwrap();
    let subgrp21 = hierarchy.get_group("/grp2/subgrp21").unwrap();
    assert_eq!(subgrp21.arrays(), vec!["/grp2/subgrp21/arr212".to_string()]);

    // recursive deletion of the root leaves an empty root group
    hierarchy.delete("/", true).unwrap();
    assert_eq!(hierarchy.groups(), vec!["/".to_string()]);
    assert!(hierarchy.arrays().is_empty());
}

#[test]
fn hierarchy_reopen_materializes_tree() {
    let store = Arc::new(MemoryStore::new());
    let mut hierarchy = Hierarchy::create_with_group(store.clone()).unwrap();
    build_tree(&mut hierarchy);
    drop(hierarchy);

    let hierarchy = Hierarchy::open(store).unwrap();
    assert_eq!(
        hierarchy.groups(),
        vec![
            "/",
            "/grp1",
            "/grp1/subgrp11",
            "/grp1/subgrp11/subsubgrp111",
            "/grp2",
            "/grp2/subgrp21",
            "/grp2/subgrp21/µs",
            "/grp2/subgrp21/µs/Đà_Lạt",
            "/grp2/subgrp21/µs/東京",
            "/grp3",
        ]
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>()
    );
    assert_eq!(
        hierarchy.arrays(),
        vec![
            "/grp2/subgrp21/arr211".to_string(),
            "/grp2/subgrp21/arr212".to_string()
        ]
    );
}

#[test]
fn hierarchy_duplicate_and_invalid_names() {
    let store = Arc::new(MemoryStore::new());
    let mut hierarchy = Hierarchy::create_with_group(store).unwrap();
    hierarchy.create_group("/grp1").unwrap();

    assert!(matches!(
        hierarchy.create_group("/grp1"),
        Err(HierarchyError::DuplicateName(_))
    ));
    assert!(matches!(
        hierarchy.create_group("/__reserved"),
        Err(HierarchyError::InvalidName(_))
    ));
    assert!(matches!(
        hierarchy.create_group("/.."),
        Err(HierarchyError::NotFound(_) | HierarchyError::InvalidName(_))
    ));
    assert!(matches!(
        hierarchy.create_group("/missing/child"),
        Err(HierarchyError::NotFound(_))
    ));
}

#[test]
fn hierarchy_delete_non_empty_group() {
    let store = Arc::new(MemoryStore::new());
    let mut hierarchy = Hierarchy::create_with_group(store).unwrap();
    hierarchy.create_group("/grp1").unwrap();
    hierarchy.create_group("/grp1/subgrp11").unwrap();

    assert!(matches!(
        hierarchy.delete("/grp1", false),
        Err(HierarchyError::NotEmpty(_))
    ));
    hierarchy.delete("/grp1", true).unwrap();
    assert!(hierarchy.get("/grp1").is_none());
    assert_eq!(hierarchy.groups(), vec!["/".to_string()]);
}

#[test]
fn hierarchy_root_array_deletion_leaves_group() {
    let store = Arc::new(MemoryStore::new());
    let metadata = int32_builder(vec![4, 4]).metadata().unwrap();
    let mut hierarchy = Hierarchy::create_with_array(store.clone(), metadata).unwrap();
    assert!(hierarchy.root().is_array());
    assert_eq!(hierarchy.arrays(), vec!["/".to_string()]);

    hierarchy.delete("/", false).unwrap();
    assert!(hierarchy.root().is_group());
    assert_eq!(hierarchy.groups(), vec!["/".to_string()]);

    // the store agrees after reopening
    let hierarchy = Hierarchy::open(store).unwrap();
    assert!(hierarchy.root().is_group());
}

#[test]
fn hierarchy_attributes_saved() {
    let store = Arc::new(MemoryStore::new());
    let mut hierarchy = Hierarchy::create_with_group(store.clone()).unwrap();
    hierarchy.create_group("/grp1").unwrap();

    let group = hierarchy
        .get_mut("/grp1")
        .and_then(|node| node.as_group_mut())
        .unwrap();
    group.set_attribute("spam", serde_json::json!("ham"));
    group.set_attribute("eggs", serde_json::json!(42));
    assert!(group.attributes_dirty());
    hierarchy.save().unwrap();

    let hierarchy = Hierarchy::open(store).unwrap();
    let group = hierarchy.get_group("/grp1").unwrap();
    assert_eq!(group.attributes().get("spam"), Some(&serde_json::json!("ham")));
    assert_eq!(group.attributes().get("eggs"), Some(&serde_json::json!(42)));
    assert!(!group.attributes_dirty());
}
