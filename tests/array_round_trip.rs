use std::sync::Arc;

use zarrkit::array::{ArrayMetadataBuilder, DataType};
use zarrkit::array_subset::ArraySubset;
use zarrkit::hierarchy::Hierarchy;
use zarrkit::storage::store::{FilesystemStore, MemoryStore};
use zarrkit::storage::{Store, StoreKey};

/// A rank-3 int32 array of shape (5, 20, 4) populated with 1..=400 such that the value at
/// (i, j, k) is `(i+1) + j*5 + k*100`.
fn populate_3d(hierarchy: &mut Hierarchy) {
    let mut builder = ArrayMetadataBuilder::new();
    builder.set_data_type(DataType::Int32);
    builder.set_shape(vec![5, 20, 4]);
    hierarchy
        .create_array_with_builder("/my_array", &builder)
        .unwrap();

    let array = hierarchy.get_array("/my_array").unwrap();
    let mut data = vec![0_i32; 5 * 20 * 4];
    for i in 0..5 {
        for j in 0..20 {
            for k in 0..4 {
                data[i * 20 * 4 + j * 4 + k] = (i as i32 + 1) + j as i32 * 5 + k as i32 * 100;
            }
        }
    }
    array
        .store_array_subset_elements(&ArraySubset::new_with_shape(vec![5, 20, 4]), &data)
        .unwrap();
}

#[test]
fn full_round_trip_3d() {
    let store = Arc::new(MemoryStore::new());
    let mut hierarchy = Hierarchy::create_with_group(store).unwrap();
    populate_3d(&mut hierarchy);

    let array = hierarchy.get_array("/my_array").unwrap();
    let slab: Vec<i32> = array
        .retrieve_array_subset_elements(&ArraySubset::new_with_ranges(&[0..2, 10..16, 2..3]))
        .unwrap();
    assert_eq!(
        slab,
        vec![251, 256, 261, 266, 271, 276, 252, 257, 262, 267, 272, 277]
    );
}

#[test]
fn full_round_trip_3d_reopened() {
    let store = Arc::new(MemoryStore::new());
    let mut hierarchy = Hierarchy::create_with_group(store.clone()).unwrap();
    populate_3d(&mut hierarchy);
    drop(hierarchy);

    let hierarchy = Hierarchy::open(store).unwrap();
    let array = hierarchy.get_array("/my_array").unwrap();
    let slab: Vec<i32> = array
        .retrieve_array_subset_elements(&ArraySubset::new_with_ranges(&[0..2, 10..16, 2..3]))
        .unwrap();
    assert_eq!(
        slab,
        vec![251, 256, 261, 266, 271, 276, 252, 257, 262, 267, 272, 277]
    );
}

#[test]
fn partial_write_with_recycling() {
    let store = Arc::new(MemoryStore::new());
    let mut hierarchy = Hierarchy::create_with_group(store).unwrap();
    populate_3d(&mut hierarchy);
    let array = hierarchy.get_array("/my_array").unwrap();

    // overwrite a 2x3 slab at (rows 1..3, columns 4..7, plane 0) with -99
    array
        .store_array_subset_elements(
            &ArraySubset::new_with_ranges(&[1..3, 4..7, 0..1]),
            &[-99_i32; 6],
        )
        .unwrap();
    // erase the first column of plane 0 by writing absent
    array
        .store_array_subset_opt_elements::<i32>(
            &ArraySubset::new_with_ranges(&[0..5, 0..1, 0..1]),
            &[None; 5],
        )
        .unwrap();

    let slab: Vec<Option<i32>> = array
        .retrieve_array_subset_opt_elements(&ArraySubset::new_with_ranges(&[0..5, 0..10, 0..1]))
        .unwrap();
    for i in 0..5_usize {
        for j in 0..10_usize {
            let value = slab[i * 10 + j];
            if j == 0 {
                assert_eq!(value, None, "column 0 must be absent");
            } else if (1..3).contains(&i) && (4..7).contains(&j) {
                assert_eq!(value, Some(-99));
            } else {
                assert_eq!(value, Some((i as i32 + 1) + j as i32 * 5));
            }
        }
    }
}

#[test]
fn sparse_chunk_not_written() {
    let store = Arc::new(MemoryStore::new());

    let mut builder = ArrayMetadataBuilder::new();
    builder.set_data_type(DataType::Float64);
    builder.set_shape(vec![5, 3]);
    builder.set_chunk_shape(vec![5, 3]).unwrap();
    let metadata = builder.metadata().unwrap();

    let mut hierarchy = Hierarchy::create_with_array(store.clone(), metadata).unwrap();
    hierarchy.save().unwrap();

    // the store holds exactly the metadata document and no chunk key
    assert_eq!(store.list().unwrap(), vec![StoreKey::new("zarr.json").unwrap()]);

    let array = hierarchy.root().as_array().unwrap();
    let values: Vec<Option<f64>> = array
        .retrieve_array_subset_opt_elements(&ArraySubset::new_with_shape(vec![5, 3]))
        .unwrap();
    assert_eq!(values.len(), 15);
    assert!(values.iter().all(Option::is_none));

    // writing the fill value everywhere must not materialize a chunk
    array
        .store_array_subset_opt_elements::<f64>(
            &ArraySubset::new_with_shape(vec![5, 3]),
            &[None; 15],
        )
        .unwrap();
    assert_eq!(store.list().unwrap(), vec![StoreKey::new("zarr.json").unwrap()]);
}

#[test]
fn sparse_chunk_erased_after_rewrite() {
    let store = Arc::new(MemoryStore::new());
    let mut builder = ArrayMetadataBuilder::new();
    builder.set_data_type(DataType::Int32);
    builder.set_shape(vec![4, 4]);
    builder.set_chunk_shape(vec![2, 2]).unwrap();
    let mut hierarchy = Hierarchy::create_with_group(store.clone()).unwrap();
    hierarchy.create_array_with_builder("/a", &builder).unwrap();
    let array = hierarchy.get_array("/a").unwrap();

    // populate one chunk
    array
        .store_array_subset_elements(&ArraySubset::new_with_ranges(&[0..2, 0..2]), &[1_i32; 4])
        .unwrap();
    assert_eq!(store.list().unwrap().len(), 2);

    // writing absent everywhere in that chunk erases its key
    array
        .store_array_subset_opt_elements::<i32>(
            &ArraySubset::new_with_ranges(&[0..2, 0..2]),
            &[None; 4],
        )
        .unwrap();
    assert_eq!(store.list().unwrap(), vec![StoreKey::new("a/zarr.json").unwrap()]);
}

#[test]
fn filesystem_round_trip() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = Arc::new(FilesystemStore::new(tmp.path()).unwrap());
    let mut hierarchy = Hierarchy::create_with_group(store.clone()).unwrap();
    populate_3d(&mut hierarchy);
    drop(hierarchy);

    let hierarchy = Hierarchy::open(store).unwrap();
    let array = hierarchy.get_array("/my_array").unwrap();
    let slab: Vec<i32> = array
        .retrieve_array_subset_elements(&ArraySubset::new_with_ranges(&[0..2, 10..16, 2..3]))
        .unwrap();
    assert_eq!(
        slab,
        vec![251, 256, 261, 266, 271, 276, 252, 257, 262, 267, 272, 277]
    );
}
