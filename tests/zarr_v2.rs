use std::sync::Arc;

use zarrkit::array::DataType;
use zarrkit::array_subset::ArraySubset;
use zarrkit::hierarchy::Hierarchy;
use zarrkit::storage::store::MemoryStore;
use zarrkit::storage::{Store, StoreKey};

/// Populate `store` with a Zarr V2 group of five arrays, one of them (`latitude`) carrying data:
/// 720 float64 values descending from 90 by 0.25.
fn populate_v2_store(store: &MemoryStore) {
    store
        .set(
            &StoreKey::new(".zgroup").unwrap(),
            br#"{"zarr_format": 2}"#,
        )
        .unwrap();

    let names = [
        "age_band_lower_bound",
        "demographic_totals",
        "latitude",
        "longitude",
        "year",
    ];
    let zarray = br#"{
        "chunks": [720],
        "compressor": null,
        "dtype": "<f8",
        "fill_value": null,
        "filters": null,
        "order": "C",
        "shape": [720],
        "zarr_format": 2
    }"#;
    for name in names {
        store
            .set(&StoreKey::new(format!("{name}/.zarray")).unwrap(), zarray)
            .unwrap();
    }
    store
        .set(
            &StoreKey::new("latitude/.zattrs").unwrap(),
            br#"{"units": "degrees_north"}"#,
        )
        .unwrap();

    // v2 chunk keys are `.`-joined with no prefix; a 1D array has the chunk key `0`
    let latitude: Vec<u8> = (0..720)
        .flat_map(|i| (90.0_f64 - 0.25 * f64::from(i)).to_le_bytes())
        .collect();
    store
        .set(&StoreKey::new("latitude/0").unwrap(), &latitude)
        .unwrap();
}

#[test]
fn v2_hierarchy_read() {
    let store = Arc::new(MemoryStore::new());
    populate_v2_store(&store);

    let hierarchy = Hierarchy::open(store).unwrap();
    assert_eq!(
        hierarchy.arrays(),
        vec![
            "/age_band_lower_bound".to_string(),
            "/demographic_totals".to_string(),
            "/latitude".to_string(),
            "/longitude".to_string(),
            "/year".to_string(),
        ]
    );

    let latitude = hierarchy.get_array("/latitude").unwrap();
    assert_eq!(latitude.shape(), &[720]);
    assert_eq!(latitude.data_type(), DataType::Float64);
    assert_eq!(
        latitude.attributes().get("units"),
        Some(&serde_json::json!("degrees_north"))
    );

    let values: Vec<f64> = latitude
        .retrieve_array_subset_elements(&ArraySubset::new_with_shape(vec![720]))
        .unwrap();
    assert_eq!(values.len(), 720);
    assert_eq!(values[0], 90.0);
    assert_eq!(values[719], -89.75);
    for pair in values.windows(2) {
        assert_eq!(pair[1] - pair[0], -0.25);
    }
}

#[test]
fn v2_big_endian_read() {
    let store = Arc::new(MemoryStore::new());
    store
        .set(
            &StoreKey::new(".zarray").unwrap(),
            br#"{
                "chunks": [4],
                "compressor": null,
                "dtype": ">i4",
                "fill_value": -1,
                "filters": null,
                "order": "C",
                "shape": [4],
                "zarr_format": 2
            }"#,
        )
        .unwrap();
    let chunk: Vec<u8> = [1_i32, 2, 3, 4]
        .iter()
        .flat_map(|v| v.to_be_bytes())
        .collect();
    store.set(&StoreKey::new("0").unwrap(), &chunk).unwrap();

    let hierarchy = Hierarchy::open(store).unwrap();
    let array = hierarchy.root().as_array().unwrap();
    let values: Vec<i32> = array
        .retrieve_array_subset_elements(&ArraySubset::new_with_shape(vec![4]))
        .unwrap();
    assert_eq!(values, vec![1, 2, 3, 4]);
}

#[test]
fn v2_missing_chunks_are_fill_value() {
    let store = Arc::new(MemoryStore::new());
    store
        .set(
            &StoreKey::new(".zarray").unwrap(),
            br#"{
                "chunks": [2],
                "compressor": null,
                "dtype": "<u2",
                "fill_value": 7,
                "filters": null,
                "order": "C",
                "shape": [4],
                "zarr_format": 2
            }"#,
        )
        .unwrap();
    let chunk: Vec<u8> = [1_u16, 2].iter().flat_map(|v| v.to_le_bytes()).collect();
    store.set(&StoreKey::new("0").unwrap(), &chunk).unwrap();

    let hierarchy = Hierarchy::open(store).unwrap();
    let array = hierarchy.root().as_array().unwrap();
    let values: Vec<u16> = array
        .retrieve_array_subset_elements(&ArraySubset::new_with_shape(vec![4]))
        .unwrap();
    assert_eq!(values, vec![1, 2, 7, 7]);
}
