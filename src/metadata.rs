//! Zarr metadata.
//!
//! Zarr V3 metadata documents ([`v3`]) are the native representation: a `zarr.json` per node with a
//! `node_type` of `"group"` or `"array"`.
//! Zarr V2 documents ([`v2`]) are supported read-only (`.zgroup`, `.zarray`, `.zattrs`,
//! consolidated `.zmetadata`) and are translated into V3 shape with [`v2_to_v3`].

pub mod v2;
pub mod v2_to_v3;
pub mod v3;

pub use v2::{
    ArrayMetadataV2, ArrayMetadataV2Order, ConsolidatedMetadataV2, FillValueMetadataV2,
    GroupMetadataV2, MetadataV2,
};
pub use v2_to_v3::{
    array_metadata_v2_to_v3, data_type_metadata_v2_to_v3, group_metadata_v2_to_v3,
    ArrayMetadataV2ToV3ConversionError,
};
pub use v3::{
    ArrayMetadataV3, ConfigurationInvalidError, FillValueMetadata, GroupMetadataV3,
    MetadataConfiguration, MetadataV3,
};
