//! A Rust library for the [Zarr V3](https://zarr.dev) storage format for multidimensional arrays
//! and metadata, with read-only support for Zarr V2.
//!
//! A Zarr dataset is a [hierarchy](hierarchy) of [groups](group) and [arrays](array) mapped onto an
//! abstract key-value [store](storage). Arrays are partitioned into fixed-shape chunks, each run
//! through an ordered [codec chain](crate::array::codec) on the write and read paths, and dense
//! hyperslab reads and writes are served against those chunks.
//!
//! ## Implementation Status
//! - [x] [ZEP0001 - Zarr specification version 3](https://zarr.dev/zeps/accepted/ZEP0001.html).
//! - [x] Stores: [`MemoryStore`](crate::storage::store::MemoryStore),
//!   [`FilesystemStore`](crate::storage::store::FilesystemStore),
//!   [`HttpStore`](crate::storage::store::HttpStore) (read-only, with Zarr V2 consolidated
//!   metadata discovery).
//! - [x] Data types: the core fixed-width types (`bool`, `(u)int8/16/32/64`, `float32/64`).
//! - [x] Chunk grids: [regular](crate::array::chunk_grid::RegularChunkGrid).
//! - [x] Chunk key encodings: [default](crate::array::chunk_key_encoding::DefaultChunkKeyEncoding),
//!   [v2](crate::array::chunk_key_encoding::V2ChunkKeyEncoding).
//! - [x] Codecs:
//!   - Array to array: [transpose](crate::array::codec::transpose).
//!   - Array to bytes: [bytes](crate::array::codec::bytes).
//!   - Bytes to bytes: [blosc](crate::array::codec::blosc), [gzip](crate::array::codec::gzip),
//!     [zstd](crate::array::codec::zstd), [crc32c checksum](crate::array::codec::crc32c).
//! - [x] Zarr V2 read support: `.zarray`/`.zgroup`/`.zattrs` documents and consolidated
//!   `.zmetadata`, translated to the V3 representation on read.
//!
//! ## Example
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use zarrkit::array::{ArrayMetadataBuilder, DataType};
//! use zarrkit::array_subset::ArraySubset;
//! use zarrkit::hierarchy::Hierarchy;
//! use zarrkit::storage::store::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut hierarchy = Hierarchy::create_with_group(store)?;
//! hierarchy.create_group("/group")?;
//!
//! let mut builder = ArrayMetadataBuilder::new();
//! builder.set_data_type(DataType::Float32);
//! builder.set_shape(vec![8, 8]);
//! hierarchy.create_array_with_builder("/group/array", &builder)?;
//!
//! let array = hierarchy.get_array("/group/array").unwrap();
//! array.store_array_subset_elements::<f32>(
//!     &ArraySubset::new_with_ranges(&[0..2, 0..2]),
//!     &[1.0, 2.0, 3.0, 4.0],
//! )?;
//! let elements: Vec<f32> =
//!     array.retrieve_array_subset_elements(&ArraySubset::new_with_ranges(&[0..2, 0..2]))?;
//! assert_eq!(elements, [1.0, 2.0, 3.0, 4.0]);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![warn(clippy::missing_panics_doc)]

pub mod array;
pub mod array_subset;
pub mod byte_range;
pub mod config;
pub mod group;
pub mod hierarchy;
pub mod metadata;
pub mod node;
pub mod plugin;
pub mod storage;
pub mod version;

/// Re-export [`bytemuck`].
pub use bytemuck;

/// Re-export [`dyn_clone`].
pub use dyn_clone;

/// Re-export [`serde_json`].
pub use serde_json;
