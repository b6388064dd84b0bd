//! A builder for Zarr V3 array metadata.

use thiserror::Error;

use crate::metadata::{ArrayMetadataV3, MetadataConfiguration, MetadataV3};

use super::{
    chunk_key_encoding::ChunkKeyEncoding,
    codec::{
        blosc, bytes, transpose, BloscCodecConfigurationV1, BloscCompressionLevel,
        BloscCompressor, BloscShuffleMode, BytesCodecConfigurationV1, CodecChain,
        CodecChainCreateError, Endianness, TransposeCodecConfigurationV1, TransposeOrder,
    },
    chunk_grid::{ChunkGridError, RegularChunkGrid},
    ArrayShape, DataType, FillValue,
};

/// The default maximum chunk extent along each dimension.
const DEFAULT_CHUNK_LENGTH: u64 = 100;

/// An array metadata builder error.
#[derive(Debug, Error)]
pub enum ArrayMetadataBuilderError {
    /// A required field has not been set.
    #[error("the {0} of the array has not been set")]
    MissingField(&'static str),
    /// The codec chain would be invalid.
    #[error(transparent)]
    InvalidChain(#[from] CodecChainCreateError),
    /// An incompatible chunk shape.
    #[error(transparent)]
    ChunkGridError(#[from] ChunkGridError),
    /// The named codec is not in the codec chain.
    #[error("codec {0} is not in the codec chain")]
    UnknownCodec(String),
    /// A serialization error.
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
}

/// A builder for Zarr V3 array metadata.
///
/// Setting the shape resets the chunk shape to `min(shape, 100)` along each dimension and
/// regenerates the default codec chain; setting the data type resets the fill value to the data
/// type default and also regenerates the codec chain. The default codec chain is
/// `transpose` (reversed order, rank two and above), `bytes` (little endian), and `blosc`
/// (`zstd` compression at level 1 with the data type default shuffle). The builder validates
/// every codec edit, refusing changes that would break the chain.
///
/// For example:
/// ```
/// # use zarrkit::array::{ArrayMetadataBuilder, DataType};
/// let mut builder = ArrayMetadataBuilder::new();
/// builder.set_data_type(DataType::Int16);
/// builder.set_shape(vec![240, 310, 5]);
/// assert!(builder.is_valid());
/// let metadata = builder.metadata().unwrap();
/// assert_eq!(metadata.chunk_grid.configuration().unwrap()["chunk_shape"],
///            serde_json::json!([100, 100, 5]));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArrayMetadataBuilder {
    data_type: Option<DataType>,
    shape: Option<ArrayShape>,
    chunk_shape: Option<ArrayShape>,
    fill_value: Option<FillValue>,
    portable: bool,
    codecs: Vec<MetadataV3>,
    chunk_key_encoding: Option<ChunkKeyEncoding>,
    attributes: serde_json::Map<String, serde_json::Value>,
}

impl ArrayMetadataBuilder {
    /// Create a new array metadata builder with no fields set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the data type.
    #[must_use]
    pub const fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    /// Return the shape.
    #[must_use]
    pub fn shape(&self) -> Option<&ArrayShape> {
        self.shape.as_ref()
    }

    /// Return the chunk shape.
    #[must_use]
    pub fn chunk_shape(&self) -> Option<&ArrayShape> {
        self.chunk_shape.as_ref()
    }

    /// Return the fill value.
    #[must_use]
    pub fn fill_value(&self) -> Option<&FillValue> {
        self.fill_value.as_ref()
    }

    /// Return the codec chain metadata.
    #[must_use]
    pub fn codecs(&self) -> &[MetadataV3] {
        &self.codecs
    }

    /// Returns whether the builder is in portable mode (no transpose codec).
    #[must_use]
    pub const fn portable(&self) -> bool {
        self.portable
    }

    /// Set the data type.
    ///
    /// Resets the fill value to the data type default and regenerates the default codec chain.
    pub fn set_data_type(&mut self, data_type: DataType) -> &mut Self {
        self.data_type = Some(data_type);
        self.fill_value = Some(data_type.default_fill_value());
        self.refresh_codecs();
        self
    }

    /// Set the array shape.
    ///
    /// Resets the chunk shape to `min(shape, 100)` along each dimension and regenerates the
    /// default codec chain.
    pub fn set_shape(&mut self, shape: ArrayShape) -> &mut Self {
        self.chunk_shape = Some(
            shape
                .iter()
                .map(|&d| d.min(DEFAULT_CHUNK_LENGTH).max(1))
                .collect(),
        );
        self.shape = Some(shape);
        self.refresh_codecs();
        self
    }

    /// Set the chunk shape.
    ///
    /// # Errors
    /// Returns an [`ArrayMetadataBuilderError`] if the chunk shape is incompatible with the array
    /// shape.
    pub fn set_chunk_shape(
        &mut self,
        chunk_shape: ArrayShape,
    ) -> Result<&mut Self, ArrayMetadataBuilderError> {
        if let Some(shape) = &self.shape {
            RegularChunkGrid::new(shape.clone(), chunk_shape.clone())?;
        }
        self.chunk_shape = Some(chunk_shape);
        Ok(self)
    }

    /// Set the fill value.
    pub fn set_fill_value(&mut self, fill_value: FillValue) -> &mut Self {
        self.fill_value = Some(fill_value);
        self
    }

    /// Set portable mode.
    ///
    /// Portable mode removes the transpose codec, so the on-disk layout matches the logical
    /// (row-major, dimension 0 outermost) layout. Disabling it reinstates a transpose codec with a
    /// reversed order for arrays of rank two and above.
    pub fn set_portable(&mut self, portable: bool) -> &mut Self {
        self.portable = portable;
        if portable {
            self.codecs
                .retain(|codec| codec.name() != transpose::IDENTIFIER);
        } else if !self.codecs.iter().any(|c| c.name() == transpose::IDENTIFIER) {
            if let Some(order) = self
                .rank()
                .filter(|&rank| rank >= 2)
                .and_then(|rank| TransposeOrder::new_reversed(rank).ok())
            {
                let metadata = MetadataV3::new_with_serializable_configuration(
                    transpose::IDENTIFIER,
                    &TransposeCodecConfigurationV1 { order },
                )
                .expect("the transpose configuration is serializable");
                self.codecs.insert(0, metadata);
            }
        }
        self
    }

    /// Return the chunk key encoding, if one has been set.
    ///
    /// When unset, [`metadata`](Self::metadata) uses the `default` encoding with the `/`
    /// separator, and arrays created through a
    /// [`Hierarchy`](crate::hierarchy::Hierarchy) use the separator preferred by the store.
    #[must_use]
    pub const fn chunk_key_encoding(&self) -> Option<&ChunkKeyEncoding> {
        self.chunk_key_encoding.as_ref()
    }

    /// Set the chunk key encoding.
    pub fn set_chunk_key_encoding(&mut self, chunk_key_encoding: ChunkKeyEncoding) -> &mut Self {
        self.chunk_key_encoding = Some(chunk_key_encoding);
        self
    }

    /// Set the user attributes.
    pub fn set_attributes(
        &mut self,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> &mut Self {
        self.attributes = attributes;
        self
    }

    /// Add a codec at `position` (appended if [`None`]).
    ///
    /// # Errors
    /// Returns an [`ArrayMetadataBuilderError`] if the codec is unknown, its configuration is
    /// invalid, or the insertion would break the codec chain.
    pub fn add_codec(
        &mut self,
        name: &str,
        configuration: MetadataConfiguration,
        position: Option<usize>,
    ) -> Result<&mut Self, ArrayMetadataBuilderError> {
        let metadata = if configuration.is_empty() {
            MetadataV3::new(name)
        } else {
            MetadataV3::new_with_configuration(name, configuration)
        };
        let position = position.unwrap_or(self.codecs.len()).min(self.codecs.len());
        let mut codecs = self.codecs.clone();
        codecs.insert(position, metadata);
        CodecChain::from_metadata(&codecs)?;
        self.codecs = codecs;
        Ok(self)
    }

    /// Remove the codec named `name`.
    ///
    /// # Errors
    /// Returns an [`ArrayMetadataBuilderError`] if the codec is not in the chain or its removal
    /// would break the codec chain.
    pub fn remove_codec(&mut self, name: &str) -> Result<&mut Self, ArrayMetadataBuilderError> {
        let position = self
            .codecs
            .iter()
            .position(|codec| codec.name() == name)
            .ok_or_else(|| ArrayMetadataBuilderError::UnknownCodec(name.to_string()))?;
        let mut codecs = self.codecs.clone();
        codecs.remove(position);
        CodecChain::from_metadata(&codecs)?;
        self.codecs = codecs;
        Ok(self)
    }

    /// Returns whether the builder holds complete and valid array metadata.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.data_type.is_some()
            && self.shape.is_some()
            && self.chunk_shape.is_some()
            && !self.codecs.is_empty()
            && CodecChain::from_metadata(&self.codecs).is_ok()
    }

    /// Emit the array metadata document.
    ///
    /// # Errors
    /// Returns an [`ArrayMetadataBuilderError`] if a required field is missing or the codec chain
    /// is invalid.
    pub fn metadata(&self) -> Result<ArrayMetadataV3, ArrayMetadataBuilderError> {
        let data_type = self
            .data_type
            .ok_or(ArrayMetadataBuilderError::MissingField("data type"))?;
        let shape = self
            .shape
            .clone()
            .ok_or(ArrayMetadataBuilderError::MissingField("shape"))?;
        let chunk_shape = self
            .chunk_shape
            .clone()
            .ok_or(ArrayMetadataBuilderError::MissingField("chunk shape"))?;
        CodecChain::from_metadata(&self.codecs)?;

        let fill_value = self
            .fill_value
            .clone()
            .unwrap_or_else(|| data_type.default_fill_value());
        let fill_value_metadata = data_type.metadata_fill_value(&fill_value).ok_or(
            ArrayMetadataBuilderError::MissingField("fill value"),
        )?;
        let chunk_grid = RegularChunkGrid::new(shape.clone(), chunk_shape)?;

        Ok(ArrayMetadataV3::new(
            shape,
            data_type.metadata(),
            chunk_grid.create_metadata(),
            self.chunk_key_encoding
                .clone()
                .unwrap_or_default()
                .create_metadata(),
            fill_value_metadata,
            self.codecs.clone(),
            self.attributes.clone(),
        ))
    }

    fn rank(&self) -> Option<usize> {
        self.shape.as_ref().map(Vec::len)
    }

    /// Regenerate the default codec chain for the current data type, shape, and portability.
    fn refresh_codecs(&mut self) {
        let Some(data_type) = self.data_type else {
            self.codecs.clear();
            return;
        };

        let mut codecs = Vec::with_capacity(3);
        if !self.portable {
            if let Some(order) = self
                .rank()
                .filter(|&rank| rank >= 2)
                .and_then(|rank| TransposeOrder::new_reversed(rank).ok())
            {
                codecs.push(
                    MetadataV3::new_with_serializable_configuration(
                        transpose::IDENTIFIER,
                        &TransposeCodecConfigurationV1 { order },
                    )
                    .expect("the transpose configuration is serializable"),
                );
            }
        }
        codecs.push(
            MetadataV3::new_with_serializable_configuration(
                bytes::IDENTIFIER,
                &BytesCodecConfigurationV1 {
                    endian: (data_type.size() > 1).then_some(Endianness::Little),
                },
            )
            .expect("the bytes configuration is serializable"),
        );
        codecs.push(
            MetadataV3::new_with_serializable_configuration(
                blosc::IDENTIFIER,
                &BloscCodecConfigurationV1 {
                    cname: BloscCompressor::Zstd,
                    clevel: BloscCompressionLevel::try_from(1).expect("1 is a valid clevel"),
                    shuffle: BloscShuffleMode::default_for_data_type(data_type),
                    typesize: Some(data_type.size()),
                    blocksize: 0,
                },
            )
            .expect("the blosc configuration is serializable"),
        );
        self.codecs = codecs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_default_codec_chain() {
        let mut builder = ArrayMetadataBuilder::new();
        builder.set_data_type(DataType::Int16);
        builder.set_shape(vec![240, 310, 5]);

        assert_eq!(builder.chunk_shape(), Some(&vec![100, 100, 5]));
        let names: Vec<_> = builder.codecs().iter().map(MetadataV3::name).collect();
        assert_eq!(names, vec!["transpose", "bytes", "blosc"]);
        assert!(builder.is_valid());

        let transpose = &builder.codecs()[0];
        assert_eq!(
            transpose.configuration().unwrap()["order"],
            serde_json::json!([2, 1, 0])
        );
        let bytes = &builder.codecs()[1];
        assert_eq!(
            bytes.configuration().unwrap()["endian"],
            serde_json::json!("little")
        );
        let blosc = builder.codecs()[2].configuration().unwrap();
        assert_eq!(blosc["cname"], serde_json::json!("zstd"));
        assert_eq!(blosc["clevel"], serde_json::json!(1));
        assert_eq!(blosc["shuffle"], serde_json::json!("shuffle"));
        assert_eq!(blosc["typesize"], serde_json::json!(2));
        assert_eq!(blosc["blocksize"], serde_json::json!(0));
    }

    #[test]
    fn builder_codec_edits() {
        let mut builder = ArrayMetadataBuilder::new();
        builder.set_data_type(DataType::Int16);
        builder.set_shape(vec![240, 310, 5]);
        builder.set_chunk_shape(vec![120, 31, 5]).unwrap();
        builder.remove_codec("blosc").unwrap();
        builder
            .add_codec("gzip", {
                let mut configuration = serde_json::Map::new();
                configuration.insert("level".to_string(), serde_json::json!(5));
                configuration
            }, None)
            .unwrap();

        let names: Vec<_> = builder.codecs().iter().map(MetadataV3::name).collect();
        assert_eq!(names, vec!["transpose", "bytes", "gzip"]);
        assert!(builder.is_valid());
    }

    #[test]
    fn builder_refuses_invalid_edits() {
        let mut builder = ArrayMetadataBuilder::new();
        builder.set_data_type(DataType::Int16);
        builder.set_shape(vec![100, 100]);

        // removing the bytes codec breaks the chain
        assert!(builder.remove_codec("bytes").is_err());
        // a second array to bytes codec breaks the chain
        assert!(builder
            .add_codec("bytes", serde_json::Map::new(), None)
            .is_err());
        // the chain is unchanged
        let names: Vec<_> = builder.codecs().iter().map(MetadataV3::name).collect();
        assert_eq!(names, vec!["transpose", "bytes", "blosc"]);
    }

    #[test]
    fn builder_portable_removes_transpose() {
        let mut builder = ArrayMetadataBuilder::new();
        builder.set_data_type(DataType::Float64);
        builder.set_shape(vec![100, 100]);
        builder.set_portable(true);
        let names: Vec<_> = builder.codecs().iter().map(MetadataV3::name).collect();
        assert_eq!(names, vec!["bytes", "blosc"]);

        builder.set_portable(false);
        let names: Vec<_> = builder.codecs().iter().map(MetadataV3::name).collect();
        assert_eq!(names, vec!["transpose", "bytes", "blosc"]);
    }

    #[test]
    fn builder_rank_one_has_no_transpose() {
        let mut builder = ArrayMetadataBuilder::new();
        builder.set_data_type(DataType::UInt8);
        builder.set_shape(vec![50]);
        let names: Vec<_> = builder.codecs().iter().map(MetadataV3::name).collect();
        assert_eq!(names, vec!["bytes", "blosc"]);
        // single-byte data types omit the endianness
        assert!(builder.codecs()[0].configuration_is_none_or_empty());
    }

    #[test]
    fn builder_incomplete_is_invalid() {
        let mut builder = ArrayMetadataBuilder::new();
        assert!(!builder.is_valid());
        assert!(builder.metadata().is_err());
        builder.set_data_type(DataType::Int32);
        assert!(!builder.is_valid());
        builder.set_shape(vec![10, 10]);
        assert!(builder.is_valid());
        assert!(builder.metadata().is_ok());
    }

    #[test]
    fn builder_data_type_resets_fill_value() {
        let mut builder = ArrayMetadataBuilder::new();
        builder.set_data_type(DataType::Int32);
        assert_eq!(
            builder.fill_value(),
            Some(&FillValue::from(-2_147_483_647_i32))
        );
        builder.set_fill_value(FillValue::from(0_i32));
        builder.set_data_type(DataType::UInt8);
        assert_eq!(builder.fill_value(), Some(&FillValue::from(u8::MAX)));
    }
}
