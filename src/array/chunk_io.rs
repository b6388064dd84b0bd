//! Per-chunk read-modify-write buffering.
//!
//! A [`ChunkIo`] holds the decoded contents of one chunk: loaded lazily from the store on first
//! touch, mutated in place by subset writes, and written back on [`flush`](ChunkIo::flush).
//! A chunk whose contents are entirely the fill value is erased on flush rather than written, so
//! sparse arrays remain sparse on disk.

use crate::{
    array_subset::ArraySubset,
    storage::{Store, StoreHandle, StoreKey},
};

use super::{codec::CodecChain, ArrayError, ArrayRepresentation};

/// The read-modify-write unit for one chunk of an array.
///
/// Each `ChunkIo` owns an independent clone of the codec chain, so chunks can be encoded and
/// decoded without sharing codec state.
#[derive(Debug)]
pub struct ChunkIo {
    store: StoreHandle,
    key: StoreKey,
    representation: ArrayRepresentation,
    codecs: CodecChain,
    buffer: Option<Vec<u8>>,
    dirty: bool,
}

impl ChunkIo {
    /// Create a new chunk I/O unit for the chunk at `key`.
    #[must_use]
    pub fn new(
        store: StoreHandle,
        key: StoreKey,
        representation: ArrayRepresentation,
        codecs: CodecChain,
    ) -> Self {
        Self {
            store,
            key,
            representation,
            codecs,
            buffer: None,
            dirty: false,
        }
    }

    /// Return the store key of the chunk.
    #[must_use]
    pub fn key(&self) -> &StoreKey {
        &self.key
    }

    /// Returns whether the chunk has unflushed modifications.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Load the decoded chunk into the buffer if it is not already resident.
    ///
    /// An absent store key materializes as a buffer filled with the fill value.
    fn load(&mut self) -> Result<&mut Vec<u8>, ArrayError> {
        if self.buffer.is_none() {
            let buffer = match self.store.get(&self.key)? {
                Some(encoded) => {
                    let decoded = self.codecs.decode(encoded, &self.representation)?;
                    if decoded.len() as u64 != self.representation.size() {
                        return Err(ArrayError::InvalidChunkDecodedSize(
                            decoded.len(),
                            self.representation.size(),
                        ));
                    }
                    decoded
                }
                None => self.representation.fill_value_buffer(),
            };
            self.buffer = Some(buffer);
        }
        Ok(self.buffer.as_mut().expect("just populated"))
    }

    /// Read the sub-array at `chunk_subset` (chunk-relative coordinates).
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the subset is not within the chunk or loading fails.
    pub fn read_subset(&mut self, chunk_subset: &ArraySubset) -> Result<Vec<u8>, ArrayError> {
        let element_size = self.representation.element_size();
        let chunk_shape = self.representation.shape().to_vec();
        let buffer = self.load()?;
        Ok(chunk_subset.extract_bytes(buffer, &chunk_shape, element_size)?)
    }

    /// Write `subset_bytes` into the sub-array at `chunk_subset` (chunk-relative coordinates).
    ///
    /// A full-chunk write replaces the buffer without loading existing contents; a partial write
    /// loads the chunk first to preserve the elements around the subset.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the subset is not within the chunk, the input length is wrong,
    /// or loading fails.
    pub fn write_subset(
        &mut self,
        chunk_subset: &ArraySubset,
        subset_bytes: &[u8],
    ) -> Result<(), ArrayError> {
        let element_size = self.representation.element_size();
        if subset_bytes.len() as u64 != chunk_subset.num_elements() * element_size as u64 {
            return Err(ArrayError::InvalidBytesInputSize(
                subset_bytes.len(),
                chunk_subset.num_elements() * element_size as u64,
            ));
        }
        if chunk_subset.shape() == self.representation.shape() {
            self.buffer = Some(subset_bytes.to_vec());
        } else {
            let chunk_shape = self.representation.shape().to_vec();
            let buffer = self.load()?;
            chunk_subset.store_bytes(subset_bytes, buffer, &chunk_shape, element_size)?;
        }
        self.dirty = true;
        Ok(())
    }

    /// Write back the chunk if it has unflushed modifications.
    ///
    /// A buffer that is entirely the fill value erases the backing key instead of writing it.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if encoding or the store operation fails.
    pub fn flush(&mut self) -> Result<(), ArrayError> {
        if !self.dirty {
            return Ok(());
        }
        let buffer = self.buffer.as_ref().expect("a dirty chunk has a buffer");
        if self
            .representation
            .data_type()
            .all_fill_value(self.representation.fill_value(), buffer)
        {
            self.store.erase(&self.key)?;
        } else {
            let encoded = self.codecs.encode(buffer.clone(), &self.representation)?;
            self.store.set(&self.key, &encoded)?;
        }
        self.dirty = false;
        Ok(())
    }
}
