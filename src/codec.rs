//! Wire codec seam: compression, entropy encodings (plain/RLE/delta/
//! byte-stream-split) and Thrift footer serialization are external
//! collaborators. This module only defines the boundary they plug into:
//! `(type, encoding, values) → bytes` and its inverse.

use crate::buffer::PageValues;
use crate::config::{Compression, Encoding};
use crate::error::Result;
use crate::types::PhysicalType;

/// An external codec's decoded value column, returned by `decode_values`.
/// Owned because it crosses the bytes→values boundary; callers reassemble
/// a `Page` by pairing this with separately decoded rep/def levels.
#[derive(Debug, Clone)]
pub enum DecodedValues {
    Boolean(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Int96(Vec<[u32; 3]>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    ByteArray(Vec<Vec<u8>>),
    FixedLenByteArray { width: usize, data: Vec<u8> },
    DictionaryIndices(Vec<i32>),
}

/// Implemented by the external wire-codec collaborator. The core calls this
/// at row-group flush/read time but never implements it.
pub trait Codec {
    /// Serializes one page's values (not its level streams) under the
    /// given encoding, then compresses the result.
    fn encode_values(&self, kind: PhysicalType, encoding: Encoding, compression: Compression, values: &PageValues) -> Result<Vec<u8>>;

    /// Inverse of `encode_values`. `count` is the page's `num_values`.
    fn decode_values(&self, kind: PhysicalType, encoding: Encoding, compression: Compression, bytes: &[u8], count: usize) -> Result<DecodedValues>;

    /// Rep/def level streams are always RLE/bit-packed on the wire
    /// regardless of the value encoding.
    fn encode_levels(&self, levels: &[i16], max_level: i16) -> Result<Vec<u8>>;

    fn decode_levels(&self, bytes: &[u8], max_level: i16, count: usize) -> Result<Vec<i16>>;
}
