//! Fixed-length byte-array column buffer: numeric-to-bytes writes are left
//! zero-padded, big-endian.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::buffer::{bounds, Dictionary, LeafSink, LevelStreams, Page, PageValues};
use crate::error::{Error, RangeError, Result, TypeError};
use crate::level_index::LevelIndexList;
use crate::pool::Resettable;
use crate::types::{PhysicalType, Scalar};

enum Storage {
    Plain(Vec<u8>),
    Dictionary(Vec<i32>),
}

pub struct FixedLenByteArrayBuffer {
    width: usize,
    storage: Storage,
    dictionary: Option<Dictionary>,
    levels: LevelStreams,
}

impl FixedLenByteArrayBuffer {
    pub fn new(width: usize, max_def: i16, max_rep: i16) -> Self {
        FixedLenByteArrayBuffer { width, storage: Storage::Plain(Vec::new()), dictionary: None, levels: LevelStreams::new(max_def, max_rep) }
    }

    pub fn with_dictionary(width: usize, max_def: i16, max_rep: i16) -> Self {
        FixedLenByteArrayBuffer {
            width,
            storage: Storage::Dictionary(Vec::new()),
            dictionary: Some(Dictionary::new(PhysicalType::FixedLenByteArray(width as u32))),
            levels: LevelStreams::new(max_def, max_rep),
        }
    }

    /// Writes an exact-width byte array. Fatal error if `bytes.len() !=
    /// width`.
    pub fn write_byte_array(&mut self, rep_index: &LevelIndexList, bytes: &[u8]) -> Result<()> {
        if bytes.len() != self.width {
            return Err(Error::Type(TypeError::FixedWidthMismatch { expected: self.width, found: bytes.len() }));
        }
        self.push_bytes(rep_index, bytes)
    }

    pub fn write_bool(&mut self, rep_index: &LevelIndexList, v: bool) -> Result<()> {
        self.write_numeric_be(rep_index, if v { &[1u8] } else { &[0u8] })
    }

    pub fn write_int32(&mut self, rep_index: &LevelIndexList, v: i32) -> Result<()> {
        let mut be = [0u8; 4];
        BigEndian::write_i32(&mut be, v);
        self.write_numeric_be(rep_index, &be)
    }

    pub fn write_int64(&mut self, rep_index: &LevelIndexList, v: i64) -> Result<()> {
        let mut be = [0u8; 8];
        BigEndian::write_i64(&mut be, v);
        self.write_numeric_be(rep_index, &be)
    }

    /// Stores three little-endian 32-bit words reversed into the buffer so
    /// the most significant word (index 2) comes first.
    pub fn write_int96(&mut self, rep_index: &LevelIndexList, words: [u32; 3]) -> Result<()> {
        let mut be = [0u8; 12];
        LittleEndian::write_u32(&mut be[0..4], words[2]);
        LittleEndian::write_u32(&mut be[4..8], words[1]);
        LittleEndian::write_u32(&mut be[8..12], words[0]);
        self.write_numeric_be(rep_index, &be)
    }

    fn write_numeric_be(&mut self, rep_index: &LevelIndexList, be: &[u8]) -> Result<()> {
        if be.len() > self.width {
            return Err(Error::Range(RangeError::ValueWiderThanFixedLength { found: be.len(), max: self.width }));
        }
        let mut padded = vec![0u8; self.width];
        padded[self.width - be.len()..].copy_from_slice(be);
        self.push_bytes(rep_index, &padded)
    }

    fn push_bytes(&mut self, rep_index: &LevelIndexList, bytes: &[u8]) -> Result<()> {
        match &mut self.storage {
            Storage::Plain(buffer) => buffer.extend_from_slice(bytes),
            Storage::Dictionary(indices) => {
                let dict = self.dictionary.as_mut().expect("dictionary storage implies dictionary present");
                let idx = dict.insert_fixed_bytes(bytes.to_vec())?;
                indices.push(idx);
            }
        }
        self.levels.push_value(rep_index);
        Ok(())
    }

    pub fn write_null(&mut self, rep_index: &LevelIndexList, level: i16) {
        self.levels.push_null(rep_index, level);
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn size(&self) -> usize {
        let data = match &self.storage {
            Storage::Plain(v) => v.capacity(),
            Storage::Dictionary(v) => v.capacity() * std::mem::size_of::<i32>(),
        };
        data + self.levels.size()
    }

    pub fn reset(&mut self) {
        match &mut self.storage {
            Storage::Plain(v) => v.clear(),
            Storage::Dictionary(v) => v.clear(),
        }
        if self.dictionary.is_some() {
            self.dictionary = Some(Dictionary::new(PhysicalType::FixedLenByteArray(self.width as u32)));
        }
        self.levels.reset();
    }

    pub fn bounds(&self, unsigned: bool) -> Option<(Scalar<'_>, Scalar<'_>)> {
        match &self.storage {
            Storage::Plain(buffer) => {
                let view = FixedLenView { buffer, width: self.width };
                bounds::bounds((0..view.len()).map(|i| Scalar::Bytes(view.get(i))), unsigned)
            }
            Storage::Dictionary(indices) => {
                let dict = self.dictionary.as_ref().expect("dictionary storage implies dictionary present");
                bounds::bounds(indices.iter().map(|&idx| Scalar::Bytes(dict.get_bytes(idx))), unsigned)
            }
        }
    }

    pub fn page(&self) -> Page<'_> {
        let values = match &self.storage {
            Storage::Plain(buffer) => PageValues::FixedLenByteArray(FixedLenView { buffer, width: self.width }),
            Storage::Dictionary(idxs) => PageValues::DictionaryIndices(idxs),
        };
        Page {
            stats: crate::buffer::PageStats {
                num_values: self.levels.len(),
                num_nulls: self.levels.num_nulls(),
                num_rows: self.levels.num_rows(),
            },
            def_levels: self.levels.def_levels(),
            rep_levels: self.levels.rep_levels(),
            values,
        }
    }
}

impl LeafSink for FixedLenByteArrayBuffer {
    fn write_null(&mut self, rep_index: &LevelIndexList, level: i16) {
        FixedLenByteArrayBuffer::write_null(self, rep_index, level)
    }
    fn write_bool(&mut self, rep_index: &LevelIndexList, v: bool) -> Result<()> {
        FixedLenByteArrayBuffer::write_bool(self, rep_index, v)
    }
    fn write_i32(&mut self, rep_index: &LevelIndexList, v: i32) -> Result<()> {
        self.write_int32(rep_index, v)
    }
    fn write_i64(&mut self, rep_index: &LevelIndexList, v: i64) -> Result<()> {
        self.write_int64(rep_index, v)
    }
    fn write_int96(&mut self, rep_index: &LevelIndexList, v: [u32; 3]) -> Result<()> {
        FixedLenByteArrayBuffer::write_int96(self, rep_index, v)
    }
    fn write_bytes(&mut self, rep_index: &LevelIndexList, v: &[u8]) -> Result<()> {
        self.write_byte_array(rep_index, v)
    }
    fn kind_name(&self) -> &'static str {
        "FixedLenByteArray"
    }
    fn len(&self) -> usize {
        FixedLenByteArrayBuffer::len(self)
    }
    fn size(&self) -> usize {
        FixedLenByteArrayBuffer::size(self)
    }
    fn reset(&mut self) {
        FixedLenByteArrayBuffer::reset(self)
    }
    fn page(&self) -> Page<'_> {
        FixedLenByteArrayBuffer::page(self)
    }
}

impl Resettable for FixedLenByteArrayBuffer {
    fn reset(&mut self) {
        FixedLenByteArrayBuffer::reset(self)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedLenView<'a> {
    buffer: &'a [u8],
    width: usize,
}

impl<'a> FixedLenView<'a> {
    pub fn len(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.buffer.len() / self.width
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> &'a [u8] {
        &self.buffer[i * self.width..(i + 1) * self.width]
    }

    pub fn slice(&self, range: std::ops::Range<usize>) -> FixedLenView<'a> {
        FixedLenView { buffer: &self.buffer[range.start * self.width..range.end * self.width], width: self.width }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int32_is_left_padded_big_endian() {
        let mut buf = FixedLenByteArrayBuffer::new(8, 0, 0);
        let root = LevelIndexList::new();
        buf.write_int32(&root, 0x12345678).unwrap();
        let page = buf.page();
        if let PageValues::FixedLenByteArray(view) = page.values {
            assert_eq!(view.get(0), &[0, 0, 0, 0, 0x12, 0x34, 0x56, 0x78]);
        } else {
            panic!("expected fixed-len page");
        }
    }

    #[test]
    fn bool_true_pads_to_a_trailing_one_byte() {
        let mut buf = FixedLenByteArrayBuffer::new(8, 0, 0);
        let root = LevelIndexList::new();
        buf.write_bool(&root, true).unwrap();
        let page = buf.page();
        if let PageValues::FixedLenByteArray(view) = page.values {
            assert_eq!(view.get(0), &[0, 0, 0, 0, 0, 0, 0, 1]);
        } else {
            panic!("expected fixed-len page");
        }
    }

    #[test]
    fn value_wider_than_width_is_a_fatal_error() {
        let mut buf = FixedLenByteArrayBuffer::new(2, 0, 0);
        let root = LevelIndexList::new();
        assert!(buf.write_int64(&root, 1).is_err());
    }

    #[test]
    fn byte_array_of_wrong_exact_length_is_rejected() {
        let mut buf = FixedLenByteArrayBuffer::new(4, 0, 0);
        let root = LevelIndexList::new();
        assert!(buf.write_byte_array(&root, b"abc").is_err());
        assert!(buf.write_byte_array(&root, b"abcd").is_ok());
    }

    #[test]
    fn int96_reverses_word_order_with_msb_first() {
        let mut buf = FixedLenByteArrayBuffer::new(12, 0, 0);
        let root = LevelIndexList::new();
        buf.write_int96(&root, [0x01020304, 0x05060708, 0x090a0b0c]).unwrap();
        let page = buf.page();
        if let PageValues::FixedLenByteArray(view) = page.values {
            let bytes = view.get(0);
            assert_eq!(&bytes[0..4], &0x090a0b0cu32.to_le_bytes());
            assert_eq!(&bytes[8..12], &0x01020304u32.to_le_bytes());
        } else {
            panic!("expected fixed-len page");
        }
    }
}
