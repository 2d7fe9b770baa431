//! Variable-length byte-array column buffer. Backs plain strings, JSON,
//! BSON, UUID, enum and any other BYTE_ARRAY-physical leaf.

use crate::buffer::{bounds, Dictionary, LeafSink, LevelStreams, Page, PageValues};
use crate::error::Result;
use crate::level_index::LevelIndexList;
use crate::pool::Resettable;
use crate::types::Scalar;

enum Storage {
    /// `offsets` always has `len() == values + 1`; `offsets[0] == 0` and
    /// `offsets[last] == buffer.len()`, so a page view can slice straight
    /// into both without copying.
    Plain { buffer: Vec<u8>, offsets: Vec<usize> },
    Dictionary(Vec<i32>),
}

pub struct ByteArrayBuffer {
    storage: Storage,
    dictionary: Option<Dictionary>,
    levels: LevelStreams,
}

impl ByteArrayBuffer {
    pub fn new(max_def: i16, max_rep: i16) -> Self {
        ByteArrayBuffer {
            storage: Storage::Plain { buffer: Vec::new(), offsets: vec![0] },
            dictionary: None,
            levels: LevelStreams::new(max_def, max_rep),
        }
    }

    pub fn with_dictionary(max_def: i16, max_rep: i16) -> Self {
        ByteArrayBuffer {
            storage: Storage::Dictionary(Vec::new()),
            dictionary: Some(Dictionary::new(crate::types::PhysicalType::ByteArray)),
            levels: LevelStreams::new(max_def, max_rep),
        }
    }

    pub fn write_byte_array(&mut self, rep_index: &LevelIndexList, bytes: &[u8]) -> Result<()> {
        match &mut self.storage {
            Storage::Plain { buffer, offsets } => {
                buffer.extend_from_slice(bytes);
                offsets.push(buffer.len());
            }
            Storage::Dictionary(indices) => {
                let dict = self.dictionary.as_mut().expect("dictionary storage implies dictionary present");
                let idx = dict.insert_bytes(bytes.to_vec())?;
                indices.push(idx);
            }
        }
        self.levels.push_value(rep_index);
        Ok(())
    }

    pub fn write_null(&mut self, rep_index: &LevelIndexList, level: i16) {
        self.levels.push_null(rep_index, level);
    }

    /// Text-coercing writers: encode the canonical string form, for leaves
    /// that want a number or boolean stored as its textual representation.
    pub fn write_bool_as_text(&mut self, rep_index: &LevelIndexList, v: bool) -> Result<()> {
        self.write_byte_array(rep_index, if v { b"true" } else { b"false" })
    }

    pub fn write_i32_as_text(&mut self, rep_index: &LevelIndexList, v: i32) -> Result<()> {
        self.write_byte_array(rep_index, v.to_string().as_bytes())
    }

    pub fn write_i64_as_text(&mut self, rep_index: &LevelIndexList, v: i64) -> Result<()> {
        self.write_byte_array(rep_index, v.to_string().as_bytes())
    }

    pub fn write_f32_as_text(&mut self, rep_index: &LevelIndexList, v: f32) -> Result<()> {
        self.write_byte_array(rep_index, v.to_string().as_bytes())
    }

    pub fn write_f64_as_text(&mut self, rep_index: &LevelIndexList, v: f64) -> Result<()> {
        self.write_byte_array(rep_index, v.to_string().as_bytes())
    }

    /// The Int96 text form is the decimal of its unsigned 96-bit value.
    pub fn write_int96_as_text(&mut self, rep_index: &LevelIndexList, words: [u32; 3]) -> Result<()> {
        let value = (words[2] as u128) << 64 | (words[1] as u128) << 32 | (words[0] as u128);
        self.write_byte_array(rep_index, value.to_string().as_bytes())
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn size(&self) -> usize {
        let data = match &self.storage {
            Storage::Plain { buffer, offsets } => buffer.capacity() + offsets.capacity() * std::mem::size_of::<usize>(),
            Storage::Dictionary(v) => v.capacity() * std::mem::size_of::<i32>(),
        };
        data + self.levels.size()
    }

    pub fn reset(&mut self) {
        match &mut self.storage {
            Storage::Plain { buffer, offsets } => {
                buffer.clear();
                offsets.clear();
                offsets.push(0);
            }
            Storage::Dictionary(v) => v.clear(),
        }
        if self.dictionary.is_some() {
            self.dictionary = Some(Dictionary::new(crate::types::PhysicalType::ByteArray));
        }
        self.levels.reset();
    }

    pub fn bounds(&self, unsigned: bool) -> Option<(Scalar<'_>, Scalar<'_>)> {
        match &self.storage {
            Storage::Plain { buffer, offsets } => {
                let view = ByteArrayView { buffer, offsets };
                bounds::bounds((0..view.len()).map(|i| Scalar::Bytes(view.get(i))), unsigned)
            }
            Storage::Dictionary(indices) => {
                let dict = self.dictionary.as_ref().expect("dictionary storage implies dictionary present");
                bounds::bounds(indices.iter().map(|&idx| Scalar::Bytes(dict.get_bytes(idx))), unsigned)
            }
        }
    }

    pub fn dictionary(&self) -> Option<&Dictionary> {
        self.dictionary.as_ref()
    }

    pub fn page(&self) -> Page<'_> {
        let values = match &self.storage {
            Storage::Plain { buffer, offsets } => PageValues::ByteArray(ByteArrayView { buffer, offsets }),
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

impl LeafSink for ByteArrayBuffer {
    fn write_null(&mut self, rep_index: &LevelIndexList, level: i16) {
        ByteArrayBuffer::write_null(self, rep_index, level)
    }
    fn write_bool(&mut self, rep_index: &LevelIndexList, v: bool) -> Result<()> {
        self.write_bool_as_text(rep_index, v)
    }
    fn write_i32(&mut self, rep_index: &LevelIndexList, v: i32) -> Result<()> {
        self.write_i32_as_text(rep_index, v)
    }
    fn write_i64(&mut self, rep_index: &LevelIndexList, v: i64) -> Result<()> {
        self.write_i64_as_text(rep_index, v)
    }
    fn write_int96(&mut self, rep_index: &LevelIndexList, v: [u32; 3]) -> Result<()> {
        self.write_int96_as_text(rep_index, v)
    }
    fn write_f32(&mut self, rep_index: &LevelIndexList, v: f32) -> Result<()> {
        self.write_f32_as_text(rep_index, v)
    }
    fn write_f64(&mut self, rep_index: &LevelIndexList, v: f64) -> Result<()> {
        self.write_f64_as_text(rep_index, v)
    }
    fn write_bytes(&mut self, rep_index: &LevelIndexList, v: &[u8]) -> Result<()> {
        self.write_byte_array(rep_index, v)
    }
    fn kind_name(&self) -> &'static str {
        "ByteArray"
    }
    fn len(&self) -> usize {
        ByteArrayBuffer::len(self)
    }
    fn size(&self) -> usize {
        ByteArrayBuffer::size(self)
    }
    fn reset(&mut self) {
        ByteArrayBuffer::reset(self)
    }
    fn page(&self) -> Page<'_> {
        ByteArrayBuffer::page(self)
    }
}

impl Resettable for ByteArrayBuffer {
    fn reset(&mut self) {
        ByteArrayBuffer::reset(self)
    }
}

/// Zero-copy view over a variable-length byte-array data page.
#[derive(Debug, Clone, Copy)]
pub struct ByteArrayView<'a> {
    buffer: &'a [u8],
    offsets: &'a [usize],
}

impl<'a> ByteArrayView<'a> {
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> &'a [u8] {
        &self.buffer[self.offsets[i]..self.offsets[i + 1]]
    }

    /// O(1): re-slices the offsets window, the backing buffer is shared.
    pub fn slice(&self, range: std::ops::Range<usize>) -> ByteArrayView<'a> {
        ByteArrayView { buffer: self.buffer, offsets: &self.offsets[range.start..=range.end] }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_round_trip_through_the_offset_table() {
        let mut buf = ByteArrayBuffer::new(0, 0);
        let root = LevelIndexList::new();
        buf.write_byte_array(&root, b"hello").unwrap();
        buf.write_byte_array(&root, b"world").unwrap();
        let page = buf.page();
        if let PageValues::ByteArray(view) = page.values {
            assert_eq!(view.get(0), b"hello");
            assert_eq!(view.get(1), b"world");
        } else {
            panic!("expected byte array page");
        }
    }

    #[test]
    fn int96_text_form_is_the_unsigned_decimal() {
        let mut buf = ByteArrayBuffer::new(0, 0);
        let root = LevelIndexList::new();
        buf.write_int96_as_text(&root, [1, 0, 0]).unwrap();
        let page = buf.page();
        if let PageValues::ByteArray(view) = page.values {
            assert_eq!(view.get(0), b"1");
        } else {
            panic!("expected byte array page");
        }
    }

    #[test]
    fn dictionary_mode_stores_indices_not_bytes() {
        let mut buf = ByteArrayBuffer::with_dictionary(0, 0);
        let root = LevelIndexList::new();
        buf.write_byte_array(&root, b"a").unwrap();
        buf.write_byte_array(&root, b"b").unwrap();
        buf.write_byte_array(&root, b"a").unwrap();
        assert_eq!(buf.dictionary().unwrap().len(), 2);
        let page = buf.page();
        assert!(matches!(page.values, PageValues::DictionaryIndices(idxs) if idxs == [0, 1, 0]));
    }
}
