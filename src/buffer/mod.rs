//! Per-kind column buffers, the pages they expose, and dictionary encoding.

pub mod bounds;
pub mod byte_array;
pub mod dictionary;
pub mod fixed_len;

use crate::error::{Error, Result, TypeError};
use crate::level_index::{LevelIndexList, LevelIndexState};
use crate::pool::Resettable;
use crate::types::{PhysicalType, Scalar};

pub use dictionary::Dictionary;

fn unsupported(leaf_kind: &str, write_kind: &str) -> Error {
    Error::Type(TypeError::UnsupportedWrite { leaf_kind: leaf_kind.to_string(), write_kind: write_kind.to_string() })
}

/// Object-safe per-leaf write target the shredder and JSON bridge drive
/// through dynamic dispatch. Each concrete buffer overrides only the
/// kinds it actually stores; the rest fall back to an error instead of
/// silently truncating/coercing.
pub trait LeafSink {
    fn write_null(&mut self, rep_index: &LevelIndexList, level: i16);

    fn write_bool(&mut self, _rep_index: &LevelIndexList, _v: bool) -> Result<()> {
        Err(unsupported(self.kind_name(), "Boolean"))
    }
    fn write_i32(&mut self, _rep_index: &LevelIndexList, _v: i32) -> Result<()> {
        Err(unsupported(self.kind_name(), "Int32"))
    }
    fn write_i64(&mut self, _rep_index: &LevelIndexList, _v: i64) -> Result<()> {
        Err(unsupported(self.kind_name(), "Int64"))
    }
    fn write_int96(&mut self, _rep_index: &LevelIndexList, _v: [u32; 3]) -> Result<()> {
        Err(unsupported(self.kind_name(), "Int96"))
    }
    fn write_f32(&mut self, _rep_index: &LevelIndexList, _v: f32) -> Result<()> {
        Err(unsupported(self.kind_name(), "Float"))
    }
    fn write_f64(&mut self, _rep_index: &LevelIndexList, _v: f64) -> Result<()> {
        Err(unsupported(self.kind_name(), "Double"))
    }
    fn write_bytes(&mut self, _rep_index: &LevelIndexList, _v: &[u8]) -> Result<()> {
        Err(unsupported(self.kind_name(), "ByteArray"))
    }

    fn kind_name(&self) -> &'static str;

    /// The rest of the uniform contract: a writer that only has
    /// `&mut [Box<dyn LeafSink>]` still needs these to flush row groups and
    /// report sizes without knowing the concrete kind.
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn size(&self) -> usize;
    fn reset(&mut self);
    fn page(&self) -> Page<'_>;
}

/// Shared rep/def level bookkeeping used by every buffer kind. A
/// leaf with `max_def == 0` and `max_rep == 0` never needs level bytes at
/// all (a required, non-repeated scalar at the top level); `count` tracks
/// the logical position count in that case since neither vec grows.
#[derive(Debug, Clone)]
pub struct LevelStreams {
    pub max_def: i16,
    pub max_rep: i16,
    def: Vec<i16>,
    rep: Vec<i16>,
    repetition_index: LevelIndexState,
    count: usize,
}

impl LevelStreams {
    pub fn new(max_def: i16, max_rep: i16) -> Self {
        LevelStreams {
            max_def,
            max_rep,
            def: Vec::new(),
            rep: Vec::new(),
            repetition_index: LevelIndexState::new(max_rep),
            count: 0,
        }
    }

    pub fn push_value(&mut self, rep_index: &LevelIndexList) {
        self.count += 1;
        if self.max_def > 0 {
            self.def.push(self.max_def);
        }
        self.push_rep(rep_index);
    }

    pub fn push_null(&mut self, rep_index: &LevelIndexList, level: i16) {
        debug_assert!(level < self.max_def, "write_null level must be below max_def");
        self.count += 1;
        if self.max_def > 0 {
            self.def.push(level);
        }
        self.push_rep(rep_index);
    }

    fn push_rep(&mut self, rep_index: &LevelIndexList) {
        if self.max_rep > 0 {
            let rl = self.repetition_index.copy_and_diff(rep_index);
            self.rep.push(rl);
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn num_nulls(&self) -> usize {
        if self.max_def == 0 {
            0
        } else {
            self.def.iter().filter(|&&d| d < self.max_def).count()
        }
    }

    pub fn num_rows(&self) -> usize {
        if self.max_rep == 0 {
            self.count
        } else {
            self.rep.iter().filter(|&&r| r == 0).count()
        }
    }

    pub fn def_levels(&self) -> Option<&[i16]> {
        if self.max_def > 0 {
            Some(&self.def)
        } else {
            None
        }
    }

    pub fn rep_levels(&self) -> Option<&[i16]> {
        if self.max_rep > 0 {
            Some(&self.rep)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.def.clear();
        self.rep.clear();
        self.count = 0;
        self.repetition_index = LevelIndexState::new(self.max_rep);
    }

    pub fn size(&self) -> usize {
        self.def.capacity() * std::mem::size_of::<i16>() + self.rep.capacity() * std::mem::size_of::<i16>()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PageStats {
    pub num_values: usize,
    pub num_nulls: usize,
    pub num_rows: usize,
}

/// A zero-copy view over a slice of a column buffer.
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    pub stats: PageStats,
    pub def_levels: Option<&'a [i16]>,
    pub rep_levels: Option<&'a [i16]>,
    pub values: PageValues<'a>,
}

#[derive(Debug, Clone, Copy)]
pub enum PageValues<'a> {
    Boolean(&'a [bool]),
    Int32(&'a [i32]),
    Int64(&'a [i64]),
    Int96(&'a [[u32; 3]]),
    Float(&'a [f32]),
    Double(&'a [f64]),
    ByteArray(byte_array::ByteArrayView<'a>),
    FixedLenByteArray(fixed_len::FixedLenView<'a>),
    DictionaryIndices(&'a [i32]),
}

/// Marker for a physical kind whose values need no borrowed storage and
/// can flow straight into a `Scalar`.
pub trait Primitive: Copy {
    const KIND: PhysicalType;
    fn to_scalar(self) -> Scalar<'static>;
    fn dict_insert(dict: &mut Dictionary, v: Self) -> Result<i32>;
    fn dict_get(dict: &Dictionary, idx: i32) -> Self;
}

impl Primitive for bool {
    const KIND: PhysicalType = PhysicalType::Boolean;
    fn to_scalar(self) -> Scalar<'static> {
        Scalar::Bool(self)
    }
    fn dict_insert(dict: &mut Dictionary, v: Self) -> Result<i32> {
        dict.insert_bool(v)
    }
    fn dict_get(dict: &Dictionary, idx: i32) -> Self {
        dict.get_bool(idx)
    }
}

impl Primitive for i32 {
    const KIND: PhysicalType = PhysicalType::Int32;
    fn to_scalar(self) -> Scalar<'static> {
        Scalar::I32(self)
    }
    fn dict_insert(dict: &mut Dictionary, v: Self) -> Result<i32> {
        dict.insert_i32(v)
    }
    fn dict_get(dict: &Dictionary, idx: i32) -> Self {
        dict.get_i32(idx)
    }
}

impl Primitive for i64 {
    const KIND: PhysicalType = PhysicalType::Int64;
    fn to_scalar(self) -> Scalar<'static> {
        Scalar::I64(self)
    }
    fn dict_insert(dict: &mut Dictionary, v: Self) -> Result<i32> {
        dict.insert_i64(v)
    }
    fn dict_get(dict: &Dictionary, idx: i32) -> Self {
        dict.get_i64(idx)
    }
}

impl Primitive for [u32; 3] {
    const KIND: PhysicalType = PhysicalType::Int96;
    fn to_scalar(self) -> Scalar<'static> {
        Scalar::Int96(self)
    }
    fn dict_insert(dict: &mut Dictionary, v: Self) -> Result<i32> {
        dict.insert_int96(v)
    }
    fn dict_get(dict: &Dictionary, idx: i32) -> Self {
        dict.get_int96(idx)
    }
}

impl Primitive for f32 {
    const KIND: PhysicalType = PhysicalType::Float;
    fn to_scalar(self) -> Scalar<'static> {
        Scalar::F32(self)
    }
    fn dict_insert(dict: &mut Dictionary, v: Self) -> Result<i32> {
        dict.insert_f32(v)
    }
    fn dict_get(dict: &Dictionary, idx: i32) -> Self {
        dict.get_f32(idx)
    }
}

impl Primitive for f64 {
    const KIND: PhysicalType = PhysicalType::Double;
    fn to_scalar(self) -> Scalar<'static> {
        Scalar::F64(self)
    }
    fn dict_insert(dict: &mut Dictionary, v: Self) -> Result<i32> {
        dict.insert_f64(v)
    }
    fn dict_get(dict: &Dictionary, idx: i32) -> Self {
        dict.get_f64(idx)
    }
}

enum Storage<T> {
    Plain(Vec<T>),
    Dictionary(Vec<i32>),
}

/// Buffer for any fixed-shape scalar kind: a boolean bitmap, packed
/// int32/int64, or packed float/double. When a dictionary is attached, the
/// storage switches from raw values to dictionary indices — that's the
/// actual on-wire representation a dictionary-encoded page has.
pub struct PrimitiveBuffer<T: Primitive> {
    storage: Storage<T>,
    dictionary: Option<Dictionary>,
    levels: LevelStreams,
}

impl<T: Primitive> PrimitiveBuffer<T> {
    pub fn new(max_def: i16, max_rep: i16) -> Self {
        PrimitiveBuffer { storage: Storage::Plain(Vec::new()), dictionary: None, levels: LevelStreams::new(max_def, max_rep) }
    }

    pub fn with_dictionary(max_def: i16, max_rep: i16) -> Self {
        PrimitiveBuffer {
            storage: Storage::Dictionary(Vec::new()),
            dictionary: Some(Dictionary::new(T::KIND)),
            levels: LevelStreams::new(max_def, max_rep),
        }
    }

    pub fn write_value(&mut self, rep_index: &LevelIndexList, v: T) -> Result<()> {
        match &mut self.storage {
            Storage::Plain(values) => values.push(v),
            Storage::Dictionary(indices) => {
                let idx = T::dict_insert(self.dictionary.as_mut().expect("dictionary storage implies dictionary present"), v)?;
                indices.push(idx);
            }
        }
        self.levels.push_value(rep_index);
        Ok(())
    }

    pub fn write_null(&mut self, rep_index: &LevelIndexList, level: i16) {
        self.levels.push_null(rep_index, level);
    }

    pub fn write_values(&mut self, array: &crate::value::SparseArray<T>, rep_index: &LevelIndexList) -> Result<()> {
        for i in 0..array.len() {
            self.write_value(rep_index, *array.get(i))?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn size(&self) -> usize {
        let data = match &self.storage {
            Storage::Plain(v) => v.capacity() * std::mem::size_of::<T>(),
            Storage::Dictionary(v) => v.capacity() * std::mem::size_of::<i32>(),
        };
        data + self.levels.size()
    }

    pub fn reset(&mut self) {
        tracing::trace!(kind = ?T::KIND, rows = self.len(), size = self.size(), "flushing column buffer for the next row group");
        match &mut self.storage {
            Storage::Plain(v) => v.clear(),
            Storage::Dictionary(v) => v.clear(),
        }
        if let Some(dict) = &mut self.dictionary {
            *dict = Dictionary::new(T::KIND);
        }
        self.levels.reset();
    }

    pub fn bounds(&self, unsigned: bool) -> Option<(Scalar<'static>, Scalar<'static>)> {
        match &self.storage {
            Storage::Plain(values) => bounds::bounds(values.iter().map(|v| v.to_scalar()), unsigned),
            Storage::Dictionary(indices) => {
                let dict = self.dictionary.as_ref().expect("dictionary storage implies dictionary present");
                bounds::bounds(indices.iter().map(|&idx| T::dict_get(dict, idx).to_scalar()), unsigned)
            }
        }
    }

    pub fn dictionary(&self) -> Option<&Dictionary> {
        self.dictionary.as_ref()
    }

    fn stats(&self) -> PageStats {
        PageStats {
            num_values: self.levels.len(),
            num_nulls: self.levels.num_nulls(),
            num_rows: self.levels.num_rows(),
        }
    }

    /// `Some` when this buffer is dictionary-encoded: the data stream is
    /// indices, not raw values, and the page must be read through them.
    fn dictionary_indices(&self) -> Option<&[i32]> {
        match &self.storage {
            Storage::Dictionary(idxs) => Some(idxs),
            Storage::Plain(_) => None,
        }
    }
}

macro_rules! primitive_page {
    ($ty:ty, $variant:ident) => {
        impl PrimitiveBuffer<$ty> {
            pub fn page(&self) -> Page<'_> {
                let values = match self.dictionary_indices() {
                    Some(idxs) => PageValues::DictionaryIndices(idxs),
                    None => match &self.storage {
                        Storage::Plain(v) => PageValues::$variant(v),
                        Storage::Dictionary(_) => unreachable!(),
                    },
                };
                Page {
                    stats: self.stats(),
                    def_levels: self.levels.def_levels(),
                    rep_levels: self.levels.rep_levels(),
                    values,
                }
            }
        }
    };
}

primitive_page!(bool, Boolean);
primitive_page!(i32, Int32);
primitive_page!(i64, Int64);
primitive_page!([u32; 3], Int96);
primitive_page!(f32, Float);
primitive_page!(f64, Double);

impl LeafSink for PrimitiveBuffer<bool> {
    fn write_null(&mut self, rep_index: &LevelIndexList, level: i16) {
        self.levels.push_null(rep_index, level);
    }
    fn write_bool(&mut self, rep_index: &LevelIndexList, v: bool) -> Result<()> {
        self.write_value(rep_index, v)
    }
    fn kind_name(&self) -> &'static str {
        "Boolean"
    }
    fn len(&self) -> usize {
        PrimitiveBuffer::len(self)
    }
    fn size(&self) -> usize {
        PrimitiveBuffer::size(self)
    }
    fn reset(&mut self) {
        PrimitiveBuffer::reset(self)
    }
    fn page(&self) -> Page<'_> {
        PrimitiveBuffer::page(self)
    }
}

impl LeafSink for PrimitiveBuffer<i32> {
    fn write_null(&mut self, rep_index: &LevelIndexList, level: i16) {
        self.levels.push_null(rep_index, level);
    }
    fn write_i32(&mut self, rep_index: &LevelIndexList, v: i32) -> Result<()> {
        self.write_value(rep_index, v)
    }
    fn kind_name(&self) -> &'static str {
        "Int32"
    }
    fn len(&self) -> usize {
        PrimitiveBuffer::len(self)
    }
    fn size(&self) -> usize {
        PrimitiveBuffer::size(self)
    }
    fn reset(&mut self) {
        PrimitiveBuffer::reset(self)
    }
    fn page(&self) -> Page<'_> {
        PrimitiveBuffer::page(self)
    }
}

impl LeafSink for PrimitiveBuffer<i64> {
    fn write_null(&mut self, rep_index: &LevelIndexList, level: i16) {
        self.levels.push_null(rep_index, level);
    }
    fn write_i64(&mut self, rep_index: &LevelIndexList, v: i64) -> Result<()> {
        self.write_value(rep_index, v)
    }
    fn kind_name(&self) -> &'static str {
        "Int64"
    }
    fn len(&self) -> usize {
        PrimitiveBuffer::len(self)
    }
    fn size(&self) -> usize {
        PrimitiveBuffer::size(self)
    }
    fn reset(&mut self) {
        PrimitiveBuffer::reset(self)
    }
    fn page(&self) -> Page<'_> {
        PrimitiveBuffer::page(self)
    }
}

impl LeafSink for PrimitiveBuffer<[u32; 3]> {
    fn write_null(&mut self, rep_index: &LevelIndexList, level: i16) {
        self.levels.push_null(rep_index, level);
    }
    fn write_int96(&mut self, rep_index: &LevelIndexList, v: [u32; 3]) -> Result<()> {
        self.write_value(rep_index, v)
    }
    fn kind_name(&self) -> &'static str {
        "Int96"
    }
    fn len(&self) -> usize {
        PrimitiveBuffer::len(self)
    }
    fn size(&self) -> usize {
        PrimitiveBuffer::size(self)
    }
    fn reset(&mut self) {
        PrimitiveBuffer::reset(self)
    }
    fn page(&self) -> Page<'_> {
        PrimitiveBuffer::page(self)
    }
}

impl LeafSink for PrimitiveBuffer<f32> {
    fn write_null(&mut self, rep_index: &LevelIndexList, level: i16) {
        self.levels.push_null(rep_index, level);
    }
    fn write_f32(&mut self, rep_index: &LevelIndexList, v: f32) -> Result<()> {
        self.write_value(rep_index, v)
    }
    fn kind_name(&self) -> &'static str {
        "Float"
    }
    fn len(&self) -> usize {
        PrimitiveBuffer::len(self)
    }
    fn size(&self) -> usize {
        PrimitiveBuffer::size(self)
    }
    fn reset(&mut self) {
        PrimitiveBuffer::reset(self)
    }
    fn page(&self) -> Page<'_> {
        PrimitiveBuffer::page(self)
    }
}

impl LeafSink for PrimitiveBuffer<f64> {
    fn write_null(&mut self, rep_index: &LevelIndexList, level: i16) {
        self.levels.push_null(rep_index, level);
    }
    fn write_f64(&mut self, rep_index: &LevelIndexList, v: f64) -> Result<()> {
        self.write_value(rep_index, v)
    }
    fn kind_name(&self) -> &'static str {
        "Double"
    }
    fn len(&self) -> usize {
        PrimitiveBuffer::len(self)
    }
    fn size(&self) -> usize {
        PrimitiveBuffer::size(self)
    }
    fn reset(&mut self) {
        PrimitiveBuffer::reset(self)
    }
    fn page(&self) -> Page<'_> {
        PrimitiveBuffer::page(self)
    }
}

impl<T: Primitive> Resettable for PrimitiveBuffer<T> {
    fn reset(&mut self) {
        PrimitiveBuffer::reset(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_stability_holds_across_repeated_inserts() {
        let mut buf: PrimitiveBuffer<i32> = PrimitiveBuffer::with_dictionary(0, 0);
        let root = LevelIndexList::new();
        buf.write_value(&root, 7).unwrap();
        buf.write_value(&root, 9).unwrap();
        buf.write_value(&root, 7).unwrap();
        let dict = buf.dictionary().unwrap();
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn reset_clears_values_but_keeps_capacity() {
        let mut buf: PrimitiveBuffer<i64> = PrimitiveBuffer::new(0, 0);
        let root = LevelIndexList::new();
        buf.write_value(&root, 1).unwrap();
        buf.write_value(&root, 2).unwrap();
        assert_eq!(buf.len(), 2);
        buf.reset();
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn null_count_respects_max_def() {
        let mut buf: PrimitiveBuffer<i32> = PrimitiveBuffer::new(1, 0);
        let root = LevelIndexList::new();
        buf.write_value(&root, 1).unwrap();
        buf.write_null(&root, 0);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.levels.num_nulls(), 1);
    }
}
