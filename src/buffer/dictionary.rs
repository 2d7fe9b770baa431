//! Hash-probe dictionary encoding.
//!
//! Each physical kind gets its own table; insertion returns a stable index
//! and the same value always maps to the same index. Floats are keyed by
//! bit pattern so NaN/±0 hash and compare consistently with themselves
//! across inserts.

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{Error, Result, TypeError};
use crate::types::PhysicalType;

#[derive(Debug, Clone)]
pub struct DictTable<K> {
    values: Vec<K>,
    probe: HashMap<K, i32>,
}

impl<K: Hash + Eq + Clone> DictTable<K> {
    fn new() -> Self {
        DictTable { values: Vec::new(), probe: HashMap::new() }
    }

    fn insert(&mut self, k: K) -> i32 {
        if let Some(&idx) = self.probe.get(&k) {
            return idx;
        }
        let idx = self.values.len();
        assert!(idx < (1usize << 31), "dictionary exceeded 2^31 entries");
        let idx = idx as i32;
        self.values.push(k.clone());
        self.probe.insert(k, idx);
        idx
    }

    fn get(&self, idx: i32) -> &K {
        &self.values[idx as usize]
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}

/// A dictionary bound to one physical kind; owned by exactly one column
/// buffer.
#[derive(Debug, Clone)]
pub enum Dictionary {
    Boolean(DictTable<bool>),
    Int32(DictTable<i32>),
    Int64(DictTable<i64>),
    Int96(DictTable<[u32; 3]>),
    Float(DictTable<u32>),
    Double(DictTable<u64>),
    ByteArray(DictTable<Vec<u8>>),
    FixedLenByteArray(DictTable<Vec<u8>>),
}

macro_rules! insert_fn {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&mut self, v: $ty) -> Result<i32> {
            match self {
                Dictionary::$variant(t) => Ok(t.insert(v)),
                other => {
                    tracing::warn!(expected = ?other.kind(), found = stringify!($variant), "rejected a cross-kind dictionary insert");
                    Err(Error::Type(TypeError::CrossKindDictionaryInsert {
                        expected: format!("{:?}", other.kind()),
                        found: stringify!($variant).to_string(),
                    }))
                }
            }
        }
    };
}

impl Dictionary {
    pub fn new(kind: PhysicalType) -> Dictionary {
        match kind {
            PhysicalType::Boolean => Dictionary::Boolean(DictTable::new()),
            PhysicalType::Int32 => Dictionary::Int32(DictTable::new()),
            PhysicalType::Int64 => Dictionary::Int64(DictTable::new()),
            PhysicalType::Int96 => Dictionary::Int96(DictTable::new()),
            PhysicalType::Float => Dictionary::Float(DictTable::new()),
            PhysicalType::Double => Dictionary::Double(DictTable::new()),
            PhysicalType::ByteArray => Dictionary::ByteArray(DictTable::new()),
            PhysicalType::FixedLenByteArray(_) => Dictionary::FixedLenByteArray(DictTable::new()),
        }
    }

    pub fn kind(&self) -> PhysicalType {
        match self {
            Dictionary::Boolean(_) => PhysicalType::Boolean,
            Dictionary::Int32(_) => PhysicalType::Int32,
            Dictionary::Int64(_) => PhysicalType::Int64,
            Dictionary::Int96(_) => PhysicalType::Int96,
            Dictionary::Float(_) => PhysicalType::Float,
            Dictionary::Double(_) => PhysicalType::Double,
            Dictionary::ByteArray(_) => PhysicalType::ByteArray,
            // width is unknown from the dictionary alone; callers that need
            // it already have it from the owning buffer's schema leaf.
            Dictionary::FixedLenByteArray(_) => PhysicalType::FixedLenByteArray(0),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Dictionary::Boolean(t) => t.len(),
            Dictionary::Int32(t) => t.len(),
            Dictionary::Int64(t) => t.len(),
            Dictionary::Int96(t) => t.len(),
            Dictionary::Float(t) => t.len(),
            Dictionary::Double(t) => t.len(),
            Dictionary::ByteArray(t) => t.len(),
            Dictionary::FixedLenByteArray(t) => t.len(),
        }
    }

    insert_fn!(insert_bool, Boolean, bool);
    insert_fn!(insert_i32, Int32, i32);
    insert_fn!(insert_i64, Int64, i64);
    insert_fn!(insert_int96, Int96, [u32; 3]);
    insert_fn!(insert_bytes, ByteArray, Vec<u8>);
    insert_fn!(insert_fixed_bytes, FixedLenByteArray, Vec<u8>);

    pub fn insert_f32(&mut self, v: f32) -> Result<i32> {
        match self {
            Dictionary::Float(t) => Ok(t.insert(v.to_bits())),
            other => Err(Error::Type(TypeError::CrossKindDictionaryInsert {
                expected: format!("{:?}", other.kind()),
                found: "Float".to_string(),
            })),
        }
    }

    pub fn insert_f64(&mut self, v: f64) -> Result<i32> {
        match self {
            Dictionary::Double(t) => Ok(t.insert(v.to_bits())),
            other => Err(Error::Type(TypeError::CrossKindDictionaryInsert {
                expected: format!("{:?}", other.kind()),
                found: "Double".to_string(),
            })),
        }
    }

    pub fn get_bool(&self, idx: i32) -> bool {
        match self {
            Dictionary::Boolean(t) => *t.get(idx),
            _ => unreachable!("dictionary kind mismatch on read"),
        }
    }

    pub fn get_i32(&self, idx: i32) -> i32 {
        match self {
            Dictionary::Int32(t) => *t.get(idx),
            _ => unreachable!("dictionary kind mismatch on read"),
        }
    }

    pub fn get_i64(&self, idx: i32) -> i64 {
        match self {
            Dictionary::Int64(t) => *t.get(idx),
            _ => unreachable!("dictionary kind mismatch on read"),
        }
    }

    pub fn get_int96(&self, idx: i32) -> [u32; 3] {
        match self {
            Dictionary::Int96(t) => *t.get(idx),
            _ => unreachable!("dictionary kind mismatch on read"),
        }
    }

    pub fn get_f32(&self, idx: i32) -> f32 {
        match self {
            Dictionary::Float(t) => f32::from_bits(*t.get(idx)),
            _ => unreachable!("dictionary kind mismatch on read"),
        }
    }

    pub fn get_f64(&self, idx: i32) -> f64 {
        match self {
            Dictionary::Double(t) => f64::from_bits(*t.get(idx)),
            _ => unreachable!("dictionary kind mismatch on read"),
        }
    }

    pub fn get_bytes(&self, idx: i32) -> &[u8] {
        match self {
            Dictionary::ByteArray(t) | Dictionary::FixedLenByteArray(t) => t.get(idx),
            _ => unreachable!("dictionary kind mismatch on read"),
        }
    }
}
