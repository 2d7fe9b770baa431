//! The merge heap's comparator. A row's position in the heap is decided by
//! a precomputed sort key, not by comparing rows directly, so the key can
//! own its bytes and outlive the chunk the row came from without
//! borrowing into it.

use std::cmp::Ordering;

use crate::types::{compare, Scalar};
use crate::value::{Payload, Row};

use super::SortKey;

#[derive(Debug, Clone, PartialEq)]
enum SortValue {
    Bool(bool),
    I32(i32),
    I64(i64),
    Int96([u32; 3]),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
}

impl SortValue {
    fn as_scalar(&self) -> Scalar<'_> {
        match self {
            SortValue::Bool(v) => Scalar::Bool(*v),
            SortValue::I32(v) => Scalar::I32(*v),
            SortValue::I64(v) => Scalar::I64(*v),
            SortValue::Int96(v) => Scalar::Int96(*v),
            SortValue::F32(v) => Scalar::F32(*v),
            SortValue::F64(v) => Scalar::F64(*v),
            SortValue::Bytes(v) => Scalar::Bytes(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SortKeyComponent {
    value: Option<SortValue>,
    descending: bool,
    nulls_first: bool,
}

impl SortKeyComponent {
    fn compare(&self, other: &Self) -> Ordering {
        match (&self.value, &other.value) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => if self.nulls_first { Ordering::Less } else { Ordering::Greater },
            (Some(_), None) => if self.nulls_first { Ordering::Greater } else { Ordering::Less },
            (Some(a), Some(b)) => {
                let ord = compare(&a.as_scalar(), &b.as_scalar(), false);
                if self.descending {
                    ord.reverse()
                } else {
                    ord
                }
            }
        }
    }
}

/// One reader's entry in the merge heap: its head row's sort key plus the
/// reader's own index, which breaks ties in favor of the source that was
/// registered first.
#[derive(Debug, Clone, PartialEq)]
pub struct HeapEntry {
    pub key: Vec<SortKeyComponent>,
    pub source_idx: usize,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.key.iter().zip(other.key.iter()) {
            let c = a.compare(b);
            if c != Ordering::Equal {
                return c;
            }
        }
        self.source_idx.cmp(&other.source_idx)
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn value_to_sort_value(row: &Row, column_index: usize) -> Option<SortValue> {
    let v = row.values.iter().find(|v| v.column_index == column_index)?;
    if v.is_null() {
        return None;
    }
    match v.payload() {
        Some(Payload::Bool(b)) => Some(SortValue::Bool(*b)),
        Some(Payload::I32(x)) => Some(SortValue::I32(*x)),
        Some(Payload::I64(x)) => Some(SortValue::I64(*x)),
        Some(Payload::Int96(x)) => Some(SortValue::Int96(*x)),
        Some(Payload::F32(x)) => Some(SortValue::F32(*x)),
        Some(Payload::F64(x)) => Some(SortValue::F64(*x)),
        Some(Payload::Bytes(b)) => Some(SortValue::Bytes(b.to_vec())),
        None => None,
    }
}

pub fn build_key(row: &Row, prefix: &[SortKey]) -> Vec<SortKeyComponent> {
    prefix
        .iter()
        .map(|sk| SortKeyComponent {
            value: value_to_sort_value(row, sk.column_index),
            descending: sk.descending,
            nulls_first: sk.nulls_first,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PhysicalType;
    use crate::value::Value;

    fn row_with_i32(column_index: usize, v: Option<i32>) -> Row<'static> {
        match v {
            Some(v) => Row::new(vec![Value::new(PhysicalType::Int32, column_index, 0, 1, Payload::I32(v))]),
            None => Row::new(vec![Value::null(PhysicalType::Int32, column_index, 0, 0)]),
        }
    }

    #[test]
    fn ascending_key_orders_smaller_value_first() {
        let prefix = [SortKey { column_index: 0, descending: false, nulls_first: false }];
        let a = build_key(&row_with_i32(0, Some(1)), &prefix);
        let b = build_key(&row_with_i32(0, Some(2)), &prefix);
        let ea = HeapEntry { key: a, source_idx: 0 };
        let eb = HeapEntry { key: b, source_idx: 1 };
        assert_eq!(ea.cmp(&eb), Ordering::Less);
    }

    #[test]
    fn descending_key_reverses_the_comparison() {
        let prefix = [SortKey { column_index: 0, descending: true, nulls_first: false }];
        let a = build_key(&row_with_i32(0, Some(1)), &prefix);
        let b = build_key(&row_with_i32(0, Some(2)), &prefix);
        let ea = HeapEntry { key: a, source_idx: 0 };
        let eb = HeapEntry { key: b, source_idx: 1 };
        assert_eq!(ea.cmp(&eb), Ordering::Greater);
    }

    #[test]
    fn nulls_first_places_null_key_before_any_value() {
        let prefix = [SortKey { column_index: 0, descending: false, nulls_first: true }];
        let null_key = build_key(&row_with_i32(0, None), &prefix);
        let value_key = build_key(&row_with_i32(0, Some(-1000)), &prefix);
        let en = HeapEntry { key: null_key, source_idx: 0 };
        let ev = HeapEntry { key: value_key, source_idx: 1 };
        assert_eq!(en.cmp(&ev), Ordering::Less);
    }

    #[test]
    fn equal_keys_break_ties_by_source_index() {
        let prefix = [SortKey { column_index: 0, descending: false, nulls_first: false }];
        let a = build_key(&row_with_i32(0, Some(5)), &prefix);
        let b = build_key(&row_with_i32(0, Some(5)), &prefix);
        let first = HeapEntry { key: a, source_idx: 0 };
        let second = HeapEntry { key: b, source_idx: 1 };
        assert_eq!(first.cmp(&second), Ordering::Less);
    }
}
