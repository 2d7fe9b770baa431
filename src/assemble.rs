//! The assembler, the shredder's inverse. Each column keeps its own read
//! cursor over a page's def/rep streams; reassembling a
//! row means popping one cell per column and, for repeated columns,
//! continuing to pop until the next cell's repetition level signals that a
//! new row (or an enclosing repeat) has started — this is symmetric with
//! how the shredder decided when to close a list.

use std::borrow::Cow;

use crate::buffer::byte_array::ByteArrayView;
use crate::buffer::fixed_len::FixedLenView;
use crate::buffer::{Dictionary, Page, PageValues};
use crate::types::PhysicalType;
use crate::value::{Payload, Row, Value};

enum LeafValues<'a> {
    Boolean(&'a [bool]),
    Int32(&'a [i32]),
    Int64(&'a [i64]),
    Int96(&'a [[u32; 3]]),
    Float(&'a [f32]),
    Double(&'a [f64]),
    ByteArray(ByteArrayView<'a>),
    FixedLenByteArray(FixedLenView<'a>),
    DictionaryIndices(&'a [i32]),
}

impl<'a> LeafValues<'a> {
    fn len(&self) -> usize {
        match self {
            LeafValues::Boolean(v) => v.len(),
            LeafValues::Int32(v) => v.len(),
            LeafValues::Int64(v) => v.len(),
            LeafValues::Int96(v) => v.len(),
            LeafValues::Float(v) => v.len(),
            LeafValues::Double(v) => v.len(),
            LeafValues::ByteArray(v) => v.len(),
            LeafValues::FixedLenByteArray(v) => v.len(),
            LeafValues::DictionaryIndices(v) => v.len(),
        }
    }
}

/// A read cursor for exactly one leaf column (one `schema.columns()` entry).
/// Built fresh per page; pooled-buffer reuse belongs to the row-group
/// reader that owns the `Row` buffers this produces, not to the cursor
/// itself.
pub struct LeafCursor<'a> {
    kind: PhysicalType,
    column_index: usize,
    max_def: i16,
    def: Option<&'a [i16]>,
    rep: Option<&'a [i16]>,
    values: LeafValues<'a>,
    dictionary: Option<&'a Dictionary>,
    cell: usize,
    val: usize,
}

impl<'a> LeafCursor<'a> {
    pub fn new(page: &Page<'a>, kind: PhysicalType, column_index: usize, max_def: i16, dictionary: Option<&'a Dictionary>) -> Self {
        let values = match page.values {
            PageValues::Boolean(v) => LeafValues::Boolean(v),
            PageValues::Int32(v) => LeafValues::Int32(v),
            PageValues::Int64(v) => LeafValues::Int64(v),
            PageValues::Int96(v) => LeafValues::Int96(v),
            PageValues::Float(v) => LeafValues::Float(v),
            PageValues::Double(v) => LeafValues::Double(v),
            PageValues::ByteArray(v) => LeafValues::ByteArray(v),
            PageValues::FixedLenByteArray(v) => LeafValues::FixedLenByteArray(v),
            PageValues::DictionaryIndices(v) => LeafValues::DictionaryIndices(v),
        };
        LeafCursor { kind, column_index, max_def, def: page.def_levels, rep: page.rep_levels, values, dictionary, cell: 0, val: 0 }
    }

    fn len(&self) -> usize {
        self.def.map(<[i16]>::len).or_else(|| self.rep.map(<[i16]>::len)).unwrap_or_else(|| self.values.len())
    }

    pub fn has_more(&self) -> bool {
        self.cell < self.len()
    }

    fn def_at(&self, i: usize) -> i16 {
        self.def.map_or(self.max_def, |d| d[i])
    }

    fn rep_at(&self, i: usize) -> i16 {
        self.rep.map_or(0, |r| r[i])
    }

    /// The repetition level of the *next* unread cell, or `None` if this
    /// column has no more cells at all (a different kind of row boundary:
    /// end of the page rather than end of this row's repeats).
    pub fn peek_rep(&self) -> Option<i16> {
        if self.has_more() {
            Some(self.rep_at(self.cell))
        } else {
            None
        }
    }

    /// Pops one cell into a tagged `Value`. Null iff this cell's def level
    /// is below the leaf's max def.
    pub fn pop(&mut self) -> Value<'a> {
        let def = self.def_at(self.cell);
        let rep = self.rep_at(self.cell);
        self.cell += 1;
        if def < self.max_def {
            return Value::null(self.kind, self.column_index, rep, def);
        }
        let payload = self.next_payload();
        Value::new(self.kind, self.column_index, rep, def, payload)
    }

    fn next_payload(&mut self) -> Payload<'a> {
        let i = self.val;
        self.val += 1;
        match &self.values {
            LeafValues::Boolean(v) => Payload::Bool(v[i]),
            LeafValues::Int32(v) => Payload::I32(v[i]),
            LeafValues::Int64(v) => Payload::I64(v[i]),
            LeafValues::Int96(v) => Payload::Int96(v[i]),
            LeafValues::Float(v) => Payload::F32(v[i]),
            LeafValues::Double(v) => Payload::F64(v[i]),
            LeafValues::ByteArray(v) => Payload::Bytes(Cow::Borrowed(v.get(i))),
            LeafValues::FixedLenByteArray(v) => Payload::Bytes(Cow::Borrowed(v.get(i))),
            LeafValues::DictionaryIndices(idxs) => {
                let dict = self.dictionary.expect("DictionaryIndices page without a dictionary");
                let idx = idxs[i];
                match self.kind {
                    PhysicalType::Boolean => Payload::Bool(dict.get_bool(idx)),
                    PhysicalType::Int32 => Payload::I32(dict.get_i32(idx)),
                    PhysicalType::Int64 => Payload::I64(dict.get_i64(idx)),
                    PhysicalType::Int96 => Payload::Int96(dict.get_int96(idx)),
                    PhysicalType::Float => Payload::F32(dict.get_f32(idx)),
                    PhysicalType::Double => Payload::F64(dict.get_f64(idx)),
                    PhysicalType::ByteArray | PhysicalType::FixedLenByteArray(_) => Payload::Bytes(Cow::Borrowed(dict.get_bytes(idx))),
                }
            }
        }
    }
}

/// Reassembles one row from `cursors` (one per `schema.columns()` entry, in
/// the same order the shredder wrote them). Returns `None` once the first
/// column is exhausted — by construction every column has the same row
/// count, so that alone signals end of page.
pub fn assemble_row<'a>(cursors: &mut [LeafCursor<'a>]) -> Option<Row<'a>> {
    if cursors.is_empty() || !cursors[0].has_more() {
        return None;
    }
    let mut values = Vec::with_capacity(cursors.len());
    for cursor in cursors.iter_mut() {
        loop {
            values.push(cursor.pop());
            match cursor.peek_rep() {
                Some(r) if r != 0 => continue,
                _ => break,
            }
        }
    }
    Some(Row::new(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PrimitiveBuffer;
    use crate::level_index::LevelIndexList;
    use crate::schema::Node;
    use crate::schema::node::Repetition as Rep;
    use crate::shred::shred;
    use crate::types::LeafType;

    #[test]
    fn flat_required_and_optional_columns_round_trip() {
        let mut id = PrimitiveBuffer::<i32>::new(0, 0);
        let mut score = PrimitiveBuffer::<f64>::new(1, 0);
        let root = LevelIndexList::new_i(0);
        id.write_value(&root, 7).unwrap();
        score.write_null(&root, 0);
        let root2 = LevelIndexList::new_i(1);
        id.write_value(&root2, 8).unwrap();
        score.write_value(&root2, 1.5).unwrap();

        let id_page = id.page();
        let score_page = score.page();
        let mut cursors = vec![
            LeafCursor::new(&id_page, PhysicalType::Int32, 0, 0, None),
            LeafCursor::new(&score_page, PhysicalType::Double, 1, 1, None),
        ];

        let row1 = assemble_row(&mut cursors).unwrap();
        assert_eq!(row1.values[0].payload(), Some(&Payload::I32(7)));
        assert!(row1.values[1].is_null());

        let row2 = assemble_row(&mut cursors).unwrap();
        assert_eq!(row2.values[0].payload(), Some(&Payload::I32(8)));
        assert_eq!(row2.values[1].payload(), Some(&Payload::F64(1.5)));

        assert!(assemble_row(&mut cursors).is_none());
    }

    struct Tags {
        tags: Option<Vec<i32>>,
    }
    impl crate::shred::Shreddable for Tags {
        fn shred_kind(&self) -> crate::shred::ShredKind<'_> {
            crate::shred::ShredKind::Struct(self)
        }
    }
    impl crate::shred::StructView for Tags {
        fn field(&self, name: &str) -> Option<&dyn crate::shred::Shreddable> {
            match name {
                "tags" => self.tags.as_ref().map(|v| v as &dyn crate::shred::Shreddable),
                _ => None,
            }
        }
    }
    impl crate::shred::Shreddable for Vec<i32> {
        fn shred_kind(&self) -> crate::shred::ShredKind<'_> {
            crate::shred::ShredKind::Sequence(self)
        }
    }
    impl crate::shred::SequenceView for Vec<i32> {
        fn len(&self) -> usize {
            Vec::len(self)
        }
        fn get(&self, i: usize) -> &dyn crate::shred::Shreddable {
            &self[i]
        }
    }
    impl crate::shred::Shreddable for i32 {
        fn shred_kind(&self) -> crate::shred::ShredKind<'_> {
            crate::shred::ShredKind::I32(*self)
        }
    }

    #[test]
    fn repeated_leaf_collects_until_the_next_row_boundary() {
        let element = Node::leaf("element", Rep::Required, LeafType::new(PhysicalType::Int32, None));
        let schema = crate::schema::Schema::build(vec![Node::list("tags", Rep::Optional, element)]).unwrap();
        let leaf = &schema.columns()[0];
        let mut sinks: Vec<Box<dyn crate::buffer::LeafSink>> = vec![Box::new(PrimitiveBuffer::<i32>::new(leaf.max_def, leaf.max_rep))];

        shred(&Tags { tags: None }, 0, &schema, &mut sinks).unwrap();
        shred(&Tags { tags: Some(vec![]) }, 1, &schema, &mut sinks).unwrap();
        shred(&Tags { tags: Some(vec![1, 2, 3]) }, 2, &schema, &mut sinks).unwrap();

        let page = sinks[0].page();
        let mut cursors = vec![LeafCursor::new(&page, PhysicalType::Int32, 0, leaf.max_def, None)];

        let row0 = assemble_row(&mut cursors).unwrap();
        assert_eq!(row0.values.len(), 1);
        assert!(row0.values[0].is_null());

        let row1 = assemble_row(&mut cursors).unwrap();
        assert_eq!(row1.values.len(), 1);
        assert!(row1.values[0].is_null()); // present-but-empty also reads back as absent at this def level

        let row2 = assemble_row(&mut cursors).unwrap();
        assert_eq!(row2.values.len(), 3);
        assert_eq!(row2.values[0].payload(), Some(&Payload::I32(1)));
        assert_eq!(row2.values[1].payload(), Some(&Payload::I32(2)));
        assert_eq!(row2.values[2].payload(), Some(&Payload::I32(3)));

        assert!(assemble_row(&mut cursors).is_none());
    }
}
