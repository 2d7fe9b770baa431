//! The schema-directed shredder: any Rust value can drive the walk by
//! implementing `Shreddable`, the same way a `serde::Serialize` impl drives
//! a serializer. Structs, JSON values, sequences and maps all go through
//! the one recursive `shred_node`.

use crate::buffer::LeafSink;
use crate::error::{Error, Result, ShapeError};
use crate::level_index::LevelIndexList;
use crate::schema::{GroupLogical, GroupNode, LeafNode, Node, Repetition, Schema};

/// What a source value currently looks like to the shredder. A type
/// implements `Shreddable` once; the walk below dispatches on this without
/// caring whether the original value was a struct field, a JSON value, or
/// an element of a list.
pub enum ShredKind<'a> {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    Int96([u32; 3]),
    F32(f32),
    F64(f64),
    Bytes(&'a [u8]),
    Struct(&'a dyn StructView),
    Sequence(&'a dyn SequenceView),
    Mapping(&'a dyn MappingView),
}

pub trait Shreddable {
    /// For non-wrapped primitives marked optional, implementations may
    /// choose to report their zero value as `Null` — the shredder itself
    /// does not special-case zero.
    fn shred_kind(&self) -> ShredKind<'_>;
}

pub trait StructView {
    fn field(&self, name: &str) -> Option<&dyn Shreddable>;
}

pub trait SequenceView {
    fn len(&self) -> usize;
    fn get(&self, i: usize) -> &dyn Shreddable;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait MappingView {
    fn len(&self) -> usize;
    fn pair(&self, i: usize) -> (&dyn Shreddable, &dyn Shreddable);
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Walks `root` against `schema`, writing into `sinks` (one per
/// `schema.columns()` entry, in the same order). `row_number` is the
/// caller's running count of rows written to this row group so far — the
/// shredder has no other notion of "a new record starts here", so the row
/// boundary is encoded the same way a repeated element's index is: as the
/// top level of the `LevelIndexList` chain, since the record stream is
/// itself the outermost repetition.
pub fn shred(root: &dyn Shreddable, row_number: usize, schema: &Schema, sinks: &mut [Box<dyn LeafSink>]) -> Result<()> {
    let rep_index = LevelIndexList::new_i(row_number);
    let mut next_col = 0usize;
    match root.shred_kind() {
        ShredKind::Struct(s) => {
            let Node::Group(root_group) = schema.root() else {
                unreachable!("Schema::build always wraps the root in a synthetic group")
            };
            shred_struct_fields(s, root_group, 0, &rep_index, &mut next_col, sinks)
        }
        _ => Err(Error::Shape(ShapeError::ArrayToNonRepeatedLeaf("root value must be a struct".to_string()))),
    }
}

fn shred_node(
    value: Option<&dyn Shreddable>,
    node: &Node,
    current_def: i16,
    rep_index: &LevelIndexList,
    next_col: &mut usize,
    sinks: &mut [Box<dyn LeafSink>],
) -> Result<()> {
    match node {
        Node::Leaf(l) => shred_leaf(value, l, current_def, rep_index, next_col, sinks),
        Node::Group(g) => shred_group(value, g, current_def, rep_index, next_col, sinks),
    }
}

fn shred_leaf(
    value: Option<&dyn Shreddable>,
    l: &LeafNode,
    current_def: i16,
    rep_index: &LevelIndexList,
    next_col: &mut usize,
    sinks: &mut [Box<dyn LeafSink>],
) -> Result<()> {
    let col = *next_col;
    *next_col += 1;
    let sink = sinks[col].as_mut();
    let kind = value.map(Shreddable::shred_kind);

    match l.repetition {
        Repetition::Required => match kind {
            None | Some(ShredKind::Null) => Err(Error::Shape(ShapeError::RequiredFieldMissing(l.name.clone()))),
            Some(_) => write_scalar(sink, rep_index, value.unwrap()),
        },
        Repetition::Optional => match kind {
            None | Some(ShredKind::Null) => {
                sink.write_null(rep_index, current_def);
                Ok(())
            }
            Some(_) => write_scalar(sink, rep_index, value.unwrap()),
        },
        Repetition::Repeated => match kind {
            None | Some(ShredKind::Null) => {
                sink.write_null(rep_index, current_def);
                Ok(())
            }
            Some(ShredKind::Sequence(seq)) if seq.is_empty() => {
                sink.write_null(rep_index, current_def);
                Ok(())
            }
            Some(ShredKind::Sequence(seq)) => {
                let mut pos = rep_index.new_child();
                for i in 0..seq.len() {
                    write_scalar(sink, &pos, seq.get(i))?;
                    pos.inc();
                }
                Ok(())
            }
            // A bare scalar offered where a repeated leaf is expected auto-wraps
            // into a single-element list (mirrors the JSON bridge's coercion rule).
            Some(_) => write_scalar(sink, &rep_index.new_child(), value.unwrap()),
        },
    }
}

fn shred_group(
    value: Option<&dyn Shreddable>,
    g: &GroupNode,
    current_def: i16,
    rep_index: &LevelIndexList,
    next_col: &mut usize,
    sinks: &mut [Box<dyn LeafSink>],
) -> Result<()> {
    let kind = value.map(Shreddable::shred_kind);
    // A List/Map-lowered group has exactly one child (the always-repeated
    // `list`/`key_value` group) and its own source value IS the
    // sequence/mapping — there's no separate struct payload to look up
    // fields on at this level, unlike a plain Group.
    let is_wrapper = g.logical != GroupLogical::None;

    match g.repetition {
        Repetition::Required => match kind {
            None | Some(ShredKind::Null) => Err(Error::Shape(ShapeError::RequiredFieldMissing(g.name.clone()))),
            Some(_) if is_wrapper => shred_node(value, &g.children[0], current_def, rep_index, next_col, sinks),
            Some(ShredKind::Struct(s)) => shred_struct_fields(s, g, current_def, rep_index, next_col, sinks),
            Some(_) => Err(Error::Shape(ShapeError::ArrayToNonRepeatedLeaf(g.name.clone()))),
        },
        Repetition::Optional => match kind {
            None | Some(ShredKind::Null) => {
                emit_absent(&g.children, current_def, rep_index, next_col, sinks);
                Ok(())
            }
            Some(_) if is_wrapper => shred_node(value, &g.children[0], current_def + 1, rep_index, next_col, sinks),
            Some(ShredKind::Struct(s)) => shred_struct_fields(s, g, current_def + 1, rep_index, next_col, sinks),
            Some(_) => Err(Error::Shape(ShapeError::ArrayToNonRepeatedLeaf(g.name.clone()))),
        },
        Repetition::Repeated => shred_repeated_group(kind, g, current_def, rep_index, next_col, sinks),
    }
}

fn shred_struct_fields(
    s: &dyn StructView,
    g: &GroupNode,
    child_def: i16,
    rep_index: &LevelIndexList,
    next_col: &mut usize,
    sinks: &mut [Box<dyn LeafSink>],
) -> Result<()> {
    for child in &g.children {
        let field_value = s.field(child.name());
        shred_node(field_value, child, child_def, rep_index, next_col, sinks)?;
    }
    Ok(())
}

/// Handles both `List`-lowered groups (`g.children == [element]`) and Map's
/// `key_value` group (`g.children == [key, value]`); an empty sequence/map
/// emits exactly one null marker per descendant leaf at `current_def`,
/// distinguishing "present but empty" from "absent".
fn shred_repeated_group(
    kind: Option<ShredKind<'_>>,
    g: &GroupNode,
    current_def: i16,
    rep_index: &LevelIndexList,
    next_col: &mut usize,
    sinks: &mut [Box<dyn LeafSink>],
) -> Result<()> {
    match kind {
        None | Some(ShredKind::Null) => {
            emit_absent(&g.children, current_def, rep_index, next_col, sinks);
            Ok(())
        }
        Some(ShredKind::Sequence(seq)) => {
            if seq.is_empty() {
                emit_absent(&g.children, current_def, rep_index, next_col, sinks);
                return Ok(());
            }
            let col_before = *next_col;
            let mut pos = rep_index.new_child();
            for i in 0..seq.len() {
                *next_col = col_before;
                let elem = seq.get(i);
                if g.children.len() == 1 {
                    shred_node(Some(elem), &g.children[0], current_def + 1, &pos, next_col, sinks)?;
                } else {
                    match elem.shred_kind() {
                        ShredKind::Struct(s) => shred_struct_fields(s, g, current_def + 1, &pos, next_col, sinks)?,
                        _ => return Err(Error::Shape(ShapeError::ArrayToNonRepeatedLeaf(g.name.clone()))),
                    }
                }
                pos.inc();
            }
            Ok(())
        }
        Some(ShredKind::Mapping(map)) => {
            if map.is_empty() {
                emit_absent(&g.children, current_def, rep_index, next_col, sinks);
                return Ok(());
            }
            if g.children.len() != 2 {
                return Err(Error::Shape(ShapeError::ArrayToNonRepeatedLeaf(g.name.clone())));
            }
            let col_before = *next_col;
            let mut pos = rep_index.new_child();
            for i in 0..map.len() {
                *next_col = col_before;
                let (k, v) = map.pair(i);
                shred_node(Some(k), &g.children[0], current_def + 1, &pos, next_col, sinks)?;
                shred_node(Some(v), &g.children[1], current_def + 1, &pos, next_col, sinks)?;
                pos.inc();
            }
            Ok(())
        }
        Some(_) => Err(Error::Shape(ShapeError::ArrayToNonRepeatedLeaf(g.name.clone()))),
    }
}

/// Schema-driven null propagation with no source value backing it: used
/// when a container has already been determined absent/empty one level up.
/// Never fails — an absent ancestor makes every descendant null regardless
/// of that descendant's own required/optional flag.
fn emit_absent(children: &[Node], level: i16, rep_index: &LevelIndexList, next_col: &mut usize, sinks: &mut [Box<dyn LeafSink>]) {
    for child in children {
        emit_absent_node(child, level, rep_index, next_col, sinks);
    }
}

fn emit_absent_node(node: &Node, level: i16, rep_index: &LevelIndexList, next_col: &mut usize, sinks: &mut [Box<dyn LeafSink>]) {
    match node {
        Node::Leaf(_) => {
            let col = *next_col;
            *next_col += 1;
            sinks[col].write_null(rep_index, level);
        }
        Node::Group(g) if g.repetition.is_repeated() => {
            emit_absent(&g.children, level, &rep_index.new_child(), next_col, sinks)
        }
        Node::Group(g) => emit_absent(&g.children, level, rep_index, next_col, sinks),
    }
}

fn write_scalar(sink: &mut dyn LeafSink, rep_index: &LevelIndexList, value: &dyn Shreddable) -> Result<()> {
    match value.shred_kind() {
        ShredKind::Null => unreachable!("write_scalar called on a null value"),
        ShredKind::Bool(v) => sink.write_bool(rep_index, v),
        ShredKind::I32(v) => sink.write_i32(rep_index, v),
        ShredKind::I64(v) => sink.write_i64(rep_index, v),
        ShredKind::Int96(v) => sink.write_int96(rep_index, v),
        ShredKind::F32(v) => sink.write_f32(rep_index, v),
        ShredKind::F64(v) => sink.write_f64(rep_index, v),
        ShredKind::Bytes(v) => sink.write_bytes(rep_index, v),
        ShredKind::Struct(_) | ShredKind::Sequence(_) | ShredKind::Mapping(_) => {
            Err(Error::Shape(ShapeError::ArrayToNonRepeatedLeaf("a scalar leaf received a composite value".to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PrimitiveBuffer;
    use crate::schema::node::Repetition as Rep;
    use crate::types::{LeafType, PhysicalType};

    struct ExtraRow {
        id: i32,
    }
    impl Shreddable for ExtraRow {
        fn shred_kind(&self) -> ShredKind<'_> {
            ShredKind::Struct(self)
        }
    }
    impl StructView for ExtraRow {
        fn field(&self, name: &str) -> Option<&dyn Shreddable> {
            match name {
                "id" => Some(&self.id),
                _ => None,
            }
        }
    }

    struct Obj {
        extra: Option<ExtraRow>,
        extra_exists: bool,
    }
    impl Shreddable for Obj {
        fn shred_kind(&self) -> ShredKind<'_> {
            ShredKind::Struct(self)
        }
    }
    impl StructView for Obj {
        fn field(&self, name: &str) -> Option<&dyn Shreddable> {
            match name {
                "extra" => self.extra.as_ref().map(|e| e as &dyn Shreddable),
                "extra_exists" => Some(&self.extra_exists),
                _ => None,
            }
        }
    }
    impl Shreddable for i32 {
        fn shred_kind(&self) -> ShredKind<'_> {
            ShredKind::I32(*self)
        }
    }
    impl Shreddable for bool {
        fn shred_kind(&self) -> ShredKind<'_> {
            ShredKind::Bool(*self)
        }
    }

    fn optional_followed_by_boolean_schema() -> Schema {
        Schema::build(vec![
            Node::group(
                "extra",
                Rep::Optional,
                vec![Node::leaf("id", Rep::Required, LeafType::new(PhysicalType::Int32, None))],
            ),
            Node::leaf("extra_exists", Rep::Required, LeafType::new(PhysicalType::Boolean, None)),
        ])
        .unwrap()
    }

    #[test]
    fn optional_followed_by_boolean_regression() {
        // A null optional group must not bleed into the following required
        // boolean column.
        let schema = optional_followed_by_boolean_schema();
        let mut sinks: Vec<Box<dyn LeafSink>> = vec![Box::new(PrimitiveBuffer::<i32>::new(1, 0)), Box::new(PrimitiveBuffer::<bool>::new(0, 0))];

        let rows = vec![
            Obj { extra: Some(ExtraRow { id: 1 }), extra_exists: true },
            Obj { extra: None, extra_exists: false },
            Obj { extra: Some(ExtraRow { id: 2 }), extra_exists: true },
            Obj { extra: None, extra_exists: true },
        ];

        for (i, row) in rows.iter().enumerate() {
            shred(row, i, &schema, &mut sinks).unwrap();
        }

        assert_eq!(sinks[0].len(), 4);
        assert_eq!(sinks[1].len(), 4);
        let bool_page = sinks[1].page();
        assert_eq!(bool_page.stats.num_nulls, 0);
        let int_page = sinks[0].page();
        assert_eq!(int_page.stats.num_nulls, 2);
    }

    struct Tags {
        tags: Option<Vec<i32>>,
    }
    impl Shreddable for Tags {
        fn shred_kind(&self) -> ShredKind<'_> {
            ShredKind::Struct(self)
        }
    }
    impl StructView for Tags {
        fn field(&self, name: &str) -> Option<&dyn Shreddable> {
            match name {
                "tags" => self.tags.as_ref().map(|v| v as &dyn Shreddable),
                _ => None,
            }
        }
    }
    impl Shreddable for Vec<i32> {
        fn shred_kind(&self) -> ShredKind<'_> {
            ShredKind::Sequence(self)
        }
    }
    impl SequenceView for Vec<i32> {
        fn len(&self) -> usize {
            Vec::len(self)
        }
        fn get(&self, i: usize) -> &dyn Shreddable {
            &self[i]
        }
    }

    #[test]
    fn list_vs_empty_vs_null_are_distinguishable() {
        let element = Node::leaf("element", Rep::Required, LeafType::new(PhysicalType::Int32, None));
        let schema = Schema::build(vec![Node::list("tags", Rep::Optional, element)]).unwrap();
        assert_eq!(schema.columns().len(), 1);
        let leaf = &schema.columns()[0];
        assert_eq!(leaf.max_def, 2);
        assert_eq!(leaf.max_rep, 1);
        let mut sinks: Vec<Box<dyn LeafSink>> = vec![Box::new(PrimitiveBuffer::<i32>::new(leaf.max_def, leaf.max_rep))];

        shred(&Tags { tags: None }, 0, &schema, &mut sinks).unwrap();
        shred(&Tags { tags: Some(vec![]) }, 1, &schema, &mut sinks).unwrap();
        shred(&Tags { tags: Some(vec![1, 2]) }, 2, &schema, &mut sinks).unwrap();

        let page = sinks[0].page();
        assert_eq!(page.stats.num_values, 4); // null, empty-marker, 1, 2
        assert_eq!(page.stats.num_rows, 3);
        assert_eq!(page.def_levels.unwrap(), &[0, 1, 2, 2]);
        assert_eq!(page.rep_levels.unwrap(), &[0, 0, 0, 1]);
    }

    #[test]
    fn required_field_missing_from_a_present_struct_is_an_error() {
        let schema = optional_followed_by_boolean_schema();
        let mut sinks: Vec<Box<dyn LeafSink>> = vec![Box::new(PrimitiveBuffer::<i32>::new(1, 0)), Box::new(PrimitiveBuffer::<bool>::new(0, 0))];
        struct BadObj;
        impl Shreddable for BadObj {
            fn shred_kind(&self) -> ShredKind<'_> {
                ShredKind::Struct(self)
            }
        }
        impl StructView for BadObj {
            fn field(&self, _name: &str) -> Option<&dyn Shreddable> {
                None
            }
        }
        assert!(shred(&BadObj, 0, &schema, &mut sinks).is_err());
    }
}
