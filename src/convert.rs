//! Projects a source schema's columns onto a target schema. Built once per
//! (source schema, target schema) pair and then applied per row during
//! merge.

use crate::error::{ConvertError, Error, Result};
use crate::schema::Schema;
use crate::types::{LeafType, PhysicalType};
use crate::value::{Payload, Row, Value};

#[derive(Debug, Clone, Copy)]
enum Widen {
    I32ToI64,
    /// Same physical kind, only the logical annotation differs (plain
    /// BYTE_ARRAY → UTF8 String, BYTE_ARRAY → JSON): the bytes already
    /// mean the same thing, so conversion is a relabel, not a transform.
    Reinterpret,
}

#[derive(Debug, Clone)]
enum ColumnSource {
    PassThrough { source_index: usize },
    Widen { source_index: usize, widen: Widen, target_kind: PhysicalType },
    SynthesizeNull { kind: PhysicalType, def: i16 },
}

/// A frozen column-by-column plan for converting rows shaped like `source`
/// into rows shaped like `target`. One entry per target column, in target
/// column order — column indexes on emitted values are always rewritten to
/// the target index.
#[derive(Debug, Clone)]
pub struct Conversion {
    plans: Vec<ColumnSource>,
}

impl Conversion {
    pub fn build(source: &Schema, target: &Schema) -> Result<Conversion> {
        let mut plans = Vec::with_capacity(target.columns().len());
        for t in target.columns() {
            let path: Vec<&str> = t.path.iter().map(String::as_str).collect();
            match source.lookup(&path) {
                Ok(s) if s.leaf_type.equal(&t.leaf_type) => {
                    plans.push(ColumnSource::PassThrough { source_index: s.column_index });
                }
                Ok(s) => match widen_kind(&s.leaf_type, &t.leaf_type) {
                    Some(widen) => plans.push(ColumnSource::Widen { source_index: s.column_index, widen, target_kind: t.leaf_type.kind() }),
                    None => {
                        return Err(Error::Convert(ConvertError::Unconvertible {
                            path: t.full_path(),
                            from: format!("{:?}", s.leaf_type),
                            to: format!("{:?}", t.leaf_type),
                        }))
                    }
                },
                Err(_) if t.required => return Err(Error::Convert(ConvertError::RequiredColumnMissing(t.full_path()))),
                Err(_) => plans.push(ColumnSource::SynthesizeNull { kind: t.leaf_type.kind(), def: t.max_def - 1 }),
            }
        }
        Ok(Conversion { plans })
    }

    /// Converts one source row. A source column may contribute zero, one,
    /// or many values per row (a repeated leaf does); each contributed
    /// value is carried over in order with its `column_index` rewritten.
    /// A column absent from the source always contributes exactly one
    /// synthesized null per row.
    pub fn convert_row<'a>(&self, source: &Row<'a>) -> Row<'a> {
        let mut values = Vec::with_capacity(source.values.len());
        for (target_index, plan) in self.plans.iter().enumerate() {
            match plan {
                ColumnSource::PassThrough { source_index } => {
                    for v in source.values.iter().filter(|v| v.column_index == *source_index) {
                        values.push(v.clone().with_column_index(target_index));
                    }
                }
                ColumnSource::Widen { source_index, widen, target_kind } => {
                    for v in source.values.iter().filter(|v| v.column_index == *source_index) {
                        values.push(apply_widen(v, *widen, *target_kind, target_index));
                    }
                }
                ColumnSource::SynthesizeNull { kind, def } => {
                    values.push(Value::null(*kind, target_index, 0, *def));
                }
            }
        }
        Row::new(values)
    }
}

fn widen_kind(from: &LeafType, to: &LeafType) -> Option<Widen> {
    if from.physical == PhysicalType::Int32 && to.physical == PhysicalType::Int64 {
        Some(Widen::I32ToI64)
    } else if from.physical == to.physical {
        Some(Widen::Reinterpret)
    } else {
        None
    }
}

fn apply_widen<'a>(v: &Value<'a>, widen: Widen, target_kind: PhysicalType, target_index: usize) -> Value<'a> {
    if v.is_null() {
        return Value::null(target_kind, target_index, v.rep_level, v.def_level);
    }
    match (widen, v.payload()) {
        (Widen::I32ToI64, Some(Payload::I32(x))) => Value::new(target_kind, target_index, v.rep_level, v.def_level, Payload::I64(*x as i64)),
        (Widen::Reinterpret, Some(p)) => Value::new(target_kind, target_index, v.rep_level, v.def_level, p.clone()),
        _ => unreachable!("widen kind mismatched the source value's payload"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::node::Repetition as Rep;
    use crate::schema::Node;

    fn leaf(name: &str, rep: Rep, kind: PhysicalType) -> Node {
        Node::leaf(name, rep, LeafType::new(kind, None))
    }

    #[test]
    fn reordered_fields_land_on_the_same_target_columns() {
        let source = Schema::build(vec![
            leaf("y", Rep::Required, PhysicalType::Int32),
            leaf("id", Rep::Required, PhysicalType::Int32),
            leaf("x", Rep::Required, PhysicalType::Int32),
        ])
        .unwrap();
        let target = Schema::build(vec![
            leaf("id", Rep::Required, PhysicalType::Int32),
            leaf("x", Rep::Required, PhysicalType::Int32),
            leaf("y", Rep::Required, PhysicalType::Int32),
        ])
        .unwrap();
        let conversion = Conversion::build(&source, &target).unwrap();

        let row = Row::new(vec![
            Value::new(PhysicalType::Int32, 0, 0, 0, Payload::I32(20)), // y
            Value::new(PhysicalType::Int32, 1, 0, 0, Payload::I32(1)),  // id
            Value::new(PhysicalType::Int32, 2, 0, 0, Payload::I32(10)), // x
        ]);
        let converted = conversion.convert_row(&row);
        let ids: Vec<i32> = converted.values.iter().map(|v| match v.payload() {
            Some(Payload::I32(x)) => *x,
            _ => panic!("expected I32"),
        }).collect();
        assert_eq!(ids, vec![1, 10, 20]);
        assert_eq!(converted.values[0].column_index, 0);
        assert_eq!(converted.values[2].column_index, 2);
    }

    #[test]
    fn missing_optional_column_is_synthesized_as_null_at_max_def_minus_one() {
        let source = Schema::build(vec![leaf("id", Rep::Required, PhysicalType::Int32)]).unwrap();
        let target = Schema::build(vec![
            leaf("id", Rep::Required, PhysicalType::Int32),
            leaf("z", Rep::Optional, PhysicalType::Int32),
        ])
        .unwrap();
        let conversion = Conversion::build(&source, &target).unwrap();
        let row = Row::new(vec![Value::new(PhysicalType::Int32, 0, 0, 0, Payload::I32(7))]);
        let converted = conversion.convert_row(&row);
        assert_eq!(converted.values.len(), 2);
        assert!(converted.values[1].is_null());
        assert_eq!(converted.values[1].def_level, 0); // max_def(z) == 1, so def = 0
    }

    #[test]
    fn missing_required_column_is_rejected_at_construction() {
        let source = Schema::build(vec![leaf("id", Rep::Required, PhysicalType::Int32)]).unwrap();
        let target = Schema::build(vec![
            leaf("id", Rep::Required, PhysicalType::Int32),
            leaf("z", Rep::Required, PhysicalType::Int32),
        ])
        .unwrap();
        assert!(Conversion::build(&source, &target).is_err());
    }

    #[test]
    fn int32_widens_to_int64_by_value() {
        let source = Schema::build(vec![leaf("n", Rep::Required, PhysicalType::Int32)]).unwrap();
        let target = Schema::build(vec![leaf("n", Rep::Required, PhysicalType::Int64)]).unwrap();
        let conversion = Conversion::build(&source, &target).unwrap();
        let row = Row::new(vec![Value::new(PhysicalType::Int32, 0, 0, 0, Payload::I32(42))]);
        let converted = conversion.convert_row(&row);
        assert_eq!(converted.values[0].payload(), Some(&Payload::I64(42)));
    }
}
