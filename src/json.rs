//! The JSON bridge. A small internal JSON value type —
//! not `serde_json::Value` — because numbers must keep their raw digits
//! (precision the target leaf decides how to spend) and because this
//! module writes straight into `LeafSink`s with leaf-type-aware coercions
//! `serde_json` has no notion of.

use std::borrow::Cow;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use uuid::Uuid;

use crate::buffer::LeafSink;
use crate::error::{Error, FormatError, Result, ShapeError};
use crate::level_index::LevelIndexList;
use crate::schema::{GroupLogical, GroupNode, LeafNode, Node, Repetition, Schema};
use crate::types::{LogicalType, PhysicalType, TimeUnit};

#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue<'a> {
    Null,
    True,
    False,
    /// Raw digits, not yet parsed — precision is the consuming leaf's call.
    Number(&'a str),
    String(Cow<'a, str>),
    Array(Vec<JsonValue<'a>>),
    /// Sorted by key at parse time so lookup is binary search, not scan.
    Object(Vec<(Cow<'a, str>, JsonValue<'a>)>),
}

impl<'a> JsonValue<'a> {
    pub fn get(&self, key: &str) -> Option<&JsonValue<'a>> {
        match self {
            JsonValue::Object(fields) => fields.binary_search_by(|(k, _)| k.as_ref().cmp(key)).ok().map(|i| &fields[i].1),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }
}

/// Parses one JSON value from `input`, ignoring anything after it (the
/// bridge is handed one document per row, not a stream).
pub fn parse(input: &str) -> Result<JsonValue<'_>> {
    let mut p = Parser { bytes: input.as_bytes(), pos: 0 };
    p.skip_ws();
    let value = p.parse_value()?;
    Ok(value)
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn skip_ws(&mut self) {
        while matches!(self.bytes.get(self.pos), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        if self.peek() == Some(b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(Error::Format(FormatError::MalformedJson(format!("expected {:?} at byte {}", b as char, self.pos))))
        }
    }

    fn literal(&mut self, lit: &str) -> Result<()> {
        let end = self.pos + lit.len();
        if self.bytes.get(self.pos..end) == Some(lit.as_bytes()) {
            self.pos = end;
            Ok(())
        } else {
            Err(Error::Format(FormatError::MalformedJson(format!("expected literal {:?} at byte {}", lit, self.pos))))
        }
    }

    fn parse_value(&mut self) -> Result<JsonValue<'a>> {
        self.skip_ws();
        match self.peek() {
            Some(b'n') => {
                self.literal("null")?;
                Ok(JsonValue::Null)
            }
            Some(b't') => {
                self.literal("true")?;
                Ok(JsonValue::True)
            }
            Some(b'f') => {
                self.literal("false")?;
                Ok(JsonValue::False)
            }
            Some(b'"') => self.parse_string().map(JsonValue::String),
            Some(b'[') => self.parse_array(),
            Some(b'{') => self.parse_object(),
            Some(c) if c == b'-' || c.is_ascii_digit() => self.parse_number(),
            _ => Err(Error::Format(FormatError::MalformedJson(format!("unexpected byte at {}", self.pos)))),
        }
    }

    fn parse_number(&mut self) -> Result<JsonValue<'a>> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let raw = std::str::from_utf8(&self.bytes[start..self.pos]).expect("input was valid utf-8 and we only consumed ASCII digits");
        Ok(JsonValue::Number(raw))
    }

    fn parse_string(&mut self) -> Result<Cow<'a, str>> {
        self.expect(b'"')?;
        let start = self.pos;
        // First pass without escapes: if we reach the closing quote having
        // seen none, the slice can be borrowed straight out of `input`.
        let mut i = self.pos;
        loop {
            match self.bytes.get(i) {
                None => return Err(Error::Format(FormatError::MalformedJson("unterminated string".to_string()))),
                Some(b'"') => {
                    let s = std::str::from_utf8(&self.bytes[start..i]).map_err(|e| Error::Format(FormatError::MalformedJson(e.to_string())))?;
                    self.pos = i + 1;
                    return Ok(Cow::Borrowed(s));
                }
                Some(b'\\') => {
                    self.pos = start;
                    return self.parse_string_with_escapes(start);
                }
                Some(_) => i += 1,
            }
        }
    }

    fn parse_string_with_escapes(&mut self, start: usize) -> Result<Cow<'a, str>> {
        let mut out = String::new();
        out.push_str(std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or(""));
        loop {
            match self.bytes.get(self.pos) {
                None => return Err(Error::Format(FormatError::MalformedJson("unterminated string".to_string()))),
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(Cow::Owned(out));
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.bytes.get(self.pos) {
                        Some(b'"') => { out.push('"'); self.pos += 1; }
                        Some(b'\\') => { out.push('\\'); self.pos += 1; }
                        Some(b'/') => { out.push('/'); self.pos += 1; }
                        Some(b'b') => { out.push('\u{8}'); self.pos += 1; }
                        Some(b'f') => { out.push('\u{c}'); self.pos += 1; }
                        Some(b'n') => { out.push('\n'); self.pos += 1; }
                        Some(b'r') => { out.push('\r'); self.pos += 1; }
                        Some(b't') => { out.push('\t'); self.pos += 1; }
                        Some(b'u') => {
                            self.pos += 1;
                            let hi = self.parse_hex4()?;
                            let ch = if (0xD800..=0xDBFF).contains(&hi) {
                                if self.bytes.get(self.pos..self.pos + 2) != Some(b"\\u") {
                                    return Err(Error::Format(FormatError::InvalidUtf16Surrogate));
                                }
                                self.pos += 2;
                                let lo = self.parse_hex4()?;
                                if !(0xDC00..=0xDFFF).contains(&lo) {
                                    return Err(Error::Format(FormatError::InvalidUtf16Surrogate));
                                }
                                let combined = 0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00);
                                char::from_u32(combined).ok_or(Error::Format(FormatError::InvalidUtf16Surrogate))?
                            } else {
                                char::from_u32(hi).ok_or(Error::Format(FormatError::InvalidUtf16Surrogate))?
                            };
                            out.push(ch);
                        }
                        _ => return Err(Error::Format(FormatError::MalformedJson("invalid escape sequence".to_string()))),
                    }
                }
                Some(&b) => {
                    let len = utf8_len(b);
                    let slice = &self.bytes[self.pos..self.pos + len];
                    out.push_str(std::str::from_utf8(slice).map_err(|e| Error::Format(FormatError::MalformedJson(e.to_string())))?);
                    self.pos += len;
                }
            }
        }
    }

    fn parse_hex4(&mut self) -> Result<u32> {
        let slice = self.bytes.get(self.pos..self.pos + 4).ok_or_else(|| Error::Format(FormatError::MalformedJson("truncated \\u escape".to_string())))?;
        let s = std::str::from_utf8(slice).map_err(|e| Error::Format(FormatError::MalformedJson(e.to_string())))?;
        let v = u32::from_str_radix(s, 16).map_err(|_| Error::Format(FormatError::MalformedJson(format!("invalid hex escape {:?}", s))))?;
        self.pos += 4;
        Ok(v)
    }

    fn parse_array(&mut self) -> Result<JsonValue<'a>> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(JsonValue::Array(items));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_ws();
                }
                Some(b']') => {
                    self.pos += 1;
                    return Ok(JsonValue::Array(items));
                }
                _ => return Err(Error::Format(FormatError::MalformedJson("expected ',' or ']' in array".to_string()))),
            }
        }
    }

    fn parse_object(&mut self) -> Result<JsonValue<'a>> {
        self.expect(b'{')?;
        let mut fields = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(JsonValue::Object(fields));
        }
        loop {
            self.skip_ws();
            let key = self.parse_string()?;
            self.skip_ws();
            self.expect(b':')?;
            let value = self.parse_value()?;
            fields.push((key, value));
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b'}') => {
                    self.pos += 1;
                    fields.sort_by(|a, b| a.0.cmp(&b.0));
                    return Ok(JsonValue::Object(fields));
                }
                _ => return Err(Error::Format(FormatError::MalformedJson("expected ',' or '}' in object".to_string()))),
            }
        }
    }
}

fn utf8_len(first_byte: u8) -> usize {
    if first_byte & 0x80 == 0 {
        1
    } else if first_byte & 0xE0 == 0xC0 {
        2
    } else if first_byte & 0xF0 == 0xE0 {
        3
    } else {
        4
    }
}

/// Renders a JSON value back to text, for the "Array/Object written into a
/// ByteArray leaf" coercion.
pub fn to_json_string(value: &JsonValue) -> String {
    let mut out = String::new();
    write_json_string(value, &mut out);
    out
}

fn write_json_string(value: &JsonValue, out: &mut String) {
    match value {
        JsonValue::Null => out.push_str("null"),
        JsonValue::True => out.push_str("true"),
        JsonValue::False => out.push_str("false"),
        JsonValue::Number(raw) => out.push_str(raw),
        JsonValue::String(s) => {
            out.push('"');
            for c in s.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                    c => out.push(c),
                }
            }
            out.push('"');
        }
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(item, out);
            }
            out.push(']');
        }
        JsonValue::Object(fields) => {
            out.push('{');
            for (i, (k, v)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(&JsonValue::String(Cow::Borrowed(k)), out);
                out.push(':');
                write_json_string(v, out);
            }
            out.push('}');
        }
    }
}

/// Entry point: shreds one JSON document into `sinks`, mirroring the
/// general shredder's structural walk but choosing each leaf write by the
/// leaf's logical type rather than a fixed scalar union, since JSON's
/// `Number`/`String` need leaf-aware coercion.
pub fn shred_json(root: &JsonValue, row_number: usize, schema: &Schema, sinks: &mut [Box<dyn LeafSink>]) -> Result<()> {
    let rep_index = LevelIndexList::new_i(row_number);
    let mut next_col = 0usize;
    let Node::Group(root_group) = schema.root() else {
        unreachable!("Schema::build always wraps the root in a synthetic group")
    };
    match root {
        JsonValue::Object(_) => json_struct_fields(root, root_group, 0, &rep_index, &mut next_col, sinks),
        _ => Err(Error::Shape(ShapeError::ArrayToNonRepeatedLeaf("root JSON value must be an object".to_string()))),
    }
}

fn json_node(value: Option<&JsonValue>, node: &Node, current_def: i16, rep_index: &LevelIndexList, next_col: &mut usize, sinks: &mut [Box<dyn LeafSink>]) -> Result<()> {
    match node {
        Node::Leaf(l) => json_leaf(value, l, current_def, rep_index, next_col, sinks),
        Node::Group(g) => json_group(value, g, current_def, rep_index, next_col, sinks),
    }
}

fn json_leaf(value: Option<&JsonValue>, l: &LeafNode, current_def: i16, rep_index: &LevelIndexList, next_col: &mut usize, sinks: &mut [Box<dyn LeafSink>]) -> Result<()> {
    let col = *next_col;
    *next_col += 1;
    let sink = sinks[col].as_mut();
    let is_absent = matches!(value, None | Some(JsonValue::Null));

    match l.repetition {
        Repetition::Required => {
            if is_absent {
                Err(Error::Shape(ShapeError::RequiredFieldMissing(l.name.clone())))
            } else {
                write_json_scalar(sink, rep_index, value.unwrap(), l)
            }
        }
        Repetition::Optional => {
            if is_absent {
                sink.write_null(rep_index, current_def);
                Ok(())
            } else {
                write_json_scalar(sink, rep_index, value.unwrap(), l)
            }
        }
        Repetition::Repeated => match value {
            None | Some(JsonValue::Null) => {
                sink.write_null(rep_index, current_def);
                Ok(())
            }
            Some(JsonValue::Array(items)) if items.is_empty() => {
                sink.write_null(rep_index, current_def);
                Ok(())
            }
            Some(JsonValue::Array(items)) => {
                let mut pos = rep_index.new_child();
                for item in items {
                    write_json_scalar(sink, &pos, item, l)?;
                    pos.inc();
                }
                Ok(())
            }
            // A bare scalar offered where a repeated leaf is expected
            // auto-wraps into a single-element list.
            Some(scalar) => write_json_scalar(sink, &rep_index.new_child(), scalar, l),
        },
    }
}

fn json_group(value: Option<&JsonValue>, g: &GroupNode, current_def: i16, rep_index: &LevelIndexList, next_col: &mut usize, sinks: &mut [Box<dyn LeafSink>]) -> Result<()> {
    let is_absent = matches!(value, None | Some(JsonValue::Null));
    let is_wrapper = g.logical != GroupLogical::None;

    match g.repetition {
        Repetition::Required => {
            if is_absent {
                Err(Error::Shape(ShapeError::RequiredFieldMissing(g.name.clone())))
            } else if is_wrapper {
                json_node(value, &g.children[0], current_def, rep_index, next_col, sinks)
            } else {
                json_struct_fields(value.unwrap(), g, current_def, rep_index, next_col, sinks)
            }
        }
        Repetition::Optional => {
            if is_absent {
                emit_absent(&g.children, current_def, rep_index, next_col, sinks);
                Ok(())
            } else if is_wrapper {
                json_node(value, &g.children[0], current_def + 1, rep_index, next_col, sinks)
            } else {
                json_struct_fields(value.unwrap(), g, current_def + 1, rep_index, next_col, sinks)
            }
        }
        Repetition::Repeated => json_repeated_group(value, g, current_def, rep_index, next_col, sinks),
    }
}

fn json_struct_fields(value: &JsonValue, g: &GroupNode, child_def: i16, rep_index: &LevelIndexList, next_col: &mut usize, sinks: &mut [Box<dyn LeafSink>]) -> Result<()> {
    for child in &g.children {
        let field_value = value.get(child.name());
        json_node(field_value, child, child_def, rep_index, next_col, sinks)?;
    }
    Ok(())
}

/// `List`-lowered groups iterate a JSON array; `key_value` (Map) groups
/// iterate a JSON object's entries, the key leaf fed each field name as a
/// JSON string.
fn json_repeated_group(value: Option<&JsonValue>, g: &GroupNode, current_def: i16, rep_index: &LevelIndexList, next_col: &mut usize, sinks: &mut [Box<dyn LeafSink>]) -> Result<()> {
    match value {
        None | Some(JsonValue::Null) => {
            emit_absent(&g.children, current_def, rep_index, next_col, sinks);
            Ok(())
        }
        Some(JsonValue::Array(items)) => {
            if items.is_empty() {
                emit_absent(&g.children, current_def, rep_index, next_col, sinks);
                return Ok(());
            }
            let col_before = *next_col;
            let mut pos = rep_index.new_child();
            for item in items {
                *next_col = col_before;
                if g.children.len() == 1 {
                    json_node(Some(item), &g.children[0], current_def + 1, &pos, next_col, sinks)?;
                } else if let JsonValue::Object(_) = item {
                    json_struct_fields(item, g, current_def + 1, &pos, next_col, sinks)?;
                } else {
                    return Err(Error::Shape(ShapeError::ArrayToNonRepeatedLeaf(g.name.clone())));
                }
                pos.inc();
            }
            Ok(())
        }
        Some(JsonValue::Object(fields)) => {
            if fields.is_empty() {
                emit_absent(&g.children, current_def, rep_index, next_col, sinks);
                return Ok(());
            }
            if g.children.len() != 2 {
                return Err(Error::Shape(ShapeError::ArrayToNonRepeatedLeaf(g.name.clone())));
            }
            let col_before = *next_col;
            let mut pos = rep_index.new_child();
            for (key, val) in fields {
                *next_col = col_before;
                let key_value = JsonValue::String(key.clone());
                json_node(Some(&key_value), &g.children[0], current_def + 1, &pos, next_col, sinks)?;
                json_node(Some(val), &g.children[1], current_def + 1, &pos, next_col, sinks)?;
                pos.inc();
            }
            Ok(())
        }
        Some(_) => Err(Error::Shape(ShapeError::ArrayToNonRepeatedLeaf(g.name.clone()))),
    }
}

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

/// The JSON-to-leaf coercion table: booleans pass straight through, numbers
/// and strings coerce by the leaf's logical annotation, and structured
/// values round-trip as their own text when the target leaf is bytes.
fn write_json_scalar(sink: &mut dyn LeafSink, rep_index: &LevelIndexList, value: &JsonValue, leaf: &LeafNode) -> Result<()> {
    let logical = leaf.leaf_type.logical_type();
    match (value, logical) {
        (JsonValue::True, _) => sink.write_bool(rep_index, true),
        (JsonValue::False, _) => sink.write_bool(rep_index, false),
        (JsonValue::Number(raw), Some(LogicalType::Timestamp { unit, .. })) => write_number_timestamp(sink, rep_index, raw, *unit),
        (JsonValue::Number(raw), Some(LogicalType::Date)) => write_number_date(sink, rep_index, raw),
        (JsonValue::Number(raw), Some(LogicalType::Time { unit, .. })) => write_number_time(sink, rep_index, raw, *unit),
        (JsonValue::Number(raw), _) => write_number_plain(sink, rep_index, raw, leaf),
        (JsonValue::String(s), Some(LogicalType::Timestamp { unit, .. })) => write_string_timestamp(sink, rep_index, s, *unit),
        (JsonValue::String(s), Some(LogicalType::Date)) => write_string_date(sink, rep_index, s),
        (JsonValue::String(s), Some(LogicalType::Time { unit, .. })) => write_string_time(sink, rep_index, s, *unit),
        (JsonValue::String(s), Some(LogicalType::Uuid)) => write_string_uuid(sink, rep_index, s),
        (JsonValue::String(s), _) => sink.write_bytes(rep_index, s.as_bytes()),
        (JsonValue::Array(_), _) | (JsonValue::Object(_), _) => sink.write_bytes(rep_index, to_json_string(value).as_bytes()),
        (JsonValue::Null, _) => unreachable!("write_json_scalar called on a null value"),
    }
}

/// Number written into a leaf with no temporal annotation: matches the
/// leaf's physical kind directly. Integers parse exactly; a value with a
/// fractional part falls back to a float parse and truncates. ByteArray
/// gets the raw digits as UTF-8; Boolean treats nonzero as true.
fn write_number_plain(sink: &mut dyn LeafSink, rep_index: &LevelIndexList, raw: &str, leaf: &LeafNode) -> Result<()> {
    match leaf.leaf_type.kind() {
        PhysicalType::Boolean => sink.write_bool(rep_index, parse_int_with_float_fallback(raw)? != 0),
        PhysicalType::Int32 => sink.write_i32(rep_index, parse_int_with_float_fallback(raw)? as i32),
        PhysicalType::Int64 => sink.write_i64(rep_index, parse_int_with_float_fallback(raw)?),
        PhysicalType::Float => sink.write_f32(rep_index, parse_float(raw)? as f32),
        PhysicalType::Double => sink.write_f64(rep_index, parse_float(raw)?),
        PhysicalType::ByteArray => sink.write_bytes(rep_index, raw.as_bytes()),
        kind => Err(Error::Type(crate::error::TypeError::UnsupportedWrite { leaf_kind: format!("{:?}", kind), write_kind: "JSON Number".to_string() })),
    }
}

fn parse_int_with_float_fallback(raw: &str) -> Result<i64> {
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(v);
    }
    parse_float(raw).map(|f| f as i64)
}

fn parse_float(raw: &str) -> Result<f64> {
    raw.parse::<f64>().map_err(|_| Error::Format(FormatError::MalformedJson(format!("{:?} is not a valid number", raw))))
}

fn malformed_temporal(value: &str, reason: impl Into<String>) -> Error {
    Error::Format(FormatError::MalformedTemporal { value: value.to_string(), reason: reason.into() })
}

const UNIX_EPOCH_DAY: i64 = 719_163; // 1970-01-01 as a proleptic-Gregorian day number

fn unit_scale(unit: TimeUnit) -> i64 {
    match unit {
        TimeUnit::Millis => 1_000,
        TimeUnit::Micros => 1_000_000,
        TimeUnit::Nanos => 1_000_000_000,
    }
}

/// UNIX seconds + fractional part, scaled to the leaf's unit.
fn write_number_timestamp(sink: &mut dyn LeafSink, rep_index: &LevelIndexList, raw: &str, unit: TimeUnit) -> Result<()> {
    let seconds = parse_float(raw)?;
    let scaled = (seconds * unit_scale(unit) as f64).round() as i64;
    sink.write_i64(rep_index, scaled)
}

fn write_string_timestamp(sink: &mut dyn LeafSink, rep_index: &LevelIndexList, s: &str, unit: TimeUnit) -> Result<()> {
    let dt = parse_rfc3339(s)?.and_utc();
    let seconds = dt.timestamp();
    let nanos = dt.timestamp_subsec_nanos() as i64;
    let scaled = match unit {
        TimeUnit::Millis => seconds * 1_000 + nanos / 1_000_000,
        TimeUnit::Micros => seconds * 1_000_000 + nanos / 1_000,
        TimeUnit::Nanos => seconds * 1_000_000_000 + nanos,
    };
    sink.write_i64(rep_index, scaled)
}

/// Accepts `2006-01-02T15:04:05[.fff]Z07:00`: an RFC-3339 instant,
/// optionally fractional, with either a `Z` or a numeric offset.
fn parse_rfc3339(s: &str) -> Result<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").map_err(|e| malformed_temporal(s, e.to_string()))
}

fn write_number_date(sink: &mut dyn LeafSink, rep_index: &LevelIndexList, raw: &str) -> Result<()> {
    let seconds = parse_float(raw)?;
    let days = (seconds / 86_400.0).floor() as i32;
    sink.write_i32(rep_index, days)
}

fn write_string_date(sink: &mut dyn LeafSink, rep_index: &LevelIndexList, s: &str) -> Result<()> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| malformed_temporal(s, e.to_string()))?;
    let days = date.num_days_from_ce() as i64 - UNIX_EPOCH_DAY;
    sink.write_i32(rep_index, days as i32)
}

/// A UUID string (canonical hyphenated form or bare 32 hex digits) written
/// into the leaf's 16 raw bytes, big-endian per RFC 4122.
fn write_string_uuid(sink: &mut dyn LeafSink, rep_index: &LevelIndexList, s: &str) -> Result<()> {
    let uuid = Uuid::parse_str(s).map_err(|e| Error::Format(FormatError::MalformedUuid { value: s.to_string(), reason: e.to_string() }))?;
    sink.write_bytes(rep_index, uuid.as_bytes())
}

fn write_number_time(sink: &mut dyn LeafSink, rep_index: &LevelIndexList, raw: &str, unit: TimeUnit) -> Result<()> {
    let seconds = parse_float(raw)?;
    let scaled = (seconds * unit_scale(unit) as f64).round() as i64;
    write_time_scaled(sink, rep_index, scaled, unit)
}

fn write_string_time(sink: &mut dyn LeafSink, rep_index: &LevelIndexList, s: &str, unit: TimeUnit) -> Result<()> {
    let time = NaiveTime::parse_from_str(s, "%H:%M:%S%.f").map_err(|e| malformed_temporal(s, e.to_string()))?;
    let nanos_since_midnight = time.num_seconds_from_midnight() as i64 * 1_000_000_000 + time.nanosecond() as i64;
    let scaled = match unit {
        TimeUnit::Millis => nanos_since_midnight / 1_000_000,
        TimeUnit::Micros => nanos_since_midnight / 1_000,
        TimeUnit::Nanos => nanos_since_midnight,
    };
    write_time_scaled(sink, rep_index, scaled, unit)
}

fn write_time_scaled(sink: &mut dyn LeafSink, rep_index: &LevelIndexList, scaled: i64, unit: TimeUnit) -> Result<()> {
    match unit {
        TimeUnit::Millis => sink.write_i32(rep_index, scaled as i32),
        TimeUnit::Micros | TimeUnit::Nanos => sink.write_i64(rep_index, scaled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PrimitiveBuffer;
    use crate::schema::node::Repetition as Rep;
    use crate::types::LeafType;

    #[test]
    fn parses_nested_object_with_array_and_sorts_keys() {
        let v = parse(r#"{"b": 2, "a": [1, 2, 3]}"#).unwrap();
        match &v {
            JsonValue::Object(fields) => {
                assert_eq!(fields[0].0.as_ref(), "a");
                assert_eq!(fields[1].0.as_ref(), "b");
            }
            _ => panic!("expected object"),
        }
        match v.get("a") {
            Some(JsonValue::Array(items)) => assert_eq!(items.len(), 3),
            _ => panic!("expected array at key a"),
        }
    }

    #[test]
    fn string_escapes_decode_correctly() {
        let v = parse(r#""line1\nline2\t\"quoted\"""#).unwrap();
        match v {
            JsonValue::String(s) => assert_eq!(s, "line1\nline2\t\"quoted\""),
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn string_without_escapes_is_borrowed_not_copied() {
        let input = r#""plain""#;
        let v = parse(input).unwrap();
        match v {
            JsonValue::String(Cow::Borrowed(_)) => {}
            _ => panic!("expected a borrowed string"),
        }
    }

    #[test]
    fn number_stays_as_raw_digits_until_a_leaf_consumes_it() {
        let v = parse("12345678901234567890").unwrap();
        assert_eq!(v, JsonValue::Number("12345678901234567890"));
    }

    #[test]
    fn json_true_token_becomes_bool_leaf() {
        let schema = Schema::build(vec![Node::leaf("active", Rep::Required, LeafType::new(PhysicalType::Boolean, None))]).unwrap();
        let mut sinks: Vec<Box<dyn LeafSink>> = vec![Box::new(PrimitiveBuffer::<bool>::new(0, 0))];
        let doc = parse(r#"{"active": true}"#).unwrap();
        shred_json(&doc, 0, &schema, &mut sinks).unwrap();
        let page = sinks[0].page();
        if let crate::buffer::PageValues::Boolean(values) = page.values {
            assert!(values[0]);
        } else {
            panic!("expected Boolean page");
        }
    }

    #[test]
    fn json_number_one_and_zero_coerce_to_bool_leaf() {
        let schema = Schema::build(vec![Node::leaf("active", Rep::Required, LeafType::new(PhysicalType::Boolean, None))]).unwrap();
        for (input, expected) in [(r#"{"active": 1}"#, true), (r#"{"active": 0}"#, false)] {
            let mut sinks: Vec<Box<dyn LeafSink>> = vec![Box::new(PrimitiveBuffer::<bool>::new(0, 0))];
            let doc = parse(input).unwrap();
            shred_json(&doc, 0, &schema, &mut sinks).unwrap();
            let page = sinks[0].page();
            match page.values {
                crate::buffer::PageValues::Boolean(values) => assert_eq!(values[0], expected),
                _ => panic!("expected Boolean page"),
            }
        }
    }

    #[test]
    fn timestamp_string_round_trips_through_rfc3339() {
        let schema = Schema::build(vec![Node::leaf(
            "ts",
            Rep::Required,
            LeafType::new(PhysicalType::Int64, Some(LogicalType::Timestamp { unit: TimeUnit::Micros, is_adjusted_to_utc: true })),
        )])
        .unwrap();
        let mut sinks: Vec<Box<dyn LeafSink>> = vec![Box::new(PrimitiveBuffer::<i64>::new(0, 0))];
        let doc = parse(r#"{"ts": "2024-01-15T10:30:00Z"}"#).unwrap();
        shred_json(&doc, 0, &schema, &mut sinks).unwrap();
        assert_eq!(sinks[0].len(), 1);
    }

    #[test]
    fn date_string_parses_to_days_since_epoch() {
        let schema = Schema::build(vec![Node::leaf("d", Rep::Required, LeafType::new(PhysicalType::Int32, Some(LogicalType::Date)))]).unwrap();
        let mut sinks: Vec<Box<dyn LeafSink>> = vec![Box::new(PrimitiveBuffer::<i32>::new(0, 0))];
        let doc = parse(r#"{"d": "1970-01-02"}"#).unwrap();
        shred_json(&doc, 0, &schema, &mut sinks).unwrap();
        let page = sinks[0].page();
        if let crate::buffer::PageValues::Int32(values) = page.values {
            assert_eq!(values[0], 1);
        } else {
            panic!("expected Int32 page");
        }
    }

    #[test]
    fn array_into_list_schema_iterates_like_the_shredder() {
        let element = Node::leaf("element", Rep::Required, LeafType::new(PhysicalType::Int32, None));
        let schema = Schema::build(vec![Node::list("tags", Rep::Optional, element)]).unwrap();
        let leaf = &schema.columns()[0];
        let mut sinks: Vec<Box<dyn LeafSink>> = vec![Box::new(PrimitiveBuffer::<i32>::new(leaf.max_def, leaf.max_rep))];
        let doc = parse(r#"{"tags": [1, 2, 3]}"#).unwrap();
        shred_json(&doc, 0, &schema, &mut sinks).unwrap();
        assert_eq!(sinks[0].len(), 3);
    }

    #[test]
    fn null_list_followed_by_a_present_list_does_not_panic_on_rep_level() {
        let element = Node::leaf("element", Rep::Required, LeafType::new(PhysicalType::Int32, None));
        let schema = Schema::build(vec![Node::list("tags", Rep::Optional, element)]).unwrap();
        let leaf = &schema.columns()[0];
        let mut sinks: Vec<Box<dyn LeafSink>> = vec![Box::new(PrimitiveBuffer::<i32>::new(leaf.max_def, leaf.max_rep))];

        let absent = parse(r#"{}"#).unwrap();
        shred_json(&absent, 0, &schema, &mut sinks).unwrap();
        let present = parse(r#"{"tags": [1, 2]}"#).unwrap();
        shred_json(&present, 1, &schema, &mut sinks).unwrap();

        assert_eq!(sinks[0].len(), 3); // one absent marker, then two elements
    }

    #[test]
    fn object_written_into_byte_array_leaf_round_trips_as_text() {
        let schema = Schema::build(vec![Node::leaf("meta", Rep::Required, LeafType::new(PhysicalType::ByteArray, Some(LogicalType::Json)))]).unwrap();
        let mut sinks: Vec<Box<dyn LeafSink>> = vec![Box::new(crate::buffer::byte_array::ByteArrayBuffer::new(0, 0))];
        let doc = parse(r#"{"meta": {"x": 1}}"#).unwrap();
        shred_json(&doc, 0, &schema, &mut sinks).unwrap();
        assert_eq!(sinks[0].len(), 1);
    }

    #[test]
    fn uuid_string_parses_to_sixteen_raw_bytes() {
        let schema =
            Schema::build(vec![Node::leaf("id", Rep::Required, LeafType::new(PhysicalType::FixedLenByteArray(16), Some(LogicalType::Uuid)))])
                .unwrap();
        let mut sinks: Vec<Box<dyn LeafSink>> = vec![Box::new(crate::buffer::fixed_len::FixedLenByteArrayBuffer::new(16, 0, 0))];
        let doc = parse(r#"{"id": "123e4567-e89b-12d3-a456-426614174000"}"#).unwrap();
        shred_json(&doc, 0, &schema, &mut sinks).unwrap();
        let page = sinks[0].page();
        if let crate::buffer::PageValues::FixedLenByteArray(view) = page.values {
            assert_eq!(view.get(0), Uuid::parse_str("123e4567-e89b-12d3-a456-426614174000").unwrap().as_bytes());
        } else {
            panic!("expected FixedLenByteArray page");
        }
    }

    #[test]
    fn malformed_uuid_string_is_rejected() {
        let schema =
            Schema::build(vec![Node::leaf("id", Rep::Required, LeafType::new(PhysicalType::FixedLenByteArray(16), Some(LogicalType::Uuid)))])
                .unwrap();
        let mut sinks: Vec<Box<dyn LeafSink>> = vec![Box::new(crate::buffer::fixed_len::FixedLenByteArrayBuffer::new(16, 0, 0))];
        let doc = parse(r#"{"id": "not-a-uuid"}"#).unwrap();
        assert!(shred_json(&doc, 0, &schema, &mut sinks).is_err());
    }
}

