//! Buffered, chunked reader wrapping one merge source.

use crate::convert::Conversion;
use crate::error::Result;
use crate::value::Row;

/// Yields chunks of rows in storage order; `None` signals end of stream.
/// Implemented by the external row-group/page reader this core does not
/// provide, since the wire codec is an external collaborator.
pub trait ChunkSource<'a> {
    fn next_chunk(&mut self) -> Result<Option<Vec<Row<'a>>>>;
}

/// Wraps one `ChunkSource`, exposing a one-row-at-a-time cursor. A refill
/// only ever runs lazily, the moment the cursor actually runs past the
/// current chunk — never ahead of it — so a refill failure never discards
/// a row that was already handed to the caller.
pub struct BufferedReader<'a> {
    source: Box<dyn ChunkSource<'a> + 'a>,
    conversion: Option<Conversion>,
    chunk: Vec<Row<'a>>,
    pos: usize,
    exhausted: bool,
}

impl<'a> BufferedReader<'a> {
    pub fn new(source: Box<dyn ChunkSource<'a> + 'a>, conversion: Option<Conversion>) -> Self {
        BufferedReader { source, conversion, chunk: Vec::new(), pos: 0, exhausted: false }
    }

    /// Loads the first chunk. Must be called before `head`/`pop`.
    pub fn prime(&mut self) -> Result<()> {
        self.ensure_current()
    }

    fn ensure_current(&mut self) -> Result<()> {
        if self.pos >= self.chunk.len() && !self.exhausted {
            match self.source.next_chunk()? {
                Some(rows) => {
                    self.chunk = match &self.conversion {
                        Some(c) => rows.iter().map(|r| c.convert_row(r)).collect(),
                        None => rows,
                    };
                    self.pos = 0;
                }
                None => {
                    self.chunk.clear();
                    self.pos = 0;
                    self.exhausted = true;
                }
            }
        }
        Ok(())
    }

    /// The row the cursor is positioned at, or `None` at end of stream.
    pub fn head(&mut self) -> Result<Option<&Row<'a>>> {
        self.ensure_current()?;
        Ok(self.chunk.get(self.pos))
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.pos >= self.chunk.len()
    }

    /// Copies the head row out and advances past it.
    pub fn pop(&mut self) -> Result<Option<Row<'a>>> {
        self.ensure_current()?;
        match self.chunk.get(self.pos) {
            Some(row) => {
                let row = row.clone();
                self.pos += 1;
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    pub fn close(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PhysicalType;
    use crate::value::{Payload, Value};

    struct VecChunks {
        chunks: Vec<Vec<Row<'static>>>,
        next: usize,
    }

    impl<'a> ChunkSource<'a> for VecChunks {
        fn next_chunk(&mut self) -> Result<Option<Vec<Row<'a>>>> {
            if self.next >= self.chunks.len() {
                return Ok(None);
            }
            let chunk = self.chunks[self.next].clone();
            self.next += 1;
            Ok(Some(chunk))
        }
    }

    fn int_row(v: i32) -> Row<'static> {
        Row::new(vec![Value::new(PhysicalType::Int32, 0, 0, 0, Payload::I32(v))])
    }

    #[test]
    fn reader_surfaces_rows_across_chunk_boundaries_in_order() {
        let source = VecChunks { chunks: vec![vec![int_row(1), int_row(2)], vec![int_row(3)]], next: 0 };
        let mut reader = BufferedReader::new(Box::new(source), None);
        reader.prime().unwrap();
        let mut seen = Vec::new();
        while let Some(row) = reader.pop().unwrap() {
            match row.values[0].payload() {
                Some(Payload::I32(x)) => seen.push(*x),
                _ => panic!("expected I32"),
            }
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn exhausted_reader_reports_no_head() {
        let source = VecChunks { chunks: vec![vec![int_row(1)]], next: 0 };
        let mut reader = BufferedReader::new(Box::new(source), None);
        reader.prime().unwrap();
        reader.pop().unwrap();
        assert!(reader.head().unwrap().is_none());
        assert!(reader.is_exhausted());
    }

    #[test]
    fn refill_failure_does_not_discard_an_already_returned_row() {
        struct FailAfterOne(bool);
        impl<'a> ChunkSource<'a> for FailAfterOne {
            fn next_chunk(&mut self) -> Result<Option<Vec<Row<'a>>>> {
                if !self.0 {
                    self.0 = true;
                    Ok(Some(vec![int_row(9)]))
                } else {
                    Err(crate::error::Error::SortingMismatch("boom".to_string()))
                }
            }
        }
        let mut reader = BufferedReader::new(Box::new(FailAfterOne(false)), None);
        reader.prime().unwrap();
        let first = reader.pop().unwrap();
        assert!(first.is_some());
        assert!(reader.pop().is_err());
    }
}
