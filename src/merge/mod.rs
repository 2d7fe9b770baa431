//! K-way merge of sorted or unsorted row-group readers. Builds one
//! `Conversion` per source up front, then either concatenates
//! readers in registration order or drains them through a heap ordered by
//! a declared sorting prefix.

pub mod buffered_reader;
pub mod heap;

use std::cmp::Reverse;
use std::collections::BinaryHeap;

pub use buffered_reader::{BufferedReader, ChunkSource};
use heap::HeapEntry;

use crate::config::SortingColumn;
use crate::convert::Conversion;
use crate::error::{ConvertError, Error, Result};
use crate::schema::Schema;
use crate::value::Row;

/// One input to the merge: its schema, the columns its own chunk stream is
/// already sorted by (possibly none), and a source of row chunks.
pub struct Source<'a> {
    pub schema: Schema,
    pub sorting_columns: Vec<SortingColumn>,
    pub chunks: Box<dyn ChunkSource<'a> + 'a>,
}

#[derive(Debug, Clone, Default)]
pub struct MergeConfig {
    /// Overrides the adopted-first-source schema.
    pub target_schema: Option<Schema>,
    /// Columns the merged output must stay sorted by; empty means
    /// concatenate sources in registration order without interleaving.
    pub sorting_prefix: Vec<SortingColumn>,
}

/// One entry of `sorting_prefix`, resolved against the target schema's
/// column index.
#[derive(Debug, Clone, Copy)]
pub struct SortKey {
    pub column_index: usize,
    pub descending: bool,
    pub nulls_first: bool,
}

fn sorting_prefix_matches(source_cols: &[SortingColumn], prefix: &[SortingColumn]) -> bool {
    source_cols.len() >= prefix.len()
        && source_cols
            .iter()
            .zip(prefix.iter())
            .all(|(a, b)| a.path == b.path && a.descending == b.descending && a.nulls_first == b.nulls_first)
}

/// Builds the merged reader: adopts or validates the target schema,
/// converts every source onto it, then either concatenates or heap-merges
/// depending on whether a sorting prefix was requested.
pub fn build<'a>(mut sources: Vec<Source<'a>>, config: MergeConfig) -> Result<MergedReader<'a>> {
    if sources.is_empty() {
        let schema = config.target_schema.unwrap_or_else(|| Schema::build(Vec::new()).expect("an empty schema always builds"));
        return Ok(MergedReader::Concat(ConcatReader { schema, readers: Vec::new(), current: 0 }));
    }

    let target_schema = match &config.target_schema {
        Some(s) => s.clone(),
        None => {
            let first = &sources[0].schema;
            for other in &sources[1..] {
                if !first.equal_nodes(&other.schema) {
                    return Err(Error::Convert(ConvertError::Unconvertible {
                        path: "<schema>".to_string(),
                        from: "a merge source".to_string(),
                        to: "the first source's schema (no target_schema override was given)".to_string(),
                    }));
                }
            }
            first.clone()
        }
    };

    let mut readers = Vec::with_capacity(sources.len());
    let mut sorting_cols_per_source = Vec::with_capacity(sources.len());
    for source in sources.drain(..) {
        let needs_conversion = config.target_schema.is_some() || !source.schema.equal_nodes(&target_schema);
        let conversion = if needs_conversion { Some(Conversion::build(&source.schema, &target_schema)?) } else { None };
        sorting_cols_per_source.push(source.sorting_columns);
        readers.push(BufferedReader::new(source.chunks, conversion));
    }

    if config.sorting_prefix.is_empty() {
        tracing::debug!(sources = readers.len(), "merging without a sorting prefix, concatenating in registration order");
        for r in readers.iter_mut() {
            r.prime()?;
        }
        return Ok(MergedReader::Concat(ConcatReader { schema: target_schema, readers, current: 0 }));
    }

    for cols in &sorting_cols_per_source {
        if !sorting_prefix_matches(cols, &config.sorting_prefix) {
            return Err(Error::SortingMismatch(
                "a merge source's declared sorting columns do not carry the requested sorting prefix".to_string(),
            ));
        }
    }
    tracing::debug!(sources = readers.len(), prefix_len = config.sorting_prefix.len(), "heap-merging sorted sources");

    let prefix: Vec<SortKey> = config
        .sorting_prefix
        .iter()
        .map(|sc| {
            let path: Vec<&str> = sc.path.iter().map(String::as_str).collect();
            target_schema
                .lookup(&path)
                .map(|info| SortKey { column_index: info.column_index, descending: sc.descending, nulls_first: sc.nulls_first })
        })
        .collect::<Result<_>>()?;

    let mut merged = SortedMergeReader { schema: target_schema, readers, heap: BinaryHeap::new(), prefix, sticky: None, rows_emitted: 0 };
    for idx in 0..merged.readers.len() {
        merged.readers[idx].prime()?;
        merged.push_head(idx)?;
    }
    Ok(MergedReader::Sorted(merged))
}

pub struct ConcatReader<'a> {
    schema: Schema,
    readers: Vec<BufferedReader<'a>>,
    current: usize,
}

impl<'a> ConcatReader<'a> {
    fn next_row(&mut self) -> Result<Option<Row<'a>>> {
        while self.current < self.readers.len() {
            if let Some(row) = self.readers[self.current].pop()? {
                return Ok(Some(row));
            }
            self.current += 1;
        }
        Ok(None)
    }

    fn close(self) {
        for r in self.readers {
            r.close();
        }
    }
}

pub struct SortedMergeReader<'a> {
    schema: Schema,
    readers: Vec<BufferedReader<'a>>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
    prefix: Vec<SortKey>,
    /// Once set, every subsequent `next_row` replays the same error
    /// instead of advancing a reader that may already be in an
    /// inconsistent state.
    sticky: Option<Error>,
    rows_emitted: u64,
}

impl<'a> SortedMergeReader<'a> {
    fn push_head(&mut self, idx: usize) -> Result<()> {
        if let Some(row) = self.readers[idx].head()? {
            let key = heap::build_key(row, &self.prefix);
            self.heap.push(Reverse(HeapEntry { key, source_idx: idx }));
        }
        Ok(())
    }

    fn next_row(&mut self) -> Result<Option<Row<'a>>> {
        if let Some(err) = &self.sticky {
            return Err(err.clone());
        }
        match self.next_row_inner() {
            Ok(v) => Ok(v),
            Err(e) => {
                tracing::warn!(error = %e, rows_emitted = self.rows_emitted, "sorted merge entering sticky-error state");
                self.sticky = Some(e.clone());
                Err(e)
            }
        }
    }

    fn next_row_inner(&mut self) -> Result<Option<Row<'a>>> {
        let entry = match self.heap.pop() {
            Some(Reverse(e)) => e,
            None => return Ok(None),
        };
        let idx = entry.source_idx;
        let row = self.readers[idx].pop()?.expect("a heap entry always names a reader with a head row");
        self.rows_emitted += 1;
        // A failure refilling this reader's next head must not cost us the
        // row we already popped; defer it to the next call instead.
        if let Err(e) = self.push_head(idx) {
            tracing::warn!(error = %e, source_idx = idx, "deferred refill failure, merge entering sticky-error state");
            self.sticky = Some(e);
        }
        Ok(Some(row))
    }

    /// Forward-only: rejects any target at or before the current position.
    /// The merge has no random access into its sources, so catching up to
    /// a later row means draining and discarding rows until it's reached;
    /// a successful seek clears the sticky error.
    fn seek_to_row(&mut self, target: u64) -> Result<()> {
        if target < self.rows_emitted {
            return Err(Error::Seek(crate::error::SeekError::Backward { current: self.rows_emitted, target }));
        }
        self.sticky = None;
        while self.rows_emitted < target {
            match self.next_row_inner()? {
                Some(_) => {}
                None => {
                    return Err(Error::Seek(crate::error::SeekError::OutOfRange { target, len: self.rows_emitted }));
                }
            }
        }
        Ok(())
    }

    fn close(self) {
        for r in self.readers {
            r.close();
        }
    }
}

/// A built merge: either a straight concatenation or a sorted interleave.
pub enum MergedReader<'a> {
    Concat(ConcatReader<'a>),
    Sorted(SortedMergeReader<'a>),
}

impl<'a> MergedReader<'a> {
    pub fn schema(&self) -> &Schema {
        match self {
            MergedReader::Concat(r) => &r.schema,
            MergedReader::Sorted(r) => &r.schema,
        }
    }

    pub fn next_row(&mut self) -> Result<Option<Row<'a>>> {
        match self {
            MergedReader::Concat(r) => r.next_row(),
            MergedReader::Sorted(r) => r.next_row(),
        }
    }

    /// Only meaningful on a sorted merge; a concatenating merge has no
    /// sorting prefix to reposition within, so a seek against it fails.
    pub fn seek_to_row(&mut self, target: u64) -> Result<()> {
        match self {
            MergedReader::Concat(_) => Err(Error::Seek(crate::error::SeekError::OutOfRange { target, len: 0 })),
            MergedReader::Sorted(r) => r.seek_to_row(target),
        }
    }

    pub fn close(self) {
        match self {
            MergedReader::Concat(r) => r.close(),
            MergedReader::Sorted(r) => r.close(),
        }
    }
}
