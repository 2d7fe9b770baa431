//! Writer/reader configuration. Plain structs with `Default` impls; no
//! process-global state, no environment reads — the core has no external
//! service to configure itself from.

/// Per-kind default encoding selection, keyed by the struct-tag surface's
/// encoding selectors (`plain|dict|delta|split`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Plain,
    RleDictionary,
    DeltaBinaryPacked,
    ByteStreamSplit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Uncompressed,
    Snappy,
    Gzip,
    Brotli,
    Lz4,
    Zstd,
}

/// One entry of a writer's or merge's declared sort order.
#[derive(Debug, Clone)]
pub struct SortingColumn {
    pub path: Vec<String>,
    pub descending: bool,
    pub nulls_first: bool,
}

#[derive(Debug, Clone)]
pub struct WriterProperties {
    pub max_rows_per_row_group: usize,
    pub page_buffer_size: usize,
    pub write_buffer_size: usize,
    pub column_index_size_limit: usize,
    pub data_page_statistics: bool,
    pub dictionary_max_bytes: usize,
    pub default_encoding: Encoding,
    pub default_compression: Compression,
    pub sorting_columns: Vec<SortingColumn>,
}

impl Default for WriterProperties {
    fn default() -> Self {
        WriterProperties {
            max_rows_per_row_group: 1_000_000,
            page_buffer_size: 1024 * 1024,
            write_buffer_size: 1024 * 1024,
            column_index_size_limit: 64,
            data_page_statistics: true,
            dictionary_max_bytes: 1024 * 1024,
            default_encoding: Encoding::Plain,
            default_compression: Compression::Uncompressed,
            sorting_columns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReaderProperties {
    pub skip_bloom_filters: bool,
    pub skip_page_index: bool,
    pub read_buffer_size: usize,
    /// Allows the caller to override the file's own schema for assembly —
    /// the schema itself lives in `crate::schema::Schema`, so this stays a
    /// plain flag here; the override value is supplied by the caller at
    /// read time, not stored.
    pub allow_schema_override: bool,
}

impl Default for ReaderProperties {
    fn default() -> Self {
        ReaderProperties {
            skip_bloom_filters: false,
            skip_page_index: false,
            read_buffer_size: 1024 * 1024,
            allow_schema_override: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_defaults_match_the_stated_baseline() {
        let props = WriterProperties::default();
        assert_eq!(props.max_rows_per_row_group, 1_000_000);
        assert_eq!(props.default_encoding, Encoding::Plain);
        assert!(props.sorting_columns.is_empty());
    }

    #[test]
    fn reader_defaults_read_everything_by_default() {
        let props = ReaderProperties::default();
        assert!(!props.skip_bloom_filters);
        assert!(!props.skip_page_index);
    }
}
