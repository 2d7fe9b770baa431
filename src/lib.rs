//! Core of a columnar (Parquet-shaped) file format: schema, shredding and
//! assembly, column buffers, the JSON bridge and the row-group merge
//! engine. The wire codec (compression, encodings, the Thrift footer) is
//! deliberately out of scope; [`codec::Codec`] is the seam a caller plugs
//! an on-disk implementation into.

pub mod assemble;
pub mod buffer;
pub mod codec;
pub mod config;
pub mod convert;
pub mod error;
pub mod index;
pub mod json;
pub mod level_index;
pub mod merge;
pub mod pool;
pub mod schema;
pub mod shred;
pub mod types;
pub mod value;

pub use assemble::{assemble_row, LeafCursor};
pub use buffer::{LeafSink, Page, PageValues, PageStats};
pub use config::{Compression, Encoding, ReaderProperties, SortingColumn, WriterProperties};
pub use convert::Conversion;
pub use error::{Error, Result};
pub use json::{parse as parse_json, shred_json, to_json_string, JsonValue};
pub use merge::{build as build_merge, ChunkSource, MergeConfig, MergedReader, Source as MergeSource};
pub use schema::{GroupLogical, GroupNode, LeafInfo, LeafNode, Node, Repetition, Schema};
pub use shred::{shred, MappingView, Shreddable, SequenceView, ShredKind, StructView};
pub use types::{LeafType, LogicalType, PhysicalType, Scalar, TimeUnit};
pub use value::{Payload, Row, Value};
