//! Error taxonomy. Each variant family maps to one abstract category;
//! `Error` is the crate-wide error type.

pub type Result<T> = std::result::Result<T, Error>;

impl Clone for Error {
    /// Hand-written because `std::io::Error` isn't `Clone`; merge's sticky-
    /// error propagation needs to replay the same error on every read
    /// until a seek clears it.
    fn clone(&self) -> Self {
        match self {
            Error::Schema(e) => Error::Schema(e.clone()),
            Error::Type(e) => Error::Type(e.clone()),
            Error::Range(e) => Error::Range(e.clone()),
            Error::Shape(e) => Error::Shape(e.clone()),
            Error::Format(e) => Error::Format(e.clone()),
            Error::Io(e) => Error::Io(std::io::Error::new(e.kind(), e.to_string())),
            Error::SortingMismatch(s) => Error::SortingMismatch(s.clone()),
            Error::Seek(e) => Error::Seek(e.clone()),
            Error::Convert(e) => Error::Convert(e.clone()),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),

    #[error("range error: {0}")]
    Range(#[from] RangeError),

    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),

    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sorting mismatch: {0}")]
    SortingMismatch(String),

    #[error("seek error: {0}")]
    Seek(#[from] SeekError),

    #[error("convert error: {0}")]
    Convert(#[from] ConvertError),
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum SchemaError {
    #[error("undefined column: {0}")]
    UndefinedColumn(String),
    #[error("duplicate field name {name:?} in group {group:?}")]
    DuplicateName { group: String, name: String },
    #[error("invalid List shape at {0}: expected group{{list: repeated group{{element: T}}}}")]
    InvalidListShape(String),
    #[error("invalid Map shape at {0}: expected group{{key_value: repeated group{{key, value}}}}")]
    InvalidMapShape(String),
    #[error("logical type {logical:?} rejected for physical kind {physical:?} at {path}")]
    TypeRejectedForLogical {
        path: String,
        logical: String,
        physical: String,
    },
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum TypeError {
    #[error("cannot insert a {found} into a dictionary of {expected} values")]
    CrossKindDictionaryInsert { expected: String, found: String },
    #[error("fixed-length byte array of width {expected} cannot hold a value of width {found}")]
    FixedWidthMismatch { expected: usize, found: usize },
    #[error("attempted to write a non-boolean value into a Boolean column")]
    NotBoolean,
    #[error("a {write_kind} value cannot be written into a {leaf_kind} column")]
    UnsupportedWrite { leaf_kind: String, write_kind: String },
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum RangeError {
    #[error("value {value} is out of range for an unsigned width-{bits} field")]
    SignedToUnsignedOutOfRange { value: i64, bits: u8 },
    #[error("integer literal {0} does not fit the target integer type")]
    IntLiteralTooLarge(String),
    #[error("value of {found} bytes is wider than the column's fixed length of {max}")]
    ValueWiderThanFixedLength { found: usize, max: usize },
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum ShapeError {
    #[error("required field {0} is missing in the source value")]
    RequiredFieldMissing(String),
    #[error("array supplied to non-repeated leaf {0} without auto-wrap support")]
    ArrayToNonRepeatedLeaf(String),
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum FormatError {
    #[error("malformed JSON: {0}")]
    MalformedJson(String),
    #[error("malformed timestamp/date/time string {value:?}: {reason}")]
    MalformedTemporal { value: String, reason: String },
    #[error("malformed UUID string {value:?}: {reason}")]
    MalformedUuid { value: String, reason: String },
    #[error("invalid UTF-16 surrogate pair in JSON string literal")]
    InvalidUtf16Surrogate,
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum SeekError {
    #[error("backward seek to row {target} from current row {current} is not supported on a forward-only merged reader")]
    Backward { current: u64, target: u64 },
    #[error("seek target row {target} is out of range (reader has {len} rows)")]
    OutOfRange { target: u64, len: u64 },
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum ConvertError {
    #[error("column {path} cannot be converted from {from} to {to}")]
    Unconvertible {
        path: String,
        from: String,
        to: String,
    },
    #[error("target column {0} is required but absent from the source schema")]
    RequiredColumnMissing(String),
}

/// Helper used by callers building dot-joined path strings for error
/// messages.
pub fn join_path<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts.into_iter().collect::<Vec<_>>().join(".")
}
