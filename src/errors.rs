//! Error types for bit manipulation, schema building, field access and decoding.

use thiserror::Error;

/// Errors produced by [crate::bits::Bits] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitsError {
    /// Requested bit range lies outside the sequence.
    #[error("bit range {start}..{end} out of bounds for length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },
    /// Integer conversion was asked for more than 64 bits.
    #[error("cannot convert {0} bits to an integer (max 64)")]
    TooManyBits(usize),
    /// Value does not fit in the requested bit width.
    #[error("value {value:#x} does not fit in {width} bits")]
    Overflow { value: u64, width: usize },
}

/// Errors produced when building a [crate::schema::Schema] or an
/// [crate::options::OptionTable].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("duplicate field name `{0}`")]
    DuplicateField(String),
    #[error("field names must be non-empty")]
    EmptyFieldName,
    /// Unsigned integer fields are capped at 64 bits.
    #[error("uint field `{field}` is {width} bits wide (max 64)")]
    WidthTooLarge { field: String, width: usize },
    /// Default value cannot be represented in the field's declared width.
    #[error("default for field `{0}` does not fit its width")]
    BadDefault(String),
    /// One option key is a bit-prefix of a longer one; greedy decoding would
    /// never reach the longer key.
    #[error("option key {short} is a prefix of key {long}")]
    AmbiguousOptionKey { short: String, long: String },
    /// A computed width refers to a field that is not a previously declared
    /// fixed uint field.
    #[error("width of `{field}` refers to unknown or unusable field `{referenced}`")]
    UnknownWidthField { field: String, referenced: String },
}

/// Errors produced by field reads, writes, and record construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Name does not belong to the record's schema.
    #[error("unknown field `{0}`")]
    Unknown(String),
    /// Supplied value has the wrong kind for the field.
    #[error("field `{field}` expects {expected}")]
    KindMismatch { field: String, expected: &'static str },
    /// Supplied value has the right kind but the wrong bit length.
    #[error("value of {got} bits does not fit field `{field}` of {want} bits")]
    LengthMismatch { field: String, want: usize, got: usize },
    /// Integer value does not fit the field's width.
    #[error("value {value:#x} does not fit field `{field}` of {width} bits")]
    Overflow { field: String, value: u64, width: usize },
    /// A checksum hook needed the enclosing record and none was given.
    #[error("checksum requires an enclosing record")]
    MissingParent,
    #[error(transparent)]
    Bits(#[from] BitsError),
    /// Reading a keyed options field failed to decode the stored bits.
    #[error("options field could not be decoded")]
    Options(#[source] Box<DecodeError>),
}

impl From<DecodeError> for FieldError {
    fn from(err: DecodeError) -> Self {
        FieldError::Options(Box::new(err))
    }
}

/// Errors produced when decoding a record or a keyed option list from raw bits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ends before the declared fixed or variable region does.
    #[error("input ends after {have} bits, need {need}")]
    Truncated { need: usize, have: usize },
    /// No option table entry matches at this bit position.
    #[error("undecodable option at bit {at}")]
    UndecodableOption { at: usize },
    #[error(transparent)]
    Bits(#[from] BitsError),
    /// A payload dispatch or field hook failed during decoding.
    #[error(transparent)]
    Field(#[from] FieldError),
}
