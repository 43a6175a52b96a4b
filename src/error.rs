use static_assertions::assert_impl_all;
use thiserror::Error;

/// The error type returned by every fallible operation in this crate.
///
/// Corresponds to the three kinds from `ihm_error_type` in `ihm_format.c`/`.h`:
/// a malformed callback value, an I/O failure, and a syntactic or structural
/// violation of the file format.
#[derive(Debug, Error)]
#[error(transparent)]
pub enum Error {
    Value(#[from] ValueError),
    FileFormat(#[from] FileFormatError),
    Io(#[from] std::io::Error),
}

impl From<std::io::ErrorKind> for Error {
    #[inline]
    fn from(kind: std::io::ErrorKind) -> Self {
        Error::Io(kind.into())
    }
}

assert_impl_all!(Error: Send, Sync);

/// An error raised by caller code from inside a row, save-frame, or finalize
/// callback.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ValueError(pub String);

impl ValueError {
    pub fn new(message: impl Into<String>) -> Self {
        ValueError(message.into())
    }
}

/// A syntactic or structural violation of mmCIF or BinaryCIF.
#[derive(Debug, Error)]
pub enum FileFormatError {
    #[error("line {line}: unterminated quoted string")]
    UnterminatedQuote { line: u64 },
    #[error("line {line}: unterminated multi-line string")]
    UnterminatedMultiline { line: u64 },
    #[error("line {line}: no period found in mmCIF variable name '{name}'")]
    MissingPeriod { line: u64, name: String },
    #[error(
        "line {line}: loop header mixes categories '{first}' and '{second}'"
    )]
    MixedLoopCategories {
        line: u64,
        first: String,
        second: String,
    },
    #[error("line {line}: loop row has {got} value(s), expected {expected}")]
    LoopArityMismatch {
        line: u64,
        got: usize,
        expected: usize,
    },
    #[error("line {line}: unexpected token where a value was expected")]
    ExpectedValue { line: u64 },
    #[error("line {line}: 'save_' frames are not properly nested")]
    UnmatchedSaveFrame { line: u64 },

    #[error("msgpack: expected {expected}, found tag byte 0x{tag:02x}")]
    UnexpectedMsgpackTag { expected: &'static str, tag: u8 },
    #[error("msgpack: unexpected end of input")]
    MsgpackEof,

    #[error("binarycif: unsupported ByteArray element type {0}")]
    UnsupportedByteArrayType(i64),
    #[error("binarycif: ByteArray input length {len} is not a multiple of element size {size}")]
    ByteArrayLengthMismatch { len: usize, size: usize },
    #[error("binarycif: IntegerPacking applied to input that is not 8- or 16-bit integers")]
    BadIntegerPackingInput,
    #[error("binarycif: {0} applied to input that is not i32")]
    BadNumericInput(&'static str),
    #[error("binarycif: RunLength input has odd length {0}")]
    OddRunLengthInput(usize),
    #[error("binarycif: RunLength count must not be negative, got {0}")]
    NegativeRunLengthCount(i32),
    #[error("binarycif: StringArray offset {offset} out of bounds for blob of length {len}")]
    StringOffsetOutOfBounds { offset: i32, len: usize },
    #[error("binarycif: StringArray index {index} out of bounds for {count} strings")]
    StringIndexOutOfBounds { index: i32, count: usize },
    #[error(
        "binarycif: column '{name}' has {got} row(s), expected {expected} to match its category"
    )]
    ColumnLengthMismatch {
        name: String,
        got: usize,
        expected: usize,
    },
    #[error("binarycif: unrecognized encoding kind '{0}'")]
    UnknownEncodingKind(String),
    #[error("binarycif: unsupported column type ({found})")]
    UnsupportedColumnType { found: &'static str },
}
