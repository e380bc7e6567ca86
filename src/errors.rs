use crate::ChunkTag;
use std::fmt;

/// An error that can occur when decoding a savegame
#[derive(Debug)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error(Box::new(kind))
    }

    /// Return the specific type of error
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Returns the byte offset where the error occurred (if available)
    ///
    /// Offsets are relative to the start of the uncompressed chunk stream,
    /// or to the start of the enclosing chunk for errors raised while
    /// decoding a single record.
    pub fn offset(&self) -> Option<usize> {
        self.0.offset()
    }
}

/// Specific type of error
#[derive(Debug)]
pub enum ErrorKind {
    /// An IO error while reading or decompressing the source stream
    Io(std::io::Error),

    /// Unexpected end of data
    Eof { offset: usize },

    /// A variable length integer with reserved prefix bits set
    InvalidGamma { offset: usize },

    /// The compression magic is not in the codec registry
    UnknownCompression { magic: [u8; 4] },

    /// A chunk tag was truncated (more than zero but fewer than 4 bytes left)
    MalformedTag { offset: usize },

    /// The chunk header's type nibble is outside the recognized range
    UnknownChunkType { tag: ChunkTag, header: u8 },

    /// The parsed table header consumed a different number of bytes than the
    /// chunk declared
    SchemaSizeMismatch {
        tag: ChunkTag,
        declared: usize,
        actual: usize,
    },

    /// Bytes remained after decoding a record for a tag not known to carry
    /// trailing padding
    TrailingRecordData { tag: ChunkTag, remaining: usize },

    /// Bytes remained after the terminating zero tag
    TrailingFileData { offset: usize },

    /// A table field's type nibble does not map to a known field type
    UnrecognizedFieldKind { tag: ChunkTag, raw: u8 },
}

impl ErrorKind {
    pub fn offset(&self) -> Option<usize> {
        match *self {
            ErrorKind::Eof { offset } => Some(offset),
            ErrorKind::InvalidGamma { offset } => Some(offset),
            ErrorKind::MalformedTag { offset } => Some(offset),
            ErrorKind::TrailingFileData { offset } => Some(offset),
            _ => None,
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self.0 {
            ErrorKind::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            ErrorKind::Io(ref err) => write!(f, "io error: {}", err),
            ErrorKind::Eof { offset } => {
                write!(f, "unexpected end of data (offset: {})", offset)
            }
            ErrorKind::InvalidGamma { offset } => {
                write!(f, "invalid gamma encoding (offset: {})", offset)
            }
            ErrorKind::UnknownCompression { magic } => write!(
                f,
                "unknown savegame compression: {}",
                String::from_utf8_lossy(&magic)
            ),
            ErrorKind::MalformedTag { offset } => {
                write!(f, "truncated chunk tag (offset: {})", offset)
            }
            ErrorKind::UnknownChunkType { tag, header } => {
                write!(f, "unknown chunk type for {} (header: {:#x})", tag, header)
            }
            ErrorKind::SchemaSizeMismatch {
                tag,
                declared,
                actual,
            } => write!(
                f,
                "table header size mismatch in {} (declared: {}, read: {})",
                tag, declared, actual
            ),
            ErrorKind::TrailingRecordData { tag, remaining } => {
                write!(f, "junk at end of chunk {} ({} bytes)", tag, remaining)
            }
            ErrorKind::TrailingFileData { offset } => {
                write!(f, "junk at end of file (offset: {})", offset)
            }
            ErrorKind::UnrecognizedFieldKind { tag, raw } => {
                write!(f, "unrecognized field type in {}: {:#x}", tag, raw)
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::new(ErrorKind::Io(error))
    }
}
