//! Errors produced while decoding or encoding a module.
//!
//! Every decode failure carries the byte offset at which it was detected. For
//! lazily decoded function bodies the offset is relative to the start of the
//! body.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEndOfInput { offset: usize },

    #[error("malformed LEB128 integer at offset {offset}")]
    MalformedVarint { offset: usize },

    #[error("unexpected byte 0x{found:02x} at offset {offset}, expected 0x{expected:02x}")]
    UnexpectedByte {
        offset: usize,
        expected: u8,
        found: u8,
    },

    #[error("unknown section id {id} at offset {offset}")]
    UnknownSectionKind { offset: usize, id: u8 },

    #[error("unknown opcode 0x{opcode:02x} at offset {offset}")]
    UnknownOpcode { offset: usize, opcode: u8 },

    #[error("unknown value type 0x{byte:02x} at offset {offset}")]
    UnknownValueType { offset: usize, byte: u8 },

    #[error("unknown external kind 0x{byte:02x} at offset {offset}")]
    UnknownExternalKind { offset: usize, byte: u8 },

    #[error("invalid flag 0x{byte:02x} at offset {offset}")]
    InvalidFlag { offset: usize, byte: u8 },

    #[error("section id {id} cannot follow section id {previous}")]
    SectionOrderViolation { id: u8, previous: u8 },

    #[error("section id {id} declared {declared} bytes but its contents used {consumed}")]
    SectionSizeMismatch {
        id: u8,
        declared: u32,
        consumed: u32,
    },

    #[error("{remaining} trailing bytes at offset {offset}")]
    TrailingInput { offset: usize, remaining: usize },

    #[error("{what} count {count} exceeds implementation limit {limit}")]
    LimitExceeded {
        what: &'static str,
        count: u32,
        limit: u32,
    },

    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Byte offset the error refers to, when it refers to one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::UnexpectedEndOfInput { offset }
            | Error::MalformedVarint { offset }
            | Error::UnexpectedByte { offset, .. }
            | Error::UnknownSectionKind { offset, .. }
            | Error::UnknownOpcode { offset, .. }
            | Error::UnknownValueType { offset, .. }
            | Error::UnknownExternalKind { offset, .. }
            | Error::InvalidFlag { offset, .. }
            | Error::TrailingInput { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    pub(crate) fn unsupported(what: impl Into<String>) -> Self {
        Error::UnsupportedConstruct(what.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_offset() {
        let err = Error::UnexpectedByte {
            offset: 12,
            expected: 0x0b,
            found: 0x05,
        };
        assert_eq!(
            err.to_string(),
            "unexpected byte 0x05 at offset 12, expected 0x0b"
        );
        assert_eq!(err.offset(), Some(12));
    }

    #[test]
    fn test_io_conversion() {
        let err: Error = io::Error::new(io::ErrorKind::BrokenPipe, "closed").into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.offset(), None);
    }
}
