use {
    crate::field::FieldType,
    alloc::{string::String, vec::Vec},
    core::fmt,
};

/// Why a complete frame could not be taken apart.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Malformed {
    #[error("{len} bytes is shorter than the smallest possible frame")]
    TooShort { len: usize },
    #[error("header `{actual:02X?}` is not `FF FF FD 00`")]
    BadHeader { actual: [u8; 4] },
    #[error("length field says {declared} but {actual} bytes follow it")]
    LengthMismatch { declared: u16, actual: usize },
    #[error("CRC computed as `x{computed:04X}` but frame carries `x{received:04X}`")]
    Crc { computed: u16, received: u16 },
}

/// An instruction that the registry has no entry for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Unknown {
    Opcode(u8),
    Name(String),
}

impl fmt::Display for Unknown {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Opcode(byte) => write!(f, "opcode `x{byte:02X}`"),
            Self::Name(ref name) => write!(f, "`{name}`"),
        }
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] Malformed),
    #[error("unknown instruction {0}")]
    UnknownInstruction(Unknown),
    #[error("unknown field `{name}`")]
    UnknownField { name: String },
    #[error("field `{name}` is read-only")]
    NotWritable { name: &'static str },
    #[error("expected a {expected}-byte buffer but got {actual} bytes")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("status frame arrived before any instruction was seen on this connection")]
    NoPriorInstruction,
    #[error("no value given for field `{name}`")]
    MissingField { name: &'static str },
    #[error("field `{name}` holds {expected} but was given a value of the other kind")]
    WrongValueType {
        name: &'static str,
        expected: FieldType,
    },
    #[error("{value} does not fit field `{name}` ({field_type})")]
    OutOfRange {
        name: &'static str,
        value: i64,
        field_type: FieldType,
    },
    #[error("field `{name}` takes exactly {expected} bytes but was given {actual}")]
    FixedLength {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("field `{name}` needs {needed} bytes but only {remaining} remain")]
    Truncated {
        name: &'static str,
        needed: usize,
        remaining: usize,
    },
    #[error("{count} bytes left over after the last field")]
    TrailingBytes { count: usize },
    #[error("invalid software error `x{code:02X}` in status frame")]
    InvalidSoftwareError { code: u8 },
}

/// A failed decode, carrying the bytes that caused it.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{kind} (raw frame: {raw:02X?})")]
pub struct DecodeError {
    pub kind: Error,
    pub raw: Vec<u8>,
}

impl DecodeError {
    #[inline]
    pub fn new(kind: impl Into<Error>, raw: &[u8]) -> Self {
        Self {
            kind: kind.into(),
            raw: raw.to_vec(),
        }
    }

    #[inline(always)]
    pub const fn kind(&self) -> &Error {
        &self.kind
    }

    #[inline(always)]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}
