//! Bytecode errors

use thiserror::Error;

/// Errors that can occur while decoding or encoding a module.
///
/// Any of these rejects the whole module: nothing from it may be registered.
#[derive(Debug, Error)]
pub enum BytecodeError {
    /// Magic number mismatch
    #[error("Invalid magic: expected 0x50594243, found {0:#010x}")]
    InvalidMagic(u32),

    /// Unsupported bytecode version
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),

    /// Opcode id absent from the catalog
    #[error("Unknown opcode {id} in function '{function}' at instruction {index}")]
    UnknownOpcode {
        /// Raw opcode id
        id: u32,
        /// Function containing the instruction
        function: String,
        /// Instruction index within the function
        index: usize,
    },

    /// Input ended before the module was complete
    #[error("Unexpected end of bytecode")]
    Truncated,

    /// Length-prefixed string is not valid UTF-8
    #[error("Invalid UTF-8 in string at offset {0}")]
    InvalidUtf8(u64),

    /// String too long for a u16 length prefix
    #[error("String of {0} bytes exceeds the 65535 byte limit")]
    StringTooLong(usize),

    /// Table too large for a u32 count prefix
    #[error("{count} {what} entries exceed the u32 count limit")]
    CountTooLarge {
        /// Which table overflowed
        what: &'static str,
        /// Actual number of entries
        count: usize,
    },

    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BytecodeError {
    /// Whether this is a version mismatch rather than a malformed stream
    pub fn is_version_error(&self) -> bool {
        matches!(self, Self::UnsupportedVersion(_))
    }

    /// Whether this error was caused by an opcode missing from the catalog
    pub fn is_unknown_opcode(&self) -> bool {
        matches!(self, Self::UnknownOpcode { .. })
    }

    pub(crate) fn from_read(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::Truncated
        } else {
            Self::Io(err)
        }
    }
}

/// Result type for bytecode operations
pub type Result<T> = std::result::Result<T, BytecodeError>;
