use thiserror::Error;


/// An error which can occur on deserialization of a class file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFileError {
    /// Returned when a read would go past the end of the buffer.
    #[error("read of {wanted} bytes at offset {offset} is out of bounds ({available} available)")]
    OutOfBounds {
        offset: usize,
        wanted: usize,
        available: usize,
    },

    /// Returned when a class file has a bad magic number.
    #[error("bad magic number {0:#010x}")]
    BadMagicNumber(u32),

    /// Returned when an unknown constant pool tag is found.
    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstantPoolTag { index: u16, tag: u8 },

    /// Returned when a constant pool index points nowhere, or at the
    /// unusable slot following a Long or Double.
    #[error("constant pool index {0} is not usable")]
    BadConstantPoolIndex(u16),

    /// Returned when a constant pool entry has the wrong kind.
    #[error("constant pool index {index} is not a {expected}")]
    UnexpectedConstant { index: u16, expected: &'static str },

    /// Returned when a field or method descriptor cannot be parsed.
    #[error("malformed descriptor {0:?}")]
    MalformedDescriptor(String),

    /// Returned when an unknown opcode is found.
    #[error("unknown opcode {opcode:#04x} at position {position}")]
    UnknownOpcode { position: usize, opcode: u8 },

    /// Returned when an instruction's operands run past the end of the code.
    #[error("truncated instruction at position {position}")]
    TruncatedInstruction { position: usize },

    /// Returned when `wide` modifies an opcode it cannot modify.
    #[error("opcode {opcode:#04x} cannot follow wide at position {position}")]
    BadWideOpcode { position: usize, opcode: u8 },

    /// Returned when a switch has an inverted range or a negative pair count.
    #[error("malformed switch at position {position}")]
    MalformedSwitch { position: usize },
}

/// The broad category a [ClassFileError] falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OutOfBounds,
    MalformedConstantPool,
    MalformedBytecode,
    StackUnderflow,
    UnsupportedFormat,
}

impl ClassFileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            Self::BadMagicNumber(_) => ErrorKind::UnsupportedFormat,
            Self::UnknownConstantPoolTag { .. }
            | Self::BadConstantPoolIndex(_)
            | Self::UnexpectedConstant { .. }
            | Self::MalformedDescriptor(_) => ErrorKind::MalformedConstantPool,
            Self::UnknownOpcode { .. }
            | Self::TruncatedInstruction { .. }
            | Self::BadWideOpcode { .. }
            | Self::MalformedSwitch { .. } => ErrorKind::MalformedBytecode,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClassFileError>;
