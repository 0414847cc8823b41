use rev_class_file::{
    item::{file::{Stage, StagedError}, opcodes::Mnemonic},
    ClassFileError, ErrorKind,
};
use thiserror::Error;

/// An error which can occur while decompiling a class file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecompileError {
    /// The input does not start with the class file magic number.
    #[error("not a class file")]
    UnsupportedFormat,

    /// The class file is structurally malformed.
    #[error("{stage} at offset {offset}: {source}")]
    Parse {
        stage: Stage,
        offset: usize,
        #[source]
        source: ClassFileError,
    },

    /// A method body popped more values than it pushed.
    #[error("stack underflow at position {position} ({mnemonic})")]
    StackUnderflow { position: usize, mnemonic: Mnemonic },

    /// A method body refers to a malformed constant.
    #[error(transparent)]
    ClassFile(#[from] ClassFileError),
}

impl DecompileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat => ErrorKind::UnsupportedFormat,
            Self::Parse { source, .. } | Self::ClassFile(source) => source.kind(),
            Self::StackUnderflow { .. } => ErrorKind::StackUnderflow,
        }
    }
}

impl From<StagedError> for DecompileError {
    fn from(e: StagedError) -> Self {
        match e.error {
            ClassFileError::BadMagicNumber(_) => Self::UnsupportedFormat,
            source => Self::Parse {
                stage: e.stage,
                offset: e.offset,
                source,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, DecompileError>;
