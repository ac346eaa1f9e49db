use std::io;

use thiserror::Error;

use crate::constant_pool;

/// Coarse classification of a [`ClassFileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid tag or opcode, bad length, inconsistent count.
    MalformedStructure,
    /// A constant pool index that is out of bounds, a placeholder slot or of the wrong kind.
    UnresolvedReference,
    /// The byte source ended in the middle of a structure.
    UnexpectedEndOfData,
    /// The byte source or sink failed for a reason other than running out of data.
    Io,
}

#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error(transparent)]
    IOError(io::Error),
    #[error("Unexpected end of data")]
    UnexpectedEndOfData,
    #[error("Invalid magic identifier: 0x{0:X}")]
    InvalidMagicIdentifier(u32),
    #[error("Invalid cp info tag: {0}")]
    InvalidCpInfoTag(u8),
    #[error("Constant pool entry #{0} occupies two slots but is the last entry")]
    WideConstantAtEndOfPool(u16),
    #[error("Invalid opcode 0x{opcode:02X} at offset {offset}")]
    InvalidOpcode { opcode: u8, offset: u32 },
    #[error("Invalid tableswitch range {low}..={high} at offset {offset}")]
    InvalidSwitchRange { low: i32, high: i32, offset: u32 },
    #[error("Negative lookupswitch pair count {count} at offset {offset}")]
    InvalidLookupSwitchCount { count: i32, offset: u32 },
    #[error("Operand {value} of {mnemonic} at offset {offset} needs a wide prefix")]
    OperandNeedsWide {
        mnemonic: &'static str,
        value: u16,
        offset: u32,
    },
    #[error("Operands of {mnemonic} at offset {offset} do not have its operand shape")]
    OperandShapeMismatch {
        mnemonic: &'static str,
        offset: u32,
    },
    #[error("Invalid element value tag: {0}")]
    InvalidElementValueTag(u8),
    #[error("Invalid type annotation target type: 0x{0:02X}")]
    InvalidTargetType(u8),
    #[error("Invalid stack map frame type: {0}")]
    InvalidStackMapFrameType(u8),
    #[error("Invalid verification type info tag: {0}")]
    InvalidVerificationTypeTag(u8),
    #[error("An append frame carries one to three locals, not {0}")]
    InvalidAppendFrame(usize),
    #[error("Attribute {name} declares {declared} bytes but {consumed} were decoded")]
    AttributeLengthMismatch {
        name: String,
        declared: u32,
        consumed: u64,
    },
    #[error("Structures nested deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("{0} does not fit: {1}")]
    ValueTooLarge(&'static str, usize),
    #[error("Invalid constant pool index: {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("Expected {0}, found {1:?}")]
    UnexpectedConstantPoolEntry(&'static str, constant_pool::CpInfo),
    #[error("Constant pool entry #{0} cannot change its slot width")]
    ConstantWidthMismatch(u16),
}

impl ClassFileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClassFileError::IOError(_) => ErrorKind::Io,
            ClassFileError::UnexpectedEndOfData => ErrorKind::UnexpectedEndOfData,
            ClassFileError::InvalidConstantPoolIndex(_)
            | ClassFileError::UnexpectedConstantPoolEntry(..) => ErrorKind::UnresolvedReference,
            _ => ErrorKind::MalformedStructure,
        }
    }

    pub fn is_end_of_data(&self) -> bool {
        self.kind() == ErrorKind::UnexpectedEndOfData
    }
}

impl From<io::Error> for ClassFileError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::UnexpectedEof => ClassFileError::UnexpectedEndOfData,
            _ => ClassFileError::IOError(error),
        }
    }
}
