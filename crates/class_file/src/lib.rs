// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html

mod access_flags;
pub mod attributes;
mod class_file;
#[macro_use]
pub mod constant_pool;
mod error;
pub mod instructions;
pub mod io;
mod options;
mod parser;
mod writer;

use std::io::{Read, Write};

pub use self::class_file::{ClassFile, ClassMember, FieldInfo, MethodInfo, MAGIC};
pub use access_flags::AccessFlags;
pub use attributes::{Attribute, AttributeInfo, Attributes};
pub use constant_pool::{ConstantPool, CpInfo};
pub use error::{ClassFileError, ErrorKind};
pub use instructions::{Instruction, Opcode, Operands};
pub use options::{DecodeOptions, EncodeOptions, MAX_NESTING_DEPTH};
pub use parser::Parser;
pub use writer::Writer;

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;

/// Decodes a complete class file.
pub fn decode(r: impl Read) -> Result<ClassFile> {
    Parser::new(r).parse()
}

/// Decodes a class file, keeping whatever was decoded before the input ran out.
pub fn decode_tolerant(r: impl Read) -> Result<ClassFile> {
    Parser::with_options(r, DecodeOptions::tolerant()).parse()
}

pub fn decode_with_options(r: impl Read, options: DecodeOptions) -> Result<ClassFile> {
    Parser::with_options(r, options).parse()
}

/// Encodes `class_file`, deriving every count and length from the model.
pub fn encode(class_file: &ClassFile, w: impl Write) -> Result<()> {
    Writer::new(w).write(class_file)
}

pub fn encode_with_options(
    class_file: &ClassFile,
    w: impl Write,
    options: EncodeOptions,
) -> Result<()> {
    Writer::with_options(w, options).write(class_file)
}
