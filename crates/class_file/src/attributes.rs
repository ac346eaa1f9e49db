mod annotations;
mod module;
mod stack_map;

pub use annotations::{
    Annotation, ElementValue, ElementValuePair, LocalVarTarget, TargetInfo, TypeAnnotation,
    TypePathEntry,
};
pub use module::{ModuleAttribute, ModuleExports, ModuleHash, ModuleProvides, ModuleRequires};
pub use stack_map::{StackMapFrame, VerificationTypeInfo};

use crate::{instructions::Instruction, AccessFlags, ConstantPool};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attributes(pub Vec<Attribute>);
impl Attributes {
    pub fn find_by_name(&self, name: &str, constant_pool: &ConstantPool) -> Option<&Attribute> {
        self.0
            .iter()
            .find(|a| constant_pool.has_utf8(a.attribute_name_index, name.as_bytes()))
    }

    pub fn code_attribute(&self) -> Option<&CodeAttribute> {
        self.0.iter().find_map(|a| match &a.info {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        })
    }

    pub fn code_attribute_mut(&mut self) -> Option<&mut CodeAttribute> {
        self.0.iter_mut().find_map(|a| match &mut a.info {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }
}
impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A named, length-prefixed block.
///
/// The declared length is not kept: it is recomputed from `info` on write.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub attribute_name_index: u16,
    pub info: AttributeInfo,
}
impl Attribute {
    /// The name this attribute's payload is dispatched on, if it is known.
    pub fn name(&self) -> Option<&'static str> {
        self.info.name()
    }
}

/// Payload of an attribute, selected by the attribute's name.
///
/// Names that are not recognised, and payloads that tolerant decoding could
/// not structure, are kept verbatim in [`AttributeInfo::Unknown`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeInfo {
    ConstantValue { constantvalue_index: u16 },
    Code(CodeAttribute),
    StackMapTable(Vec<StackMapFrame>),
    Exceptions(Vec<u16>),
    InnerClasses(Vec<InnerClass>),
    EnclosingMethod { class_index: u16, method_index: u16 },
    Synthetic,
    Signature { signature_index: u16 },
    SourceFile { sourcefile_index: u16 },
    SourceDebugExtension(Vec<u8>),
    LineNumberTable(Vec<LineNumber>),
    LocalVariableTable(Vec<LocalVariable>),
    /// Same layout as `LocalVariableTable`; `descriptor_index` holds the signature.
    LocalVariableTypeTable(Vec<LocalVariable>),
    Deprecated,
    RuntimeVisibleAnnotations(Vec<Annotation>),
    RuntimeInvisibleAnnotations(Vec<Annotation>),
    RuntimeVisibleParameterAnnotations(Vec<Vec<Annotation>>),
    RuntimeInvisibleParameterAnnotations(Vec<Vec<Annotation>>),
    RuntimeVisibleTypeAnnotations(Vec<TypeAnnotation>),
    RuntimeInvisibleTypeAnnotations(Vec<TypeAnnotation>),
    AnnotationDefault(ElementValue),
    BootstrapMethods(Vec<BootstrapMethod>),
    MethodParameters(Vec<MethodParameter>),
    Module(ModuleAttribute),
    ModulePackages(Vec<u16>),
    ModuleMainClass { main_class_index: u16 },
    ModuleTarget { target_platform_index: u16 },
    ModuleHashes { algorithm_index: u16, hashes: Vec<ModuleHash> },
    ModuleResolution { resolution_flags: u16 },
    NestHost { host_class_index: u16 },
    NestMembers(Vec<u16>),
    Record(Vec<RecordComponent>),
    PermittedSubclasses(Vec<u16>),
    Unknown(Vec<u8>),
}
impl AttributeInfo {
    pub fn name(&self) -> Option<&'static str> {
        Some(match self {
            AttributeInfo::ConstantValue { .. } => "ConstantValue",
            AttributeInfo::Code(_) => "Code",
            AttributeInfo::StackMapTable(_) => "StackMapTable",
            AttributeInfo::Exceptions(_) => "Exceptions",
            AttributeInfo::InnerClasses(_) => "InnerClasses",
            AttributeInfo::EnclosingMethod { .. } => "EnclosingMethod",
            AttributeInfo::Synthetic => "Synthetic",
            AttributeInfo::Signature { .. } => "Signature",
            AttributeInfo::SourceFile { .. } => "SourceFile",
            AttributeInfo::SourceDebugExtension(_) => "SourceDebugExtension",
            AttributeInfo::LineNumberTable(_) => "LineNumberTable",
            AttributeInfo::LocalVariableTable(_) => "LocalVariableTable",
            AttributeInfo::LocalVariableTypeTable(_) => "LocalVariableTypeTable",
            AttributeInfo::Deprecated => "Deprecated",
            AttributeInfo::RuntimeVisibleAnnotations(_) => "RuntimeVisibleAnnotations",
            AttributeInfo::RuntimeInvisibleAnnotations(_) => "RuntimeInvisibleAnnotations",
            AttributeInfo::RuntimeVisibleParameterAnnotations(_) => {
                "RuntimeVisibleParameterAnnotations"
            }
            AttributeInfo::RuntimeInvisibleParameterAnnotations(_) => {
                "RuntimeInvisibleParameterAnnotations"
            }
            AttributeInfo::RuntimeVisibleTypeAnnotations(_) => "RuntimeVisibleTypeAnnotations",
            AttributeInfo::RuntimeInvisibleTypeAnnotations(_) => "RuntimeInvisibleTypeAnnotations",
            AttributeInfo::AnnotationDefault(_) => "AnnotationDefault",
            AttributeInfo::BootstrapMethods(_) => "BootstrapMethods",
            AttributeInfo::MethodParameters(_) => "MethodParameters",
            AttributeInfo::Module(_) => "Module",
            AttributeInfo::ModulePackages(_) => "ModulePackages",
            AttributeInfo::ModuleMainClass { .. } => "ModuleMainClass",
            AttributeInfo::ModuleTarget { .. } => "ModuleTarget",
            AttributeInfo::ModuleHashes { .. } => "ModuleHashes",
            AttributeInfo::ModuleResolution { .. } => "ModuleResolution",
            AttributeInfo::NestHost { .. } => "NestHost",
            AttributeInfo::NestMembers(_) => "NestMembers",
            AttributeInfo::Record(_) => "Record",
            AttributeInfo::PermittedSubclasses(_) => "PermittedSubclasses",
            AttributeInfo::Unknown(_) => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Zero catches any exception.
    pub catch_type: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<Instruction>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Attributes,
}
impl CodeAttribute {
    /// Length of the code array when the instructions are laid out from offset 0.
    pub fn code_length(&self) -> u32 {
        let mut offset = 0;
        let mut wide = false;
        for instruction in &self.code {
            offset += instruction.size(offset, wide);
            wide = instruction.opcode == crate::instructions::Opcode::Wide;
        }
        offset
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InnerClass {
    pub inner_class_info_index: u16,
    pub outer_class_info_index: u16,
    pub inner_name_index: u16,
    pub inner_class_access_flags: AccessFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line_number: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapMethod {
    pub bootstrap_method_ref: u16,
    pub bootstrap_arguments: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodParameter {
    pub name_index: u16,
    pub access_flags: AccessFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordComponent {
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Attributes,
}
