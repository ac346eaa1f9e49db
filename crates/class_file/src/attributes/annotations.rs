#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub type_index: u16,
    pub element_value_pairs: Vec<ElementValuePair>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementValuePair {
    pub element_name_index: u16,
    pub value: ElementValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    /// Primitive or string constant; `tag` is one of `BCDFIJSZs`.
    Const { tag: u8, const_value_index: u16 },
    Enum {
        type_name_index: u16,
        const_name_index: u16,
    },
    Class { class_info_index: u16 },
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}
impl ElementValue {
    pub const CONST_TAGS: &'static [u8] = b"BCDFIJSZs";

    pub fn tag(&self) -> u8 {
        match self {
            ElementValue::Const { tag, .. } => *tag,
            ElementValue::Enum { .. } => b'e',
            ElementValue::Class { .. } => b'c',
            ElementValue::Annotation(_) => b'@',
            ElementValue::Array(_) => b'[',
        }
    }
}

/// A `type_annotation` structure.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnnotation {
    pub target_type: u8,
    pub target_info: TargetInfo,
    pub target_path: Vec<TypePathEntry>,
    pub annotation: Annotation,
}

/// The `target_info` union; which variant applies follows from `target_type`.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetInfo {
    /// `0x00`, `0x01`
    TypeParameter { type_parameter_index: u8 },
    /// `0x10`; `65535` means the superclass.
    Supertype { supertype_index: u16 },
    /// `0x11`, `0x12`
    TypeParameterBound {
        type_parameter_index: u8,
        bound_index: u8,
    },
    /// `0x13`, `0x14`, `0x15`
    Empty,
    /// `0x16`
    FormalParameter { formal_parameter_index: u8 },
    /// `0x17`
    Throws { throws_type_index: u16 },
    /// `0x40`, `0x41`
    LocalVar(Vec<LocalVarTarget>),
    /// `0x42`
    Catch { exception_table_index: u16 },
    /// `0x43` to `0x46`
    Offset { offset: u16 },
    /// `0x47` to `0x4B`
    TypeArgument { offset: u16, type_argument_index: u8 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVarTarget {
    pub start_pc: u16,
    pub length: u16,
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypePathEntry {
    pub type_path_kind: u8,
    pub type_argument_index: u8,
}
