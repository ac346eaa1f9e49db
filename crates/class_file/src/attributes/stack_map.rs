/// A `stack_map_frame`. Frame kinds that encode their offset delta in the
/// frame type keep the raw type byte.
#[derive(Debug, Clone, PartialEq)]
pub enum StackMapFrame {
    /// `0..=63`
    Same { frame_type: u8 },
    /// `64..=127`
    SameLocals1StackItem {
        frame_type: u8,
        stack: VerificationTypeInfo,
    },
    /// `247`
    SameLocals1StackItemExtended {
        offset_delta: u16,
        stack: VerificationTypeInfo,
    },
    /// `248..=250`
    Chop { frame_type: u8, offset_delta: u16 },
    /// `251`
    SameExtended { offset_delta: u16 },
    /// `252..=254`, one to three locals.
    Append {
        offset_delta: u16,
        locals: Vec<VerificationTypeInfo>,
    },
    /// `255`
    Full {
        offset_delta: u16,
        locals: Vec<VerificationTypeInfo>,
        stack: Vec<VerificationTypeInfo>,
    },
}
impl StackMapFrame {
    pub const SAME_LOCALS_1_STACK_ITEM_EXTENDED: u8 = 247;
    pub const SAME_EXTENDED: u8 = 251;
    pub const FULL: u8 = 255;

    pub fn frame_type(&self) -> u8 {
        match self {
            StackMapFrame::Same { frame_type }
            | StackMapFrame::SameLocals1StackItem { frame_type, .. }
            | StackMapFrame::Chop { frame_type, .. } => *frame_type,
            StackMapFrame::SameLocals1StackItemExtended { .. } => {
                Self::SAME_LOCALS_1_STACK_ITEM_EXTENDED
            }
            StackMapFrame::SameExtended { .. } => Self::SAME_EXTENDED,
            StackMapFrame::Append { locals, .. } => {
                Self::SAME_EXTENDED.wrapping_add(locals.len() as u8)
            }
            StackMapFrame::Full { .. } => Self::FULL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationTypeInfo {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    UninitializedThis,
    Object { cpool_index: u16 },
    Uninitialized { offset: u16 },
}
impl VerificationTypeInfo {
    pub fn tag(&self) -> u8 {
        match self {
            VerificationTypeInfo::Top => 0,
            VerificationTypeInfo::Integer => 1,
            VerificationTypeInfo::Float => 2,
            VerificationTypeInfo::Double => 3,
            VerificationTypeInfo::Long => 4,
            VerificationTypeInfo::Null => 5,
            VerificationTypeInfo::UninitializedThis => 6,
            VerificationTypeInfo::Object { .. } => 7,
            VerificationTypeInfo::Uninitialized { .. } => 8,
        }
    }
}
