// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-6.html

use std::{convert::TryFrom, fmt};

/// Layout of the operands that follow an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandShape {
    None,
    /// One unsigned byte, or an unsigned short after `wide`.
    ImmediateByte,
    ImmediateShort,
    /// Signed 16 bit branch offset.
    Branch,
    /// Signed 32 bit branch offset.
    BranchWide,
    /// `iinc`: local variable index and signed increment, both doubled in width after `wide`.
    Increment,
    InvokeInterface,
    InvokeDynamic,
    MultiANewArray,
    TableSwitch,
    LookupSwitch,
}

macro_rules! opcodes {
    ($($name:ident = $value:literal, $mnemonic:literal, $shape:ident;)*) => {
        /// A JVM opcode.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $($name = $value,)*
        }

        impl TryFrom<u8> for Opcode {
            type Error = u8;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Opcode::$name),)*
                    _ => Err(value),
                }
            }
        }

        impl Opcode {
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$name => $mnemonic,)*
                }
            }

            pub fn shape(self) -> OperandShape {
                match self {
                    $(Opcode::$name => OperandShape::$shape,)*
                }
            }
        }
    };
}

opcodes! {
    Nop = 0x00, "nop", None;
    AConstNull = 0x01, "aconst_null", None;
    IConstM1 = 0x02, "iconst_m1", None;
    IConst0 = 0x03, "iconst_0", None;
    IConst1 = 0x04, "iconst_1", None;
    IConst2 = 0x05, "iconst_2", None;
    IConst3 = 0x06, "iconst_3", None;
    IConst4 = 0x07, "iconst_4", None;
    IConst5 = 0x08, "iconst_5", None;
    LConst0 = 0x09, "lconst_0", None;
    LConst1 = 0x0a, "lconst_1", None;
    FConst0 = 0x0b, "fconst_0", None;
    FConst1 = 0x0c, "fconst_1", None;
    FConst2 = 0x0d, "fconst_2", None;
    DConst0 = 0x0e, "dconst_0", None;
    DConst1 = 0x0f, "dconst_1", None;
    BIPush = 0x10, "bipush", ImmediateByte;
    SIPush = 0x11, "sipush", ImmediateShort;
    Ldc = 0x12, "ldc", ImmediateByte;
    LdcW = 0x13, "ldc_w", ImmediateShort;
    Ldc2W = 0x14, "ldc2_w", ImmediateShort;
    ILoad = 0x15, "iload", ImmediateByte;
    LLoad = 0x16, "lload", ImmediateByte;
    FLoad = 0x17, "fload", ImmediateByte;
    DLoad = 0x18, "dload", ImmediateByte;
    ALoad = 0x19, "aload", ImmediateByte;
    ILoad0 = 0x1a, "iload_0", None;
    ILoad1 = 0x1b, "iload_1", None;
    ILoad2 = 0x1c, "iload_2", None;
    ILoad3 = 0x1d, "iload_3", None;
    LLoad0 = 0x1e, "lload_0", None;
    LLoad1 = 0x1f, "lload_1", None;
    LLoad2 = 0x20, "lload_2", None;
    LLoad3 = 0x21, "lload_3", None;
    FLoad0 = 0x22, "fload_0", None;
    FLoad1 = 0x23, "fload_1", None;
    FLoad2 = 0x24, "fload_2", None;
    FLoad3 = 0x25, "fload_3", None;
    DLoad0 = 0x26, "dload_0", None;
    DLoad1 = 0x27, "dload_1", None;
    DLoad2 = 0x28, "dload_2", None;
    DLoad3 = 0x29, "dload_3", None;
    ALoad0 = 0x2a, "aload_0", None;
    ALoad1 = 0x2b, "aload_1", None;
    ALoad2 = 0x2c, "aload_2", None;
    ALoad3 = 0x2d, "aload_3", None;
    IALoad = 0x2e, "iaload", None;
    LALoad = 0x2f, "laload", None;
    FALoad = 0x30, "faload", None;
    DALoad = 0x31, "daload", None;
    AALoad = 0x32, "aaload", None;
    BALoad = 0x33, "baload", None;
    CALoad = 0x34, "caload", None;
    SALoad = 0x35, "saload", None;
    IStore = 0x36, "istore", ImmediateByte;
    LStore = 0x37, "lstore", ImmediateByte;
    FStore = 0x38, "fstore", ImmediateByte;
    DStore = 0x39, "dstore", ImmediateByte;
    AStore = 0x3a, "astore", ImmediateByte;
    IStore0 = 0x3b, "istore_0", None;
    IStore1 = 0x3c, "istore_1", None;
    IStore2 = 0x3d, "istore_2", None;
    IStore3 = 0x3e, "istore_3", None;
    LStore0 = 0x3f, "lstore_0", None;
    LStore1 = 0x40, "lstore_1", None;
    LStore2 = 0x41, "lstore_2", None;
    LStore3 = 0x42, "lstore_3", None;
    FStore0 = 0x43, "fstore_0", None;
    FStore1 = 0x44, "fstore_1", None;
    FStore2 = 0x45, "fstore_2", None;
    FStore3 = 0x46, "fstore_3", None;
    DStore0 = 0x47, "dstore_0", None;
    DStore1 = 0x48, "dstore_1", None;
    DStore2 = 0x49, "dstore_2", None;
    DStore3 = 0x4a, "dstore_3", None;
    AStore0 = 0x4b, "astore_0", None;
    AStore1 = 0x4c, "astore_1", None;
    AStore2 = 0x4d, "astore_2", None;
    AStore3 = 0x4e, "astore_3", None;
    IAStore = 0x4f, "iastore", None;
    LAStore = 0x50, "lastore", None;
    FAStore = 0x51, "fastore", None;
    DAStore = 0x52, "dastore", None;
    AAStore = 0x53, "aastore", None;
    BAStore = 0x54, "bastore", None;
    CAStore = 0x55, "castore", None;
    SAStore = 0x56, "sastore", None;
    Pop = 0x57, "pop", None;
    Pop2 = 0x58, "pop2", None;
    Dup = 0x59, "dup", None;
    DupX1 = 0x5a, "dup_x1", None;
    DupX2 = 0x5b, "dup_x2", None;
    Dup2 = 0x5c, "dup2", None;
    Dup2X1 = 0x5d, "dup2_x1", None;
    Dup2X2 = 0x5e, "dup2_x2", None;
    Swap = 0x5f, "swap", None;
    IAdd = 0x60, "iadd", None;
    LAdd = 0x61, "ladd", None;
    FAdd = 0x62, "fadd", None;
    DAdd = 0x63, "dadd", None;
    ISub = 0x64, "isub", None;
    LSub = 0x65, "lsub", None;
    FSub = 0x66, "fsub", None;
    DSub = 0x67, "dsub", None;
    IMul = 0x68, "imul", None;
    LMul = 0x69, "lmul", None;
    FMul = 0x6a, "fmul", None;
    DMul = 0x6b, "dmul", None;
    IDiv = 0x6c, "idiv", None;
    LDiv = 0x6d, "ldiv", None;
    FDiv = 0x6e, "fdiv", None;
    DDiv = 0x6f, "ddiv", None;
    IRem = 0x70, "irem", None;
    LRem = 0x71, "lrem", None;
    FRem = 0x72, "frem", None;
    DRem = 0x73, "drem", None;
    INeg = 0x74, "ineg", None;
    LNeg = 0x75, "lneg", None;
    FNeg = 0x76, "fneg", None;
    DNeg = 0x77, "dneg", None;
    IShl = 0x78, "ishl", None;
    LShl = 0x79, "lshl", None;
    IShr = 0x7a, "ishr", None;
    LShr = 0x7b, "lshr", None;
    IUShr = 0x7c, "iushr", None;
    LUShr = 0x7d, "lushr", None;
    IAnd = 0x7e, "iand", None;
    LAnd = 0x7f, "land", None;
    IOr = 0x80, "ior", None;
    LOr = 0x81, "lor", None;
    IXor = 0x82, "ixor", None;
    LXor = 0x83, "lxor", None;
    IInc = 0x84, "iinc", Increment;
    I2L = 0x85, "i2l", None;
    I2F = 0x86, "i2f", None;
    I2D = 0x87, "i2d", None;
    L2I = 0x88, "l2i", None;
    L2F = 0x89, "l2f", None;
    L2D = 0x8a, "l2d", None;
    F2I = 0x8b, "f2i", None;
    F2L = 0x8c, "f2l", None;
    F2D = 0x8d, "f2d", None;
    D2I = 0x8e, "d2i", None;
    D2L = 0x8f, "d2l", None;
    D2F = 0x90, "d2f", None;
    I2B = 0x91, "i2b", None;
    I2C = 0x92, "i2c", None;
    I2S = 0x93, "i2s", None;
    LCmp = 0x94, "lcmp", None;
    FCmpL = 0x95, "fcmpl", None;
    FCmpG = 0x96, "fcmpg", None;
    DCmpL = 0x97, "dcmpl", None;
    DCmpG = 0x98, "dcmpg", None;
    IfEq = 0x99, "ifeq", Branch;
    IfNe = 0x9a, "ifne", Branch;
    IfLt = 0x9b, "iflt", Branch;
    IfGe = 0x9c, "ifge", Branch;
    IfGt = 0x9d, "ifgt", Branch;
    IfLe = 0x9e, "ifle", Branch;
    IfICmpEq = 0x9f, "if_icmpeq", Branch;
    IfICmpNe = 0xa0, "if_icmpne", Branch;
    IfICmpLt = 0xa1, "if_icmplt", Branch;
    IfICmpGe = 0xa2, "if_icmpge", Branch;
    IfICmpGt = 0xa3, "if_icmpgt", Branch;
    IfICmpLe = 0xa4, "if_icmple", Branch;
    IfACmpEq = 0xa5, "if_acmpeq", Branch;
    IfACmpNe = 0xa6, "if_acmpne", Branch;
    Goto = 0xa7, "goto", Branch;
    Jsr = 0xa8, "jsr", Branch;
    Ret = 0xa9, "ret", ImmediateByte;
    TableSwitch = 0xaa, "tableswitch", TableSwitch;
    LookupSwitch = 0xab, "lookupswitch", LookupSwitch;
    IReturn = 0xac, "ireturn", None;
    LReturn = 0xad, "lreturn", None;
    FReturn = 0xae, "freturn", None;
    DReturn = 0xaf, "dreturn", None;
    AReturn = 0xb0, "areturn", None;
    Return = 0xb1, "return", None;
    GetStatic = 0xb2, "getstatic", ImmediateShort;
    PutStatic = 0xb3, "putstatic", ImmediateShort;
    GetField = 0xb4, "getfield", ImmediateShort;
    PutField = 0xb5, "putfield", ImmediateShort;
    InvokeVirtual = 0xb6, "invokevirtual", ImmediateShort;
    InvokeSpecial = 0xb7, "invokespecial", ImmediateShort;
    InvokeStatic = 0xb8, "invokestatic", ImmediateShort;
    InvokeInterface = 0xb9, "invokeinterface", InvokeInterface;
    InvokeDynamic = 0xba, "invokedynamic", InvokeDynamic;
    New = 0xbb, "new", ImmediateShort;
    NewArray = 0xbc, "newarray", ImmediateByte;
    ANewArray = 0xbd, "anewarray", ImmediateShort;
    ArrayLength = 0xbe, "arraylength", None;
    AThrow = 0xbf, "athrow", None;
    CheckCast = 0xc0, "checkcast", ImmediateShort;
    InstanceOf = 0xc1, "instanceof", ImmediateShort;
    MonitorEnter = 0xc2, "monitorenter", None;
    MonitorExit = 0xc3, "monitorexit", None;
    Wide = 0xc4, "wide", None;
    MultiANewArray = 0xc5, "multianewarray", MultiANewArray;
    IfNull = 0xc6, "ifnull", Branch;
    IfNonNull = 0xc7, "ifnonnull", Branch;
    GotoW = 0xc8, "goto_w", BranchWide;
    JsrW = 0xc9, "jsr_w", BranchWide;
    Breakpoint = 0xca, "breakpoint", None;
    ImpDep1 = 0xfe, "impdep1", None;
    ImpDep2 = 0xff, "impdep2", None;
}

impl Opcode {
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Link to the instruction's entry in the JVM instruction set reference.
    ///
    /// Reserved opcodes are not documented there.
    pub fn doc_url(self) -> Option<String> {
        if matches!(self, Opcode::Breakpoint | Opcode::ImpDep1 | Opcode::ImpDep2) {
            return None;
        }

        Some(format!(
            "https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-6.html#jvms-6.5.{}",
            doc_anchor(self.mnemonic())
        ))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

// Families like iload_<n>, iconst_<i> and if<cond> share one entry.
fn doc_anchor(mnemonic: &str) -> String {
    const CONDITIONS: [&str; 6] = ["eq", "ne", "lt", "ge", "gt", "le"];
    for family in ["if_icmp", "if_acmp", "if"] {
        if let Some(condition) = mnemonic.strip_prefix(family) {
            if CONDITIONS.contains(&condition) {
                return format!("{family}_cond");
            }
        }
    }

    let Some((family, suffix)) = mnemonic.rsplit_once('_') else {
        return mnemonic.to_owned();
    };
    if !matches!(suffix, "m1" | "0" | "1" | "2" | "3" | "4" | "5") {
        return mnemonic.to_owned();
    }

    let placeholder = match family {
        "iconst" => "i",
        "lconst" => "l",
        "fconst" => "f",
        "dconst" => "d",
        _ => "n",
    };
    format!("{family}_{placeholder}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_map_every_defined_byte_to_its_opcode() {
        let defined = (0..=255u8)
            .filter(|b| Opcode::try_from(*b).is_ok())
            .count();

        assert_eq!(defined, 0xcb + 2);
        assert_eq!(Opcode::try_from(0xb7), Ok(Opcode::InvokeSpecial));
        assert_eq!(Opcode::try_from(0xcb), Err(0xcb));
    }

    #[test]
    fn it_should_round_trip_the_opcode_byte() {
        for b in 0..=255u8 {
            if let Ok(opcode) = Opcode::try_from(b) {
                assert_eq!(opcode.value(), b);
            }
        }
    }

    #[test]
    fn it_should_link_to_the_family_entry() {
        assert_eq!(
            Opcode::ILoad2.doc_url().unwrap(),
            "https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-6.html#jvms-6.5.iload_n"
        );
        assert!(Opcode::IConstM1.doc_url().unwrap().ends_with("iconst_i"));
        assert!(Opcode::DupX1.doc_url().unwrap().ends_with("dup_x1"));
        assert_eq!(Opcode::ImpDep1.doc_url(), None);
    }

    #[test]
    fn it_should_link_conditional_branches_to_their_family() {
        assert!(Opcode::IfEq.doc_url().unwrap().ends_with("#jvms-6.5.if_cond"));
        assert!(Opcode::IfLe.doc_url().unwrap().ends_with("#jvms-6.5.if_cond"));
        assert!(Opcode::IfICmpEq.doc_url().unwrap().ends_with("#jvms-6.5.if_icmp_cond"));
        assert!(Opcode::IfACmpNe.doc_url().unwrap().ends_with("#jvms-6.5.if_acmp_cond"));
        assert!(Opcode::IfNull.doc_url().unwrap().ends_with("#jvms-6.5.ifnull"));
        assert!(Opcode::IfNonNull.doc_url().unwrap().ends_with("#jvms-6.5.ifnonnull"));
    }
}
