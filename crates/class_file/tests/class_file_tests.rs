use pretty_assertions::assert_eq;

use classlib_class_file::{
    attributes::{
        Annotation, ElementValue, ElementValuePair, StackMapFrame, TargetInfo, TypeAnnotation,
        TypePathEntry,
    },
    instructions::{LookupSwitch, MatchOffsetPair, TableSwitch},
    AccessFlags, AttributeInfo, ClassFile, ClassFileError, CpInfo, DecodeOptions, Instruction,
    Opcode, Operands,
};

/// Big-endian assembler for hand-written class files.
#[derive(Default)]
struct Bytes(Vec<u8>);
impl Bytes {
    fn u8(&mut self, value: u8) -> &mut Self {
        self.0.push(value);
        self
    }

    fn u16(&mut self, value: u16) -> &mut Self {
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn u32(&mut self, value: u32) -> &mut Self {
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.extend_from_slice(bytes);
        self
    }

    fn utf8(&mut self, value: &str) -> &mut Self {
        self.u8(1).u16(value.len() as u16).raw(value.as_bytes())
    }

    fn class(&mut self, name_index: u16) -> &mut Self {
        self.u8(7).u16(name_index)
    }

    fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.0)
    }
}

/// `public class Main { }` as emitted by javac, without a line number table.
fn main_class() -> Vec<u8> {
    Bytes::default()
        .u32(0xCAFEBABE)
        .u16(0)
        .u16(52)
        .u16(12)
        .utf8("Main")
        .class(1)
        .utf8("java/lang/Object")
        .class(3)
        .utf8("<init>")
        .utf8("()V")
        .u8(12)
        .u16(5)
        .u16(6)
        .u8(10)
        .u16(4)
        .u16(7)
        .utf8("Code")
        .utf8("SourceFile")
        .utf8("Main.java")
        .u16(0x0021)
        .u16(2)
        .u16(4)
        .u16(0)
        .u16(0)
        .u16(1)
        // <init>
        .u16(0x0001)
        .u16(5)
        .u16(6)
        .u16(1)
        .u16(9)
        .u32(17)
        .u16(1)
        .u16(1)
        .u32(5)
        .raw(&[0x2a, 0xb7, 0x00, 0x08, 0xb1])
        .u16(0)
        .u16(0)
        // SourceFile
        .u16(1)
        .u16(10)
        .u32(2)
        .u16(11)
        .finish()
}

/// A class with an interface, an annotated field, a long constant, both
/// switches, `wide` locals, a stack map, a class annotation and an attribute
/// no decoder knows about.
fn my_class() -> Vec<u8> {
    #[rustfmt::skip]
    let add_code = [
        0x1b,
        0xab, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x1d,
        0x00, 0x00, 0x00, 0x02,
        0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x1b,
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x1d,
        0x0c, 0xae,
        0x0b, 0xae,
    ];
    #[rustfmt::skip]
    let widen_code = [
        0xc4, 0x15, 0x01, 0x2c,
        0xaa, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x18,
        0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x01,
        0x00, 0x00, 0x00, 0x18,
        0x00, 0x00, 0x00, 0x1a,
        0x03, 0xac,
        0x04, 0xac,
        0xb9, 0x00, 0x0b, 0x01, 0x00,
        0xba, 0x00, 0x0b, 0x00, 0x00,
        0xc4, 0x84, 0x01, 0x2c, 0x00, 0x05,
        0xac,
    ];

    Bytes::default()
        .u32(0xCAFEBABE)
        .u16(0)
        .u16(61)
        .u16(29)
        .utf8("my/MyClass")
        .class(1)
        .utf8("java/lang/Object")
        .class(3)
        .utf8("myField")
        .utf8("I")
        .utf8("<init>")
        .utf8("()V")
        .utf8("Code")
        .u8(12)
        .u16(7)
        .u16(8)
        .u8(10)
        .u16(4)
        .u16(10)
        .utf8("add")
        .utf8("(I)F")
        .utf8("SourceFile")
        .utf8("MyClass.java")
        .u8(5)
        .u32(0)
        .u32(42)
        .utf8("java/lang/Runnable")
        .class(18)
        .utf8("LineNumberTable")
        .utf8("StackMapTable")
        .utf8("Vendor")
        .utf8("RuntimeVisibleAnnotations")
        .utf8("Lmy/Marker;")
        .utf8("value")
        .utf8("RuntimeVisibleTypeAnnotations")
        .utf8("widen")
        .utf8("(I)I")
        .u16(0x0021)
        .u16(2)
        .u16(4)
        .u16(1)
        .u16(19)
        // myField
        .u16(1)
        .u16(0x0012)
        .u16(5)
        .u16(6)
        .u16(1)
        .u16(26)
        .u32(10)
        .u16(1)
        .u8(0x13)
        .u8(1)
        .u8(0)
        .u8(0)
        .u16(24)
        .u16(0)
        .u16(3)
        // <init>
        .u16(0x0001)
        .u16(7)
        .u16(8)
        .u16(1)
        .u16(9)
        .u32(29)
        .u16(1)
        .u16(1)
        .u32(5)
        .raw(&[0x2a, 0xb7, 0x00, 0x0b, 0xb1])
        .u16(0)
        .u16(1)
        .u16(20)
        .u32(6)
        .u16(1)
        .u16(0)
        .u16(3)
        // add
        .u16(0x0001)
        .u16(12)
        .u16(13)
        .u16(1)
        .u16(9)
        .u32(54)
        .u16(2)
        .u16(2)
        .u32(add_code.len() as u32)
        .raw(&add_code)
        .u16(0)
        .u16(1)
        .u16(21)
        .u32(4)
        .u16(2)
        .u8(28)
        .u8(1)
        // widen
        .u16(0x0001)
        .u16(27)
        .u16(28)
        .u16(1)
        .u16(9)
        .u32(12 + widen_code.len() as u32)
        .u16(1)
        .u16(2)
        .u32(widen_code.len() as u32)
        .raw(&widen_code)
        .u16(0)
        .u16(0)
        // class attributes
        .u16(3)
        .u16(14)
        .u32(2)
        .u16(15)
        .u16(22)
        .u32(3)
        .raw(&[0x01, 0x02, 0x03])
        .u16(23)
        .u32(17)
        .u16(1)
        .u16(24)
        .u16(1)
        .u16(25)
        .u8(b'[')
        .u16(2)
        .u8(b's')
        .u16(15)
        .u8(b'c')
        .u16(6)
        .finish()
}

fn with_class_file(f: impl FnOnce(ClassFile)) {
    let _ = pretty_env_logger::try_init();
    f(classlib_class_file::decode(&my_class()[..]).unwrap());
}

#[test]
fn test_main_class_instructions() {
    let class_file = classlib_class_file::decode(&main_class()[..]).unwrap();
    let code = class_file.methods[0].code().unwrap();

    assert_eq!(code.code_length(), 5);
    assert_eq!(
        code.code,
        vec![
            Instruction {
                offset: 0,
                opcode: Opcode::ALoad0,
                operands: Operands::None
            },
            Instruction {
                offset: 1,
                opcode: Opcode::InvokeSpecial,
                operands: Operands::ImmediateShort(8)
            },
            Instruction {
                offset: 4,
                opcode: Opcode::Return,
                operands: Operands::None
            },
        ]
    );
    let CpInfo::MethodRef(method_ref) = class_file.constant_pool.get(8).unwrap() else {
        panic!("expected a method reference");
    };
    let (name, descriptor) = class_file
        .constant_pool
        .name_and_type(method_ref.name_and_type_index)
        .unwrap();
    assert_eq!(
        "java/lang/Object",
        class_file.constant_pool.class_name(method_ref.class_index).unwrap()
    );
    assert_eq!("<init>", name);
    assert_eq!("()V", descriptor);
}

#[test]
fn test_round_trip() {
    for bytes in [main_class(), my_class()] {
        let class_file = classlib_class_file::decode(&bytes[..]).unwrap();
        let mut encoded = Vec::new();
        classlib_class_file::encode(&class_file, &mut encoded).unwrap();

        assert_eq!(bytes, encoded);
    }
}

#[test]
fn test_traced_decode_matches_plain_decode() {
    let _ = pretty_env_logger::try_init();
    let bytes = my_class();
    let options = DecodeOptions::strict().with_trace(true);

    assert_eq!(
        classlib_class_file::decode(&bytes[..]).unwrap(),
        classlib_class_file::decode_with_options(&bytes[..], options).unwrap()
    );
}

#[test]
fn test_truncated_class_in_tolerant_mode() {
    let _ = pretty_env_logger::try_init();
    let bytes = main_class();
    let truncated = &bytes[..bytes.len() - 3];

    let class_file = classlib_class_file::decode_tolerant(truncated).unwrap();
    assert_eq!("Main", class_file.class_name().unwrap());
    assert_eq!(1, class_file.methods.len());
    assert!(class_file.methods[0].code().is_some());
    assert!(class_file.attributes.is_empty());
}

#[test]
fn test_truncated_class_in_strict_mode() {
    let bytes = main_class();
    let error = classlib_class_file::decode(&bytes[..bytes.len() - 3]).unwrap_err();

    assert!(matches!(error, ClassFileError::UnexpectedEndOfData));
    assert!(error.is_end_of_data());
}

#[test]
fn test_code_length_follows_edits() {
    let mut class_file = classlib_class_file::decode(&main_class()[..]).unwrap();
    class_file.methods[0]
        .attributes
        .code_attribute_mut()
        .unwrap()
        .code
        .insert(0, Instruction::new(Opcode::Nop, Operands::None));

    let bytes = class_file.to_bytes().unwrap();
    assert_eq!(main_class().len() + 1, bytes.len());

    let class_file = classlib_class_file::decode(&bytes[..]).unwrap();
    let code = class_file.methods[0].code().unwrap();
    assert_eq!(code.code_length(), 6);
    assert_eq!(code.code[3].offset, 5);
}

#[test]
fn test_super_class() {
    with_class_file(|class_file| {
        assert_eq!(
            Some("java/lang/Object".to_owned()),
            class_file.super_class().unwrap().map(|s| s.into_owned())
        )
    });
}

#[test]
fn test_class_name() {
    with_class_file(|class_file| assert_eq!("my/MyClass", class_file.class_name().unwrap()));
}

#[test]
fn test_interface_names() {
    with_class_file(|class_file| {
        assert_eq!(
            vec!["java/lang/Runnable"],
            class_file.interface_names().unwrap()
        )
    });
}

#[test]
fn test_field_name() {
    with_class_file(|class_file| {
        assert_eq!(
            "myField",
            class_file.field_name(&class_file.fields[0]).unwrap()
        )
    });
}

#[test]
fn test_int_field_type() {
    with_class_file(|class_file| {
        assert_eq!(
            "I",
            class_file.field_descriptor(&class_file.fields[0]).unwrap()
        )
    });
}

#[test]
fn test_field_access_flags() {
    with_class_file(|class_file| {
        assert_eq!(
            AccessFlags::FINAL | AccessFlags::PRIVATE,
            class_file.fields[0].access_flags
        )
    });
}

#[test]
fn test_constructor_name() {
    with_class_file(|class_file| {
        assert_eq!(
            "<init>",
            class_file.method_name(&class_file.methods[0]).unwrap()
        )
    });
}

#[test]
fn test_method_descriptor() {
    with_class_file(|class_file| {
        assert_eq!(
            "(I)F",
            class_file
                .method_descriptor(&class_file.methods[1])
                .unwrap()
        )
    });
}

#[test]
fn test_method_access_flags() {
    with_class_file(|class_file| {
        assert_eq!(AccessFlags::PUBLIC, class_file.methods[1].access_flags)
    });
}

#[test]
fn test_long_constant_takes_two_slots() {
    with_class_file(|class_file| {
        assert_eq!(&CpInfo::Long(42), class_file.constant_pool.get(16).unwrap());
        assert!(matches!(
            class_file.constant_pool.get(17),
            Err(ClassFileError::InvalidConstantPoolIndex(17))
        ));
        assert_eq!(29, class_file.constant_pool.count());
    });
}

#[test]
fn test_lookup_switch_keeps_pair_order() {
    with_class_file(|class_file| {
        let add = class_file.find_method("add", "(I)F").unwrap();
        let code = add.code().unwrap();

        assert_eq!(
            Operands::LookupSwitch(LookupSwitch {
                default: 29,
                pairs: vec![
                    MatchOffsetPair { key: 5, offset: 27 },
                    MatchOffsetPair { key: 1, offset: 29 },
                ]
            }),
            code.code[1].operands
        );
        assert_eq!(
            vec![0, 1, 28, 29, 30, 31],
            code.code.iter().map(|i| i.offset).collect::<Vec<_>>()
        );
        assert_eq!(32, code.code_length());
    });
}

#[test]
fn test_nested_code_attributes() {
    with_class_file(|class_file| {
        let code = class_file.methods[1].code().unwrap();
        let stack_map = code
            .attributes
            .find_by_name("StackMapTable", &class_file.constant_pool)
            .unwrap();

        assert_eq!(
            AttributeInfo::StackMapTable(vec![
                StackMapFrame::Same { frame_type: 28 },
                StackMapFrame::Same { frame_type: 1 },
            ]),
            stack_map.info
        );
    });
}

#[test]
fn test_unknown_attribute_is_kept_verbatim() {
    with_class_file(|class_file| {
        let vendor = class_file
            .attributes
            .find_by_name("Vendor", &class_file.constant_pool)
            .unwrap();

        assert_eq!(AttributeInfo::Unknown(vec![0x01, 0x02, 0x03]), vendor.info);
        assert_eq!(None, vendor.name());
    });
}

#[test]
fn test_wide_constant_in_last_slot() {
    let bytes = Bytes::default()
        .u32(0xCAFEBABE)
        .u16(0)
        .u16(52)
        .u16(2)
        .u8(6)
        .u32(0)
        .u32(0)
        .finish();

    assert!(matches!(
        classlib_class_file::decode(&bytes[..]),
        Err(ClassFileError::WideConstantAtEndOfPool(1))
    ));
}

#[test]
fn test_malformed_attribute_payload() {
    let mut bytes = main_class();
    bytes.truncate(bytes.len() - 6);
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x03, 0x00, 0x0b, 0x00]);

    assert!(matches!(
        classlib_class_file::decode(&bytes[..]),
        Err(ClassFileError::AttributeLengthMismatch {
            declared: 3,
            consumed: 2,
            ..
        })
    ));

    let class_file = classlib_class_file::decode_tolerant(&bytes[..]).unwrap();
    assert_eq!(
        AttributeInfo::Unknown(vec![0x00, 0x0b, 0x00]),
        class_file.attributes.0[0].info
    );
    assert_eq!(bytes, class_file.to_bytes().unwrap());
}

#[test]
fn test_wide_locals_and_table_switch() {
    with_class_file(|class_file| {
        let widen = class_file.find_method("widen", "(I)I").unwrap();
        let code = widen.code().unwrap();

        assert_eq!(Operands::ImmediateByte(300), code.code[1].operands);
        assert_eq!(
            Operands::TableSwitch(TableSwitch {
                default: 24,
                low: 0,
                offsets: vec![24, 26],
            }),
            code.code[2].operands
        );
        assert_eq!(
            Operands::Increment {
                index: 300,
                constant: 5
            },
            code.code[10].operands
        );
        assert_eq!(
            vec![0, 1, 4, 28, 29, 30, 31, 32, 37, 42, 43, 48],
            code.code.iter().map(|i| i.offset).collect::<Vec<_>>()
        );
        assert_eq!(49, code.code_length());
    });
}

#[test]
fn test_annotations() {
    with_class_file(|class_file| {
        let annotations = class_file
            .attributes
            .find_by_name("RuntimeVisibleAnnotations", &class_file.constant_pool)
            .unwrap();
        assert_eq!(
            AttributeInfo::RuntimeVisibleAnnotations(vec![Annotation {
                type_index: 24,
                element_value_pairs: vec![ElementValuePair {
                    element_name_index: 25,
                    value: ElementValue::Array(vec![
                        ElementValue::Const {
                            tag: b's',
                            const_value_index: 15
                        },
                        ElementValue::Class {
                            class_info_index: 6
                        },
                    ]),
                }],
            }]),
            annotations.info
        );

        let type_annotations = &class_file.fields[0].attributes.0[0];
        assert_eq!(
            AttributeInfo::RuntimeVisibleTypeAnnotations(vec![TypeAnnotation {
                target_type: 0x13,
                target_info: TargetInfo::Empty,
                target_path: vec![TypePathEntry {
                    type_path_kind: 0,
                    type_argument_index: 0
                }],
                annotation: Annotation {
                    type_index: 24,
                    element_value_pairs: Vec::new(),
                },
            }]),
            type_annotations.info
        );
    });
}

#[test]
fn test_reserved_bytes_come_back_as_zero() {
    let expected = my_class();
    let find = |pattern: &[u8]| {
        expected
            .windows(pattern.len())
            .position(|window| window == pattern)
            .unwrap()
    };
    let invoke_interface = find(&[0xb9, 0x00, 0x0b, 0x01, 0x00]);
    let invoke_dynamic = find(&[0xba, 0x00, 0x0b, 0x00, 0x00]);

    let mut bytes = expected.clone();
    bytes[invoke_interface + 4] = 0x7f;
    bytes[invoke_dynamic + 3] = 0x12;
    bytes[invoke_dynamic + 4] = 0x34;

    let class_file = classlib_class_file::decode(&bytes[..]).unwrap();
    let encoded = class_file.to_bytes().unwrap();

    assert_eq!(0, encoded[invoke_interface + 4]);
    assert_eq!([0, 0], &encoded[invoke_dynamic + 3..invoke_dynamic + 5]);
    assert_eq!(expected, encoded);
}
