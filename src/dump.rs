use std::fmt;

use classlib_class_file::{
    attributes::CodeAttribute, AttributeInfo, Attributes, ClassFile, ClassMember, ConstantPool,
};

/// Human-readable listing of a decoded class file.
pub struct ClassFileDump<'a>(pub &'a ClassFile);

impl fmt::Display for ClassFileDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class_file = self.0;
        let pool = &class_file.constant_pool;

        writeln!(
            f,
            "class {} (version {}.{})",
            lossy(class_file.class_name()),
            class_file.major_version,
            class_file.minor_version
        )?;
        writeln!(f, "  flags: {:?}", class_file.access_flags)?;
        match class_file.super_class() {
            Ok(Some(super_class)) => writeln!(f, "  extends {super_class}")?,
            Ok(None) => {}
            Err(e) => writeln!(f, "  extends <{e}>")?,
        }
        for interface in &class_file.interfaces {
            writeln!(f, "  implements {}", lossy(pool.class_name(*interface)))?;
        }

        writeln!(f, "constant pool ({} slots):", pool.len())?;
        for (index, cp_info) in pool.iter() {
            let value = cp_info
                .float_value()
                .map(f64::from)
                .or_else(|| cp_info.double_value());
            match value {
                Some(value) => writeln!(f, "  #{index:<5} {cp_info:?} = {value}")?,
                None => writeln!(f, "  #{index:<5} {cp_info:?}")?,
            }
        }

        for field in &class_file.fields {
            writeln!(f, "field {}", member(pool, field))?;
            write_attributes(f, pool, &field.attributes, 2)?;
        }
        for method in &class_file.methods {
            writeln!(f, "method {}", member(pool, method))?;
            write_attributes(f, pool, &method.attributes, 2)?;
        }
        write_attributes(f, pool, &class_file.attributes, 0)
    }
}

fn lossy<E: fmt::Display>(name: Result<impl fmt::Display, E>) -> String {
    match name {
        Ok(name) => name.to_string(),
        Err(e) => format!("<{e}>"),
    }
}

fn member(pool: &ConstantPool, member: &ClassMember) -> String {
    format!(
        "{}{} {:?}",
        lossy(pool.utf8(member.name_index).map(|s| s.to_str())),
        lossy(pool.utf8(member.descriptor_index).map(|s| s.to_str())),
        member.access_flags
    )
}

fn write_attributes(
    f: &mut fmt::Formatter<'_>,
    pool: &ConstantPool,
    attributes: &Attributes,
    indent: usize,
) -> fmt::Result {
    for attribute in attributes {
        let name = lossy(
            pool.utf8(attribute.attribute_name_index)
                .map(|s| s.to_str()),
        );
        match &attribute.info {
            AttributeInfo::Code(code) => {
                writeln!(f, "{:indent$}{name}:", "")?;
                write_code(f, pool, code, indent + 2)?;
            }
            AttributeInfo::Unknown(bytes) => {
                writeln!(f, "{:indent$}{name}: {} opaque bytes", "", bytes.len())?
            }
            info => writeln!(f, "{:indent$}{name}: {info:?}", "")?,
        }
    }
    Ok(())
}

fn write_code(
    f: &mut fmt::Formatter<'_>,
    pool: &ConstantPool,
    code: &CodeAttribute,
    indent: usize,
) -> fmt::Result {
    writeln!(
        f,
        "{:indent$}max_stack {} max_locals {} code_length {}",
        "",
        code.max_stack,
        code.max_locals,
        code.code_length()
    )?;
    for instruction in &code.code {
        writeln!(f, "{:indent$}{instruction}", "")?;
    }
    for entry in &code.exception_table {
        writeln!(
            f,
            "{:indent$}catch #{} [{}, {}) -> {}",
            "", entry.catch_type, entry.start_pc, entry.end_pc, entry.handler_pc
        )?;
    }
    write_attributes(f, pool, &code.attributes, indent)
}
