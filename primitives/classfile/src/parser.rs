//! The class-file grammar.
//!
//! Parses the on-disk structure (magic, constant pool, field and method
//! tables, attributes) into raw, index-based form. Name resolution and
//! semantic cooking happen in [`crate::record`].

use nom::bytes::complete::{tag, take};
use nom::multi::length_data;
use nom::number::complete::{be_f32, be_f64, be_i32, be_i64, be_u16, be_u32, be_u8};
use nom::IResult;

use crate::constant_pool::{Constant, ConstantPool};
use crate::{ClassError, Result};

type In<'a> = &'a [u8];
type Err<'a> = nom::error::Error<In<'a>>;

/// An undecoded attribute: name index plus raw body.
#[derive(Debug, Clone)]
pub struct RawAttribute {
    /// Pool index of the attribute name.
    pub name_index: u16,
    /// Raw attribute body.
    pub info: Vec<u8>,
}

/// A raw field or method entry.
#[derive(Debug, Clone)]
pub struct RawMember {
    /// Access flags as on disk.
    pub access: u16,
    /// Pool index of the member name.
    pub name_index: u16,
    /// Pool index of the descriptor.
    pub descriptor_index: u16,
    /// Member attributes.
    pub attributes: Vec<RawAttribute>,
}

/// A parsed class file in raw, index-based form.
#[derive(Debug)]
pub struct RawClass {
    /// Class access flags.
    pub access: u16,
    /// Pool index of this class.
    pub this_class: u16,
    /// Pool index of the superclass (0 for `java.lang.Object`).
    pub super_class: u16,
    /// Pool indices of the direct interfaces.
    pub interfaces: Vec<u16>,
    /// Declared fields in declaration order.
    pub fields: Vec<RawMember>,
    /// Declared methods in declaration order.
    pub methods: Vec<RawMember>,
    /// Class-level attributes.
    pub attributes: Vec<RawAttribute>,
    /// The constant pool.
    pub pool: ConstantPool,
}

/// One row of the `BootstrapMethods` attribute.
#[derive(Debug, Clone)]
pub struct BootstrapMethod {
    /// Pool index of the bootstrap `MethodHandle`.
    pub method_ref: u16,
    /// Pool indices of the static arguments.
    pub arguments: Vec<u16>,
}

/// A `Code` attribute with the parts the analyzer uses.
#[derive(Debug)]
pub struct CodeAttribute {
    /// Declared operand-stack depth.
    pub max_stack: u16,
    /// Declared local-variable count.
    pub max_locals: u16,
    /// The bytecode array.
    pub code: Vec<u8>,
}

/// Parse a complete class file.
pub fn parse_class(bytes: &[u8]) -> Result<RawClass> {
    match class_file(bytes) {
        Ok((_, raw)) => Ok(raw),
        Err(_) => Err(ClassError::Malformed(format!("{} byte class file", bytes.len()))),
    }
}

/// Parse a `BootstrapMethods` attribute body.
pub fn parse_bootstrap_methods(body: &[u8]) -> Result<Vec<BootstrapMethod>> {
    fn inner(input: In<'_>) -> IResult<In<'_>, Vec<BootstrapMethod>> {
        let (mut input, num) = be_u16::<_, Err<'_>>(input)?;
        let mut rows = Vec::with_capacity(num as usize);
        for _ in 0..num {
            let (rest, method_ref) = be_u16::<_, Err<'_>>(input)?;
            let (mut rest, num_args) = be_u16::<_, Err<'_>>(rest)?;
            let mut arguments = Vec::with_capacity(num_args as usize);
            for _ in 0..num_args {
                let (r, arg) = be_u16::<_, Err<'_>>(rest)?;
                arguments.push(arg);
                rest = r;
            }
            rows.push(BootstrapMethod { method_ref, arguments });
            input = rest;
        }
        Ok((input, rows))
    }
    let parsed: IResult<In<'_>, Vec<BootstrapMethod>> = inner(body);
    match parsed {
        Ok((_, rows)) => Ok(rows),
        Err(_) => Err(ClassError::Malformed("BootstrapMethods attribute".to_string())),
    }
}

/// Parse a `Code` attribute body (exception table and nested attributes are
/// consumed and dropped).
pub fn parse_code_attribute(body: &[u8]) -> Result<CodeAttribute> {
    fn inner(input: In<'_>) -> IResult<In<'_>, CodeAttribute> {
        let (input, max_stack) = be_u16::<_, Err<'_>>(input)?;
        let (input, max_locals) = be_u16::<_, Err<'_>>(input)?;
        let (input, code) = length_data(be_u32::<_, Err<'_>>)(input)?;
        let (input, exception_count) = be_u16::<_, Err<'_>>(input)?;
        let (input, _) = take::<_, _, Err<'_>>(exception_count as usize * 8)(input)?;
        // Nested attributes (LineNumberTable etc.) are irrelevant here.
        Ok((input, CodeAttribute { max_stack, max_locals, code: code.to_vec() }))
    }
    let parsed: IResult<In<'_>, CodeAttribute> = inner(body);
    match parsed {
        Ok((_, attr)) => Ok(attr),
        Err(_) => Err(ClassError::Malformed("Code attribute".to_string())),
    }
}

fn class_file(input: In<'_>) -> IResult<In<'_>, RawClass> {
    let (input, _) = tag::<_, _, Err<'_>>(&[0xca_u8, 0xfe, 0xba, 0xbe][..])(input)?;
    let (input, _minor) = be_u16::<_, Err<'_>>(input)?;
    let (input, _major) = be_u16::<_, Err<'_>>(input)?;
    let (input, pool_count) = be_u16::<_, Err<'_>>(input)?;
    let (input, pool) = constant_pool(input, pool_count)?;
    let (input, access) = be_u16::<_, Err<'_>>(input)?;
    let (input, this_class) = be_u16::<_, Err<'_>>(input)?;
    let (input, super_class) = be_u16::<_, Err<'_>>(input)?;
    let (mut input, iface_count) = be_u16::<_, Err<'_>>(input)?;
    let mut interfaces = Vec::with_capacity(iface_count as usize);
    for _ in 0..iface_count {
        let (rest, idx) = be_u16::<_, Err<'_>>(input)?;
        interfaces.push(idx);
        input = rest;
    }
    let (input, fields) = members(input)?;
    let (input, methods) = members(input)?;
    let (input, attributes) = attribute_list(input)?;
    Ok((
        input,
        RawClass {
            access,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
            pool: ConstantPool::new(pool),
        },
    ))
}

fn constant_pool(mut input: In<'_>, count: u16) -> IResult<In<'_>, Vec<Constant>> {
    let mut entries = Vec::with_capacity(count.saturating_sub(1) as usize);
    let mut index = 1u16;
    while index < count {
        let (rest, entry) = constant(input)?;
        let double_slot = matches!(entry, Constant::Long(_) | Constant::Double(_));
        entries.push(entry);
        input = rest;
        if double_slot {
            entries.push(Constant::Unusable);
            index += 2;
        } else {
            index += 1;
        }
    }
    Ok((input, entries))
}

fn constant(input: In<'_>) -> IResult<In<'_>, Constant> {
    let (input, tag_byte) = be_u8::<_, Err<'_>>(input)?;
    match tag_byte {
        1 => {
            let (input, data) = length_data(be_u16::<_, Err<'_>>)(input)?;
            let text = cesu8::from_java_cesu8(data)
                .map(|cow| cow.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(data).into_owned());
            Ok((input, Constant::Utf8(text)))
        }
        3 => be_i32::<_, Err<'_>>(input).map(|(i, v)| (i, Constant::Integer(v))),
        4 => be_f32::<_, Err<'_>>(input).map(|(i, v)| (i, Constant::Float(v))),
        5 => be_i64::<_, Err<'_>>(input).map(|(i, v)| (i, Constant::Long(v))),
        6 => be_f64::<_, Err<'_>>(input).map(|(i, v)| (i, Constant::Double(v))),
        7 => be_u16::<_, Err<'_>>(input).map(|(i, v)| (i, Constant::Class(v))),
        8 => be_u16::<_, Err<'_>>(input).map(|(i, v)| (i, Constant::Str(v))),
        9 => {
            let (input, class) = be_u16::<_, Err<'_>>(input)?;
            let (input, name_and_type) = be_u16::<_, Err<'_>>(input)?;
            Ok((input, Constant::FieldRef { class, name_and_type }))
        }
        10 => {
            let (input, class) = be_u16::<_, Err<'_>>(input)?;
            let (input, name_and_type) = be_u16::<_, Err<'_>>(input)?;
            Ok((input, Constant::MethodRef { class, name_and_type }))
        }
        11 => {
            let (input, class) = be_u16::<_, Err<'_>>(input)?;
            let (input, name_and_type) = be_u16::<_, Err<'_>>(input)?;
            Ok((input, Constant::InterfaceMethodRef { class, name_and_type }))
        }
        12 => {
            let (input, name) = be_u16::<_, Err<'_>>(input)?;
            let (input, descriptor) = be_u16::<_, Err<'_>>(input)?;
            Ok((input, Constant::NameAndType { name, descriptor }))
        }
        15 => {
            let (input, kind) = be_u8::<_, Err<'_>>(input)?;
            let (input, reference) = be_u16::<_, Err<'_>>(input)?;
            Ok((input, Constant::MethodHandle { kind, reference }))
        }
        16 => be_u16::<_, Err<'_>>(input).map(|(i, v)| (i, Constant::MethodType(v))),
        17 => {
            let (input, bootstrap) = be_u16::<_, Err<'_>>(input)?;
            let (input, name_and_type) = be_u16::<_, Err<'_>>(input)?;
            Ok((input, Constant::Dynamic { bootstrap, name_and_type }))
        }
        18 => {
            let (input, bootstrap) = be_u16::<_, Err<'_>>(input)?;
            let (input, name_and_type) = be_u16::<_, Err<'_>>(input)?;
            Ok((input, Constant::InvokeDynamic { bootstrap, name_and_type }))
        }
        19 => be_u16::<_, Err<'_>>(input).map(|(i, v)| (i, Constant::Module(v))),
        20 => be_u16::<_, Err<'_>>(input).map(|(i, v)| (i, Constant::Package(v))),
        _ => Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Tag))),
    }
}

fn attribute(input: In<'_>) -> IResult<In<'_>, RawAttribute> {
    let (input, name_index) = be_u16::<_, Err<'_>>(input)?;
    let (input, info) = length_data(be_u32::<_, Err<'_>>)(input)?;
    Ok((input, RawAttribute { name_index, info: info.to_vec() }))
}

fn attribute_list(input: In<'_>) -> IResult<In<'_>, Vec<RawAttribute>> {
    let (mut input, count) = be_u16::<_, Err<'_>>(input)?;
    let mut attrs = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (rest, attr) = attribute(input)?;
        attrs.push(attr);
        input = rest;
    }
    Ok((input, attrs))
}

fn members(input: In<'_>) -> IResult<In<'_>, Vec<RawMember>> {
    let (mut input, count) = be_u16::<_, Err<'_>>(input)?;
    let mut list = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (rest, access) = be_u16::<_, Err<'_>>(input)?;
        let (rest, name_index) = be_u16::<_, Err<'_>>(rest)?;
        let (rest, descriptor_index) = be_u16::<_, Err<'_>>(rest)?;
        let (rest, attributes) = attribute_list(rest)?;
        list.push(RawMember { access, name_index, descriptor_index, attributes });
        input = rest;
    }
    Ok((input, list))
}
