//! Cooked class records.
//!
//! A [`ClassRecord`] is the resolved view of one parsed class file: names
//! canonicalized, signatures decoded to [`TypeRef`]s, annotations attached
//! and method bytecode normalized. Malformed signatures skip the offending
//! member with a warning; they never fail the class.

use bitflags::bitflags;
use log::warn;
use types::{ConstValue, MethodIdentifier, TypeRef};

use crate::annotations::{parse_annotations, parse_parameter_annotations, Annotation};
use crate::code::{self, Instruction};
use crate::parser::{self, RawAttribute, RawClass, RawMember};
use crate::signature::{
    parse_field_descriptor, parse_field_signature, parse_method_descriptor,
    parse_method_signature,
};
use crate::Result;

bitflags! {
    /// Class access and property flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClassAccess: u16 {
        /// `ACC_PUBLIC`
        const PUBLIC = 0x0001;
        /// `ACC_FINAL`
        const FINAL = 0x0010;
        /// `ACC_SUPER`
        const SUPER = 0x0020;
        /// `ACC_INTERFACE`
        const INTERFACE = 0x0200;
        /// `ACC_ABSTRACT`
        const ABSTRACT = 0x0400;
        /// `ACC_SYNTHETIC`
        const SYNTHETIC = 0x1000;
        /// `ACC_ANNOTATION`
        const ANNOTATION = 0x2000;
        /// `ACC_ENUM`
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// Field access and property flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FieldAccess: u16 {
        /// `ACC_PUBLIC`
        const PUBLIC = 0x0001;
        /// `ACC_PRIVATE`
        const PRIVATE = 0x0002;
        /// `ACC_PROTECTED`
        const PROTECTED = 0x0004;
        /// `ACC_STATIC`
        const STATIC = 0x0008;
        /// `ACC_FINAL`
        const FINAL = 0x0010;
        /// `ACC_VOLATILE`
        const VOLATILE = 0x0040;
        /// `ACC_TRANSIENT`
        const TRANSIENT = 0x0080;
        /// `ACC_SYNTHETIC`
        const SYNTHETIC = 0x1000;
        /// `ACC_ENUM`
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// Method access and property flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodAccess: u16 {
        /// `ACC_PUBLIC`
        const PUBLIC = 0x0001;
        /// `ACC_PRIVATE`
        const PRIVATE = 0x0002;
        /// `ACC_PROTECTED`
        const PROTECTED = 0x0004;
        /// `ACC_STATIC`
        const STATIC = 0x0008;
        /// `ACC_FINAL`
        const FINAL = 0x0010;
        /// `ACC_SYNCHRONIZED`
        const SYNCHRONIZED = 0x0020;
        /// `ACC_BRIDGE`
        const BRIDGE = 0x0040;
        /// `ACC_VARARGS`
        const VARARGS = 0x0080;
        /// `ACC_NATIVE`
        const NATIVE = 0x0100;
        /// `ACC_ABSTRACT`
        const ABSTRACT = 0x0400;
        /// `ACC_SYNTHETIC`
        const SYNTHETIC = 0x1000;
    }
}

/// A resolved field.
#[derive(Debug, Clone)]
pub struct FieldRecord {
    /// Field name.
    pub name: String,
    /// Access flags.
    pub access: FieldAccess,
    /// Declared type (generic signature preferred over descriptor).
    pub type_ref: TypeRef,
    /// Runtime-visible annotations.
    pub annotations: Vec<Annotation>,
    /// `ConstantValue` attribute payload for static finals.
    pub constant: Option<ConstValue>,
}

impl FieldRecord {
    /// The annotation with the given canonical name, when present.
    pub fn annotation(&self, type_name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.type_name == type_name)
    }
}

/// A resolved method.
#[derive(Debug, Clone)]
pub struct MethodRecord {
    /// Method name (`<init>` for constructors).
    pub name: String,
    /// Access flags.
    pub access: MethodAccess,
    /// Declared parameter types.
    pub params: Vec<TypeRef>,
    /// Declared return type.
    pub ret: TypeRef,
    /// Runtime-visible annotations.
    pub annotations: Vec<Annotation>,
    /// Runtime-visible annotations per declared parameter.
    pub param_annotations: Vec<Vec<Annotation>>,
    /// Normalized bytecode, absent for `abstract`/`native` methods.
    pub instructions: Option<Vec<Instruction>>,
}

impl MethodRecord {
    /// Whether the method is public.
    pub fn is_public(&self) -> bool { self.access.contains(MethodAccess::PUBLIC) }

    /// Whether the method is static.
    pub fn is_static(&self) -> bool { self.access.contains(MethodAccess::STATIC) }

    /// The annotation with the given canonical name, when present.
    pub fn annotation(&self, type_name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.type_name == type_name)
    }

    /// Annotations of one declared parameter.
    pub fn annotations_of_param(&self, index: usize) -> &[Annotation] {
        self.param_annotations.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Structural identity of this method on its declaring class.
    pub fn identifier(&self, owner: &str) -> MethodIdentifier {
        MethodIdentifier {
            owner: owner.to_string(),
            name: self.name.clone(),
            params: self.params.clone(),
            ret: self.ret.clone(),
            is_static: self.is_static(),
        }
    }
}

/// A resolved class.
#[derive(Debug)]
pub struct ClassRecord {
    /// Canonical class name.
    pub name: String,
    /// Canonical superclass name (`None` for `java.lang.Object` and
    /// synthetic records).
    pub super_name: Option<String>,
    /// Canonical names of the direct interfaces.
    pub interfaces: Vec<String>,
    /// Access flags.
    pub access: ClassAccess,
    /// Runtime-visible annotations.
    pub annotations: Vec<Annotation>,
    /// Declared fields in declaration order.
    pub fields: Vec<FieldRecord>,
    /// Declared methods in declaration order.
    pub methods: Vec<MethodRecord>,
    /// Whether this record was substituted for an unresolvable class.
    pub synthetic: bool,
}

impl ClassRecord {
    /// Parse and resolve one class file.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let raw = parser::parse_class(bytes)?;
        Self::from_raw(raw)
    }

    /// A substitute record for an unresolvable class: no members, no
    /// supertype, introspects to an empty object.
    pub fn synthetic(name: &str) -> Self {
        Self {
            name: name.to_string(),
            super_name: None,
            interfaces: Vec::new(),
            access: ClassAccess::PUBLIC,
            annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            synthetic: true,
        }
    }

    /// The annotation with the given canonical name, when present.
    pub fn annotation(&self, type_name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.type_name == type_name)
    }

    /// Whether this class is an enum.
    pub fn is_enum(&self) -> bool {
        self.access.contains(ClassAccess::ENUM)
            || self.super_name.as_deref() == Some("java.lang.Enum")
    }

    /// The declared method with the given name and parameter types.
    pub fn find_method(&self, name: &str, params: &[TypeRef]) -> Option<&MethodRecord> {
        self.methods.iter().find(|m| m.name == name && m.params == params)
    }

    /// Whether a method with the given name and parameters is redeclared
    /// on this class (used for inherited-method filtering).
    pub fn redeclares(&self, name: &str, params: &[TypeRef]) -> bool {
        self.find_method(name, params).is_some()
    }

    /// The declared static field with the given name.
    pub fn find_field(&self, name: &str) -> Option<&FieldRecord> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn from_raw(raw: RawClass) -> Result<Self> {
        let pool = &raw.pool;
        let name = pool.class_name(raw.this_class)?;
        let super_name = if raw.super_class == 0 {
            None
        } else {
            Some(pool.class_name(raw.super_class)?)
        };
        let interfaces = raw
            .interfaces
            .iter()
            .map(|&i| pool.class_name(i))
            .collect::<Result<Vec<_>>>()?;

        let bootstrap = named_attr(pool, &raw.attributes, "BootstrapMethods")
            .map(|body| parser::parse_bootstrap_methods(body))
            .transpose()?
            .unwrap_or_default();

        let annotations = visible_annotations(pool, &raw.attributes);

        let mut fields = Vec::with_capacity(raw.fields.len());
        for member in &raw.fields {
            match cook_field(pool, member) {
                Ok(field) => fields.push(field),
                Err(e) => warn!("{}: skipping field: {}", name, e),
            }
        }

        let mut methods = Vec::with_capacity(raw.methods.len());
        for member in &raw.methods {
            match cook_method(pool, member, &bootstrap) {
                Ok(method) => methods.push(method),
                Err(e) => warn!("{}: skipping method: {}", name, e),
            }
        }

        Ok(Self {
            name,
            super_name,
            interfaces,
            access: ClassAccess::from_bits_truncate(raw.access),
            annotations,
            fields,
            methods,
            synthetic: false,
        })
    }
}

fn named_attr<'a>(
    pool: &crate::ConstantPool,
    attrs: &'a [RawAttribute],
    name: &str,
) -> Option<&'a [u8]> {
    attrs
        .iter()
        .find(|a| pool.utf8(a.name_index).is_ok_and(|n| n == name))
        .map(|a| a.info.as_slice())
}

fn visible_annotations(pool: &crate::ConstantPool, attrs: &[RawAttribute]) -> Vec<Annotation> {
    named_attr(pool, attrs, "RuntimeVisibleAnnotations")
        .map(|body| match parse_annotations(pool, body) {
            Ok(list) => list,
            Err(e) => {
                warn!("skipping unreadable annotations: {}", e);
                Vec::new()
            }
        })
        .unwrap_or_default()
}

fn cook_field(pool: &crate::ConstantPool, member: &RawMember) -> Result<FieldRecord> {
    let name = pool.utf8(member.name_index)?.to_string();
    let descriptor = pool.utf8(member.descriptor_index)?;

    // The generic signature wins when present and well-formed.
    let type_ref = match named_attr(pool, &member.attributes, "Signature")
        .and_then(|body| signature_text(pool, body))
    {
        Some(sig) => parse_field_signature(&sig)?,
        None => parse_field_descriptor(descriptor)?,
    };

    let constant = named_attr(pool, &member.attributes, "ConstantValue")
        .and_then(|body| <[u8; 2]>::try_from(body).ok())
        .map(u16::from_be_bytes)
        .and_then(|index| pool.loadable(index).ok());

    Ok(FieldRecord {
        name,
        access: FieldAccess::from_bits_truncate(member.access),
        type_ref,
        annotations: visible_annotations(pool, &member.attributes),
        constant,
    })
}

fn cook_method(
    pool: &crate::ConstantPool,
    member: &RawMember,
    bootstrap: &[parser::BootstrapMethod],
) -> Result<MethodRecord> {
    let name = pool.utf8(member.name_index)?.to_string();
    let descriptor = pool.utf8(member.descriptor_index)?;
    let (desc_params, desc_ret) = parse_method_descriptor(descriptor)?;

    // A generic signature may omit synthetic parameters; trust it only when
    // it agrees with the descriptor on arity.
    let (params, ret) = match named_attr(pool, &member.attributes, "Signature")
        .and_then(|body| signature_text(pool, body))
        .and_then(|sig| parse_method_signature(&sig).ok())
    {
        Some((sig_params, sig_ret)) if sig_params.len() == desc_params.len() => {
            (sig_params, sig_ret)
        }
        Some((_, sig_ret)) => (desc_params, sig_ret),
        None => (desc_params, desc_ret),
    };

    let param_annotations = named_attr(pool, &member.attributes, "RuntimeVisibleParameterAnnotations")
        .map(|body| match parse_parameter_annotations(pool, body) {
            Ok(list) => list,
            Err(e) => {
                warn!("skipping unreadable parameter annotations: {}", e);
                Vec::new()
            }
        })
        .unwrap_or_default();

    let instructions = named_attr(pool, &member.attributes, "Code")
        .map(parser::parse_code_attribute)
        .transpose()?
        .map(|attr| code::decode(&attr.code, pool, bootstrap));

    Ok(MethodRecord {
        name,
        access: MethodAccess::from_bits_truncate(member.access),
        params,
        ret,
        annotations: visible_annotations(pool, &member.attributes),
        param_annotations,
        instructions,
    })
}

fn signature_text(pool: &crate::ConstantPool, body: &[u8]) -> Option<String> {
    <[u8; 2]>::try_from(body)
        .ok()
        .map(u16::from_be_bytes)
        .and_then(|index| pool.utf8(index).ok())
        .map(str::to_string)
}
