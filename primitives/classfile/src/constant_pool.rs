//! The class-file constant pool.
//!
//! Entries are kept close to their on-disk form; accessors resolve the
//! index chains (`Class` → `Utf8`, `Methodref` → `Class` + `NameAndType`)
//! and convert internal names (`pkg/Outer$Inner`) to canonical dotted form.

use types::{ConstValue, TypeRef};

use crate::{ClassError, Result};

/// One constant-pool entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Modified-UTF-8 text, already decoded.
    Utf8(String),
    /// `CONSTANT_Integer`.
    Integer(i32),
    /// `CONSTANT_Float`.
    Float(f32),
    /// `CONSTANT_Long`.
    Long(i64),
    /// `CONSTANT_Double`.
    Double(f64),
    /// `CONSTANT_Class`; the index points at the internal name.
    Class(u16),
    /// `CONSTANT_String`; the index points at the text.
    Str(u16),
    /// `CONSTANT_Fieldref`.
    FieldRef {
        /// Declaring class index.
        class: u16,
        /// `NameAndType` index.
        name_and_type: u16,
    },
    /// `CONSTANT_Methodref`.
    MethodRef {
        /// Declaring class index.
        class: u16,
        /// `NameAndType` index.
        name_and_type: u16,
    },
    /// `CONSTANT_InterfaceMethodref`.
    InterfaceMethodRef {
        /// Declaring interface index.
        class: u16,
        /// `NameAndType` index.
        name_and_type: u16,
    },
    /// `CONSTANT_NameAndType`.
    NameAndType {
        /// Name index.
        name: u16,
        /// Descriptor index.
        descriptor: u16,
    },
    /// `CONSTANT_MethodHandle`.
    MethodHandle {
        /// Reference kind (1–9).
        kind: u8,
        /// Index of the referenced field/method.
        reference: u16,
    },
    /// `CONSTANT_MethodType`.
    MethodType(u16),
    /// `CONSTANT_Dynamic`.
    Dynamic {
        /// Row in the `BootstrapMethods` attribute.
        bootstrap: u16,
        /// `NameAndType` index.
        name_and_type: u16,
    },
    /// `CONSTANT_InvokeDynamic`.
    InvokeDynamic {
        /// Row in the `BootstrapMethods` attribute.
        bootstrap: u16,
        /// `NameAndType` index.
        name_and_type: u16,
    },
    /// `CONSTANT_Module`.
    Module(u16),
    /// `CONSTANT_Package`.
    Package(u16),
    /// Second slot of a `Long`/`Double` entry.
    Unusable,
}

/// The pool, indexed 1-based as on disk.
#[derive(Debug, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

/// Convert an internal binary name to canonical dotted form.
pub fn canonical_name(internal: &str) -> String { internal.replace('/', ".") }

impl ConstantPool {
    /// Wrap parsed entries (index 0 is implicit and unusable).
    pub fn new(entries: Vec<Constant>) -> Self { Self { entries } }

    /// Number of declared entries (as on disk: slot count + 1).
    pub fn len(&self) -> usize { self.entries.len() + 1 }

    /// Whether the pool has no entries.
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Raw entry at a 1-based index.
    pub fn get(&self, index: u16) -> Result<&Constant> {
        index
            .checked_sub(1)
            .and_then(|i| self.entries.get(i as usize))
            .ok_or(ClassError::BadPoolRef { index, expected: "any entry" })
    }

    /// Text of a `Utf8` entry.
    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            _ => Err(ClassError::BadPoolRef { index, expected: "Utf8" }),
        }
    }

    /// Canonical dotted name of a `Class` entry.
    pub fn class_name(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            Constant::Class(name) => Ok(canonical_name(self.utf8(*name)?)),
            _ => Err(ClassError::BadPoolRef { index, expected: "Class" }),
        }
    }

    /// `(name, descriptor)` of a `NameAndType` entry.
    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(ClassError::BadPoolRef { index, expected: "NameAndType" }),
        }
    }

    /// `(owner, name, descriptor)` of a field reference.
    pub fn field_entry(&self, index: u16) -> Result<(String, &str, &str)> {
        match self.get(index)? {
            Constant::FieldRef { class, name_and_type } => {
                let owner = self.class_name(*class)?;
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Ok((owner, name, descriptor))
            }
            _ => Err(ClassError::BadPoolRef { index, expected: "Fieldref" }),
        }
    }

    /// `(owner, name, descriptor)` of a method or interface-method reference.
    pub fn method_entry(&self, index: u16) -> Result<(String, &str, &str)> {
        match self.get(index)? {
            Constant::MethodRef { class, name_and_type }
            | Constant::InterfaceMethodRef { class, name_and_type } => {
                let owner = self.class_name(*class)?;
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Ok((owner, name, descriptor))
            }
            _ => Err(ClassError::BadPoolRef { index, expected: "Methodref" }),
        }
    }

    /// The method reference behind a `MethodHandle` entry, when it has one.
    pub fn handle_method(&self, index: u16) -> Result<Option<(String, &str, &str, bool)>> {
        match self.get(index)? {
            Constant::MethodHandle { kind, reference } => match self.get(*reference)? {
                Constant::MethodRef { .. } | Constant::InterfaceMethodRef { .. } => {
                    let (owner, name, descriptor) = self.method_entry(*reference)?;
                    // Kind 6 = REF_invokeStatic.
                    Ok(Some((owner, name, descriptor, *kind == 6)))
                }
                _ => Ok(None),
            },
            _ => Err(ClassError::BadPoolRef { index, expected: "MethodHandle" }),
        }
    }

    /// A loadable constant (`ldc` family) as an abstract value.
    pub fn loadable(&self, index: u16) -> Result<ConstValue> {
        match self.get(index)? {
            Constant::Integer(v) => Ok(ConstValue::Int(*v as i64)),
            Constant::Long(v) => Ok(ConstValue::Int(*v)),
            Constant::Float(v) => Ok(ConstValue::float(*v as f64)),
            Constant::Double(v) => Ok(ConstValue::float(*v)),
            Constant::Str(text) => Ok(ConstValue::Str(self.utf8(*text)?.to_string())),
            Constant::Class(name) => {
                Ok(ConstValue::Class(TypeRef::new(canonical_name(self.utf8(*name)?))))
            }
            _ => Err(ClassError::BadPoolRef { index, expected: "loadable constant" }),
        }
    }
}
