//! Synthetic class-file assembly for tests.
//!
//! End-to-end tests need real class bytes without shelling out to a Java
//! toolchain. This module assembles minimal but well-formed class files:
//! constant pool interning, runtime-visible annotations, and a small opcode
//! vocabulary sufficient for resource-method bodies.

use std::collections::HashMap;

/// `ACC_PUBLIC` for classes, fields and methods.
pub const ACC_PUBLIC: u16 = 0x0001;
/// `ACC_STATIC`.
pub const ACC_STATIC: u16 = 0x0008;
/// `ACC_FINAL`.
pub const ACC_FINAL: u16 = 0x0010;
/// `ACC_TRANSIENT` (fields).
pub const ACC_TRANSIENT: u16 = 0x0080;
/// `ACC_ENUM` (classes).
pub const ACC_ENUM: u16 = 0x4000;

/// An annotation element value.
#[derive(Debug, Clone)]
pub enum ElementValue {
    /// Tag `s`.
    Str(String),
    /// Tag `I`.
    Int(i32),
    /// Tag `[` of `s`.
    StrArray(Vec<String>),
    /// Tag `e`.
    EnumConst {
        /// Field descriptor of the enum type.
        descriptor: String,
        /// Constant name.
        constant: String,
    },
}

/// An annotation to attach to a class, member or parameter.
#[derive(Debug, Clone)]
pub struct Ann {
    descriptor: String,
    elements: Vec<(String, ElementValue)>,
}

impl Ann {
    /// A marker annotation (`@GET`).
    pub fn marker(descriptor: &str) -> Self {
        Self { descriptor: descriptor.to_string(), elements: Vec::new() }
    }

    /// An annotation with a single string `value` (`@Path("users")`).
    pub fn with_value(descriptor: &str, value: &str) -> Self {
        Self::marker(descriptor).string("value", value)
    }

    /// An annotation with a string-array `value` (`@Produces({...})`).
    pub fn with_values(descriptor: &str, values: &[&str]) -> Self {
        let mut ann = Self::marker(descriptor);
        ann.elements.push((
            "value".to_string(),
            ElementValue::StrArray(values.iter().map(|s| s.to_string()).collect()),
        ));
        ann
    }

    /// Add a string element.
    pub fn string(mut self, name: &str, value: &str) -> Self {
        self.elements.push((name.to_string(), ElementValue::Str(value.to_string())));
        self
    }

    /// Add an enum-constant element.
    pub fn enum_const(mut self, name: &str, descriptor: &str, constant: &str) -> Self {
        self.elements.push((
            name.to_string(),
            ElementValue::EnumConst {
                descriptor: descriptor.to_string(),
                constant: constant.to_string(),
            },
        ));
        self
    }
}

/// One symbolic instruction of a test method body.
#[derive(Debug, Clone)]
pub enum Op {
    /// `ldc` of a string constant.
    LdcStr(String),
    /// Push an integer with the smallest fitting opcode.
    PushInt(i32),
    /// `aconst_null`.
    AconstNull,
    /// `iload`.
    ILoad(u8),
    /// `lload`.
    LLoad(u8),
    /// `aload`.
    ALoad(u8),
    /// `astore`.
    AStore(u8),
    /// `dup`.
    Dup,
    /// `pop`.
    Pop,
    /// `new`.
    New(String),
    /// `getstatic`.
    GetStatic {
        /// Internal owner name.
        owner: String,
        /// Field name.
        name: String,
        /// Field descriptor.
        descriptor: String,
    },
    /// `invokevirtual`.
    InvokeVirtual {
        /// Internal owner name.
        owner: String,
        /// Method name.
        name: String,
        /// Method descriptor.
        descriptor: String,
    },
    /// `invokestatic`.
    InvokeStatic {
        /// Internal owner name.
        owner: String,
        /// Method name.
        name: String,
        /// Method descriptor.
        descriptor: String,
    },
    /// `invokespecial`.
    InvokeSpecial {
        /// Internal owner name.
        owner: String,
        /// Method name.
        name: String,
        /// Method descriptor.
        descriptor: String,
    },
    /// `ifeq` with a dummy offset (the analyzer flattens jumps).
    IfEq,
    /// `goto` with a dummy offset.
    Goto,
    /// `areturn`.
    Areturn,
    /// `ireturn`.
    Ireturn,
    /// `return`.
    Return,
    /// `athrow`.
    Athrow,
}

/// A field under construction.
#[derive(Debug, Clone)]
pub struct TestField {
    name: String,
    descriptor: String,
    access: u16,
    signature: Option<String>,
    annotations: Vec<Ann>,
    constant_str: Option<String>,
}

impl TestField {
    /// A field with the given name, descriptor and flags.
    pub fn new(name: &str, descriptor: &str, access: u16) -> Self {
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access,
            signature: None,
            annotations: Vec::new(),
            constant_str: None,
        }
    }

    /// Attach a generic signature.
    pub fn signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    /// Attach an annotation.
    pub fn annotate(mut self, ann: Ann) -> Self {
        self.annotations.push(ann);
        self
    }

    /// Attach a string `ConstantValue`.
    pub fn constant_string(mut self, value: &str) -> Self {
        self.constant_str = Some(value.to_string());
        self
    }
}

/// A method under construction.
#[derive(Debug, Clone)]
pub struct TestMethod {
    name: String,
    descriptor: String,
    access: u16,
    signature: Option<String>,
    annotations: Vec<Ann>,
    param_annotations: Option<Vec<Vec<Ann>>>,
    code: Option<Vec<Op>>,
}

impl TestMethod {
    /// A method with the given name, descriptor and flags.
    pub fn new(name: &str, descriptor: &str, access: u16) -> Self {
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access,
            signature: None,
            annotations: Vec::new(),
            param_annotations: None,
            code: None,
        }
    }

    /// Attach a generic signature.
    pub fn signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    /// Attach a method annotation.
    pub fn annotate(mut self, ann: Ann) -> Self {
        self.annotations.push(ann);
        self
    }

    /// Attach per-parameter annotations.
    pub fn param_annotations(mut self, per_param: Vec<Vec<Ann>>) -> Self {
        self.param_annotations = Some(per_param);
        self
    }

    /// Attach a body.
    pub fn code(mut self, ops: Vec<Op>) -> Self {
        self.code = Some(ops);
        self
    }
}

/// A class under construction.
#[derive(Debug, Clone)]
pub struct TestClass {
    name: String,
    super_name: String,
    access: u16,
    annotations: Vec<Ann>,
    fields: Vec<TestField>,
    methods: Vec<TestMethod>,
}

impl TestClass {
    /// A public class with `java/lang/Object` as superclass.
    pub fn new(internal_name: &str) -> Self {
        Self {
            name: internal_name.to_string(),
            super_name: "java/lang/Object".to_string(),
            access: ACC_PUBLIC | 0x0020,
            annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Replace the superclass.
    pub fn extends(mut self, internal_name: &str) -> Self {
        self.super_name = internal_name.to_string();
        self
    }

    /// Add access flags (e.g. [`ACC_ENUM`]).
    pub fn flags(mut self, access: u16) -> Self {
        self.access |= access;
        self
    }

    /// Attach a class annotation.
    pub fn annotate(mut self, ann: Ann) -> Self {
        self.annotations.push(ann);
        self
    }

    /// Add a field.
    pub fn field(mut self, field: TestField) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a method.
    pub fn method(mut self, method: TestMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// Assemble the class file.
    pub fn build(&self) -> Vec<u8> {
        let mut pool = Pool::default();
        let this_class = pool.class(&self.name);
        let super_class = pool.class(&self.super_name);

        let fields: Vec<Vec<u8>> = self.fields.iter().map(|f| assemble_field(&mut pool, f)).collect();
        let methods: Vec<Vec<u8>> =
            self.methods.iter().map(|m| assemble_method(&mut pool, m)).collect();
        let class_attrs = annotation_attributes(&mut pool, &self.annotations, None);

        let mut out = Vec::new();
        out.extend_from_slice(&[0xca, 0xfe, 0xba, 0xbe]);
        out.extend_from_slice(&0u16.to_be_bytes()); // minor
        out.extend_from_slice(&52u16.to_be_bytes()); // major: Java 8
        pool.serialize(&mut out);
        out.extend_from_slice(&self.access.to_be_bytes());
        out.extend_from_slice(&this_class.to_be_bytes());
        out.extend_from_slice(&super_class.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // interfaces
        out.extend_from_slice(&(fields.len() as u16).to_be_bytes());
        for f in &fields {
            out.extend_from_slice(f);
        }
        out.extend_from_slice(&(methods.len() as u16).to_be_bytes());
        for m in &methods {
            out.extend_from_slice(m);
        }
        out.extend_from_slice(&(class_attrs.len() as u16).to_be_bytes());
        for a in &class_attrs {
            out.extend_from_slice(a);
        }
        out
    }

    /// Assemble and write the class under `root` at its package path.
    pub fn write_to(&self, root: &std::path::Path) -> std::io::Result<()> {
        let relative: std::path::PathBuf = format!("{}.class", self.name).into();
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.build())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Utf8(String),
    Class(String),
    Str(String),
    Int(i32),
    NameAndType(String, String),
    FieldRef(String, String, String),
    MethodRef(String, String, String),
}

#[derive(Default)]
struct Pool {
    bytes: Vec<u8>,
    count: u16,
    interned: HashMap<Key, u16>,
}

impl Pool {
    fn intern(&mut self, key: Key, emit: impl FnOnce(&mut Self) -> Vec<u8>) -> u16 {
        if let Some(&index) = self.interned.get(&key) {
            return index;
        }
        let payload = emit(self);
        self.count += 1;
        let index = self.count;
        self.bytes.extend_from_slice(&payload);
        self.interned.insert(key, index);
        index
    }

    fn utf8(&mut self, text: &str) -> u16 {
        let key = Key::Utf8(text.to_string());
        if let Some(&index) = self.interned.get(&key) {
            return index;
        }
        let mut payload = vec![1u8];
        let encoded = cesu8::to_java_cesu8(text);
        payload.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
        payload.extend_from_slice(&encoded);
        self.count += 1;
        let index = self.count;
        self.bytes.extend_from_slice(&payload);
        self.interned.insert(key, index);
        index
    }

    fn class(&mut self, internal: &str) -> u16 {
        let name = self.utf8(internal);
        self.intern(Key::Class(internal.to_string()), |_| {
            let mut p = vec![7u8];
            p.extend_from_slice(&name.to_be_bytes());
            p
        })
    }

    fn string(&mut self, text: &str) -> u16 {
        let utf8 = self.utf8(text);
        self.intern(Key::Str(text.to_string()), |_| {
            let mut p = vec![8u8];
            p.extend_from_slice(&utf8.to_be_bytes());
            p
        })
    }

    fn integer(&mut self, value: i32) -> u16 {
        self.intern(Key::Int(value), |_| {
            let mut p = vec![3u8];
            p.extend_from_slice(&value.to_be_bytes());
            p
        })
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let n = self.utf8(name);
        let d = self.utf8(descriptor);
        self.intern(Key::NameAndType(name.to_string(), descriptor.to_string()), |_| {
            let mut p = vec![12u8];
            p.extend_from_slice(&n.to_be_bytes());
            p.extend_from_slice(&d.to_be_bytes());
            p
        })
    }

    fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let c = self.class(owner);
        let nt = self.name_and_type(name, descriptor);
        let key = Key::FieldRef(owner.to_string(), name.to_string(), descriptor.to_string());
        self.intern(key, |_| {
            let mut p = vec![9u8];
            p.extend_from_slice(&c.to_be_bytes());
            p.extend_from_slice(&nt.to_be_bytes());
            p
        })
    }

    fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let c = self.class(owner);
        let nt = self.name_and_type(name, descriptor);
        let key = Key::MethodRef(owner.to_string(), name.to_string(), descriptor.to_string());
        self.intern(key, |_| {
            let mut p = vec![10u8];
            p.extend_from_slice(&c.to_be_bytes());
            p.extend_from_slice(&nt.to_be_bytes());
            p
        })
    }

    fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.count + 1).to_be_bytes());
        out.extend_from_slice(&self.bytes);
    }
}

fn attribute(pool: &mut Pool, name: &str, body: &[u8]) -> Vec<u8> {
    let name_index = pool.utf8(name);
    let mut out = Vec::with_capacity(body.len() + 6);
    out.extend_from_slice(&name_index.to_be_bytes());
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
    out
}

fn annotation_bytes(pool: &mut Pool, ann: &Ann) -> Vec<u8> {
    let mut out = Vec::new();
    let type_index = pool.utf8(&ann.descriptor);
    out.extend_from_slice(&type_index.to_be_bytes());
    out.extend_from_slice(&(ann.elements.len() as u16).to_be_bytes());
    for (name, value) in &ann.elements {
        let name_index = pool.utf8(name);
        out.extend_from_slice(&name_index.to_be_bytes());
        element_value_bytes(pool, value, &mut out);
    }
    out
}

fn element_value_bytes(pool: &mut Pool, value: &ElementValue, out: &mut Vec<u8>) {
    match value {
        ElementValue::Str(s) => {
            out.push(b's');
            let index = pool.utf8(s);
            out.extend_from_slice(&index.to_be_bytes());
        }
        ElementValue::Int(v) => {
            out.push(b'I');
            let index = pool.integer(*v);
            out.extend_from_slice(&index.to_be_bytes());
        }
        ElementValue::StrArray(items) => {
            out.push(b'[');
            out.extend_from_slice(&(items.len() as u16).to_be_bytes());
            for item in items {
                out.push(b's');
                let index = pool.utf8(item);
                out.extend_from_slice(&index.to_be_bytes());
            }
        }
        ElementValue::EnumConst { descriptor, constant } => {
            out.push(b'e');
            let type_index = pool.utf8(descriptor);
            let const_index = pool.utf8(constant);
            out.extend_from_slice(&type_index.to_be_bytes());
            out.extend_from_slice(&const_index.to_be_bytes());
        }
    }
}

fn annotation_attributes(
    pool: &mut Pool,
    annotations: &[Ann],
    param_annotations: Option<&[Vec<Ann>]>,
) -> Vec<Vec<u8>> {
    let mut attrs = Vec::new();
    if !annotations.is_empty() {
        let mut body = Vec::new();
        body.extend_from_slice(&(annotations.len() as u16).to_be_bytes());
        for ann in annotations {
            let bytes = annotation_bytes(pool, ann);
            body.extend_from_slice(&bytes);
        }
        attrs.push(attribute(pool, "RuntimeVisibleAnnotations", &body));
    }
    if let Some(per_param) = param_annotations {
        let mut body = vec![per_param.len() as u8];
        for param in per_param {
            body.extend_from_slice(&(param.len() as u16).to_be_bytes());
            for ann in param {
                let bytes = annotation_bytes(pool, ann);
                body.extend_from_slice(&bytes);
            }
        }
        attrs.push(attribute(pool, "RuntimeVisibleParameterAnnotations", &body));
    }
    attrs
}

fn assemble_field(pool: &mut Pool, field: &TestField) -> Vec<u8> {
    let name = pool.utf8(&field.name);
    let descriptor = pool.utf8(&field.descriptor);
    let mut attrs = annotation_attributes(pool, &field.annotations, None);
    if let Some(sig) = &field.signature {
        let index = pool.utf8(sig);
        attrs.push(attribute(pool, "Signature", &index.to_be_bytes()));
    }
    if let Some(value) = &field.constant_str {
        let index = pool.string(value);
        attrs.push(attribute(pool, "ConstantValue", &index.to_be_bytes()));
    }

    let mut out = Vec::new();
    out.extend_from_slice(&field.access.to_be_bytes());
    out.extend_from_slice(&name.to_be_bytes());
    out.extend_from_slice(&descriptor.to_be_bytes());
    out.extend_from_slice(&(attrs.len() as u16).to_be_bytes());
    for a in &attrs {
        out.extend_from_slice(a);
    }
    out
}

fn assemble_method(pool: &mut Pool, method: &TestMethod) -> Vec<u8> {
    let name = pool.utf8(&method.name);
    let descriptor = pool.utf8(&method.descriptor);
    let mut attrs =
        annotation_attributes(pool, &method.annotations, method.param_annotations.as_deref());
    if let Some(sig) = &method.signature {
        let index = pool.utf8(sig);
        attrs.push(attribute(pool, "Signature", &index.to_be_bytes()));
    }
    if let Some(ops) = &method.code {
        let code = assemble_code(pool, ops);
        let mut body = Vec::new();
        body.extend_from_slice(&8u16.to_be_bytes()); // max_stack
        body.extend_from_slice(&8u16.to_be_bytes()); // max_locals
        body.extend_from_slice(&(code.len() as u32).to_be_bytes());
        body.extend_from_slice(&code);
        body.extend_from_slice(&0u16.to_be_bytes()); // exception table
        body.extend_from_slice(&0u16.to_be_bytes()); // attributes
        attrs.push(attribute(pool, "Code", &body));
    }

    let mut out = Vec::new();
    out.extend_from_slice(&method.access.to_be_bytes());
    out.extend_from_slice(&name.to_be_bytes());
    out.extend_from_slice(&descriptor.to_be_bytes());
    out.extend_from_slice(&(attrs.len() as u16).to_be_bytes());
    for a in &attrs {
        out.extend_from_slice(a);
    }
    out
}

fn assemble_code(pool: &mut Pool, ops: &[Op]) -> Vec<u8> {
    let mut out = Vec::new();
    for op in ops {
        match op {
            Op::LdcStr(text) => {
                let index = pool.string(text);
                if index <= u8::MAX as u16 {
                    out.push(0x12);
                    out.push(index as u8);
                } else {
                    out.push(0x13);
                    out.extend_from_slice(&index.to_be_bytes());
                }
            }
            Op::PushInt(value) => match value {
                -1..=5 => out.push((0x03 + value) as u8),
                v if i8::try_from(*v).is_ok() => {
                    out.push(0x10);
                    out.push(*v as i8 as u8);
                }
                v if i16::try_from(*v).is_ok() => {
                    out.push(0x11);
                    out.extend_from_slice(&(*v as i16).to_be_bytes());
                }
                v => {
                    let index = pool.integer(*v);
                    if index <= u8::MAX as u16 {
                        out.push(0x12);
                        out.push(index as u8);
                    } else {
                        out.push(0x13);
                        out.extend_from_slice(&index.to_be_bytes());
                    }
                }
            },
            Op::AconstNull => out.push(0x01),
            Op::ILoad(slot) => push_load(&mut out, 0x1a, 0x15, *slot),
            Op::LLoad(slot) => push_load(&mut out, 0x1e, 0x16, *slot),
            Op::ALoad(slot) => push_load(&mut out, 0x2a, 0x19, *slot),
            Op::AStore(slot) => push_load(&mut out, 0x4b, 0x3a, *slot),
            Op::Dup => out.push(0x59),
            Op::Pop => out.push(0x57),
            Op::New(internal) => {
                let index = pool.class(internal);
                out.push(0xbb);
                out.extend_from_slice(&index.to_be_bytes());
            }
            Op::GetStatic { owner, name, descriptor } => {
                let index = pool.field_ref(owner, name, descriptor);
                out.push(0xb2);
                out.extend_from_slice(&index.to_be_bytes());
            }
            Op::InvokeVirtual { owner, name, descriptor } => {
                let index = pool.method_ref(owner, name, descriptor);
                out.push(0xb6);
                out.extend_from_slice(&index.to_be_bytes());
            }
            Op::InvokeStatic { owner, name, descriptor } => {
                let index = pool.method_ref(owner, name, descriptor);
                out.push(0xb8);
                out.extend_from_slice(&index.to_be_bytes());
            }
            Op::InvokeSpecial { owner, name, descriptor } => {
                let index = pool.method_ref(owner, name, descriptor);
                out.push(0xb7);
                out.extend_from_slice(&index.to_be_bytes());
            }
            Op::IfEq => out.extend_from_slice(&[0x99, 0, 0]),
            Op::Goto => out.extend_from_slice(&[0xa7, 0, 0]),
            Op::Areturn => out.push(0xb0),
            Op::Ireturn => out.push(0xac),
            Op::Return => out.push(0xb1),
            Op::Athrow => out.push(0xbf),
        }
    }
    out
}

fn push_load(out: &mut Vec<u8>, short_base: u8, long_op: u8, slot: u8) {
    if slot <= 3 {
        out.push(short_base + slot);
    } else {
        out.push(long_op);
        out.push(slot);
    }
}
