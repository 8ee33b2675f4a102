//! Structural schema derivation.
//!
//! Given a type reference resolvable from the search path, the introspector
//! computes the field/property tree rendered by the backends. Platform
//! types map to primitive leaves through a fixed table, collections and
//! arrays unwrap to their element type, enums become strings, and
//! everything else is walked as an object honoring the class's declared
//! access mode. Introspection is deterministic: the same reference always
//! yields the same schema.

use std::collections::HashMap;
use std::sync::Mutex;

use classfile::{
    ClassRecord, ClassResolver, FieldAccess, FieldRecord, MethodAccess, MethodRecord,
};
use log::debug;
use model::{PrimitiveKind, Schema};
use types::wellknown;
use types::TypeRef;

/// Member-selection policy, read from the class's `XmlAccessorType`
/// annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessMode {
    Field,
    Property,
    PublicMember,
    None,
}

impl AccessMode {
    fn from_record(record: &ClassRecord) -> Self {
        let declared = record
            .annotations
            .iter()
            .find(|a| wellknown::xml_bind_name(&a.type_name) == Some("XmlAccessorType"))
            .and_then(|a| a.values.get("value"))
            .and_then(|v| match v {
                classfile::AnnotationValue::EnumConst { constant, .. } => Some(constant.as_str()),
                _ => None,
            });
        match declared {
            Some("FIELD") => Self::Field,
            Some("PROPERTY") => Self::Property,
            Some("NONE") => Self::None,
            _ => Self::PublicMember,
        }
    }
}

/// The type introspector. The schema cache is write-once per reference and
/// shared across the whole analysis run.
pub struct Introspector<'a> {
    resolver: &'a ClassResolver,
    cache: Mutex<HashMap<TypeRef, Schema>>,
}

impl<'a> Introspector<'a> {
    /// An introspector over the given search path.
    pub fn new(resolver: &'a ClassResolver) -> Self {
        Self { resolver, cache: Mutex::new(HashMap::new()) }
    }

    /// The structural schema of `type_ref`.
    pub fn introspect(&self, type_ref: &TypeRef) -> Schema {
        if let Some(cached) = self.lock().get(type_ref).cloned() {
            return cached;
        }
        let mut visited = Vec::new();
        let schema = self.walk(type_ref, &mut visited);
        // Write-once: a racing computation produced the same schema.
        self.lock().entry(type_ref.clone()).or_insert_with(|| schema.clone());
        schema
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TypeRef, Schema>> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn walk(&self, type_ref: &TypeRef, visited: &mut Vec<TypeRef>) -> Schema {
        if type_ref.is_collection() {
            let element = type_ref.element_of();
            return Schema::Array(Box::new(self.walk(&element, visited)));
        }
        if let Some(primitive) = primitive_for(type_ref.name()) {
            return Schema::Primitive(primitive);
        }
        if type_ref.is_platform() && !self.resolver.can_resolve(type_ref.name()) {
            // An unrecognized platform type with no record on the search
            // path has no structure to offer.
            return Schema::empty_object();
        }

        let record = self.resolver.get(type_ref.name());
        if record.synthetic {
            debug!("introspecting unresolvable type {} as empty object", type_ref.name());
            return Schema::empty_object();
        }
        if record.is_enum() {
            return Schema::Primitive(PrimitiveKind::String);
        }

        if visited.contains(type_ref) {
            // Cycle sentinel.
            return Schema::empty_object();
        }
        visited.push(type_ref.clone());

        let mode = AccessMode::from_record(record.as_ref());
        let mut properties = Vec::new();
        for field in &record.fields {
            if field_relevant(field, mode) {
                properties.push((field.name.clone(), self.walk(&field.type_ref, visited)));
            }
        }
        for method in &record.methods {
            if let Some(property) = getter_property(method, mode) {
                properties.push((property, self.walk(&method.ret, visited)));
            }
        }

        visited.pop();
        Schema::object(properties)
    }
}

fn primitive_for(name: &str) -> Option<PrimitiveKind> {
    let kind = match name {
        "java.lang.String" | "java.util.UUID" | "char" | "java.lang.Character" => {
            PrimitiveKind::String
        }
        "java.util.Date" => PrimitiveKind::Date,
        "int" | "long" | "byte" | "short" | "java.lang.Integer" | "java.lang.Long"
        | "java.lang.Byte" | "java.lang.Short" | "java.math.BigInteger" => PrimitiveKind::Integer,
        "float" | "double" | "java.lang.Float" | "java.lang.Double" | "java.math.BigDecimal" => {
            PrimitiveKind::Number
        }
        "boolean" | "java.lang.Boolean" => PrimitiveKind::Boolean,
        name if name.starts_with("java.time.") => PrimitiveKind::Date,
        _ => return None,
    };
    Some(kind)
}

fn has_xml_element(annotations: &[classfile::Annotation]) -> bool {
    annotations.iter().any(|a| wellknown::xml_bind_name(&a.type_name) == Some("XmlElement"))
}

fn has_xml_transient(annotations: &[classfile::Annotation]) -> bool {
    annotations.iter().any(|a| wellknown::xml_bind_name(&a.type_name) == Some("XmlTransient"))
}

fn field_relevant(field: &FieldRecord, mode: AccessMode) -> bool {
    if has_xml_element(&field.annotations) {
        return true;
    }
    if has_xml_transient(&field.annotations) || field.access.contains(FieldAccess::STATIC) {
        return false;
    }
    match mode {
        AccessMode::Field => !field.access.contains(FieldAccess::TRANSIENT),
        AccessMode::PublicMember => field.access.contains(FieldAccess::PUBLIC),
        AccessMode::Property | AccessMode::None => false,
    }
}

/// The property name of a relevant getter, when the method is one.
fn getter_property(method: &MethodRecord, mode: AccessMode) -> Option<String> {
    if method.access.contains(MethodAccess::STATIC) || !method.params.is_empty() {
        return None;
    }
    if wellknown::GETTER_BLACKLIST.contains(&method.name.as_str()) {
        return None;
    }

    let stem = if let Some(stem) = method.name.strip_prefix("get") {
        if method.ret.is_void() {
            return None;
        }
        stem
    } else if let Some(stem) = method.name.strip_prefix("is") {
        if !matches!(method.ret.name(), "boolean" | "java.lang.Boolean") {
            return None;
        }
        stem
    } else {
        return None;
    };
    // A getter stem starts with an upper-case letter.
    let first = stem.chars().next().filter(|c| c.is_uppercase())?;

    let relevant = has_xml_element(&method.annotations)
        || match mode {
            AccessMode::Property => !has_xml_transient(&method.annotations),
            AccessMode::PublicMember => {
                method.access.contains(MethodAccess::PUBLIC)
                    && !has_xml_transient(&method.annotations)
            }
            AccessMode::Field | AccessMode::None => false,
        };
    if !relevant {
        return None;
    }

    let mut property = first.to_lowercase().to_string();
    property.push_str(&stem[first.len_utf8()..]);
    Some(property)
}
