//! Canonical type references.
//!
//! A `TypeRef` is a canonical dotted class name (inner classes keep the `$`
//! separator, e.g. `pkg.Outer$Inner`) plus any generic type arguments that
//! were declared in a signature attribute. Erasure is never applied: a
//! reference preserves parametric information exactly as declared.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical name of the universal supertype.
pub const OBJECT: &str = "java.lang.Object";

/// Collection-like containers recognized by `is_collection`.
const COLLECTION_NAMES: &[&str] = &[
    "java.util.Collection",
    "java.util.List",
    "java.util.ArrayList",
    "java.util.LinkedList",
    "java.util.Set",
    "java.util.HashSet",
    "java.util.LinkedHashSet",
    "java.util.TreeSet",
    "java.util.SortedSet",
    "java.util.NavigableSet",
    "java.util.Queue",
    "java.util.Deque",
    "java.util.ArrayDeque",
];

/// A canonical type reference with optional generic arguments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    args: Vec<TypeRef>,
}

impl TypeRef {
    /// Create a reference without type arguments.
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), args: Vec::new() } }

    /// Create a reference carrying type arguments.
    pub fn with_args(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self { name: name.into(), args }
    }

    /// The `java.lang.Object` reference.
    pub fn object() -> Self { Self::new(OBJECT) }

    /// The `void` pseudo-reference.
    pub fn void() -> Self { Self::new("void") }

    /// Canonical name without type arguments.
    pub fn name(&self) -> &str { &self.name }

    /// Declared type arguments, outermost first.
    pub fn args(&self) -> &[TypeRef] { &self.args }

    /// Whether this reference names `java.lang.Object`.
    pub fn is_object(&self) -> bool { self.name == OBJECT }

    /// Whether this reference is the `void` pseudo-type.
    pub fn is_void(&self) -> bool { self.name == "void" }

    /// Whether the name lives in the platform namespace.
    pub fn is_platform(&self) -> bool { self.name.starts_with("java.") }

    /// Whether this is one of the recognized collection-like containers.
    /// Array references (`pkg.User[]`) count as collections.
    pub fn is_collection(&self) -> bool {
        COLLECTION_NAMES.contains(&self.name.as_str()) || self.is_array()
    }

    /// Whether this reference denotes an array type.
    pub fn is_array(&self) -> bool { self.name.ends_with("[]") }

    /// Element type of a collection or array; `java.lang.Object` when the
    /// reference was declared raw.
    pub fn element_of(&self) -> TypeRef {
        if let Some(component) = self.name.strip_suffix("[]") {
            return TypeRef::with_args(component, self.args.clone());
        }
        self.args.first().cloned().unwrap_or_else(Self::object)
    }

    /// Whether the name denotes a JVM primitive.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self.name.as_str(),
            "boolean" | "byte" | "char" | "short" | "int" | "long" | "float" | "double"
        )
    }
}

impl Default for TypeRef {
    fn default() -> Self { Self::object() }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (i, a) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", a)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

/// Query interface over the class hierarchy.
///
/// The classfile resolver implements this by walking cached superclass
/// chains; consumers that have no hierarchy at hand use [`ObjectLattice`].
pub trait TypeLattice {
    /// Most specific common supertype of `a` and `b`, or `None` when the
    /// hierarchy cannot answer (unresolvable classes).
    fn common_supertype(&self, a: &TypeRef, b: &TypeRef) -> Option<TypeRef>;

    /// Least upper bound used by the merge algebra: equal names keep the
    /// more informative reference, otherwise the hierarchy is consulted and
    /// `java.lang.Object` is the fallback.
    fn lub(&self, a: &TypeRef, b: &TypeRef) -> TypeRef {
        if a.name() == b.name() {
            if a.args().is_empty() {
                return b.clone();
            }
            return a.clone();
        }
        self.common_supertype(a, b).unwrap_or_else(TypeRef::object)
    }
}

/// The empty lattice: every query falls back to `java.lang.Object`.
pub struct ObjectLattice;

impl TypeLattice for ObjectLattice {
    fn common_supertype(&self, _a: &TypeRef, _b: &TypeRef) -> Option<TypeRef> { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_recognition_and_unwrap() {
        let list = TypeRef::with_args("java.util.List", vec![TypeRef::new("pkg.User")]);
        assert!(list.is_collection());
        assert_eq!(list.element_of(), TypeRef::new("pkg.User"));

        let raw = TypeRef::new("java.util.Set");
        assert!(raw.is_collection());
        assert_eq!(raw.element_of(), TypeRef::object());

        assert!(!TypeRef::new("pkg.User").is_collection());
    }

    #[test]
    fn display_nests_arguments() {
        let t = TypeRef::with_args(
            "java.util.Map",
            vec![
                TypeRef::new("java.lang.String"),
                TypeRef::with_args("java.util.List", vec![TypeRef::new("pkg.User")]),
            ],
        );
        assert_eq!(t.to_string(), "java.util.Map<java.lang.String, java.util.List<pkg.User>>");
    }

    #[test]
    fn object_lattice_falls_back() {
        let lub = ObjectLattice.lub(&TypeRef::new("pkg.A"), &TypeRef::new("pkg.B"));
        assert!(lub.is_object());

        let same = ObjectLattice.lub(
            &TypeRef::new("java.util.List"),
            &TypeRef::with_args("java.util.List", vec![TypeRef::new("pkg.User")]),
        );
        assert_eq!(same.args().len(), 1);
    }
}
