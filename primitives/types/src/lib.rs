#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Core value model for the restscan analyzer.
//!
//! This crate defines the canonical type reference, the method identifier,
//! and the `Element` abstract value that the simulator pushes around its
//! operand stack, together with the merge algebra that joins values along
//! converging control-flow edges.

pub mod element;
pub mod typeref;
pub mod wellknown;

pub use element::{
    CallableElement, ConstValue, Element, HttpResponse, ValueElement, Values, VALUE_CAP,
};
pub use typeref::{ObjectLattice, TypeLattice, TypeRef};

use std::fmt;

/// Structural identity of a method: owning class, name, parameter types,
/// return type and static flag. Two identifiers are equal when all five
/// components are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodIdentifier {
    /// Canonical name of the declaring class (e.g. `pkg.Outer$Inner`).
    pub owner: String,
    /// Method name as declared (`<init>` for constructors).
    pub name: String,
    /// Declared parameter types in order.
    pub params: Vec<TypeRef>,
    /// Declared return type (`void` for void methods).
    pub ret: TypeRef,
    /// Whether the method is static (no receiver slot).
    pub is_static: bool,
}

impl MethodIdentifier {
    /// Create an instance-method identifier.
    pub fn of(owner: &str, name: &str, params: Vec<TypeRef>, ret: TypeRef) -> Self {
        Self { owner: owner.to_string(), name: name.to_string(), params, ret, is_static: false }
    }

    /// Create a static-method identifier.
    pub fn of_static(owner: &str, name: &str, params: Vec<TypeRef>, ret: TypeRef) -> Self {
        Self { owner: owner.to_string(), name: name.to_string(), params, ret, is_static: true }
    }

    /// Whether the method returns `void`.
    pub fn returns_void(&self) -> bool { self.ret.name() == "void" }

    /// Whether this is a constructor.
    pub fn is_constructor(&self) -> bool { self.name == "<init>" }
}

impl fmt::Display for MethodIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}(", self.owner, self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_equality_is_structural() {
        let a = MethodIdentifier::of(
            "pkg.Service",
            "find",
            vec![TypeRef::new("long")],
            TypeRef::new("pkg.User"),
        );
        let b = MethodIdentifier::of(
            "pkg.Service",
            "find",
            vec![TypeRef::new("long")],
            TypeRef::new("pkg.User"),
        );
        assert_eq!(a, b);

        let c = MethodIdentifier::of_static(
            "pkg.Service",
            "find",
            vec![TypeRef::new("long")],
            TypeRef::new("pkg.User"),
        );
        assert_ne!(a, c);
    }

    #[test]
    fn identifier_display() {
        let id = MethodIdentifier::of(
            "pkg.Service",
            "list",
            vec![],
            TypeRef::with_args("java.util.List", vec![TypeRef::new("pkg.User")]),
        );
        assert_eq!(id.to_string(), "pkg.Service#list() -> java.util.List<pkg.User>");
    }
}
