//! Abstract values and the merge algebra.
//!
//! An [`Element`] is the unit of abstract value on the simulator's operand
//! stack and local-variable table: a carrier type, the set of concrete
//! constants observed on that slot, and the response-builder aggregates the
//! slot may carry. A [`CallableElement`] is the specialization used for
//! deferred calls captured by `invokedynamic`.
//!
//! Merge is commutative, associative and idempotent. Each `HttpResponse`
//! aggregate keeps its identity under merge (the sets are unioned, the
//! aggregates themselves are not folded together), so responses built on
//! distinct branches never bleed status codes or entity types into each
//! other.

use std::collections::BTreeSet;
use std::fmt;

use crate::typeref::{TypeLattice, TypeRef};
use crate::MethodIdentifier;

/// Upper bound on a concrete-value set. Exceeding it collapses the set to
/// [`Values::Overflow`], observable as an empty set with preserved type.
pub const VALUE_CAP: usize = 32;

/// An immutable constant observed on a stack or local slot.
///
/// Floating constants are stored as IEEE-754 bit patterns so the set can be
/// totally ordered.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstValue {
    /// The `null` reference.
    Null,
    /// An integral constant (`int` and `long` alike).
    Int(i64),
    /// A floating constant (`float` widened to `double`), as raw bits.
    Float(u64),
    /// A string constant.
    Str(String),
    /// A class literal.
    Class(TypeRef),
}

impl ConstValue {
    /// Build a floating constant from an `f64`.
    pub fn float(v: f64) -> Self { Self::Float(v.to_bits()) }

    /// The floating value, when this is a [`ConstValue::Float`].
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }

    /// The integral value, when this is a [`ConstValue::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The string value, when this is a [`ConstValue::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Runtime type of the constant.
    pub fn runtime_type(&self) -> TypeRef {
        match self {
            Self::Null => TypeRef::object(),
            Self::Int(_) => TypeRef::new("int"),
            Self::Float(_) => TypeRef::new("double"),
            Self::Str(_) => TypeRef::new("java.lang.String"),
            Self::Class(_) => TypeRef::new("java.lang.Class"),
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Self::Str(s) => write!(f, "{:?}", s),
            Self::Class(t) => write!(f, "{}.class", t),
        }
    }
}

/// The three-state concrete-value set of an element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Values {
    /// Nothing observed yet.
    #[default]
    None,
    /// The exact set of constants observed.
    Known(BTreeSet<ConstValue>),
    /// The cap was exceeded; only the type is trusted from here on.
    Overflow,
}

impl Values {
    /// A set holding a single constant.
    pub fn singleton(v: ConstValue) -> Self { Self::Known(BTreeSet::from([v])) }

    /// Insert one constant, collapsing on cap overflow.
    pub fn insert(&mut self, v: ConstValue) {
        match self {
            Self::None => *self = Self::singleton(v),
            Self::Known(set) => {
                set.insert(v);
                if set.len() > VALUE_CAP {
                    *self = Self::Overflow;
                }
            }
            Self::Overflow => {}
        }
    }

    /// Merge another set into this one. Merging `None` with a non-`None`
    /// set yields the non-`None` set; overflow is absorbing.
    pub fn merge(&mut self, other: &Values) {
        match (&mut *self, other) {
            (_, Values::None) => {}
            (Values::None, v) => *self = v.clone(),
            (Values::Overflow, _) | (_, Values::Overflow) => *self = Values::Overflow,
            (Values::Known(a), Values::Known(b)) => {
                a.extend(b.iter().cloned());
                if a.len() > VALUE_CAP {
                    *self = Values::Overflow;
                }
            }
        }
    }

    /// The observed constants. Empty for `None` and for `Overflow` (the cap
    /// makes overflow observable as an empty set).
    pub fn known(&self) -> impl Iterator<Item = &ConstValue> {
        match self {
            Self::Known(set) => Some(set.iter()),
            _ => None,
        }
        .into_iter()
        .flatten()
    }

    /// Number of observed constants (0 after overflow).
    pub fn len(&self) -> usize {
        match self {
            Self::Known(set) => set.len(),
            _ => 0,
        }
    }

    /// Whether no constants are observable.
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Aggregated response-builder state: the status codes, header names and
/// entity types attached to one builder value during simulation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct HttpResponse {
    /// Status codes set on this builder.
    pub statuses: BTreeSet<u16>,
    /// Header names declared on this builder.
    pub headers: BTreeSet<String>,
    /// Entity (body) types bound to this builder.
    pub entity_types: BTreeSet<TypeRef>,
}

impl HttpResponse {
    /// An aggregate with no recorded state.
    pub fn new() -> Self { Self::default() }

    /// An aggregate carrying a single status code.
    pub fn with_status(status: u16) -> Self {
        Self { statuses: BTreeSet::from([status]), ..Self::default() }
    }
}

/// A plain abstract value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueElement {
    /// Carrier type, always the least upper bound of everything merged in.
    pub type_ref: TypeRef,
    /// Concrete constants observed on this slot.
    pub values: Values,
    /// Response aggregates carried by this slot.
    pub responses: BTreeSet<HttpResponse>,
}

/// A deferred call captured on the stack (`invokedynamic` result). Invoking
/// it produces the same result as invoking the underlying method directly
/// with the bound arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableElement {
    /// The method the callable defers to.
    pub target: MethodIdentifier,
    /// Arguments captured at the instantiation site.
    pub bound: Vec<Element>,
    /// The functional-interface type of the callable value.
    pub type_ref: TypeRef,
}

/// The unit of abstract value: a plain element or a captured callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// A plain value.
    Value(ValueElement),
    /// A deferred call.
    Callable(CallableElement),
}

impl Element {
    /// Fresh empty element of the given type.
    pub fn empty(type_ref: TypeRef) -> Self {
        Self::Value(ValueElement { type_ref, values: Values::None, responses: BTreeSet::new() })
    }

    /// Element holding one constant, typed by the constant's runtime type.
    pub fn constant(value: ConstValue) -> Self {
        let type_ref = value.runtime_type();
        Self::constant_typed(type_ref, value)
    }

    /// Element holding one constant with an explicit carrier type.
    pub fn constant_typed(type_ref: TypeRef, value: ConstValue) -> Self {
        Self::Value(ValueElement {
            type_ref,
            values: Values::singleton(value),
            responses: BTreeSet::new(),
        })
    }

    /// A captured callable.
    pub fn callable(target: MethodIdentifier, bound: Vec<Element>, type_ref: TypeRef) -> Self {
        Self::Callable(CallableElement { target, bound, type_ref })
    }

    /// Carrier type of the element.
    pub fn type_ref(&self) -> &TypeRef {
        match self {
            Self::Value(v) => &v.type_ref,
            Self::Callable(c) => &c.type_ref,
        }
    }

    /// Replace the carrier type.
    pub fn set_type(&mut self, type_ref: TypeRef) {
        match self {
            Self::Value(v) => v.type_ref = type_ref,
            Self::Callable(c) => c.type_ref = type_ref,
        }
    }

    /// The concrete-value set (empty for callables).
    pub fn values(&self) -> &Values {
        static NONE: Values = Values::None;
        match self {
            Self::Value(v) => &v.values,
            Self::Callable(_) => &NONE,
        }
    }

    /// Response aggregates carried by this element.
    pub fn responses(&self) -> &BTreeSet<HttpResponse> {
        static EMPTY: BTreeSet<HttpResponse> = BTreeSet::new();
        match self {
            Self::Value(v) => &v.responses,
            Self::Callable(_) => &EMPTY,
        }
    }

    /// Whether any response aggregate is attached.
    pub fn has_responses(&self) -> bool { !self.responses().is_empty() }

    /// Attach a response aggregate.
    pub fn add_response(&mut self, response: HttpResponse) {
        if let Self::Value(v) = self {
            v.responses.insert(response);
        }
    }

    /// Mutable access to the value payload, degrading a callable first.
    pub fn as_value_mut(&mut self) -> &mut ValueElement {
        if let Self::Callable(c) = self {
            *self = Self::empty(c.type_ref.clone());
        }
        match self {
            Self::Value(v) => v,
            Self::Callable(_) => unreachable!("degraded above"),
        }
    }

    /// The callable payload, when this element is one.
    pub fn as_callable(&self) -> Option<&CallableElement> {
        match self {
            Self::Callable(c) => Some(c),
            Self::Value(_) => None,
        }
    }

    /// Merge `other` into this element.
    ///
    /// Concrete-value sets union (bounded by [`VALUE_CAP`]), response
    /// aggregates union as sets, and the type becomes the least upper bound
    /// under `lattice`. Two identical callables stay a callable; any other
    /// combination involving a callable degrades to a plain value.
    pub fn merge(&mut self, other: &Element, lattice: &dyn TypeLattice) {
        match (&mut *self, other) {
            (Element::Callable(a), Element::Callable(b)) if *a == *b => {}
            (Element::Value(a), Element::Value(b)) => {
                a.type_ref = lattice.lub(&a.type_ref, &b.type_ref);
                a.values.merge(&b.values);
                a.responses.extend(b.responses.iter().cloned());
            }
            (a, b) => {
                // A callable met something else: keep only what both sides
                // can represent.
                let ty = lattice.lub(a.type_ref(), b.type_ref());
                let mut merged = ValueElement { type_ref: ty, ..ValueElement::default() };
                for side in [&*a, b] {
                    if let Element::Value(v) = side {
                        merged.values.merge(&v.values);
                        merged.responses.extend(v.responses.iter().cloned());
                    }
                }
                *a = Element::Value(merged);
            }
        }
    }

    /// Merge two elements into a fresh one.
    pub fn merged(mut a: Element, b: &Element, lattice: &dyn TypeLattice) -> Element {
        a.merge(b, lattice);
        a
    }
}
