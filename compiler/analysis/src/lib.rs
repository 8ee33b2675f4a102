#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Abstract interpretation and type introspection.
//!
//! The [`simulate`] module walks a method's normalized instruction stream
//! over a symbolic operand stack and local-variable table, merging values on
//! control joins and aggregating response-builder state into the method's
//! return element. The [`builtins`] module supplies hand-written summaries
//! for well-known platform APIs; everything else is interpreted on demand
//! through the shared method pool. The [`introspect`] module derives
//! structural schemas for message-body types.

pub mod builtins;
pub mod introspect;
pub mod simulate;

pub use introspect::Introspector;
pub use simulate::{simulate_method, AnalysisEnv};

use std::cell::RefCell;
use std::rc::Rc;

use types::Element;

/// A stack or local slot. Slots are shared by reference so that `dup`
/// aliases observe later builder mutations.
pub type Slot = Rc<RefCell<Element>>;

/// Wrap an element into a fresh slot.
pub fn slot(element: Element) -> Slot { Rc::new(RefCell::new(element)) }
