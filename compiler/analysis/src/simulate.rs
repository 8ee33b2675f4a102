//! The method simulator.
//!
//! A linear sweep over the instruction stream: no worklist, no basic
//! blocks. Branches appear as ordinary instruction subsequences whose side
//! effects merge into the same local slots and return element, which is a
//! deliberate over-approximation: REST-relevant state (status codes, body
//! types, media-type constants) flows along straight paths in practice.

use std::collections::BTreeMap;
use std::rc::Rc;

use classfile::{ClassResolver, Instruction, MethodRecord};
use log::debug;
use registry::{MethodPool, SummaryOutcome};
use types::wellknown;
use types::{ConstValue, Element, MethodIdentifier, TypeLattice, TypeRef};

use crate::builtins::{self, BuiltinResult};
use crate::{slot, Slot};

/// Shared references the simulator needs: the class resolver (also the
/// type lattice) and the method pool.
pub struct AnalysisEnv<'a> {
    /// The search-path resolver.
    pub resolver: &'a ClassResolver,
    /// The shared summary pool.
    pub pool: &'a MethodPool,
}

/// Simulate one method body and return its merged return element.
///
/// The result is the merge of every value observed at a `return` site (and
/// at `throw` sites whose value carries response state). A body with no
/// observable return yields an empty element of the declared return type.
pub fn simulate_method(
    env: &AnalysisEnv<'_>,
    id: &MethodIdentifier,
    instructions: &[Instruction],
) -> Element {
    Simulator::new(env, id).run(instructions)
}

/// Merge joins fall back to the enclosing method's declared return type
/// when the class hierarchy cannot answer.
struct ReturnLattice<'a> {
    resolver: &'a ClassResolver,
    declared: TypeRef,
}

impl TypeLattice for ReturnLattice<'_> {
    fn common_supertype(&self, a: &TypeRef, b: &TypeRef) -> Option<TypeRef> {
        self.resolver.common_supertype(a, b).or_else(|| Some(self.declared.clone()))
    }
}

struct Simulator<'a, 'e> {
    env: &'a AnalysisEnv<'e>,
    id: &'a MethodIdentifier,
    stack: Vec<Slot>,
    locals: BTreeMap<u16, Slot>,
    return_element: Option<Element>,
}

impl<'a, 'e> Simulator<'a, 'e> {
    fn new(env: &'a AnalysisEnv<'e>, id: &'a MethodIdentifier) -> Self {
        let mut locals = BTreeMap::new();
        let mut index: u16 = 0;
        if !id.is_static {
            locals.insert(index, slot(Element::empty(TypeRef::new(id.owner.clone()))));
            index += 1;
        }
        for param in &id.params {
            locals.insert(index, slot(Element::empty(param.clone())));
            // Longs and doubles occupy two slots.
            index += if matches!(param.name(), "long" | "double") { 2 } else { 1 };
        }
        Self { env, id, stack: Vec::new(), locals, return_element: None }
    }

    fn run(mut self, instructions: &[Instruction]) -> Element {
        for ins in instructions {
            self.step(ins);
        }
        self.return_element
            .unwrap_or_else(|| Element::empty(self.id.ret.clone()))
    }

    fn pop(&mut self) -> Slot {
        self.stack.pop().unwrap_or_else(|| {
            debug!("operand stack underflow in {}", self.id);
            slot(Element::empty(TypeRef::object()))
        })
    }

    /// Pop `n` values rightmost-first and restore declared order.
    fn pop_args(&mut self, n: usize) -> Vec<Slot> {
        let mut args: Vec<Slot> = (0..n).map(|_| self.pop()).collect();
        args.reverse();
        args
    }

    fn merge_return(&mut self, value: Element) {
        let lattice =
            ReturnLattice { resolver: self.env.resolver, declared: self.id.ret.clone() };
        match self.return_element.take() {
            Some(current) => {
                self.return_element = Some(Element::merged(value, &current, &lattice));
            }
            None => self.return_element = Some(value),
        }
    }

    fn step(&mut self, ins: &Instruction) {
        match ins {
            Instruction::Push(constant) => {
                self.stack.push(slot(Element::constant(constant.clone())));
            }
            Instruction::Load { slot: index, type_ref } => {
                let value = match self.locals.get(index) {
                    Some(existing) => Rc::clone(existing),
                    None => slot(Element::empty(type_ref.clone())),
                };
                self.stack.push(value);
            }
            Instruction::Store { slot: index, type_ref } => {
                let popped = self.pop();
                let incoming = popped.borrow().clone();
                if incoming.as_callable().is_some() {
                    // Handles are stored as copies, never merged.
                    self.locals.insert(*index, slot(incoming));
                    return;
                }
                let mut incoming = incoming;
                incoming.set_type(more_specific(type_ref, incoming.type_ref()));
                let merged = match self.locals.get(index) {
                    Some(existing) => {
                        Element::merged(existing.borrow().clone(), &incoming, self.env.resolver)
                    }
                    None => incoming,
                };
                self.locals.insert(*index, slot(merged));
            }
            Instruction::GetField { type_ref, .. } => {
                self.pop();
                self.stack.push(slot(Element::empty(type_ref.clone())));
            }
            Instruction::GetStatic { owner, name, type_ref } => {
                self.stack.push(slot(self.static_value(owner, name, type_ref)));
            }
            Instruction::New(type_ref) => {
                self.stack.push(slot(Element::empty(type_ref.clone())));
            }
            Instruction::Dup => {
                let top = match self.stack.last() {
                    Some(top) => Rc::clone(top),
                    None => slot(Element::empty(TypeRef::object())),
                };
                self.stack.push(top);
            }
            Instruction::Invoke { id, .. } => self.invoke(id),
            Instruction::InvokeDynamic { handle, dynamic } => {
                let mut bound: Vec<Element> =
                    self.pop_args(dynamic.params.len()).iter().map(|s| s.borrow().clone()).collect();
                let element = match handle {
                    Some(target) => {
                        if !target.is_static && !bound.is_empty() {
                            // The captured receiver is not a call argument.
                            bound.remove(0);
                        }
                        Element::callable(target.clone(), bound, dynamic.ret.clone())
                    }
                    None => Element::empty(dynamic.ret.clone()),
                };
                self.stack.push(slot(element));
            }
            Instruction::SizeChange { pops, pushes } | Instruction::Other { pops, pushes } => {
                for _ in 0..*pops {
                    self.pop();
                }
                for _ in 0..*pushes {
                    self.stack.push(slot(Element::empty(TypeRef::object())));
                }
            }
            Instruction::Return { pops } => {
                if *pops > 0 && !self.stack.is_empty() {
                    let value = self.pop().borrow().clone();
                    self.merge_return(value);
                }
                self.stack.clear();
            }
            Instruction::Throw => {
                // A thrown value carrying a response is treated as a
                // return; the merge runs before the stack is cleared.
                let thrown = self.stack.last().map(|top| top.borrow().clone());
                if let Some(value) = thrown {
                    if wellknown::is_response_like(value.type_ref()) || value.has_responses() {
                        self.merge_return(value);
                    }
                }
                self.stack.clear();
            }
        }
    }

    fn static_value(&self, owner: &str, name: &str, type_ref: &TypeRef) -> Element {
        // Response.Status constants are identified by their field name so
        // the status builtin can map them to numeric codes.
        if wellknown::is_status_enum_class(owner) {
            return Element::constant_typed(
                TypeRef::new(owner),
                ConstValue::Str(name.to_string()),
            );
        }
        if self.env.resolver.can_resolve(owner) {
            let record = self.env.resolver.get(owner);
            if let Some(constant) = record.find_field(name).and_then(|f| f.constant.clone()) {
                return Element::constant_typed(type_ref.clone(), constant);
            }
        }
        Element::empty(type_ref.clone())
    }

    fn invoke(&mut self, id: &MethodIdentifier) {
        let args = self.pop_args(id.params.len());
        let receiver = if id.is_static { None } else { Some(self.pop()) };

        match builtins::apply(id, receiver.as_ref(), &args) {
            BuiltinResult::Handled(Some(result)) => {
                self.stack.push(result);
                return;
            }
            BuiltinResult::Handled(None) => return,
            BuiltinResult::NotHandled => {}
        }

        // A call on a captured handle defers to the underlying method; its
        // summary is argument-independent, so the bound arguments only had
        // to survive until this point.
        if let Some(callable) =
            receiver.as_ref().and_then(|r| r.borrow().as_callable().cloned())
        {
            if let Some(element) = self.call_through_pool(&callable.target) {
                self.stack.push(slot(element));
            }
            return;
        }

        if let Some(element) = self.call_through_pool(id) {
            self.stack.push(slot(element));
        }
    }

    /// Resolve a callee through the pool; `None` for void results.
    fn call_through_pool(&self, id: &MethodIdentifier) -> Option<Element> {
        if !self.env.resolver.can_resolve(&id.owner) {
            // Unresolvable callee: an empty element of the declared return
            // type, nothing for void.
            if id.returns_void() {
                return None;
            }
            return Some(Element::empty(id.ret.clone()));
        }

        let outcome = self.env.pool.summary_or_compute(id, || interpret_callee(self.env, id));
        let element = match outcome {
            SummaryOutcome::Ready(element) => element,
            SummaryOutcome::Recursive => Element::empty(id.ret.clone()),
        };
        if id.returns_void() {
            return None;
        }
        Some(element)
    }
}

/// Simulate a callee with fresh parameter-typed values to produce its
/// cached, argument-independent summary.
fn interpret_callee(env: &AnalysisEnv<'_>, id: &MethodIdentifier) -> Element {
    match find_declaration(env.resolver, id) {
        Some((owner, method)) => match &method.instructions {
            Some(instructions) => {
                let declared = method.identifier(&owner);
                simulate_method(env, &declared, instructions)
            }
            None => Element::empty(method.ret.clone()),
        },
        None => {
            debug!("no declaration found for {}", id);
            Element::empty(id.ret.clone())
        }
    }
}

/// Locate the declaration a call site binds to, walking up the superclass
/// chain. Parameter types compare by erased name: call sites carry
/// descriptor types while records may carry generic signatures.
fn find_declaration(
    resolver: &ClassResolver,
    id: &MethodIdentifier,
) -> Option<(String, MethodRecord)> {
    for owner in resolver.superclass_chain(&id.owner) {
        let record = resolver.get(&owner);
        let found = record.methods.iter().find(|m| {
            m.name == id.name
                && m.params.len() == id.params.len()
                && m.params.iter().zip(&id.params).all(|(a, b)| a.name() == b.name())
        });
        if let Some(method) = found {
            return Some((owner, method.clone()));
        }
    }
    None
}

/// The more specific of a declared slot type and an observed value type:
/// the opcode's hint wins unless it is the uninformative `Object`.
fn more_specific(declared: &TypeRef, observed: &TypeRef) -> TypeRef {
    if declared.is_object() {
        observed.clone()
    } else {
        declared.clone()
    }
}
