//! Hand-written summaries for well-known platform APIs.
//!
//! The simulator consults this table before the method pool: response
//! builders aggregate status/header/entity state onto their receiver,
//! string concatenation folds constant sets, and collection factories
//! preserve element types. Everything here is keyed on canonical names so
//! both the `javax` and `jakarta` namespaces are covered.

use std::collections::BTreeSet;
use std::rc::Rc;

use types::wellknown;
use types::{ConstValue, Element, HttpResponse, MethodIdentifier, TypeRef, Values};

use crate::{slot, Slot};

/// Outcome of a builtin lookup.
pub enum BuiltinResult {
    /// The call was summarized; the payload is the pushed result (`None`
    /// for void).
    Handled(Option<Slot>),
    /// No builtin covers this method.
    NotHandled,
}

/// Apply a builtin summary for `id`, when one exists.
pub fn apply(id: &MethodIdentifier, receiver: Option<&Slot>, args: &[Slot]) -> BuiltinResult {
    if wellknown::is_response_class(&id.owner) && id.is_static {
        return response_factory(id, args);
    }
    if wellknown::is_response_builder_class(&id.owner) {
        if let Some(receiver) = receiver {
            return builder_method(id, receiver, args);
        }
    }
    match id.owner.as_str() {
        "java.lang.StringBuilder" | "java.lang.StringBuffer" => {
            if let Some(receiver) = receiver {
                return string_builder(id, receiver, args);
            }
        }
        "java.lang.String" => return string_method(id, receiver, args),
        "java.util.Collections" => return collections_factory(id, args),
        "java.util.Arrays" => return arrays_factory(id, args),
        _ => {}
    }
    // A framework exception constructed around a response carries the
    // response state, so a later `throw` surfaces it.
    if id.is_constructor() && wellknown::ws_rs_name(&id.owner).is_some() {
        if let Some(receiver) = receiver {
            let carried: Vec<HttpResponse> = args
                .iter()
                .flat_map(|a| a.borrow().responses().iter().cloned().collect::<Vec<_>>())
                .collect();
            if !carried.is_empty() {
                let mut element = receiver.borrow_mut();
                for response in carried {
                    element.add_response(response);
                }
                return BuiltinResult::Handled(None);
            }
        }
    }
    BuiltinResult::NotHandled
}

/// Status codes observable on an argument: integer constants, or
/// `Response.Status` constants identified by name.
fn statuses_of(arg: &Slot) -> BTreeSet<u16> {
    let element = arg.borrow();
    element
        .values()
        .known()
        .filter_map(|v| match v {
            ConstValue::Int(code) => u16::try_from(*code).ok(),
            ConstValue::Str(name) => wellknown::status_code_for_constant(name),
            _ => None,
        })
        .collect()
}

fn builder_slot(response_class: &str, response: HttpResponse) -> Slot {
    let mut element = Element::empty(TypeRef::new(format!("{}$ResponseBuilder", response_class)));
    element.add_response(response);
    slot(element)
}

fn response_factory(id: &MethodIdentifier, args: &[Slot]) -> BuiltinResult {
    let mut response = match id.name.as_str() {
        "status" => {
            let mut response = HttpResponse::new();
            if let Some(arg) = args.first() {
                response.statuses = statuses_of(arg);
            }
            response
        }
        "ok" => HttpResponse::with_status(200),
        "created" => HttpResponse::with_status(201),
        "accepted" => HttpResponse::with_status(202),
        "noContent" => HttpResponse::with_status(204),
        "notModified" => HttpResponse::with_status(304),
        "seeOther" => HttpResponse::with_status(303),
        "temporaryRedirect" => HttpResponse::with_status(307),
        "notAcceptable" => HttpResponse::with_status(406),
        "serverError" => HttpResponse::with_status(500),
        "fromResponse" => {
            let copied = args
                .first()
                .and_then(|a| a.borrow().responses().iter().next().cloned())
                .unwrap_or_default();
            copied
        }
        _ => return BuiltinResult::NotHandled,
    };

    // ok(entity) and accepted(entity) bind the body type immediately.
    if matches!(id.name.as_str(), "ok" | "accepted") {
        if let Some(arg) = args.first() {
            response.entity_types.insert(arg.borrow().type_ref().clone());
        }
    }
    BuiltinResult::Handled(Some(builder_slot(&id.owner, response)))
}

fn update_responses(receiver: &Slot, update: impl Fn(&mut HttpResponse)) {
    let mut element = receiver.borrow_mut();
    let value = element.as_value_mut();
    let mut set = std::mem::take(&mut value.responses);
    if set.is_empty() {
        set.insert(HttpResponse::new());
    }
    value.responses = set
        .into_iter()
        .map(|mut response| {
            update(&mut response);
            response
        })
        .collect();
}

fn builder_method(id: &MethodIdentifier, receiver: &Slot, args: &[Slot]) -> BuiltinResult {
    match id.name.as_str() {
        "status" => {
            if let Some(arg) = args.first() {
                let statuses = statuses_of(arg);
                update_responses(receiver, |r| r.statuses.extend(statuses.iter().copied()));
            }
            BuiltinResult::Handled(Some(Rc::clone(receiver)))
        }
        "entity" => {
            if let Some(arg) = args.first() {
                let entity = arg.borrow().type_ref().clone();
                update_responses(receiver, |r| {
                    r.entity_types.insert(entity.clone());
                });
            }
            BuiltinResult::Handled(Some(Rc::clone(receiver)))
        }
        "header" => {
            if let Some(arg) = args.first() {
                let names: BTreeSet<String> = arg
                    .borrow()
                    .values()
                    .known()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                update_responses(receiver, |r| r.headers.extend(names.iter().cloned()));
            }
            BuiltinResult::Handled(Some(Rc::clone(receiver)))
        }
        "build" => {
            let response_class = id.owner.trim_end_matches("$ResponseBuilder").to_string();
            let mut element = receiver.borrow().clone();
            element.set_type(TypeRef::new(response_class));
            BuiltinResult::Handled(Some(slot(element)))
        }
        // Every other builder method is a pass-through that keeps the
        // chain going.
        _ => BuiltinResult::Handled(Some(Rc::clone(receiver))),
    }
}

fn text_of(value: &ConstValue) -> String {
    match value {
        ConstValue::Str(s) => s.clone(),
        ConstValue::Int(v) => v.to_string(),
        ConstValue::Float(bits) => f64::from_bits(*bits).to_string(),
        ConstValue::Null => "null".to_string(),
        ConstValue::Class(t) => t.name().to_string(),
    }
}

/// Concatenate every combination of two constant sets, bounded by the
/// value cap.
fn concat_values(left: &Values, right: &Values) -> Values {
    let (Values::Known(a), Values::Known(b)) = (left, right) else { return Values::None };
    let mut out = Values::None;
    for prefix in a {
        for suffix in b {
            out.insert(ConstValue::Str(format!("{}{}", text_of(prefix), text_of(suffix))));
        }
    }
    out
}

fn string_builder(id: &MethodIdentifier, receiver: &Slot, args: &[Slot]) -> BuiltinResult {
    match id.name.as_str() {
        "<init>" => {
            let seed = match args.first() {
                None => Values::singleton(ConstValue::Str(String::new())),
                Some(arg) if arg.borrow().type_ref().name() == "int" => {
                    // Capacity constructor: still an empty buffer.
                    Values::singleton(ConstValue::Str(String::new()))
                }
                Some(arg) => arg.borrow().values().clone(),
            };
            let mut element = receiver.borrow_mut();
            let value = element.as_value_mut();
            value.type_ref = TypeRef::new(id.owner.clone());
            value.values = seed;
            BuiltinResult::Handled(None)
        }
        "append" => {
            if let Some(arg) = args.first() {
                let appended = concat_values(receiver.borrow().values(), arg.borrow().values());
                receiver.borrow_mut().as_value_mut().values = appended;
            }
            BuiltinResult::Handled(Some(Rc::clone(receiver)))
        }
        "toString" => {
            let mut element = Element::empty(TypeRef::new("java.lang.String"));
            element.as_value_mut().values = receiver.borrow().values().clone();
            BuiltinResult::Handled(Some(slot(element)))
        }
        _ => BuiltinResult::NotHandled,
    }
}

fn string_method(
    id: &MethodIdentifier,
    receiver: Option<&Slot>,
    args: &[Slot],
) -> BuiltinResult {
    match (id.name.as_str(), receiver) {
        ("concat", Some(receiver)) => {
            let Some(arg) = args.first() else { return BuiltinResult::NotHandled };
            let mut element = Element::empty(TypeRef::new("java.lang.String"));
            element.as_value_mut().values =
                concat_values(receiver.borrow().values(), arg.borrow().values());
            BuiltinResult::Handled(Some(slot(element)))
        }
        ("valueOf", None) => {
            let mut element = Element::empty(TypeRef::new("java.lang.String"));
            if let Some(arg) = args.first() {
                let mut out = Values::None;
                for value in arg.borrow().values().known() {
                    out.insert(ConstValue::Str(text_of(value)));
                }
                element.as_value_mut().values = out;
            }
            BuiltinResult::Handled(Some(slot(element)))
        }
        _ => BuiltinResult::NotHandled,
    }
}

fn collections_factory(id: &MethodIdentifier, args: &[Slot]) -> BuiltinResult {
    match id.name.as_str() {
        "singletonList" => BuiltinResult::Handled(Some(slot(Element::empty(TypeRef::with_args(
            "java.util.List",
            vec![args.first().map(|a| a.borrow().type_ref().clone()).unwrap_or_default()],
        ))))),
        "singleton" => BuiltinResult::Handled(Some(slot(Element::empty(TypeRef::with_args(
            "java.util.Set",
            vec![args.first().map(|a| a.borrow().type_ref().clone()).unwrap_or_default()],
        ))))),
        "emptyList" => {
            BuiltinResult::Handled(Some(slot(Element::empty(TypeRef::new("java.util.List")))))
        }
        "emptySet" => {
            BuiltinResult::Handled(Some(slot(Element::empty(TypeRef::new("java.util.Set")))))
        }
        // The wrapper keeps the wrapped collection's type arguments.
        "unmodifiableList" | "unmodifiableSet" | "unmodifiableCollection" => match args.first() {
            Some(arg) => BuiltinResult::Handled(Some(Rc::clone(arg))),
            None => BuiltinResult::NotHandled,
        },
        _ => BuiltinResult::NotHandled,
    }
}

fn arrays_factory(id: &MethodIdentifier, args: &[Slot]) -> BuiltinResult {
    if id.name != "asList" {
        return BuiltinResult::NotHandled;
    }
    let element_type = args
        .first()
        .map(|a| a.borrow().type_ref().clone())
        .filter(TypeRef::is_array)
        .map(|t| t.element_of());
    let list = match element_type {
        Some(t) => TypeRef::with_args("java.util.List", vec![t]),
        None => TypeRef::new("java.util.List"),
    };
    BuiltinResult::Handled(Some(slot(Element::empty(list))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_id(name: &str, params: Vec<TypeRef>, is_static: bool) -> MethodIdentifier {
        let owner = "javax.ws.rs.core.Response";
        let ret = TypeRef::new("javax.ws.rs.core.Response$ResponseBuilder");
        if is_static {
            MethodIdentifier::of_static(owner, name, params, ret)
        } else {
            MethodIdentifier::of(owner, name, params, ret)
        }
    }

    fn builder_id(name: &str, params: Vec<TypeRef>) -> MethodIdentifier {
        MethodIdentifier::of(
            "javax.ws.rs.core.Response$ResponseBuilder",
            name,
            params,
            TypeRef::new("javax.ws.rs.core.Response$ResponseBuilder"),
        )
    }

    #[test]
    fn status_factory_attaches_the_literal_code() {
        let id = response_id("status", vec![TypeRef::new("int")], true);
        let arg = slot(Element::constant(ConstValue::Int(201)));
        let BuiltinResult::Handled(Some(result)) = apply(&id, None, &[arg]) else {
            panic!("status must be summarized")
        };
        let element = result.borrow();
        let response = element.responses().iter().next().expect("one aggregate");
        assert_eq!(response.statuses, BTreeSet::from([201]));
    }

    #[test]
    fn status_enum_constant_maps_to_code() {
        let id = response_id(
            "status",
            vec![TypeRef::new("javax.ws.rs.core.Response$Status")],
            true,
        );
        let arg = slot(Element::constant_typed(
            TypeRef::new("javax.ws.rs.core.Response$Status"),
            ConstValue::Str("NOT_FOUND".to_string()),
        ));
        let BuiltinResult::Handled(Some(result)) = apply(&id, None, &[arg]) else {
            panic!("status must be summarized")
        };
        let element = result.borrow();
        assert!(element.responses().iter().next().expect("aggregate").statuses.contains(&404));
    }

    #[test]
    fn entity_and_build_chain_through_the_receiver() {
        let status = response_id("status", vec![TypeRef::new("int")], true);
        let arg = slot(Element::constant(ConstValue::Int(201)));
        let BuiltinResult::Handled(Some(builder)) = apply(&status, None, &[arg]) else {
            panic!("status must be summarized")
        };

        let entity = builder_id("entity", vec![TypeRef::object()]);
        let body = slot(Element::empty(TypeRef::new("pkg.User")));
        let BuiltinResult::Handled(Some(chained)) = apply(&entity, Some(&builder), &[body]) else {
            panic!("entity must be summarized")
        };
        assert!(Rc::ptr_eq(&builder, &chained));

        let build = MethodIdentifier::of(
            "javax.ws.rs.core.Response$ResponseBuilder",
            "build",
            vec![],
            TypeRef::new("javax.ws.rs.core.Response"),
        );
        let BuiltinResult::Handled(Some(response)) = apply(&build, Some(&builder), &[]) else {
            panic!("build must be summarized")
        };
        let element = response.borrow();
        assert_eq!(element.type_ref().name(), "javax.ws.rs.core.Response");
        let aggregate = element.responses().iter().next().expect("aggregate");
        assert_eq!(aggregate.statuses, BTreeSet::from([201]));
        assert!(aggregate.entity_types.contains(&TypeRef::new("pkg.User")));
    }

    #[test]
    fn string_builder_folds_constants() {
        let receiver = slot(Element::empty(TypeRef::new("java.lang.StringBuilder")));
        let init = MethodIdentifier::of(
            "java.lang.StringBuilder",
            "<init>",
            vec![],
            TypeRef::void(),
        );
        assert!(matches!(apply(&init, Some(&receiver), &[]), BuiltinResult::Handled(None)));

        let append = MethodIdentifier::of(
            "java.lang.StringBuilder",
            "append",
            vec![TypeRef::new("java.lang.String")],
            TypeRef::new("java.lang.StringBuilder"),
        );
        let hello = slot(Element::constant(ConstValue::Str("users/".to_string())));
        apply(&append, Some(&receiver), &[hello]);
        let seven = slot(Element::constant(ConstValue::Int(7)));
        apply(&append, Some(&receiver), &[seven]);

        let to_string = MethodIdentifier::of(
            "java.lang.StringBuilder",
            "toString",
            vec![],
            TypeRef::new("java.lang.String"),
        );
        let BuiltinResult::Handled(Some(result)) = apply(&to_string, Some(&receiver), &[]) else {
            panic!("toString must be summarized")
        };
        let element = result.borrow();
        let strings: Vec<_> = element.values().known().filter_map(|v| v.as_str()).collect();
        assert_eq!(strings, vec!["users/7"]);
    }

    #[test]
    fn singleton_list_preserves_the_element_type() {
        let id = MethodIdentifier::of_static(
            "java.util.Collections",
            "singletonList",
            vec![TypeRef::object()],
            TypeRef::new("java.util.List"),
        );
        let arg = slot(Element::empty(TypeRef::new("pkg.User")));
        let BuiltinResult::Handled(Some(result)) = apply(&id, None, &[arg]) else {
            panic!("singletonList must be summarized")
        };
        assert_eq!(result.borrow().type_ref().element_of(), TypeRef::new("pkg.User"));
    }
}
