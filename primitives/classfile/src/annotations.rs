//! Runtime-visible annotation decoding.
//!
//! Annotations arrive as raw attribute bytes (`RuntimeVisibleAnnotations`,
//! `RuntimeVisibleParameterAnnotations`); this module decodes them against
//! the constant pool into a name → value map keyed by the annotation's
//! canonical type name.

use std::collections::BTreeMap;

use nom::number::complete::{be_u16, be_u8};
use nom::IResult;
use types::{ConstValue, TypeRef};

use crate::constant_pool::{Constant, ConstantPool};
use crate::signature::parse_field_descriptor;
use crate::{ClassError, Result};

/// A decoded annotation element value.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    /// A primitive or string constant.
    Const(ConstValue),
    /// An enum constant.
    EnumConst {
        /// Canonical name of the enum type.
        type_name: String,
        /// Constant name.
        constant: String,
    },
    /// A class literal.
    ClassRef(TypeRef),
    /// A nested annotation.
    Nested(Annotation),
    /// An array of values.
    Array(Vec<AnnotationValue>),
}

impl AnnotationValue {
    /// The string payload, unwrapping single-element arrays.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Const(ConstValue::Str(s)) => Some(s),
            Self::Array(items) if items.len() == 1 => items[0].as_str(),
            _ => None,
        }
    }

    /// The value as a list of strings (a scalar counts as one entry).
    pub fn string_list(&self) -> Vec<String> {
        match self {
            Self::Const(ConstValue::Str(s)) => vec![s.clone()],
            Self::Array(items) => items.iter().flat_map(|v| v.string_list()).collect(),
            _ => Vec::new(),
        }
    }
}

/// A decoded runtime-visible annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Canonical type name (`javax.ws.rs.Path`).
    pub type_name: String,
    /// Element values by element name.
    pub values: BTreeMap<String, AnnotationValue>,
}

impl Annotation {
    /// The `value` element's string payload, the common single-element case.
    pub fn string_value(&self) -> Option<&str> {
        self.values.get("value").and_then(AnnotationValue::as_str)
    }

    /// The `value` element as a string list.
    pub fn string_values(&self) -> Vec<String> {
        self.values.get("value").map(AnnotationValue::string_list).unwrap_or_default()
    }
}

/// Decode a `RuntimeVisibleAnnotations` attribute body.
pub fn parse_annotations(pool: &ConstantPool, body: &[u8]) -> Result<Vec<Annotation>> {
    let (rest, list) = annotations(pool, body).map_err(|_| malformed(body))?;
    if !rest.is_empty() {
        return Err(malformed(body));
    }
    Ok(list)
}

/// Decode a `RuntimeVisibleParameterAnnotations` attribute body: one
/// annotation list per declared parameter.
pub fn parse_parameter_annotations(pool: &ConstantPool, body: &[u8]) -> Result<Vec<Vec<Annotation>>> {
    let (input, num_params) = be_u8::<_, nom::error::Error<&[u8]>>(body).map_err(|_| malformed(body))?;
    let mut input = input;
    let mut per_param = Vec::with_capacity(num_params as usize);
    for _ in 0..num_params {
        let (rest, list) = annotations(pool, input).map_err(|_| malformed(body))?;
        per_param.push(list);
        input = rest;
    }
    if !input.is_empty() {
        return Err(malformed(body));
    }
    Ok(per_param)
}

fn malformed(body: &[u8]) -> ClassError {
    ClassError::Malformed(format!("annotation attribute ({} bytes)", body.len()))
}

type PIn<'a> = &'a [u8];
type PErr<'a> = nom::error::Error<PIn<'a>>;

fn annotations<'a>(pool: &ConstantPool, input: PIn<'a>) -> IResult<PIn<'a>, Vec<Annotation>> {
    let (mut input, num) = be_u16::<_, PErr<'a>>(input)?;
    let mut list = Vec::with_capacity(num as usize);
    for _ in 0..num {
        let (rest, ann) = annotation(pool, input)?;
        list.push(ann);
        input = rest;
    }
    Ok((input, list))
}

fn annotation<'a>(pool: &ConstantPool, input: PIn<'a>) -> IResult<PIn<'a>, Annotation> {
    let (input, type_index) = be_u16::<_, PErr<'a>>(input)?;
    let (mut input, num_pairs) = be_u16::<_, PErr<'a>>(input)?;

    let type_name = pool
        .utf8(type_index)
        .ok()
        .and_then(|d| parse_field_descriptor(d).ok())
        .map(|t| t.name().to_string())
        .ok_or_else(|| fail(input))?;

    let mut values = BTreeMap::new();
    for _ in 0..num_pairs {
        let (rest, name_index) = be_u16::<_, PErr<'a>>(input)?;
        let (rest, value) = element_value(pool, rest)?;
        let name = pool.utf8(name_index).map_err(|_| fail(input))?;
        values.insert(name.to_string(), value);
        input = rest;
    }
    Ok((input, Annotation { type_name, values }))
}

fn element_value<'a>(pool: &ConstantPool, input: PIn<'a>) -> IResult<PIn<'a>, AnnotationValue> {
    let (input, tag) = be_u8::<_, PErr<'a>>(input)?;
    match tag {
        b'B' | b'C' | b'I' | b'S' | b'Z' | b'J' | b'F' | b'D' => {
            let (input, index) = be_u16::<_, PErr<'a>>(input)?;
            let value = match pool.get(index).map_err(|_| fail(input))? {
                Constant::Integer(v) => ConstValue::Int(*v as i64),
                Constant::Long(v) => ConstValue::Int(*v),
                Constant::Float(v) => ConstValue::float(*v as f64),
                Constant::Double(v) => ConstValue::float(*v),
                _ => return Err(fail(input)),
            };
            Ok((input, AnnotationValue::Const(value)))
        }
        b's' => {
            let (input, index) = be_u16::<_, PErr<'a>>(input)?;
            let text = pool.utf8(index).map_err(|_| fail(input))?;
            Ok((input, AnnotationValue::Const(ConstValue::Str(text.to_string()))))
        }
        b'e' => {
            let (input, type_index) = be_u16::<_, PErr<'a>>(input)?;
            let (input, const_index) = be_u16::<_, PErr<'a>>(input)?;
            let type_name = pool
                .utf8(type_index)
                .ok()
                .and_then(|d| parse_field_descriptor(d).ok())
                .map(|t| t.name().to_string())
                .ok_or_else(|| fail(input))?;
            let constant = pool.utf8(const_index).map_err(|_| fail(input))?.to_string();
            Ok((input, AnnotationValue::EnumConst { type_name, constant }))
        }
        b'c' => {
            let (input, index) = be_u16::<_, PErr<'a>>(input)?;
            let descriptor = pool.utf8(index).map_err(|_| fail(input))?;
            let type_ref = parse_field_descriptor(descriptor).map_err(|_| fail(input))?;
            Ok((input, AnnotationValue::ClassRef(type_ref)))
        }
        b'@' => {
            let (input, nested) = annotation(pool, input)?;
            Ok((input, AnnotationValue::Nested(nested)))
        }
        b'[' => {
            let (mut input, num) = be_u16::<_, PErr<'a>>(input)?;
            let mut items = Vec::with_capacity(num as usize);
            for _ in 0..num {
                let (rest, item) = element_value(pool, input)?;
                items.push(item);
                input = rest;
            }
            Ok((input, AnnotationValue::Array(items)))
        }
        _ => Err(fail(input)),
    }
}

fn fail(input: PIn<'_>) -> nom::Err<PErr<'_>> {
    nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Verify))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> ConstantPool {
        ConstantPool::new(vec![
            Constant::Utf8("Ljavax/ws/rs/Path;".to_string()),
            Constant::Utf8("value".to_string()),
            Constant::Utf8("users".to_string()),
            Constant::Utf8("Ljavax/ws/rs/Produces;".to_string()),
            Constant::Utf8("application/json".to_string()),
        ])
    }

    #[test]
    fn single_string_element() {
        // @Path("users"): type 1, 1 pair, name 2, tag 's', utf8 3.
        let body = [0, 1, 0, 1, 0, 1, 0, 2, b's', 0, 3];
        let anns = parse_annotations(&pool(), &body).expect("annotations");
        assert_eq!(anns.len(), 1);
        assert_eq!(anns[0].type_name, "javax.ws.rs.Path");
        assert_eq!(anns[0].string_value(), Some("users"));
    }

    #[test]
    fn string_array_element() {
        // @Produces({"application/json"}): tag '[' with one 's' item.
        let body = [0, 1, 0, 4, 0, 1, 0, 2, b'[', 0, 1, b's', 0, 5];
        let anns = parse_annotations(&pool(), &body).expect("annotations");
        assert_eq!(anns[0].string_values(), vec!["application/json".to_string()]);
        assert_eq!(anns[0].string_value(), Some("application/json"));
    }

    #[test]
    fn truncated_attribute_is_malformed() {
        let body = [0, 1, 0, 1];
        assert!(parse_annotations(&pool(), &body).is_err());
    }
}
