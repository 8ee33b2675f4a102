//! Descriptor and generic-signature decoding.
//!
//! Field descriptors (`Ljava/lang/String;`), method descriptors
//! (`(JZ)Lpkg/User;`) and the richer grammar of the `Signature` attribute
//! are decoded into [`TypeRef`]s. Parametric information is preserved
//! exactly as declared; type variables and wildcard bounds degrade to
//! `java.lang.Object` rather than failing the whole member.
//!
//! Inner-class segments (`Lpkg/Outer<TT;>.Inner<...>;`) collapse to the
//! canonical `pkg.Outer$Inner` name with type arguments flattened in
//! outer-to-inner order.

use types::TypeRef;

use crate::{ClassError, Result};

/// Decode a field descriptor.
pub fn parse_field_descriptor(descriptor: &str) -> Result<TypeRef> {
    let mut p = Parser::new(descriptor);
    let t = p.parse_type()?;
    p.expect_end()?;
    Ok(t)
}

/// Decode a method descriptor into `(parameters, return type)`.
pub fn parse_method_descriptor(descriptor: &str) -> Result<(Vec<TypeRef>, TypeRef)> {
    let mut p = Parser::new(descriptor);
    let sig = p.parse_method()?;
    p.expect_end()?;
    Ok(sig)
}

/// Decode a field `Signature` attribute value.
pub fn parse_field_signature(signature: &str) -> Result<TypeRef> {
    let mut p = Parser::new(signature);
    let t = p.parse_type()?;
    p.expect_end()?;
    Ok(t)
}

/// Decode a method `Signature` attribute value into `(parameters, return
/// type)`. Declared type parameters and `throws` clauses are consumed and
/// discarded.
pub fn parse_method_signature(signature: &str) -> Result<(Vec<TypeRef>, TypeRef)> {
    let mut p = Parser::new(signature);
    if p.peek() == Some(b'<') {
        p.skip_type_parameters()?;
    }
    let sig = p.parse_method()?;
    // throws clauses: ^ReferenceType, repeated.
    while p.peek() == Some(b'^') {
        p.bump();
        p.parse_type()?;
    }
    p.expect_end()?;
    Ok(sig)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self { Self { src, pos: 0 } }

    fn malformed(&self) -> ClassError { ClassError::MalformedSignature(self.src.to_string()) }

    fn peek(&self) -> Option<u8> { self.src.as_bytes().get(self.pos).copied() }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        if self.bump() == Some(b) {
            Ok(())
        } else {
            Err(self.malformed())
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.pos == self.src.len() {
            Ok(())
        } else {
            Err(self.malformed())
        }
    }

    /// Consume bytes until one of `stops` is seen (not consumed).
    fn take_until(&mut self, stops: &[u8]) -> Result<&'a str> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if stops.contains(&b) {
                return Ok(&self.src[start..self.pos]);
            }
            self.pos += 1;
        }
        Err(self.malformed())
    }

    fn parse_method(&mut self) -> Result<(Vec<TypeRef>, TypeRef)> {
        self.expect(b'(')?;
        let mut params = Vec::new();
        while self.peek() != Some(b')') {
            params.push(self.parse_type()?);
        }
        self.bump();
        let ret = self.parse_type()?;
        Ok((params, ret))
    }

    fn parse_type(&mut self) -> Result<TypeRef> {
        match self.bump().ok_or_else(|| self.malformed())? {
            b'B' => Ok(TypeRef::new("byte")),
            b'C' => Ok(TypeRef::new("char")),
            b'S' => Ok(TypeRef::new("short")),
            b'Z' => Ok(TypeRef::new("boolean")),
            b'I' => Ok(TypeRef::new("int")),
            b'J' => Ok(TypeRef::new("long")),
            b'F' => Ok(TypeRef::new("float")),
            b'D' => Ok(TypeRef::new("double")),
            b'V' => Ok(TypeRef::void()),
            b'[' => {
                let component = self.parse_type()?;
                Ok(TypeRef::with_args(
                    format!("{}[]", component.name()),
                    component.args().to_vec(),
                ))
            }
            b'T' => {
                // Type variable: the binding is not tracked, degrade.
                self.take_until(&[b';'])?;
                self.expect(b';')?;
                Ok(TypeRef::object())
            }
            b'*' => Ok(TypeRef::object()),
            b'+' | b'-' => self.parse_type(),
            b'L' => self.parse_class_type(),
            _ => Err(self.malformed()),
        }
    }

    fn parse_class_type(&mut self) -> Result<TypeRef> {
        let mut name = String::new();
        let mut args: Vec<TypeRef> = Vec::new();
        loop {
            let segment = self.take_until(&[b'<', b';', b'.'])?;
            name.push_str(&segment.replace('/', "."));
            match self.bump().ok_or_else(|| self.malformed())? {
                b'<' => {
                    while self.peek() != Some(b'>') {
                        args.push(self.parse_type()?);
                    }
                    self.bump();
                    match self.bump().ok_or_else(|| self.malformed())? {
                        b';' => break,
                        b'.' => name.push('$'),
                        _ => return Err(self.malformed()),
                    }
                }
                b';' => break,
                b'.' => name.push('$'),
                _ => return Err(self.malformed()),
            }
        }
        Ok(TypeRef::with_args(name, args))
    }

    fn skip_type_parameters(&mut self) -> Result<()> {
        self.expect(b'<')?;
        while self.peek() != Some(b'>') {
            self.take_until(&[b':'])?;
            while self.peek() == Some(b':') {
                self.bump();
                match self.peek() {
                    Some(b':') | Some(b'>') => {}
                    Some(_) => {
                        self.parse_type()?;
                    }
                    None => return Err(self.malformed()),
                }
            }
        }
        self.bump();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_and_object_descriptors() {
        assert_eq!(parse_field_descriptor("J").expect("long"), TypeRef::new("long"));
        assert_eq!(
            parse_field_descriptor("Ljava/lang/String;").expect("string"),
            TypeRef::new("java.lang.String")
        );
        assert_eq!(
            parse_field_descriptor("[I").expect("int array").name(),
            "int[]"
        );
    }

    #[test]
    fn method_descriptor() {
        let (params, ret) =
            parse_method_descriptor("(JZ)Lpkg/User;").expect("method descriptor");
        assert_eq!(params, vec![TypeRef::new("long"), TypeRef::new("boolean")]);
        assert_eq!(ret, TypeRef::new("pkg.User"));

        let (none, void) = parse_method_descriptor("()V").expect("void descriptor");
        assert!(none.is_empty());
        assert!(void.is_void());
    }

    #[test]
    fn generic_signature_preserves_arguments() {
        let t = parse_field_signature("Ljava/util/List<Lpkg/User;>;").expect("list signature");
        assert_eq!(t.name(), "java.util.List");
        assert_eq!(t.args(), &[TypeRef::new("pkg.User")]);

        let (params, ret) =
            parse_method_signature("(Ljava/util/Map<Ljava/lang/String;Lpkg/User;>;)Ljava/util/List<Lpkg/User;>;")
                .expect("generic method");
        assert_eq!(params[0].args().len(), 2);
        assert_eq!(ret.element_of(), TypeRef::new("pkg.User"));
    }

    #[test]
    fn type_variables_and_wildcards_degrade_to_object() {
        let (params, ret) =
            parse_method_signature("<T:Ljava/lang/Object;>(TT;)Ljava/util/List<*>;")
                .expect("type-variable signature");
        assert!(params[0].is_object());
        assert!(ret.element_of().is_object());

        let bounded =
            parse_field_signature("Ljava/util/List<+Lpkg/User;>;").expect("extends wildcard");
        assert_eq!(bounded.element_of(), TypeRef::new("pkg.User"));
    }

    #[test]
    fn nested_segments_collapse_to_canonical_name() {
        let t = parse_field_signature("Lpkg/Outer<Lpkg/User;>.Inner<Ljava/lang/String;>;")
            .expect("nested signature");
        assert_eq!(t.name(), "pkg.Outer$Inner");
        assert_eq!(t.args().len(), 2);
    }

    #[test]
    fn malformed_signatures_are_rejected() {
        assert!(parse_field_descriptor("Q").is_err());
        assert!(parse_field_descriptor("Ljava/lang/String").is_err());
        assert!(parse_method_descriptor("(J").is_err());
        assert!(parse_field_descriptor("Ljava/lang/String;X").is_err());
    }
}
