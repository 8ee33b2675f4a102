//! Bytecode normalization.
//!
//! Method code is decoded into a flat instruction stream in program order.
//! Jumps, exception tables and line numbers are flattened away on purpose:
//! the simulator performs a linear sweep with merge on control joins, not a
//! worklist over basic blocks. Instructions the simulator does not interpret
//! carry only their declared stack effect.

use log::warn;
use types::{ConstValue, MethodIdentifier, TypeRef};

use crate::constant_pool::ConstantPool;
use crate::parser::BootstrapMethod;
use crate::signature::parse_method_descriptor;
use crate::{ClassError, Result};

/// One normalized instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Push a constant.
    Push(ConstValue),
    /// Load a local-variable slot.
    Load {
        /// Slot index.
        slot: u16,
        /// Declared carrier type of the slot, as far as the opcode tells.
        type_ref: TypeRef,
    },
    /// Store into a local-variable slot.
    Store {
        /// Slot index.
        slot: u16,
        /// Declared carrier type of the slot.
        type_ref: TypeRef,
    },
    /// Read an instance field.
    GetField {
        /// Declaring class.
        owner: String,
        /// Field name.
        name: String,
        /// Declared field type.
        type_ref: TypeRef,
    },
    /// Read a static field.
    GetStatic {
        /// Declaring class.
        owner: String,
        /// Field name.
        name: String,
        /// Declared field type.
        type_ref: TypeRef,
    },
    /// Allocate an instance.
    New(TypeRef),
    /// Duplicate the top of stack (shared identity).
    Dup,
    /// Invoke a method.
    Invoke {
        /// Callee identity.
        id: MethodIdentifier,
        /// Whether the call goes through an interface.
        interface: bool,
    },
    /// An `invokedynamic` call site.
    InvokeDynamic {
        /// The bootstrap's implementation method, when resolvable (the
        /// lambda body behind a `LambdaMetafactory` site).
        handle: Option<MethodIdentifier>,
        /// The dynamic call-site descriptor: captured arguments as
        /// parameters, the functional-interface type as return.
        dynamic: MethodIdentifier,
    },
    /// Uninterpreted instruction with a known stack effect.
    SizeChange {
        /// Values popped.
        pops: u8,
        /// Fresh empty values pushed.
        pushes: u8,
    },
    /// Return from the method (`pops` is 0 for a void return).
    Return {
        /// 1 when a value is returned.
        pops: u8,
    },
    /// Throw the top of stack.
    Throw,
    /// Anything else.
    Other {
        /// Values popped.
        pops: u8,
        /// Values pushed.
        pushes: u8,
    },
}

impl Instruction {
    /// Number of stack values the instruction consumes.
    pub fn pops(&self) -> usize {
        match self {
            Self::Push(_) | Self::Load { .. } | Self::New(_) | Self::Dup => 0,
            Self::Store { .. } | Self::Throw => 1,
            Self::GetField { .. } => 1,
            Self::GetStatic { .. } => 0,
            Self::Invoke { id, .. } => id.params.len() + usize::from(!id.is_static),
            Self::InvokeDynamic { dynamic, .. } => dynamic.params.len(),
            Self::SizeChange { pops, .. } | Self::Other { pops, .. } => *pops as usize,
            Self::Return { pops } => *pops as usize,
        }
    }

    /// Number of stack values the instruction produces.
    pub fn pushes(&self) -> usize {
        match self {
            Self::Push(_) | Self::Load { .. } | Self::New(_) | Self::Dup => 1,
            Self::GetField { .. } | Self::GetStatic { .. } => 1,
            Self::Store { .. } | Self::Throw | Self::Return { .. } => 0,
            Self::Invoke { id, .. } => usize::from(!id.returns_void()),
            Self::InvokeDynamic { .. } => 1,
            Self::SizeChange { pushes, .. } | Self::Other { pushes, .. } => *pushes as usize,
        }
    }
}

/// Decode a `Code` attribute's bytecode array.
///
/// A decoding failure on one instruction degrades that instruction to an
/// opaque [`Instruction::Other`] and the sweep continues with the next
/// byte. The opcode byte itself is always consumed, so the sweep makes
/// progress even through unrecognized opcodes.
pub fn decode(
    code: &[u8],
    pool: &ConstantPool,
    bootstrap: &[BootstrapMethod],
) -> Vec<Instruction> {
    let mut out = Vec::new();
    let mut cursor = Cursor { bytes: code, pos: 0 };
    while !cursor.at_end() {
        let start = cursor.pos;
        match decode_one(&mut cursor, pool, bootstrap) {
            Ok(ins) => out.push(ins),
            Err(e) => {
                warn!("degrading instruction at offset {}: {}", start, e);
                out.push(Instruction::Other { pops: 0, pushes: 0 });
            }
        }
    }
    out
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn at_end(&self) -> bool { self.pos >= self.bytes.len() }

    fn truncated(&self) -> ClassError {
        ClassError::Malformed(format!("truncated code at offset {}", self.pos))
    }

    fn u8(&mut self) -> Result<u8> {
        let b = *self.bytes.get(self.pos).ok_or_else(|| self.truncated())?;
        self.pos += 1;
        Ok(b)
    }

    fn u16(&mut self) -> Result<u16> { Ok(u16::from_be_bytes([self.u8()?, self.u8()?])) }

    fn i16(&mut self) -> Result<i16> { Ok(self.u16()? as i16) }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes([self.u8()?, self.u8()?, self.u8()?, self.u8()?]))
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        if self.pos + n > self.bytes.len() {
            return Err(self.truncated());
        }
        self.pos += n;
        Ok(())
    }

    /// Skip the switch padding: offsets are 4-byte aligned from code start.
    fn align4(&mut self) -> Result<()> {
        while self.pos % 4 != 0 {
            self.u8()?;
        }
        Ok(())
    }
}

fn load_hint(kind: u8) -> TypeRef {
    match kind {
        0 => TypeRef::new("int"),
        1 => TypeRef::new("long"),
        2 => TypeRef::new("float"),
        3 => TypeRef::new("double"),
        _ => TypeRef::object(),
    }
}

fn invoke_id(
    pool: &ConstantPool,
    index: u16,
    is_static: bool,
) -> Result<MethodIdentifier> {
    let (owner, name, descriptor) = pool.method_entry(index)?;
    let (params, ret) = parse_method_descriptor(descriptor)?;
    Ok(MethodIdentifier { owner, name: name.to_string(), params, ret, is_static })
}

fn decode_one(
    c: &mut Cursor<'_>,
    pool: &ConstantPool,
    bootstrap: &[BootstrapMethod],
) -> Result<Instruction> {
    let op = c.u8()?;
    let ins = match op {
        0x00 => Instruction::Other { pops: 0, pushes: 0 },
        0x01 => Instruction::Push(ConstValue::Null),
        0x02..=0x08 => Instruction::Push(ConstValue::Int(op as i64 - 0x03)),
        0x09 | 0x0a => Instruction::Push(ConstValue::Int((op - 0x09) as i64)),
        0x0b..=0x0d => Instruction::Push(ConstValue::float((op - 0x0b) as f64)),
        0x0e | 0x0f => Instruction::Push(ConstValue::float((op - 0x0e) as f64)),
        0x10 => Instruction::Push(ConstValue::Int(c.u8()? as i8 as i64)),
        0x11 => Instruction::Push(ConstValue::Int(c.i16()? as i64)),
        0x12 => Instruction::Push(pool.loadable(c.u8()? as u16)?),
        0x13 | 0x14 => Instruction::Push(pool.loadable(c.u16()?)?),
        // iload / lload / fload / dload / aload with explicit index.
        0x15..=0x19 => {
            Instruction::Load { slot: c.u8()? as u16, type_ref: load_hint(op - 0x15) }
        }
        // *load_0 .. *load_3.
        0x1a..=0x2d => {
            let kind = (op - 0x1a) / 4;
            let slot = ((op - 0x1a) % 4) as u16;
            Instruction::Load { slot, type_ref: load_hint(kind) }
        }
        // Array loads.
        0x2e..=0x35 => Instruction::SizeChange { pops: 2, pushes: 1 },
        // istore / lstore / fstore / dstore / astore with explicit index.
        0x36..=0x3a => {
            Instruction::Store { slot: c.u8()? as u16, type_ref: load_hint(op - 0x36) }
        }
        // *store_0 .. *store_3.
        0x3b..=0x4e => {
            let kind = (op - 0x3b) / 4;
            let slot = ((op - 0x3b) % 4) as u16;
            Instruction::Store { slot, type_ref: load_hint(kind) }
        }
        // Array stores.
        0x4f..=0x56 => Instruction::SizeChange { pops: 3, pushes: 0 },
        0x57 => Instruction::SizeChange { pops: 1, pushes: 0 },
        0x58 => Instruction::SizeChange { pops: 2, pushes: 0 },
        0x59 => Instruction::Dup,
        0x5a => Instruction::SizeChange { pops: 2, pushes: 3 },
        0x5b => Instruction::SizeChange { pops: 3, pushes: 4 },
        0x5c => Instruction::SizeChange { pops: 2, pushes: 4 },
        0x5d => Instruction::SizeChange { pops: 3, pushes: 5 },
        0x5e => Instruction::SizeChange { pops: 4, pushes: 6 },
        0x5f => Instruction::SizeChange { pops: 2, pushes: 2 },
        // Binary arithmetic and bit ops.
        0x60..=0x73 | 0x78..=0x83 => Instruction::SizeChange { pops: 2, pushes: 1 },
        // Negation.
        0x74..=0x77 => Instruction::SizeChange { pops: 1, pushes: 1 },
        0x84 => {
            c.skip(2)?;
            Instruction::Other { pops: 0, pushes: 0 }
        }
        // Conversions.
        0x85..=0x93 => Instruction::SizeChange { pops: 1, pushes: 1 },
        // lcmp, fcmpl/g, dcmpl/g.
        0x94..=0x98 => Instruction::SizeChange { pops: 2, pushes: 1 },
        // if<cond>.
        0x99..=0x9e => {
            c.skip(2)?;
            Instruction::SizeChange { pops: 1, pushes: 0 }
        }
        // if_icmp* / if_acmp*.
        0x9f..=0xa6 => {
            c.skip(2)?;
            Instruction::SizeChange { pops: 2, pushes: 0 }
        }
        0xa7 => {
            c.skip(2)?;
            Instruction::Other { pops: 0, pushes: 0 }
        }
        0xa8 => {
            c.skip(2)?;
            Instruction::SizeChange { pops: 0, pushes: 1 }
        }
        0xa9 => {
            c.skip(1)?;
            Instruction::Other { pops: 0, pushes: 0 }
        }
        0xaa => {
            c.align4()?;
            c.i32()?;
            let low = c.i32()?;
            let high = c.i32()?;
            let entries = i64::from(high) - i64::from(low) + 1;
            if entries < 0 {
                return Err(ClassError::Malformed("tableswitch bounds".to_string()));
            }
            c.skip(entries as usize * 4)?;
            Instruction::SizeChange { pops: 1, pushes: 0 }
        }
        0xab => {
            c.align4()?;
            c.i32()?;
            let npairs = c.i32()?;
            if npairs < 0 {
                return Err(ClassError::Malformed("lookupswitch pairs".to_string()));
            }
            c.skip(npairs as usize * 8)?;
            Instruction::SizeChange { pops: 1, pushes: 0 }
        }
        // ireturn / lreturn / freturn / dreturn / areturn.
        0xac..=0xb0 => Instruction::Return { pops: 1 },
        0xb1 => Instruction::Return { pops: 0 },
        0xb2 => {
            let (owner, name, descriptor) = pool.field_entry(c.u16()?)?;
            Instruction::GetStatic {
                owner,
                name: name.to_string(),
                type_ref: crate::signature::parse_field_descriptor(descriptor)?,
            }
        }
        0xb3 => {
            c.skip(2)?;
            Instruction::SizeChange { pops: 1, pushes: 0 }
        }
        0xb4 => {
            let (owner, name, descriptor) = pool.field_entry(c.u16()?)?;
            Instruction::GetField {
                owner,
                name: name.to_string(),
                type_ref: crate::signature::parse_field_descriptor(descriptor)?,
            }
        }
        0xb5 => {
            c.skip(2)?;
            Instruction::SizeChange { pops: 2, pushes: 0 }
        }
        0xb6 | 0xb7 => Instruction::Invoke { id: invoke_id(pool, c.u16()?, false)?, interface: false },
        0xb8 => Instruction::Invoke { id: invoke_id(pool, c.u16()?, true)?, interface: false },
        0xb9 => {
            let index = c.u16()?;
            c.skip(2)?;
            Instruction::Invoke { id: invoke_id(pool, index, false)?, interface: true }
        }
        0xba => {
            let index = c.u16()?;
            c.skip(2)?;
            decode_invoke_dynamic(pool, bootstrap, index)?
        }
        0xbb => Instruction::New(TypeRef::new(pool.class_name(c.u16()?)?)),
        0xbc => {
            c.skip(1)?;
            Instruction::SizeChange { pops: 1, pushes: 1 }
        }
        0xbd => {
            c.skip(2)?;
            Instruction::SizeChange { pops: 1, pushes: 1 }
        }
        0xbe => Instruction::SizeChange { pops: 1, pushes: 1 },
        0xbf => Instruction::Throw,
        // checkcast: the value survives untouched so constants flow through.
        0xc0 => {
            c.skip(2)?;
            Instruction::Other { pops: 0, pushes: 0 }
        }
        0xc1 => {
            c.skip(2)?;
            Instruction::SizeChange { pops: 1, pushes: 1 }
        }
        0xc2 | 0xc3 => Instruction::SizeChange { pops: 1, pushes: 0 },
        0xc4 => decode_wide(c)?,
        0xc5 => {
            c.skip(2)?;
            let dims = c.u8()?;
            Instruction::SizeChange { pops: dims, pushes: 1 }
        }
        0xc6 | 0xc7 => {
            c.skip(2)?;
            Instruction::SizeChange { pops: 1, pushes: 0 }
        }
        0xc8 => {
            c.skip(4)?;
            Instruction::Other { pops: 0, pushes: 0 }
        }
        0xc9 => {
            c.skip(4)?;
            Instruction::SizeChange { pops: 0, pushes: 1 }
        }
        other => {
            return Err(ClassError::Malformed(format!("unknown opcode 0x{:02x}", other)));
        }
    };
    Ok(ins)
}

fn decode_wide(c: &mut Cursor<'_>) -> Result<Instruction> {
    let op = c.u8()?;
    match op {
        0x15..=0x19 => Ok(Instruction::Load { slot: c.u16()?, type_ref: load_hint(op - 0x15) }),
        0x36..=0x3a => Ok(Instruction::Store { slot: c.u16()?, type_ref: load_hint(op - 0x36) }),
        0x84 => {
            c.skip(4)?;
            Ok(Instruction::Other { pops: 0, pushes: 0 })
        }
        0xa9 => {
            c.skip(2)?;
            Ok(Instruction::Other { pops: 0, pushes: 0 })
        }
        other => Err(ClassError::Malformed(format!("unknown wide opcode 0x{:02x}", other))),
    }
}

fn decode_invoke_dynamic(
    pool: &ConstantPool,
    bootstrap: &[BootstrapMethod],
    index: u16,
) -> Result<Instruction> {
    let (bootstrap_index, name_and_type) = match pool.get(index)? {
        crate::constant_pool::Constant::InvokeDynamic { bootstrap, name_and_type } => {
            (*bootstrap, *name_and_type)
        }
        _ => return Err(ClassError::BadPoolRef { index, expected: "InvokeDynamic" }),
    };

    let (site_name, site_descriptor) = pool.name_and_type(name_and_type)?;
    let (captured, iface_type) = parse_method_descriptor(site_descriptor)?;
    let dynamic = MethodIdentifier {
        owner: iface_type.name().to_string(),
        name: site_name.to_string(),
        params: captured,
        ret: iface_type,
        is_static: true,
    };

    // For a LambdaMetafactory site the implementation method handle is the
    // second static argument. Other bootstraps are left unresolved.
    let handle = bootstrap
        .get(bootstrap_index as usize)
        .and_then(|bm| {
            bm.arguments.iter().find_map(|arg| pool.handle_method(*arg).ok().flatten())
        })
        .map(|(owner, name, descriptor, is_static)| {
            let (params, ret) = parse_method_descriptor(descriptor)?;
            Ok::<_, ClassError>(MethodIdentifier {
                owner,
                name: name.to_string(),
                params,
                ret,
                is_static,
            })
        })
        .transpose()?;

    Ok(Instruction::InvokeDynamic { handle, dynamic })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant_pool::Constant;

    fn pool() -> ConstantPool {
        ConstantPool::new(vec![
            Constant::Utf8("ok".to_string()),
            Constant::Str(1),
            Constant::Utf8("pkg/Service".to_string()),
            Constant::Class(3),
            Constant::Utf8("find".to_string()),
            Constant::Utf8("(J)Lpkg/User;".to_string()),
            Constant::NameAndType { name: 5, descriptor: 6 },
            Constant::MethodRef { class: 4, name_and_type: 7 },
        ])
    }

    #[test]
    fn decodes_constant_return_sequence() {
        // ldc #2; areturn
        let code = [0x12, 0x02, 0xb0];
        let ins = decode(&code, &pool(), &[]);
        assert_eq!(
            ins,
            vec![
                Instruction::Push(ConstValue::Str("ok".to_string())),
                Instruction::Return { pops: 1 },
            ]
        );
    }

    #[test]
    fn decodes_invocation_with_stack_effect() {
        // aload_0; lload_1; invokevirtual #8; areturn
        let code = [0x2a, 0x1f, 0xb6, 0x00, 0x08, 0xb0];
        let ins = decode(&code, &pool(), &[]);
        assert_eq!(ins.len(), 4);
        let Instruction::Invoke { id, interface } = &ins[2] else { panic!("invoke expected") };
        assert!(!interface);
        assert_eq!(id.owner, "pkg.Service");
        assert_eq!(id.params.len(), 1);
        // 1 receiver + 1 argument popped, 1 result pushed.
        assert_eq!(ins[2].pops(), 2);
        assert_eq!(ins[2].pushes(), 1);
    }

    #[test]
    fn tableswitch_padding_keeps_alignment() {
        // iconst_0 at 0, tableswitch at 1: pad to 4, default, low=0, high=1,
        // two offsets, then return.
        let mut code = vec![0x03, 0xaa, 0, 0];
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&1i32.to_be_bytes());
        code.extend_from_slice(&8i32.to_be_bytes());
        code.extend_from_slice(&12i32.to_be_bytes());
        code.push(0xb1);
        let ins = decode(&code, &pool(), &[]);
        assert_eq!(
            ins,
            vec![
                Instruction::Push(ConstValue::Int(0)),
                Instruction::SizeChange { pops: 1, pushes: 0 },
                Instruction::Return { pops: 0 },
            ]
        );
    }

    #[test]
    fn unknown_opcode_degrades_and_the_sweep_continues() {
        let code = [0x03, 0xfe, 0x03];
        let ins = decode(&code, &pool(), &[]);
        assert_eq!(
            ins,
            vec![
                Instruction::Push(ConstValue::Int(0)),
                Instruction::Other { pops: 0, pushes: 0 },
                Instruction::Push(ConstValue::Int(0)),
            ]
        );
    }
}
