//! Constant expressions: global initializers and segment offsets/items.

use std::fmt;

use fhex::ToHex;

use crate::features::Capabilities;
use crate::parser::encoding::*;
use crate::parser::error::{ErrorKind, IndexSpace, ParseError, Result};
use crate::parser::module::Module;
use crate::parser::reader::Reader;
use crate::parser::sections::read_ref_type;
use crate::parser::types::{RefType, ValueType};
use crate::parser::ParseContext;

#[derive(Debug, Clone, PartialEq)]
pub enum ConstInstr {
    I32Const(i32),
    I64Const(i64),
    F32Const(f32),
    F64Const(f64),
    V128Const([u8; 16]),
    GlobalGet(u32),
    RefNull(RefType),
    RefFunc(u32),
    I32Add,
    I32Sub,
    I32Mul,
    I64Add,
    I64Sub,
    I64Mul,
}

impl fmt::Display for ConstInstr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConstInstr::I32Const(v) => write!(f, "i32.const {}", v),
            ConstInstr::I64Const(v) => write!(f, "i64.const {}", v),
            ConstInstr::F32Const(v) => write!(f, "f32.const {}", v.to_hex()),
            ConstInstr::F64Const(v) => write!(f, "f64.const {}", v.to_hex()),
            ConstInstr::V128Const(v) => write!(f, "v128.const 0x{}", hex::encode(v)),
            ConstInstr::GlobalGet(i) => write!(f, "global.get {}", i),
            ConstInstr::RefNull(t) => write!(f, "ref.null {}", t),
            ConstInstr::RefFunc(i) => write!(f, "ref.func {}", i),
            ConstInstr::I32Add => f.write_str("i32.add"),
            ConstInstr::I32Sub => f.write_str("i32.sub"),
            ConstInstr::I32Mul => f.write_str("i32.mul"),
            ConstInstr::I64Add => f.write_str("i64.add"),
            ConstInstr::I64Sub => f.write_str("i64.sub"),
            ConstInstr::I64Mul => f.write_str("i64.mul"),
        }
    }
}

/// A validated constant expression, without its trailing `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstExpr {
    pub instrs: Vec<ConstInstr>,
}

impl ConstExpr {
    /// The value of a single `i32.const`/`i64.const` expression, as used by
    /// most segment offsets.
    pub fn as_const_offset(&self) -> Option<i64> {
        match self.instrs.as_slice() {
            [ConstInstr::I32Const(v)] => Some(i64::from(*v)),
            [ConstInstr::I64Const(v)] => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ConstExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, instr) in self.instrs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", instr)?;
        }
        Ok(())
    }
}

/// Type-checks constant instructions as they are decoded.
struct ConstExprValidator<'a> {
    module: &'a Module,
    caps: &'a Capabilities,
    expected: ValueType,
    // globals with an index below this may be read
    visible_globals: u32,
    stack: Vec<ValueType>,
}

impl<'a> ConstExprValidator<'a> {
    fn validate(&mut self, instr: &ConstInstr, at: usize) -> Result<()> {
        let pushed = match instr {
            ConstInstr::I32Const(_) => ValueType::I32,
            ConstInstr::I64Const(_) => ValueType::I64,
            ConstInstr::F32Const(_) => ValueType::F32,
            ConstInstr::F64Const(_) => ValueType::F64,
            ConstInstr::V128Const(_) => ValueType::V128,
            ConstInstr::RefNull(ref_type) => ValueType::from(*ref_type),
            ConstInstr::RefFunc(index) => {
                let count = self.module.function_count();
                if *index >= count {
                    return Err(ParseError::new(
                        ErrorKind::illegal_index(IndexSpace::Function, *index, count),
                        at,
                    ));
                }
                ValueType::FuncRef
            }
            ConstInstr::GlobalGet(index) => {
                // forward and self references are out of range here too
                let global_type = match self.module.global_type(*index) {
                    Some(global_type) if *index < self.visible_globals => global_type,
                    _ => {
                        return Err(ParseError::new(
                            ErrorKind::illegal_index(IndexSpace::Global, *index, self.visible_globals),
                            at,
                        ))
                    }
                };
                if global_type.mutable {
                    return Err(ParseError::new(ErrorKind::ConstExprMutableGlobal(*index), at));
                }
                global_type.value_type
            }
            ConstInstr::I32Add | ConstInstr::I32Sub | ConstInstr::I32Mul => self.binary(ValueType::I32, at)?,
            ConstInstr::I64Add | ConstInstr::I64Sub | ConstInstr::I64Mul => self.binary(ValueType::I64, at)?,
        };
        if !self.caps.allows_value_type(pushed) {
            return Err(ParseError::new(ErrorKind::UnsupportedValueType(pushed.byte()), at));
        }
        self.stack.push(pushed);
        Ok(())
    }

    fn binary(&mut self, operand: ValueType, at: usize) -> Result<ValueType> {
        let len = self.stack.len();
        if len < 2 || self.stack[len - 2..].iter().any(|t| *t != operand) {
            return Err(ParseError::new(
                ErrorKind::ConstExprTypeMismatch {
                    expected: operand,
                    actual: self.stack.clone(),
                },
                at,
            ));
        }
        self.stack.truncate(len - 2);
        Ok(operand)
    }

    fn finish(&self, at: usize) -> Result<()> {
        if self.stack.as_slice() == [self.expected] {
            Ok(())
        } else {
            Err(ParseError::new(
                ErrorKind::ConstExprTypeMismatch {
                    expected: self.expected,
                    actual: self.stack.clone(),
                },
                at,
            ))
        }
    }
}

fn require(enabled: bool, what: &'static str, at: usize) -> Result<()> {
    if enabled {
        Ok(())
    } else {
        Err(ParseError::new(ErrorKind::FeatureDisabled(what), at))
    }
}

/// Decodes a constant expression producing `expected`. Only globals with an
/// index below `visible_globals` may be read.
pub fn read_const_expr(
    reader: &mut Reader<'_>,
    module: &Module,
    ctx: &ParseContext<'_>,
    expected: ValueType,
    visible_globals: u32,
) -> Result<ConstExpr> {
    let caps = ctx.caps();
    let mut validator = ConstExprValidator {
        module,
        caps,
        expected,
        visible_globals,
        stack: Vec::with_capacity(1),
    };
    let mut instrs = Vec::with_capacity(1);

    loop {
        let at = reader.pos();
        let opcode = match reader.read_byte() {
            Ok(opcode) => opcode,
            Err(e) if reader.is_empty() && !instrs.is_empty() => {
                return Err(ParseError::with_range(ErrorKind::ConstExprMissingEnd, at, e.offset))
            }
            Err(e) => return Err(e),
        };
        let instr = match opcode {
            OP_END => {
                validator.finish(at)?;
                return Ok(ConstExpr { instrs });
            }
            OP_I32_CONST => ConstInstr::I32Const(reader.read_vs32()?),
            OP_I64_CONST => ConstInstr::I64Const(reader.read_vs64()?),
            OP_F32_CONST => ConstInstr::F32Const(reader.read_f32()?),
            OP_F64_CONST => ConstInstr::F64Const(reader.read_f64()?),
            OP_GLOBAL_GET => ConstInstr::GlobalGet(reader.read_vu32()?),
            OP_REF_NULL => {
                require(caps.reference_types, "ref.null", at)?;
                ConstInstr::RefNull(read_ref_type(reader, caps)?)
            }
            OP_REF_FUNC => {
                require(caps.reference_types, "ref.func", at)?;
                ConstInstr::RefFunc(reader.read_vu32()?)
            }
            OP_I32_ADD | OP_I32_SUB | OP_I32_MUL | OP_I64_ADD | OP_I64_SUB | OP_I64_MUL => {
                require(caps.extended_const, "extended constant expressions", at)?;
                match opcode {
                    OP_I32_ADD => ConstInstr::I32Add,
                    OP_I32_SUB => ConstInstr::I32Sub,
                    OP_I32_MUL => ConstInstr::I32Mul,
                    OP_I64_ADD => ConstInstr::I64Add,
                    OP_I64_SUB => ConstInstr::I64Sub,
                    _ => ConstInstr::I64Mul,
                }
            }
            OP_PREFIX_SIMD => {
                let subopcode = reader.read_vu32()?;
                if subopcode != SIMD_V128_CONST {
                    return Err(ParseError::new(ErrorKind::ConstExprIllegalOpcode(opcode), at));
                }
                require(caps.simd, "v128.const", at)?;
                ConstInstr::V128Const(reader.read_v128()?)
            }
            _ => return Err(ParseError::new(ErrorKind::ConstExprIllegalOpcode(opcode), at)),
        };
        validator.validate(&instr, at)?;
        instrs.push(instr);
    }
}
