//! Code objects: an instruction byte stream plus its constant pool.

use crate::opcode::OpCode;
use quill_core::string::Str;
use std::rc::Rc;
use thiserror::Error;

/// Hard limit on constants per code object (single-byte index).
pub const MAX_CONSTANTS: usize = 256;

/// A constant value in the constant pool.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Null,
    Int(i64),
    Float(f64),
    Str(Rc<Str>),
    /// Regex pattern source.
    Regex(Rc<Str>),
    /// Index into the code object's nested function prototypes.
    Function(usize),
}

impl Constant {
    /// Scalar constants with equal payloads share one pool entry.
    /// Floats compare by bits so `0.0`, `-0.0` and NaNs stay distinct.
    pub(crate) fn same_as(&self, other: &Constant) -> bool {
        match (self, other) {
            (Constant::Null, Constant::Null) => true,
            (Constant::Int(a), Constant::Int(b)) => a == b,
            (Constant::Float(a), Constant::Float(b)) => a.to_bits() == b.to_bits(),
            (Constant::Str(a), Constant::Str(b)) => a == b,
            (Constant::Regex(a), Constant::Regex(b)) => a == b,
            _ => false,
        }
    }
}

/// Errors raised while assembling or validating a code object.
#[derive(Debug, Error, PartialEq)]
pub enum CodeError {
    #[error("constant pool overflow (limit {MAX_CONSTANTS})")]
    TooManyConstants,
    #[error("label {0} used but never bound")]
    UnboundLabel(usize),
    #[error("jump target {0} does not fit in 16 bits")]
    JumpOutOfRange(usize),
    #[error("invalid opcode byte {byte:#04x} at offset {pc}")]
    InvalidOpcode { pc: usize, byte: u8 },
    #[error("truncated operand for {op} at offset {pc}")]
    TruncatedOperand { pc: usize, op: OpCode },
    #[error("{op} at offset {pc} refers to missing constant {index}")]
    BadConstant { pc: usize, op: OpCode, index: usize },
    #[error("{op} at offset {pc} jumps to {target}, outside the code")]
    BadJump { pc: usize, op: OpCode, target: usize },
    #[error("constant {index} names missing function {function}")]
    BadFunction { index: usize, function: usize },
}

/// A compiled script function.
#[derive(Clone, Debug)]
pub struct FunctionProto {
    pub name: String,
    /// Declared parameter count. Parameters occupy locals `0..arity`.
    pub arity: u8,
    pub code: Code,
}

impl FunctionProto {
    pub fn new(name: impl Into<String>, arity: u8, code: Code) -> Self {
        FunctionProto {
            name: name.into(),
            arity,
            code,
        }
    }
}

/// One decoded instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub pc: usize,
    pub op: OpCode,
    /// Operand value, 0 when the opcode takes none.
    pub operand: u16,
}

impl Instruction {
    /// Offset of the following instruction.
    pub fn next_pc(&self) -> usize {
        self.pc + self.op.width()
    }
}

/// An immutable instruction stream with its constants and nested functions.
#[derive(Clone, Debug, Default)]
pub struct Code {
    bytes: Vec<u8>,
    constants: Vec<Constant>,
    functions: Vec<FunctionProto>,
    num_locals: usize,
}

impl Code {
    /// Validate and build a code object. Every opcode byte must decode, every
    /// operand must be present, constant operands must name pool entries and
    /// jump targets must land inside the stream (or at its end).
    pub fn new(
        bytes: Vec<u8>,
        constants: Vec<Constant>,
        functions: Vec<FunctionProto>,
        num_locals: usize,
    ) -> Result<Code, CodeError> {
        if constants.len() > MAX_CONSTANTS {
            return Err(CodeError::TooManyConstants);
        }
        for (index, k) in constants.iter().enumerate() {
            if let Constant::Function(function) = k {
                if *function >= functions.len() {
                    return Err(CodeError::BadFunction {
                        index,
                        function: *function,
                    });
                }
            }
        }
        let code = Code {
            bytes,
            constants,
            functions,
            num_locals,
        };
        code.validate()?;
        Ok(code)
    }

    fn validate(&self) -> Result<(), CodeError> {
        let mut pc = 0;
        while pc < self.bytes.len() {
            let inst = self.decode(pc)?;
            match inst.op {
                OpCode::Const | OpCode::Global | OpCode::GlobalA => {
                    self.check_constant(inst)?;
                }
                OpCode::Const0 | OpCode::Const1 | OpCode::Const2 => {
                    let index = (inst.op as u8 - OpCode::Const0 as u8) as u16;
                    self.check_constant(Instruction {
                        operand: index,
                        ..inst
                    })?;
                }
                op if op.is_jump() && inst.operand as usize > self.bytes.len() => {
                    return Err(CodeError::BadJump {
                        pc,
                        op,
                        target: inst.operand as usize,
                    });
                }
                _ => {}
            }
            pc = inst.next_pc();
        }
        Ok(())
    }

    fn check_constant(&self, inst: Instruction) -> Result<(), CodeError> {
        let index = inst.operand as usize;
        if index >= self.constants.len() {
            return Err(CodeError::BadConstant {
                pc: inst.pc,
                op: inst.op,
                index,
            });
        }
        Ok(())
    }

    /// Decode the instruction starting at `pc`.
    pub fn decode(&self, pc: usize) -> Result<Instruction, CodeError> {
        let byte = *self
            .bytes
            .get(pc)
            .ok_or(CodeError::InvalidOpcode { pc, byte: 0 })?;
        let op = OpCode::from_u8(byte).ok_or(CodeError::InvalidOpcode { pc, byte })?;
        let operand = match op.operand_bytes() {
            0 => 0,
            1 => *self
                .bytes
                .get(pc + 1)
                .ok_or(CodeError::TruncatedOperand { pc, op })? as u16,
            _ => match self.bytes.get(pc + 1..pc + 3) {
                Some(&[lo, hi]) => u16::from_le_bytes([lo, hi]),
                _ => return Err(CodeError::TruncatedOperand { pc, op }),
            },
        };
        Ok(Instruction { pc, op, operand })
    }

    /// Iterate over all instructions in order.
    pub fn instructions(&self) -> impl Iterator<Item = Instruction> + '_ {
        let mut pc = 0;
        std::iter::from_fn(move || {
            let inst = self.decode(pc).ok()?;
            pc = inst.next_pc();
            Some(inst)
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn functions(&self) -> &[FunctionProto] {
        &self.functions
    }

    /// Local slots the code needs beyond its parameters.
    pub fn num_locals(&self) -> usize {
        self.num_locals
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decompose into parts.
    pub fn into_parts(self) -> (Vec<u8>, Vec<Constant>, Vec<FunctionProto>, usize) {
        (self.bytes, self.constants, self.functions, self.num_locals)
    }
}
