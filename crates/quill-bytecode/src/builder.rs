//! Label-based assembler for code objects.
//!
//! Emission methods chain on `&mut Self`. Errors such as constant pool
//! overflow are recorded and reported once by `finish`.

use crate::code::{Code, CodeError, Constant, FunctionProto, MAX_CONSTANTS};
use crate::opcode::OpCode;
use quill_core::string::Str;
use std::rc::Rc;

/// A forward or backward jump target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Label(usize);

#[derive(Default)]
pub struct CodeBuilder {
    bytes: Vec<u8>,
    constants: Vec<Constant>,
    functions: Vec<FunctionProto>,
    num_locals: usize,
    labels: Vec<Option<usize>>,
    /// (operand offset, label) pairs to patch in `finish`.
    fixups: Vec<(usize, Label)>,
    error: Option<CodeError>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        CodeBuilder::default()
    }

    /// Current offset in the byte stream.
    pub fn pos(&self) -> usize {
        self.bytes.len()
    }

    /// Emit an opcode with no operand.
    pub fn emit(&mut self, op: OpCode) -> &mut Self {
        debug_assert_eq!(op.operand_bytes(), 0, "{op} takes an operand");
        self.bytes.push(op as u8);
        self
    }

    /// Emit an opcode with a one-byte operand.
    pub fn emit1(&mut self, op: OpCode, operand: u8) -> &mut Self {
        debug_assert_eq!(op.operand_bytes(), 1, "{op} takes no single-byte operand");
        self.bytes.push(op as u8);
        self.bytes.push(operand);
        self
    }

    /// Add a constant to the pool, returning its index. Deduplicates scalars.
    pub fn constant(&mut self, k: Constant) -> u8 {
        if let Some(i) = self.constants.iter().position(|c| c.same_as(&k)) {
            return i as u8;
        }
        if self.constants.len() >= MAX_CONSTANTS {
            self.error.get_or_insert(CodeError::TooManyConstants);
            return 0;
        }
        self.constants.push(k);
        (self.constants.len() - 1) as u8
    }

    /// Push a constant, using the `Const0/1/2` shorthands when possible.
    pub fn load_constant(&mut self, k: Constant) -> &mut Self {
        let index = self.constant(k);
        match index {
            0 => self.emit(OpCode::Const0),
            1 => self.emit(OpCode::Const1),
            2 => self.emit(OpCode::Const2),
            n => self.emit1(OpCode::Const, n),
        }
    }

    pub fn load_null(&mut self) -> &mut Self {
        self.emit(OpCode::Null)
    }

    pub fn load_int(&mut self, i: i64) -> &mut Self {
        self.load_constant(Constant::Int(i))
    }

    pub fn load_float(&mut self, f: f64) -> &mut Self {
        self.load_constant(Constant::Float(f))
    }

    pub fn load_str(&mut self, s: &str) -> &mut Self {
        self.load_constant(Constant::Str(Rc::new(Str::from(s))))
    }

    pub fn load_regex(&mut self, pattern: &str) -> &mut Self {
        self.load_constant(Constant::Regex(Rc::new(Str::from(pattern))))
    }

    /// Push the value of local `n`.
    pub fn local(&mut self, n: u8) -> &mut Self {
        self.reserve_local(n);
        match n {
            0 => self.emit(OpCode::Local0),
            1 => self.emit(OpCode::Local1),
            2 => self.emit(OpCode::Local2),
            n => self.emit1(OpCode::Local, n),
        }
    }

    /// Push the address of local `n`.
    pub fn local_addr(&mut self, n: u8) -> &mut Self {
        self.reserve_local(n);
        match n {
            0 => self.emit(OpCode::LocalA0),
            1 => self.emit(OpCode::LocalA1),
            2 => self.emit(OpCode::LocalA2),
            n => self.emit1(OpCode::LocalA, n),
        }
    }

    /// Push the value of global `name`.
    pub fn global(&mut self, name: &str) -> &mut Self {
        let k = self.constant(Constant::Str(Rc::new(Str::from(name))));
        self.emit1(OpCode::Global, k)
    }

    /// Push the address of global `name`.
    pub fn global_addr(&mut self, name: &str) -> &mut Self {
        let k = self.constant(Constant::Str(Rc::new(Str::from(name))));
        self.emit1(OpCode::GlobalA, k)
    }

    /// Add a nested function and push it.
    pub fn function(&mut self, proto: FunctionProto) -> &mut Self {
        self.functions.push(proto);
        let index = self.functions.len() - 1;
        self.load_constant(Constant::Function(index))
    }

    /// Call the callee below `argc` arguments on the stack.
    pub fn call(&mut self, argc: u8) -> &mut Self {
        self.emit1(OpCode::Call, argc)
    }

    /// Make sure at least `n` local slots are reserved.
    pub fn locals(&mut self, n: usize) -> &mut Self {
        self.num_locals = self.num_locals.max(n);
        self
    }

    fn reserve_local(&mut self, n: u8) {
        self.num_locals = self.num_locals.max(n as usize + 1);
    }

    /// Create an unbound label.
    pub fn label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind `label` to the current offset.
    pub fn bind(&mut self, label: Label) -> &mut Self {
        self.labels[label.0] = Some(self.bytes.len());
        self
    }

    /// Emit a jump-family opcode targeting `label`.
    pub fn jump(&mut self, op: OpCode, label: Label) -> &mut Self {
        debug_assert!(op.is_jump(), "{op} is not a jump");
        self.bytes.push(op as u8);
        self.fixups.push((self.bytes.len(), label));
        self.bytes.extend_from_slice(&[0, 0]);
        self
    }

    /// Patch jumps and produce the validated code object.
    pub fn finish(self) -> Result<Code, CodeError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut bytes = self.bytes;
        for (at, label) in self.fixups {
            let target = self.labels[label.0].ok_or(CodeError::UnboundLabel(label.0))?;
            let target16 = u16::try_from(target).map_err(|_| CodeError::JumpOutOfRange(target))?;
            bytes[at..at + 2].copy_from_slice(&target16.to_le_bytes());
        }
        Code::new(bytes, self.constants, self.functions, self.num_locals)
    }
}
