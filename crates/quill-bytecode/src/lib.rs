//! Quill bytecode: opcodes, code objects, the assembler and the disassembler.

pub mod builder;
pub mod code;
pub mod disasm;
pub mod opcode;

pub use builder::{CodeBuilder, Label};
pub use code::{Code, CodeError, Constant, FunctionProto, Instruction, MAX_CONSTANTS};
pub use opcode::OpCode;
