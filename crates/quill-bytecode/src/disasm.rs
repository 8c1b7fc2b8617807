/// Bytecode disassembler.
use crate::code::{Code, Constant};
use crate::opcode::OpCode;
use std::fmt::{self, Write};

/// Disassemble a code object (and its nested functions) into a listing.
pub fn disassemble(code: &Code) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = disassemble_code(&mut out, "main", 0, code, 0);
    out
}

fn disassemble_code(
    out: &mut String,
    name: &str,
    arity: u8,
    code: &Code,
    level: usize,
) -> fmt::Result {
    let indent = "  ".repeat(level);
    writeln!(
        out,
        "{indent}function {name} ({arity} params, {} locals, {} constants, {} functions)",
        code.num_locals(),
        code.constants().len(),
        code.functions().len(),
    )?;

    for inst in code.instructions() {
        write!(out, "{indent}\t{:04}\t{:<10}", inst.pc, inst.op.name())?;
        match inst.op.operand_bytes() {
            0 => {}
            _ => write!(out, "\t{}", inst.operand)?,
        }
        let k = match inst.op {
            OpCode::Const | OpCode::Global | OpCode::GlobalA => Some(inst.operand as usize),
            OpCode::Const0 => Some(0),
            OpCode::Const1 => Some(1),
            OpCode::Const2 => Some(2),
            _ => None,
        };
        if let Some(k) = k.and_then(|k| code.constants().get(k)) {
            write!(out, "\t; ")?;
            write_constant(out, k, code)?;
        }
        writeln!(out)?;
    }

    if !code.constants().is_empty() {
        writeln!(out, "{indent}constants ({}):", code.constants().len())?;
        for (i, k) in code.constants().iter().enumerate() {
            write!(out, "{indent}\t{i}\t")?;
            write_constant(out, k, code)?;
            writeln!(out)?;
        }
    }

    for f in code.functions() {
        disassemble_code(out, &f.name, f.arity, &f.code, level + 1)?;
    }
    Ok(())
}

fn write_constant(out: &mut String, k: &Constant, code: &Code) -> fmt::Result {
    match k {
        Constant::Null => write!(out, "null"),
        Constant::Int(i) => write!(out, "{i}"),
        Constant::Float(f) => write!(out, "{}", quill_core::number::format_float(*f)),
        Constant::Str(s) => write!(out, "{s:?}"),
        Constant::Regex(s) => write!(out, "/{s}/"),
        Constant::Function(i) => match code.functions().get(*i) {
            Some(f) => write!(out, "<function {}>", f.name),
            None => write!(out, "<function ?>"),
        },
    }
}
