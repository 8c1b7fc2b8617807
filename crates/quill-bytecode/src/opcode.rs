/// Byte opcodes for the Quill stack machine.
///
/// Instruction format: one opcode byte followed by 0, 1 or 2 operand bytes.
/// - One-byte operands are constant, local or count indices.
/// - Two-byte operands are absolute jump targets, little-endian.
///
/// The `*0/1/2` variants of `Const`, `Local` and `LocalA` are shorthands for
/// the indexed form with that operand and behave identically.
use std::fmt;

macro_rules! opcodes {
    ($($name:ident => $text:literal, $operands:literal;)*) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum OpCode {
            $($name,)*
        }

        impl OpCode {
            /// Every opcode, in byte order.
            pub const ALL: &'static [OpCode] = &[$(OpCode::$name,)*];

            /// Mnemonic used by the disassembler.
            pub fn name(self) -> &'static str {
                match self {
                    $(OpCode::$name => $text,)*
                }
            }

            /// Number of operand bytes following the opcode.
            pub fn operand_bytes(self) -> usize {
                match self {
                    $(OpCode::$name => $operands,)*
                }
            }
        }
    };
}

opcodes! {
    Nop => "NOP", 0;
    Pop => "POP", 0;
    Dup => "DUP", 0;
    Null => "NULL", 0;
    Const => "CONST", 1;
    Const0 => "CONST0", 0;
    Const1 => "CONST1", 0;
    Const2 => "CONST2", 0;
    Local => "LOCAL", 1;
    Local0 => "LOCAL0", 0;
    Local1 => "LOCAL1", 0;
    Local2 => "LOCAL2", 0;
    LocalA => "LOCALA", 1;
    LocalA0 => "LOCALA0", 0;
    LocalA1 => "LOCALA1", 0;
    LocalA2 => "LOCALA2", 0;
    Global => "GLOBAL", 1;
    GlobalA => "GLOBALA", 1;
    Array => "ARRAY", 1;
    Map => "MAP", 1;
    Idx => "IDX", 0;
    IdxA => "IDXA", 0;
    Assign => "ASSIGN", 0;
    AddAssign => "ADDASSIGN", 0;
    SubAssign => "SUBASSIGN", 0;
    MulAssign => "MULASSIGN", 0;
    DivAssign => "DIVASSIGN", 0;
    ModAssign => "MODASSIGN", 0;
    PowAssign => "POWASSIGN", 0;
    CatAssign => "CATASSIGN", 0;
    BitAndAssign => "BANDASSIGN", 0;
    BitOrAssign => "BORASSIGN", 0;
    BitXorAssign => "BXORASSIGN", 0;
    ShlAssign => "SHLASSIGN", 0;
    ShrAssign => "SHRASSIGN", 0;
    PreInc => "PREINC", 0;
    PreDec => "PREDEC", 0;
    PostInc => "POSTINC", 0;
    PostDec => "POSTDEC", 0;
    Add => "ADD", 0;
    Sub => "SUB", 0;
    Mul => "MUL", 0;
    Div => "DIV", 0;
    Mod => "MOD", 0;
    Pow => "POW", 0;
    BitAnd => "BAND", 0;
    BitOr => "BOR", 0;
    BitXor => "BXOR", 0;
    Shl => "SHL", 0;
    Shr => "SHR", 0;
    Neg => "NEG", 0;
    Num => "NUM", 0;
    BitNot => "BNOT", 0;
    Not => "NOT", 0;
    Len => "LEN", 0;
    Eq => "EQ", 0;
    Ne => "NE", 0;
    Lt => "LT", 0;
    Le => "LE", 0;
    Gt => "GT", 0;
    Ge => "GE", 0;
    Match => "MATCH", 0;
    NotMatch => "NOTMATCH", 0;
    Cat => "CAT", 0;
    CatN => "CATN", 1;
    Range => "RANGE", 0;
    RangeStep => "RANGESTEP", 0;
    Jmp => "JMP", 2;
    Jz => "JZ", 2;
    Jnz => "JNZ", 2;
    JzKeep => "JZKEEP", 2;
    JnzKeep => "JNZKEEP", 2;
    Call => "CALL", 1;
    Ret => "RET", 0;
    Ret0 => "RET0", 0;
    IterValue => "ITERV", 1;
    IterKeyValue => "ITERKV", 1;
    IterNext => "ITERNEXT", 2;
    IterPop => "ITERPOP", 0;
}

impl OpCode {
    /// Number of opcodes.
    pub const COUNT: usize = Self::ALL.len();

    /// Get the opcode from a u8 value.
    pub fn from_u8(val: u8) -> Option<OpCode> {
        Self::ALL.get(val as usize).copied()
    }

    /// Total encoded size: opcode byte plus operands.
    pub fn width(self) -> usize {
        1 + self.operand_bytes()
    }

    /// True for opcodes whose operand is a jump target.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            OpCode::Jmp
                | OpCode::Jz
                | OpCode::Jnz
                | OpCode::JzKeep
                | OpCode::JnzKeep
                | OpCode::IterNext
        )
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
