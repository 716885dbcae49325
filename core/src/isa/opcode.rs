//! Opcode catalogue with stable numeric codes.

use core::fmt;

/// How the three operand bytes following an opcode are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandShape {
    /// Up to three one-byte local indices (`[lx, ly, lz]`), unused ones are zero.
    Locals,
    /// One local followed by a 16-bit immediate (`[l, low, high]`).
    LocalImmediate,
    /// `[target, sig, args..]`, padded to whole words.
    Call,
    /// Function header declaring the local count (`[n, 0, 0]`).
    Prologue,
}

/// An emterpreter opcode.
///
/// The discriminant is the byte stored in the low 8 bits of an instruction word
/// and must never change: the generated interpreters switch on it.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Opcode {
    /// `lx = ly` (32-bit int)
    Set = 0,
    /// `l = STACKTOP` (the native stack top)
    GetStackTop = 1,
    /// `STACKTOP = l`
    SetStackTop = 2,
    /// `l = imm` (16-bit, zero extended)
    SetImmediate = 3,
    /// `lx = ly + lz` (32-bit int)
    Add = 4,
    /// `lx = ly / lz` (32-bit signed)
    SignedDiv = 7,
    /// `lx = ly / lz` (32-bit unsigned)
    UnsignedDiv = 8,
    /// `lx = HEAP8[ly]`
    Load8 = 10,
    /// `lx = HEAP16[ly >> 1]`
    Load16 = 11,
    /// `lx = HEAP32[ly >> 2]`
    Load32 = 12,
    /// `HEAP8[lx] = ly`
    Store8 = 13,
    /// `HEAP16[lx >> 1] = ly`
    Store16 = 14,
    /// `HEAP32[lx >> 2] = ly`
    Store32 = 15,
    /// If `cond` is non-zero, jump by a signed number of words relative to this
    /// instruction.
    BranchIfTrue = 16,
    /// Call a global target with arguments read from locals.
    Call = 253,
    /// Return `l`, coerced to the kind of the running interpreter.
    Return = 254,
    /// Function header: reserves `n` locals. Always the first instruction.
    FunctionPrologue = 255,
}
static_assertions::assert_eq_size!(Opcode, u8);

impl Opcode {
    /// Every opcode, in ascending code order.
    pub const ALL: [Opcode; 17] = [
        Opcode::Set,
        Opcode::GetStackTop,
        Opcode::SetStackTop,
        Opcode::SetImmediate,
        Opcode::Add,
        Opcode::SignedDiv,
        Opcode::UnsignedDiv,
        Opcode::Load8,
        Opcode::Load16,
        Opcode::Load32,
        Opcode::Store8,
        Opcode::Store16,
        Opcode::Store32,
        Opcode::BranchIfTrue,
        Opcode::Call,
        Opcode::Return,
        Opcode::FunctionPrologue,
    ];

    /// The byte value written to the bytecode stream.
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self, InvalidOpcode> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.code() == code)
            .ok_or(InvalidOpcode(code))
    }

    /// Name used in listings emitted by the optimizer.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Set => "SET",
            Self::GetStackTop => "GETST",
            Self::SetStackTop => "SETST",
            Self::SetImmediate => "SETI",
            Self::Add => "ADD",
            Self::SignedDiv => "SDIV",
            Self::UnsignedDiv => "UDIV",
            Self::Load8 => "LOAD8",
            Self::Load16 => "LOAD16",
            Self::Load32 => "LOAD32",
            Self::Store8 => "STORE8",
            Self::Store16 => "STORE16",
            Self::Store32 => "STORE32",
            Self::BranchIfTrue => "BRT",
            Self::Call => "CALL",
            Self::Return => "RET",
            Self::FunctionPrologue => "FUNC",
        }
    }

    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.mnemonic() == name)
    }

    pub const fn shape(self) -> OperandShape {
        match self {
            Self::SetImmediate | Self::BranchIfTrue => OperandShape::LocalImmediate,
            Self::Call => OperandShape::Call,
            Self::FunctionPrologue => OperandShape::Prologue,
            _ => OperandShape::Locals,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.mnemonic())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid opcode: 0x{0:02X}")]
pub struct InvalidOpcode(pub u8);
