//! Tagged instruction representation.
//!
//! [`PseudoInstruction`] is what a listing lowers to: call targets and signatures are
//! still symbolic. Pass 1 of the assembler resolves them into an [`Instruction`], the
//! only form that can be encoded.

use core::fmt;

use crate::Vec;
use crate::isa::{Opcode, OperandShape, Signature};

/// Size of one instruction word in bytes.
pub const WORD_SIZE: usize = 4;

/// An instruction, generic over how call targets and signatures are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr<Target, Sig> {
    /// Any fixed-width instruction: opcode plus its three operand bytes.
    Op { opcode: Opcode, operands: [u8; 3] },
    /// `CALL target(args..)` with one local index per argument.
    Call {
        target: Target,
        signature: Sig,
        args: Vec<u8>,
    },
}

/// Call target named by symbol, signature carried in full.
pub type PseudoInstruction = Instr<crate::String, Signature>;

/// Call target resolved to its global id, signature to its registry index.
pub type Instruction = Instr<u8, u8>;

impl<Target, Sig> Instr<Target, Sig> {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Op { opcode, .. } => *opcode,
            Self::Call { .. } => Opcode::Call,
        }
    }

    /// Encoded size in bytes, always a multiple of [`WORD_SIZE`].
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Op { .. } => WORD_SIZE,
            Self::Call { args, .. } => Self::call_len(args.len()),
        }
    }

    /// Encoded size of a call carrying `arity` argument bytes.
    pub const fn call_len(arity: usize) -> usize {
        (3 + arity).div_ceil(WORD_SIZE) * WORD_SIZE
    }

    /// The 16-bit immediate of `SETI`.
    pub fn immediate(&self) -> Option<u16> {
        match self {
            Self::Op {
                opcode: Opcode::SetImmediate,
                operands: [_, low, high],
            } => Some(u16::from_le_bytes([*low, *high])),
            _ => None,
        }
    }

    /// The signed word offset of `BRT`, relative to the branch itself.
    pub fn branch_offset(&self) -> Option<i16> {
        match self {
            Self::Op {
                opcode: Opcode::BranchIfTrue,
                operands: [_, low, high],
            } => Some(i16::from_le_bytes([*low, *high])),
            _ => None,
        }
    }
}

impl Instruction {
    /// Append the little-endian encoding of this instruction to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::Op { opcode, operands } => {
                out.push(opcode.code());
                out.extend_from_slice(operands);
            }
            Self::Call {
                target,
                signature,
                args,
            } => {
                let start = out.len();
                out.push(Opcode::Call.code());
                out.push(*target);
                out.push(*signature);
                out.extend_from_slice(args);
                out.resize(start + self.encoded_len(), 0);
            }
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Op { opcode, operands } => match opcode.shape() {
                OperandShape::LocalImmediate => match self.branch_offset() {
                    Some(offset) => write!(f, "{:8} l{}, {}", opcode, operands[0], offset),
                    None => write!(
                        f,
                        "{:8} l{}, {}",
                        opcode,
                        operands[0],
                        u16::from_le_bytes([operands[1], operands[2]])
                    ),
                },
                OperandShape::Prologue => write!(f, "{:8} {}", opcode, operands[0]),
                _ => write!(
                    f,
                    "{:8} l{}, l{}, l{}",
                    opcode, operands[0], operands[1], operands[2]
                ),
            },
            Self::Call {
                target,
                signature,
                args,
            } => {
                write!(f, "{:8} #{}/{} (", Opcode::Call, target, signature)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "l{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec;

    #[test]
    fn test_op_encoding_is_one_word() {
        let mut out = Vec::new();
        let add = Instruction::Op {
            opcode: Opcode::Add,
            operands: [1, 2, 3],
        };
        add.encode(&mut out);
        assert_eq!(out, vec![4, 1, 2, 3]);
        assert_eq!(add.encoded_len(), WORD_SIZE);
    }

    #[test]
    fn test_call_is_padded_to_words() {
        assert_eq!(Instruction::call_len(0), 4);
        assert_eq!(Instruction::call_len(1), 4);
        assert_eq!(Instruction::call_len(2), 8);
        assert_eq!(Instruction::call_len(5), 8);
        assert_eq!(Instruction::call_len(6), 12);

        let call = Instruction::Call {
            target: 7,
            signature: 1,
            args: vec![4, 5],
        };
        let mut out = Vec::new();
        call.encode(&mut out);
        assert_eq!(out, vec![253, 7, 1, 4, 5, 0, 0, 0]);
    }

    #[test]
    fn test_immediates() {
        let seti = Instruction::Op {
            opcode: Opcode::SetImmediate,
            operands: [2, 0x34, 0x12],
        };
        assert_eq!(seti.immediate(), Some(0x1234));
        assert_eq!(seti.branch_offset(), None);

        let back = Instruction::Op {
            opcode: Opcode::BranchIfTrue,
            operands: [0, 0xFE, 0xFF],
        };
        assert_eq!(back.branch_offset(), Some(-2));
    }

    #[test]
    fn test_display() {
        let brt = Instruction::Op {
            opcode: Opcode::BranchIfTrue,
            operands: [3, 0xFF, 0xFF],
        };
        assert_eq!(format!("{}", brt), "BRT      l3, -1");

        let call = Instruction::Call {
            target: 2,
            signature: 0,
            args: vec![1, 4],
        };
        assert_eq!(format!("{}", call), "CALL     #2/0 (l1, l4)");
    }
}
