//! Emterpreter instruction set.
//!
//! The opcode catalogue in [`Opcode`] is the single table shared by the listing
//! lowering, the disassembler and the interpreter generator.
//!
//! # Instruction Format
//!
//! Every instruction is one or more little-endian 32-bit words:
//! ```text
//! ┌────────────┬────────────┬────────────┬────────────┐
//! │   Opcode   │     lx     │     ly     │     lz     │
//! │  (8 bits)  │  (8 bits)  │  (8 bits)  │  (8 bits)  │
//! └────────────┴────────────┴────────────┴────────────┘
//! ```
//!
//! `ly`/`lz` double as a 16-bit immediate for `SETI` and `BRT`. `CALL` is the only
//! variable-length instruction: `[CALL, target, sig, arg0, arg1, ...]`, zero padded
//! to a whole number of words.
//!
//! Locals are 8-byte slots addressed relative to the frame base (`sp + l * 8`).

mod instruction;
mod opcode;
mod signature;

pub use instruction::{Instr, Instruction, PseudoInstruction, WORD_SIZE};
pub use opcode::{InvalidOpcode, Opcode, OperandShape};
pub use signature::{InvalidSignature, Signature, ValueKind};

/// Size in bytes of one local register slot.
pub const LOCAL_SLOT_SIZE: u32 = 8;
