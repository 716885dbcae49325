//! Interpreter generator.
//!
//! Emits one asm.js dispatch loop per return kind. The loop body is table driven:
//! every [`Opcode`] maps to one `case` through an exhaustive match, so the
//! instruction set and the interpreter cannot drift apart.
//!
//! Frames live on the dedicated interpreter stack. Local `l` of the running function
//! is the 8-byte slot at `sp + (l << 3)`, read as `HEAP32` for integers and `HEAPF64`
//! for doubles.

mod emitter;

#[cfg(test)]
mod generator_test;

use core::fmt;

use emitter::Emitter;

use crate::assembler::CallSignatureRegistry;
use crate::isa::{Instruction, Opcode, Signature, ValueKind};
use crate::symbols::SymbolTable;
use crate::{String, Vec, format};

/// Runtime variable holding the interpreter stack top.
pub const STACK_TOP: &str = "EMTSTACKTOP";

/// Runtime variable holding the interpreter stack limit.
pub const STACK_MAX: &str = "EMT_STACK_MAX";

/// Which value an interpreter routine returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterpreterKind {
    Void,
    Int,
    Double,
}

impl InterpreterKind {
    pub const ALL: [InterpreterKind; 3] = [Self::Void, Self::Int, Self::Double];

    /// Name of the generated routine, as called by trampolines.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Void => "emterpret",
            Self::Int => "emterpret_i",
            Self::Double => "emterpret_d",
        }
    }
}

impl fmt::Display for InterpreterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Integer view of local `l`, uncoerced.
fn int_slot(l: &str) -> String {
    format!("HEAP32[sp + ({} << 3) >> 2]", l)
}

/// Double view of local `l`, uncoerced.
fn double_slot(l: &str) -> String {
    format!("HEAPF64[sp + ({} << 3) >> 3]", l)
}

fn int_value(l: &str) -> String {
    format!("{}|0", int_slot(l))
}

fn unsigned_value(l: &str) -> String {
    format!("{}>>>0", int_slot(l))
}

fn double_value(l: &str) -> String {
    format!("+{}", double_slot(l))
}

/// Generates interpreter routines for one assembled program.
pub struct InterpreterGenerator<'a> {
    registry: &'a CallSignatureRegistry,
    symbols: &'a SymbolTable,
}

impl<'a> InterpreterGenerator<'a> {
    pub fn new(registry: &'a CallSignatureRegistry, symbols: &'a SymbolTable) -> Self {
        Self { registry, symbols }
    }

    /// All three routines, in [`InterpreterKind::ALL`] order.
    pub fn generate_all(&self) -> Vec<String> {
        InterpreterKind::ALL
            .iter()
            .map(|kind| self.generate(*kind))
            .collect()
    }

    pub fn generate(&self, kind: InterpreterKind) -> String {
        let mut e = Emitter::new();
        e.open(&format!("function {}(pc) {{", kind.name()));
        e.line("pc = pc | 0;");
        e.line("var sp = 0, inst = 0, lx = 0, ly = 0, lz = 0;");
        e.line(&format!("sp = {};", STACK_TOP));
        e.line(&format!(
            "if ((HEAPU8[pc >> 0] | 0) != {}) abort();",
            Opcode::FunctionPrologue.code()
        ));
        e.line(&format!(
            "{0} = {0} + (HEAPU8[pc + 1 >> 0] << 3) | 0;",
            STACK_TOP
        ));
        e.line(&format!(
            "if (({} | 0) > ({} | 0)) abort();",
            STACK_TOP, STACK_MAX
        ));
        e.line("pc = pc + 4 | 0;");

        e.open("while (1) {");
        e.line("inst = HEAP32[pc >> 2] | 0;");
        e.line("lx = inst >> 8 & 255;");
        e.line("ly = inst >> 16 & 255;");
        e.line("lz = inst >>> 24;");
        e.open("switch (inst & 255) {");
        for opcode in Opcode::ALL {
            if opcode == Opcode::Call {
                self.call_case(&mut e);
            } else if let Some(body) = case_body(opcode, kind) {
                e.line(&format!("case {}: {} break;", opcode.code(), body));
            }
        }
        e.line("default: abort();");
        e.close("}");
        e.line("pc = pc + 4 | 0;");
        e.close("}");

        match kind {
            InterpreterKind::Void => {}
            InterpreterKind::Int => e.line("return 0;"),
            InterpreterKind::Double => e.line("return 0.0;"),
        }
        e.close("}");
        e.finish()
    }

    /// Nested dispatch on target id (`lx`) then signature index (`ly`), one inlined
    /// call per registered signature.
    fn call_case(&self, e: &mut Emitter) {
        e.open(&format!("case {}: {{", Opcode::Call.code()));
        e.open("switch (lx | 0) {");
        for (target, signatures) in self.registry.iter() {
            let Some(name) = self.symbols.name_of(target) else {
                continue;
            };
            e.open(&format!("case {}: {{", target));
            e.open("switch (ly | 0) {");
            for (index, signature) in signatures.iter().enumerate() {
                e.open(&format!("case {}: {{", index));
                e.line(&call_statement(name, signature));
                e.line(&format!(
                    "pc = pc + {} | 0;",
                    Instruction::call_len(signature.arity())
                ));
                e.line("continue;");
                e.close("}");
            }
            e.line("default: abort();");
            e.close("}");
            e.line("break;");
            e.close("}");
        }
        e.line("default: abort();");
        e.close("}");
        e.line("break;");
        e.close("}");
    }
}

/// Statement for one `case`, without the trailing `break`.
///
/// `None` for opcodes that are never dispatched: `FUNC` only appears at entry and
/// `CALL` needs the registry.
fn case_body(opcode: Opcode, kind: InterpreterKind) -> Option<String> {
    let body = match opcode {
        Opcode::Set => format!("{} = {};", int_slot("lx"), int_value("ly")),
        Opcode::GetStackTop => format!("{} = STACKTOP;", int_slot("lx")),
        Opcode::SetStackTop => format!("STACKTOP = {};", int_value("lx")),
        Opcode::SetImmediate => format!("{} = inst >>> 16;", int_slot("lx")),
        Opcode::Add => format!(
            "{} = ({}) + ({}) | 0;",
            int_slot("lx"),
            int_value("ly"),
            int_value("lz")
        ),
        Opcode::SignedDiv => format!(
            "{} = ({}) / ({}) | 0;",
            int_slot("lx"),
            int_value("ly"),
            int_value("lz")
        ),
        Opcode::UnsignedDiv => format!(
            "{} = ({}) / ({}) >>> 0;",
            int_slot("lx"),
            unsigned_value("ly"),
            unsigned_value("lz")
        ),
        Opcode::Load8 => format!("{} = HEAP8[{} >> 0];", int_slot("lx"), int_slot("ly")),
        Opcode::Load16 => format!("{} = HEAP16[{} >> 1];", int_slot("lx"), int_slot("ly")),
        Opcode::Load32 => format!("{} = HEAP32[{} >> 2];", int_slot("lx"), int_slot("ly")),
        Opcode::Store8 => format!("HEAP8[{} >> 0] = {};", int_slot("lx"), int_value("ly")),
        Opcode::Store16 => format!("HEAP16[{} >> 1] = {};", int_slot("lx"), int_value("ly")),
        Opcode::Store32 => format!("HEAP32[{} >> 2] = {};", int_slot("lx"), int_value("ly")),
        Opcode::BranchIfTrue => format!(
            "if ({}) {{ pc = pc + ((inst >> 16) << 2) | 0; continue; }}",
            int_value("lx")
        ),
        Opcode::Return => match kind {
            InterpreterKind::Void => format!("{} = sp; return;", STACK_TOP),
            InterpreterKind::Int => format!("{} = sp; return {};", STACK_TOP, int_value("lx")),
            InterpreterKind::Double => {
                format!("{} = sp; return {};", STACK_TOP, double_value("lx"))
            }
        },
        Opcode::Call | Opcode::FunctionPrologue => return None,
    };
    Some(body)
}

/// An inlined call with its result coerced to the callee's return kind and dropped.
fn call_statement(name: &str, signature: &Signature) -> String {
    let args = signature
        .params
        .iter()
        .enumerate()
        .map(|(i, param)| {
            let slot = format!("HEAPU8[pc + {} >> 0]", i + 3);
            match param {
                ValueKind::Int => int_value(&slot),
                ValueKind::Float | ValueKind::Double => double_value(&slot),
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    match signature.ret {
        None => format!("{}({});", name, args),
        Some(ValueKind::Int) => format!("{}({})|0;", name, args),
        Some(ValueKind::Float | ValueKind::Double) => format!("+{}({});", name, args),
    }
}
