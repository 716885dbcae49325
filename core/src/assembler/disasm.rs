use core::fmt;

use hashbrown::HashMap;

use crate::assembler::{AssembledFunction, AssembledProgram};
use crate::isa::{Instruction, WORD_SIZE};
use crate::symbols::SymbolTable;
use crate::{Vec, format};

/// Display adapter printing an [`AssembledProgram`] with symbol names and branch labels.
pub struct Disassembly<'a> {
    program: &'a AssembledProgram,
    symbols: &'a SymbolTable,
}

impl<'a> Disassembly<'a> {
    pub(crate) fn new(program: &'a AssembledProgram, symbols: &'a SymbolTable) -> Self {
        Self { program, symbols }
    }

    fn function(&self, f: &mut fmt::Formatter<'_>, function: &AssembledFunction) -> fmt::Result {
        writeln!(
            f,
            "{} @{} ({} bytes, {} locals):",
            function.name, function.offset, function.len, function.locals
        )?;

        // Branch targets are byte offsets relative to the function start.
        let mut addresses = Vec::with_capacity(function.instructions.len());
        let mut targets = Vec::new();
        let mut addr = 0isize;
        for instr in &function.instructions {
            addresses.push(addr);
            if let Some(offset) = instr.branch_offset() {
                targets.push(addr + offset as isize * WORD_SIZE as isize);
            }
            addr += instr.encoded_len() as isize;
        }
        targets.sort_unstable();
        targets.dedup();
        let labels: HashMap<isize, usize> = targets
            .into_iter()
            .enumerate()
            .map(|(i, addr)| (addr, i))
            .collect();

        for (instr, &addr) in function.instructions.iter().zip(&addresses) {
            let label = labels
                .get(&addr)
                .map(|l| format!("L{}:", l))
                .unwrap_or_default();
            write!(f, "  {:6} {:>4}  {}", addr, label, instr)?;

            match instr {
                Instruction::Call {
                    target, signature, ..
                } => {
                    let name = self.symbols.name_of(*target).unwrap_or("?");
                    match self.program.registry.signature(*target, *signature) {
                        Some(sig) => write!(f, "  ; {} {}", name, sig)?,
                        None => write!(f, "  ; {}", name)?,
                    }
                }
                _ => {
                    if let Some(offset) = instr.branch_offset() {
                        let target = addr + offset as isize * WORD_SIZE as isize;
                        match labels.get(&target) {
                            Some(l) => write!(f, " (to L{})", l)?,
                            None => write!(f, " (to @{})", target)?,
                        }
                    }
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for Disassembly<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, function) in self.program.functions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            self.function(f, function)?;
        }
        Ok(())
    }
}
