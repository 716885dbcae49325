//! Bytecode assembler.
//!
//! Each function's listing is lowered to [`PseudoInstruction`]s, then pass 1 resolves
//! call targets through the [`SymbolTable`] and signatures through the
//! [`CallSignatureRegistry`], and appends the encoded words to one shared stream.
//! A function's offset is the stream length at the moment it is appended.

mod disasm;
mod error;
pub(crate) mod listing;
mod registry;


pub use disasm::Disassembly;
pub use error::{ListingError, ListingErrorKind};
pub use listing::parse_listing;
pub use registry::CallSignatureRegistry;

use crate::api::{Diagnostic, Error};
use crate::host::HostModule;
use crate::isa::{Instruction, Opcode, PseudoInstruction};
use crate::symbols::SymbolTable;
use crate::{String, ToString, Vec};

/// One function's slice of the bytecode stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledFunction {
    pub name: String,
    /// Byte offset into [`AssembledProgram::bytecode`].
    pub offset: usize,
    /// Encoded length in bytes.
    pub len: usize,
    /// Local slots reserved by the `FUNC` prologue.
    pub locals: u8,
    pub instructions: Vec<Instruction>,
}

/// Result of pass 1. Read-only from here on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledProgram {
    pub bytecode: Vec<u8>,
    /// Functions in program order.
    pub functions: Vec<AssembledFunction>,
    pub registry: CallSignatureRegistry,
}

impl AssembledProgram {
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.function(name).map(|f| f.offset)
    }

    pub fn function(&self, name: &str) -> Option<&AssembledFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Human-readable listing of the whole program.
    pub fn disassemble<'a>(&'a self, symbols: &'a SymbolTable) -> Disassembly<'a> {
        Disassembly::new(self, symbols)
    }
}

/// Pass 1 state.
pub struct Assembler<'s> {
    symbols: &'s SymbolTable,
    registry: CallSignatureRegistry,
    bytecode: Vec<u8>,
    functions: Vec<AssembledFunction>,
    diagnostics: Vec<Diagnostic>,
}

impl<'s> Assembler<'s> {
    pub fn new(symbols: &'s SymbolTable) -> Self {
        Self {
            symbols,
            registry: CallSignatureRegistry::new(),
            bytecode: Vec::new(),
            functions: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Assemble every function of `module` that carries a listing.
    pub fn assemble(
        module: &HostModule,
        symbols: &SymbolTable,
    ) -> Result<(AssembledProgram, Vec<Diagnostic>), Error> {
        let mut assembler = Assembler::new(symbols);
        for function in module.functions() {
            if let Some(listing) = &function.listing {
                assembler.add_function(&function.name, listing)?;
            }
        }
        Ok(assembler.finish())
    }

    /// Lower, resolve and append one function.
    ///
    /// A listing that does not parse is skipped with a warning diagnostic; only an
    /// unknown opcode, an unknown call target or an exhausted signature space fail.
    pub fn add_function(&mut self, name: &str, listing: &str) -> Result<(), Error> {
        tracing::debug!(function = name, raw = listing, "raw bytecode");

        let pseudo = match parse_listing(listing) {
            Ok(pseudo) => pseudo,
            Err(err) => {
                let err = err.escalate(name)?;
                tracing::warn!(function = name, error = %err, "skipping malformed listing");
                self.diagnostics.push(err.to_diagnostic(name, listing));
                return Ok(());
            }
        };

        let instructions = pseudo
            .into_iter()
            .map(|instr| self.resolve(name, instr))
            .collect::<Result<Vec<_>, _>>()?;

        let offset = self.bytecode.len();
        for instr in &instructions {
            instr.encode(&mut self.bytecode);
        }
        let len = self.bytecode.len() - offset;
        tracing::debug!(
            function = name,
            offset,
            processed = ?&self.bytecode[offset..],
            "processed bytecode"
        );

        let locals = match instructions.first() {
            Some(Instruction::Op {
                opcode: Opcode::FunctionPrologue,
                operands,
            }) => operands[0],
            _ => 0,
        };
        self.functions.push(AssembledFunction {
            name: name.to_string(),
            offset,
            len,
            locals,
            instructions,
        });
        Ok(())
    }

    fn resolve(&mut self, function: &str, instr: PseudoInstruction) -> Result<Instruction, Error> {
        match instr {
            PseudoInstruction::Op { opcode, operands } => Ok(Instruction::Op { opcode, operands }),
            PseudoInstruction::Call {
                target,
                signature,
                args,
            } => {
                let id = self
                    .symbols
                    .id_of(&target)
                    .ok_or_else(|| Error::UnknownCallTarget {
                        function: function.to_string(),
                        target: target.clone(),
                    })?;
                let index = self
                    .registry
                    .register(id, &signature)
                    .ok_or(Error::SignatureSpaceExhausted { target })?;
                Ok(Instruction::Call {
                    target: id,
                    signature: index,
                    args,
                })
            }
        }
    }

    pub fn finish(self) -> (AssembledProgram, Vec<Diagnostic>) {
        tracing::debug!(
            functions = self.functions.len(),
            bytes = self.bytecode.len(),
            "assembled program"
        );
        (
            AssembledProgram {
                bytecode: self.bytecode,
                functions: self.functions,
                registry: self.registry,
            },
            self.diagnostics,
        )
    }
}
