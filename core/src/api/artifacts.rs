use crate::api::Diagnostic;
use crate::assembler::{AssembledProgram, Disassembly};
use crate::generator::{STACK_MAX, STACK_TOP};
use crate::layout::MemoryLayout;
use crate::symbols::SymbolTable;
use crate::{String, Vec, format, vec};

/// Glue the loader needs to hand the interpreter stack to the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeBindings {
    /// Loader statement computing the stack bounds from `STATIC_BASE`.
    pub prelude: String,
    /// Entries to splice into the module's `env` object literal.
    pub env_entries: String,
    /// Declarations importing the stack bounds inside the module.
    pub imports: Vec<String>,
}

impl RuntimeBindings {
    pub fn new(layout: &MemoryLayout) -> Self {
        Self {
            prelude: format!(
                "var {} = STATIC_BASE + {}, {} = {} + {};",
                STACK_TOP, layout.stack_offset, STACK_MAX, STACK_TOP, layout.stack_capacity
            ),
            env_entries: format!(
                "\"{0}\": {0}, \"{1}\": {1}, ",
                STACK_TOP, STACK_MAX
            ),
            imports: vec![
                format!("var {0} = env.{0}|0;", STACK_TOP),
                format!("var {0} = env.{0}|0;", STACK_MAX),
            ],
        }
    }
}

/// Everything the transform produces.
#[derive(Debug, Clone)]
pub struct Artifacts {
    /// The host module with trampolines patched, listings stripped, runtime imports
    /// added and the interpreters appended.
    pub module_text: String,
    /// New static memory contents: original data, zero tail, bytecode, padding.
    pub memory: Vec<u8>,
    pub layout: MemoryLayout,
    pub bindings: RuntimeBindings,
    pub symbols: SymbolTable,
    pub program: AssembledProgram,
    /// Generated interpreter routines, void/int/double.
    pub interpreters: Vec<String>,
    /// Warnings about skipped listings and unpatched trampolines.
    pub diagnostics: Vec<Diagnostic>,
}

impl Artifacts {
    /// Absolute bytecode address of every interpreted function, in program order.
    pub fn entry_points(&self) -> impl Iterator<Item = (&str, u32)> {
        let code_start = self.layout.code_start();
        self.program
            .functions
            .iter()
            .map(move |f| (f.name.as_str(), code_start + f.offset as u32))
    }

    pub fn disassemble(&self) -> Disassembly<'_> {
        self.program.disassemble(&self.symbols)
    }
}
