//! The transform pipeline.

use super::{Artifacts, Error, RuntimeBindings, TransformOptions};
use crate::assembler::Assembler;
use crate::generator::InterpreterGenerator;
use crate::host::HostModule;
use crate::layout::MemoryImage;
use crate::patcher::patch_trampolines;
use crate::symbols::SymbolTable;
use crate::{String, ToString, Vec};

/// The module's initialized static memory.
#[derive(Debug, Clone, Copy)]
pub struct StaticMemory<'a> {
    pub data: &'a [u8],
    /// Declared static size. Data shorter than this is followed by zeros.
    pub size: u32,
}

impl<'a> StaticMemory<'a> {
    /// Static memory whose declared size is exactly `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            size: data.len() as u32,
        }
    }

    pub fn with_size(data: &'a [u8], size: u32) -> Self {
        Self { data, size }
    }
}

/// Moves functions that carry a listing into the interpreter.
///
/// The transform is deterministic: the same module, memory and options always
/// produce byte-identical artifacts.
#[derive(Debug, Clone, Default)]
pub struct Emterpreter {
    options: TransformOptions,
}

impl Emterpreter {
    pub fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Run the transform.
    ///
    /// Fatal problems return an [`Error`] and nothing else. Functions whose listing
    /// does not parse stay native and are reported in [`Artifacts::diagnostics`].
    pub fn run(
        &self,
        module: &HostModule,
        memory: Option<StaticMemory<'_>>,
    ) -> Result<Artifacts, Error> {
        let memory = memory.ok_or(Error::MissingMemoryImage)?;

        let symbols = SymbolTable::build(
            &module.imports,
            module.functions().map(|function| function.name.as_str()),
        )?;
        let (program, mut diagnostics) = Assembler::assemble(module, &symbols)?;

        let image = MemoryImage::build(memory.data, memory.size, &program.bytecode, &self.options)?;
        let layout = image.layout;

        let mut patched = module.clone();
        let report = patch_trampolines(&mut patched, &program, layout.code_start());
        diagnostics.extend(report.diagnostics);

        let interpreters = InterpreterGenerator::new(&program.registry, &symbols).generate_all();
        let bindings = RuntimeBindings::new(&layout);
        let appended: Vec<String> = interpreters
            .iter()
            .map(|source| source.trim_end().to_string())
            .collect();
        let module_text = patched.render(&bindings.imports, &appended);

        tracing::info!(
            symbols = symbols.len(),
            functions = program.functions.len(),
            bytes = program.bytecode.len(),
            patched = report.patched,
            warnings = diagnostics.len(),
            "emterpreted module"
        );

        Ok(Artifacts {
            module_text,
            memory: image.blob,
            layout,
            bindings,
            symbols,
            program,
            interpreters,
            diagnostics,
        })
    }
}
