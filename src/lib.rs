//! Emterp - run asm.js functions inside a bytecode interpreter
//!
//! # Overview
//!
//! The optimizer leaves a small bytecode listing after the closing brace of every
//! function it wants interpreted. This crate assembles those listings into one
//! bytecode stream, stores it in static memory next to a dedicated interpreter
//! stack, points each function's trampoline at its bytecode and appends the
//! interpreter loops to the module. Interpreted functions can then be suspended and
//! resumed without native stack support.
//!
//! # Quick Start
//!
//! ```
//! use emterp::{Emterpreter, HostModule, StaticMemory, TransformOptions};
//!
//! let module = HostModule::parse(concat!(
//!     "var abort = env.abort;\n",
//!     "function _f() {\n",
//!     " emterpret(EMTERPRETER__f);\n",
//!     "} // [\"FUNC\", 1, 0, 0, \"RET\", 0, 0, 0]\n",
//! ))
//! .unwrap();
//!
//! let artifacts = Emterpreter::new(TransformOptions::default())
//!     .run(&module, Some(StaticMemory::new(&[0; 8])))
//!     .unwrap();
//!
//! for diagnostic in &artifacts.diagnostics {
//!     emterp::render_diagnostic(diagnostic);
//! }
//! assert!(artifacts.module_text.contains("emterpret(16);"));
//! ```

mod error_renderer;

pub use error_renderer::{
    render_diagnostic, render_diagnostic_to, render_diagnostic_to_string,
    render_diagnostic_to_string_no_color, render_error,
};

// Re-export public API from emterp_core
pub use emterp_core::api::{
    Artifacts, Diagnostic, Emterpreter, Error, RuntimeBindings, Severity, Span, StaticMemory,
    TransformOptions,
};
pub use emterp_core::host::HostModule;

// Lower-level building blocks
pub use emterp_core::{assembler, generator, host, isa, layout, patcher, symbols};
