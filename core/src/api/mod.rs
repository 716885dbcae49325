//! Public API of the transform.
//!
//! [`Emterpreter`] runs the whole pipeline: symbol table, assembler pass 1, memory
//! layout, trampoline patching and interpreter generation.
//!
//! # Example
//!
//! ```
//! use emterp_core::api::{Emterpreter, StaticMemory, TransformOptions};
//! use emterp_core::host::HostModule;
//!
//! let module = HostModule::parse(
//!     "function _f() {\n emterpret(EMTERPRETER__f);\n} // [\"FUNC\", 0, 0, 0, \"RET\", 0, 0, 0]\n",
//! )
//! .unwrap();
//!
//! let emterpreter = Emterpreter::new(TransformOptions::default());
//! let artifacts = emterpreter
//!     .run(&module, Some(StaticMemory::new(&[1, 2, 3])))
//!     .unwrap();
//!
//! assert_eq!(artifacts.layout.code_start(), 16);
//! assert!(artifacts.module_text.contains("emterpret(16);"));
//! ```

mod artifacts;
mod emterpreter;
pub mod error;
pub mod options;

pub use artifacts::{Artifacts, RuntimeBindings};
pub use emterpreter::{Emterpreter, StaticMemory};
pub use error::{Diagnostic, Error, Severity, Span};
pub use options::TransformOptions;
