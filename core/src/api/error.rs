//! Public error and diagnostic types.
//!
//! [`Error`] is fatal: the pipeline stops and produces no artifacts. Recoverable
//! conditions (a listing that fails to parse, a trampoline that cannot be patched)
//! are reported as warning [`Diagnostic`]s alongside the artifacts instead.

use core::fmt;
use core::ops::Range;

use crate::{String, ToString, Vec, vec};

/// Byte range into the text a diagnostic refers to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span(pub Range<usize>);

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self(start..end)
    }
}

/// Fatal transform errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// More callable symbols than a one-byte operand can address.
    #[error("Too many call targets: {count} (limit: 255)")]
    SymbolSpaceExhausted { count: usize },

    /// More distinct call signatures for one target than a one-byte operand can address.
    #[error("Too many call signatures for '{target}' (limit: 256)")]
    SignatureSpaceExhausted { target: String },

    /// A listing names an opcode outside the instruction set.
    #[error("Unknown opcode '{mnemonic}' in '{function}'")]
    UnknownOpcode { function: String, mnemonic: String },

    /// A listing calls a symbol that has no global id.
    #[error("Unknown call target '{target}' in '{function}'")]
    UnknownCallTarget { function: String, target: String },

    /// The initialized static data does not fit in the declared static size.
    #[error("Static data is {data_len} bytes but only {static_size} bytes are declared")]
    MemoryBudgetExceeded { data_len: usize, static_size: u32 },

    /// The static base must keep the code and stack regions 8-byte aligned.
    #[error("Static base {base} is not 8-byte aligned")]
    MisalignedStaticBase { base: u32 },

    /// The final image would not be addressable with 32-bit pointers.
    #[error("Memory image of {size} bytes exceeds the 32-bit address space")]
    AddressSpaceExhausted { size: u64 },

    /// No initialized static memory was supplied.
    #[error("Missing static memory image")]
    MissingMemoryImage,

    /// The host module breaks the function block conventions.
    #[error("Malformed module at line {line}: {message}")]
    MalformedModule { line: usize, message: String },
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::SymbolSpaceExhausted { .. } => "E001",
            Error::SignatureSpaceExhausted { .. } => "E002",
            Error::UnknownOpcode { .. } => "E003",
            Error::UnknownCallTarget { .. } => "E004",
            Error::MemoryBudgetExceeded { .. } => "E005",
            Error::MisalignedStaticBase { .. } => "E006",
            Error::AddressSpaceExhausted { .. } => "E007",
            Error::MissingMemoryImage => "E008",
            Error::MalformedModule { .. } => "E009",
        }
    }

    /// Convert to a Diagnostic for reporting.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let help = match self {
            Error::SymbolSpaceExhausted { .. } => {
                vec!["Interpret fewer functions or import fewer primitives".to_string()]
            }
            Error::UnknownOpcode { .. } => {
                vec!["The optimizer and this tool disagree on the instruction set".to_string()]
            }
            Error::MissingMemoryImage => {
                vec!["Build with a separate memory initializer file".to_string()]
            }
            _ => Vec::new(),
        };
        Diagnostic {
            severity: Severity::Error,
            message: self.to_string(),
            function: match self {
                Error::UnknownOpcode { function, .. }
                | Error::UnknownCallTarget { function, .. } => Some(function.clone()),
                _ => None,
            },
            span: None,
            source: None,
            help,
            code: Some(self.code().to_string()),
        }
    }
}

/// A message about the transform, optionally pointing into a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,

    pub message: String,

    /// Function the diagnostic is about, if any.
    pub function: Option<String>,

    /// Location inside `source`.
    pub span: Option<Span>,

    /// Text `span` points into, typically the raw listing.
    pub source: Option<String>,

    /// Suggestions on how to fix the issue.
    pub help: Vec<String>,

    /// Stable code (e.g. "W101") for documentation lookup.
    pub code: Option<String>,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            function: None,
            span: None,
            source: None,
            help: Vec::new(),
            code: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        if let Some(code) = &self.code {
            write!(f, "[{}]", code)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(function) = &self.function {
            write!(f, " (in {})", function)?;
        }
        Ok(())
    }
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The transform cannot succeed.
    Error,
    /// The transform succeeded but part of the input was skipped.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

impl From<&Error> for Diagnostic {
    fn from(error: &Error) -> Self {
        error.to_diagnostic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::SymbolSpaceExhausted { count: 300 }.to_string(),
            "Too many call targets: 300 (limit: 255)"
        );
        assert_eq!(
            Error::MemoryBudgetExceeded {
                data_len: 20,
                static_size: 16
            }
            .to_string(),
            "Static data is 20 bytes but only 16 bytes are declared"
        );
    }

    #[test]
    fn test_to_diagnostic() {
        let error = Error::UnknownCallTarget {
            function: "_f".to_string(),
            target: "_missing".to_string(),
        };
        let diag = error.to_diagnostic();
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.code.as_deref(), Some("E004"));
        assert_eq!(diag.function.as_deref(), Some("_f"));
        assert_eq!(
            diag.to_string(),
            "error[E004]: Unknown call target '_missing' in '_f' (in _f)"
        );
    }
}
