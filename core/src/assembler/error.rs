//! Listing errors.
//!
//! Most of these are recoverable: the function is skipped and stays native. The one
//! exception is [`ListingErrorKind::UnknownOpcode`], which means the optimizer and
//! this crate disagree on the instruction set and is promoted to a fatal error.

use alloc::string::ToString;

use crate::api::{Diagnostic, Error, Severity, Span};
use crate::assembler::listing::Rule;
use crate::isa::Opcode;
use crate::{String, Vec, format, vec};

/// A problem found while reading one function's listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingError {
    pub kind: ListingErrorKind,
    /// Location inside the listing text.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingErrorKind {
    /// The text is not an array of names and integers.
    Syntax { expected: String },
    /// The listing does not hold a whole number of words.
    NotWordAligned { len: usize },
    /// A word starts with something other than a mnemonic.
    ExpectedOpcode,
    /// A mnemonic outside the instruction set.
    UnknownOpcode { mnemonic: String },
    /// A call target or signature was not a name.
    ExpectedName { what: &'static str },
    /// An operand was a name where a byte was expected.
    ExpectedByte,
    /// An operand does not fit in one byte.
    OperandOutOfRange { text: String },
    InvalidSignature { text: String },
    /// A call runs past the end of the listing.
    TruncatedCall { expected: usize, found: usize },
    /// A non-empty listing must start with `FUNC`.
    MissingPrologue { found: Opcode },
}

impl ListingError {
    pub fn new(kind: ListingErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Fatal kinds are returned as [`Error`] instead of being skipped.
    pub fn escalate(self, function: &str) -> Result<Self, Error> {
        match self.kind {
            ListingErrorKind::UnknownOpcode { mnemonic } => Err(Error::UnknownOpcode {
                function: function.to_string(),
                mnemonic,
            }),
            _ => Ok(self),
        }
    }

    pub fn message(&self) -> String {
        match &self.kind {
            ListingErrorKind::Syntax { expected } => format!("Expected {}", expected),
            ListingErrorKind::NotWordAligned { len } => {
                format!("Listing has {} bytes, not a multiple of 4", len)
            }
            ListingErrorKind::ExpectedOpcode => "Expected an opcode name".to_string(),
            ListingErrorKind::UnknownOpcode { mnemonic } => {
                format!("Unknown opcode '{}'", mnemonic)
            }
            ListingErrorKind::ExpectedName { what } => format!("Expected {} name", what),
            ListingErrorKind::ExpectedByte => "Expected a byte operand".to_string(),
            ListingErrorKind::OperandOutOfRange { text } => {
                format!("Operand {} does not fit in a byte", text)
            }
            ListingErrorKind::InvalidSignature { text } => {
                format!("Invalid call signature '{}'", text)
            }
            ListingErrorKind::TruncatedCall { expected, found } => format!(
                "Call needs {} bytes but only {} remain",
                expected, found
            ),
            ListingErrorKind::MissingPrologue { found } => {
                format!("Listing starts with {} instead of FUNC", found)
            }
        }
    }

    fn code(&self) -> &'static str {
        match self.kind {
            ListingErrorKind::Syntax { .. } => "W101",
            ListingErrorKind::NotWordAligned { .. } => "W102",
            ListingErrorKind::ExpectedOpcode => "W103",
            ListingErrorKind::UnknownOpcode { .. } => "E003",
            ListingErrorKind::ExpectedName { .. } => "W104",
            ListingErrorKind::ExpectedByte => "W105",
            ListingErrorKind::OperandOutOfRange { .. } => "W106",
            ListingErrorKind::InvalidSignature { .. } => "W107",
            ListingErrorKind::TruncatedCall { .. } => "W108",
            ListingErrorKind::MissingPrologue { .. } => "W109",
        }
    }

    /// Convert to a warning Diagnostic pointing into `source`.
    pub fn to_diagnostic(&self, function: &str, source: &str) -> Diagnostic {
        let help = match &self.kind {
            ListingErrorKind::InvalidSignature { .. } => {
                vec![
                    "Signatures are a return kind (v, i, f, d) followed by parameter kinds"
                        .to_string(),
                ]
            }
            ListingErrorKind::MissingPrologue { .. } => {
                vec!["Every listing must declare its locals with FUNC first".to_string()]
            }
            _ => Vec::new(),
        };
        Diagnostic {
            severity: Severity::Warning,
            message: format!(
                "Skipping '{}', its bytecode does not parse: {}",
                function,
                self.message()
            ),
            function: Some(function.to_string()),
            span: Some(self.span.clone()),
            source: Some(source.to_string()),
            help,
            code: Some(self.code().to_string()),
        }
    }
}

impl core::fmt::Display for ListingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} at {}..{}", self.message(), self.span.0.start, self.span.0.end)
    }
}

/// Convert Pest error to a ListingError
pub(crate) fn convert_pest_error(err: pest::error::Error<Rule>) -> ListingError {
    use pest::error::ErrorVariant;

    let span = match err.location {
        pest::error::InputLocation::Pos(pos) => Span(pos..pos),
        pest::error::InputLocation::Span((start, end)) => Span(start..end),
    };

    let expected = match err.variant {
        ErrorVariant::ParsingError { positives, .. } => format_expected_rules(&positives),
        ErrorVariant::CustomError { message } => message,
    };

    ListingError::new(ListingErrorKind::Syntax { expected }, span)
}

/// Format expected rules in a human-readable way
fn format_expected_rules(rules: &[Rule]) -> String {
    let mut concepts: Vec<&str> = Vec::new();
    for rule in rules {
        let concept = match rule {
            Rule::name | Rule::integer => "name or integer",
            Rule::listing => "'['",
            Rule::EOI => "end of input",
            _ => "',' or ']'",
        };
        if !concepts.contains(&concept) {
            concepts.push(concept);
        }
    }

    match concepts.split_last() {
        None => "something else".to_string(),
        Some((only, [])) => only.to_string(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
    }
}
