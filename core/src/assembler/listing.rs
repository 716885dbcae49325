//! Listing parser and lowering to symbolic instructions.
//!
//! A listing is the flat array the optimizer embeds for each function, one element
//! per encoded byte:
//!
//! ```text
//! ["FUNC", 3, 0, 0, "SETI", 0, 10, 0, "CALL", "_print", "vi", 0, "RET", 0, 0, 0]
//! ```
//!
//! Words are four elements long except for `CALL`, whose argument list is padded
//! to the next word boundary.

use pest::Parser;

use crate::api::Span;
use crate::assembler::error::{ListingError, ListingErrorKind, convert_pest_error};
use crate::isa::{Instruction, Opcode, PseudoInstruction, Signature, WORD_SIZE};
use crate::{String, ToString, Vec};

#[derive(pest_derive::Parser)]
#[grammar = "assembler/listing.pest"]
pub(crate) struct ListingParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind<'a> {
    Name(&'a str),
    Integer(&'a str),
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: TokenKind<'a>,
    start: usize,
    end: usize,
}

impl Token<'_> {
    fn span(&self) -> Span {
        Span(self.start..self.end)
    }
}

fn tokenize(text: &str) -> Result<Vec<Token<'_>>, ListingError> {
    let pairs = ListingParser::parse(Rule::listing, text).map_err(convert_pest_error)?;

    let mut tokens = Vec::new();
    for pair in pairs.flat_map(|listing| listing.into_inner()) {
        let span = pair.as_span();
        let kind = match pair.as_rule() {
            Rule::name => {
                let quoted = pair.as_str();
                TokenKind::Name(&quoted[1..quoted.len() - 1])
            }
            Rule::integer => TokenKind::Integer(pair.as_str()),
            _ => continue,
        };
        tokens.push(Token {
            kind,
            start: span.start(),
            end: span.end(),
        });
    }
    Ok(tokens)
}

/// Parse a listing into symbolic instructions.
pub fn parse_listing(text: &str) -> Result<Vec<PseudoInstruction>, ListingError> {
    let tokens = tokenize(text)?;
    if tokens.len() % WORD_SIZE != 0 {
        return Err(ListingError::new(
            ListingErrorKind::NotWordAligned { len: tokens.len() },
            Span(0..text.len()),
        ));
    }

    let mut reader = Reader {
        tokens: &tokens,
        cursor: 0,
    };
    let mut instructions = Vec::new();
    while reader.cursor < tokens.len() {
        instructions.push(reader.instruction()?);
    }

    if let Some(first) = instructions.first()
        && first.opcode() != Opcode::FunctionPrologue
    {
        return Err(ListingError::new(
            ListingErrorKind::MissingPrologue {
                found: first.opcode(),
            },
            tokens[0].span(),
        ));
    }
    Ok(instructions)
}

struct Reader<'t, 'a> {
    tokens: &'t [Token<'a>],
    cursor: usize,
}

impl<'a> Reader<'_, 'a> {
    fn instruction(&mut self) -> Result<PseudoInstruction, ListingError> {
        let head = self.tokens[self.cursor];
        let TokenKind::Name(mnemonic) = head.kind else {
            return Err(ListingError::new(
                ListingErrorKind::ExpectedOpcode,
                head.span(),
            ));
        };
        let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| {
            ListingError::new(
                ListingErrorKind::UnknownOpcode {
                    mnemonic: mnemonic.to_string(),
                },
                head.span(),
            )
        })?;

        if opcode == Opcode::Call {
            return self.call(head);
        }

        let operands = [
            self.byte(self.cursor + 1)?,
            self.byte(self.cursor + 2)?,
            self.byte(self.cursor + 3)?,
        ];
        self.cursor += WORD_SIZE;
        Ok(PseudoInstruction::Op { opcode, operands })
    }

    fn call(&mut self, head: Token<'a>) -> Result<PseudoInstruction, ListingError> {
        let target = self.name(self.cursor + 1, "call target")?;
        let signature_token = self.tokens[self.cursor + 2];
        let text = self.name(self.cursor + 2, "signature")?;
        let signature = Signature::parse(text).map_err(|_| {
            ListingError::new(
                ListingErrorKind::InvalidSignature {
                    text: text.to_string(),
                },
                signature_token.span(),
            )
        })?;

        let len = Instruction::call_len(signature.arity());
        let remaining = self.tokens.len() - self.cursor;
        if len > remaining {
            let last = self.tokens[self.tokens.len() - 1];
            return Err(ListingError::new(
                ListingErrorKind::TruncatedCall {
                    expected: len,
                    found: remaining,
                },
                Span(head.start..last.end),
            ));
        }

        let args = (0..signature.arity())
            .map(|i| self.byte(self.cursor + 3 + i))
            .collect::<Result<Vec<_>, _>>()?;
        // Padding carries no meaning but must still be bytes.
        for i in 3 + signature.arity()..len {
            self.byte(self.cursor + i)?;
        }

        self.cursor += len;
        Ok(PseudoInstruction::Call {
            target: String::from(target),
            signature,
            args,
        })
    }

    fn name(&self, index: usize, what: &'static str) -> Result<&'a str, ListingError> {
        let token = self.tokens[index];
        match token.kind {
            TokenKind::Name(name) => Ok(name),
            TokenKind::Integer(_) => Err(ListingError::new(
                ListingErrorKind::ExpectedName { what },
                token.span(),
            )),
        }
    }

    fn byte(&self, index: usize) -> Result<u8, ListingError> {
        let token = self.tokens[index];
        match token.kind {
            TokenKind::Integer(text) => text.parse::<u8>().map_err(|_| {
                ListingError::new(
                    ListingErrorKind::OperandOutOfRange {
                        text: text.to_string(),
                    },
                    token.span(),
                )
            }),
            TokenKind::Name(_) => Err(ListingError::new(
                ListingErrorKind::ExpectedByte,
                token.span(),
            )),
        }
    }
}
