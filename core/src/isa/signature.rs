//! Call signatures: the return kind and parameter kinds observed at a call site.

use core::fmt;

use crate::{String, Vec};

/// Numeric kind of a value crossing a call boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// 32-bit integer (`i`).
    Int,
    /// Single precision float (`f`). Without precise float32 it travels as a double.
    Float,
    /// Double precision float (`d`).
    Double,
}

impl ValueKind {
    pub const fn letter(self) -> char {
        match self {
            Self::Int => 'i',
            Self::Float => 'f',
            Self::Double => 'd',
        }
    }

    pub const fn from_letter(c: char) -> Option<Self> {
        match c {
            'i' => Some(Self::Int),
            'f' => Some(Self::Float),
            'd' => Some(Self::Double),
            _ => None,
        }
    }
}

/// A call signature in its textual form, e.g. `"vid"`: returns nothing, takes an
/// int and a double.
///
/// The first letter is the return kind (`v` for none), the rest are parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub ret: Option<ValueKind>,
    pub params: Vec<ValueKind>,
}

impl Signature {
    pub fn new(ret: Option<ValueKind>, params: Vec<ValueKind>) -> Self {
        Self { ret, params }
    }

    pub fn parse(text: &str) -> Result<Self, InvalidSignature> {
        let mut chars = text.chars();
        let ret = match chars.next() {
            Some('v') => None,
            Some(c) => Some(
                ValueKind::from_letter(c).ok_or_else(|| InvalidSignature(String::from(text)))?,
            ),
            None => return Err(InvalidSignature(String::from(text))),
        };
        let params = chars
            .map(|c| ValueKind::from_letter(c).ok_or_else(|| InvalidSignature(String::from(text))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ret, params })
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;

        f.write_char(self.ret.map_or('v', ValueKind::letter))?;
        for param in &self.params {
            f.write_char(param.letter())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid call signature '{0}'")]
pub struct InvalidSignature(pub String);
