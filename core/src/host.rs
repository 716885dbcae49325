//! Line-oriented model of the host module.
//!
//! The host language is not parsed. The module is split into lines and only three
//! conventions are recognized:
//!
//! - `function name(...) {` (no closing brace on the line) opens a function block;
//! - a line starting with `}` closes it, and a `[...]` array following the brace
//!   (optionally behind `//`) is the function's listing;
//! - top-level `var a = EXPR, b = EXPR;` lines declare imports.
//!
//! Everything else is carried through verbatim.

use crate::api::Error;
use crate::{String, ToString, Vec};

/// Placeholder prefix the optimizer leaves in trampolines: `(EMTERPRETER_name)`.
pub const PLACEHOLDER_PREFIX: &str = "EMTERPRETER_";

/// A top-level `var` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub name: String,
    pub value: String,
}

impl Import {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Only plain symbols can be called: coerced values, arithmetic, constructors and
    /// numeric constants are excluded.
    pub fn is_callable(&self) -> bool {
        let v = self.value.as_str();
        !v.contains('|') && !v.contains('+') && !v.contains("new ") && !v.contains(".0") && v != "0"
    }
}

/// A function definition together with its embedded listing, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBlock {
    pub name: String,
    pub header: String,
    pub body: Vec<String>,
    /// Raw listing text found after the closing brace.
    pub listing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// A line carried through unchanged.
    Text(String),
    /// A top-level declaration line and the imports it declares.
    Declaration(String),
    Function(FunctionBlock),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostModule {
    pub items: Vec<Item>,
    pub imports: Vec<Import>,
}

impl HostModule {
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut module = HostModule::default();
        let mut current: Option<FunctionBlock> = None;

        for (index, line) in text.lines().enumerate() {
            if let Some(name) = function_header(line) {
                if let Some(open) = &current {
                    return Err(Error::MalformedModule {
                        line: index + 1,
                        message: alloc::format!(
                            "function '{}' starts before '{}' is closed",
                            name,
                            open.name
                        ),
                    });
                }
                current = Some(FunctionBlock {
                    name: name.to_string(),
                    header: line.to_string(),
                    body: Vec::new(),
                    listing: None,
                });
            } else if let Some(rest) = line.strip_prefix('}')
                && let Some(mut function) = current.take()
            {
                function.listing = listing_annotation(rest);
                module.items.push(Item::Function(function));
            } else if let Some(function) = &mut current {
                function.body.push(line.to_string());
            } else if let Some(imports) = declaration(line) {
                module.imports.extend(imports);
                module.items.push(Item::Declaration(line.to_string()));
            } else {
                module.items.push(Item::Text(line.to_string()));
            }
        }

        if let Some(open) = current {
            return Err(Error::MalformedModule {
                line: text.lines().count(),
                message: alloc::format!("function '{}' is never closed", open.name),
            });
        }
        Ok(module)
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionBlock> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(function) => Some(function),
            _ => None,
        })
    }

    pub fn function(&self, name: &str) -> Option<&FunctionBlock> {
        self.functions().find(|f| f.name == name)
    }

    /// Render the module back to text.
    ///
    /// `extra_imports` are inserted right after the last declaration line (or at the
    /// top when there is none) and `appended` goes after everything else. Listings are
    /// never rendered.
    pub fn render(&self, extra_imports: &[String], appended: &[String]) -> String {
        let insert_at = self
            .items
            .iter()
            .rposition(|item| matches!(item, Item::Declaration(_)))
            .map_or(0, |i| i + 1);

        let mut lines: Vec<&str> = Vec::new();
        for (i, item) in self.items.iter().enumerate() {
            if i == insert_at {
                lines.extend(extra_imports.iter().map(String::as_str));
            }
            match item {
                Item::Text(line) | Item::Declaration(line) => lines.push(line),
                Item::Function(function) => {
                    lines.push(&function.header);
                    lines.extend(function.body.iter().map(String::as_str));
                    lines.push("}");
                }
            }
        }
        if insert_at == self.items.len() {
            lines.extend(extra_imports.iter().map(String::as_str));
        }
        lines.extend(appended.iter().map(String::as_str));

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

fn function_header(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("function ")?;
    if line.contains('}') {
        return None;
    }
    let name = rest.split('(').next()?.trim();
    (!name.is_empty()).then_some(name)
}

fn listing_annotation(rest: &str) -> Option<String> {
    let rest = rest.trim_start();
    let rest = rest.strip_prefix("//").unwrap_or(rest).trim();
    // Plain comments after the brace are not listings.
    rest.starts_with('[').then(|| rest.to_string())
}

fn declaration(line: &str) -> Option<Vec<Import>> {
    let body = line.trim().strip_prefix("var ")?;
    let body = body.strip_suffix(';').unwrap_or(body);

    let mut imports = Vec::new();
    for part in split_top_level(body) {
        let (name, value) = part.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        imports.push(Import::new(name, value.trim()));
    }
    (!imports.is_empty()).then_some(imports)
}

/// Split on commas that are not nested inside brackets.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
