//! Trampoline patcher.
//!
//! An interpreted function keeps a native body that forwards to the interpreter:
//!
//! ```text
//! function _f(x) {
//!  ...
//!  return emterpret_i(EMTERPRETER__f) | 0;
//! }
//! ```
//!
//! Once the layout is known each `(EMTERPRETER_name)` placeholder becomes the absolute
//! address of `name`'s bytecode.

use core::ops::Range;

use hashbrown::HashMap;

use crate::api::{Diagnostic, Span};
use crate::assembler::AssembledProgram;
use crate::host::{HostModule, Item, PLACEHOLDER_PREFIX};
use crate::{String, ToString, Vec, format};

/// Diagnostic code of a placeholder with no bytecode behind it.
pub const UNRESOLVED_TRAMPOLINE: &str = "W201";

/// Result of patching one module.
#[derive(Debug, Default)]
pub struct PatchReport {
    /// Placeholders replaced with an address.
    pub patched: usize,
    /// One warning per placeholder left in place.
    pub diagnostics: Vec<Diagnostic>,
}

/// Replace every resolvable placeholder inside the module's function bodies.
pub fn patch_trampolines(
    module: &mut HostModule,
    program: &AssembledProgram,
    code_start: u32,
) -> PatchReport {
    // Duplicate definitions resolve to the first body, like `offset_of`.
    let mut addresses: HashMap<&str, u32> = HashMap::new();
    for f in &program.functions {
        addresses
            .entry(f.name.as_str())
            .or_insert(code_start + f.offset as u32);
    }

    let mut report = PatchReport::default();
    let mut line_number = 0;
    for item in &mut module.items {
        let Item::Function(function) = item else {
            line_number += 1;
            continue;
        };
        line_number += 1;
        for line in &mut function.body {
            line_number += 1;
            if !line.contains(PLACEHOLDER_PREFIX) {
                continue;
            }
            let patched = patch_line(line, &addresses);
            report.patched += patched.count;
            for (target, span) in patched.unresolved {
                tracing::warn!(
                    function = target.as_str(),
                    caller = function.name.as_str(),
                    line = line_number,
                    "unresolved trampoline"
                );
                report.diagnostics.push(unresolved_diagnostic(
                    &target,
                    &function.name,
                    line_number,
                    line,
                    span,
                ));
            }
            *line = patched.text;
        }
        line_number += 1;
    }

    tracing::debug!(
        patched = report.patched,
        unresolved = report.diagnostics.len(),
        "patched trampolines"
    );
    report
}

struct PatchedLine {
    text: String,
    count: usize,
    /// Placeholders left alone, with their byte range in the original line.
    unresolved: Vec<(String, Range<usize>)>,
}

fn patch_line(line: &str, addresses: &HashMap<&str, u32>) -> PatchedLine {
    let mut out = String::with_capacity(line.len());
    let mut unresolved = Vec::new();
    let mut count = 0;
    let mut rest = line;
    let mut consumed = 0;

    let needle = format!("({}", PLACEHOLDER_PREFIX);
    while let Some(pos) = rest.find(&needle) {
        let name_start = pos + needle.len();
        let name_len = rest[name_start..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(rest.len() - name_start);
        let name = &rest[name_start..name_start + name_len];
        let close = name_start + name_len;

        if name.is_empty() || !rest[close..].starts_with(')') {
            out.push_str(&rest[..name_start]);
            consumed += name_start;
            rest = &rest[name_start..];
            continue;
        }

        out.push_str(&rest[..pos]);
        match addresses.get(name) {
            Some(address) => {
                out.push_str(&format!("({})", address));
                count += 1;
            }
            None => {
                out.push_str(&rest[pos..=close]);
                unresolved.push((name.to_string(), consumed + pos..consumed + close + 1));
            }
        }
        consumed += close + 1;
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    PatchedLine {
        text: out,
        count,
        unresolved,
    }
}

fn unresolved_diagnostic(
    target: &str,
    caller: &str,
    line_number: usize,
    line: &str,
    span: Range<usize>,
) -> Diagnostic {
    let mut diagnostic = Diagnostic::warning(format!(
        "Trampoline for '{}' on line {} has no bytecode and was left unpatched",
        target, line_number
    ));
    diagnostic.function = Some(caller.to_string());
    diagnostic.span = Some(Span(span));
    diagnostic.source = Some(line.to_string());
    diagnostic.code = Some(UNRESOLVED_TRAMPOLINE.to_string());
    diagnostic
        .help
        .push(format!("'{}' must carry a listing that assembles", target));
    diagnostic
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::AssembledFunction;
    use crate::vec;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn program(entries: &[(&str, usize)]) -> AssembledProgram {
        AssembledProgram {
            functions: entries
                .iter()
                .map(|(name, offset)| AssembledFunction {
                    name: name.to_string(),
                    offset: *offset,
                    len: 4,
                    locals: 0,
                    instructions: Vec::new(),
                })
                .collect(),
            ..AssembledProgram::default()
        }
    }

    fn addresses() -> HashMap<&'static str, u32> {
        [("_f", 100u32), ("_g", 112)].into_iter().collect()
    }

    #[test]
    fn test_duplicate_definition_uses_first_offset() {
        let mut module = HostModule::parse(indoc! {r#"
            function _f() {
             emterpret(EMTERPRETER__f);
            } // ["FUNC", 0, 0, 0]
        "#})
        .unwrap();

        let program = program(&[("_f", 0), ("_f", 12)]);
        assert_eq!(program.offset_of("_f"), Some(0));
        patch_trampolines(&mut module, &program, 24);
        assert_eq!(module.function("_f").unwrap().body, vec![" emterpret(24);"]);
    }

    #[test]
    fn test_patch_line() {
        let patched = patch_line(" return emterpret_i(EMTERPRETER__f) | 0;", &addresses());
        assert_eq!(patched.text, " return emterpret_i(100) | 0;");
        assert_eq!(patched.count, 1);
        assert!(patched.unresolved.is_empty());
    }

    #[test]
    fn test_patch_line_keeps_unknown_placeholders() {
        let line = "a(EMTERPRETER__x) + b(EMTERPRETER__g)";
        let patched = patch_line(line, &addresses());
        assert_eq!(patched.text, "a(EMTERPRETER__x) + b(112)");
        assert_eq!(patched.count, 1);
        assert_eq!(patched.unresolved, vec![("_x".to_string(), 1..17)]);
        assert_eq!(&line[1..17], "(EMTERPRETER__x)");
    }

    #[test]
    fn test_patch_line_ignores_incomplete_placeholders() {
        let patched = patch_line("(EMTERPRETER_ (EMTERPRETER__f", &addresses());
        assert_eq!(patched.text, "(EMTERPRETER_ (EMTERPRETER__f");
        assert_eq!(patched.count, 0);
        assert!(patched.unresolved.is_empty());
    }

    #[test]
    fn test_patch_module() {
        let mut module = HostModule::parse(indoc! {r#"
            var abort = env.abort;
            function _f() {
             emterpret(EMTERPRETER__f);
            } // ["FUNC", 0, 0, 0]
            function _h() {
             emterpret(EMTERPRETER__h);
            } // ["FUNC", 1000, 0, 0]
        "#})
        .unwrap();

        let report = patch_trampolines(&mut module, &program(&[("_f", 4)]), 24);
        assert_eq!(report.patched, 1);
        assert_eq!(module.function("_f").unwrap().body, vec![" emterpret(28);"]);
        assert_eq!(
            module.function("_h").unwrap().body,
            vec![" emterpret(EMTERPRETER__h);"]
        );

        assert_eq!(report.diagnostics.len(), 1);
        let diagnostic = &report.diagnostics[0];
        assert_eq!(diagnostic.code.as_deref(), Some(UNRESOLVED_TRAMPOLINE));
        assert_eq!(diagnostic.function.as_deref(), Some("_h"));
        assert!(diagnostic.message.contains("'_h' on line 6"));
        assert_eq!(diagnostic.span, Some(Span(10..26)));
    }
}
