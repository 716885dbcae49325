//! Tests for the interpreter generator.

use indoc::indoc;
use pretty_assertions::assert_eq;

use crate::{
    String, Vec,
    assembler::CallSignatureRegistry,
    format,
    generator::{InterpreterGenerator, InterpreterKind},
    host::Import,
    isa::{Opcode, Signature},
    symbols::SymbolTable,
    vec,
};

fn fixture() -> (CallSignatureRegistry, SymbolTable) {
    let symbols = SymbolTable::build(&[Import::new("_print", "env._print")], ["_f"]).unwrap();
    let mut registry = CallSignatureRegistry::new();
    for (target, sig) in [(0, "vi"), (1, "di"), (1, "vdi")] {
        registry.register(target, &Signature::parse(sig).unwrap());
    }
    (registry, symbols)
}

/// Re-indent an `indoc!` block to the depth of the opcode cases.
fn at_case_depth(block: &str) -> String {
    block
        .lines()
        .map(|line| format!("   {}\n", line))
        .collect()
}

#[test]
fn test_routine_prologue() {
    let (registry, symbols) = fixture();
    let source = InterpreterGenerator::new(&registry, &symbols).generate(InterpreterKind::Int);

    let expected = indoc! {"
        function emterpret_i(pc) {
         pc = pc | 0;
         var sp = 0, inst = 0, lx = 0, ly = 0, lz = 0;
         sp = EMTSTACKTOP;
         if ((HEAPU8[pc >> 0] | 0) != 255) abort();
         EMTSTACKTOP = EMTSTACKTOP + (HEAPU8[pc + 1 >> 0] << 3) | 0;
         if ((EMTSTACKTOP | 0) > (EMT_STACK_MAX | 0)) abort();
         pc = pc + 4 | 0;
         while (1) {
          inst = HEAP32[pc >> 2] | 0;
          lx = inst >> 8 & 255;
          ly = inst >> 16 & 255;
          lz = inst >>> 24;
          switch (inst & 255) {
           case 0: HEAP32[sp + (lx << 3) >> 2] = HEAP32[sp + (ly << 3) >> 2]|0; break;
    "};
    assert!(source.starts_with(expected), "{}", source);

    let tail = indoc! {"
           default: abort();
          }
          pc = pc + 4 | 0;
         }
         return 0;
        }
    "};
    assert!(source.ends_with(tail), "{}", source);
}

#[test]
fn test_every_opcode_but_prologue_has_a_case() {
    let (registry, symbols) = fixture();
    let source = InterpreterGenerator::new(&registry, &symbols).generate(InterpreterKind::Void);
    for opcode in Opcode::ALL {
        let case = format!("   case {}: ", opcode.code());
        assert_eq!(
            source.contains(&case),
            opcode != Opcode::FunctionPrologue,
            "{}",
            opcode
        );
    }
}

#[test]
fn test_return_is_specialized_per_kind() {
    let (registry, symbols) = fixture();
    let generator = InterpreterGenerator::new(&registry, &symbols);

    let void = generator.generate(InterpreterKind::Void);
    assert!(void.contains("case 254: EMTSTACKTOP = sp; return; break;"));
    assert!(!void.contains("return 0"));

    let int = generator.generate(InterpreterKind::Int);
    assert!(int.contains("case 254: EMTSTACKTOP = sp; return HEAP32[sp + (lx << 3) >> 2]|0;"));

    let double = generator.generate(InterpreterKind::Double);
    assert!(double.starts_with("function emterpret_d(pc) {\n"));
    assert!(double.contains("case 254: EMTSTACKTOP = sp; return +HEAPF64[sp + (lx << 3) >> 3];"));
    assert!(double.ends_with(" return 0.0;\n}\n"));
}

#[test]
fn test_branch_and_arithmetic_cases() {
    let (registry, symbols) = fixture();
    let source = InterpreterGenerator::new(&registry, &symbols).generate(InterpreterKind::Void);
    assert!(source.contains(
        "case 16: if (HEAP32[sp + (lx << 3) >> 2]|0) { pc = pc + ((inst >> 16) << 2) | 0; continue; } break;"
    ));
    assert!(source.contains(
        "case 8: HEAP32[sp + (lx << 3) >> 2] = (HEAP32[sp + (ly << 3) >> 2]>>>0) / (HEAP32[sp + (lz << 3) >> 2]>>>0) >>> 0; break;"
    ));
    assert!(source.contains("case 3: HEAP32[sp + (lx << 3) >> 2] = inst >>> 16; break;"));
    assert!(source.contains("case 1: HEAP32[sp + (lx << 3) >> 2] = STACKTOP; break;"));
}

#[test]
fn test_call_dispatch() {
    let (registry, symbols) = fixture();
    let source = InterpreterGenerator::new(&registry, &symbols).generate(InterpreterKind::Void);

    let expected = at_case_depth(indoc! {"
        case 253: {
         switch (lx | 0) {
          case 0: {
           switch (ly | 0) {
            case 0: {
             _print(HEAP32[sp + (HEAPU8[pc + 3 >> 0] << 3) >> 2]|0);
             pc = pc + 4 | 0;
             continue;
            }
            default: abort();
           }
           break;
          }
          case 1: {
           switch (ly | 0) {
            case 0: {
             +_f(HEAP32[sp + (HEAPU8[pc + 3 >> 0] << 3) >> 2]|0);
             pc = pc + 4 | 0;
             continue;
            }
            case 1: {
             _f(+HEAPF64[sp + (HEAPU8[pc + 3 >> 0] << 3) >> 3], HEAP32[sp + (HEAPU8[pc + 4 >> 0] << 3) >> 2]|0);
             pc = pc + 8 | 0;
             continue;
            }
            default: abort();
           }
           break;
          }
          default: abort();
         }
         break;
        }
    "});
    assert!(source.contains(&expected), "{}", source);
}

#[test]
fn test_call_without_signatures_aborts() {
    let symbols = SymbolTable::default();
    let registry = CallSignatureRegistry::new();
    let source = InterpreterGenerator::new(&registry, &symbols).generate(InterpreterKind::Void);
    let expected = at_case_depth(indoc! {"
        case 253: {
         switch (lx | 0) {
          default: abort();
         }
         break;
        }
    "});
    assert!(source.contains(&expected), "{}", source);
}

#[test]
fn test_generate_all() {
    let (registry, symbols) = fixture();
    let headers: Vec<String> = InterpreterGenerator::new(&registry, &symbols)
        .generate_all()
        .iter()
        .map(|source| source.lines().next().unwrap_or_default().into())
        .collect();
    assert_eq!(
        headers,
        vec![
            "function emterpret(pc) {",
            "function emterpret_i(pc) {",
            "function emterpret_d(pc) {",
        ]
    );
}
