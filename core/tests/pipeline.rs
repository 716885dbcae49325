//! End-to-end tests of the transform pipeline.

use emterp_core::api::{Emterpreter, Error, Severity, StaticMemory, TransformOptions};
use emterp_core::host::HostModule;
use emterp_core::isa::Signature;
use indoc::indoc;
use pretty_assertions::assert_eq;

const MODULE: &str = indoc! {r#"
    var abort = env.abort;
    var STACKTOP = env.STACKTOP|0;
    var _puts = env._puts;
    function _f(x) {
     x = x | 0;
     return emterpret_i(EMTERPRETER__f) | 0;
    } // ["FUNC", 2, 0, 0, "ADD", 0, 0, 1, "RET", 0, 0, 0]
    function _g() {
     emterpret(EMTERPRETER__g);
    } // ["FUNC", 0, 0, 0]
    function _native() {
     return 1;
    }
"#};

fn run(text: &str, data: &[u8], size: u32) -> Result<emterp_core::api::Artifacts, Error> {
    let module = HostModule::parse(text)?;
    Emterpreter::new(TransformOptions::default())
        .run(&module, Some(StaticMemory::with_size(data, size)))
}

#[test]
fn test_offsets_layout_and_patching() {
    let artifacts = run(MODULE, &[7; 13], 16).unwrap();

    let entries: Vec<(&str, u32)> = artifacts.entry_points().collect();
    assert_eq!(entries, vec![("_f", 24), ("_g", 36)]);
    assert_eq!(artifacts.program.offset_of("_f"), Some(0));
    assert_eq!(artifacts.program.offset_of("_g"), Some(12));
    assert_eq!(artifacts.program.bytecode.len(), 16);
    assert!(artifacts.diagnostics.is_empty());

    let layout = artifacts.layout;
    assert_eq!(layout.code_start(), 24);
    assert_eq!(layout.stack_start(), 40);
    assert_eq!(layout.static_size, 32 + (1 << 20));

    let mut expected_memory = vec![7; 13];
    expected_memory.extend([0; 3]);
    expected_memory.extend([255, 2, 0, 0, 4, 0, 0, 1, 254, 0, 0, 0, 255, 0, 0, 0]);
    assert_eq!(artifacts.memory, expected_memory);

    let expected_prefix = indoc! {"
        var abort = env.abort;
        var STACKTOP = env.STACKTOP|0;
        var _puts = env._puts;
        var EMTSTACKTOP = env.EMTSTACKTOP|0;
        var EMT_STACK_MAX = env.EMT_STACK_MAX|0;
        function _f(x) {
         x = x | 0;
         return emterpret_i(24) | 0;
        }
        function _g() {
         emterpret(36);
        }
        function _native() {
         return 1;
        }
        function emterpret(pc) {
    "};
    assert!(
        artifacts.module_text.starts_with(expected_prefix),
        "{}",
        artifacts.module_text
    );
    assert!(artifacts.module_text.contains("\nfunction emterpret_i(pc) {\n"));
    assert!(artifacts.module_text.ends_with(" return 0.0;\n}\n"));
    assert!(!artifacts.module_text.contains("\"FUNC\""));
}

#[test]
fn test_runtime_bindings() {
    let artifacts = run(MODULE, &[7; 13], 16).unwrap();
    assert_eq!(
        artifacts.bindings.prelude,
        "var EMTSTACKTOP = STATIC_BASE + 32, EMT_STACK_MAX = EMTSTACKTOP + 1048576;"
    );
    assert_eq!(
        artifacts.bindings.env_entries,
        r#""EMTSTACKTOP": EMTSTACKTOP, "EMT_STACK_MAX": EMT_STACK_MAX, "#
    );
}

#[test]
fn test_repeated_call_shares_one_signature() {
    let text = indoc! {r#"
        var _puts = env._puts;
        function _f(x) {
         return emterpret_i(EMTERPRETER__f) | 0;
        } // ["FUNC", 1, 0, 0, "RET", 0, 0, 0]
        function _g() {
         emterpret(EMTERPRETER__g);
        } // ["FUNC", 2, 0, 0, "CALL", "_f", "ii", 1, "CALL", "_f", "ii", 0, "CALL", "_puts", "vi", 1, "RET", 0, 0, 0]
    "#};
    let artifacts = run(text, &[], 0).unwrap();

    let f = artifacts.symbols.id_of("_f").unwrap();
    assert_eq!(
        artifacts.program.registry.signatures(f),
        &[Signature::parse("ii").unwrap()]
    );
    let g = artifacts.program.offset_of("_g").unwrap();
    let code = &artifacts.program.bytecode;
    assert_eq!(&code[g + 4..g + 8], &[253, f, 0, 1]);
    assert_eq!(&code[g + 8..g + 12], &[253, f, 0, 0]);

    assert!(artifacts
        .module_text
        .contains("_f(HEAP32[sp + (HEAPU8[pc + 3 >> 0] << 3) >> 2]|0)|0;"));
    assert!(artifacts
        .module_text
        .contains("_puts(HEAP32[sp + (HEAPU8[pc + 3 >> 0] << 3) >> 2]|0);"));
}

#[test]
fn test_unresolved_trampoline_is_reported() {
    let text = indoc! {r#"
        function _f() {
         emterpret(EMTERPRETER__f);
        } // ["FUNC", 0, 0, 0]
        function _h() {
         emterpret(EMTERPRETER__h);
        } // ["FUNC", 1, 0, 0, "CALL"]
    "#};
    let artifacts = run(text, &[], 0).unwrap();

    assert!(artifacts.module_text.contains(" emterpret(8);\n"));
    assert!(artifacts.module_text.contains(" emterpret(EMTERPRETER__h);\n"));

    let codes: Vec<&str> = artifacts
        .diagnostics
        .iter()
        .filter_map(|d| d.code.as_deref())
        .collect();
    assert_eq!(codes, vec!["W102", "W201"]);
    assert!(artifacts
        .diagnostics
        .iter()
        .all(|d| d.severity == Severity::Warning && d.function.as_deref() == Some("_h")));
}

#[test]
fn test_trailing_comment_on_native_function_is_silent() {
    let text = indoc! {r#"
        function _n() {
         return;
        } // end of _n
    "#};
    let artifacts = run(text, &[], 0).unwrap();

    assert!(artifacts.diagnostics.is_empty(), "{:?}", artifacts.diagnostics);
    assert!(artifacts.program.functions.is_empty());
    assert!(artifacts.module_text.contains("function _n() {\n return;\n}\n"));
}

#[test]
fn test_transform_is_deterministic() {
    let first = run(MODULE, &[1, 2, 3], 3).unwrap();
    let second = run(MODULE, &[1, 2, 3], 3).unwrap();
    assert_eq!(first.module_text, second.module_text);
    assert_eq!(first.memory, second.memory);
    assert_eq!(first.layout, second.layout);
}

#[test]
fn test_missing_memory_image() {
    let module = HostModule::parse(MODULE).unwrap();
    let err = Emterpreter::default().run(&module, None).unwrap_err();
    assert_eq!(err, Error::MissingMemoryImage);
}

#[test]
fn test_static_data_over_budget() {
    let err = run(MODULE, &[0; 20], 16).unwrap_err();
    assert_eq!(
        err,
        Error::MemoryBudgetExceeded {
            data_len: 20,
            static_size: 16
        }
    );
}

#[test]
fn test_too_many_symbols() {
    let text: String = (0..256)
        .map(|i| format!("function _f{}() {{\n}}\n", i))
        .collect();
    let err = run(&text, &[], 0).unwrap_err();
    assert_eq!(err, Error::SymbolSpaceExhausted { count: 256 });
}

#[test]
fn test_disassembly_names_call_targets() {
    let artifacts = run(MODULE, &[], 0).unwrap();
    let text = artifacts.disassemble().to_string();
    assert!(text.starts_with("_f @0 (12 bytes, 2 locals):\n"));
    assert!(text.contains("\n_g @12 (4 bytes, 0 locals):\n"));
}
