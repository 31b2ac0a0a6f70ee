// パス: tests/engine_scenarios.rs
// 役割: ヘッダ 1 本分の推論（プリスキャン → 型推論 → 正規化 → 値取得 → 一覧出力）を通しで検証する
// 意図: 偽ツールチェーンと偽ローダで、典型的なヘッダの結果とヘッダ単位の中断を確認する
// 関連ファイル: src/engine.rs, tests/test_support.rs

#[path = "test_support.rs"]
mod support;

use std::fs;

use defprobe::{
    diagnostics::DiagnosticKind,
    engine::{generate_module, Session},
    errors::ProbeError,
    marshal::RawValue,
    probe::{type_probe::PROBE_FRAGMENT, value_probe::ACCESSOR_FRAGMENT},
    symbols::{CandidateSet, Symbol},
};
use support::{
    comma_expansion, conversion, gnu_config, undeclared, FakeHost, ScriptedToolchain, TOKEN,
};
use tempfile::tempdir;

const DEMO_HEADER: &str = "\
#ifndef DEMO_H
#define DEMO_H
#define FOO 3
#define BAR \"hello\"
#define BAZ ((void(*)(int))0)
#define QUX MISSING_THING
#define CALL(x) ((x) + 1)
#endif
";

fn demo_toolchain() -> ScriptedToolchain {
    ScriptedToolchain::new([
        ("FOO", vec![conversion("int")]),
        ("BAR", vec![conversion("const char [6]")]),
        ("BAZ", vec![conversion("void (*)(int)")]),
        ("QUX", vec![undeclared("MISSING_THING")]),
    ])
}

fn demo_host() -> FakeHost {
    FakeHost::new()
        .value("FOO", RawValue::Int(3))
        .value("BAR", RawValue::Str(Some(b"hello".to_vec())))
}

#[test]
fn demo_header_lists_values() -> Result<(), Box<dyn std::error::Error>> {
    let include = tempdir()?;
    fs::write(include.path().join("demo.h"), DEMO_HEADER)?;
    let work = tempdir()?;
    let mut config = gnu_config(work.path());
    config.include_dirs.push(include.path().to_path_buf());

    let toolchain = demo_toolchain();
    let host = demo_host();
    let session = Session::new(&config, &toolchain, &host)?;
    let mut listing: Vec<u8> = Vec::new();
    let report = generate_module(&session, "demo.h", None, &mut listing)?;

    assert_eq!(String::from_utf8(listing)?, "FOO=3\nBAR='hello'\n");
    assert_eq!(report.header, "demo.h");
    let typed: Vec<(&str, &str)> = report
        .typed
        .iter()
        .map(|t| (t.symbol.name(), t.c_type.as_str()))
        .collect();
    assert_eq!(typed, vec![("FOO", "int"), ("BAR", "const char *")]);
    assert_eq!(
        report.rejected,
        vec![(Symbol::new("QUX"), DiagnosticKind::UndeclaredIdentifier)]
    );
    // 値の無いインクルードガードと関数形式マクロはプリスキャンで拾わない
    assert_eq!(
        toolchain.diagnose_batches(),
        vec![vec!["FOO", "BAR", "BAZ", "QUX"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()]
    );
    assert_eq!(host.unloads.get(), 1);
    Ok(())
}

#[test]
fn explicit_candidates_skip_prescan() -> Result<(), Box<dyn std::error::Error>> {
    let include = tempdir()?;
    fs::write(include.path().join("demo.h"), DEMO_HEADER)?;
    let work = tempdir()?;
    let mut config = gnu_config(work.path());
    config.include_dirs.push(include.path().to_path_buf());

    let toolchain = demo_toolchain();
    let host = demo_host();
    let session = Session::new(&config, &toolchain, &host)?;
    let candidates: CandidateSet = ["FOO"].into_iter().collect();
    let mut listing: Vec<u8> = Vec::new();
    generate_module(&session, "demo.h", Some(&candidates), &mut listing)?;

    assert_eq!(String::from_utf8(listing)?, "FOO=3\n");
    assert_eq!(toolchain.diagnose_batches(), vec![vec!["FOO".to_string()]]);
    Ok(())
}

#[test]
/// 関数名とカンマを含む展開は値取得の前に落ち、他のシンボルの値を巻き込まない。
fn function_names_and_comma_lists_do_not_reach_accessors() -> Result<(), Box<dyn std::error::Error>>
{
    let include = tempdir()?;
    fs::write(
        include.path().join("io.h"),
        "#include <stdio.h>\n#define COUNT 3\n#define FN puts\n#define PAIR 1, 2\n",
    )?;
    let work = tempdir()?;
    let mut config = gnu_config(work.path());
    config.include_dirs.push(include.path().to_path_buf());

    let toolchain = ScriptedToolchain::new([
        ("COUNT", vec![conversion("int")]),
        ("FN", vec![conversion("int(const char*)")]),
        ("PAIR", comma_expansion("int")),
    ]);
    let host = FakeHost::new().value("COUNT", RawValue::Int(3));
    let session = Session::new(&config, &toolchain, &host)?;
    let mut listing: Vec<u8> = Vec::new();
    let report = generate_module(&session, "io.h", None, &mut listing)?;

    assert_eq!(String::from_utf8(listing)?, "COUNT=3\n");
    let typed: Vec<&str> = report.typed.iter().map(|t| t.symbol.name()).collect();
    assert_eq!(typed, vec!["COUNT"]);
    assert_eq!(
        report.rejected,
        vec![(Symbol::new("PAIR"), DiagnosticKind::ArgumentCount)]
    );

    let probe = fs::read_to_string(work.path().join(PROBE_FRAGMENT))?;
    assert!(probe.contains(&format!(
        "T{TOKEN}(PAIR); static_assert(sizeof(N{TOKEN}(PAIR)) == 1, \"N{TOKEN}\");"
    )));
    let accessors = fs::read_to_string(work.path().join(ACCESSOR_FRAGMENT))?;
    assert_eq!(accessors, format!(" int F{TOKEN}_COUNT(void) {{ return COUNT; }}\n"));
    Ok(())
}

#[test]
/// ヘッダ単体でコンパイルできなければ、候補を試す前に中断する。
fn broken_header_is_reported_before_probing() {
    let include = tempdir().unwrap();
    fs::write(include.path().join("demo.h"), DEMO_HEADER).unwrap();
    let work = tempdir().unwrap();
    let mut config = gnu_config(work.path());
    config.include_dirs.push(include.path().to_path_buf());

    let toolchain = demo_toolchain().with_broken_header("winnt.h: No such file or directory");
    let host = demo_host();
    let session = Session::new(&config, &toolchain, &host).unwrap();
    let err = generate_module(&session, "demo.h", None, &mut Vec::<u8>::new()).unwrap_err();

    assert!(matches!(&err, ProbeError::NoCompile { header, .. } if header == "demo.h"));
    assert!(err.is_header_fatal());
    assert!(err
        .diagnostics()
        .unwrap()
        .contains("winnt.h: No such file or directory"));
    assert!(toolchain.diagnose_batches().is_empty());
}

#[test]
fn mismatched_string_widths_skip_the_header() {
    let include = tempdir().unwrap();
    fs::write(include.path().join("wide.h"), "#define NAME L\"a\" \"b\"\n").unwrap();
    let work = tempdir().unwrap();
    let mut config = gnu_config(work.path());
    config.include_dirs.push(include.path().to_path_buf());

    let toolchain = ScriptedToolchain::new([(
        "NAME",
        vec!["error: unsupported non-standard concatenation of string literals".to_string()],
    )]);
    let host = FakeHost::new();
    let session = Session::new(&config, &toolchain, &host).unwrap();
    let mut listing: Vec<u8> = Vec::new();
    let err = generate_module(&session, "wide.h", None, &mut listing).unwrap_err();

    assert!(matches!(err, ProbeError::UnicodeOnly { .. }));
    assert!(listing.is_empty());
    assert_eq!(host.loads.get(), 0);
}

#[test]
fn unrecognized_diagnostic_aborts_with_its_text() {
    let include = tempdir().unwrap();
    fs::write(include.path().join("odd.h"), "#define ODD something\n").unwrap();
    let work = tempdir().unwrap();
    let mut config = gnu_config(work.path());
    config.include_dirs.push(include.path().to_path_buf());

    let toolchain = ScriptedToolchain::new([(
        "ODD",
        vec!["error: 'something' does not name a value in this context".to_string()],
    )]);
    let host = FakeHost::new();
    let session = Session::new(&config, &toolchain, &host).unwrap();
    let err = generate_module(&session, "odd.h", None, &mut Vec::<u8>::new()).unwrap_err();

    assert!(!err.is_header_fatal());
    assert_eq!(err.code(), "PROBE030");
    assert!(err
        .diagnostics()
        .unwrap()
        .contains("'something' does not name a value in this context"));
}

#[test]
fn missing_header_is_an_io_error() {
    let work = tempdir().unwrap();
    let config = gnu_config(work.path());
    let toolchain = ScriptedToolchain::empty();
    let host = FakeHost::new();
    let session = Session::new(&config, &toolchain, &host).unwrap();
    let err = generate_module(&session, "nowhere.h", None, &mut Vec::<u8>::new()).unwrap_err();
    assert!(matches!(err, ProbeError::Io(_)));
}
