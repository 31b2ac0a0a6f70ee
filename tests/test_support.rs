// パス: tests/test_support.rs
// 役割: 統合テスト共通の偽ツールチェーン・偽ローダと補助関数を提供する
// 意図: 実コンパイラなしで g++ 形式の診断を再現し、パイプライン全体を決定的に検証する
// 関連ファイル: tests/engine_scenarios.rs, tests/infer_retry.rs, tests/value_extract.rs
#![allow(dead_code)]
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use defprobe::{
    config::ProbeConfig,
    errors::{ProbeError, ProbeResult},
    loader::{LoadedModule, ModuleHost},
    marshal::{RawValue, ReturnKind},
    probe::type_probe::PROBE_FRAGMENT,
    toolchain::{CompileStage, ToolOutput, Toolchain, ToolchainFlavor},
};

/// テストで固定するトークン。
pub const TOKEN: &str = "__dp_test";

/// g++ 既定の `-fmax-errors` 相当。
pub const ERROR_CEILING: usize = 100;

/// テスト用の設定（g++ 系統・固定トークン・一時作業ディレクトリ）。
pub fn gnu_config(workdir: &Path) -> ProbeConfig {
    let mut config = ProbeConfig::for_flavor(ToolchainFlavor::Gnu);
    config.token = Some(TOKEN.to_string());
    config.workdir = Some(workdir.to_path_buf());
    config
}

/// 型変換失敗の診断（g++ 形式）。
pub fn conversion(c_type: &str) -> String {
    format!(
        "error: invalid initialization of reference of type '{TOKEN}&' from expression of type '{c_type}'"
    )
}

pub fn undeclared(symbol: &str) -> String {
    format!("error: '{symbol}' was not declared in this scope")
}

/// カンマを含む展開に対する実際の g++ 出力。先頭引数の変換失敗と引数個数検査の失敗が並ぶ。
pub fn comma_expansion(first: &str) -> Vec<String> {
    vec![
        format!(
            "error: invalid initialization of non-const reference of type '{TOKEN}&' from an rvalue of type '{first}'"
        ),
        format!("error: static assertion failed: N{TOKEN}"),
        "note: the comparison reduces to '(2 == 1)'".to_string(),
    ]
}

pub fn syntax_error() -> String {
    "error: expected ')' before ';' token".to_string()
}

/// 記録したツールチェーン呼び出し。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolCall {
    /// 型推論用コンパイル。プローブ断片に並んだシンボル列。
    Diagnose(Vec<String>),
    SharedObject,
    Link,
}

/// シンボル名 → 診断メッセージ列の表から g++ 形式の出力を組み立てるツールチェーン。
///
/// 表に無いシンボルは未宣言扱い。エラー行が上限を超えたら g++ と同様に打ち切る。
pub struct ScriptedToolchain {
    diagnostics: HashMap<String, Vec<String>>,
    ceiling: usize,
    shared_object: RefCell<VecDeque<ToolOutput>>,
    link: RefCell<VecDeque<ToolOutput>>,
    baseline_failure: Option<String>,
    pub calls: RefCell<Vec<ToolCall>>,
}

impl ScriptedToolchain {
    pub fn new<I, S>(table: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: Into<String>,
    {
        Self {
            diagnostics: table.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ceiling: ERROR_CEILING,
            shared_object: RefCell::new(VecDeque::new()),
            link: RefCell::new(VecDeque::new()),
            baseline_failure: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// 診断表を持たない（全シンボル未宣言扱い）ツールチェーン。
    pub fn empty() -> Self {
        Self::new(Vec::<(String, Vec<String>)>::new())
    }

    pub fn with_ceiling(mut self, ceiling: usize) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// 空のプローブでもコンパイルが失敗するヘッダを模す。
    pub fn with_broken_header(mut self, text: &str) -> Self {
        self.baseline_failure = Some(text.to_string());
        self
    }

    pub fn fail_shared_object(self, text: &str) -> Self {
        self.shared_object.borrow_mut().push_back(ToolOutput {
            success: false,
            text: text.to_string(),
        });
        self
    }

    pub fn fail_link(self, text: &str) -> Self {
        self.link.borrow_mut().push_back(ToolOutput {
            success: false,
            text: text.to_string(),
        });
        self
    }

    /// 型推論用コンパイルに渡ったシンボル列（ベースラインの空コンパイルは除く）。
    pub fn diagnose_batches(&self) -> Vec<Vec<String>> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                ToolCall::Diagnose(symbols) if !symbols.is_empty() => Some(symbols.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &ToolCall) -> usize {
        self.calls.borrow().iter().filter(|call| *call == wanted).count()
    }

    fn respond(&self, symbols: &[String]) -> ToolOutput {
        if let Some(text) = &self.baseline_failure {
            return ToolOutput {
                success: false,
                text: format!("probe_main.cpp:1:10: fatal error: {text}\n"),
            };
        }
        if symbols.is_empty() {
            return ToolOutput {
                success: true,
                text: String::new(),
            };
        }
        let mut text = String::from("probe_main.cpp: In function 'int main()':\n");
        let mut errors = 0;
        for (index, symbol) in symbols.iter().enumerate() {
            let messages = self
                .diagnostics
                .get(symbol)
                .cloned()
                .unwrap_or_else(|| vec![undeclared(symbol)]);
            for message in messages {
                if message.starts_with("error:") {
                    if errors == self.ceiling {
                        text.push_str(&format!(
                            "compilation terminated due to -fmax-errors={}.\n",
                            self.ceiling
                        ));
                        return ToolOutput {
                            success: false,
                            text,
                        };
                    }
                    errors += 1;
                }
                text.push_str(&format!("/work/{PROBE_FRAGMENT}:{}:9: {message}\n", index + 1));
            }
            text.push_str(&format!(
                "probe_main.cpp:6:6: note:   initializing argument 1 of 'void T{TOKEN}({TOKEN}&)'\n"
            ));
        }
        ToolOutput {
            success: false,
            text,
        }
    }
}

/// プローブ断片 `T<token>(NAME); static_assert(...);` の並びからシンボル名を取り出す。
fn fragment_symbols(workdir: &Path) -> Vec<String> {
    let prefix = format!("T{TOKEN}(");
    fs::read_to_string(workdir.join(PROBE_FRAGMENT))
        .unwrap_or_default()
        .lines()
        .filter_map(|line| {
            let (symbol, _) = line.strip_prefix(prefix.as_str())?.split_once(");")?;
            Some(symbol)
        })
        .map(str::to_string)
        .collect()
}

impl Toolchain for ScriptedToolchain {
    fn flavor(&self) -> ToolchainFlavor {
        ToolchainFlavor::Gnu
    }

    fn compile(
        &self,
        workdir: &Path,
        _sources: &[PathBuf],
        stage: CompileStage,
    ) -> ProbeResult<ToolOutput> {
        match stage {
            CompileStage::Diagnose => {
                let symbols = fragment_symbols(workdir);
                self.calls
                    .borrow_mut()
                    .push(ToolCall::Diagnose(symbols.clone()));
                Ok(self.respond(&symbols))
            }
            CompileStage::SharedObject => {
                self.calls.borrow_mut().push(ToolCall::SharedObject);
                Ok(self
                    .shared_object
                    .borrow_mut()
                    .pop_front()
                    .unwrap_or(ToolOutput {
                        success: true,
                        text: String::new(),
                    }))
            }
        }
    }

    fn link(&self, _workdir: &Path, _objects: &[PathBuf], _module: &Path) -> ProbeResult<ToolOutput> {
        self.calls.borrow_mut().push(ToolCall::Link);
        Ok(self.link.borrow_mut().pop_front().unwrap_or(ToolOutput {
            success: true,
            text: String::new(),
        }))
    }

    fn object_path(&self, source: &Path) -> PathBuf {
        source.with_extension("o")
    }

    fn module_path(&self, workdir: &Path, stem: &str) -> PathBuf {
        workdir.join(format!("lib{stem}.so"))
    }

    fn export_decoration(&self) -> &'static str {
        ""
    }
}

/// エクスポート名 → 戻り値の表を持つ偽ローダ。
#[derive(Clone, Default)]
pub struct FakeHost {
    values: HashMap<String, RawValue>,
    strings: HashMap<usize, Vec<u8>>,
    pub loads: Rc<Cell<usize>>,
    pub unloads: Rc<Cell<usize>>,
    pub calls: Rc<RefCell<Vec<(String, ReturnKind)>>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// シンボル `symbol` のアクセサが返す値。
    pub fn value(mut self, symbol: &str, value: RawValue) -> Self {
        self.values
            .insert(format!("F{TOKEN}_{symbol}"), value);
        self
    }

    /// ポインタとして読み直される番地に置く文字列。
    pub fn string_at(mut self, address: usize, text: &str) -> Self {
        self.strings.insert(address, text.as_bytes().to_vec());
        self
    }
}

impl ModuleHost for FakeHost {
    fn load(&self, _path: &Path) -> ProbeResult<Box<dyn LoadedModule>> {
        self.loads.set(self.loads.get() + 1);
        Ok(Box::new(FakeModule {
            host: self.clone(),
        }))
    }
}

struct FakeModule {
    host: FakeHost,
}

impl LoadedModule for FakeModule {
    fn call(&self, export: &str, kind: ReturnKind) -> ProbeResult<RawValue> {
        self.host
            .calls
            .borrow_mut()
            .push((export.to_string(), kind));
        self.host
            .values
            .get(export)
            .cloned()
            .ok_or_else(|| ProbeError::load("fake", format!("missing export {export}")))
    }

    unsafe fn read_c_string(&self, address: usize) -> Vec<u8> {
        self.host.strings.get(&address).cloned().unwrap_or_default()
    }

    fn unload(self: Box<Self>) -> ProbeResult<()> {
        self.host.unloads.set(self.host.unloads.get() + 1);
        Ok(())
    }
}
