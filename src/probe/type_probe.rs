// パス: src/probe/type_probe.rs
// 役割: シンボル列を意図的な型不一致の呼び出しへ変換してコンパイルし、診断から型を読み取る
// 意図: 変換不能なダミー型を引数に取る関数へ展開結果を渡し、コンパイラに実際の型を報告させる
// 関連ファイル: src/diagnostics/mod.rs, src/infer.rs, src/probe/mod.rs

use std::path::PathBuf;

use super::{Probe, ProbeContext};
use crate::diagnostics::{self, DiagnosticClassifier};
use crate::errors::{ProbeError, ProbeResult};
use crate::symbols::{Symbol, TypeResult};
use crate::toolchain::{CompileStage, ToolOutput, ToolchainFlavor};

/// 生成する翻訳単位のファイル名。
pub const MAIN_UNIT: &str = "probe_main.cpp";
/// プローブ文を並べた断片。1 行 1 シンボルで、行番号がそのまま診断グループになる。
pub const PROBE_FRAGMENT: &str = "probe.inc";

/// 型推論用の生成物。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeUnit {
    pub main: String,
    pub fragment: String,
}

/// バッチ単位の型推論プローブ。
pub struct TypeProbe<'a> {
    ctx: ProbeContext<'a>,
    classifier: &'a dyn DiagnosticClassifier,
}

impl<'a> TypeProbe<'a> {
    pub fn new(ctx: ProbeContext<'a>, classifier: &'a dyn DiagnosticClassifier) -> Self {
        Self { ctx, classifier }
    }

    /// プローブ文を含まない単位をコンパイルし、ヘッダが単体で通ることを確かめる。
    pub fn check_baseline(&self) -> ProbeResult<()> {
        let unit = self.emit(&[]);
        let output = self.execute(&unit)?;
        if output.success {
            Ok(())
        } else {
            Err(ProbeError::NoCompile {
                header: self.ctx.header.to_string(),
                diagnostics: output.text,
            })
        }
    }

    fn fragment_path(&self) -> PathBuf {
        self.ctx.workdir.path().join(PROBE_FRAGMENT)
    }
}

impl<'a> Probe for TypeProbe<'a> {
    type Input = [Symbol];
    type Artifact = ProbeUnit;
    type Raw = ToolOutput;
    type Output = Vec<(Symbol, TypeResult)>;

    fn emit(&self, symbols: &[Symbol]) -> ProbeUnit {
        let id = self.ctx.token.dummy_type();
        let func = self.ctx.token.probe_function();
        // g++ はカンマを含む展開でも先頭引数の変換失敗しか報告しないことがあるため、
        // 引数の個数を sizeof で数えて 1 でなければ static_assert で落とす
        let arity = match self.ctx.toolchain.flavor() {
            ToolchainFlavor::Gnu => Some(self.ctx.token.arity_check()),
            ToolchainFlavor::Msvc => None,
        };
        let arity_decl = arity
            .as_deref()
            .map(|check| {
                format!("template <typename... R> char (&{check}(R&&...))[sizeof...(R)];\n")
            })
            .unwrap_or_default();
        let main = format!(
            "{includes}typedef struct {{\n\tint dummy;\n}} {id};\nvoid {func}({id}& tmp) {{}}\n{arity_decl}int main(){{\n#include \"{PROBE_FRAGMENT}\"\n}}\n",
            includes = self.ctx.include_block(),
        );
        let fragment = symbols
            .iter()
            .map(|symbol| match &arity {
                Some(check) => format!(
                    "{func}({symbol}); static_assert(sizeof({check}({symbol})) == 1, \"{check}\");"
                ),
                None => format!("{func}({symbol});"),
            })
            .collect::<Vec<_>>()
            .join("\n");
        ProbeUnit { main, fragment }
    }

    fn execute(&self, unit: &ProbeUnit) -> ProbeResult<ToolOutput> {
        let workdir = self.ctx.workdir;
        let main = workdir.write(MAIN_UNIT, &unit.main)?;
        workdir.write(PROBE_FRAGMENT, &unit.fragment)?;
        self.ctx
            .toolchain
            .compile(workdir.path(), &[main], CompileStage::Diagnose)
    }

    fn interpret(&self, symbols: &[Symbol], output: ToolOutput) -> ProbeResult<Self::Output> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        if output.success {
            // 型不一致は必ず起きるはずなので、通ってしまったら型情報は何も得られていない
            return Err(ProbeError::NoCompile {
                header: self.ctx.header.to_string(),
                diagnostics: output.text,
            });
        }
        let groups = diagnostics::interpret(self.classifier, &output.text, &self.fragment_path())?;
        let expected = 1..=symbols.len() as u32;
        if groups.len() != symbols.len() || !groups.keys().copied().eq(expected) {
            return Err(ProbeError::GroupMismatch {
                expected: symbols.len(),
                found: groups.keys().copied().collect(),
            });
        }
        Ok(symbols.iter().cloned().zip(groups.into_values()).collect())
    }
}
