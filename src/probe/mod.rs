// パス: src/probe/mod.rs
// 役割: 「プローブコード生成 → 外部実行 → 結果解釈」の共通パイプラインを定義する
// 意図: 型推論用コンパイルと値取得用ビルド/ロードを同じ抽象の別パラメータとして扱う
// 関連ファイル: src/probe/type_probe.rs, src/probe/value_probe.rs, src/engine.rs

pub mod type_probe;
pub mod value_probe;

use std::path::Path;

use crate::errors::ProbeResult;
use crate::toolchain::Toolchain;
use crate::token::Token;
use crate::workdir::WorkDir;

pub use type_probe::TypeProbe;
pub use value_probe::ValueProbe;

/// 生成・実行・解釈の 3 段からなるプローブ。
pub trait Probe {
    type Input: ?Sized;
    /// メモリ上の生成物（ソース文字列など）。
    type Artifact;
    /// 外部実行の生の結果。
    type Raw;
    type Output;

    fn emit(&self, input: &Self::Input) -> Self::Artifact;

    fn execute(&self, artifact: &Self::Artifact) -> ProbeResult<Self::Raw>;

    fn interpret(&self, input: &Self::Input, raw: Self::Raw) -> ProbeResult<Self::Output>;

    fn run(&self, input: &Self::Input) -> ProbeResult<Self::Output> {
        let artifact = self.emit(input);
        let raw = self.execute(&artifact)?;
        self.interpret(input, raw)
    }
}

/// 両プローブが共有する環境。
#[derive(Clone, Copy)]
pub struct ProbeContext<'a> {
    pub toolchain: &'a dyn Toolchain,
    pub workdir: &'a WorkDir,
    pub token: &'a Token,
    /// 対象ヘッダ（`#include` に書く名前かパス）。
    pub header: &'a str,
    /// 対象ヘッダより前に読み込む前提ヘッダ。
    pub prelude: &'a [String],
}

impl<'a> ProbeContext<'a> {
    /// 前提ヘッダと対象ヘッダの `#include` 列。
    pub fn include_block(&self) -> String {
        let mut block = String::new();
        for header in self.prelude.iter().map(String::as_str).chain([self.header]) {
            block.push_str(&include_line(header));
            block.push('\n');
        }
        block
    }
}

fn include_line(header: &str) -> String {
    let path = Path::new(header);
    if path.is_absolute() || header.starts_with('.') {
        format!("#include \"{}\"", header.replace('\\', "/"))
    } else {
        format!("#include <{header}>")
    }
}
