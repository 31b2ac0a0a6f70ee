// パス: src/toolchain/mod.rs
// 役割: 外部コンパイラ／リンカとの境界を抽象化する
// 意図: プローブ処理を実際のツールチェーンから切り離し、差し替えやテスト用の偽実装を可能にする
// 関連ファイル: src/toolchain/command.rs, src/probe/type_probe.rs, src/probe/value_probe.rs

pub mod command;

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diagnostics::{DiagnosticClassifier, GnuClassifier, MsvcClassifier};
use crate::errors::ProbeResult;
use crate::token::Token;

pub use command::CommandToolchain;

/// 対応するコンパイラの系統。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainFlavor {
    Msvc,
    Gnu,
}

impl ToolchainFlavor {
    /// ホストのターゲットから既定の系統を選ぶ。
    pub fn for_host() -> Self {
        use target_lexicon::{Environment, Triple};
        if Triple::host().environment == Environment::Msvc {
            Self::Msvc
        } else {
            Self::Gnu
        }
    }

    /// この系統の診断文言を解釈する分類器。
    pub fn classifier(self, token: &Token) -> ProbeResult<Box<dyn DiagnosticClassifier>> {
        Ok(match self {
            Self::Msvc => Box::new(MsvcClassifier::new(token)?),
            Self::Gnu => Box::new(GnuClassifier::new(token)?),
        })
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_lowercase().as_str() {
            "msvc" | "cl" => Some(Self::Msvc),
            "gnu" | "gcc" | "g++" => Some(Self::Gnu),
            _ => None,
        }
    }
}

/// コンパイルの目的。型推論用は診断だけが欲しいので構文検査で済ませる。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompileStage {
    /// 診断を得るためだけのコンパイル。
    Diagnose,
    /// 共有モジュールへリンクするオブジェクトの生成。
    SharedObject,
}

/// 外部ツール 1 回分の結果。失敗は異常ではなく `success == false` で表す。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub text: String,
}

/// コンパイル・リンクの境界。
pub trait Toolchain {
    fn flavor(&self) -> ToolchainFlavor;

    fn compile(
        &self,
        workdir: &Path,
        sources: &[PathBuf],
        stage: CompileStage,
    ) -> ProbeResult<ToolOutput>;

    fn link(&self, workdir: &Path, objects: &[PathBuf], module: &Path)
        -> ProbeResult<ToolOutput>;

    /// `source` をコンパイルしたときのオブジェクトファイル。
    fn object_path(&self, source: &Path) -> PathBuf;

    /// 共有モジュールのファイル名（`stem` から導出）。
    fn module_path(&self, workdir: &Path, stem: &str) -> PathBuf;

    /// エクスポート関数に付ける修飾。
    fn export_decoration(&self) -> &'static str;
}
