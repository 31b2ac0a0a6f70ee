//! エラー型の定義（共通フォーマット: \[CODE\] メッセージ）。
//!
//! 推論パイプライン全体で共有する `ProbeError` と、その分類ヘルパを提供する。
//! - シンボル単位の問題（Rejected）はエラーにせず、呼び出し側で黙って落とす。
//! - ヘッダ単位の問題（UnicodeOnly / NoCompile）はそのヘッダの処理を中断する。
//! - 未知の診断パターンは実行全体を止め、診断本文を保持したまま表に出す。

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("診断数がコンパイラの上限を超えました（バッチ分割が必要です）")]
    Overflow,
    #[error("単独でコンパイルしても診断数が上限を超えます: {symbol}")]
    SymbolOverflow { symbol: String },
    #[error("文字列連結の文字幅が一致しません（Unicode ビルド専用ヘッダの可能性）: {diagnostic}")]
    UnicodeOnly { diagnostic: String },
    #[error("ヘッダ {header} が単体でコンパイルできません")]
    NoCompile { header: String, diagnostics: String },
    #[error("未知の診断パターンです: {symbol} (バッチ内 {position} 番目)")]
    Unrecognized {
        symbol: String,
        /// バッチ内での位置（1 始まり）。再試行後も元のバッチでの位置を指す。
        position: u32,
        diagnostics: Vec<String>,
    },
    #[error("診断グループ数がバッチと一致しません: 期待 {expected} 件, 検出行 {found:?}")]
    GroupMismatch { expected: usize, found: Vec<u32> },
    #[error("値取得モジュールのビルドに失敗しました")]
    LinkFailure { diagnostics: String },
    #[error("外部コマンド実行に失敗しました: {command} (status: {status:?})")]
    CommandFailure {
        command: String,
        status: Option<ExitStatus>,
        stderr: String,
    },
    #[error("動的モジュールの読み込みに失敗しました: {path}: {reason}")]
    Load { path: PathBuf, reason: String },
    #[error("設定が不正です: {0}")]
    Config(String),
    #[error("診断パターンが不正です: {0}")]
    Pattern(#[from] regex::Error),
}

impl ProbeError {
    pub fn command_failure(
        command: impl Into<String>,
        status: Option<ExitStatus>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailure {
            command: command.into(),
            status,
            stderr: stderr.into(),
        }
    }

    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// 安定したエラーコードを返す。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "PROBE001",
            Self::Overflow => "PROBE010",
            Self::SymbolOverflow { .. } => "PROBE011",
            Self::UnicodeOnly { .. } => "PROBE020",
            Self::NoCompile { .. } => "PROBE021",
            Self::Unrecognized { .. } => "PROBE030",
            Self::GroupMismatch { .. } => "PROBE031",
            Self::LinkFailure { .. } => "PROBE040",
            Self::CommandFailure { .. } => "PROBE050",
            Self::Load { .. } => "PROBE051",
            Self::Config(_) => "PROBE060",
            Self::Pattern(_) => "PROBE061",
        }
    }

    /// そのヘッダだけを諦めれば実行を継続できるエラーか。
    pub fn is_header_fatal(&self) -> bool {
        matches!(self, Self::UnicodeOnly { .. } | Self::NoCompile { .. })
    }

    /// 調査用に保持している生の診断テキスト。
    pub fn diagnostics(&self) -> Option<String> {
        match self {
            Self::Unrecognized { diagnostics, .. } => Some(diagnostics.join("\n")),
            Self::NoCompile { diagnostics, .. } | Self::LinkFailure { diagnostics } => {
                Some(diagnostics.clone())
            }
            Self::UnicodeOnly { diagnostic } => Some(diagnostic.clone()),
            Self::CommandFailure { stderr, .. } => Some(stderr.clone()),
            _ => None,
        }
    }
}

/// 推論パイプラインの結果型。
pub type ProbeResult<T> = Result<T, ProbeError>;

impl From<toml::de::Error> for ProbeError {
    fn from(err: toml::de::Error) -> Self {
        ProbeError::Config(err.to_string())
    }
}
