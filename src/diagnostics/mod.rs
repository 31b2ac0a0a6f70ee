// パス: src/diagnostics/mod.rs
// 役割: コンパイラ診断テキストを行ごとのグループへまとめ、シンボル単位の型推論結果へ還元する
// 意図: 文言一致をツールチェーン別の分類器へ閉じ込め、解釈アルゴリズム本体を共通化する
// 関連ファイル: src/diagnostics/msvc.rs, src/diagnostics/gnu.rs, src/probe/type_probe.rs
//! 診断テキスト解釈器。
//!
//! 手順:
//! 1. バナー行と空行を捨てる。
//! 2. 全行を走査し、診断数超過・文字列幅不一致があれば即座に中断する。
//! 3. `<unit>(<line>) : <message>` 形式で行番号を拾い、拾えない行は直前の行番号へ繰り越す。
//! 4. グループごとに、却下パターン → 型変換パターンの順で分類する。

pub mod gnu;
pub mod msvc;

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::Serialize;

use crate::errors::{ProbeError, ProbeResult};
use crate::symbols::TypeResult;

pub use gnu::GnuClassifier;
pub use msvc::MsvcClassifier;

/// 分類器が報告する安定した診断種別。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// 引数 0 個の呼び出しと解釈された（呼び出し規約付きの宣言など）。
    ArgumentCountZero,
    /// 引数の個数が合わない（カンマを含む展開）。
    ArgumentCount,
    UndeclaredIdentifier,
    TypeAsExpression,
    SyntaxError,
    IntrinsicContext,
    /// 変換元の型が空: 単一の式型を持たない列挙子的な構成。
    EmptyConversion,
    /// ダミー型への変換失敗。捕捉した型の綴りを持つ。
    Conversion(String),
    /// 診断数の上限に達してコンパイルが打ち切られた。
    ErrorLimit,
    /// 幅の異なる文字列リテラルの連結。
    MismatchedConcatenation,
}

impl DiagnosticKind {
    /// シンボルを却下する種別か。
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            DiagnosticKind::ArgumentCountZero
                | DiagnosticKind::ArgumentCount
                | DiagnosticKind::UndeclaredIdentifier
                | DiagnosticKind::TypeAsExpression
                | DiagnosticKind::SyntaxError
                | DiagnosticKind::IntrinsicContext
                | DiagnosticKind::EmptyConversion
        )
    }
}

/// 特定コンパイラの診断文言を `DiagnosticKind` へ写像する分類器。
pub trait DiagnosticClassifier {
    /// 出力先頭で読み捨てる行数（ソースファイル名のエコーなど）。
    fn banner_lines(&self) -> usize;

    /// 生成ユニットの行番号を拾う正規表現。キャプチャ 1 が行番号、2 がメッセージ。
    fn location_pattern(&self, unit_file_name: &str) -> ProbeResult<Regex>;

    /// 1 メッセージを分類する。未知の文言は `None`。
    fn classify(&self, message: &str) -> Option<DiagnosticKind>;

    /// コンパイル全体を打ち切るべき行か（上限超過・文字幅不一致）。
    fn classify_bail(&self, line: &str) -> Option<DiagnosticKind>;
}

/// 1 コンパイルで得られた診断 1 件。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub source_line: u32,
    pub message: String,
}

/// 行番号ごとにまとめた診断メッセージ。
pub type DiagnosticGroups = BTreeMap<u32, Vec<String>>;

/// 生の診断テキストを解釈し、行番号 → 推論結果の対応を返す。
pub fn interpret(
    classifier: &dyn DiagnosticClassifier,
    raw_text: &str,
    unit_path: &Path,
) -> ProbeResult<BTreeMap<u32, TypeResult>> {
    let lines = significant_lines(raw_text, classifier.banner_lines());
    check_for_bail(classifier, &lines)?;
    let unit_file_name = unit_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let records = locate(classifier, &lines, &unit_file_name)?;
    Ok(group_by_line(records)
        .into_iter()
        .map(|(line, messages)| (line, reduce_group(classifier, messages)))
        .collect())
}

/// バナー行と空行を取り除いた行列。
pub fn significant_lines(raw_text: &str, banner_lines: usize) -> Vec<&str> {
    raw_text
        .lines()
        .skip(banner_lines)
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .collect()
}

fn check_for_bail(classifier: &dyn DiagnosticClassifier, lines: &[&str]) -> ProbeResult<()> {
    for line in lines {
        match classifier.classify_bail(line) {
            Some(DiagnosticKind::ErrorLimit) => return Err(ProbeError::Overflow),
            Some(DiagnosticKind::MismatchedConcatenation) => {
                return Err(ProbeError::UnicodeOnly {
                    diagnostic: (*line).to_string(),
                })
            }
            _ => {}
        }
    }
    Ok(())
}

/// 各行に行番号を割り当てる。行番号を持たない行は直前の行番号（初期値 1）へ繰り越す。
pub fn locate(
    classifier: &dyn DiagnosticClassifier,
    lines: &[&str],
    unit_file_name: &str,
) -> ProbeResult<Vec<DiagnosticRecord>> {
    let pattern = classifier.location_pattern(unit_file_name)?;
    let mut last_line = 1;
    let mut records = Vec::with_capacity(lines.len());
    for line in lines {
        let located = pattern.captures(line).and_then(|caps| {
            let num = caps.get(1)?.as_str().parse::<u32>().ok()?;
            let message = caps.get(2)?.as_str().to_string();
            Some((num, message))
        });
        let (source_line, message) = located.unwrap_or_else(|| (last_line, (*line).to_string()));
        last_line = source_line;
        records.push(DiagnosticRecord {
            source_line,
            message,
        });
    }
    Ok(records)
}

pub fn group_by_line(records: Vec<DiagnosticRecord>) -> DiagnosticGroups {
    let mut groups = DiagnosticGroups::new();
    for record in records {
        groups
            .entry(record.source_line)
            .or_default()
            .push(record.message);
    }
    groups
}

/// 1 グループを推論結果へ還元する。却下パターンは型変換パターンより常に優先する。
pub fn reduce_group(classifier: &dyn DiagnosticClassifier, messages: Vec<String>) -> TypeResult {
    let kinds: Vec<DiagnosticKind> = messages
        .iter()
        .filter_map(|message| classifier.classify(message))
        .collect();
    if let Some(rejection) = kinds.iter().find(|kind| kind.is_rejection()) {
        return TypeResult::Rejected(rejection.clone());
    }
    for kind in kinds {
        if let DiagnosticKind::Conversion(ty) = kind {
            return TypeResult::Resolved(ty);
        }
    }
    TypeResult::Unrecognized(messages)
}
