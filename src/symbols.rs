// パス: src/symbols.rs
// 役割: 推論対象シンボルと候補集合・バッチ分割・推論結果のデータ型を定義する
// 意図: パイプライン各段が受け渡す値を型で明示し、作業ディレクトリ経由の暗黙共有を避ける
// 関連ファイル: src/infer.rs, src/probe/type_probe.rs, src/probe/value_probe.rs

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::diagnostics::DiagnosticKind;

/// プリプロセッサで定義された識別子。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 順序付き・重複なしの候補シンボル列。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CandidateSet {
    symbols: Vec<Symbol>,
    seen: HashSet<String>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 未登録なら末尾に追加する。追加した場合に `true`。
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.seen.contains(&name) {
            return false;
        }
        self.seen.insert(name.clone());
        self.symbols.push(Symbol::new(name));
        true
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// 最大 `size` 件ずつのバッチに分割する（元の順序を保つ）。
    pub fn batches(&self, size: usize) -> impl Iterator<Item = &[Symbol]> {
        self.symbols.chunks(size.max(1))
    }
}

impl<S: Into<String>> FromIterator<S> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = CandidateSet::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

/// 1 シンボル分の型推論結果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeResult {
    /// コンパイラが報告した型の綴り。
    Resolved(String),
    /// 値として扱えないシンボル（関数ポインタ・構文エラーなど）。
    Rejected(DiagnosticKind),
    /// 既知のどのパターンにも一致しなかった診断グループ。
    Unrecognized(Vec<String>),
}

impl TypeResult {
    pub fn resolved_type(&self) -> Option<&str> {
        match self {
            TypeResult::Resolved(ty) => Some(ty),
            _ => None,
        }
    }
}

/// 型が確定したシンボル。値取得の入力になる。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TypedSymbol {
    pub symbol: Symbol,
    pub c_type: String,
}

impl TypedSymbol {
    pub fn new(symbol: Symbol, c_type: impl Into<String>) -> Self {
        Self {
            symbol,
            c_type: c_type.into(),
        }
    }
}

/// 最終出力単位: 名前・型・値のテキスト表現。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValueRecord {
    pub symbol: Symbol,
    pub c_type: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// 重複を除きつつ最初の出現順を維持することを確認する。
    fn candidate_set_keeps_first_occurrence_order() {
        let set: CandidateSet = ["B", "A", "B", "C", "A"].into_iter().collect();
        let names: Vec<&str> = set.symbols().iter().map(Symbol::name).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn batches_are_bounded_and_ordered() {
        let set: CandidateSet = (0..7).map(|i| format!("S{i}")).collect();
        let sizes: Vec<usize> = set.batches(3).map(<[Symbol]>::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        let last = set.batches(3).last().unwrap();
        assert_eq!(last[0].name(), "S6");
    }
}
