// パス: src/token.rs
// 役割: 生成コード内の識別子衝突を避ける一意トークンを扱う
// 意図: 実行ごとに名前空間を作り、プラットフォームの識別子と衝突しないダミー型・アクセサ名を導出する
// 関連ファイル: src/probe/type_probe.rs, src/probe/value_probe.rs, src/diagnostics/msvc.rs

use std::fmt;

use uuid::Uuid;

use crate::errors::{ProbeError, ProbeResult};

const TOKEN_PREFIX: &str = "__dp_";

/// 生成コード用の名前空間トークン。C 識別子であることが保証される。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// 実行ごとに新しいトークンを生成する。
    pub fn generate() -> Self {
        Self(format!("{TOKEN_PREFIX}{}", Uuid::new_v4().simple()))
    }

    /// 設定などで与えられた固定トークンを検証して受け取る。
    pub fn fixed(text: &str) -> ProbeResult<Self> {
        if is_c_identifier(text) {
            Ok(Self(text.to_string()))
        } else {
            Err(ProbeError::Config(format!(
                "token `{text}` は C の識別子ではありません"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 変換不能なダミー型の名前。
    pub fn dummy_type(&self) -> &str {
        &self.0
    }

    /// ダミー型の参照を受け取るプローブ関数の名前。
    pub fn probe_function(&self) -> String {
        format!("T{}", self.0)
    }

    /// 引数の個数を数える宣言のみの関数。g++ でカンマを含む展開を見分けるのに使う。
    pub fn arity_check(&self) -> String {
        format!("N{}", self.0)
    }

    /// シンボルごとのアクセサ関数（エクスポート名）。
    pub fn accessor(&self, symbol: &str) -> String {
        format!("F{}_{symbol}", self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub(crate) fn is_c_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
