// パス: src/normalize.rs
// 役割: コンパイラが報告した型の綴りを値取得用の正規形へ書き換える
// 意図: 配列型をポインタ型へ寄せ、戻り値にできない関数ポインタ等を値取得前に落とす
// 関連ファイル: src/infer.rs, src/marshal.rs, src/probe/value_probe.rs

use once_cell::sync::Lazy;
use regex::Regex;

use crate::symbols::{Symbol, TypeResult, TypedSymbol};

/// 綴りの書き換え規則。`None` はシンボルごと落とす。
struct Rule {
    pattern: Regex,
    replacement: Option<&'static str>,
}

macro_rules! rules {
    ( $( $pattern:literal => $replacement:expr ),+ $(,)? ) => {
        vec![
            $(
                Rule {
                    pattern: Regex::new($pattern).expect("normalizer pattern"),
                    replacement: $replacement,
                },
            )+
        ]
    };
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    rules! {
        r"^const wchar_t \[\d+\]$" => Some("const wchar_t *"),
        r"^const char \[\d+\]$" => Some("const char *"),
        r"^.+\(__stdcall \*\)\(.+\)" => None,
        r"^.+\(__cdecl \*\)\(.+\)" => None,
        r"^overloaded-function" => None,
        // g++ の綴り
        r"^.+\(\*\)\(.*\)" => None,
        r"^<unresolved overloaded function type>" => None,
        // 関数名そのもの。g++ は `int(const char*)` のように関数型で綴る
        r"^[^()]+\(.*\)$" => None,
    }
});

/// 1 つの型綴りを正規化する。対象外の綴りはそのまま返す。
pub fn normalize_type(raw: &str) -> Option<String> {
    for rule in RULES.iter() {
        if rule.pattern.is_match(raw) {
            return rule.replacement.map(str::to_string);
        }
    }
    Some(raw.to_string())
}

/// 推論結果から値取得対象のシンボルだけを残す（順序は維持）。
pub fn normalize_results(results: Vec<(Symbol, TypeResult)>) -> Vec<TypedSymbol> {
    results
        .into_iter()
        .filter_map(|(symbol, result)| {
            let raw = result.resolved_type()?;
            match normalize_type(raw) {
                Some(c_type) => Some(TypedSymbol::new(symbol, c_type)),
                None => {
                    tracing::debug!(symbol = %symbol, c_type = raw, "unsupported type dropped");
                    None
                }
            }
        })
        .collect()
}
