// パス: src/marshal.rs
// 役割: 正規化済みの型綴りから戻り値のマーシャリング規則を選び、取得した値をテキストへ整形する
// 意図: アクセサ呼び出し時の型解釈と出力表現を一箇所で決める
// 関連ファイル: src/loader.rs, src/probe/value_probe.rs, src/output.rs

use std::collections::HashMap;
use std::fmt::Write as _;

use once_cell::sync::Lazy;

/// アクセサの戻り値をどう受け取るか。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReturnKind {
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Double,
    Float,
    Bool,
    Char,
    /// NUL 終端のナロー文字列ポインタ。
    CString,
    /// NUL 終端のワイド文字列ポインタ。
    WideString,
    /// unsigned long として受け取り、閾値を超えたらポインタとして読み直す旧来の別名。
    LegacyHandle,
}

static RETURN_KINDS: Lazy<HashMap<&'static str, ReturnKind>> = Lazy::new(|| {
    HashMap::from([
        ("double", ReturnKind::Double),
        ("const char *", ReturnKind::CString),
        ("const char*", ReturnKind::CString),
        ("const wchar_t *", ReturnKind::WideString),
        ("const wchar_t*", ReturnKind::WideString),
        ("int", ReturnKind::Int),
        ("unsigned int", ReturnKind::UInt),
        ("unsigned long", ReturnKind::ULong),
        ("long unsigned int", ReturnKind::ULong),
        ("LPCSTR", ReturnKind::LegacyHandle),
        ("long", ReturnKind::Long),
        ("long int", ReturnKind::Long),
        ("long long", ReturnKind::LongLong),
        ("long long int", ReturnKind::LongLong),
        ("__int64", ReturnKind::LongLong),
        ("unsigned long long", ReturnKind::ULongLong),
        ("long long unsigned int", ReturnKind::ULongLong),
        ("unsigned __int64", ReturnKind::ULongLong),
        ("float", ReturnKind::Float),
        ("bool", ReturnKind::Bool),
        ("char", ReturnKind::Char),
    ])
});

/// 型綴りに対応する戻り値規則。表に無い綴りは int として受け取る。
pub fn return_kind(c_type: &str) -> ReturnKind {
    match RETURN_KINDS.get(c_type) {
        Some(kind) => *kind,
        None => {
            tracing::debug!(c_type, "no marshaling rule; reading as int");
            ReturnKind::Int
        }
    }
}

/// アクセサ呼び出しで得た生の値。
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    Int(i64),
    UInt(u64),
    Double(f64),
    Bool(bool),
    /// ナロー文字列。`None` は NULL ポインタ。
    Str(Option<Vec<u8>>),
    /// ワイド文字列。`None` は NULL ポインタ。
    WideStr(Option<String>),
    /// 旧来の別名をポインタとして読み直した結果。
    Pointee(Vec<u8>),
}

/// 値を出力用テキストへ整形する。
pub fn render(value: &RawValue) -> String {
    match value {
        RawValue::Int(v) => v.to_string(),
        RawValue::UInt(v) => v.to_string(),
        RawValue::Double(v) => format!("{v:?}"),
        RawValue::Bool(b) => (if *b { "True" } else { "False" }).to_string(),
        RawValue::Str(Some(bytes)) => quote(&String::from_utf8_lossy(bytes), '\''),
        RawValue::WideStr(Some(text)) => format!("u{}", quote(text, '\'')),
        RawValue::Str(None) | RawValue::WideStr(None) => "None".to_string(),
        RawValue::Pointee(bytes) => quote(&String::from_utf8_lossy(bytes), '"'),
    }
}

fn quote(text: &str, delim: char) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(delim);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// 既定の対応表と、表に無い綴りの int フォールバックを確認する。
    fn table_lookup() {
        assert_eq!(return_kind("double"), ReturnKind::Double);
        assert_eq!(return_kind("const char *"), ReturnKind::CString);
        assert_eq!(return_kind("const wchar_t *"), ReturnKind::WideString);
        assert_eq!(return_kind("unsigned long"), ReturnKind::ULong);
        assert_eq!(return_kind("LPCSTR"), ReturnKind::LegacyHandle);
        assert_eq!(return_kind("HRESULT"), ReturnKind::Int);
    }

    #[test]
    fn render_variants() {
        assert_eq!(render(&RawValue::Int(3)), "3");
        assert_eq!(render(&RawValue::Int(-1)), "-1");
        assert_eq!(render(&RawValue::UInt(4294967295)), "4294967295");
        assert_eq!(render(&RawValue::Double(1.5)), "1.5");
        assert_eq!(render(&RawValue::Double(3.0)), "3.0");
        assert_eq!(render(&RawValue::Bool(true)), "True");
        assert_eq!(render(&RawValue::Str(Some(b"hello".to_vec()))), "'hello'");
        assert_eq!(render(&RawValue::WideStr(Some("w".into()))), "u'w'");
        assert_eq!(render(&RawValue::Str(None)), "None");
        assert_eq!(render(&RawValue::Pointee(b"Microsoft".to_vec())), "\"Microsoft\"");
    }

    #[test]
    fn quoting_escapes_delimiter_and_controls() {
        assert_eq!(render(&RawValue::Str(Some(b"it's\n".to_vec()))), "'it\\'s\\n'");
        assert_eq!(render(&RawValue::Str(Some(vec![b'a', 1]))), "'a\\x01'");
    }
}
