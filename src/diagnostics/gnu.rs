// パス: src/diagnostics/gnu.rs
// 役割: g++ の診断文言を DiagnosticKind へ分類する
// 意図: MSVC 以外のホストでも同じ解釈器を差し替えなしで使えるようにする
// 関連ファイル: src/diagnostics/mod.rs, src/toolchain/command.rs

use regex::Regex;

use super::{DiagnosticClassifier, DiagnosticKind};
use crate::errors::ProbeResult;
use crate::token::Token;

/// g++ 用の分類器。`LC_ALL=C` で ASCII 引用符の出力を前提とする。
#[derive(Debug)]
pub struct GnuClassifier {
    too_few_arguments: Regex,
    too_many_arguments: Regex,
    arity_assertion: Regex,
    undeclared: Regex,
    primary_expression: Regex,
    syntax: Regex,
    bind_rvalue: Regex,
    initialization: Regex,
    error_limit: Regex,
    string_concat: Regex,
}

impl GnuClassifier {
    pub fn new(token: &Token) -> ProbeResult<Self> {
        let func = regex::escape(&token.probe_function());
        let id = regex::escape(token.dummy_type());
        let arity = regex::escape(&token.arity_check());
        Ok(Self {
            too_few_arguments: Regex::new(&format!(
                r"^error: too few arguments to function '[^']*\b{func}\("
            ))?,
            too_many_arguments: Regex::new(&format!(
                r"^error: too many arguments to function '[^']*\b{func}\("
            ))?,
            // カンマを含む展開はプローブ行の引数個数検査で落ちる
            arity_assertion: Regex::new(&format!(r"^error: static assertion failed: {arity}\b"))?,
            undeclared: Regex::new(r"^error: '.+' was not declared in this scope")?,
            primary_expression: Regex::new(r"^error: expected primary-expression before '.+'")?,
            syntax: Regex::new(r"^error: expected .+")?,
            bind_rvalue: Regex::new(&format!(
                r"^error: cannot bind non-const lvalue reference of type '{id}&' to an rvalue of type '(.+)'$"
            ))?,
            initialization: Regex::new(&format!(
                r"^error: invalid initialization of (?:non-const )?reference of type '{id}&' from (?:an rvalue|expression) of type '(.+)'$"
            ))?,
            error_limit: Regex::new(r"compilation terminated due to -fmax-errors=\d+")?,
            string_concat: Regex::new(r"error: unsupported non-standard concatenation of string literals")?,
        })
    }
}

impl DiagnosticClassifier for GnuClassifier {
    fn banner_lines(&self) -> usize {
        0
    }

    fn location_pattern(&self, unit_file_name: &str) -> ProbeResult<Regex> {
        Ok(Regex::new(&format!(
            r"^(?:.*/)?{}:(\d+):(?:\d+:)? (.+)$",
            regex::escape(unit_file_name)
        ))?)
    }

    fn classify(&self, message: &str) -> Option<DiagnosticKind> {
        let rejections = [
            (&self.too_few_arguments, DiagnosticKind::ArgumentCountZero),
            (&self.too_many_arguments, DiagnosticKind::ArgumentCount),
            (&self.arity_assertion, DiagnosticKind::ArgumentCount),
            (&self.undeclared, DiagnosticKind::UndeclaredIdentifier),
            (&self.primary_expression, DiagnosticKind::TypeAsExpression),
            (&self.syntax, DiagnosticKind::SyntaxError),
        ];
        for (pattern, kind) in rejections {
            if pattern.is_match(message) {
                return Some(kind);
            }
        }
        [&self.bind_rvalue, &self.initialization]
            .into_iter()
            .find_map(|pattern| pattern.captures(message))
            .and_then(|caps| caps.get(1))
            .map(|ty| DiagnosticKind::Conversion(ty.as_str().to_string()))
    }

    fn classify_bail(&self, line: &str) -> Option<DiagnosticKind> {
        if self.error_limit.is_match(line) {
            Some(DiagnosticKind::ErrorLimit)
        } else if self.string_concat.is_match(line) {
            Some(DiagnosticKind::MismatchedConcatenation)
        } else {
            None
        }
    }
}
