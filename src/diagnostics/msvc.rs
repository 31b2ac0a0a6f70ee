// パス: src/diagnostics/msvc.rs
// 役割: MSVC (cl.exe) の診断文言を DiagnosticKind へ分類する
// 意図: 型推論の基準となるコンパイラの文言契約を一箇所に集約する
// 関連ファイル: src/diagnostics/mod.rs, src/token.rs, src/toolchain/command.rs

use regex::Regex;

use super::{DiagnosticClassifier, DiagnosticKind};
use crate::errors::ProbeResult;
use crate::token::Token;

/// cl.exe の診断分類器。パターンはプローブ関数名とダミー型名を埋め込んで構築する。
#[derive(Debug)]
pub struct MsvcClassifier {
    argument_count_zero: Regex,
    argument_count: Regex,
    undeclared: Regex,
    type_as_expression: Regex,
    syntax: Regex,
    intrinsic: Regex,
    empty_conversion: Regex,
    conversion: Regex,
    error_limit: Regex,
    mismatched_strings: Regex,
}

impl MsvcClassifier {
    pub fn new(token: &Token) -> ProbeResult<Self> {
        let func = regex::escape(&token.probe_function());
        let id = regex::escape(token.dummy_type());
        Ok(Self {
            argument_count_zero: compile(&format!(
                r"^error C2660: '{func}' : function does not take 0 arguments"
            ))?,
            argument_count: compile(&format!(
                r"^error C2660: '{func}' : function does not take \d+ arguments"
            ))?,
            undeclared: compile(r"^error C2065: '.+' : undeclared identifier")?,
            type_as_expression: compile(r"^error C2275: '.+' : illegal use of this type as an expression")?,
            syntax: compile(r"^error C\d+: syntax error : .+")?,
            intrinsic: compile(r"^error C\d+: '.+' : bad context for intrinsic function")?,
            empty_conversion: compile(&format!(
                r"^error C2664: '{func}' : cannot convert parameter 1 from '' to '{id} &'"
            ))?,
            conversion: compile(&format!(
                r"^error C2664: '{func}' : cannot convert parameter 1 from '(.+)' to '{id} &'"
            ))?,
            error_limit: compile(r"fatal error C1003: error count exceeds \d+; stopping compilation")?,
            mismatched_strings: compile(r".+ error C2308: concatenating mismatched strings")?,
        })
    }
}

fn compile(pattern: &str) -> ProbeResult<Regex> {
    Ok(Regex::new(pattern)?)
}

impl DiagnosticClassifier for MsvcClassifier {
    fn banner_lines(&self) -> usize {
        1
    }

    fn location_pattern(&self, unit_file_name: &str) -> ProbeResult<Regex> {
        // cl.exe は絶対パスを小文字化して出すことがあるため、ファイル名末尾のみ大小無視で照合する
        compile(&format!(
            r"(?i)^(?:.*[\\/])?{}\((\d+)\) ?: (.+)$",
            regex::escape(unit_file_name)
        ))
    }

    fn classify(&self, message: &str) -> Option<DiagnosticKind> {
        let rejections = [
            (&self.argument_count_zero, DiagnosticKind::ArgumentCountZero),
            (&self.undeclared, DiagnosticKind::UndeclaredIdentifier),
            (&self.type_as_expression, DiagnosticKind::TypeAsExpression),
            (&self.syntax, DiagnosticKind::SyntaxError),
            (&self.argument_count, DiagnosticKind::ArgumentCount),
            (&self.intrinsic, DiagnosticKind::IntrinsicContext),
            (&self.empty_conversion, DiagnosticKind::EmptyConversion),
        ];
        for (pattern, kind) in rejections {
            if pattern.is_match(message) {
                return Some(kind);
            }
        }
        self.conversion
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|ty| DiagnosticKind::Conversion(ty.as_str().to_string()))
    }

    fn classify_bail(&self, line: &str) -> Option<DiagnosticKind> {
        if self.error_limit.is_match(line) {
            Some(DiagnosticKind::ErrorLimit)
        } else if self.mismatched_strings.is_match(line) {
            Some(DiagnosticKind::MismatchedConcatenation)
        } else {
            None
        }
    }
}
