// パス: src/prescan.rs
// 役割: インクルードパス上のヘッダを探し、`#define` 行から推論候補のシンボルを集める
// 意図: プリプロセッサを通さない粗い行単位の走査で候補を作り、選別はコンパイラに任せる
// 関連ファイル: src/symbols.rs, src/engine.rs, src/config.rs

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{ProbeError, ProbeResult};
use crate::symbols::CandidateSet;
use crate::toolchain::ToolchainFlavor;

/// 値を持つオブジェクト形式マクロ。関数形式 `NAME(` は名前の直後に空白が無いので一致しない。
static DEFINE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*#\s*define\s+([A-Za-z_][0-9A-Za-z_]*)\s+\S")
        .expect("define pattern must be valid")
});

/// ヘッダの実ファイルを探す。
///
/// 既存のパスならそのまま使い、そうでなければ `include_dirs` を順に探す。
/// MSVC 系統では環境変数 `INCLUDE` の各ディレクトリも候補にする。
pub fn locate_header(
    header: &str,
    include_dirs: &[PathBuf],
    flavor: ToolchainFlavor,
) -> ProbeResult<PathBuf> {
    let direct = Path::new(header);
    if direct.is_file() {
        return Ok(direct.to_path_buf());
    }
    let mut search: Vec<PathBuf> = include_dirs.to_vec();
    if flavor == ToolchainFlavor::Msvc {
        if let Some(include) = env::var_os("INCLUDE") {
            search.extend(
                include
                    .to_string_lossy()
                    .split(';')
                    .filter(|dir| !dir.trim().is_empty())
                    .map(|dir| PathBuf::from(dir.trim())),
            );
        }
    }
    search
        .iter()
        .map(|dir| dir.join(header))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            ProbeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("ヘッダ {header} がインクルードパス上に見つかりません"),
            ))
        })
}

/// ヘッダ本文から候補を集める。出現順を保ち、重複と除外接頭辞を落とす。
pub fn scan_defines(text: &str, skip_prefixes: &[String]) -> CandidateSet {
    text.lines()
        .filter_map(|line| DEFINE_LINE.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter(|name| !skip_prefixes.iter().any(|prefix| name.starts_with(prefix.as_str())))
        .collect()
}

pub fn scan_header(path: &Path, skip_prefixes: &[String]) -> ProbeResult<CandidateSet> {
    let bytes = fs::read(path)?;
    let candidates = scan_defines(&String::from_utf8_lossy(&bytes), skip_prefixes);
    tracing::debug!(header = %path.display(), candidates = candidates.len(), "pre-scan done");
    Ok(candidates)
}

/// 1 行 1 名の候補リスト。`#` 以降はコメント、空行は無視する。
pub fn read_symbol_list(text: &str) -> CandidateSet {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|name| !name.is_empty())
        .collect()
}
