// パス: src/engine.rs
// 役割: 1 ヘッダ分の推論（ベースライン確認 → 型推論 → 正規化 → 値取得）を組み立てる
// 意図: ツールチェーン・ローダ・トークン・作業ディレクトリを 1 回の実行で共有し、ヘッダごとに使い回す
// 関連ファイル: src/infer.rs, src/probe/mod.rs, src/prescan.rs, src/cli.rs
//! 推論パイプラインの組み立て。
//!
//! `Session` が実行全体で共有する資源（トークン・分類器・作業ディレクトリ）を持ち、
//! `HeaderProbe` が 1 ヘッダ分の処理を行う。各段の受け渡しはメモリ上の値で行う。

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::config::ProbeConfig;
use crate::diagnostics::{DiagnosticClassifier, DiagnosticKind};
use crate::errors::ProbeResult;
use crate::infer::TypeInference;
use crate::loader::ModuleHost;
use crate::normalize;
use crate::output;
use crate::prescan;
use crate::probe::{Probe, ProbeContext, TypeProbe, ValueProbe};
use crate::symbols::{CandidateSet, Symbol, TypeResult, TypedSymbol, ValueRecord};
use crate::token::Token;
use crate::toolchain::Toolchain;
use crate::workdir::WorkDir;

/// 1 ヘッダ分の結果。
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeaderReport {
    pub header: String,
    pub typed: Vec<TypedSymbol>,
    pub rejected: Vec<(Symbol, DiagnosticKind)>,
    pub values: Vec<ValueRecord>,
}

/// 実行全体で共有する資源。
pub struct Session<'a> {
    config: &'a ProbeConfig,
    toolchain: &'a dyn Toolchain,
    host: &'a dyn ModuleHost,
    token: Token,
    classifier: Box<dyn DiagnosticClassifier>,
    workdir: WorkDir,
}

impl<'a> Session<'a> {
    pub fn new(
        config: &'a ProbeConfig,
        toolchain: &'a dyn Toolchain,
        host: &'a dyn ModuleHost,
    ) -> ProbeResult<Self> {
        let token = config.token()?;
        let classifier = toolchain.flavor().classifier(&token)?;
        let workdir = match &config.workdir {
            Some(dir) => WorkDir::at(dir)?,
            None => WorkDir::temporary()?,
        };
        tracing::debug!(
            token = %token,
            workdir = %workdir.path().display(),
            flavor = ?toolchain.flavor(),
            "session ready"
        );
        Ok(Self {
            config,
            toolchain,
            host,
            token,
            classifier,
            workdir,
        })
    }

    pub fn config(&self) -> &ProbeConfig {
        self.config
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn workdir(&self) -> &WorkDir {
        &self.workdir
    }

    /// `header` は生成コードの `#include` にそのまま使われる。
    pub fn header<'s>(&'s self, header: &'s str) -> HeaderProbe<'s> {
        HeaderProbe {
            session: self,
            header,
        }
    }
}

/// 1 ヘッダ分の推論。
pub struct HeaderProbe<'s> {
    session: &'s Session<'s>,
    header: &'s str,
}

impl<'s> HeaderProbe<'s> {
    fn context(&self) -> ProbeContext<'s> {
        ProbeContext {
            toolchain: self.session.toolchain,
            workdir: &self.session.workdir,
            token: &self.session.token,
            header: self.header,
            prelude: &self.session.config.prelude,
        }
    }

    pub fn run(&self, candidates: &CandidateSet) -> ProbeResult<HeaderReport> {
        let ctx = self.context();
        let config = self.session.config;

        let type_probe = TypeProbe::new(ctx, self.session.classifier.as_ref());
        type_probe.check_baseline()?;

        let inference = TypeInference::new(type_probe, config.batch_size);
        let results = inference.infer(candidates)?;
        let rejected = results
            .iter()
            .filter_map(|(symbol, result)| match result {
                TypeResult::Rejected(kind) => Some((symbol.clone(), kind.clone())),
                _ => None,
            })
            .collect::<Vec<_>>();

        let typed = normalize::normalize_results(results);
        let values = ValueProbe::new(ctx, self.session.host)
            .with_string_pointer_threshold(config.string_pointer_threshold)
            .run(&typed)?;

        tracing::info!(
            header = self.header,
            candidates = candidates.len(),
            typed = typed.len(),
            rejected = rejected.len(),
            values = values.len(),
            "header probed"
        );
        Ok(HeaderReport {
            header: self.header.to_string(),
            typed,
            rejected,
            values,
        })
    }
}

/// ヘッダを探して候補を集め（`candidates` 指定時はそれを使う）、推論して一覧を書き出す。
pub fn generate_module<W: Write>(
    session: &Session<'_>,
    header: &str,
    candidates: Option<&CandidateSet>,
    listing: &mut W,
) -> ProbeResult<HeaderReport> {
    let config = session.config();
    let located = prescan::locate_header(header, &config.include_dirs, config.toolchain)?;
    let scanned;
    let candidates = match candidates {
        Some(set) => set,
        None => {
            scanned = prescan::scan_header(&located, &config.skip_prefixes)?;
            &scanned
        }
    };

    // インクルードパス経由でなく直接見つかったヘッダは絶対パスで読み込ませる
    let include = if Path::new(header).is_file() {
        let absolute = located.canonicalize().unwrap_or(located);
        strip_verbatim_prefix(&absolute.to_string_lossy())
    } else {
        header.to_string()
    };

    let report = session.header(&include).run(candidates).map_err(|err| {
        if err.is_header_fatal() {
            tracing::warn!(header, code = err.code(), "header skipped: {err}");
        }
        err
    })?;
    output::write_listing(listing, &report.values)?;
    Ok(HeaderReport {
        header: header.to_string(),
        ..report
    })
}

/// Windows の `canonicalize` が付ける `\\?\` 接頭辞を外す。cl.exe はこの形の `#include` を開けない。
fn strip_verbatim_prefix(path: &str) -> String {
    if let Some(share) = path.strip_prefix(r"\\?\UNC\") {
        format!(r"\\{share}")
    } else if let Some(rest) = path.strip_prefix(r"\\?\") {
        rest.to_string()
    } else {
        path.to_string()
    }
}
