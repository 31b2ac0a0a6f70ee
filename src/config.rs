// パス: src/config.rs
// 役割: TOML 設定ファイルとコマンドライン上書きから推論パイプラインの設定を組み立てる
// 意図: ツールチェーン・前提ヘッダ・バッチ上限などの外部条件を一箇所で検証する
// 関連ファイル: src/cli.rs, src/engine.rs, src/toolchain/command.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{ProbeError, ProbeResult};
use crate::infer::DEFAULT_BATCH_SIZE;
use crate::probe::value_probe::DEFAULT_STRING_POINTER_THRESHOLD;
use crate::token::{is_c_identifier, Token};
use crate::toolchain::ToolchainFlavor;

/// 推論パイプライン全体の設定。
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeConfig {
    pub toolchain: ToolchainFlavor,
    pub compiler: PathBuf,
    pub linker: PathBuf,
    /// 対象ヘッダより前に `#include` する前提ヘッダ。
    pub prelude: Vec<String>,
    pub include_dirs: Vec<PathBuf>,
    pub defines: Vec<String>,
    pub batch_size: usize,
    /// コンパイラが打ち切る診断数。
    pub diagnostic_ceiling: usize,
    pub string_pointer_threshold: u64,
    /// プリスキャンで無視する名前の接頭辞。
    pub skip_prefixes: Vec<String>,
    pub workdir: Option<PathBuf>,
    /// 固定の名前空間トークン（再現可能な生成物が欲しいとき）。
    pub token: Option<String>,
}

impl ProbeConfig {
    /// 指定した系統の既定値。
    pub fn for_flavor(flavor: ToolchainFlavor) -> Self {
        let (compiler, linker, prelude): (&str, &str, &[&str]) = match flavor {
            ToolchainFlavor::Msvc => ("cl.exe", "link.exe", &["windows.h", "tchar.h"]),
            ToolchainFlavor::Gnu => ("g++", "g++", &[]),
        };
        Self {
            toolchain: flavor,
            compiler: compiler.into(),
            linker: linker.into(),
            prelude: prelude.iter().map(|h| h.to_string()).collect(),
            include_dirs: Vec::new(),
            defines: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            diagnostic_ceiling: 100,
            string_pointer_threshold: DEFAULT_STRING_POINTER_THRESHOLD,
            skip_prefixes: vec!["IID_".into(), "__".into()],
            workdir: None,
            token: None,
        }
    }

    /// ホストのターゲットに合わせた既定値。
    pub fn for_host() -> Self {
        Self::for_flavor(ToolchainFlavor::for_host())
    }

    pub fn from_path(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            ProbeError::Config(format!("{} を読み込めません: {err}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    /// TOML テキストから読み込む。省略した項目は `toolchain` の系統の既定値になる。
    pub fn from_toml(text: &str) -> ProbeResult<Self> {
        let file: ConfigFile = toml::from_str(text)?;
        let mut config = Self::for_flavor(file.toolchain.unwrap_or_else(ToolchainFlavor::for_host));
        file.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ProbeResult<()> {
        if self.compiler.as_os_str().is_empty() {
            return Err(ProbeError::Config("compiler が空です".into()));
        }
        if self.batch_size == 0 {
            return Err(ProbeError::Config("batch_size は 1 以上が必要です".into()));
        }
        if self.batch_size >= self.diagnostic_ceiling {
            return Err(ProbeError::Config(format!(
                "batch_size ({}) は diagnostic_ceiling ({}) より小さくしてください",
                self.batch_size, self.diagnostic_ceiling
            )));
        }
        if let Some(token) = &self.token {
            if !is_c_identifier(token) {
                return Err(ProbeError::Config(format!(
                    "token `{token}` は C の識別子ではありません"
                )));
            }
        }
        Ok(())
    }

    /// 実行用トークン。固定指定が無ければ新しく生成する。
    pub fn token(&self) -> ProbeResult<Token> {
        match &self.token {
            Some(text) => Token::fixed(text),
            None => Ok(Token::generate()),
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(flavor) = overrides.toolchain {
            if flavor != self.toolchain {
                let defaults = Self::for_flavor(flavor);
                self.toolchain = flavor;
                self.compiler = defaults.compiler;
                self.linker = defaults.linker;
                self.prelude = defaults.prelude;
            }
        }
        self.include_dirs.extend(overrides.include_dirs.iter().cloned());
        self.defines.extend(overrides.defines.iter().cloned());
        if let Some(compiler) = &overrides.compiler {
            self.compiler = compiler.clone();
        }
        if let Some(linker) = &overrides.linker {
            self.linker = linker.clone();
        }
        if let Some(size) = overrides.batch_size {
            self.batch_size = size;
        }
        if let Some(dir) = &overrides.workdir {
            self.workdir = Some(dir.clone());
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self::for_host()
    }
}

/// 設定ファイルの内容。書かれた項目だけが既定値を上書きする。
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    toolchain: Option<ToolchainFlavor>,
    compiler: Option<PathBuf>,
    linker: Option<PathBuf>,
    prelude: Option<Vec<String>>,
    include_dirs: Option<Vec<PathBuf>>,
    defines: Option<Vec<String>>,
    batch_size: Option<usize>,
    diagnostic_ceiling: Option<usize>,
    string_pointer_threshold: Option<u64>,
    skip_prefixes: Option<Vec<String>>,
    workdir: Option<PathBuf>,
    token: Option<String>,
}

impl ConfigFile {
    fn apply_to(self, config: &mut ProbeConfig) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    config.$field = value;
                })*
            };
        }
        take!(
            compiler,
            linker,
            prelude,
            include_dirs,
            defines,
            batch_size,
            diagnostic_ceiling,
            string_pointer_threshold,
            skip_prefixes,
        );
        if self.workdir.is_some() {
            config.workdir = self.workdir;
        }
        if self.token.is_some() {
            config.token = self.token;
        }
    }
}

/// コマンドラインからの上書き値。
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub toolchain: Option<ToolchainFlavor>,
    pub compiler: Option<PathBuf>,
    pub linker: Option<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
    pub defines: Vec<String>,
    pub batch_size: Option<usize>,
    pub workdir: Option<PathBuf>,
}
