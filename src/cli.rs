// パス: src/cli.rs
// 役割: コマンドライン引数を解釈し、ヘッダごとに推論を実行して結果を書き出す
// 意図: ヘッダ単位の致命的エラーは報告して次へ進み、未知の診断は本文を出して全体を止める
// 関連ファイル: src/bin/defprobe.rs, src/engine.rs, src/config.rs

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigOverrides, ProbeConfig};
use crate::engine::{self, HeaderReport, Session};
use crate::errors::{ProbeError, ProbeResult};
use crate::loader::LibraryHost;
use crate::output;
use crate::prescan;
use crate::symbols::CandidateSet;
use crate::toolchain::{CommandToolchain, ToolchainFlavor};

#[derive(Parser, Debug)]
#[command(
    name = "defprobe",
    about = "Infer the types and values of #define symbols by asking the C compiler",
    version
)]
pub struct Cli {
    /// Header to probe (repeatable)
    #[arg(long = "header", value_name = "HEADER", required = true, action = clap::ArgAction::Append)]
    headers: Vec<String>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Toolchain flavor: 'msvc' (or 'cl'), 'gnu' (or 'gcc', 'g++')
    #[arg(long, value_name = "FLAVOR", value_parser = parse_flavor)]
    toolchain: Option<ToolchainFlavor>,

    /// Additional include directory (repeatable)
    #[arg(short = 'I', value_name = "DIR", action = clap::ArgAction::Append)]
    include_dirs: Vec<PathBuf>,

    /// Preprocessor definition passed to the compiler (repeatable)
    #[arg(short = 'D', value_name = "NAME[=VALUE]", action = clap::ArgAction::Append)]
    defines: Vec<String>,

    /// Symbols per compilation
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Keep generated files in this directory instead of a temporary one
    #[arg(long, value_name = "DIR")]
    workdir: Option<PathBuf>,

    /// Candidate symbol list (one name per line) instead of scanning the header
    #[arg(long, value_name = "FILE")]
    symbols: Option<PathBuf>,

    /// Output file, or a directory receiving one listing per header
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Write a JSON report of all probed headers
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn parse_flavor(text: &str) -> Result<ToolchainFlavor, String> {
    ToolchainFlavor::parse(text).ok_or_else(|| format!("unknown toolchain flavor: {text}"))
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            toolchain: self.toolchain,
            include_dirs: self.include_dirs.clone(),
            defines: self.defines.clone(),
            batch_size: self.batch_size,
            workdir: self.workdir.clone(),
            ..ConfigOverrides::default()
        }
    }

    /// 設定ファイル・既定値・コマンドライン指定を重ねた設定。
    pub fn resolve_config(&self) -> ProbeResult<ProbeConfig> {
        let mut config = match &self.config {
            Some(path) => ProbeConfig::from_path(path)?,
            None => ProbeConfig::for_host(),
        };
        config.apply_overrides(&self.overrides());
        config.validate()?;
        Ok(config)
    }
}

/// ログ出力を初期化する。`RUST_LOG` があればそれに従い、無ければ `--verbose` で debug。
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "defprobe=debug" } else { "defprobe=info" })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// 一覧の書き出し先。
enum ListingSink {
    Stdout,
    File(BufWriter<File>),
    Directory(PathBuf),
}

impl ListingSink {
    fn open(path: Option<&Path>) -> ProbeResult<Self> {
        Ok(match path {
            None => Self::Stdout,
            Some(dir) if dir.is_dir() => Self::Directory(dir.to_path_buf()),
            Some(file) => Self::File(BufWriter::new(File::create(file)?)),
        })
    }

    fn write(&mut self, header: &str, listing: &[u8]) -> ProbeResult<()> {
        match self {
            Self::Stdout => io::stdout().lock().write_all(listing)?,
            Self::File(out) => out.write_all(listing)?,
            Self::Directory(dir) => {
                let path = dir.join(output::listing_file_name(header));
                fs::write(&path, listing)?;
                tracing::info!(path = %path.display(), "listing written");
            }
        }
        Ok(())
    }

    fn finish(self) -> ProbeResult<()> {
        if let Self::File(mut out) = self {
            out.flush()?;
        }
        Ok(())
    }
}

fn report_error(err: &ProbeError) {
    eprintln!("[{}] {}", err.code(), err);
    if let ProbeError::Unrecognized { diagnostics, .. } = err {
        for line in diagnostics {
            eprintln!("    {line}");
        }
    }
}

/// 解析済みの引数で実行する。
pub fn run(cli: Cli) -> ProbeResult<ExitCode> {
    init_tracing(cli.verbose);
    let config = cli.resolve_config()?;
    let toolchain = CommandToolchain::from_config(&config);
    let host = LibraryHost;
    let session = Session::new(&config, &toolchain, &host)?;

    let fixed: Option<CandidateSet> = match &cli.symbols {
        Some(path) => Some(prescan::read_symbol_list(&fs::read_to_string(path)?)),
        None => None,
    };

    let mut sink = ListingSink::open(cli.output.as_deref())?;
    let mut reports: Vec<HeaderReport> = Vec::new();
    let mut skipped = 0usize;
    for header in &cli.headers {
        let mut listing: Vec<u8> = Vec::new();
        match engine::generate_module(&session, header, fixed.as_ref(), &mut listing) {
            Ok(report) => {
                sink.write(header, &listing)?;
                reports.push(report);
            }
            Err(err) if err.is_header_fatal() => {
                report_error(&err);
                skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }
    sink.finish()?;

    if let Some(path) = &cli.report {
        let mut out = BufWriter::new(File::create(path)?);
        output::write_report(&mut out, &reports)?;
        out.flush()?;
    }
    if skipped > 0 {
        tracing::warn!(skipped, probed = reports.len(), "some headers were skipped");
    }
    Ok(ExitCode::SUCCESS)
}

/// バイナリのエントリポイント。
pub fn run_cli() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}
