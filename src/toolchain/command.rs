// パス: src/toolchain/command.rs
// 役割: cl.exe / g++ を外部プロセスとして起動し、診断テキストを取り込む
// 意図: 出力の取り込みを呼び出し単位に閉じ込め、どの経路でも後始末が済むようにする
// 関連ファイル: src/toolchain/mod.rs, src/config.rs, src/workdir.rs

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{CompileStage, ToolOutput, Toolchain, ToolchainFlavor};
use crate::config::ProbeConfig;
use crate::errors::{ProbeError, ProbeResult};

/// 取り込んだ診断テキストの保存先（作業ディレクトリ内で毎回上書き）。
pub const CAPTURE_FILE: &str = "diagnostics.txt";

/// 外部コマンドで実装したツールチェーン。
#[derive(Clone, Debug)]
pub struct CommandToolchain {
    flavor: ToolchainFlavor,
    compiler: PathBuf,
    linker: PathBuf,
    include_dirs: Vec<PathBuf>,
    defines: Vec<String>,
    diagnostic_ceiling: usize,
}

impl CommandToolchain {
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self {
            flavor: config.toolchain,
            compiler: config.compiler.clone(),
            linker: config.linker.clone(),
            include_dirs: config.include_dirs.clone(),
            defines: config.defines.clone(),
            diagnostic_ceiling: config.diagnostic_ceiling,
        }
    }

    fn preprocessor_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        for dir in &self.include_dirs {
            let mut arg = OsString::from(match self.flavor {
                ToolchainFlavor::Msvc => "/I",
                ToolchainFlavor::Gnu => "-I",
            });
            arg.push(dir.as_os_str());
            args.push(arg);
        }
        for define in &self.defines {
            args.push(OsString::from(match self.flavor {
                ToolchainFlavor::Msvc => format!("/D{define}"),
                ToolchainFlavor::Gnu => format!("-D{define}"),
            }));
        }
        args
    }

    fn compile_command(&self, sources: &[PathBuf], stage: CompileStage) -> Command {
        let mut cmd = Command::new(&self.compiler);
        match self.flavor {
            ToolchainFlavor::Msvc => {
                cmd.arg("/nologo").arg("/c").arg("/EHsc");
            }
            ToolchainFlavor::Gnu => {
                cmd.env("LC_ALL", "C")
                    .arg(format!("-fmax-errors={}", self.diagnostic_ceiling))
                    .arg("-ftrack-macro-expansion=0")
                    .arg("-fno-diagnostics-show-caret")
                    .arg("-fdiagnostics-color=never");
                match stage {
                    CompileStage::Diagnose => {
                        cmd.arg("-fsyntax-only");
                    }
                    CompileStage::SharedObject => {
                        cmd.arg("-c").arg("-fPIC");
                    }
                }
            }
        }
        cmd.args(self.preprocessor_args());
        for source in sources {
            cmd.arg(source);
            if stage == CompileStage::SharedObject {
                let object = self.object_path(source);
                match self.flavor {
                    ToolchainFlavor::Msvc => {
                        let mut arg = OsString::from("/Fo");
                        arg.push(object.as_os_str());
                        cmd.arg(arg);
                    }
                    ToolchainFlavor::Gnu => {
                        cmd.arg("-o").arg(object);
                    }
                }
            }
        }
        cmd
    }
}

impl Toolchain for CommandToolchain {
    fn flavor(&self) -> ToolchainFlavor {
        self.flavor
    }

    fn compile(
        &self,
        workdir: &Path,
        sources: &[PathBuf],
        stage: CompileStage,
    ) -> ProbeResult<ToolOutput> {
        let cmd = self.compile_command(sources, stage);
        run_captured(cmd, workdir)
    }

    fn link(
        &self,
        workdir: &Path,
        objects: &[PathBuf],
        module: &Path,
    ) -> ProbeResult<ToolOutput> {
        if module.exists() {
            fs::remove_file(module)?;
        }
        let mut cmd = Command::new(&self.linker);
        match self.flavor {
            ToolchainFlavor::Msvc => {
                let mut out = OsString::from("/OUT:");
                out.push(module.as_os_str());
                cmd.arg("/nologo").arg("/DLL").arg(out);
            }
            ToolchainFlavor::Gnu => {
                cmd.env("LC_ALL", "C").arg("-shared").arg("-o").arg(module);
            }
        }
        cmd.args(objects);
        run_captured(cmd, workdir)
    }

    fn object_path(&self, source: &Path) -> PathBuf {
        source.with_extension(match self.flavor {
            ToolchainFlavor::Msvc => "obj",
            ToolchainFlavor::Gnu => "o",
        })
    }

    fn module_path(&self, workdir: &Path, stem: &str) -> PathBuf {
        workdir.join(match self.flavor {
            ToolchainFlavor::Msvc => format!("{stem}.dll"),
            ToolchainFlavor::Gnu if cfg!(target_os = "macos") => format!("lib{stem}.dylib"),
            ToolchainFlavor::Gnu => format!("lib{stem}.so"),
        })
    }

    fn export_decoration(&self) -> &'static str {
        match self.flavor {
            ToolchainFlavor::Msvc => "__declspec(dllexport)",
            ToolchainFlavor::Gnu => "__attribute__((visibility(\"default\")))",
        }
    }
}

/// コマンドを作業ディレクトリで実行し、stdout と stderr を取り込む。
/// 取り込みはプロセス単位なので、呼び出し側の標準出力は一切差し替えない。
fn run_captured(mut cmd: Command, workdir: &Path) -> ProbeResult<ToolOutput> {
    let rendered = format!("{cmd:?}");
    tracing::debug!(command = %rendered, "invoking toolchain");
    let output = cmd.current_dir(workdir).output().map_err(|err| {
        ProbeError::command_failure(rendered.clone(), None, format!("failed to invoke: {err}"))
    })?;
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    fs::write(workdir.join(CAPTURE_FILE), &text)?;
    Ok(ToolOutput {
        success: output.status.success(),
        text,
    })
}
