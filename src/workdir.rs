// パス: src/workdir.rs
// 役割: ツールチェーン境界に渡す生成ファイルを置く作業ディレクトリを管理する
// 意図: ファイルシステムは外部ツールのための出口に限定し、段階間の受け渡しはメモリ上の値で行う
// 関連ファイル: src/probe/type_probe.rs, src/probe/value_probe.rs, src/toolchain/command.rs

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::errors::ProbeResult;

/// 作業ディレクトリ。指定が無ければ一時ディレクトリを作り、破棄時に削除する。
#[derive(Debug)]
pub struct WorkDir {
    root: PathBuf,
    _temp: Option<TempDir>,
}

impl WorkDir {
    pub fn at(root: impl Into<PathBuf>) -> ProbeResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let root = root.canonicalize()?;
        Ok(Self { root, _temp: None })
    }

    pub fn temporary() -> ProbeResult<Self> {
        let temp = tempfile::Builder::new().prefix("defprobe").tempdir()?;
        Ok(Self {
            root: temp.path().to_path_buf(),
            _temp: Some(temp),
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// ファイルを書き出す（既存なら上書き）。
    pub fn write(&self, name: &str, contents: &str) -> ProbeResult<PathBuf> {
        let path = self.root.join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }
}
