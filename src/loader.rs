// パス: src/loader.rs
// 役割: 値取得用の共有モジュールを読み込み、アクセサを宣言した戻り値型で呼び出す
// 意図: 動的ロードの unsafe を一箇所へ閉じ込め、解放を明示的・決定的に行う
// 関連ファイル: src/marshal.rs, src/probe/value_probe.rs

use std::ffi::CStr;
use std::os::raw::{c_char, c_double, c_float, c_int, c_long, c_longlong, c_uint, c_ulong, c_ulonglong};
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::errors::{ProbeError, ProbeResult};
use crate::marshal::{RawValue, ReturnKind};

#[cfg(windows)]
type WChar = u16;
#[cfg(not(windows))]
type WChar = u32;

/// 共有モジュールを読み込む側。
pub trait ModuleHost {
    fn load(&self, path: &Path) -> ProbeResult<Box<dyn LoadedModule>>;
}

/// 読み込み済みモジュール。使い終わったら `unload` で明示的に解放する。
pub trait LoadedModule {
    /// 引数なしのエクスポート関数を `kind` の戻り値型として呼び出す。
    fn call(&self, export: &str, kind: ReturnKind) -> ProbeResult<RawValue>;

    /// 整数として受け取った値をナロー文字列ポインタとして読み直す。
    ///
    /// # Safety
    /// `address` はこのモジュール内の NUL 終端文字列を指していなければならない。
    unsafe fn read_c_string(&self, address: usize) -> Vec<u8>;

    fn unload(self: Box<Self>) -> ProbeResult<()>;
}

/// `libloading` による実装。
#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryHost;

impl ModuleHost for LibraryHost {
    fn load(&self, path: &Path) -> ProbeResult<Box<dyn LoadedModule>> {
        // SAFETY: 直前に自分で生成したモジュールで、初期化子はヘッダ由来の静的初期化のみ
        let library = unsafe { Library::new(path) }
            .map_err(|err| ProbeError::load(path, err.to_string()))?;
        tracing::debug!(path = %path.display(), "probe module loaded");
        Ok(Box::new(LoadedLibrary {
            library,
            path: path.to_path_buf(),
        }))
    }
}

struct LoadedLibrary {
    library: Library,
    path: PathBuf,
}

impl LoadedLibrary {
    /// # Safety
    /// エクスポートが `extern "C" fn() -> T` として定義されていること。
    unsafe fn invoke<T>(&self, export: &str) -> ProbeResult<T> {
        let func: libloading::Symbol<unsafe extern "C" fn() -> T> = self
            .library
            .get(export.as_bytes())
            .map_err(|err| ProbeError::load(&self.path, format!("{export}: {err}")))?;
        Ok(func())
    }
}

impl LoadedModule for LoadedLibrary {
    fn call(&self, export: &str, kind: ReturnKind) -> ProbeResult<RawValue> {
        // SAFETY: アクセサは `kind` の元になった型をそのまま戻り値型として宣言して生成している
        unsafe {
            Ok(match kind {
                ReturnKind::Int => RawValue::Int(self.invoke::<c_int>(export)?.into()),
                ReturnKind::UInt => RawValue::UInt(self.invoke::<c_uint>(export)?.into()),
                ReturnKind::Long => RawValue::Int(self.invoke::<c_long>(export)? as i64),
                ReturnKind::ULong | ReturnKind::LegacyHandle => {
                    RawValue::UInt(self.invoke::<c_ulong>(export)? as u64)
                }
                ReturnKind::LongLong => RawValue::Int(self.invoke::<c_longlong>(export)?),
                ReturnKind::ULongLong => RawValue::UInt(self.invoke::<c_ulonglong>(export)?),
                ReturnKind::Double => RawValue::Double(self.invoke::<c_double>(export)?),
                ReturnKind::Float => RawValue::Double(self.invoke::<c_float>(export)?.into()),
                ReturnKind::Bool => RawValue::Bool(self.invoke::<bool>(export)?),
                ReturnKind::Char => RawValue::Int(self.invoke::<c_char>(export)?.into()),
                ReturnKind::CString => {
                    let ptr = self.invoke::<*const c_char>(export)?;
                    RawValue::Str((!ptr.is_null()).then(|| CStr::from_ptr(ptr).to_bytes().to_vec()))
                }
                ReturnKind::WideString => {
                    let ptr = self.invoke::<*const WChar>(export)?;
                    RawValue::WideStr((!ptr.is_null()).then(|| read_wide(ptr)))
                }
            })
        }
    }

    unsafe fn read_c_string(&self, address: usize) -> Vec<u8> {
        CStr::from_ptr(address as *const c_char).to_bytes().to_vec()
    }

    fn unload(self: Box<Self>) -> ProbeResult<()> {
        let LoadedLibrary { library, path } = *self;
        library
            .close()
            .map_err(|err| ProbeError::load(&path, err.to_string()))?;
        tracing::debug!(path = %path.display(), "probe module unloaded");
        Ok(())
    }
}

/// NUL 終端のワイド文字列を読む。
unsafe fn read_wide(ptr: *const WChar) -> String {
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    let units = std::slice::from_raw_parts(ptr, len);
    #[cfg(windows)]
    {
        String::from_utf16_lossy(units)
    }
    #[cfg(not(windows))]
    {
        units
            .iter()
            .map(|&unit| char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}
