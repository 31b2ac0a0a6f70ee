// パス: src/probe/value_probe.rs
// 役割: 型の確定したシンボルごとにアクセサ関数を持つ共有モジュールをビルド・ロードし、実行時の値を取り出す
// 意図: 推論した型を戻り値型として宣言したアクセサを呼び、型と値の組を得る
// 関連ファイル: src/loader.rs, src/marshal.rs, src/probe/mod.rs

use std::path::PathBuf;

use super::{Probe, ProbeContext};
use crate::errors::{ProbeError, ProbeResult};
use crate::loader::{LoadedModule, ModuleHost};
use crate::marshal::{self, RawValue, ReturnKind};
use crate::symbols::{TypedSymbol, ValueRecord};
use crate::toolchain::CompileStage;

pub const ACCESSOR_UNIT: &str = "accessor_unit.cpp";
pub const ACCESSOR_FRAGMENT: &str = "accessors.inc";
pub const MODULE_STEM: &str = "probe_values";

/// 旧来の別名を実ポインタとみなす下限（これ以下は小さな整数として扱う）。
pub const DEFAULT_STRING_POINTER_THRESHOLD: u64 = 0xffff;

/// 1 シンボル分のアクセサ。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Accessor {
    pub typed: TypedSymbol,
    pub export: String,
    pub kind: ReturnKind,
}

/// 値取得用の生成物。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessorUnit {
    pub source: String,
    pub fragment: String,
    pub accessors: Vec<Accessor>,
}

/// 値取得プローブ。
pub struct ValueProbe<'a> {
    ctx: ProbeContext<'a>,
    host: &'a dyn ModuleHost,
    string_pointer_threshold: u64,
}

impl<'a> ValueProbe<'a> {
    pub fn new(ctx: ProbeContext<'a>, host: &'a dyn ModuleHost) -> Self {
        Self {
            ctx,
            host,
            string_pointer_threshold: DEFAULT_STRING_POINTER_THRESHOLD,
        }
    }

    pub fn with_string_pointer_threshold(mut self, threshold: u64) -> Self {
        self.string_pointer_threshold = threshold;
        self
    }

    /// ソースを書き出し、コンパイルとリンクを行う。失敗は `LinkFailure`。
    fn build_module(&self, unit: &AccessorUnit) -> ProbeResult<PathBuf> {
        let workdir = self.ctx.workdir;
        let toolchain = self.ctx.toolchain;
        let source = workdir.write(ACCESSOR_UNIT, &unit.source)?;
        workdir.write(ACCESSOR_FRAGMENT, &unit.fragment)?;

        let compiled = toolchain.compile(
            workdir.path(),
            std::slice::from_ref(&source),
            CompileStage::SharedObject,
        )?;
        if !compiled.success {
            return Err(ProbeError::LinkFailure {
                diagnostics: compiled.text,
            });
        }
        let module = toolchain.module_path(workdir.path(), MODULE_STEM);
        let linked = toolchain.link(workdir.path(), &[toolchain.object_path(&source)], &module)?;
        if !linked.success {
            return Err(ProbeError::LinkFailure {
                diagnostics: linked.text,
            });
        }
        Ok(module)
    }

    fn call_accessor(
        &self,
        module: &dyn LoadedModule,
        accessor: &Accessor,
    ) -> ProbeResult<RawValue> {
        let value = module.call(&accessor.export, accessor.kind)?;
        match (accessor.kind, value) {
            (ReturnKind::LegacyHandle, RawValue::UInt(raw))
                if raw > self.string_pointer_threshold =>
            {
                // SAFETY: 閾値を超える値を文字列ポインタとみなす経験則。小さな整数をキャストした
                // 定義と実ポインタを区別するためのもので、すべての値で正しいとは限らない
                let text = unsafe { module.read_c_string(raw as usize) };
                Ok(RawValue::Pointee(text))
            }
            (_, value) => Ok(value),
        }
    }
}

impl<'a> Probe for ValueProbe<'a> {
    type Input = [TypedSymbol];
    type Artifact = AccessorUnit;
    /// `None` はモジュールのビルドを諦めたことを表す。
    type Raw = Option<Vec<(Accessor, RawValue)>>;
    type Output = Vec<ValueRecord>;

    fn emit(&self, typed: &[TypedSymbol]) -> AccessorUnit {
        let decoration = self.ctx.toolchain.export_decoration();
        let accessors: Vec<Accessor> = typed
            .iter()
            .map(|typed| Accessor {
                export: self.ctx.token.accessor(typed.symbol.name()),
                kind: marshal::return_kind(&typed.c_type),
                typed: typed.clone(),
            })
            .collect();
        let fragment = accessors
            .iter()
            .map(|acc| {
                format!(
                    "{decoration} {} {}(void) {{ return {}; }}\n",
                    acc.typed.c_type, acc.export, acc.typed.symbol
                )
            })
            .collect::<String>();
        let source = format!(
            "{includes}extern \"C\"\n{{\n#include \"{ACCESSOR_FRAGMENT}\"\n}}\n",
            includes = self.ctx.include_block(),
        );
        AccessorUnit {
            source,
            fragment,
            accessors,
        }
    }

    fn execute(&self, unit: &AccessorUnit) -> ProbeResult<Self::Raw> {
        if unit.accessors.is_empty() {
            return Ok(Some(Vec::new()));
        }
        let module_path = match self.build_module(unit) {
            Ok(path) => path,
            Err(ProbeError::LinkFailure { diagnostics }) => {
                tracing::warn!(
                    header = self.ctx.header,
                    accessors = unit.accessors.len(),
                    "unable to build accessor module; no values produced"
                );
                tracing::debug!(%diagnostics, "accessor build output");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let module = self.host.load(&module_path)?;
        let values: ProbeResult<Vec<(Accessor, RawValue)>> = unit
            .accessors
            .iter()
            .map(|acc| Ok((acc.clone(), self.call_accessor(module.as_ref(), acc)?)))
            .collect();
        // 呼び出しの成否にかかわらずここで解放する
        let unloaded = module.unload();
        let values = values?;
        unloaded?;
        Ok(Some(values))
    }

    fn interpret(&self, _typed: &[TypedSymbol], raw: Self::Raw) -> ProbeResult<Vec<ValueRecord>> {
        let Some(values) = raw else {
            return Ok(Vec::new());
        };
        Ok(values
            .into_iter()
            .map(|(acc, value)| ValueRecord {
                symbol: acc.typed.symbol,
                c_type: acc.typed.c_type,
                value: marshal::render(&value),
            })
            .collect())
    }
}
