// パス: src/infer.rs
// 役割: 候補シンボルをバッチに分けて型推論し、診断数超過時は 1 シンボルずつ再試行する
// 意図: 診断の多いシンボル 1 つがバッチ全体の推論を妨げないようにしつつ、元の順序を保つ
// 関連ファイル: src/probe/type_probe.rs, src/diagnostics/mod.rs, src/engine.rs

use std::slice;

use crate::errors::{ProbeError, ProbeResult};
use crate::probe::{Probe, TypeProbe};
use crate::symbols::{CandidateSet, Symbol, TypeResult};

/// 既定のバッチサイズ。診断上限 100 に対し、複数診断を出すシンボルの余裕を残す。
pub const DEFAULT_BATCH_SIZE: usize = 80;

/// バッチ分割と再試行を受け持つ型推論器。
pub struct TypeInference<'a> {
    probe: TypeProbe<'a>,
    batch_size: usize,
}

impl<'a> TypeInference<'a> {
    pub fn new(probe: TypeProbe<'a>, batch_size: usize) -> Self {
        Self {
            probe,
            batch_size: batch_size.max(1),
        }
    }

    pub fn probe(&self) -> &TypeProbe<'a> {
        &self.probe
    }

    /// 全候補の型を推論する。未知の診断パターンに出会った時点で中断する。
    pub fn infer(&self, candidates: &CandidateSet) -> ProbeResult<Vec<(Symbol, TypeResult)>> {
        let mut total = Vec::with_capacity(candidates.len());
        for (index, batch) in candidates.batches(self.batch_size).enumerate() {
            let results = self.infer_batch(batch)?;
            ensure_recognized(&results)?;
            tracing::debug!(
                batch = index,
                symbols = batch.len(),
                resolved = results
                    .iter()
                    .filter(|(_, result)| matches!(result, TypeResult::Resolved(_)))
                    .count(),
                "batch inferred"
            );
            total.extend(results);
        }
        Ok(total)
    }

    /// 1 バッチを推論する。診断数超過なら 1 シンボルずつに切り替える。
    pub fn infer_batch(&self, batch: &[Symbol]) -> ProbeResult<Vec<(Symbol, TypeResult)>> {
        match self.probe.run(batch) {
            Err(ProbeError::Overflow) if batch.len() > 1 => {
                tracing::warn!(
                    symbols = batch.len(),
                    "diagnostic limit exceeded; retrying one symbol per compilation"
                );
                self.infer_one_by_one(batch)
            }
            Err(ProbeError::Overflow) => Err(overflow_for(batch)),
            other => other,
        }
    }

    fn infer_one_by_one(&self, batch: &[Symbol]) -> ProbeResult<Vec<(Symbol, TypeResult)>> {
        let mut results = Vec::with_capacity(batch.len());
        for symbol in batch {
            match self.probe.run(slice::from_ref(symbol)) {
                Ok(single) => results.extend(single),
                Err(ProbeError::Overflow) => return Err(overflow_for(slice::from_ref(symbol))),
                Err(err) => return Err(err),
            }
        }
        Ok(results)
    }
}

fn overflow_for(batch: &[Symbol]) -> ProbeError {
    ProbeError::SymbolOverflow {
        symbol: batch
            .first()
            .map(|symbol| symbol.name().to_string())
            .unwrap_or_default(),
    }
}

/// 未知の診断グループがあれば、そのグループ本文とバッチ内の位置を保持したエラーにする。
fn ensure_recognized(results: &[(Symbol, TypeResult)]) -> ProbeResult<()> {
    for (index, (symbol, result)) in results.iter().enumerate() {
        match result {
            TypeResult::Unrecognized(messages) => {
                return Err(ProbeError::Unrecognized {
                    symbol: symbol.name().to_string(),
                    position: index as u32 + 1,
                    diagnostics: messages.clone(),
                });
            }
            TypeResult::Rejected(kind) => {
                tracing::debug!(symbol = %symbol, ?kind, "symbol rejected");
            }
            TypeResult::Resolved(_) => {}
        }
    }
    Ok(())
}
