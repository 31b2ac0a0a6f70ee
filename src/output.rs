// パス: src/output.rs
// 役割: 値レコードを `name=value` 形式の一覧と JSON レポートに書き出す
// 関連ファイル: src/engine.rs, src/marshal.rs, src/cli.rs

use std::io::{self, Write};

use crate::engine::HeaderReport;
use crate::symbols::ValueRecord;

/// 候補順に `name=value` を 1 行ずつ書く。
pub fn write_listing<W: Write>(out: &mut W, records: &[ValueRecord]) -> io::Result<()> {
    for record in records {
        writeln!(out, "{}={}", record.symbol, record.value)?;
    }
    Ok(())
}

pub fn write_report<W: Write>(out: &mut W, reports: &[HeaderReport]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, reports).map_err(io::Error::from)?;
    writeln!(out)
}

/// 出力ファイル名。ヘッダ名のディレクトリ部と拡張子を落とし `.txt` を付ける。
pub fn listing_file_name(header: &str) -> String {
    let base = header.rsplit(['/', '\\']).next().unwrap_or(header);
    let stem = base.split('.').next().filter(|s| !s.is_empty()).unwrap_or(base);
    format!("{stem}.txt")
}
