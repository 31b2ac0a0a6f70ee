// パス: src/lib.rs
// 役割: Crate root wiring modules and exports
// 意図: Expose the probing pipeline and its replaceable boundaries
// 関連ファイル: src/engine.rs, src/errors.rs, src/cli.rs
//! defprobe ルートモジュール
//!
//! 目的:
//! - C ヘッダの `#define` シンボルについて、コンパイラ自身に型を報告させ、
//!   その型で宣言したアクセサを呼び出して値を得る。
//!
//! 方針:
//! - コメント/ドキュメントは日本語、識別子は英語。
//! - コンパイラ・リンカ・動的ローダは trait の境界越しに使い、テストでは偽実装に差し替える。
//! - 段階間の受け渡しはメモリ上の値で行い、ファイルは外部ツールへの出口に限る。

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod errors;
pub mod infer;
pub mod loader;
pub mod marshal;
pub mod normalize;
pub mod output;
pub mod prescan;
pub mod probe;
pub mod symbols;
pub mod token;
pub mod toolchain;
pub mod workdir;

pub use crate::config::ProbeConfig;
pub use crate::engine::{generate_module, HeaderProbe, HeaderReport, Session};
pub use crate::errors::*;
pub use crate::symbols::{CandidateSet, Symbol, TypeResult, TypedSymbol, ValueRecord};
