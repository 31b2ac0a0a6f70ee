// パス: src/bin/defprobe.rs
// 役割: Binary entrypoint that runs the header probing CLI
// 意図: Offer a command-line tool that lists #define values inferred by the compiler
// 関連ファイル: src/cli.rs, src/lib.rs, src/engine.rs
fn main() -> std::process::ExitCode {
    defprobe::cli::run_cli()
}
