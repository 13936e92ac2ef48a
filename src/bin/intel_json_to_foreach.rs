//! perfmon 事件 JSON → `foreach` 宏列表
//!
//! 从标准输入读取事件描述数组，把受支持的事件写成 `_(...)` 宏调用到标准输出。

use std::io;

use clap::Parser;
use perfctl_rs::perfmon::{self, PerfmonError};

#[derive(Debug, Parser)]
#[command(
    name = "intel_json_to_foreach",
    version,
    about = "Convert perfmon event JSON (stdin) into a C foreach macro list (stdout)"
)]
struct Args {}

fn main() -> Result<(), PerfmonError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let Args {} = Args::parse();

    perfmon::convert(io::stdin().lock(), io::stdout().lock())?;
    Ok(())
}
