//! HAR2MP4 命令行入口：解析参数、初始化日志、加载配置后交给 `ui::noui`。

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::Parser;

use har2mp4::base_system::config::load_or_create_with_base;
use har2mp4::base_system::context::Config;
use har2mp4::base_system::logging::{LogOptions, LogSystem};
use har2mp4::ui;
use tracing::info;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "har2mp4")]
#[command(about = "Rebuild an mp4 from a HAR capture of a segmented video download")]
struct Cli {
    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// 显示版本信息后退出
    #[arg(long, default_value_t = false)]
    version: bool,

    /// 数据目录（存放 config.yml、logs、output、temp 以及待处理的 .har）
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 未指定抓包文件时，处理数据目录下的全部 .har（默认只处理第一个）
    #[arg(long, default_value_t = false)]
    all: bool,

    /// 退出时保留 logs/latest.log，不打包为 zip
    #[arg(long, default_value_t = false)]
    keep_log: bool,

    /// 要转换的 .har 文件
    captures: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("HAR2MP4 v{}", VERSION);
        return Ok(());
    }

    let data_dir = match cli.data_dir.clone() {
        Some(dir) => dir,
        None => default_data_dir(),
    };
    let _log = init_logging(&cli, &data_dir)?;
    info!(target: "startup", "当前版本: v{}", VERSION);

    let config = load_or_create_with_base::<Config>(Some(&data_dir))
        .map_err(|e| anyhow!(e.to_string()))?
        .with_data_dir(&data_dir);

    ui::noui::run(config, cli.captures, cli.all)
}

/// 可执行文件所在目录；取不到时退回当前目录。
fn default_data_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn init_logging(cli: &Cli, base_dir: &Path) -> Result<LogSystem> {
    let opts = LogOptions {
        debug: cli.debug,
        console: cli.debug,
        use_color: io::stderr().is_terminal(),
        archive_on_exit: !cli.keep_log,
    };
    LogSystem::init_with_base(opts, Some(base_dir)).map_err(|e| anyhow!(e))
}
