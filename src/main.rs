//! batoto-dl：从 bato.to 下载漫画章节或整部系列。
//!
//! 输出为散装图片目录（`<系列>/Chapter <N>/01.jpg`）或每章一个 cbz
//! （`<系列>/Chapter <N>.cbz`），重复运行时跳过已下载的内容。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置/日志/命名等基础设施
//! - `network_parser`：HTTP 获取与 gzip 解码
//! - `book_parser`：页面解析（标题、章节号、图片与章节链接）
//! - `download`：下载流程编排与输出目标

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

mod base_system;
mod book_parser;
mod download;
mod network_parser;

use base_system::config::{config_path, load_or_create};
use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};
use book_parser::parser::BatotoParser;
use download::downloader::ChapterDownloader;
use download::models::OutputMode;
use download::progress::{CliProgress, PREFIX, Progress, SilentProgress};
use network_parser::network::HttpFetcher;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "batoto-dl", version = VERSION)]
#[command(about = "Download Manga from Bato.to URL")]
struct Cli {
    /// 系列或章节链接
    #[arg(value_name = "URL")]
    url: String,

    /// 每章保存为 cbz 文件
    #[arg(long, default_value_t = false)]
    cbz: bool,

    /// 输出目录（覆盖配置中的 save_path）
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 不显示进度条，控制台只输出警告和错误
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// 数据目录路径（用于存放 config.yml 和 logs）
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{PREFIX} {err:#}");
            -1
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<()> {
    let data_dir = cli.data_dir.as_deref();
    let _log = init_logging(cli.debug, cli.quiet, data_dir)?;
    info!("当前版本: v{}", VERSION);

    let config_file = config_path::<Config>(data_dir);
    let config: Config = load_or_create(&config_file)
        .with_context(|| format!("加载配置失败: {}", config_file.display()))?;

    let root = cli
        .output
        .clone()
        .unwrap_or_else(|| config.default_save_dir());

    let fetcher = HttpFetcher::from_config(&config)?;
    let parser = BatotoParser::from_config(&config)?;
    let downloader = ChapterDownloader::new(&fetcher, &parser, &root, &config);
    let mut progress: Box<dyn Progress> = if cli.quiet {
        Box::new(SilentProgress)
    } else {
        Box::new(CliProgress::new())
    };

    let mode = OutputMode::from_cbz_flag(cli.cbz);
    match download::plan::run(downloader, &cli.url, mode, progress.as_mut()) {
        Ok(result) => {
            info!(
                "完成: 成功 {}, 跳过 {}, 失败 {}",
                result.success, result.skipped, result.failed
            );
            Ok(())
        }
        Err(err) => {
            error!("下载中止: {}", err);
            Err(err.into())
        }
    }
}

fn init_logging(debug: bool, quiet: bool, data_dir: Option<&Path>) -> Result<LogSystem> {
    LogSystem::init(LogOptions { debug, quiet }, data_dir).context("初始化日志失败")
}
