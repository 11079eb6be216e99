use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::panic;

use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{error, info};
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use zip::CompressionMethod;
use zip::write::FileOptions;

const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024; // 10MB
const LOG_FILE_NAME: &str = "batoto-dl.log";
const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Ctrl-C 退出码
pub const INTERRUPT_EXIT_CODE: i32 = -2;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("subscriber init failed: {0}")]
    SubscriberInit(#[from] tracing_subscriber::util::TryInitError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("time formatting failed: {0}")]
    Time(#[from] time::error::Format),
}

/// 控制台日志级别：`--debug` 优先，`--quiet` 时只保留警告和错误。
#[derive(Clone, Copy, Debug, Default)]
pub struct LogOptions {
    pub debug: bool,
    pub quiet: bool,
}

impl LogOptions {
    fn console_level(self) -> LevelFilter {
        if self.debug {
            LevelFilter::DEBUG
        } else if self.quiet {
            LevelFilter::WARN
        } else {
            LevelFilter::INFO
        }
    }
}

/// 文件日志：本程序的调试信息全部保留，依赖库（reqwest/hyper 等）只记警告。
fn file_filter() -> Targets {
    Targets::new()
        .with_target(CRATE_TARGET, LevelFilter::DEBUG)
        .with_default(LevelFilter::WARN)
}

fn logs_dir(data_dir: Option<&Path>) -> PathBuf {
    data_dir
        .map(|b| b.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

pub struct LogSystem {
    runtime: Arc<LogRuntime>,
}

impl LogSystem {
    /// 初始化日志：控制台 + `logs/batoto-dl.log`。`data_dir` 为空时使用当前目录。
    pub fn init(options: LogOptions, data_dir: Option<&Path>) -> Result<Self, LogError> {
        let logs_dir = logs_dir(data_dir);
        fs::create_dir_all(&logs_dir)?;
        if let Some(archived) = archive_if_large(&logs_dir.join(LOG_FILE_NAME), &logs_dir)? {
            eprintln!("旧日志已归档: {}", archived.display());
        }

        let (file_writer, guard) = non_blocking::NonBlockingBuilder::default()
            .lossy(false)
            .finish(rolling::never(&logs_dir, LOG_FILE_NAME));

        // 控制台与进度条共用终端，只输出消息本身
        let console_layer = fmt::layer()
            .without_time()
            .with_target(false)
            .with_writer(io::stderr)
            .with_filter(options.console_level());

        let file_layer = fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(file_writer)
            .with_filter(file_filter());

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        let runtime = Arc::new(LogRuntime {
            guard: Mutex::new(Some(guard)),
            exit_called: AtomicBool::new(false),
        });

        runtime.install_signal_handler();
        runtime.install_panic_hook();

        Ok(Self { runtime })
    }
}

impl Drop for LogSystem {
    fn drop(&mut self) {
        self.runtime.safe_exit();
    }
}

struct LogRuntime {
    guard: Mutex<Option<WorkerGuard>>,
    exit_called: AtomicBool,
}

impl LogRuntime {
    fn install_signal_handler(self: &Arc<Self>) {
        let runtime = Arc::clone(self);
        let _ = ctrlc::set_handler(move || {
            println!("\nCTRL-C detected, exiting...");
            info!("收到 Ctrl-C，退出");
            runtime.safe_exit();
            std::process::exit(INTERRUPT_EXIT_CODE);
        });
    }

    fn install_panic_hook(self: &Arc<Self>) {
        let runtime = Arc::clone(self);
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if let Some(location) = info.location() {
                error!("panic at {}:{}: {}", location.file(), location.line(), info);
            } else {
                error!("panic: {info}");
            }
            runtime.safe_exit();
            previous(info);
        }));
    }

    /// 刷新并关闭文件日志，只执行一次。
    fn safe_exit(&self) {
        if self.exit_called.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut guard) = self.guard.lock() {
            guard.take();
        }
    }
}

fn archive_if_large(log_file: &Path, logs_dir: &Path) -> Result<Option<PathBuf>, LogError> {
    match fs::metadata(log_file) {
        Ok(meta) if meta.len() >= MAX_LOG_BYTES => archive_log_file(log_file, logs_dir),
        _ => Ok(None),
    }
}

/// 打包为 `batoto-dl_<时间>.zip` 并删除原日志。
fn archive_log_file(log_file: &Path, logs_dir: &Path) -> Result<Option<PathBuf>, LogError> {
    let timestamp = OffsetDateTime::now_utc().format(format_description!(
        "[year][month][day]_[hour][minute][second]"
    ))?;
    let stem = format!("batoto-dl_{timestamp}");
    let archive_path = logs_dir.join(format!("{stem}.zip"));

    let mut zip = zip::ZipWriter::new(File::create(&archive_path)?);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(format!("{stem}.log"), options)?;
    io::copy(&mut File::open(log_file)?, &mut zip)?;
    zip.finish()?;

    fs::remove_file(log_file)?;
    Ok(Some(archive_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tracing::Level;

    #[test]
    fn console_level_follows_flags() {
        assert_eq!(LogOptions::default().console_level(), LevelFilter::INFO);
        let quiet = LogOptions { quiet: true, debug: false };
        assert_eq!(quiet.console_level(), LevelFilter::WARN);
        let both = LogOptions { quiet: true, debug: true };
        assert_eq!(both.console_level(), LevelFilter::DEBUG);
    }

    #[test]
    fn file_log_keeps_own_debug_and_dependency_warnings() {
        let filter = file_filter();
        let own = format!("{CRATE_TARGET}::download::downloader");
        assert!(filter.would_enable(&own, &Level::DEBUG));
        assert!(!filter.would_enable("hyper::proto", &Level::DEBUG));
        assert!(filter.would_enable("reqwest::connect", &Level::WARN));
    }

    #[test]
    fn logs_live_under_data_dir() {
        assert_eq!(logs_dir(None), PathBuf::from("logs"));
        assert_eq!(
            logs_dir(Some(Path::new("/data"))),
            Path::new("/data").join("logs")
        );
    }

    #[test]
    fn small_log_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join(LOG_FILE_NAME);
        fs::write(&log, b"line\n").unwrap();

        assert!(archive_if_large(&log, dir.path()).unwrap().is_none());
        assert!(log.exists());
    }

    #[test]
    fn archived_log_keeps_content() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join(LOG_FILE_NAME);
        fs::write(&log, b"hello log\n").unwrap();

        let archive = archive_log_file(&log, dir.path()).unwrap().unwrap();
        assert!(!log.exists());
        let name = archive.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("batoto-dl_") && name.ends_with(".zip"));

        let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
        let mut text = String::new();
        zip.by_index(0).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello log\n");
    }
}
