//! 日志：`logs/latest.log` 常驻，`--debug` 时另外输出到 stderr。
//!
//! 启动时日志超过上限先打包；进程退出（正常结束、Ctrl-C、panic）时按选项打包为 zip。

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::{io, panic, thread, time::Duration};

use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{error, info};
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use zip::CompressionMethod;
use zip::write::FileOptions;

const LATEST_LOG: &str = "latest.log";
const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;
const DRAIN_WAIT: Duration = Duration::from_millis(300);

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

#[derive(Clone, Copy, Debug)]
pub struct LogOptions {
    /// 文件与控制台都输出 DEBUG
    pub debug: bool,
    /// 同时输出到 stderr
    pub console: bool,
    pub use_color: bool,
    /// 退出时把 latest.log 打包为 `log_<时间>.zip`
    pub archive_on_exit: bool,
}

/// 持有到进程结束；drop 时刷新并按选项归档日志。
pub struct LogSystem {
    archiver: Arc<ExitArchiver>,
}

impl LogSystem {
    /// 在 `base_dir/logs`（未指定时为当前目录下的 `logs`）初始化日志。
    pub fn init_with_base(options: LogOptions, base_dir: Option<&Path>) -> Result<Self, LogError> {
        let logs_dir = base_dir
            .map(|b| b.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"));
        fs::create_dir_all(&logs_dir)?;
        let latest_log = logs_dir.join(LATEST_LOG);
        archive_if_large(&latest_log, &logs_dir)?;

        let (file_writer, guard) = NonBlockingBuilder::default()
            .lossy(false)
            .finish(rolling::never(&logs_dir, LATEST_LOG));
        let level = if options.debug {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };

        let console_layer = options.console.then(|| {
            fmt::layer()
                .with_target(false)
                .with_ansi(options.use_color)
                .with_writer(io::stderr)
                .with_filter(level)
        });
        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer(file_writer, level))
            .try_init()?;

        let archiver = Arc::new(ExitArchiver {
            logs_dir,
            latest_log,
            guard: Mutex::new(Some(guard)),
            done: AtomicBool::new(false),
            archive: options.archive_on_exit,
        });
        archiver.install_signal_handler();
        archiver.install_panic_hook();

        Ok(Self { archiver })
    }
}

impl Drop for LogSystem {
    fn drop(&mut self) {
        self.archiver.finish();
    }
}

fn file_layer<S>(writer: NonBlocking, level: LevelFilter) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(level)
}

struct ExitArchiver {
    logs_dir: PathBuf,
    latest_log: PathBuf,
    guard: Mutex<Option<WorkerGuard>>,
    done: AtomicBool,
    archive: bool,
}

impl ExitArchiver {
    fn install_signal_handler(self: &Arc<Self>) {
        let archiver = Arc::clone(self);
        let _ = ctrlc::set_handler(move || {
            archiver.finish();
            // 128 + SIGINT
            std::process::exit(130);
        });
    }

    fn install_panic_hook(self: &Arc<Self>) {
        let archiver = Arc::clone(self);
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            error!("panic: {info}");
            archiver.finish();
            previous(info);
        }));
    }

    /// 只执行一次：释放 writer guard（刷新缓冲），再按需归档。
    fn finish(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        let flushed = self.guard.lock().map(|mut g| g.take().is_some()).unwrap_or(false);
        if !self.archive {
            return;
        }
        if flushed {
            thread::sleep(DRAIN_WAIT);
        }
        if let Err(err) = archive_log_file(&self.latest_log, &self.logs_dir) {
            eprintln!("failed to archive log: {err}");
        }
    }
}

fn archive_if_large(latest_log: &Path, logs_dir: &Path) -> Result<(), LogError> {
    if let Ok(meta) = fs::metadata(latest_log)
        && meta.len() >= MAX_LOG_BYTES
    {
        archive_log_file(latest_log, logs_dir)?;
    }
    Ok(())
}

/// 打包 latest.log 并删除原文件；空日志直接删除，不生成压缩包。
fn archive_log_file(latest_log: &Path, logs_dir: &Path) -> Result<Option<PathBuf>, LogError> {
    let len = match fs::metadata(latest_log) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    if len == 0 {
        let _ = fs::remove_file(latest_log);
        return Ok(None);
    }

    let timestamp = OffsetDateTime::now_utc().format(format_description!(
        "[year][month][day]_[hour][minute][second]"
    ))?;
    let archive_path = logs_dir.join(format!("log_{timestamp}.zip"));

    let mut zip = zip::ZipWriter::new(File::create(&archive_path)?);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(format!("{timestamp}.log"), options)?;
    io::copy(&mut File::open(latest_log)?, &mut zip)?;
    zip.finish()?;

    let _ = fs::remove_file(latest_log);
    info!("log archived to {}", archive_path.display());
    Ok(Some(archive_path))
}
