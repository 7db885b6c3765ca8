//! 单次转换主流程：解析抓包 → 选择分段 → 并发下载 → 拼接 → 转封装 → 清理。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use tracing::{info, warn};

use super::assembler::assemble_to_file;
use super::error::RunError;
use super::fetch::{HttpFetcher, SegmentFetcher};
use super::models::SelectedSegment;
use super::plan::select;
use super::progress::ProgressCallback;
use super::segment_pool::{PoolOptions, retrieve_all};
use crate::base_system::context::Config;
use crate::base_system::file_cleaner::{RunWorkspace, remove_capture};
use crate::capture_parser::{parse, read_capture};
use crate::remux::{FfmpegRemuxer, RemuxError, Remuxer};

pub type StatusCallback = Box<dyn FnMut(&str) + Send>;

/// 与展示层的全部约定：进度、状态文本与可选的取消标志。
#[derive(Default)]
pub struct RunHooks {
    pub progress: Option<ProgressCallback>,
    pub status: Option<StatusCallback>,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl RunHooks {
    fn report(&mut self, msg: &str) {
        info!(target: "download", "{msg}");
        if let Some(cb) = self.status.as_mut() {
            cb(msg);
        }
    }
}

pub struct HarConverter {
    config: Config,
    fetcher: Arc<dyn SegmentFetcher>,
    remuxer: Box<dyn Remuxer>,
}

impl HarConverter {
    pub fn new(config: Config, fetcher: Arc<dyn SegmentFetcher>, remuxer: Box<dyn Remuxer>) -> Self {
        Self {
            config,
            fetcher,
            remuxer,
        }
    }

    /// 使用 HTTP 下载与 ffmpeg 转封装。
    pub fn from_config(config: Config) -> Result<Self, RunError> {
        let fetcher = HttpFetcher::new(config.request_timeout())?;
        let remuxer = FfmpegRemuxer::from_config(&config);
        Ok(Self::new(config, Arc::new(fetcher), Box::new(remuxer)))
    }

    /// 转换一个抓包文件，成功时返回输出文件路径。
    ///
    /// 失败时原始抓包与本次的临时目录都会保留。
    pub fn convert(&self, capture_path: &Path, mut hooks: RunHooks) -> Result<PathBuf, RunError> {
        let start = Instant::now();
        let stem = capture_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "output".to_string());

        let capture = read_capture(capture_path)?;
        let selected = select(parse(&capture))?;
        drop(capture);
        hooks.report(&format!("Found {} segments", selected.len()));

        let output_dir = self.config.output_dir();
        std::fs::create_dir_all(&output_dir).map_err(RunError::io(&output_dir))?;
        let output = output_dir.join(format!("{stem}.mp4"));

        let temp_dir = self.config.temp_dir();
        let workspace = RunWorkspace::create(&temp_dir, &stem).map_err(RunError::io(&temp_dir))?;

        if let Err(err) = self.run_in_workspace(&workspace, selected, &output, &mut hooks) {
            let kept = workspace.preserve();
            warn!(
                target: "download",
                workspace = %kept.display(),
                capture = %capture_path.display(),
                error = %err,
                "转换失败，已保留抓包与临时文件"
            );
            return Err(err);
        }

        if self.config.delete_capture_on_success
            && let Err(err) = remove_capture(capture_path)
        {
            warn!(target: "download", capture = %capture_path.display(), error = %err, "删除抓包失败");
        }
        if self.config.auto_clear_temp {
            if let Err(err) = workspace.discard() {
                warn!(target: "download", error = %err, "清理临时目录失败");
            }
        } else {
            let _ = workspace.preserve();
        }

        let name = output
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        hooks.report(&format!("Done → {name}"));
        info!(
            target: "download",
            output = %output.display(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "转换完成"
        );
        Ok(output)
    }

    fn run_in_workspace(
        &self,
        workspace: &RunWorkspace,
        selected: Vec<SelectedSegment>,
        output: &Path,
        hooks: &mut RunHooks,
    ) -> Result<(), RunError> {
        hooks.report("Downloading segments...");
        let options = PoolOptions::from_config(&self.config);
        let results = retrieve_all(
            selected,
            Arc::clone(&self.fetcher),
            &options,
            hooks.progress.take(),
            hooks.cancel.clone(),
        )?;

        hooks.report("Merging segments...");
        let combined = workspace.combined_path();
        assemble_to_file(results, &combined).map_err(|e| RunError::from_assemble(e, &combined))?;

        // ffmpeg 先写到同目录的 `<stem>.partial.mp4`，成功后再替换正式输出，
        // 失败时已有的同名输出保持原样。
        hooks.report("Remuxing...");
        let staging = staging_path(output);
        if let Err(err) = self.remuxer.remux(&combined, &staging) {
            discard_partial_output(&staging, &err);
            return Err(err.into());
        }
        std::fs::rename(&staging, output).map_err(RunError::io(output))?;
        Ok(())
    }
}

fn staging_path(output: &Path) -> PathBuf {
    output.with_extension("partial.mp4")
}

/// 只删除本次转封装写出的临时文件。
fn discard_partial_output(staging: &Path, err: &RemuxError) {
    warn!(target: "remux", staging = %staging.display(), error = %err, "转封装失败");
    if let Err(e) = std::fs::remove_file(staging)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(target: "remux", staging = %staging.display(), error = %e, "删除半成品失败");
    }
}
