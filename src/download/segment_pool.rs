//! 分段并发下载工作池。
//!
//! 固定数量的 worker 从任务队列取分段并带重试下载，结果经由结果队列回到协调线程；
//! 协调线程负责计数与进度上报。任一分段重试耗尽即广播中止，整次运行失败。

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crossbeam_channel as channel;
use thiserror::Error;
use tracing::{debug, error, info};

use super::fetch::SegmentFetcher;
use super::models::{RetrievalResult, SelectedSegment};
use super::progress::{ProgressCallback, ProgressReporter};
use super::retry::{RetryPolicy, StopFlags, fetch_segment_with_retry};
use crate::base_system::context::Config;

const CANCEL_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            concurrency: 6,
            retry: RetryPolicy::default(),
        }
    }
}

impl PoolOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            concurrency: cfg.max_workers.max(1),
            retry: RetryPolicy::from_config(cfg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalFailure {
    #[error("segment {index} failed after {attempts} attempts: {reason}")]
    Exhausted {
        index: u64,
        attempts: u32,
        reason: String,
    },
    #[error("download cancelled")]
    Cancelled,
    /// worker 线程 panic，分段结果丢失
    #[error("worker panicked before segment {index} finished")]
    WorkerPanicked { index: u64 },
}

/// 下载全部选中分段。成功时返回每个分段的结果（按完成顺序，未排序）；
/// 任一分段失败则返回错误，不返回部分结果。
///
/// 进度只在分段成功时前进，失败的运行不会报告 1.0。
pub fn retrieve_all(
    selected: Vec<SelectedSegment>,
    fetcher: Arc<dyn SegmentFetcher>,
    options: &PoolOptions,
    progress: Option<ProgressCallback>,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<Vec<RetrievalResult>, RetrievalFailure> {
    let total = selected.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let stop = StopFlags {
        abort: Arc::new(AtomicBool::new(false)),
        cancel,
    };
    let workers = options.concurrency.clamp(1, total);
    info!(target: "download", total, workers, "开始下载分段");

    let planned: Vec<u64> = selected.iter().map(|s| s.index).collect();
    let (tx_job, rx_job) = channel::unbounded::<SelectedSegment>();
    for seg in selected {
        let _ = tx_job.send(seg);
    }
    drop(tx_job);

    let (tx_res, rx_res) = channel::unbounded::<RetrievalResult>();
    let mut handles = Vec::with_capacity(workers);
    for n in 0..workers {
        let rx_job = rx_job.clone();
        let tx_res = tx_res.clone();
        let fetcher = Arc::clone(&fetcher);
        let stop = stop.clone();
        let retry = options.retry;
        handles.push(std::thread::spawn(move || {
            for seg in rx_job.iter() {
                if stop.is_set() {
                    debug!(target: "download", worker = n, "收到停止信号，worker 退出");
                    return;
                }
                let res = fetch_segment_with_retry(fetcher.as_ref(), &seg, &retry, &stop);
                if tx_res.send(res).is_err() {
                    return;
                }
            }
        }));
    }
    drop(tx_res);

    let mut reporter = ProgressReporter::new(total, progress);
    let mut finished: Vec<RetrievalResult> = Vec::with_capacity(total);
    let mut failure: Option<RetrievalFailure> = None;

    while finished.len() < total {
        match rx_res.recv_timeout(CANCEL_POLL) {
            Ok(res) if res.success() => {
                finished.push(res);
                reporter.inc_completed();
            }
            Ok(res) => {
                if stop.is_set() {
                    // 外部取消打断的分段，不算重试耗尽
                    failure = Some(RetrievalFailure::Cancelled);
                } else {
                    error!(
                        target: "download",
                        index = res.index,
                        attempts = res.attempts,
                        "分段下载失败，中止本次任务"
                    );
                    failure = Some(RetrievalFailure::Exhausted {
                        index: res.index,
                        attempts: res.attempts,
                        reason: res.error.unwrap_or_default(),
                    });
                }
                break;
            }
            Err(channel::RecvTimeoutError::Timeout) => {
                if stop.is_set() {
                    failure = Some(RetrievalFailure::Cancelled);
                    break;
                }
            }
            Err(channel::RecvTimeoutError::Disconnected) => break,
        }
    }

    stop.raise_abort();
    drop(rx_res);
    let panicked = handles
        .into_iter()
        .map(|h| h.join().is_err())
        .filter(|&p| p)
        .count();
    reporter.finish();

    if let Some(failure) = failure {
        return Err(failure);
    }
    if finished.len() < total {
        let done: HashSet<u64> = finished.iter().map(|r| r.index).collect();
        let index = planned
            .into_iter()
            .find(|i| !done.contains(i))
            .unwrap_or_default();
        error!(target: "download", panicked, index, "worker 异常退出，分段结果缺失");
        return Err(RetrievalFailure::WorkerPanicked { index });
    }

    info!(target: "download", total, "全部分段下载完成");
    Ok(finished)
}
