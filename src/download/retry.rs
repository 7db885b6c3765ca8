//! 单个分段的重试策略：固定次数、固定间隔，并校验 content-length。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::fetch::{FetchError, SegmentFetcher};
use super::models::{RetrievalResult, SelectedSegment};
use crate::base_system::context::Config;

const STOP_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_attempts: cfg.max_retries.max(1),
            backoff: cfg.retry_wait(),
        }
    }
}

/// 内部中止（某段已失败）与外部取消的合并视图。
#[derive(Debug, Clone, Default)]
pub(crate) struct StopFlags {
    pub(crate) abort: Arc<AtomicBool>,
    pub(crate) cancel: Option<Arc<AtomicBool>>,
}

impl StopFlags {
    pub(crate) fn is_set(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
            || self
                .cancel
                .as_ref()
                .map(|c| c.load(Ordering::Relaxed))
                .unwrap_or(false)
    }

    pub(crate) fn raise_abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    /// 可被打断的等待；返回 false 表示等待期间收到停止信号。
    fn sleep(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if self.is_set() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(STOP_POLL.min(deadline - now));
        }
    }
}

/// 最多尝试 `max_attempts` 次；每次失败后等待 `backoff`。不会返回部分数据。
pub(crate) fn fetch_segment_with_retry(
    fetcher: &dyn SegmentFetcher,
    segment: &SelectedSegment,
    policy: &RetryPolicy,
    stop: &StopFlags,
) -> RetrievalResult {
    let mut last_error = String::from("cancelled");
    let mut attempts = 0;

    while attempts < policy.max_attempts {
        if stop.is_set() {
            return RetrievalResult::failed(segment.index, attempts, "cancelled");
        }
        attempts += 1;

        match fetch_once(fetcher, segment) {
            Ok(bytes) => {
                debug!(
                    target: "download",
                    index = segment.index,
                    attempts,
                    len = bytes.len(),
                    "分段下载完成"
                );
                return RetrievalResult::succeeded(segment.index, bytes, attempts);
            }
            Err(err) => {
                debug!(
                    target: "download",
                    index = segment.index,
                    attempt = attempts,
                    error = %err,
                    "分段下载失败"
                );
                last_error = err.to_string();
            }
        }

        if attempts < policy.max_attempts && !stop.sleep(policy.backoff) {
            return RetrievalResult::failed(segment.index, attempts, "cancelled");
        }
    }

    warn!(
        target: "download",
        index = segment.index,
        attempts,
        error = %last_error,
        url = %segment.url,
        "分段重试耗尽"
    );
    RetrievalResult::failed(segment.index, attempts, last_error)
}

fn fetch_once(fetcher: &dyn SegmentFetcher, segment: &SelectedSegment) -> Result<Vec<u8>, FetchError> {
    let bytes = fetcher.fetch(&segment.url)?;
    if let Some(expected) = segment.expected_len() {
        let actual = bytes.len() as u64;
        if actual != expected {
            return Err(FetchError::SizeMismatch { expected, actual });
        }
    }
    Ok(bytes)
}
