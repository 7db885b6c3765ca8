//! 进度上报：UI 回调或命令行进度条（二选一）。

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::models::ProgressSnapshot;

pub type ProgressCallback = Box<dyn FnMut(ProgressSnapshot) + Send>;

pub(crate) struct ProgressReporter {
    pub(crate) snapshot: ProgressSnapshot,
    cb: Option<ProgressCallback>, // optional UI callback
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    /// 没有 UI 回调时在 stderr 上画进度条（非终端时 indicatif 自动隐藏）。
    pub(crate) fn new(total: usize, cb: Option<ProgressCallback>) -> Self {
        let bar = if cb.is_none() && total > 0 {
            let style = ProgressStyle::with_template(
                "{prefix} [{elapsed_precise}] {wide_bar} {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
            let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
            bar.set_style(style);
            bar.set_prefix("分段下载");
            Some(bar)
        } else {
            None
        };

        Self {
            snapshot: ProgressSnapshot {
                completed: 0,
                total,
            },
            cb,
            bar,
        }
    }

    fn emit(&mut self) {
        if let Some(cb) = self.cb.as_mut() {
            cb(self.snapshot);
        }
        if let Some(bar) = self.bar.as_ref() {
            bar.set_position(self.snapshot.completed as u64);
        }
    }

    /// 每个分段下载成功时调用一次。
    pub(crate) fn inc_completed(&mut self) {
        self.snapshot.completed = (self.snapshot.completed + 1).min(self.snapshot.total);
        self.emit();
    }

    pub(crate) fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn callback_sees_each_completion() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut reporter = ProgressReporter::new(
            3,
            Some(Box::new(move |s: ProgressSnapshot| {
                sink.lock().unwrap().push(s.fraction());
            })),
        );
        for _ in 0..4 {
            reporter.inc_completed();
        }
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 1.0);
        assert_eq!(reporter.snapshot.completed, 3);
    }
}
